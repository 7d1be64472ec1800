/// HTTP handlers for the BluT API
///
/// Handlers extract and validate the request, build the service they need
/// from `AppState` and wrap results in `ApiResponse`. Routes that work for
/// anonymous visitors take `Option<UserId>`; the notification, analytics and
/// messaging scopes sit behind `JwtAuthMiddleware` as a whole.
pub mod analytics;
pub mod annotations;
pub mod auth;
pub mod comments;
pub mod health;
pub mod media;
pub mod messages;
pub mod notifications;
pub mod users;
pub mod videos;

use actix_web::web;

use crate::metrics::serve_metrics;
use crate::middleware::JwtAuthMiddleware;
use crate::realtime::route::ws_handler;

/// Register every route. Literal segments (`/me`, `/feed`, `/comments/..`)
/// come before `/{id}` so they are not captured as ids.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health))
        .route("/metrics", web::get().to(serve_metrics))
        .route("/ws", web::get().to(ws_handler))
        .route("/uploads/{file}", web::get().to(media::serve_upload))
        .service(
            web::scope("/api")
                .service(
                    web::scope("/auth")
                        .route("/register", web::post().to(auth::register))
                        .route("/login", web::post().to(auth::login))
                        .route("/me", web::get().to(auth::me))
                        .route("/password", web::put().to(auth::change_password)),
                )
                .service(
                    web::scope("/users")
                        .route("/search", web::get().to(users::search_users))
                        .route("/me", web::put().to(users::update_me))
                        .route("/me/avatar", web::post().to(users::upload_avatar))
                        .route("/me/subscriptions", web::get().to(users::my_subscriptions))
                        .route("/me/liked", web::get().to(users::my_liked_videos))
                        .route("/{id}", web::get().to(users::get_user))
                        .route("/{id}/videos", web::get().to(users::user_videos))
                        .route("/{id}/subscribers", web::get().to(users::user_subscribers))
                        .route("/{id}/subscribe", web::post().to(users::subscribe))
                        .route("/{id}/subscribe", web::delete().to(users::unsubscribe)),
                )
                .service(
                    web::scope("/videos")
                        .route("", web::get().to(videos::list_videos))
                        .route("", web::post().to(videos::upload_video))
                        .route("/feed", web::get().to(videos::get_feed))
                        .route(
                            "/comments/{comment_id}/replies",
                            web::get().to(comments::list_replies),
                        )
                        .route(
                            "/comments/{comment_id}",
                            web::put().to(comments::update_comment),
                        )
                        .route(
                            "/comments/{comment_id}",
                            web::delete().to(comments::delete_comment),
                        )
                        .route("/{id}", web::get().to(videos::get_video))
                        .route("/{id}", web::put().to(videos::update_video))
                        .route("/{id}", web::delete().to(videos::delete_video))
                        .route("/{id}/thumbnail", web::post().to(videos::upload_thumbnail))
                        .route("/{id}/view", web::post().to(videos::record_view))
                        .route("/{id}/like", web::post().to(videos::like_video))
                        .route("/{id}/like", web::delete().to(videos::unlike_video))
                        .route(
                            "/{id}/comments",
                            web::get().to(comments::list_video_comments),
                        )
                        .route("/{id}/comments", web::post().to(comments::create_comment))
                        .route("/{id}/notes", web::get().to(annotations::list_notes))
                        .route("/{id}/notes", web::post().to(annotations::create_note))
                        .route(
                            "/{id}/notes/{note_id}",
                            web::put().to(annotations::update_note),
                        )
                        .route(
                            "/{id}/notes/{note_id}",
                            web::delete().to(annotations::delete_note),
                        )
                        .route("/{id}/scenes", web::get().to(annotations::list_scenes))
                        .route("/{id}/scenes", web::post().to(annotations::create_scene))
                        .route(
                            "/{id}/scenes/{scene_id}",
                            web::put().to(annotations::update_scene),
                        )
                        .route(
                            "/{id}/scenes/{scene_id}",
                            web::delete().to(annotations::delete_scene),
                        ),
                )
                .service(
                    web::scope("/notifications")
                        .wrap(JwtAuthMiddleware)
                        .route("", web::get().to(notifications::list_notifications))
                        .route("", web::delete().to(notifications::clear_notifications))
                        .route("/unread-count", web::get().to(notifications::unread_count))
                        .route("/read-all", web::put().to(notifications::mark_all_read))
                        .route("/{id}/read", web::put().to(notifications::mark_read))
                        .route("/{id}", web::delete().to(notifications::delete_notification)),
                )
                .service(
                    web::scope("/analytics")
                        .wrap(JwtAuthMiddleware)
                        .route("/overview", web::get().to(analytics::overview))
                        .route("/videos/{id}", web::get().to(analytics::video_analytics))
                        .route("/top-videos", web::get().to(analytics::top_videos)),
                )
                .service(
                    web::scope("/messages")
                        .wrap(JwtAuthMiddleware)
                        .route(
                            "/conversations",
                            web::get().to(messages::list_conversations),
                        )
                        .route(
                            "/conversations",
                            web::post().to(messages::start_conversation),
                        )
                        .route(
                            "/conversations/{id}/messages",
                            web::get().to(messages::list_messages),
                        )
                        .route(
                            "/conversations/{id}/messages",
                            web::post().to(messages::send_message),
                        )
                        .route(
                            "/conversations/{id}/read",
                            web::put().to(messages::mark_conversation_read),
                        )
                        .route("/unread-count", web::get().to(messages::unread_count))
                        .route("/{message_id}", web::delete().to(messages::delete_message)),
                ),
        );
}
