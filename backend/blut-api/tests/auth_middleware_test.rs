//! Route-level authentication and error-envelope checks.
//!
//! Every request here is answered before a query runs, so the app is wired
//! with a lazy pool that never connects.

mod common;

use actix_web::{http::StatusCode, test, web, App};
use blut_api::error::{json_error_handler, path_error_handler, query_error_handler};
use blut_api::handlers::configure_routes;
use chrono::Duration;
use crypto_core::jwt;
use serde_json::Value;
use uuid::Uuid;

macro_rules! init_app {
    () => {{
        jwt::init_test_secret();
        let state = common::test_state(common::lazy_pool());
        test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .app_data(web::JsonConfig::default().error_handler(json_error_handler))
                .app_data(web::QueryConfig::default().error_handler(query_error_handler))
                .app_data(web::PathConfig::default().error_handler(path_error_handler))
                .configure(configure_routes),
        )
        .await
    }};
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

#[actix_web::test]
async fn protected_scope_without_token_is_401() {
    let app = init_app!();

    for uri in [
        "/api/notifications",
        "/api/analytics/overview",
        "/api/messages/conversations",
    ] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Not authorized, no token provided");
    }
}

#[actix_web::test]
async fn expired_token_is_401() {
    let app = init_app!();
    let token = jwt::generate_token_with_ttl(
        Uuid::new_v4(),
        "late@example.com",
        "late",
        Duration::hours(-2),
    )
    .unwrap();

    let req = test::TestRequest::get()
        .uri("/api/notifications/unread-count")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Not authorized, token expired");
}

#[actix_web::test]
async fn tampered_token_is_401() {
    let app = init_app!();
    let token = jwt::generate_access_token(Uuid::new_v4(), "a@example.com", "alice").unwrap();
    let tampered = format!("{token}x");

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&tampered))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn malformed_authorization_header_is_401() {
    let app = init_app!();
    let req = test::TestRequest::put()
        .uri("/api/users/me")
        .insert_header(("Authorization", "Token abc"))
        .set_json(serde_json::json!({ "bio": "hi" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Not authorized, malformed Authorization header");
}

#[actix_web::test]
async fn websocket_without_token_is_401() {
    let app = init_app!();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/ws").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn bad_path_id_uses_error_envelope() {
    let app = init_app!();
    let token = jwt::generate_access_token(Uuid::new_v4(), "a@example.com", "alice").unwrap();

    let req = test::TestRequest::post()
        .uri("/api/videos/not-a-uuid/like")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn invalid_register_body_is_400() {
    let app = init_app!();
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(serde_json::json!({
            "username": "x",
            "email": "nope",
            "password": "short"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("Username"));
}

#[actix_web::test]
async fn upload_path_traversal_is_404() {
    let app = init_app!();
    let req = test::TestRequest::get()
        .uri("/uploads/..%2Fsecret.txt")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
