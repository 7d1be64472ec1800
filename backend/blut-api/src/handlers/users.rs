use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::middleware::UserId;
use crate::models::{ApiResponse, PageParams};
use crate::services::{MediaKind, UserService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl SearchQuery {
    fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 64, message = "Display name must be 1-64 characters"))]
    pub display_name: Option<String>,
    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<String>,
}

fn user_service(state: &AppState) -> UserService {
    UserService::new(state.db.clone(), state.hub.clone(), state.feed.clone())
}

pub async fn search_users(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let page = user_service(&state)
        .search(&query.q, query.page_params())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(page)))
}

pub async fn get_user(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    viewer: Option<UserId>,
) -> Result<HttpResponse> {
    let profile = user_service(&state)
        .profile(path.into_inner(), viewer.map(|v| v.0))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(profile)))
}

pub async fn update_me(
    state: web::Data<AppState>,
    user: UserId,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    let updated = user_service(&state)
        .update_profile(user.0, body.display_name.as_deref(), body.bio.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(updated)))
}

/// Multipart form with a single `avatar` image
pub async fn upload_avatar(
    state: web::Data<AppState>,
    user: UserId,
    payload: Multipart,
) -> Result<HttpResponse> {
    let stored = state
        .storage
        .save_single(MediaKind::Image, "avatar", payload)
        .await?;

    let updated = user_service(&state)
        .set_avatar(user.0, &stored, &state.storage)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(updated)))
}

pub async fn my_subscriptions(
    state: web::Data<AppState>,
    user: UserId,
    params: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = user_service(&state)
        .subscriptions(user.0, params.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(page)))
}

pub async fn my_liked_videos(
    state: web::Data<AppState>,
    user: UserId,
    params: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = user_service(&state)
        .liked_videos(user.0, params.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(page)))
}

pub async fn user_videos(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    viewer: Option<UserId>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = user_service(&state)
        .videos(path.into_inner(), viewer.map(|v| v.0), params.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(page)))
}

pub async fn user_subscribers(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = user_service(&state)
        .subscribers(path.into_inner(), params.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(page)))
}

pub async fn subscribe(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
) -> Result<HttpResponse> {
    let subscription = user_service(&state)
        .subscribe(user.0, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(subscription)))
}

pub async fn unsubscribe(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
) -> Result<HttpResponse> {
    let subscription = user_service(&state)
        .unsubscribe(user.0, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(subscription)))
}
