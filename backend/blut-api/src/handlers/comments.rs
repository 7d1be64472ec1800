/// Comment handlers - threads under a video
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::middleware::UserId;
use crate::models::{ApiResponse, PageParams};
use crate::services::CommentService;
use crate::state::AppState;
use crate::validators::validate_not_blank;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub content: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub content: String,
}

fn comment_service(state: &AppState) -> CommentService {
    CommentService::new(state.db.clone(), state.hub.clone())
}

/// Top-level comments, each with its reply count
pub async fn list_video_comments(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    viewer: Option<UserId>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = comment_service(&state)
        .list_for_video(path.into_inner(), viewer.map(|v| v.0), params.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(page)))
}

pub async fn list_replies(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    viewer: Option<UserId>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse> {
    let page = comment_service(&state)
        .list_replies(path.into_inner(), viewer.map(|v| v.0), params.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(page)))
}

pub async fn create_comment(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
    body: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    let comment = comment_service(&state)
        .create(path.into_inner(), user.0, &body.content, body.parent_id)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::new(comment)))
}

pub async fn update_comment(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
    body: web::Json<UpdateCommentRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    let comment = comment_service(&state)
        .update(path.into_inner(), user.0, &body.content)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(comment)))
}

pub async fn delete_comment(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
) -> Result<HttpResponse> {
    comment_service(&state)
        .delete(path.into_inner(), user.0)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
