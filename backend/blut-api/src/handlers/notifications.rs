use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::UserId;
use crate::models::{ApiResponse, PageParams};
use crate::services::NotificationService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub unread_only: bool,
}

fn notification_service(state: &AppState) -> NotificationService {
    NotificationService::new(state.db.clone(), state.hub.clone())
}

pub async fn list_notifications(
    state: web::Data<AppState>,
    user: UserId,
    query: web::Query<ListNotificationsQuery>,
) -> Result<HttpResponse> {
    let params = PageParams {
        page: query.page,
        limit: query.limit,
    };
    let page = notification_service(&state)
        .list(user.0, query.unread_only, params)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(page)))
}

pub async fn unread_count(state: web::Data<AppState>, user: UserId) -> Result<HttpResponse> {
    let count = notification_service(&state).unread_count(user.0).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(serde_json::json!({ "count": count }))))
}

pub async fn mark_read(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
) -> Result<HttpResponse> {
    notification_service(&state)
        .mark_read(path.into_inner(), user.0)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(serde_json::json!({ "read": true }))))
}

pub async fn mark_all_read(state: web::Data<AppState>, user: UserId) -> Result<HttpResponse> {
    let updated = notification_service(&state).mark_all_read(user.0).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(serde_json::json!({ "updated": updated }))))
}

pub async fn delete_notification(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
) -> Result<HttpResponse> {
    notification_service(&state)
        .delete(path.into_inner(), user.0)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn clear_notifications(
    state: web::Data<AppState>,
    user: UserId,
) -> Result<HttpResponse> {
    let deleted = notification_service(&state).clear(user.0).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(serde_json::json!({ "deleted": deleted }))))
}
