use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::UserId;
use crate::models::ApiResponse;
use crate::services::AnalyticsService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub days: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct TopVideosQuery {
    pub limit: Option<i64>,
}

fn analytics_service(state: &AppState) -> AnalyticsService {
    AnalyticsService::new(state.db.clone(), state.hub.clone())
}

pub async fn overview(
    state: web::Data<AppState>,
    user: UserId,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse> {
    let overview = analytics_service(&state).overview(user.0, query.days).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(overview)))
}

pub async fn video_analytics(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse> {
    let stats = analytics_service(&state)
        .video(path.into_inner(), user.0, query.days)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(stats)))
}

pub async fn top_videos(
    state: web::Data<AppState>,
    user: UserId,
    query: web::Query<TopVideosQuery>,
) -> Result<HttpResponse> {
    let videos = analytics_service(&state)
        .top_videos(user.0, query.limit)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(videos)))
}
