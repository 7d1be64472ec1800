/// Video catalogue, feed, playback and like endpoints
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::db::video_repo::VideoFilter;
use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::models::{ApiResponse, PageParams};
use crate::services::{MediaKind, UploadForm, VideoEdit, VideoService};
use crate::state::AppState;

const DEFAULT_FEED_LIMIT: usize = 20;
const MAX_FEED_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ListVideosQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub q: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
}

impl ListVideosQuery {
    fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }

    pub(crate) fn filter(&self) -> Result<VideoFilter> {
        let popular = match self.sort.as_deref().map(str::trim) {
            None | Some("") | Some("latest") => false,
            Some("popular") => true,
            Some(other) => {
                return Err(AppError::BadRequest(format!(
                    "Invalid sort '{other}'. Must be 'latest' or 'popular'"
                )))
            }
        };
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Ok(VideoFilter {
            query: non_empty(&self.q),
            category: non_empty(&self.category),
            popular,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl FeedQuery {
    pub(crate) fn window(&self) -> (usize, usize) {
        let limit = self
            .limit
            .unwrap_or(DEFAULT_FEED_LIMIT)
            .clamp(1, MAX_FEED_LIMIT);
        (limit, self.offset.unwrap_or(0))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordViewRequest {
    pub watched_secs: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ViewCount {
    view_count: i64,
}

fn video_service(state: &AppState) -> VideoService {
    VideoService::new(state.db.clone(), state.hub.clone())
}

pub async fn list_videos(
    state: web::Data<AppState>,
    query: web::Query<ListVideosQuery>,
    viewer: Option<UserId>,
) -> Result<HttpResponse> {
    let filter = query.filter()?;
    let page = video_service(&state)
        .list(&filter, viewer.map(|v| v.0), query.page_params())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(page)))
}

/// Ranked home feed. Anonymous viewers get the same ranking without the
/// following boost.
pub async fn get_feed(
    state: web::Data<AppState>,
    query: web::Query<FeedQuery>,
    viewer: Option<UserId>,
) -> Result<HttpResponse> {
    let viewer_id = viewer.map(|v| v.0);
    let (limit, offset) = query.window();

    debug!(viewer_id = ?viewer_id, limit, offset, "Feed request");

    let page = state.feed.get_feed(viewer_id, limit, offset).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(page)))
}

pub async fn upload_video(
    state: web::Data<AppState>,
    user: UserId,
    payload: Multipart,
) -> Result<HttpResponse> {
    let form = UploadForm::read(payload, &state.storage).await?;
    let video = video_service(&state)
        .create(user.0, form, &state.storage)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::new(video)))
}

pub async fn get_video(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    viewer: Option<UserId>,
) -> Result<HttpResponse> {
    let video = video_service(&state)
        .get(path.into_inner(), viewer.map(|v| v.0))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(video)))
}

pub async fn update_video(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
    body: web::Json<VideoEdit>,
) -> Result<HttpResponse> {
    let video = video_service(&state)
        .update(path.into_inner(), user.0, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(video)))
}

/// Multipart form with a single `thumbnail` image
pub async fn upload_thumbnail(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
    payload: Multipart,
) -> Result<HttpResponse> {
    let stored = state
        .storage
        .save_single(MediaKind::Image, "thumbnail", payload)
        .await?;
    let video = video_service(&state)
        .set_thumbnail(path.into_inner(), user.0, &stored, &state.storage)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(video)))
}

pub async fn delete_video(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
) -> Result<HttpResponse> {
    video_service(&state)
        .delete(path.into_inner(), user.0, &state.storage)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Body is optional; an empty request records a view with no watch time.
pub async fn record_view(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    viewer: Option<UserId>,
    body: Option<web::Json<RecordViewRequest>>,
) -> Result<HttpResponse> {
    let watched_secs = body.and_then(|b| b.watched_secs);
    let view_count = video_service(&state)
        .record_view(path.into_inner(), viewer.map(|v| v.0), watched_secs)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(ViewCount { view_count })))
}

pub async fn like_video(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
) -> Result<HttpResponse> {
    let like = video_service(&state).like(path.into_inner(), user.0).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(like)))
}

pub async fn unlike_video(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
) -> Result<HttpResponse> {
    let like = video_service(&state)
        .unlike(path.into_inner(), user.0)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(like)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_query(sort: Option<&str>, q: Option<&str>) -> ListVideosQuery {
        ListVideosQuery {
            page: None,
            limit: None,
            q: q.map(str::to_string),
            category: Some("  ".into()),
            sort: sort.map(str::to_string),
        }
    }

    #[test]
    fn test_sort_parsing() {
        assert!(!list_query(None, None).filter().unwrap().popular);
        assert!(!list_query(Some("latest"), None).filter().unwrap().popular);
        assert!(list_query(Some("popular"), None).filter().unwrap().popular);
        assert!(list_query(Some("random"), None).filter().is_err());
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let filter = list_query(None, Some(" cats ")).filter().unwrap();
        assert_eq!(filter.query.as_deref(), Some("cats"));
        assert!(filter.category.is_none());
    }

    #[test]
    fn test_feed_window_clamps() {
        let q = FeedQuery {
            limit: None,
            offset: None,
        };
        assert_eq!(q.window(), (20, 0));

        let q = FeedQuery {
            limit: Some(0),
            offset: Some(40),
        };
        assert_eq!(q.window(), (1, 40));

        let q = FeedQuery {
            limit: Some(1000),
            offset: None,
        };
        assert_eq!(q.window(), (100, 0));
    }
}
