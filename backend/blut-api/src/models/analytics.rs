use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Channel-wide totals plus activity inside the requested window
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AnalyticsOverview {
    pub total_videos: i64,
    pub total_views: i64,
    pub total_likes: i64,
    pub total_comments: i64,
    pub total_subscribers: i64,
    pub total_watch_secs: i64,
    pub period_views: i64,
    pub period_new_subscribers: i64,
    pub period_days: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DailyPoint {
    pub day: NaiveDate,
    pub views: i64,
    pub watch_secs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoAnalytics {
    pub video_id: Uuid,
    pub title: String,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub total_watch_secs: i64,
    pub average_watch_secs: f64,
    pub period_days: i32,
    pub daily: Vec<DailyPoint>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TopVideo {
    pub id: Uuid,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
}
