/// Creator analytics: channel overview, per-video stats and top videos
use crate::db::analytics_repo::{self, VideoTotals};
use crate::error::Result;
use crate::models::{AnalyticsOverview, DailyPoint, TopVideo, Video, VideoAnalytics};
use crate::realtime::ChatHub;
use crate::services::VideoService;
use sqlx::PgPool;
use uuid::Uuid;

pub const DEFAULT_PERIOD_DAYS: i32 = 30;
pub const MAX_PERIOD_DAYS: i32 = 365;
pub const DEFAULT_TOP_LIMIT: i64 = 5;
pub const MAX_TOP_LIMIT: i64 = 50;

pub fn period_days(days: Option<i32>) -> i32 {
    days.unwrap_or(DEFAULT_PERIOD_DAYS).clamp(1, MAX_PERIOD_DAYS)
}

pub fn top_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, MAX_TOP_LIMIT)
}

fn average_watch_secs(totals: &VideoTotals) -> f64 {
    if totals.playback_count == 0 {
        0.0
    } else {
        totals.total_watch_secs as f64 / totals.playback_count as f64
    }
}

fn build_video_analytics(
    video: Video,
    totals: VideoTotals,
    days: i32,
    daily: Vec<DailyPoint>,
) -> VideoAnalytics {
    VideoAnalytics {
        video_id: video.id,
        title: video.title,
        view_count: totals.view_count,
        like_count: totals.like_count,
        comment_count: totals.comment_count,
        total_watch_secs: totals.total_watch_secs,
        average_watch_secs: average_watch_secs(&totals),
        period_days: days,
        daily,
    }
}

pub struct AnalyticsService {
    pool: PgPool,
    videos: VideoService,
}

impl AnalyticsService {
    pub fn new(pool: PgPool, hub: ChatHub) -> Self {
        Self {
            videos: VideoService::new(pool.clone(), hub),
            pool,
        }
    }

    pub async fn overview(&self, creator_id: Uuid, days: Option<i32>) -> Result<AnalyticsOverview> {
        Ok(analytics_repo::overview(&self.pool, creator_id, period_days(days)).await?)
    }

    /// Owner only; other users get the same answers as for editing.
    pub async fn video(&self, video_id: Uuid, user_id: Uuid, days: Option<i32>) -> Result<VideoAnalytics> {
        let video = self.videos.owned_video(video_id, user_id).await?;
        let days = period_days(days);

        let totals = analytics_repo::video_totals(&self.pool, video_id).await?;
        let daily = analytics_repo::daily_series(&self.pool, video_id, days).await?;

        Ok(build_video_analytics(video, totals, days, daily))
    }

    pub async fn top_videos(&self, creator_id: Uuid, limit: Option<i64>) -> Result<Vec<TopVideo>> {
        Ok(analytics_repo::top_videos(&self.pool, creator_id, top_limit(limit)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(total_watch_secs: i64, playback_count: i64) -> VideoTotals {
        VideoTotals {
            view_count: 12,
            like_count: 3,
            comment_count: 1,
            total_watch_secs,
            playback_count,
        }
    }

    #[test]
    fn test_period_and_limit_clamps() {
        assert_eq!(period_days(None), 30);
        assert_eq!(period_days(Some(0)), 1);
        assert_eq!(period_days(Some(1000)), 365);
        assert_eq!(top_limit(None), 5);
        assert_eq!(top_limit(Some(-3)), 1);
        assert_eq!(top_limit(Some(80)), 50);
    }

    #[test]
    fn test_average_watch_time() {
        assert_eq!(average_watch_secs(&totals(0, 0)), 0.0);
        assert!((average_watch_secs(&totals(90, 4)) - 22.5).abs() < f64::EPSILON);
    }
}
