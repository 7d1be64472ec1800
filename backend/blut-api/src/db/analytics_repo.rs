use crate::models::{AnalyticsOverview, DailyPoint, TopVideo};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Lifetime counters for one video
#[derive(Debug, Clone, FromRow)]
pub struct VideoTotals {
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub total_watch_secs: i64,
    pub playback_count: i64,
}

pub async fn overview(
    pool: &PgPool,
    creator_id: Uuid,
    days: i32,
) -> Result<AnalyticsOverview, sqlx::Error> {
    sqlx::query_as::<_, AnalyticsOverview>(
        r#"
        WITH mine AS (SELECT id, view_count FROM videos WHERE creator_id = $1)
        SELECT
            (SELECT COUNT(*) FROM mine) AS total_videos,
            (SELECT COALESCE(SUM(view_count), 0)::BIGINT FROM mine) AS total_views,
            (SELECT COUNT(*) FROM likes l WHERE l.video_id IN (SELECT id FROM mine)) AS total_likes,
            (SELECT COUNT(*) FROM comments c WHERE c.video_id IN (SELECT id FROM mine)) AS total_comments,
            (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = $1) AS total_subscribers,
            (SELECT COALESCE(SUM(vv.watched_secs), 0)::BIGINT
               FROM video_views vv WHERE vv.video_id IN (SELECT id FROM mine)) AS total_watch_secs,
            (SELECT COUNT(*) FROM video_views vv
              WHERE vv.video_id IN (SELECT id FROM mine)
                AND vv.created_at >= NOW() - make_interval(days => $2)) AS period_views,
            (SELECT COUNT(*) FROM subscriptions s
              WHERE s.channel_id = $1
                AND s.created_at >= NOW() - make_interval(days => $2)) AS period_new_subscribers,
            $2 AS period_days
        "#,
    )
    .bind(creator_id)
    .bind(days)
    .fetch_one(pool)
    .await
}

pub async fn video_totals(pool: &PgPool, video_id: Uuid) -> Result<VideoTotals, sqlx::Error> {
    sqlx::query_as::<_, VideoTotals>(
        r#"
        SELECT v.view_count,
               (SELECT COUNT(*) FROM likes l WHERE l.video_id = v.id) AS like_count,
               (SELECT COUNT(*) FROM comments c WHERE c.video_id = v.id) AS comment_count,
               (SELECT COALESCE(SUM(vv.watched_secs), 0)::BIGINT
                  FROM video_views vv WHERE vv.video_id = v.id) AS total_watch_secs,
               (SELECT COUNT(*) FROM video_views vv WHERE vv.video_id = v.id) AS playback_count
        FROM videos v
        WHERE v.id = $1
        "#,
    )
    .bind(video_id)
    .fetch_one(pool)
    .await
}

/// Views and watch time per day for the last `days` days, today included.
/// Days without playback are present with zeros.
pub async fn daily_series(
    pool: &PgPool,
    video_id: Uuid,
    days: i32,
) -> Result<Vec<DailyPoint>, sqlx::Error> {
    sqlx::query_as::<_, DailyPoint>(
        r#"
        SELECT d.day::date AS day,
               COUNT(vv.id) AS views,
               COALESCE(SUM(vv.watched_secs), 0)::BIGINT AS watch_secs
        FROM generate_series(CURRENT_DATE - ($2 - 1), CURRENT_DATE, INTERVAL '1 day') AS d(day)
        LEFT JOIN video_views vv
          ON vv.video_id = $1 AND vv.created_at::date = d.day::date
        GROUP BY d.day
        ORDER BY d.day
        "#,
    )
    .bind(video_id)
    .bind(days)
    .fetch_all(pool)
    .await
}

pub async fn top_videos(
    pool: &PgPool,
    creator_id: Uuid,
    limit: i64,
) -> Result<Vec<TopVideo>, sqlx::Error> {
    sqlx::query_as::<_, TopVideo>(
        r#"
        SELECT v.id, v.title, v.thumbnail_url, v.view_count,
               (SELECT COUNT(*) FROM likes l WHERE l.video_id = v.id) AS like_count,
               (SELECT COUNT(*) FROM comments c WHERE c.video_id = v.id) AS comment_count
        FROM videos v
        WHERE v.creator_id = $1
        ORDER BY v.view_count DESC, v.created_at DESC
        LIMIT $2
        "#,
    )
    .bind(creator_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
