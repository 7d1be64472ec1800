use crate::db::user_repo::escape_like;
use crate::models::{Video, VideoCard};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const VIDEO_COLUMNS: &str = "v.id, v.creator_id, v.title, v.description, v.category, v.tags, \
     v.video_url, v.thumbnail_url, v.duration_secs, v.visibility, v.view_count, \
     v.created_at, v.updated_at";

/// `SELECT ... FROM videos v JOIN users u` producing a `VideoCard`.
/// `$viewer_param` is the placeholder holding the (nullable) viewer id.
fn card_select(viewer_param: usize) -> String {
    format!(
        r#"
        SELECT {VIDEO_COLUMNS},
               u.username AS creator_username,
               u.display_name AS creator_display_name,
               u.avatar_url AS creator_avatar_url,
               (SELECT COUNT(*) FROM likes l WHERE l.video_id = v.id) AS like_count,
               (SELECT COUNT(*) FROM comments c WHERE c.video_id = v.id) AS comment_count,
               EXISTS(SELECT 1 FROM likes l
                       WHERE l.video_id = v.id AND l.user_id = ${viewer_param}) AS liked_by_viewer
        FROM videos v
        JOIN users u ON u.id = v.creator_id
        "#
    )
}

#[derive(Debug, Clone)]
pub struct NewVideo<'a> {
    pub creator_id: Uuid,
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub tags: &'a [String],
    pub video_url: &'a str,
    pub thumbnail_url: Option<&'a str>,
    pub duration_secs: Option<i32>,
    pub visibility: &'a str,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct VideoChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub visibility: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Listing filter for the public catalogue
#[derive(Debug, Clone, Default)]
pub struct VideoFilter {
    pub query: Option<String>,
    pub category: Option<String>,
    pub popular: bool,
}

/// Aggregates the feed ranker needs for one candidate
#[derive(Debug, Clone, FromRow)]
pub struct FeedCandidateRow {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub view_count: i64,
    pub early_likes: i64,
    pub early_views: i64,
    pub playback_count: i64,
    pub is_following: bool,
}

pub async fn insert_video(pool: &PgPool, new: NewVideo<'_>) -> Result<Video, sqlx::Error> {
    sqlx::query_as::<_, Video>(
        r#"
        INSERT INTO videos (id, creator_id, title, description, category, tags,
                            video_url, thumbnail_url, duration_secs, visibility)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id, creator_id, title, description, category, tags, video_url,
                  thumbnail_url, duration_secs, visibility, view_count, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.creator_id)
    .bind(new.title)
    .bind(new.description)
    .bind(new.category)
    .bind(new.tags)
    .bind(new.video_url)
    .bind(new.thumbnail_url)
    .bind(new.duration_secs)
    .bind(new.visibility)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, video_id: Uuid) -> Result<Option<Video>, sqlx::Error> {
    sqlx::query_as::<_, Video>(&format!(
        "SELECT {VIDEO_COLUMNS} FROM videos v WHERE v.id = $1"
    ))
    .bind(video_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_card(
    pool: &PgPool,
    video_id: Uuid,
    viewer_id: Option<Uuid>,
) -> Result<Option<VideoCard>, sqlx::Error> {
    sqlx::query_as::<_, VideoCard>(&format!("{} WHERE v.id = $1", card_select(2)))
        .bind(video_id)
        .bind(viewer_id)
        .fetch_optional(pool)
        .await
}

/// Public catalogue with optional text search, category filter and sort.
pub async fn list_public(
    pool: &PgPool,
    filter: &VideoFilter,
    viewer_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<VideoCard>, i64), sqlx::Error> {
    let pattern = filter
        .query
        .as_deref()
        .map(|q| format!("%{}%", escape_like(q)));

    const WHERE: &str = r#"
        WHERE v.visibility = 'public'
          AND ($1::text IS NULL
               OR v.title ILIKE $1
               OR v.description ILIKE $1
               OR EXISTS (SELECT 1 FROM unnest(v.tags) t WHERE t ILIKE $1))
          AND ($2::text IS NULL OR LOWER(v.category) = LOWER($2))
    "#;

    let order = if filter.popular {
        "ORDER BY v.view_count DESC, v.created_at DESC"
    } else {
        "ORDER BY v.created_at DESC"
    };

    let videos = sqlx::query_as::<_, VideoCard>(&format!(
        "{} {WHERE} {order} LIMIT $3 OFFSET $4",
        card_select(5)
    ))
    .bind(pattern.as_deref())
    .bind(filter.category.as_deref())
    .bind(limit)
    .bind(offset)
    .bind(viewer_id)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM videos v {WHERE}"))
        .bind(pattern.as_deref())
        .bind(filter.category.as_deref())
        .fetch_one(pool)
        .await?;

    Ok((videos, total))
}

/// A channel's uploads. Hidden (unlisted/private) ones only when
/// `include_hidden` is set, i.e. the owner is looking.
pub async fn list_by_creator(
    pool: &PgPool,
    creator_id: Uuid,
    include_hidden: bool,
    viewer_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<VideoCard>, i64), sqlx::Error> {
    const WHERE: &str = "WHERE v.creator_id = $2 AND ($3 OR v.visibility = 'public')";

    let videos = sqlx::query_as::<_, VideoCard>(&format!(
        "{} {WHERE} ORDER BY v.created_at DESC LIMIT $4 OFFSET $5",
        card_select(1)
    ))
    .bind(viewer_id)
    .bind(creator_id)
    .bind(include_hidden)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM videos v WHERE v.creator_id = $1 AND ($2 OR v.visibility = 'public')",
    )
    .bind(creator_id)
    .bind(include_hidden)
    .fetch_one(pool)
    .await?;

    Ok((videos, total))
}

/// Videos `user_id` liked, most recent like first. Private videos of other
/// creators are left out.
pub async fn list_liked_by(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<(Vec<VideoCard>, i64), sqlx::Error> {
    let videos = sqlx::query_as::<_, VideoCard>(&format!(
        r#"{}
        JOIN likes mine ON mine.video_id = v.id AND mine.user_id = $1
        WHERE v.visibility <> 'private' OR v.creator_id = $1
        ORDER BY mine.created_at DESC
        LIMIT $2 OFFSET $3"#,
        card_select(1)
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM likes l
        JOIN videos v ON v.id = l.video_id
        WHERE l.user_id = $1 AND (v.visibility <> 'private' OR v.creator_id = $1)
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok((videos, total))
}

/// Cards for a set of ids; order is not preserved.
pub async fn find_cards_by_ids(
    pool: &PgPool,
    ids: &[Uuid],
    viewer_id: Option<Uuid>,
) -> Result<Vec<VideoCard>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, VideoCard>(&format!(
        "{} WHERE v.id = ANY($2) AND v.visibility = 'public'",
        card_select(1)
    ))
    .bind(viewer_id)
    .bind(ids)
    .fetch_all(pool)
    .await
}

pub async fn update_video(
    pool: &PgPool,
    video_id: Uuid,
    changes: &VideoChanges,
) -> Result<Video, sqlx::Error> {
    sqlx::query_as::<_, Video>(
        r#"
        UPDATE videos
        SET title = COALESCE($2, title),
            description = COALESCE($3, description),
            category = COALESCE($4, category),
            tags = COALESCE($5, tags),
            visibility = COALESCE($6, visibility),
            thumbnail_url = COALESCE($7, thumbnail_url),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, creator_id, title, description, category, tags, video_url,
                  thumbnail_url, duration_secs, visibility, view_count, created_at, updated_at
        "#,
    )
    .bind(video_id)
    .bind(changes.title.as_deref())
    .bind(changes.description.as_deref())
    .bind(changes.category.as_deref())
    .bind(changes.tags.as_deref())
    .bind(changes.visibility.as_deref())
    .bind(changes.thumbnail_url.as_deref())
    .fetch_one(pool)
    .await
}

/// Delete a video; dependent rows go with it through `ON DELETE CASCADE`.
pub async fn delete_video(pool: &PgPool, video_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM videos WHERE id = $1")
        .bind(video_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Record one playback and bump the counter in a single statement.
/// Returns the new `view_count`.
pub async fn record_view(
    pool: &PgPool,
    video_id: Uuid,
    viewer_id: Option<Uuid>,
    watched_secs: i32,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        WITH playback AS (
            INSERT INTO video_views (id, video_id, viewer_id, watched_secs)
            VALUES ($1, $2, $3, $4)
        )
        UPDATE videos SET view_count = view_count + 1
        WHERE id = $2
        RETURNING view_count
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(video_id)
    .bind(viewer_id)
    .bind(watched_secs)
    .fetch_one(pool)
    .await
}

/// Newest public videos with the aggregates the feed score is built from.
pub async fn feed_candidates(
    pool: &PgPool,
    viewer_id: Option<Uuid>,
    max_candidates: i64,
) -> Result<Vec<FeedCandidateRow>, sqlx::Error> {
    sqlx::query_as::<_, FeedCandidateRow>(
        r#"
        SELECT v.id, v.created_at, v.view_count,
               (SELECT COUNT(*) FROM likes l
                 WHERE l.video_id = v.id
                   AND l.created_at < v.created_at + INTERVAL '24 hours') AS early_likes,
               (SELECT COUNT(*) FROM video_views vv
                 WHERE vv.video_id = v.id
                   AND vv.created_at < v.created_at + INTERVAL '24 hours') AS early_views,
               (SELECT COUNT(*) FROM video_views vv WHERE vv.video_id = v.id) AS playback_count,
               EXISTS(SELECT 1 FROM subscriptions s
                       WHERE s.channel_id = v.creator_id AND s.subscriber_id = $1) AS is_following
        FROM videos v
        WHERE v.visibility = 'public'
        ORDER BY v.created_at DESC
        LIMIT $2
        "#,
    )
    .bind(viewer_id)
    .bind(max_candidates)
    .fetch_all(pool)
    .await
}
