use crate::models::{Notification, NotificationKind};
use sqlx::PgPool;
use uuid::Uuid;

const SELECT_WITH_ACTOR: &str = r#"
    SELECT n.id, n.recipient_id, n.actor_id, n.kind, n.video_id, n.comment_id,
           n.message, n.is_read, n.created_at,
           a.username AS actor_username, a.avatar_url AS actor_avatar_url
"#;

#[derive(Debug, Clone)]
pub struct NewNotification<'a> {
    pub recipient_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub video_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub message: &'a str,
}

pub async fn insert(pool: &PgPool, new: &NewNotification<'_>) -> Result<Notification, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&format!(
        r#"
        WITH n AS (
            INSERT INTO notifications (id, recipient_id, actor_id, kind, video_id, comment_id, message)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
        )
        {SELECT_WITH_ACTOR}
        FROM n LEFT JOIN users a ON a.id = n.actor_id
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(new.recipient_id)
    .bind(new.actor_id)
    .bind(new.kind.as_str())
    .bind(new.video_id)
    .bind(new.comment_id)
    .bind(new.message)
    .fetch_one(pool)
    .await
}

/// One `new_video` notification per subscriber of `channel_id`.
pub async fn insert_for_subscribers(
    pool: &PgPool,
    channel_id: Uuid,
    video_id: Uuid,
    message: &str,
) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&format!(
        r#"
        WITH n AS (
            INSERT INTO notifications (id, recipient_id, actor_id, kind, video_id, message)
            SELECT gen_random_uuid(), s.subscriber_id, $1, $2, $3, $4
            FROM subscriptions s
            WHERE s.channel_id = $1 AND s.subscriber_id <> $1
            RETURNING *
        )
        {SELECT_WITH_ACTOR}
        FROM n LEFT JOIN users a ON a.id = n.actor_id
        "#
    ))
    .bind(channel_id)
    .bind(NotificationKind::NewVideo.as_str())
    .bind(video_id)
    .bind(message)
    .fetch_all(pool)
    .await
}

pub async fn list(
    pool: &PgPool,
    recipient_id: Uuid,
    unread_only: bool,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Notification>, i64), sqlx::Error> {
    let items = sqlx::query_as::<_, Notification>(&format!(
        r#"
        {SELECT_WITH_ACTOR}
        FROM notifications n
        LEFT JOIN users a ON a.id = n.actor_id
        WHERE n.recipient_id = $1 AND (NOT $2 OR n.is_read = FALSE)
        ORDER BY n.created_at DESC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(recipient_id)
    .bind(unread_only)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND (NOT $2 OR is_read = FALSE)",
    )
    .bind(recipient_id)
    .bind(unread_only)
    .fetch_one(pool)
    .await?;

    Ok((items, total))
}

pub async fn unread_count(pool: &PgPool, recipient_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = FALSE",
    )
    .bind(recipient_id)
    .fetch_one(pool)
    .await
}

/// Returns `false` when the notification does not exist for this recipient.
pub async fn mark_read(pool: &PgPool, id: Uuid, recipient_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND recipient_id = $2",
    )
    .bind(id)
    .bind(recipient_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_all_read(pool: &PgPool, recipient_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND is_read = FALSE",
    )
    .bind(recipient_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete(pool: &PgPool, id: Uuid, recipient_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND recipient_id = $2")
        .bind(id)
        .bind(recipient_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn clear(pool: &PgPool, recipient_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM notifications WHERE recipient_id = $1")
        .bind(recipient_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
