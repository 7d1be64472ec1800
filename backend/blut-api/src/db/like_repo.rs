use sqlx::PgPool;
use uuid::Uuid;

/// Like a video. Returns `true` only when a new like was recorded.
pub async fn create_like(pool: &PgPool, video_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO likes (id, video_id, user_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, video_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(video_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Remove a like. Returns `true` when a row was deleted.
pub async fn delete_like(pool: &PgPool, video_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM likes WHERE video_id = $1 AND user_id = $2")
        .bind(video_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_likes_by_video(pool: &PgPool, video_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM likes WHERE video_id = $1")
        .bind(video_id)
        .fetch_one(pool)
        .await
}

pub async fn has_liked(pool: &PgPool, video_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM likes WHERE video_id = $1 AND user_id = $2)",
    )
    .bind(video_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}
