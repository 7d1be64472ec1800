use crate::models::{Comment, CommentView};
use sqlx::PgPool;
use uuid::Uuid;

const COMMENT_COLUMNS: &str =
    "c.id, c.video_id, c.user_id, c.parent_id, c.content, c.created_at, c.updated_at";

fn view_select() -> String {
    format!(
        r#"
        SELECT {COMMENT_COLUMNS},
               u.username AS author_username,
               u.display_name AS author_display_name,
               u.avatar_url AS author_avatar_url,
               (SELECT COUNT(*) FROM comments r WHERE r.parent_id = c.id) AS reply_count
        FROM comments c
        JOIN users u ON u.id = c.user_id
        "#
    )
}

/// Create a new comment on a video (or a reply when `parent_id` is set)
pub async fn create_comment(
    pool: &PgPool,
    video_id: Uuid,
    user_id: Uuid,
    content: &str,
    parent_id: Option<Uuid>,
) -> Result<Comment, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (id, video_id, user_id, parent_id, content)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, video_id, user_id, parent_id, content, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(video_id)
    .bind(user_id)
    .bind(parent_id)
    .bind(content)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, comment_id: Uuid) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.id = $1"
    ))
    .bind(comment_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_view(pool: &PgPool, comment_id: Uuid) -> Result<Option<CommentView>, sqlx::Error> {
    sqlx::query_as::<_, CommentView>(&format!("{} WHERE c.id = $1", view_select()))
        .bind(comment_id)
        .fetch_optional(pool)
        .await
}

/// Top-level comments of a video, newest first
pub async fn list_top_level(
    pool: &PgPool,
    video_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<(Vec<CommentView>, i64), sqlx::Error> {
    let comments = sqlx::query_as::<_, CommentView>(&format!(
        "{} WHERE c.video_id = $1 AND c.parent_id IS NULL \
         ORDER BY c.created_at DESC LIMIT $2 OFFSET $3",
        view_select()
    ))
    .bind(video_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM comments WHERE video_id = $1 AND parent_id IS NULL",
    )
    .bind(video_id)
    .fetch_one(pool)
    .await?;

    Ok((comments, total))
}

/// Direct replies to a comment, oldest first
pub async fn list_replies(
    pool: &PgPool,
    parent_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<(Vec<CommentView>, i64), sqlx::Error> {
    let replies = sqlx::query_as::<_, CommentView>(&format!(
        "{} WHERE c.parent_id = $1 ORDER BY c.created_at ASC LIMIT $2 OFFSET $3",
        view_select()
    ))
    .bind(parent_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE parent_id = $1")
        .bind(parent_id)
        .fetch_one(pool)
        .await?;

    Ok((replies, total))
}

pub async fn update_content(
    pool: &PgPool,
    comment_id: Uuid,
    content: &str,
) -> Result<Comment, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        UPDATE comments SET content = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING id, video_id, user_id, parent_id, content, created_at, updated_at
        "#,
    )
    .bind(comment_id)
    .bind(content)
    .fetch_one(pool)
    .await
}

/// Delete a comment; its replies cascade.
pub async fn delete_comment(pool: &PgPool, comment_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
