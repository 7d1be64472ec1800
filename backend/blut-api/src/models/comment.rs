use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub video_id: Uuid,
    pub user_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CommentAuthor {
    #[sqlx(rename = "user_id")]
    pub id: Uuid,
    #[sqlx(rename = "author_username")]
    pub username: String,
    #[sqlx(rename = "author_display_name")]
    pub display_name: Option<String>,
    #[sqlx(rename = "author_avatar_url")]
    pub avatar_url: Option<String>,
}

/// Comment with its author and number of direct replies
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CommentView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub comment: Comment,
    #[sqlx(flatten)]
    pub author: CommentAuthor,
    pub reply_count: i64,
}
