//! Creator-authored timestamp annotations over video playback.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A remark pinned to a single playback position
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Note {
    pub id: Uuid,
    pub video_id: Uuid,
    pub author_id: Uuid,
    pub timestamp_secs: f64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A titled `[start_secs, end_secs)` range of a video
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Scene {
    pub id: Uuid,
    pub video_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_secs: f64,
    pub end_secs: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
