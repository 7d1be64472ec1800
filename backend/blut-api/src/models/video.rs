use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Unlisted,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "unlisted" => Ok(Visibility::Unlisted),
            "private" => Ok(Visibility::Private),
            other => Err(format!("Unknown visibility '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Video {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub duration_secs: Option<i32>,
    pub visibility: String,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public.as_str()
    }

    pub fn is_private(&self) -> bool {
        self.visibility == Visibility::Private.as_str()
    }
}

/// Creator columns selected as `creator_*` next to a video row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VideoCreator {
    #[sqlx(rename = "creator_id")]
    pub id: Uuid,
    #[sqlx(rename = "creator_username")]
    pub username: String,
    #[sqlx(rename = "creator_display_name")]
    pub display_name: Option<String>,
    #[sqlx(rename = "creator_avatar_url")]
    pub avatar_url: Option<String>,
}

/// Video with creator summary and engagement counters
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VideoCard {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub video: Video,
    #[sqlx(flatten)]
    pub creator: VideoCreator,
    pub like_count: i64,
    pub comment_count: i64,
    pub liked_by_viewer: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_parse() {
        assert_eq!("Public".parse::<Visibility>().unwrap(), Visibility::Public);
        assert_eq!(" private ".parse::<Visibility>().unwrap(), Visibility::Private);
        assert!("secret".parse::<Visibility>().is_err());
    }

    #[test]
    fn test_visibility_serializes_lowercase() {
        let json = serde_json::to_string(&Visibility::Unlisted).unwrap();
        assert_eq!(json, "\"unlisted\"");
    }
}
