//! Creator-authored notes and scenes over a video's timeline.
//!
//! Anyone who can see the video can read them; only its owner writes.

use crate::db::annotation_repo;
use crate::error::{AppError, Result};
use crate::models::{Note, Scene, Video};
use crate::realtime::ChatHub;
use crate::services::VideoService;
use sqlx::PgPool;
use uuid::Uuid;

pub const MAX_NOTE_LEN: usize = 1000;
pub const MAX_SCENE_TITLE_LEN: usize = 120;
pub const MAX_SCENE_DESCRIPTION_LEN: usize = 2000;

/// Partial scene edit, merged with the stored row before validation
#[derive(Debug, Clone, Default)]
pub struct SceneChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_secs: Option<f64>,
    pub end_secs: Option<f64>,
}

/// `timestamp_secs` must be non-negative and, when the duration is known,
/// no later than the end of the video.
pub fn validate_timestamp(video: &Video, timestamp_secs: f64) -> Result<()> {
    if !timestamp_secs.is_finite() || timestamp_secs < 0.0 {
        return Err(AppError::Validation(
            "timestamp_secs must be a non-negative number".to_string(),
        ));
    }
    if let Some(duration) = video.duration_secs {
        if timestamp_secs > duration as f64 {
            return Err(AppError::Validation(format!(
                "timestamp_secs must be within the video duration ({duration}s)"
            )));
        }
    }
    Ok(())
}

pub fn validate_range(video: &Video, start_secs: f64, end_secs: f64) -> Result<()> {
    if !start_secs.is_finite() || !end_secs.is_finite() || start_secs < 0.0 {
        return Err(AppError::Validation(
            "start_secs must be a non-negative number".to_string(),
        ));
    }
    if end_secs <= start_secs {
        return Err(AppError::Validation(
            "end_secs must be greater than start_secs".to_string(),
        ));
    }
    if let Some(duration) = video.duration_secs {
        if end_secs > duration as f64 {
            return Err(AppError::Validation(format!(
                "Scene must end within the video duration ({duration}s)"
            )));
        }
    }
    Ok(())
}

fn validate_note_content(content: &str) -> Result<&str> {
    let content = content.trim();
    if content.is_empty() || content.chars().count() > MAX_NOTE_LEN {
        return Err(AppError::Validation(format!(
            "Note content must be 1-{MAX_NOTE_LEN} characters"
        )));
    }
    Ok(content)
}

fn validate_scene_title(title: &str) -> Result<&str> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > MAX_SCENE_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "Scene title must be 1-{MAX_SCENE_TITLE_LEN} characters"
        )));
    }
    Ok(title)
}

fn normalize_description(description: Option<&str>) -> Result<Option<&str>> {
    match description.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) if d.chars().count() > MAX_SCENE_DESCRIPTION_LEN => Err(AppError::Validation(
            format!("Scene description must be at most {MAX_SCENE_DESCRIPTION_LEN} characters"),
        )),
        other => Ok(other),
    }
}

pub struct AnnotationService {
    pool: PgPool,
    videos: VideoService,
}

impl AnnotationService {
    pub fn new(pool: PgPool, hub: ChatHub) -> Self {
        Self {
            videos: VideoService::new(pool.clone(), hub),
            pool,
        }
    }

    pub async fn list_notes(&self, video_id: Uuid, viewer_id: Option<Uuid>) -> Result<Vec<Note>> {
        self.videos.visible_video(video_id, viewer_id).await?;
        Ok(annotation_repo::list_notes(&self.pool, video_id).await?)
    }

    pub async fn create_note(
        &self,
        video_id: Uuid,
        user_id: Uuid,
        timestamp_secs: f64,
        content: &str,
    ) -> Result<Note> {
        let video = self.videos.owned_video(video_id, user_id).await?;
        validate_timestamp(&video, timestamp_secs)?;
        let content = validate_note_content(content)?;
        Ok(annotation_repo::create_note(&self.pool, video_id, user_id, timestamp_secs, content).await?)
    }

    pub async fn update_note(
        &self,
        video_id: Uuid,
        note_id: Uuid,
        user_id: Uuid,
        timestamp_secs: Option<f64>,
        content: Option<&str>,
    ) -> Result<Note> {
        let video = self.videos.owned_video(video_id, user_id).await?;
        annotation_repo::find_note(&self.pool, video_id, note_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Note not found".to_string()))?;

        if let Some(ts) = timestamp_secs {
            validate_timestamp(&video, ts)?;
        }
        let content = content.map(validate_note_content).transpose()?;

        Ok(annotation_repo::update_note(&self.pool, note_id, timestamp_secs, content).await?)
    }

    pub async fn delete_note(&self, video_id: Uuid, note_id: Uuid, user_id: Uuid) -> Result<()> {
        self.videos.owned_video(video_id, user_id).await?;
        if annotation_repo::delete_note(&self.pool, video_id, note_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Note not found".to_string()))
        }
    }

    /// Ordered by start time
    pub async fn list_scenes(&self, video_id: Uuid, viewer_id: Option<Uuid>) -> Result<Vec<Scene>> {
        self.videos.visible_video(video_id, viewer_id).await?;
        Ok(annotation_repo::list_scenes(&self.pool, video_id).await?)
    }

    pub async fn create_scene(
        &self,
        video_id: Uuid,
        user_id: Uuid,
        title: &str,
        description: Option<&str>,
        start_secs: f64,
        end_secs: f64,
    ) -> Result<Scene> {
        let video = self.videos.owned_video(video_id, user_id).await?;
        let title = validate_scene_title(title)?;
        let description = normalize_description(description)?;
        validate_range(&video, start_secs, end_secs)?;

        Ok(annotation_repo::create_scene(
            &self.pool,
            video_id,
            user_id,
            title,
            description,
            start_secs,
            end_secs,
        )
        .await?)
    }

    pub async fn update_scene(
        &self,
        video_id: Uuid,
        scene_id: Uuid,
        user_id: Uuid,
        changes: SceneChanges,
    ) -> Result<Scene> {
        let video = self.videos.owned_video(video_id, user_id).await?;
        let current = annotation_repo::find_scene(&self.pool, video_id, scene_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Scene not found".to_string()))?;

        let title = validate_scene_title(changes.title.as_deref().unwrap_or(&current.title))?;
        let description = match changes.description.as_deref() {
            Some(d) => normalize_description(Some(d))?,
            None => current.description.as_deref(),
        };
        let start_secs = changes.start_secs.unwrap_or(current.start_secs);
        let end_secs = changes.end_secs.unwrap_or(current.end_secs);
        validate_range(&video, start_secs, end_secs)?;

        Ok(annotation_repo::update_scene(
            &self.pool,
            scene_id,
            title,
            description,
            start_secs,
            end_secs,
        )
        .await?)
    }

    pub async fn delete_scene(&self, video_id: Uuid, scene_id: Uuid, user_id: Uuid) -> Result<()> {
        self.videos.owned_video(video_id, user_id).await?;
        if annotation_repo::delete_scene(&self.pool, video_id, scene_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Scene not found".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn video(duration_secs: Option<i32>) -> Video {
        Video {
            id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            title: "t".into(),
            description: String::new(),
            category: "General".into(),
            tags: vec![],
            video_url: "u".into(),
            thumbnail_url: None,
            duration_secs,
            visibility: "public".into(),
            view_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_timestamp_within_duration() {
        let v = video(Some(90));
        assert!(validate_timestamp(&v, 0.0).is_ok());
        assert!(validate_timestamp(&v, 90.0).is_ok());
        assert!(validate_timestamp(&v, 90.5).is_err());
        assert!(validate_timestamp(&v, -1.0).is_err());
        assert!(validate_timestamp(&v, f64::NAN).is_err());
    }

    #[test]
    fn test_timestamp_without_known_duration() {
        assert!(validate_timestamp(&video(None), 100_000.0).is_ok());
    }

    #[test]
    fn test_scene_range() {
        let v = video(Some(60));
        assert!(validate_range(&v, 0.0, 10.0).is_ok());
        assert!(validate_range(&v, 10.0, 10.0).is_err());
        assert!(validate_range(&v, 20.0, 10.0).is_err());
        assert!(validate_range(&v, 50.0, 61.0).is_err());
        assert!(validate_range(&video(None), 5.0, 6.0).is_ok());
    }

    #[test]
    fn test_blank_description_is_dropped() {
        assert_eq!(normalize_description(Some("   ")).unwrap(), None);
        assert_eq!(normalize_description(Some(" intro ")).unwrap(), Some("intro"));
    }
}
