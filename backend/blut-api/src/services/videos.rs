/// Video catalogue: upload, playback bookkeeping, likes and owner edits
use crate::db::notification_repo::NewNotification;
use crate::db::video_repo::{self, NewVideo, VideoChanges, VideoFilter};
use crate::db::like_repo;
use crate::error::{AppError, Result};
use crate::models::{NotificationKind, PageParams, Paginated, Video, VideoCard, Visibility};
use crate::realtime::ChatHub;
use crate::services::storage::{MediaKind, MediaStorage, StoredFile};
use crate::services::NotificationService;
use actix_multipart::Multipart;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

pub const MAX_TITLE_LEN: usize = 120;
pub const MAX_DESCRIPTION_LEN: usize = 5000;
pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_LEN: usize = 32;
/// Room for the longest description in 4-byte characters.
const MAX_TEXT_FIELD_BYTES: usize = 4 * MAX_DESCRIPTION_LEN + 1024;
const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Serialize)]
pub struct LikeState {
    pub liked: bool,
    pub like_count: i64,
}

/// Fields of the upload form after the files have been written to disk
#[derive(Debug, Default)]
pub struct UploadForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub visibility: Option<String>,
    pub duration_secs: Option<String>,
    pub video: Option<StoredFile>,
    pub thumbnail: Option<StoredFile>,
}

impl UploadForm {
    /// Drain the multipart stream. Files already stored are removed again
    /// when a later part fails.
    pub async fn read(mut payload: Multipart, storage: &MediaStorage) -> Result<Self> {
        let mut form = UploadForm::default();
        if let Err(e) = form.read_parts(&mut payload, storage).await {
            form.discard(storage).await;
            return Err(e);
        }
        Ok(form)
    }

    async fn read_parts(&mut self, payload: &mut Multipart, storage: &MediaStorage) -> Result<()> {
        while let Some(item) = payload.next().await {
            let mut field = item?;
            let name = field.name().unwrap_or_default().to_string();

            match name.as_str() {
                "video" => {
                    let stored = storage.save_field(MediaKind::Video, &mut field).await?;
                    if let Some(old) = self.video.replace(stored) {
                        storage.remove_url(&old.url).await;
                    }
                }
                "thumbnail" => {
                    let stored = storage.save_field(MediaKind::Image, &mut field).await?;
                    if let Some(old) = self.thumbnail.replace(stored) {
                        storage.remove_url(&old.url).await;
                    }
                }
                "title" => self.title = Some(read_text(&mut field).await?),
                "description" => self.description = Some(read_text(&mut field).await?),
                "category" => self.category = Some(read_text(&mut field).await?),
                "tags" => self.tags = Some(read_text(&mut field).await?),
                "visibility" => self.visibility = Some(read_text(&mut field).await?),
                "duration_secs" => self.duration_secs = Some(read_text(&mut field).await?),
                other => {
                    warn!(field = %other, "Ignoring unknown upload field");
                    while let Some(chunk) = field.next().await {
                        chunk?;
                    }
                }
            }
        }
        Ok(())
    }

    pub async fn discard(&self, storage: &MediaStorage) {
        for file in [&self.video, &self.thumbnail].into_iter().flatten() {
            storage.remove_url(&file.url).await;
        }
    }
}

async fn read_text(field: &mut actix_multipart::Field) -> Result<String> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        let bytes = chunk?;
        if buf.len() + bytes.len() > MAX_TEXT_FIELD_BYTES {
            return Err(AppError::PayloadTooLarge(
                "Form field is too large".to_string(),
            ));
        }
        buf.extend_from_slice(&bytes);
    }
    String::from_utf8(buf)
        .map_err(|_| AppError::BadRequest("Form fields must be UTF-8".to_string()))
}

/// Comma-separated tags, trimmed, deduplicated case-insensitively.
pub fn parse_tags(raw: &str) -> Result<Vec<String>> {
    normalize_tags(raw.split(','))
}

pub fn normalize_tags<'a>(raw: impl IntoIterator<Item = &'a str>) -> Result<Vec<String>> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.into_iter().map(str::trim).filter(|t| !t.is_empty()) {
        if tag.chars().count() > MAX_TAG_LEN {
            return Err(AppError::Validation(format!(
                "Tags must be at most {MAX_TAG_LEN} characters"
            )));
        }
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            tags.push(tag.to_string());
        }
    }
    if tags.len() > MAX_TAGS {
        return Err(AppError::Validation(format!(
            "At most {MAX_TAGS} tags are allowed"
        )));
    }
    Ok(tags)
}

pub fn validate_title(title: &str) -> Result<&str> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title)
}

pub fn validate_description(description: &str) -> Result<&str> {
    let description = description.trim();
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(AppError::Validation(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(description)
}

pub fn parse_visibility(raw: &str) -> Result<Visibility> {
    raw.parse::<Visibility>().map_err(AppError::Validation)
}

fn parse_duration(raw: &str) -> Result<Option<i32>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let secs: f64 = raw
        .parse()
        .map_err(|_| AppError::Validation("duration_secs must be a number".to_string()))?;
    if !secs.is_finite() || secs < 0.0 || secs > i32::MAX as f64 {
        return Err(AppError::Validation(
            "duration_secs must be a non-negative number".to_string(),
        ));
    }
    Ok(Some(secs.round() as i32))
}

fn normalize_category(raw: Option<&str>) -> &str {
    raw.map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CATEGORY)
}

/// Owner edit of a video's metadata; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub visibility: Option<String>,
}

impl VideoEdit {
    pub fn into_changes(self) -> Result<VideoChanges> {
        Ok(VideoChanges {
            title: self
                .title
                .as_deref()
                .map(validate_title)
                .transpose()?
                .map(str::to_string),
            description: self
                .description
                .as_deref()
                .map(validate_description)
                .transpose()?
                .map(str::to_string),
            category: self
                .category
                .as_deref()
                .map(|c| normalize_category(Some(c)).to_string()),
            tags: self
                .tags
                .as_ref()
                .map(|tags| normalize_tags(tags.iter().map(String::as_str)))
                .transpose()?,
            visibility: self
                .visibility
                .as_deref()
                .map(parse_visibility)
                .transpose()?
                .map(|v| v.as_str().to_string()),
            thumbnail_url: None,
        })
    }
}

/// Private videos are visible to their creator only.
pub fn can_view(video: &Video, viewer_id: Option<Uuid>) -> bool {
    !video.is_private() || viewer_id == Some(video.creator_id)
}

pub struct VideoService {
    pool: PgPool,
    hub: ChatHub,
}

impl VideoService {
    pub fn new(pool: PgPool, hub: ChatHub) -> Self {
        Self { pool, hub }
    }

    pub async fn list(
        &self,
        filter: &VideoFilter,
        viewer_id: Option<Uuid>,
        params: PageParams,
    ) -> Result<Paginated<VideoCard>> {
        let (videos, total) = video_repo::list_public(
            &self.pool,
            filter,
            viewer_id,
            params.limit(),
            params.offset(),
        )
        .await?;
        Ok(Paginated::new(videos, params, total))
    }

    /// A video the viewer may see; private videos of others are 404.
    pub async fn visible_video(&self, video_id: Uuid, viewer_id: Option<Uuid>) -> Result<Video> {
        match video_repo::find_by_id(&self.pool, video_id).await? {
            Some(video) if can_view(&video, viewer_id) => Ok(video),
            _ => Err(AppError::NotFound("Video not found".to_string())),
        }
    }

    /// A video `user_id` owns: 404 when missing, 403 when someone else's.
    pub async fn owned_video(&self, video_id: Uuid, user_id: Uuid) -> Result<Video> {
        let video = video_repo::find_by_id(&self.pool, video_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;
        if video.creator_id != user_id {
            return Err(AppError::Forbidden(
                "Only the video owner can do that".to_string(),
            ));
        }
        Ok(video)
    }

    pub async fn get(&self, video_id: Uuid, viewer_id: Option<Uuid>) -> Result<VideoCard> {
        match video_repo::find_card(&self.pool, video_id, viewer_id).await? {
            Some(card) if can_view(&card.video, viewer_id) => Ok(card),
            _ => Err(AppError::NotFound("Video not found".to_string())),
        }
    }

    /// Persist an uploaded video and tell the creator's subscribers. The
    /// stored files are removed if the form does not validate.
    pub async fn create(
        &self,
        creator_id: Uuid,
        form: UploadForm,
        storage: &MediaStorage,
    ) -> Result<VideoCard> {
        let result = self.insert_from_form(creator_id, &form).await;
        let video = match result {
            Ok(video) => video,
            Err(e) => {
                form.discard(storage).await;
                return Err(e);
            }
        };

        info!(
            video_id = %video.id,
            creator_id = %creator_id,
            visibility = %video.visibility,
            "Video uploaded"
        );

        if video.is_public() {
            let message = format!("uploaded a new video: {}", video.title);
            match NotificationService::new(self.pool.clone(), self.hub.clone())
                .notify_subscribers(creator_id, video.id, &message)
                .await
            {
                Ok(count) => info!(video_id = %video.id, count, "Notified subscribers"),
                Err(e) => warn!(video_id = %video.id, "Failed to notify subscribers: {}", e),
            }
        }

        self.get(video.id, Some(creator_id)).await
    }

    async fn insert_from_form(&self, creator_id: Uuid, form: &UploadForm) -> Result<Video> {
        let video_file = form
            .video
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("A video file is required".to_string()))?;

        let title = validate_title(form.title.as_deref().unwrap_or_default())?;
        let description = validate_description(form.description.as_deref().unwrap_or_default())?;
        let category = normalize_category(form.category.as_deref());
        let tags = parse_tags(form.tags.as_deref().unwrap_or_default())?;
        let visibility = match form.visibility.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => parse_visibility(raw)?,
            _ => Visibility::Public,
        };
        let duration_secs = parse_duration(form.duration_secs.as_deref().unwrap_or_default())?;

        Ok(video_repo::insert_video(
            &self.pool,
            NewVideo {
                creator_id,
                title,
                description,
                category,
                tags: &tags,
                video_url: &video_file.url,
                thumbnail_url: form.thumbnail.as_ref().map(|t| t.url.as_str()),
                duration_secs,
                visibility: visibility.as_str(),
            },
        )
        .await?)
    }

    pub async fn update(&self, video_id: Uuid, user_id: Uuid, edit: VideoEdit) -> Result<VideoCard> {
        self.owned_video(video_id, user_id).await?;
        let changes = edit.into_changes()?;
        video_repo::update_video(&self.pool, video_id, &changes).await?;
        self.get(video_id, Some(user_id)).await
    }

    /// Replace the thumbnail with a freshly stored image. The new file is
    /// removed again when the video cannot be updated.
    pub async fn set_thumbnail(
        &self,
        video_id: Uuid,
        user_id: Uuid,
        stored: &StoredFile,
        storage: &MediaStorage,
    ) -> Result<VideoCard> {
        match self.swap_thumbnail(video_id, user_id, &stored.url).await {
            Ok(Some(old)) => storage.remove_url(&old).await,
            Ok(None) => {}
            Err(e) => {
                storage.remove_url(&stored.url).await;
                return Err(e);
            }
        }
        self.get(video_id, Some(user_id)).await
    }

    async fn swap_thumbnail(
        &self,
        video_id: Uuid,
        user_id: Uuid,
        url: &str,
    ) -> Result<Option<String>> {
        let video = self.owned_video(video_id, user_id).await?;
        let changes = VideoChanges {
            thumbnail_url: Some(url.to_string()),
            ..VideoChanges::default()
        };
        video_repo::update_video(&self.pool, video_id, &changes).await?;
        Ok(video.thumbnail_url)
    }

    /// Owner only. Rows cascade in the database; media files are removed here.
    pub async fn delete(&self, video_id: Uuid, user_id: Uuid, storage: &MediaStorage) -> Result<()> {
        let video = self.owned_video(video_id, user_id).await?;
        if !video_repo::delete_video(&self.pool, video_id).await? {
            return Err(AppError::NotFound("Video not found".to_string()));
        }

        storage.remove_url(&video.video_url).await;
        if let Some(thumbnail) = &video.thumbnail_url {
            storage.remove_url(thumbnail).await;
        }

        info!(video_id = %video_id, user_id = %user_id, "Video deleted");
        Ok(())
    }

    pub async fn record_view(
        &self,
        video_id: Uuid,
        viewer_id: Option<Uuid>,
        watched_secs: Option<f64>,
    ) -> Result<i64> {
        let video = self.visible_video(video_id, viewer_id).await?;

        let mut watched = watched_secs.unwrap_or(0.0);
        if !watched.is_finite() || watched < 0.0 {
            return Err(AppError::Validation(
                "watched_secs must be a non-negative number".to_string(),
            ));
        }
        if let Some(duration) = video.duration_secs {
            watched = watched.min(duration as f64);
        }

        Ok(video_repo::record_view(&self.pool, video_id, viewer_id, watched.round() as i32).await?)
    }

    /// Idempotent. The owner hears about the first like only, and never
    /// about their own.
    pub async fn like(&self, video_id: Uuid, user_id: Uuid) -> Result<LikeState> {
        let video = self.visible_video(video_id, Some(user_id)).await?;

        if like_repo::create_like(&self.pool, video_id, user_id).await? {
            NotificationService::new(self.pool.clone(), self.hub.clone())
                .notify_quietly(NewNotification {
                    recipient_id: video.creator_id,
                    actor_id: Some(user_id),
                    kind: NotificationKind::Like,
                    video_id: Some(video_id),
                    comment_id: None,
                    message: "liked your video",
                })
                .await;
        }

        Ok(LikeState {
            liked: true,
            like_count: like_repo::count_likes_by_video(&self.pool, video_id).await?,
        })
    }

    /// Idempotent.
    pub async fn unlike(&self, video_id: Uuid, user_id: Uuid) -> Result<LikeState> {
        self.visible_video(video_id, Some(user_id)).await?;
        like_repo::delete_like(&self.pool, video_id, user_id).await?;

        Ok(LikeState {
            liked: false,
            like_count: like_repo::count_likes_by_video(&self.pool, video_id).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn video(visibility: Visibility, creator_id: Uuid) -> Video {
        Video {
            id: Uuid::new_v4(),
            creator_id,
            title: "t".into(),
            description: String::new(),
            category: DEFAULT_CATEGORY.into(),
            tags: vec![],
            video_url: "http://localhost/uploads/a.mp4".into(),
            thumbnail_url: None,
            duration_secs: Some(60),
            visibility: visibility.as_str().into(),
            view_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_private_video_visible_to_owner_only() {
        let owner = Uuid::new_v4();
        let v = video(Visibility::Private, owner);
        assert!(can_view(&v, Some(owner)));
        assert!(!can_view(&v, Some(Uuid::new_v4())));
        assert!(!can_view(&v, None));

        let unlisted = video(Visibility::Unlisted, owner);
        assert!(can_view(&unlisted, None));
    }

    #[test]
    fn test_parse_tags() {
        let tags = parse_tags(" rust, Music ,, music,live ").unwrap();
        assert_eq!(tags, vec!["rust", "Music", "live"]);
        assert!(parse_tags("").unwrap().is_empty());

        let too_many = (0..=MAX_TAGS).map(|i| format!("t{i}")).collect::<Vec<_>>().join(",");
        assert!(parse_tags(&too_many).is_err());
    }

    #[test]
    fn test_validate_title() {
        assert_eq!(validate_title("  My clip ").unwrap(), "My clip");
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(MAX_TITLE_LEN + 1)).is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("").unwrap(), None);
        assert_eq!(parse_duration("12.6").unwrap(), Some(13));
        assert!(parse_duration("-1").is_err());
        assert!(parse_duration("abc").is_err());
    }

    #[test]
    fn test_edit_validates_present_fields_only() {
        let changes = VideoEdit {
            title: Some("  New title ".into()),
            tags: Some(vec!["a".into(), " A ".into(), "b".into()]),
            visibility: Some("Private".into()),
            ..VideoEdit::default()
        }
        .into_changes()
        .unwrap();
        assert_eq!(changes.title.as_deref(), Some("New title"));
        assert_eq!(changes.tags, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(changes.visibility.as_deref(), Some("private"));
        assert!(changes.description.is_none());
        assert!(changes.category.is_none());

        let bad = VideoEdit {
            title: Some("   ".into()),
            ..VideoEdit::default()
        };
        assert!(bad.into_changes().is_err());
    }

    #[test]
    fn test_parse_visibility_rejects_unknown() {
        assert_eq!(parse_visibility("unlisted").unwrap(), Visibility::Unlisted);
        assert!(matches!(parse_visibility("friends"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_longest_description_fits_form_field() {
        let description = "\u{1F3AC}".repeat(MAX_DESCRIPTION_LEN);
        assert_eq!(description.len(), 4 * MAX_DESCRIPTION_LEN);
        assert!(description.len() <= MAX_TEXT_FIELD_BYTES);
        assert!(validate_description(&description).is_ok());
    }
}
