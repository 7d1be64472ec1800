//! Local-disk media storage for uploaded videos, thumbnails and avatars.
//!
//! Files are written under `storage.upload_dir` with a generated name and
//! served back from `/uploads/{file}`. The stored URL is
//! `{public_base_url}/uploads/{file}`.

use actix_multipart::{Field, Multipart};
use futures_util::StreamExt;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::{Config, StorageConfig};
use crate::error::{AppError, Result};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            MediaKind::Video => VIDEO_EXTENSIONS,
            MediaKind::Image => IMAGE_EXTENSIONS,
        }
    }

    fn label(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image => "image",
        }
    }
}

/// A file written to the upload directory
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_name: String,
    pub url: String,
    pub size_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    public_base_url: String,
    max_video_bytes: usize,
    max_image_bytes: usize,
}

impl MediaStorage {
    pub fn new(config: &StorageConfig, public_base_url: &str) -> Self {
        Self {
            root: config.upload_dir.clone(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            max_video_bytes: config.max_video_bytes,
            max_image_bytes: config.max_image_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.storage, &config.app.public_base_url)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    fn max_bytes(&self, kind: MediaKind) -> usize {
        match kind {
            MediaKind::Video => self.max_video_bytes,
            MediaKind::Image => self.max_image_bytes,
        }
    }

    /// Lowercased extension of `file_name` if `kind` accepts it.
    pub fn validate_extension(kind: MediaKind, file_name: &str) -> Result<String> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| {
                AppError::BadRequest(format!("The {} file has no extension", kind.label()))
            })?;

        if kind.allowed_extensions().contains(&ext.as_str()) {
            Ok(ext)
        } else {
            Err(AppError::BadRequest(format!(
                "Unsupported {} type '.{}' (allowed: {})",
                kind.label(),
                ext,
                kind.allowed_extensions().join(", ")
            )))
        }
    }

    /// Stream one multipart file field to disk, enforcing the size cap.
    /// A partial file is removed when the upload fails.
    pub async fn save_field(&self, kind: MediaKind, field: &mut Field) -> Result<StoredFile> {
        let original = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::BadRequest(format!("The {} field must be a file", kind.label()))
            })?;
        let ext = Self::validate_extension(kind, &original)?;

        let file_name = format!("{}.{}", Uuid::new_v4(), ext);
        let path = self.root.join(&file_name);

        match self.write_stream(kind, field, &path).await {
            Ok(size_bytes) => {
                tracing::info!(
                    file_name = %file_name,
                    size_bytes,
                    kind = kind.label(),
                    "media file stored"
                );
                Ok(StoredFile {
                    url: self.url_for(&file_name),
                    file_name,
                    size_bytes,
                })
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&path).await;
                Err(e)
            }
        }
    }

    /// Store the file part named `field_name` of a single-file form such as
    /// an avatar upload. Other parts are drained and ignored.
    pub async fn save_single(
        &self,
        kind: MediaKind,
        field_name: &str,
        mut payload: Multipart,
    ) -> Result<StoredFile> {
        let mut stored: Option<StoredFile> = None;

        while let Some(item) = payload.next().await {
            let result = match item {
                Ok(mut field) if field.name() == Some(field_name) => {
                    self.save_field(kind, &mut field).await.map(Some)
                }
                Ok(mut field) => drain(&mut field).await.map(|_| None),
                Err(e) => Err(e.into()),
            };

            match result {
                Ok(Some(file)) => {
                    if let Some(old) = stored.replace(file) {
                        self.remove_url(&old.url).await;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    if let Some(file) = &stored {
                        self.remove_url(&file.url).await;
                    }
                    return Err(e);
                }
            }
        }

        stored.ok_or_else(|| AppError::BadRequest(format!("A '{field_name}' file is required")))
    }

    async fn write_stream(&self, kind: MediaKind, field: &mut Field, path: &Path) -> Result<usize> {
        let max = self.max_bytes(kind);
        let mut file = tokio::fs::File::create(path).await?;
        let mut total: usize = 0;

        while let Some(chunk) = field.next().await {
            let bytes = chunk?;
            total += bytes.len();
            if total > max {
                return Err(AppError::PayloadTooLarge(format!(
                    "The {} exceeds the {} byte limit",
                    kind.label(),
                    max
                )));
            }
            file.write_all(&bytes).await?;
        }

        if total == 0 {
            return Err(AppError::BadRequest(format!(
                "The {} file is empty",
                kind.label()
            )));
        }

        file.flush().await?;
        Ok(total)
    }

    pub fn url_for(&self, file_name: &str) -> String {
        format!("{}/uploads/{}", self.public_base_url, file_name)
    }

    /// File name behind one of our own URLs; foreign URLs give `None`.
    pub fn file_name_from_url(&self, url: &str) -> Option<String> {
        let prefix = format!("{}/uploads/", self.public_base_url);
        let name = url.strip_prefix(&prefix)?;
        Self::is_plain_file_name(name).then(|| name.to_string())
    }

    /// Best-effort removal of a stored file given its URL.
    pub async fn remove_url(&self, url: &str) {
        let Some(file_name) = self.file_name_from_url(url) else {
            return;
        };
        match tokio::fs::remove_file(self.root.join(&file_name)).await {
            Ok(()) => tracing::debug!(file_name = %file_name, "media file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(file_name = %file_name, "failed to remove media file: {}", e),
        }
    }

    fn is_plain_file_name(name: &str) -> bool {
        let mut components = Path::new(name).components();
        matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) && !name.contains('\\')
    }

    /// Path for a served file name. Anything that is not a single plain
    /// component is treated as missing.
    pub fn resolve(&self, file_name: &str) -> Result<PathBuf> {
        if !Self::is_plain_file_name(file_name) {
            return Err(AppError::NotFound("File not found".to_string()));
        }
        Ok(self.root.join(file_name))
    }

    pub fn content_type(file_name: &str) -> mime::Mime {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let parsed = match ext.as_deref() {
            Some("jpg") | Some("jpeg") => return mime::IMAGE_JPEG,
            Some("png") => return mime::IMAGE_PNG,
            Some("gif") => return mime::IMAGE_GIF,
            Some("webp") => "image/webp".parse(),
            Some("mp4") => "video/mp4".parse(),
            Some("webm") => "video/webm".parse(),
            Some("mov") => "video/quicktime".parse(),
            Some("mkv") => "video/x-matroska".parse(),
            _ => return mime::APPLICATION_OCTET_STREAM,
        };
        parsed.unwrap_or(mime::APPLICATION_OCTET_STREAM)
    }
}

async fn drain(field: &mut Field) -> Result<()> {
    while let Some(chunk) = field.next().await {
        chunk?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> MediaStorage {
        MediaStorage::new(
            &StorageConfig {
                upload_dir: PathBuf::from("/tmp/blut-uploads"),
                max_video_bytes: 1024,
                max_image_bytes: 512,
            },
            "http://localhost:5000/",
        )
    }

    #[test]
    fn test_extension_allowlists() {
        assert_eq!(
            MediaStorage::validate_extension(MediaKind::Video, "clip.MP4").unwrap(),
            "mp4"
        );
        assert!(MediaStorage::validate_extension(MediaKind::Video, "clip.avi").is_err());
        assert!(MediaStorage::validate_extension(MediaKind::Image, "me.webp").is_ok());
        assert!(MediaStorage::validate_extension(MediaKind::Image, "me.mp4").is_err());
        assert!(MediaStorage::validate_extension(MediaKind::Image, "noext").is_err());
    }

    #[test]
    fn test_url_round_trip_only_for_own_urls() {
        let storage = storage();
        let url = storage.url_for("abc.png");
        assert_eq!(url, "http://localhost:5000/uploads/abc.png");
        assert_eq!(storage.file_name_from_url(&url).as_deref(), Some("abc.png"));
        assert!(storage
            .file_name_from_url("https://cdn.example.com/uploads/abc.png")
            .is_none());
        assert!(storage
            .file_name_from_url("http://localhost:5000/uploads/../secret")
            .is_none());
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let storage = storage();
        assert!(storage.resolve("video.mp4").is_ok());
        assert!(storage.resolve("../etc/passwd").is_err());
        assert!(storage.resolve("nested/file.mp4").is_err());
        assert!(storage.resolve("..").is_err());
        assert!(storage.resolve("").is_err());
    }

    #[test]
    fn test_content_type() {
        assert_eq!(MediaStorage::content_type("a.JPG"), mime::IMAGE_JPEG);
        assert_eq!(MediaStorage::content_type("a.mp4").essence_str(), "video/mp4");
        assert_eq!(
            MediaStorage::content_type("a.bin"),
            mime::APPLICATION_OCTET_STREAM
        );
    }
}
