/// Comment service - threads on videos, with reply notifications
use crate::db::comment_repo;
use crate::db::notification_repo::NewNotification;
use crate::error::{AppError, Result};
use crate::models::{CommentView, NotificationKind, PageParams, Paginated};
use crate::realtime::ChatHub;
use crate::services::{NotificationService, VideoService};
use sqlx::PgPool;
use uuid::Uuid;

pub const MAX_COMMENT_LEN: usize = 2000;

pub struct CommentService {
    pool: PgPool,
    hub: ChatHub,
}

fn validate_content(content: &str) -> Result<&str> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("Comment content is required".to_string()));
    }
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::Validation(format!(
            "Comments must be at most {MAX_COMMENT_LEN} characters"
        )));
    }
    Ok(content)
}

impl CommentService {
    pub fn new(pool: PgPool, hub: ChatHub) -> Self {
        Self { pool, hub }
    }

    fn videos(&self) -> VideoService {
        VideoService::new(self.pool.clone(), self.hub.clone())
    }

    /// Top-level comments of a video the viewer can see
    pub async fn list_for_video(
        &self,
        video_id: Uuid,
        viewer_id: Option<Uuid>,
        params: PageParams,
    ) -> Result<Paginated<CommentView>> {
        self.videos().visible_video(video_id, viewer_id).await?;
        let (comments, total) =
            comment_repo::list_top_level(&self.pool, video_id, params.limit(), params.offset())
                .await?;
        Ok(Paginated::new(comments, params, total))
    }

    pub async fn list_replies(
        &self,
        comment_id: Uuid,
        viewer_id: Option<Uuid>,
        params: PageParams,
    ) -> Result<Paginated<CommentView>> {
        let parent = comment_repo::find_by_id(&self.pool, comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
        self.videos().visible_video(parent.video_id, viewer_id).await?;

        let (replies, total) =
            comment_repo::list_replies(&self.pool, comment_id, params.limit(), params.offset())
                .await?;
        Ok(Paginated::new(replies, params, total))
    }

    /// A reply's parent must sit on the same video. Top-level comments notify
    /// the video owner; replies notify the parent's author.
    pub async fn create(
        &self,
        video_id: Uuid,
        user_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<CommentView> {
        let content = validate_content(content)?;
        let video = self.videos().visible_video(video_id, Some(user_id)).await?;

        let parent = match parent_id {
            Some(parent_id) => {
                let parent = comment_repo::find_by_id(&self.pool, parent_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Parent comment not found".to_string()))?;
                if parent.video_id != video_id {
                    return Err(AppError::BadRequest(
                        "Parent comment belongs to a different video".to_string(),
                    ));
                }
                Some(parent)
            }
            None => None,
        };

        let comment =
            comment_repo::create_comment(&self.pool, video_id, user_id, content, parent_id).await?;

        let (recipient_id, kind, message) = match &parent {
            Some(parent) => (parent.user_id, NotificationKind::Reply, "replied to your comment"),
            None => (video.creator_id, NotificationKind::Comment, "commented on your video"),
        };
        NotificationService::new(self.pool.clone(), self.hub.clone())
            .notify_quietly(NewNotification {
                recipient_id,
                actor_id: Some(user_id),
                kind,
                video_id: Some(video_id),
                comment_id: Some(comment.id),
                message,
            })
            .await;

        tracing::debug!(comment_id = %comment.id, video_id = %video_id, "comment created");

        comment_repo::find_view(&self.pool, comment.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    /// Author only.
    pub async fn update(&self, comment_id: Uuid, user_id: Uuid, content: &str) -> Result<CommentView> {
        let content = validate_content(content)?;
        let comment = comment_repo::find_by_id(&self.pool, comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        if comment.user_id != user_id {
            return Err(AppError::Forbidden(
                "You can only edit your own comments".to_string(),
            ));
        }

        comment_repo::update_content(&self.pool, comment_id, content).await?;
        comment_repo::find_view(&self.pool, comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    /// The author or the owner of the video may delete. Replies go with it.
    pub async fn delete(&self, comment_id: Uuid, user_id: Uuid) -> Result<()> {
        let comment = comment_repo::find_by_id(&self.pool, comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        if comment.user_id != user_id {
            let video_owner = crate::db::video_repo::find_by_id(&self.pool, comment.video_id)
                .await?
                .map(|v| v.creator_id);
            if video_owner != Some(user_id) {
                return Err(AppError::Forbidden(
                    "You can only delete your own comments".to_string(),
                ));
            }
        }

        comment_repo::delete_comment(&self.pool, comment_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_content_bounds() {
        assert_eq!(validate_content(" nice ").unwrap(), "nice");
        assert!(validate_content("").is_err());
        assert!(validate_content(&"c".repeat(MAX_COMMENT_LEN)).is_ok());
        assert!(validate_content(&"c".repeat(MAX_COMMENT_LEN + 1)).is_err());
    }
}
