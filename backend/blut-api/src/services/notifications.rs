/// Notification service - persistence plus live push over the chat hub
use crate::db::notification_repo::{self, NewNotification};
use crate::error::{AppError, Result};
use crate::models::{Notification, PageParams, Paginated};
use crate::realtime::{ChatHub, ServerEvent};
use sqlx::PgPool;
use uuid::Uuid;

pub struct NotificationService {
    pool: PgPool,
    hub: ChatHub,
}

impl NotificationService {
    pub fn new(pool: PgPool, hub: ChatHub) -> Self {
        Self { pool, hub }
    }

    /// Store a notification and push it to the recipient's open sessions.
    /// Returns `None` when the actor is the recipient.
    pub async fn notify(&self, new: NewNotification<'_>) -> Result<Option<Notification>> {
        if new.actor_id == Some(new.recipient_id) {
            return Ok(None);
        }

        let notification = notification_repo::insert(&self.pool, &new).await?;
        self.push(&notification).await;
        Ok(Some(notification))
    }

    /// Like [`notify`](Self::notify), but a failure is logged instead of
    /// failing the action that triggered it.
    pub async fn notify_quietly(&self, new: NewNotification<'_>) {
        let recipient_id = new.recipient_id;
        let kind = new.kind;
        if let Err(e) = self.notify(new).await {
            tracing::warn!(
                recipient_id = %recipient_id,
                kind = kind.as_str(),
                error = %e,
                "failed to create notification"
            );
        }
    }

    /// Fan a `new_video` notification out to every subscriber of the channel.
    pub async fn notify_subscribers(
        &self,
        channel_id: Uuid,
        video_id: Uuid,
        message: &str,
    ) -> Result<usize> {
        let created =
            notification_repo::insert_for_subscribers(&self.pool, channel_id, video_id, message)
                .await?;
        for notification in &created {
            self.push(notification).await;
        }
        Ok(created.len())
    }

    async fn push(&self, notification: &Notification) {
        let event = ServerEvent::Notification {
            notification: notification.clone(),
        };
        self.hub.send_to_user(notification.recipient_id, &event).await;
    }

    pub async fn list(
        &self,
        recipient_id: Uuid,
        unread_only: bool,
        params: PageParams,
    ) -> Result<Paginated<Notification>> {
        let (items, total) = notification_repo::list(
            &self.pool,
            recipient_id,
            unread_only,
            params.limit(),
            params.offset(),
        )
        .await?;
        Ok(Paginated::new(items, params, total))
    }

    pub async fn unread_count(&self, recipient_id: Uuid) -> Result<i64> {
        Ok(notification_repo::unread_count(&self.pool, recipient_id).await?)
    }

    pub async fn mark_read(&self, notification_id: Uuid, recipient_id: Uuid) -> Result<()> {
        if notification_repo::mark_read(&self.pool, notification_id, recipient_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Notification not found".to_string()))
        }
    }

    pub async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64> {
        Ok(notification_repo::mark_all_read(&self.pool, recipient_id).await?)
    }

    pub async fn delete(&self, notification_id: Uuid, recipient_id: Uuid) -> Result<()> {
        if notification_repo::delete(&self.pool, notification_id, recipient_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Notification not found".to_string()))
        }
    }

    pub async fn clear(&self, recipient_id: Uuid) -> Result<u64> {
        Ok(notification_repo::clear(&self.pool, recipient_id).await?)
    }
}
