/// Channel profiles, search and subscriptions
use crate::db::notification_repo::NewNotification;
use crate::db::{subscription_repo, user_repo, video_repo};
use crate::error::{AppError, Result};
use crate::models::{NotificationKind, PageParams, Paginated, User, UserProfile, UserSummary, VideoCard};
use crate::realtime::ChatHub;
use crate::services::{FeedRankingService, MediaStorage, NotificationService, StoredFile};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct SubscriptionState {
    pub subscribed: bool,
    pub subscriber_count: i64,
}

pub struct UserService {
    pool: PgPool,
    hub: ChatHub,
    feed: Arc<FeedRankingService>,
}

impl UserService {
    pub fn new(pool: PgPool, hub: ChatHub, feed: Arc<FeedRankingService>) -> Self {
        Self { pool, hub, feed }
    }

    async fn ensure_exists(&self, user_id: Uuid) -> Result<()> {
        if user_repo::exists(&self.pool, user_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("User not found".to_string()))
        }
    }

    pub async fn profile(&self, user_id: Uuid, viewer_id: Option<Uuid>) -> Result<UserProfile> {
        user_repo::get_profile(&self.pool, user_id, viewer_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn search(&self, query: &str, params: PageParams) -> Result<Paginated<UserSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Paginated::new(Vec::new(), params, 0));
        }
        let (users, total) =
            user_repo::search(&self.pool, query, params.limit(), params.offset()).await?;
        Ok(Paginated::new(users, params, total))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        display_name: Option<&str>,
        bio: Option<&str>,
    ) -> Result<User> {
        Ok(user_repo::update_profile(&self.pool, user_id, display_name, bio).await?)
    }

    /// Point the account at a freshly stored avatar and drop the old file.
    /// The new file is removed again when the update fails.
    pub async fn set_avatar(
        &self,
        user_id: Uuid,
        stored: &StoredFile,
        storage: &MediaStorage,
    ) -> Result<User> {
        match self.swap_avatar(user_id, &stored.url).await {
            Ok((user, previous)) => {
                if let Some(old) = previous {
                    storage.remove_url(&old).await;
                }
                Ok(user)
            }
            Err(e) => {
                storage.remove_url(&stored.url).await;
                Err(e)
            }
        }
    }

    async fn swap_avatar(&self, user_id: Uuid, url: &str) -> Result<(User, Option<String>)> {
        let previous = user_repo::find_by_id(&self.pool, user_id)
            .await?
            .and_then(|u| u.avatar_url);
        let user = user_repo::update_avatar(&self.pool, user_id, url).await?;
        Ok((user, previous))
    }

    /// Videos of a channel; the owner also sees unlisted and private ones.
    pub async fn videos(
        &self,
        channel_id: Uuid,
        viewer_id: Option<Uuid>,
        params: PageParams,
    ) -> Result<Paginated<VideoCard>> {
        self.ensure_exists(channel_id).await?;
        let include_hidden = viewer_id == Some(channel_id);
        let (videos, total) = video_repo::list_by_creator(
            &self.pool,
            channel_id,
            include_hidden,
            viewer_id,
            params.limit(),
            params.offset(),
        )
        .await?;
        Ok(Paginated::new(videos, params, total))
    }

    pub async fn liked_videos(&self, user_id: Uuid, params: PageParams) -> Result<Paginated<VideoCard>> {
        let (videos, total) =
            video_repo::list_liked_by(&self.pool, user_id, params.limit(), params.offset()).await?;
        Ok(Paginated::new(videos, params, total))
    }

    pub async fn subscriptions(&self, user_id: Uuid, params: PageParams) -> Result<Paginated<UserSummary>> {
        let (users, total) = subscription_repo::list_subscriptions(
            &self.pool,
            user_id,
            params.limit(),
            params.offset(),
        )
        .await?;
        Ok(Paginated::new(users, params, total))
    }

    pub async fn subscribers(&self, channel_id: Uuid, params: PageParams) -> Result<Paginated<UserSummary>> {
        self.ensure_exists(channel_id).await?;
        let (users, total) = subscription_repo::list_subscribers(
            &self.pool,
            channel_id,
            params.limit(),
            params.offset(),
        )
        .await?;
        Ok(Paginated::new(users, params, total))
    }

    /// Idempotent. Only a newly created subscription notifies the channel.
    pub async fn subscribe(&self, subscriber_id: Uuid, channel_id: Uuid) -> Result<SubscriptionState> {
        if subscriber_id == channel_id {
            return Err(AppError::BadRequest(
                "You cannot subscribe to yourself".to_string(),
            ));
        }
        self.ensure_exists(channel_id).await?;

        let inserted = subscription_repo::subscribe(&self.pool, subscriber_id, channel_id).await?;
        if inserted {
            info!(subscriber_id = %subscriber_id, channel_id = %channel_id, "Subscribed");
            self.feed.invalidate(subscriber_id).await;
            NotificationService::new(self.pool.clone(), self.hub.clone())
                .notify_quietly(NewNotification {
                    recipient_id: channel_id,
                    actor_id: Some(subscriber_id),
                    kind: NotificationKind::Subscribe,
                    video_id: None,
                    comment_id: None,
                    message: "subscribed to your channel",
                })
                .await;
        }

        Ok(SubscriptionState {
            subscribed: true,
            subscriber_count: subscription_repo::count_subscribers(&self.pool, channel_id).await?,
        })
    }

    /// Idempotent.
    pub async fn unsubscribe(&self, subscriber_id: Uuid, channel_id: Uuid) -> Result<SubscriptionState> {
        if subscription_repo::unsubscribe(&self.pool, subscriber_id, channel_id).await? {
            info!(subscriber_id = %subscriber_id, channel_id = %channel_id, "Unsubscribed");
            self.feed.invalidate(subscriber_id).await;
        }

        Ok(SubscriptionState {
            subscribed: false,
            subscriber_count: subscription_repo::count_subscribers(&self.pool, channel_id).await?,
        })
    }
}
