use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::metrics::feed::{FEED_CACHE_EVENTS, FEED_CACHE_WRITE_TOTAL};

/// Ranked feed ids per viewer, stored as JSON with a jittered TTL
#[derive(Clone)]
pub struct FeedCache {
    redis: ConnectionManager,
    default_ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedFeed {
    pub video_ids: Vec<Uuid>,
}

impl FeedCache {
    pub fn new(redis: ConnectionManager, default_ttl_secs: u64) -> Self {
        Self {
            redis,
            default_ttl: Duration::from_secs(default_ttl_secs),
        }
    }

    /// Connect and verify with a PING.
    pub async fn connect(redis_url: &str, default_ttl_secs: u64) -> Result<Self> {
        let client =
            redis::Client::open(redis_url).map_err(|e| AppError::Cache(e.to_string()))?;
        let mut manager = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut manager)
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;
        Ok(Self::new(manager, default_ttl_secs))
    }

    /// Anonymous viewers share one entry.
    fn feed_key(viewer_id: Option<Uuid>) -> String {
        match viewer_id {
            Some(id) => format!("feed:v1:{}", id),
            None => "feed:v1:anon".to_string(),
        }
    }

    pub async fn read_feed_cache(&self, viewer_id: Option<Uuid>) -> Result<Option<CachedFeed>> {
        let key = Self::feed_key(viewer_id);
        let mut conn = self.redis.clone();

        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(data)) => match serde_json::from_str::<CachedFeed>(&data) {
                Ok(feed) => {
                    debug!(key = %key, "Feed cache HIT");
                    FEED_CACHE_EVENTS.with_label_values(&["hit"]).inc();
                    Ok(Some(feed))
                }
                Err(e) => {
                    warn!(key = %key, "Discarding undecodable cached feed: {}", e);
                    FEED_CACHE_EVENTS.with_label_values(&["error"]).inc();
                    Ok(None)
                }
            },
            Ok(None) => {
                debug!(key = %key, "Feed cache MISS");
                FEED_CACHE_EVENTS.with_label_values(&["miss"]).inc();
                Ok(None)
            }
            Err(e) => {
                warn!("Redis read error for feed cache: {}", e);
                FEED_CACHE_EVENTS.with_label_values(&["error"]).inc();
                Err(AppError::Cache(e.to_string()))
            }
        }
    }

    pub async fn write_feed_cache(
        &self,
        viewer_id: Option<Uuid>,
        video_ids: Vec<Uuid>,
        ttl_secs: Option<u64>,
    ) -> Result<()> {
        let key = Self::feed_key(viewer_id);
        let ttl = ttl_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_ttl);

        let total = video_ids.len();
        let data = serde_json::to_string(&CachedFeed { video_ids })?;
        let final_ttl = with_jitter(ttl);

        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(&key, data, final_ttl.as_secs())
            .await
            .map_err(|e| {
                warn!("Failed to write feed cache: {}", e);
                FEED_CACHE_WRITE_TOTAL.with_label_values(&["error"]).inc();
                AppError::Cache(e.to_string())
            })?;

        debug!(key = %key, total, ttl = ?final_ttl, "Feed cache WRITE");
        FEED_CACHE_WRITE_TOTAL.with_label_values(&["success"]).inc();

        Ok(())
    }

    pub async fn invalidate_feed(&self, viewer_id: Uuid) -> Result<()> {
        let key = Self::feed_key(Some(viewer_id));
        let mut conn = self.redis.clone();
        conn.del::<_, ()>(&key)
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;

        debug!(key = %key, "Feed cache INVALIDATE");
        FEED_CACHE_EVENTS.with_label_values(&["invalidate"]).inc();
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.redis.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| AppError::Cache(e.to_string()))
    }
}

/// Add up to 10% random jitter so entries written together expire apart.
fn with_jitter(ttl: Duration) -> Duration {
    let jitter = (rand::random::<u32>() % 10) as f64 / 100.0;
    let jitter_secs = (ttl.as_secs_f64() * jitter).round() as u64;
    ttl + Duration::from_secs(jitter_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_key_format() {
        let viewer = Uuid::new_v4();
        assert_eq!(FeedCache::feed_key(Some(viewer)), format!("feed:v1:{}", viewer));
        assert_eq!(FeedCache::feed_key(None), "feed:v1:anon");
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        let base = Duration::from_secs(120);
        for _ in 0..50 {
            let ttl = with_jitter(base);
            assert!(ttl >= base);
            assert!(ttl <= base + Duration::from_secs(12));
        }
    }
}
