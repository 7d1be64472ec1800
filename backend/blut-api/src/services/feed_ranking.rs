use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::FeedCache;
use crate::config::FeedConfig;
use crate::db::video_repo::{self, FeedCandidateRow};
use crate::error::Result;
use crate::metrics::feed::{FEED_CANDIDATE_COUNT, FEED_REQUEST_DURATION_SECONDS, FEED_REQUEST_TOTAL};
use crate::models::VideoCard;

/// Weights and decay for the home feed score
#[derive(Debug, Clone, Copy)]
pub struct FeedRankingConfig {
    pub engagement_weight: f64,
    pub watch_time_weight: f64,
    pub recency_weight: f64,
    pub following_weight: f64,
    pub recency_decay_per_hour: f64,
    pub max_candidates: i64,
}

impl Default for FeedRankingConfig {
    fn default() -> Self {
        (&FeedConfig::default()).into()
    }
}

impl From<&FeedConfig> for FeedRankingConfig {
    fn from(config: &FeedConfig) -> Self {
        FeedRankingConfig {
            engagement_weight: config.engagement_weight,
            watch_time_weight: config.watch_time_weight,
            recency_weight: config.recency_weight,
            following_weight: config.following_weight,
            recency_decay_per_hour: config.recency_decay_per_hour,
            max_candidates: config.max_candidates.max(1),
        }
    }
}

/// The numbers one candidate is scored from
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs {
    pub created_at: DateTime<Utc>,
    /// Lifetime `view_count` counter on the video
    pub view_count: i64,
    /// Likes within the first 24 hours
    pub early_likes: i64,
    /// Recorded playbacks within the first 24 hours
    pub early_views: i64,
    /// All recorded playback rows
    pub playback_count: i64,
    pub is_following: bool,
}

impl From<&FeedCandidateRow> for ScoreInputs {
    fn from(row: &FeedCandidateRow) -> Self {
        ScoreInputs {
            created_at: row.created_at,
            view_count: row.view_count,
            early_likes: row.early_likes,
            early_views: row.early_views,
            playback_count: row.playback_count,
            is_following: row.is_following,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedVideo {
    pub video_id: Uuid,
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

/// One page of the feed
#[derive(Debug, Serialize)]
pub struct FeedPage {
    pub videos: Vec<VideoCard>,
    pub limit: usize,
    pub offset: usize,
    pub total: usize,
    pub has_more: bool,
}

fn ratio(numerator: i64, denominator: i64) -> f64 {
    if denominator <= 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Score one video.
///
/// ```text
/// score = w_e * likes/views * 100          (first 24h)
///       + w_w * min(100, playbacks/view_count * 100)
///       + w_r * 100 * e^(-decay * hours_old)
///       + w_f * (100 if the viewer follows the creator)
/// ```
///
/// A zero denominator zeroes its term; a non-finite result scores 0.
///
/// Every recorded view also inserts a playback row, so for videos viewed
/// through the API `playbacks == view_count` and the watch-time term is a
/// flat 100 once a video has any views. It drops below 100 only when the
/// counter and the playback rows diverge.
pub fn score(config: &FeedRankingConfig, inputs: &ScoreInputs, now: DateTime<Utc>) -> f64 {
    let engagement_velocity = ratio(inputs.early_likes, inputs.early_views) * 100.0;
    let watch_time_proxy = (ratio(inputs.playback_count, inputs.view_count) * 100.0).min(100.0);

    let hours_old = ((now - inputs.created_at).num_seconds() as f64 / 3600.0).max(0.0);
    let recency = 100.0 * (-config.recency_decay_per_hour * hours_old).exp();

    let following = if inputs.is_following { 100.0 } else { 0.0 };

    let total = config.engagement_weight * engagement_velocity
        + config.watch_time_weight * watch_time_proxy
        + config.recency_weight * recency
        + config.following_weight * following;

    if total.is_finite() {
        total
    } else {
        0.0
    }
}

/// Highest score first, newest first on ties.
pub fn rank(
    config: &FeedRankingConfig,
    candidates: &[FeedCandidateRow],
    now: DateTime<Utc>,
) -> Vec<RankedVideo> {
    let mut ranked: Vec<RankedVideo> = candidates
        .iter()
        .map(|row| RankedVideo {
            video_id: row.id,
            score: score(config, &ScoreInputs::from(row), now),
            created_at: row.created_at,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    ranked
}

pub struct FeedRankingService {
    db_pool: PgPool,
    cache: Option<FeedCache>,
    config: FeedRankingConfig,
}

impl FeedRankingService {
    pub fn new(db_pool: PgPool, cache: Option<FeedCache>, config: FeedRankingConfig) -> Self {
        Self {
            db_pool,
            cache,
            config,
        }
    }

    pub async fn get_feed(
        &self,
        viewer_id: Option<Uuid>,
        limit: usize,
        offset: usize,
    ) -> Result<FeedPage> {
        let start = Instant::now();

        let (ids, source) = match self.cached_ids(viewer_id).await {
            Some(ids) => (ids, "cache"),
            None => (self.ranked_ids(viewer_id).await?, "ranked"),
        };

        let total = ids.len();
        let start_index = offset.min(total);
        let end = (start_index + limit).min(total);
        let page_ids = &ids[start_index..end];

        let videos = self.load_cards(page_ids, viewer_id).await?;

        FEED_REQUEST_DURATION_SECONDS
            .with_label_values(&[source])
            .observe(start.elapsed().as_secs_f64());
        FEED_REQUEST_TOTAL.with_label_values(&[source]).inc();

        Ok(FeedPage {
            videos,
            limit,
            offset,
            total,
            has_more: end < total,
        })
    }

    async fn cached_ids(&self, viewer_id: Option<Uuid>) -> Option<Vec<Uuid>> {
        let cache = self.cache.as_ref()?;
        match cache.read_feed_cache(viewer_id).await {
            Ok(Some(cached)) => Some(cached.video_ids),
            Ok(None) => None,
            Err(e) => {
                warn!("Feed cache unavailable, ranking without it: {}", e);
                None
            }
        }
    }

    async fn ranked_ids(&self, viewer_id: Option<Uuid>) -> Result<Vec<Uuid>> {
        let candidates =
            video_repo::feed_candidates(&self.db_pool, viewer_id, self.config.max_candidates)
                .await?;
        FEED_CANDIDATE_COUNT
            .with_label_values(&["ranked"])
            .observe(candidates.len() as f64);

        let ids: Vec<Uuid> = rank(&self.config, &candidates, Utc::now())
            .into_iter()
            .map(|r| r.video_id)
            .collect();

        debug!(
            viewer = ?viewer_id,
            candidates = candidates.len(),
            "Ranked feed"
        );

        if let Some(cache) = &self.cache {
            if !ids.is_empty() {
                if let Err(e) = cache.write_feed_cache(viewer_id, ids.clone(), None).await {
                    warn!("Failed to cache ranked feed: {}", e);
                }
            }
        }

        Ok(ids)
    }

    /// Cards for `ids`, in the order given. Ids that are no longer public
    /// (deleted or hidden since ranking) drop out.
    async fn load_cards(&self, ids: &[Uuid], viewer_id: Option<Uuid>) -> Result<Vec<VideoCard>> {
        let cards = video_repo::find_cards_by_ids(&self.db_pool, ids, viewer_id).await?;
        let mut by_id: HashMap<Uuid, VideoCard> =
            cards.into_iter().map(|c| (c.video.id, c)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Drop a viewer's cached ranking after their follow graph changed.
    pub async fn invalidate(&self, viewer_id: Uuid) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.invalidate_feed(viewer_id).await {
                warn!(user_id = %viewer_id, "Failed to invalidate feed cache: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn inputs(now: DateTime<Utc>) -> ScoreInputs {
        ScoreInputs {
            created_at: now,
            view_count: 0,
            early_likes: 0,
            early_views: 0,
            playback_count: 0,
            is_following: false,
        }
    }

    fn row(id: Uuid, created_at: DateTime<Utc>, early_likes: i64, early_views: i64) -> FeedCandidateRow {
        FeedCandidateRow {
            id,
            created_at,
            view_count: early_views,
            early_likes,
            early_views,
            playback_count: early_views,
            is_following: false,
        }
    }

    #[test]
    fn test_brand_new_video_scores_recency_only() {
        let now = Utc::now();
        let config = FeedRankingConfig::default();
        let s = score(&config, &inputs(now), now);
        assert!((s - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_matches_formula() {
        let now = Utc::now();
        let config = FeedRankingConfig::default();
        let input = ScoreInputs {
            created_at: now - Duration::hours(10),
            view_count: 40,
            early_likes: 5,
            early_views: 20,
            playback_count: 30,
            is_following: true,
        };

        let expected = 0.40 * 25.0 + 0.30 * 75.0 + 0.20 * 100.0 * (-0.1f64).exp() + 0.10 * 100.0;
        assert!((score(&config, &input, now) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_watch_time_proxy_is_capped() {
        let now = Utc::now();
        let config = FeedRankingConfig {
            engagement_weight: 0.0,
            watch_time_weight: 1.0,
            recency_weight: 0.0,
            following_weight: 0.0,
            ..FeedRankingConfig::default()
        };
        let input = ScoreInputs {
            view_count: 10,
            playback_count: 50,
            ..inputs(now)
        };
        assert_eq!(score(&config, &input, now), 100.0);
    }

    #[test]
    fn test_zero_denominators_zero_their_terms() {
        let now = Utc::now();
        let config = FeedRankingConfig {
            recency_weight: 0.0,
            ..FeedRankingConfig::default()
        };
        let input = ScoreInputs {
            early_likes: 7,
            playback_count: 3,
            ..inputs(now)
        };
        assert_eq!(score(&config, &input, now), 0.0);
    }

    #[test]
    fn test_non_finite_score_becomes_zero() {
        let now = Utc::now();
        let config = FeedRankingConfig {
            recency_decay_per_hour: f64::NAN,
            ..FeedRankingConfig::default()
        };
        assert_eq!(score(&config, &inputs(now - Duration::hours(1)), now), 0.0);
    }

    #[test]
    fn test_rank_orders_by_score_then_newest() {
        let now = Utc::now();
        let hot = Uuid::new_v4();
        let older = Uuid::new_v4();
        let newer = Uuid::new_v4();

        let candidates = vec![
            row(older, now - Duration::hours(1), 0, 0),
            row(hot, now - Duration::hours(1), 10, 10),
            row(newer, now - Duration::hours(1) + Duration::milliseconds(1), 0, 0),
        ];

        // No decay: the two idle rows tie and the newer one wins.
        let config = FeedRankingConfig {
            recency_decay_per_hour: 0.0,
            ..FeedRankingConfig::default()
        };
        let order: Vec<Uuid> = rank(&config, &candidates, now)
            .into_iter()
            .map(|r| r.video_id)
            .collect();
        assert_eq!(order, vec![hot, newer, older]);
    }

    #[test]
    fn test_watch_time_proxy_is_flat_once_views_are_recorded() {
        let now = Utc::now();
        let config = FeedRankingConfig {
            engagement_weight: 0.0,
            watch_time_weight: 1.0,
            recency_weight: 0.0,
            following_weight: 0.0,
            ..FeedRankingConfig::default()
        };
        let viewed = |views: i64| ScoreInputs {
            view_count: views,
            playback_count: views,
            ..inputs(now)
        };
        assert_eq!(score(&config, &viewed(0), now), 0.0);
        assert_eq!(score(&config, &viewed(1), now), 100.0);
        assert_eq!(score(&config, &viewed(5000), now), 100.0);
    }
}
