/// Redis-backed caches
pub mod feed_cache;

pub use feed_cache::{CachedFeed, FeedCache};
