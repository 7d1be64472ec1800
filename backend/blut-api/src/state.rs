use crate::{
    config::Config,
    realtime::ChatHub,
    services::{FeedRankingService, MediaStorage},
};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    /// Presence map and conversation rooms for `/ws`
    pub hub: ChatHub,
    pub storage: MediaStorage,
    pub feed: Arc<FeedRankingService>,
}
