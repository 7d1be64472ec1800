//! BluT API
//!
//! Backend for the BluT video platform: accounts and channels, video upload
//! and playback bookkeeping, comments, creator annotations, a ranked home
//! feed, notifications, creator analytics and realtime direct messages.
//!
//! # Modules
//!
//! - `handlers`: HTTP endpoints and route table
//! - `services`: business rules, authorization and side effects
//! - `db`: PostgreSQL repositories
//! - `realtime`: WebSocket sessions and the in-memory chat hub
//! - `cache`: Redis-backed feed cache
//! - `metrics`: Prometheus collectors
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod services;
pub mod state;
pub mod validators;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
