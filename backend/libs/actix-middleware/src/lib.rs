//! # Actix Middleware Library
//!
//! Shared middleware components for BluT Actix services
//!
//! ## Modules
//! - `jwt_auth`: JWT authentication middleware and `UserId` extractor
//! - `correlation_id`: X-Correlation-ID propagation
//! - `error`: JSON-rendered authentication errors

pub mod correlation_id;
pub mod error;
pub mod jwt_auth;

pub use correlation_id::{get_correlation_id, CorrelationId, CorrelationIdMiddleware};
pub use error::AuthError;
pub use jwt_auth::{authenticate_token, bearer_token, JwtAuthMiddleware, UserId};
