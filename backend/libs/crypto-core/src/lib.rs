//! Shared credential primitives for BluT services
//!
//! - `jwt`: HS256 access-token issue and validation
//! - `password`: Argon2id password hashing

pub mod jwt;
pub mod password;
