/// Configuration management for the BluT API
///
/// Everything is read from environment variables (optionally seeded from a
/// `.env` file by `main`). Parse failures name the offending key.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_JWT_SECRET: &str = "blut-dev-secret-change-me";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub cors: CorsConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub feed: FeedConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
    /// Prefix used when building URLs for uploaded media
    pub public_base_url: String,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Cache (Redis) configuration. Without a URL the feed is ranked on every
/// request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("ttl_hours", &self.ttl_hours)
            .finish()
    }
}

/// Local media storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub max_video_bytes: usize,
    pub max_image_bytes: usize,
}

/// Feed ranking configuration (weights, decay, candidate limits)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub engagement_weight: f64,
    pub watch_time_weight: f64,
    pub recency_weight: f64,
    pub following_weight: f64,
    /// Exponential decay applied per hour of age
    pub recency_decay_per_hour: f64,
    pub max_candidates: i64,
    pub cache_ttl_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            engagement_weight: 0.40,
            watch_time_weight: 0.30,
            recency_weight: 0.20,
            following_weight: 0.10,
            recency_decay_per_hour: 0.01,
            max_candidates: 500,
            cache_ttl_secs: 120,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let is_production = app_env.eq_ignore_ascii_case("production");

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = parse_env_or_default("PORT", 5000)?;

        let feed_defaults = FeedConfig::default();

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                public_base_url: std::env::var("PUBLIC_BASE_URL")
                    .unwrap_or_else(|_| format!("http://localhost:{port}"))
                    .trim_end_matches('/')
                    .to_string(),
                host,
                port,
            },
            cors: {
                let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                    Ok(value) => value,
                    Err(_) if is_production => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    Err(_) => "http://localhost:3000".to_string(),
                };

                if is_production && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/blut".to_string()),
                max_connections: parse_env_or_default("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            cache: CacheConfig {
                redis_url: std::env::var("REDIS_URL")
                    .ok()
                    .filter(|url| !url.trim().is_empty()),
            },
            jwt: {
                let secret =
                    std::env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string());
                if is_production && secret == DEFAULT_JWT_SECRET {
                    return Err(
                        "JWT_SECRET must be set to a non-default value in production".to_string(),
                    );
                }
                let ttl_hours: i64 = parse_env_or_default("JWT_TTL_HOURS", 24 * 7)?;
                if ttl_hours <= 0 {
                    return Err("JWT_TTL_HOURS must be positive".to_string());
                }
                JwtConfig { secret, ttl_hours }
            },
            storage: StorageConfig {
                upload_dir: std::env::var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("uploads")),
                max_video_bytes: parse_env_or_default("MAX_VIDEO_BYTES", 500 * 1024 * 1024)?,
                max_image_bytes: parse_env_or_default("MAX_IMAGE_BYTES", 5 * 1024 * 1024)?,
            },
            feed: FeedConfig {
                engagement_weight: parse_env_or_default(
                    "FEED_ENGAGEMENT_WEIGHT",
                    feed_defaults.engagement_weight,
                )?,
                watch_time_weight: parse_env_or_default(
                    "FEED_WATCH_TIME_WEIGHT",
                    feed_defaults.watch_time_weight,
                )?,
                recency_weight: parse_env_or_default(
                    "FEED_RECENCY_WEIGHT",
                    feed_defaults.recency_weight,
                )?,
                following_weight: parse_env_or_default(
                    "FEED_FOLLOWING_WEIGHT",
                    feed_defaults.following_weight,
                )?,
                recency_decay_per_hour: parse_env_or_default(
                    "FEED_RECENCY_DECAY",
                    feed_defaults.recency_decay_per_hour,
                )?,
                max_candidates: parse_env_or_default(
                    "FEED_MAX_CANDIDATES",
                    feed_defaults.max_candidates,
                )?,
                cache_ttl_secs: parse_env_or_default(
                    "FEED_CACHE_TTL_SECS",
                    feed_defaults.cache_ttl_secs,
                )?,
            },
        })
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "APP_ENV",
            "PORT",
            "JWT_SECRET",
            "JWT_TTL_HOURS",
            "CORS_ALLOWED_ORIGINS",
            "REDIS_URL",
            "FEED_ENGAGEMENT_WEIGHT",
            "PUBLIC_BASE_URL",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config.app.port, 5000);
        assert_eq!(config.jwt.ttl_hours, 168);
        assert!(config.cache.redis_url.is_none());
        assert_eq!(config.feed.engagement_weight, 0.40);
        assert_eq!(config.app.public_base_url, "http://localhost:5000");
    }

    #[test]
    #[serial]
    fn test_parse_error_names_key() {
        clear_env();
        std::env::set_var("PORT", "not-a-port");
        let err = Config::from_env().unwrap_err();
        assert!(err.contains("PORT"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_production_requires_real_secret() {
        clear_env();
        std::env::set_var("APP_ENV", "production");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://blut.app");
        let err = Config::from_env().unwrap_err();
        assert!(err.contains("JWT_SECRET"));

        std::env::set_var("JWT_SECRET", "a-long-production-secret-value");
        assert!(Config::from_env().is_ok());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_production_rejects_wildcard_cors() {
        clear_env();
        std::env::set_var("APP_ENV", "production");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "*");
        std::env::set_var("JWT_SECRET", "a-long-production-secret-value");
        assert!(Config::from_env().unwrap_err().contains("CORS"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_feed_weight_override() {
        clear_env();
        std::env::set_var("FEED_ENGAGEMENT_WEIGHT", "0.5");
        let config = Config::from_env().unwrap();
        assert_eq!(config.feed.engagement_weight, 0.5);
        clear_env();
    }
}
