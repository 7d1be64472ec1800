/// Shared JWT module for BluT services
///
/// Tokens are HS256-signed with a single server secret. The secret and the
/// access-token lifetime are installed once at startup and are immutable
/// afterwards.
///
/// ## Usage
///
/// ```rust,no_run
/// use crypto_core::jwt;
///
/// let secret = std::env::var("JWT_SECRET").unwrap();
/// jwt::initialize_jwt_secret(&secret, chrono::Duration::hours(24 * 7)).unwrap();
///
/// let token = jwt::generate_access_token(uuid::Uuid::new_v4(), "a@b.c", "alice").unwrap();
/// let claims = jwt::validate_token(&token).unwrap().claims;
/// ```
use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, TokenData,
    Validation,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Shortest secret accepted by `initialize_jwt_secret`
pub const MIN_SECRET_LEN: usize = 16;

// ============================================================================
// Data Structures
// ============================================================================

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub email: String,
    pub username: String,
}

/// Why a token was rejected. Callers map every variant to 401 but keep the
/// distinction for logs and messages.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("JWT secret not initialized")]
    NotInitialized,
}

struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
}

static JWT_KEYS: OnceCell<JwtKeys> = OnceCell::new();

// ============================================================================
// Initialization
// ============================================================================

/// Install the signing secret and access-token lifetime.
///
/// Can only be called once - subsequent calls return an error.
pub fn initialize_jwt_secret(secret: &str, access_ttl: Duration) -> Result<()> {
    if secret.len() < MIN_SECRET_LEN {
        return Err(anyhow!(
            "JWT secret must be at least {MIN_SECRET_LEN} characters"
        ));
    }
    if access_ttl <= Duration::zero() {
        return Err(anyhow!("JWT access token lifetime must be positive"));
    }

    JWT_KEYS
        .set(JwtKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
        })
        .map_err(|_| anyhow!("JWT secret already initialized"))
}

/// Whether `initialize_jwt_secret` has run.
pub fn is_initialized() -> bool {
    JWT_KEYS.get().is_some()
}

fn keys() -> Result<&'static JwtKeys> {
    JWT_KEYS.get().ok_or_else(|| {
        anyhow!("JWT secret not initialized. Call initialize_jwt_secret() during startup.")
    })
}

// ============================================================================
// Token Generation
// ============================================================================

/// Generate an access token using the configured lifetime
pub fn generate_access_token(user_id: Uuid, email: &str, username: &str) -> Result<String> {
    let ttl = keys()?.access_ttl;
    generate_token_with_ttl(user_id, email, username, ttl)
}

/// Generate a token with an explicit lifetime. A negative `ttl` produces an
/// already-expired token.
pub fn generate_token_with_ttl(
    user_id: Uuid,
    email: &str,
    username: &str,
    ttl: Duration,
) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
        email: email.to_string(),
        username: username.to_string(),
    };

    encode(&Header::new(JWT_ALGORITHM), &claims, &keys()?.encoding)
        .map_err(|e| anyhow!("Failed to generate access token: {e}"))
}

/// Access-token lifetime in seconds, for `expires_in` fields.
pub fn access_ttl_secs() -> Result<i64> {
    Ok(keys()?.access_ttl.num_seconds())
}

// ============================================================================
// Token Validation
// ============================================================================

/// Validate and decode a JWT token (without the "Bearer " prefix)
pub fn validate_token(token: &str) -> std::result::Result<TokenData<Claims>, TokenError> {
    let keys = JWT_KEYS.get().ok_or(TokenError::NotInitialized)?;

    let mut validation = Validation::new(JWT_ALGORITHM);
    validation.validate_exp = true;

    decode::<Claims>(token, &keys.decoding, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid(e.to_string()),
    })
}

/// Extract user ID from a validated token
pub fn get_user_id_from_token(token: &str) -> std::result::Result<Uuid, TokenError> {
    let token_data = validate_token(token)?;
    Uuid::parse_str(&token_data.claims.sub)
        .map_err(|e| TokenError::Invalid(format!("malformed subject: {e}")))
}

/// Install a fixed secret for tests. Safe to call from many tests.
#[doc(hidden)]
pub fn init_test_secret() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = initialize_jwt_secret("blut-test-secret-do-not-use", Duration::hours(1));
    });
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_access_token() {
        init_test_secret();

        let token = generate_access_token(Uuid::new_v4(), "test@example.com", "testuser")
            .expect("Failed to generate token");
        assert_eq!(token.matches('.').count(), 2);
    }

    #[test]
    fn test_validate_valid_token() {
        init_test_secret();

        let user_id = Uuid::new_v4();
        let token = generate_access_token(user_id, "test@example.com", "testuser").unwrap();

        let token_data = validate_token(&token).expect("token should validate");
        assert_eq!(token_data.claims.sub, user_id.to_string());
        assert_eq!(token_data.claims.username, "testuser");
    }

    #[test]
    fn test_validate_garbage_token() {
        init_test_secret();

        let result = validate_token("invalid.token.here");
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_validate_tampered_token() {
        init_test_secret();

        let token = generate_access_token(Uuid::new_v4(), "test@example.com", "testuser").unwrap();
        let (head, _sig) = token.rsplit_once('.').unwrap();
        let tampered = format!("{head}.AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");

        assert!(validate_token(&tampered).is_err());
    }

    #[test]
    fn test_expired_token_is_reported_as_expired() {
        init_test_secret();

        let token = generate_token_with_ttl(
            Uuid::new_v4(),
            "test@example.com",
            "testuser",
            Duration::minutes(-10),
        )
        .unwrap();

        assert!(matches!(validate_token(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_extract_user_id() {
        init_test_secret();

        let user_id = Uuid::new_v4();
        let token = generate_access_token(user_id, "test@example.com", "testuser").unwrap();

        assert_eq!(get_user_id_from_token(&token).unwrap(), user_id);
    }

    #[test]
    fn test_second_initialization_is_rejected() {
        init_test_secret();
        assert!(initialize_jwt_secret("another-secret-value-123", Duration::hours(1)).is_err());
    }
}
