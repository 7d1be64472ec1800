use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use crypto_core::jwt::TokenError;

/// Authentication failure rendered as the standard `{success, message}` envelope.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Not authorized, no token provided")]
    MissingToken,
    #[error("Not authorized, malformed Authorization header")]
    MalformedHeader,
    #[error("Not authorized, token expired")]
    Expired,
    #[error("Not authorized, token invalid")]
    InvalidToken,
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::Expired,
            TokenError::Invalid(_) | TokenError::NotInitialized => AuthError::InvalidToken,
        }
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "message": self.to_string(),
        }))
    }
}
