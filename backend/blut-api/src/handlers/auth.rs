use actix_web::{web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

use crate::error::Result;
use crate::middleware::UserId;
use crate::models::ApiResponse;
use crate::services::AuthService;
use crate::state::AppState;
use crate::validators::{validate_not_blank, validate_username};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
    #[validate(length(max = 64, message = "Display name must be at most 64 characters"))]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email or username
    #[validate(custom(function = "validate_not_blank"))]
    pub identifier: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
}

pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    let result = AuthService::new(state.db.clone())
        .register(
            &body.username,
            &body.email,
            &body.password,
            body.display_name.as_deref(),
        )
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::new(result)))
}

pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    let result = AuthService::new(state.db.clone())
        .login(&body.identifier, &body.password)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(result)))
}

pub async fn me(state: web::Data<AppState>, user: UserId) -> Result<HttpResponse> {
    let user = AuthService::new(state.db.clone()).me(user.0).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(user)))
}

pub async fn change_password(
    state: web::Data<AppState>,
    user: UserId,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    AuthService::new(state.db.clone())
        .change_password(user.0, &body.current_password, &body.new_password)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(serde_json::json!({
        "message": "Password updated"
    }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let ok = RegisterRequest {
            username: "alice_01".into(),
            email: "alice@example.com".into(),
            password: "correct horse".into(),
            display_name: None,
        };
        assert!(ok.validate().is_ok());

        let bad = RegisterRequest {
            username: "a b".into(),
            email: "not-an-email".into(),
            password: "short".into(),
            display_name: None,
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_login_rejects_blank_identifier() {
        let req = LoginRequest {
            identifier: "   ".into(),
            password: "x".into(),
        };
        assert!(req.validate().is_err());
    }
}
