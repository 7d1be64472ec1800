/// Account registration, login and password changes
use crate::db::user_repo;
use crate::error::{AppError, Result};
use crate::models::User;
use crate::validators::mask_email;
use crypto_core::{jwt, password};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Serialize)]
pub struct AuthResult {
    pub user: User,
    pub token: String,
    pub expires_in: i64,
}

pub struct AuthService {
    pool: PgPool,
}

impl AuthService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AuthResult> {
        let email = email.trim().to_lowercase();

        if user_repo::email_taken(&self.pool, &email).await? {
            return Err(AppError::Conflict(
                "Email address already registered".to_string(),
            ));
        }
        if user_repo::username_taken(&self.pool, username).await? {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let password_hash = password::hash_password(password)?;
        let display_name = display_name
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(username);

        // The checks above race with concurrent sign-ups; the unique indexes
        // have the final say.
        let user = user_repo::create_user(
            &self.pool,
            username,
            &email,
            &password_hash,
            Some(display_name),
        )
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => {
                AppError::Conflict("Username or email already registered".to_string())
            }
            other => other,
        })?;

        info!(
            user_id = %user.id,
            username = %user.username,
            email = %mask_email(&user.email),
            "User registered"
        );

        self.issue(user)
    }

    /// `identifier` is an email or a username. Unknown users and bad
    /// passwords get the same answer.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<AuthResult> {
        let user = user_repo::find_by_identifier(&self.pool, identifier.trim())
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !password::verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        info!(user_id = %user.id, "User logged in");
        self.issue(user)
    }

    pub async fn me(&self, user_id: Uuid) -> Result<User> {
        user_repo::find_by_id(&self.pool, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self.me(user_id).await?;

        if !password::verify_password(current_password, &user.password_hash)? {
            return Err(AppError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }
        if current_password == new_password {
            return Err(AppError::BadRequest(
                "New password must differ from the current one".to_string(),
            ));
        }

        let password_hash = password::hash_password(new_password)?;
        user_repo::update_password(&self.pool, user_id, &password_hash).await?;

        info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    fn issue(&self, user: User) -> Result<AuthResult> {
        let token = jwt::generate_access_token(user.id, &user.email, &user.username)?;
        let expires_in = jwt::access_ttl_secs()?;
        Ok(AuthResult {
            user,
            token,
            expires_in,
        })
    }
}
