//! Authentication Service
//! Mission: Orchestrate sign-up, sign-in, and the refresh token lifecycle

use crate::auth::{
    jwt::TokenIssuer,
    models::{AccessClaims, AuthResponse, SignupRequest, User, UserResponse, UserRole, UserStatus},
    store::AuthStore,
};
use anyhow::anyhow;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct AuthService {
    store: Arc<AuthStore>,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(store: Arc<AuthStore>, tokens: TokenIssuer) -> Self {
        Self { store, tokens }
    }

    /// Register a new account and start its first session.
    pub async fn sign_up(&self, req: SignupRequest) -> Result<AuthResponse, AuthError> {
        if self.store.find_user_by_email(&req.email)?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password(req.password).await?;

        let user = User {
            id: Uuid::new_v4(),
            email: req.email,
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            role: req.role.unwrap_or(UserRole::Member),
            tenant_id: req.tenant_id,
            status: UserStatus::Active,
            created_at: Utc::now(),
            last_login_at: None,
        };

        self.store.insert_user(&user).map_err(|e| {
            warn!("Failed to insert user {}: {}", user.email, e);
            AuthError::EmailTaken
        })?;

        info!("✅ User registered: {} ({})", user.email, user.role.as_str());

        self.open_session(&user)
    }

    /// Exchange credentials for a token pair.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let Some(mut user) = self.store.find_user_by_email(email)? else {
            warn!("❌ Failed sign-in attempt: {}", email);
            return Err(AuthError::InvalidCredentials);
        };

        let valid = verify_password(password.to_string(), user.password_hash.clone()).await?;
        if !valid {
            warn!("❌ Failed sign-in attempt: {}", email);
            return Err(AuthError::InvalidCredentials);
        }

        if user.status != UserStatus::Active {
            warn!(
                "❌ Sign-in rejected for {} (status {})",
                email,
                user.status.as_str()
            );
            return Err(AuthError::AccountNotActive);
        }

        let now = Utc::now();
        self.store.record_login(&user.id, now)?;
        user.last_login_at = Some(now);

        info!("✅ Sign-in successful: {} ({})", user.email, user.role.as_str());

        self.open_session(&user)
    }

    /// Mint a new access token from a stored refresh token. The refresh
    /// token itself is not rotated; it stays valid until logout or expiry.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let Some(record) = self.store.find_refresh_token(refresh_token)? else {
            return Err(AuthError::InvalidRefreshToken);
        };

        if record.expires_at < Utc::now() {
            return Err(AuthError::InvalidRefreshToken);
        }

        let user = self
            .store
            .find_user_by_id(&record.user_id)?
            .ok_or(AuthError::InvalidRefreshToken)?;

        Ok(self.tokens.issue_access_token(&user)?)
    }

    /// Revoke one refresh token. Deleting an already-gone token succeeds.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let deleted = self.store.delete_refresh_token(refresh_token)?;
        if deleted > 0 {
            info!("🔒 Refresh token revoked");
        }

        Ok(())
    }

    /// Revoke every refresh token the user holds.
    pub async fn logout_all(&self, user_id: &Uuid) -> Result<usize, AuthError> {
        let deleted = self.store.delete_refresh_tokens_for_user(user_id)?;
        info!("🔒 Revoked {} refresh tokens for user {}", deleted, user_id);

        Ok(deleted)
    }

    /// Resolve a user for request guarding. Returns None unless the account
    /// exists and is ACTIVE, so deactivation cuts off live access tokens.
    pub fn validate_user(&self, user_id: &Uuid) -> Result<Option<User>, AuthError> {
        let Some(user) = self.store.find_user_by_id(user_id)? else {
            return Ok(None);
        };

        if user.status != UserStatus::Active {
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Decode and validate a bearer access token.
    pub fn verify_access_token(&self, token: &str) -> anyhow::Result<AccessClaims> {
        self.tokens.validate_access_token(token)
    }

    fn open_session(&self, user: &User) -> Result<AuthResponse, AuthError> {
        let access_token = self.tokens.issue_access_token(user)?;
        let (refresh_token, expires_at) = self.tokens.issue_refresh_token(user)?;
        self.store
            .insert_refresh_token(&refresh_token, &user.id, expires_at)?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            user: UserResponse::from_user(user),
        })
    }
}

async fn hash_password(password: String) -> Result<String, AuthError> {
    // bcrypt at DEFAULT_COST is CPU-heavy; keep it off the request workers.
    tokio::task::spawn_blocking(move || hash(password, DEFAULT_COST))
        .await
        .map_err(|e| AuthError::Internal(anyhow!("Hashing task failed: {}", e)))?
        .map_err(|e| AuthError::Internal(anyhow!("Failed to hash password: {}", e)))
}

async fn verify_password(password: String, password_hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| AuthError::Internal(anyhow!("Verification task failed: {}", e)))?
        .map_err(|e| AuthError::Internal(anyhow!("Failed to verify password: {}", e)))
}

/// Auth service errors
#[derive(Debug)]
pub enum AuthError {
    EmailTaken,
    InvalidCredentials,
    AccountNotActive,
    InvalidRefreshToken,
    Validation(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError::Internal(err)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::EmailTaken => (
                StatusCode::CONFLICT,
                "User with this email already exists".to_string(),
            ),
            AuthError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }
            AuthError::AccountNotActive => {
                (StatusCode::UNAUTHORIZED, "Account is not active".to_string())
            }
            AuthError::InvalidRefreshToken => (
                StatusCode::UNAUTHORIZED,
                "Invalid or expired refresh token".to_string(),
            ),
            AuthError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            AuthError::Internal(err) => {
                error!("Auth internal error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        // Wire shape: "message" carries the detail, "error" the status text
        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": message,
        }));

        (status, body).into_response()
    }
}
