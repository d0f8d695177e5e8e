//! Authentication API Endpoints
//! Mission: Expose sign-up, sign-in, and session lifecycle endpoints

use crate::auth::{
    models::{
        AuthResponse, LogoutRequest, MessageResponse, ProfileResponse, RefreshRequest,
        RefreshResponse, SigninRequest, SignupRequest, User, UserSummary, VerifyResponse,
    },
    service::{AuthError, AuthService},
};
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

/// Sign-up endpoint - POST /api/v1/auth/signup
pub async fn signup(
    State(auth): State<Arc<AuthService>>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    info!("🔐 Sign-up attempt: {}", payload.email);

    payload
        .validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    let response = auth.sign_up(payload).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Sign-in endpoint - POST /api/v1/auth/signin
pub async fn signin(
    State(auth): State<Arc<AuthService>>,
    Json(payload): Json<SigninRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    info!("🔐 Sign-in attempt: {}", payload.email);

    payload
        .validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    let response = auth.sign_in(&payload.email, &payload.password).await?;

    Ok(Json(response))
}

/// Refresh endpoint - POST /api/v1/auth/refresh
pub async fn refresh(
    State(auth): State<Arc<AuthService>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AuthError> {
    let access_token = auth.refresh(&payload.refresh_token).await?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Logout endpoint - POST /api/v1/auth/logout
pub async fn logout(
    State(auth): State<Arc<AuthService>>,
    Json(payload): Json<LogoutRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    auth.logout(&payload.refresh_token).await?;

    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// Logout-all endpoint - POST /api/v1/auth/logout-all
pub async fn logout_all(
    State(auth): State<Arc<AuthService>>,
    Extension(user): Extension<User>,
) -> Result<Json<MessageResponse>, AuthError> {
    auth.logout_all(&user.id).await?;

    Ok(Json(MessageResponse {
        message: "Logged out from all devices".to_string(),
    }))
}

/// Profile endpoint - GET /api/v1/auth/profile
pub async fn profile(Extension(user): Extension<User>) -> Json<ProfileResponse> {
    Json(ProfileResponse::from_user(&user))
}

/// Verify endpoint - GET /api/v1/auth/verify
pub async fn verify(Extension(user): Extension<User>) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        user: UserSummary::from_user(&user),
    })
}
