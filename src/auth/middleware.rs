//! Route Guards
//! Mission: Protect API endpoints with JWT validation and role checks

use crate::auth::{
    models::{User, UserRole},
    service::AuthService,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::{future::Future, pin::Pin, sync::Arc};
use tracing::{error, warn};
use uuid::Uuid;

/// Request guard that validates the bearer token and resolves the live user
pub async fn require_auth(
    State(auth): State<Arc<AuthService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, GuardError> {
    let token = bearer_token(req.headers()).ok_or(GuardError::MissingToken)?;

    // Validate signature and expiry, then extract the subject
    let claims = auth
        .verify_access_token(token)
        .map_err(|_| GuardError::InvalidToken)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| GuardError::InvalidToken)?;

    // Re-check the account on every request so deactivation takes effect
    // before the access token expires
    let user = match auth.validate_user(&user_id) {
        Ok(Some(user)) => user,
        Ok(None) => return Err(GuardError::InactiveUser),
        Err(e) => {
            error!("User lookup failed during auth: {:?}", e);
            return Err(GuardError::Internal);
        }
    };

    // Add the user to request extensions so handlers can access it
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Role guard for use behind `require_auth`. Membership is exact: ADMIN does
/// not implicitly satisfy a MEMBER-only route.
pub fn require_roles(
    allowed: &'static [UserRole],
) -> impl Fn(Request, Next) -> Pin<Box<dyn Future<Output = Result<Response, GuardError>> + Send>>
       + Clone
       + Send
       + 'static {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let role = match extract_user(&req) {
                Some(user) => user.role.clone(),
                None => return Err(GuardError::MissingToken),
            };

            if !allowed.contains(&role) {
                warn!("🚫 Role {} denied for {}", role.as_str(), req.uri().path());
                return Err(GuardError::Forbidden);
            }

            Ok(next.run(req).await)
        })
    }
}

/// Extract the authenticated user from a request (use after `require_auth`)
pub fn extract_user(req: &Request) -> Option<&User> {
    req.extensions().get::<User>()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Guard error types
#[derive(Debug)]
pub enum GuardError {
    MissingToken,
    InvalidToken,
    InactiveUser,
    Forbidden,
    Internal,
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            GuardError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing authorization token"),
            GuardError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            GuardError::InactiveUser => (StatusCode::UNAUTHORIZED, "Account is not active"),
            GuardError::Forbidden => (StatusCode::FORBIDDEN, "Insufficient permissions"),
            GuardError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::UserStatus;
    use axum::{body::Body, http::Request as HttpRequest};
    use chrono::Utc;

    fn create_test_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "guard@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Guard".to_string(),
            last_name: "Test".to_string(),
            role: UserRole::Member,
            tenant_id: None,
            status: UserStatus::Active,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_guard_error_responses() {
        let missing = GuardError::MissingToken.into_response();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let invalid = GuardError::InvalidToken.into_response();
        assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);

        let inactive = GuardError::InactiveUser.into_response();
        assert_eq!(inactive.status(), StatusCode::UNAUTHORIZED);

        let forbidden = GuardError::Forbidden.into_response();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let internal = GuardError::Internal.into_response();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_bearer_token_parsing() {
        let req = HttpRequest::builder()
            .header("Authorization", "Bearer abc123")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(req.headers()), Some("abc123"));

        let req = HttpRequest::new(Body::empty());
        assert_eq!(bearer_token(req.headers()), None);

        let req = HttpRequest::builder()
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(req.headers()), None);
    }

    #[test]
    fn test_extract_user_from_request() {
        let mut req = HttpRequest::new(Body::empty());

        // No user until the auth guard inserts one
        assert!(extract_user(&req).is_none());

        req.extensions_mut().insert(create_test_user());

        let extracted = extract_user(&req);
        assert!(extracted.is_some());
        assert_eq!(extracted.unwrap().email, "guard@example.com");
    }
}
