use axum::{
    extract::{Extension, FromRef, State},
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

use crate::auth::{
    api as auth_api,
    middleware::{require_auth, require_roles},
    models::{User, UserRole, UserSummary},
    service::AuthService,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self {
            auth,
            started_at: Instant::now(),
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    // Role layer is registered before the auth layer so auth runs first
    let admin_routes = Router::new()
        .route("/admin-only", get(admin_only))
        .route_layer(middleware::from_fn(require_roles(&[UserRole::Admin])));

    let protected_routes = Router::new()
        .route("/protected", get(protected))
        .route("/auth/logout", post(auth_api::logout))
        .route("/auth/logout-all", post(auth_api::logout_all))
        .route("/auth/profile", get(auth_api::profile))
        .route("/auth/verify", get(auth_api::verify))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            require_auth,
        ));

    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/hello", get(hello))
        .route("/auth/signup", post(auth_api::signup))
        .route("/auth/signin", post(auth_api::signin))
        .route("/auth/refresh", post(auth_api::refresh));

    Router::new()
        .nest("/api/v1", public_routes.merge(protected_routes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

/// Public hello endpoint
async fn hello() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello from Tenantkit! 🚀".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Guarded example endpoint; any authenticated active user may call it
async fn protected(Extension(user): Extension<User>) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        message: "This is a protected route".to_string(),
        user: UserSummary::from_user(&user),
    })
}

/// Admin-gated example endpoint
async fn admin_only(Extension(user): Extension<User>) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        message: "This is an admin-only route".to_string(),
        user: UserSummary::from_user(&user),
    })
}

// ===== Response Types =====

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
    uptime: f64,
}

#[derive(Serialize)]
struct HelloResponse {
    message: String,
    timestamp: String,
}

#[derive(Serialize)]
struct ProtectedResponse {
    message: String,
    user: UserSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{jwt::TokenIssuer, store::AuthStore};
    use tempfile::NamedTempFile;

    fn create_test_state() -> (AppState, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let store = Arc::new(AuthStore::new(db_path).unwrap());
        let tokens = TokenIssuer::new("router-test-secret".to_string(), 900, 3600);
        let auth = Arc::new(AuthService::new(store, tokens));
        (AppState::new(auth), temp_file)
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let (state, _temp) = create_test_state();

        let Json(body) = health(State(state)).await;
        assert_eq!(body.status, "ok");
        assert!(body.uptime >= 0.0);
        assert!(!body.timestamp.is_empty());
    }

    #[tokio::test]
    async fn test_hello_is_public_greeting() {
        let Json(body) = hello().await;
        assert!(body.message.contains("Hello"));
    }

    #[test]
    fn test_router_builds() {
        let (state, _temp) = create_test_state();
        let _router = create_router(state);
    }
}
