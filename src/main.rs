//! Tenantkit Backend
//! Mission: Multi-tenant SaaS starter API with JWT auth and role-based access

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tenantkit_backend::{
    api::{create_router, AppState},
    auth::{AuthService, AuthStore, TokenIssuer},
    config::{load_env, Config},
};
use tokio::net::TcpListener;
use tokio::time::interval;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    load_env();
    init_tracing();

    info!("🚀 Tenantkit Backend Starting");

    let config = Config::from_env();

    // Initialize the authentication system
    let store = Arc::new(AuthStore::new(&config.database_path)?);
    let tokens = TokenIssuer::new(
        config.jwt_secret.clone(),
        config.access_token_ttl_secs,
        config.refresh_token_ttl_secs,
    );
    let auth = Arc::new(AuthService::new(store.clone(), tokens));

    info!("🔐 Auth database initialized at: {}", config.database_path);

    // Periodically drop expired refresh tokens to keep the DB lean
    tokio::spawn(token_pruning_polling(
        store.clone(),
        config.token_prune_poll_secs,
    ));

    let state = AppState::new(auth);
    let app = create_router(state).layer(cors_layer(config.cors_origin.as_deref()));

    // Start server
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("🎯 API server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

async fn token_pruning_polling(store: Arc<AuthStore>, poll_secs: u64) -> Result<()> {
    let mut ticker = interval(Duration::from_secs(poll_secs));
    loop {
        ticker.tick().await;

        match store.prune_expired_refresh_tokens(Utc::now()) {
            Ok(deleted) => {
                if deleted > 0 {
                    info!("🧹 Pruned {} expired refresh tokens", deleted);
                }
            }
            Err(e) => warn!("token prune failed: {}", e),
        }
    }
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    match origin {
        Some(raw) => match raw.parse::<HeaderValue>() {
            Ok(value) => CorsLayer::new()
                .allow_origin(value)
                .allow_methods(Any)
                .allow_headers(Any),
            Err(_) => {
                warn!("Invalid CORS_ORIGIN {:?}; falling back to permissive", raw);
                CorsLayer::permissive()
            }
        },
        None => CorsLayer::permissive(),
    }
}

/// Initialize tracing with enhanced observability
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tenantkit_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
