//! Server Configuration
//! Mission: Collect runtime settings from the environment with safe defaults

use dotenv::dotenv;
use std::env;
use std::path::{Path, PathBuf};

/// Runtime configuration, resolved once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_path: String,
    pub jwt_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub cors_origin: Option<String>,
    pub token_prune_poll_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(3001);

        let database_path = resolve_data_path(
            env::var("DATABASE_PATH")
                .or_else(|_| env::var("DB_PATH"))
                .ok(),
            "tenantkit.db",
        );

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            "dev-secret-change-in-production-minimum-32-characters".to_string()
        });

        let access_token_ttl_secs = env::var("ACCESS_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(900);

        // Refresh tokens default to a 7 day lifetime
        let refresh_token_ttl_secs = env::var("REFRESH_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(7 * 24 * 3600);

        let cors_origin = env::var("CORS_ORIGIN")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let token_prune_poll_secs = env::var("TOKEN_PRUNE_POLL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(3600);

        Self {
            bind_addr: format!("0.0.0.0:{}", port),
            database_path,
            jwt_secret,
            access_token_ttl_secs,
            refresh_token_ttl_secs,
            cors_origin,
            token_prune_poll_secs,
        }
    }
}

fn default_data_path(filename: &str) -> String {
    // Anchor defaults to the crate directory, not the caller's cwd
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    base.join(filename).to_string_lossy().to_string()
}

pub fn resolve_data_path(env_value: Option<String>, default_filename: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let Some(raw) = env_value.filter(|v| !v.trim().is_empty()) else {
        return default_data_path(default_filename);
    };

    let p = PathBuf::from(raw);
    if p.is_absolute() {
        return p.to_string_lossy().to_string();
    }

    base.join(p).to_string_lossy().to_string()
}

pub fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) Also try crate-local and repo-root .env when run with --manifest-path
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let candidates = [manifest_dir.join(".env"), manifest_dir.join("../.env")];

    for p in candidates {
        if p.exists() {
            let _ = dotenv::from_path(&p);
        }
    }
}
