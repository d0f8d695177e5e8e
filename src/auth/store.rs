//! Account & Token Storage
//! Mission: Persist user accounts and refresh tokens with SQLite

use crate::auth::models::{RefreshTokenRecord, User, UserRole, UserStatus};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex; // parking_lot for faster locking
use rusqlite::{params, Connection, OpenFlags};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const SCHEMA_SQL: &str = r#"
-- Enable WAL mode for better concurrent access
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    role TEXT NOT NULL,
    tenant_id TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_login_at TEXT
);

CREATE TABLE IF NOT EXISTS refresh_tokens (
    token TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user
    ON refresh_tokens(user_id);

CREATE INDEX IF NOT EXISTS idx_refresh_tokens_expires
    ON refresh_tokens(expires_at);
"#;

const USER_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, role, tenant_id, status, created_at, last_login_at";

/// User and refresh-token storage with SQLite backend
pub struct AuthStore {
    conn: Arc<Mutex<Connection>>,
}

impl AuthStore {
    /// Open (or create) the database and initialize the schema.
    pub fn new(db_path: &str) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX; // We handle our own locking

        let conn = Connection::open_with_flags(db_path, flags)
            .with_context(|| format!("Failed to open auth database at {}", db_path))?;

        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize auth schema")?;

        let user_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap_or(0);

        info!("🔐 Auth database ready ({} users)", user_count);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert a fully-built user. Fails on duplicate email (UNIQUE).
    pub fn insert_user(&self, user: &User) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, role, tenant_id, status, created_at, last_login_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                user.id.to_string(),
                user.email,
                user.password_hash,
                user.first_name,
                user.last_name,
                user.role.as_str(),
                user.tenant_id,
                user.status.as_str(),
                user.created_at.to_rfc3339(),
                user.last_login_at.map(|at| at.to_rfc3339()),
            ],
        )
        .context("Failed to insert user")?;

        Ok(())
    }

    /// Get user by email
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users WHERE email = ?1",
            USER_COLUMNS
        ))?;

        match stmt.query_row(params![email], row_to_user) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get user by id
    pub fn find_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))?;

        match stmt.query_row(params![id.to_string()], row_to_user) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Stamp a successful sign-in.
    pub fn record_login(&self, id: &Uuid, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE users SET last_login_at = ?1 WHERE id = ?2",
            params![at.to_rfc3339(), id.to_string()],
        )
        .context("Failed to record login")?;

        Ok(())
    }

    /// Change an account's lifecycle status.
    pub fn set_user_status(&self, id: &Uuid, status: UserStatus) -> Result<()> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE users SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id.to_string()],
        )?;

        if updated == 0 {
            anyhow::bail!("User not found");
        }

        Ok(())
    }

    /// Persist a freshly issued refresh token.
    pub fn insert_refresh_token(
        &self,
        token: &str,
        user_id: &Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO refresh_tokens (token, user_id, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                token,
                user_id.to_string(),
                expires_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ],
        )
        .context("Failed to insert refresh token")?;

        Ok(())
    }

    /// Look up a refresh token by its exact string.
    pub fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT token, user_id, expires_at, created_at
             FROM refresh_tokens WHERE token = ?1",
        )?;

        let record = stmt.query_row(params![token], |row| {
            let user_id: String = row.get(1)?;
            Ok(RefreshTokenRecord {
                token: row.get(0)?,
                user_id: Uuid::parse_str(&user_id).map_err(|e| conversion_error(1, e))?,
                expires_at: parse_timestamp(&row.get::<_, String>(2)?, 2)?,
                created_at: parse_timestamp(&row.get::<_, String>(3)?, 3)?,
            })
        });

        match record {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a single refresh token. Returns the number of rows removed,
    /// which is zero when the token was already gone (logout is idempotent).
    pub fn delete_refresh_token(&self, token: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn
            .execute("DELETE FROM refresh_tokens WHERE token = ?1", params![token])
            .context("Failed to delete refresh token")?;

        Ok(deleted)
    }

    /// Delete every refresh token owned by a user.
    pub fn delete_refresh_tokens_for_user(&self, user_id: &Uuid) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn
            .execute(
                "DELETE FROM refresh_tokens WHERE user_id = ?1",
                params![user_id.to_string()],
            )
            .context("Failed to delete refresh tokens")?;

        Ok(deleted)
    }

    /// Sweep rows past their expiry. Expired tokens are already rejected at
    /// read time, so this only reclaims space.
    pub fn prune_expired_refresh_tokens(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn
            .execute(
                "DELETE FROM refresh_tokens WHERE expires_at < ?1",
                params![now.to_rfc3339()],
            )
            .context("Failed to prune refresh tokens")?;

        Ok(deleted)
    }

    /// Count live refresh-token rows for a user.
    pub fn count_refresh_tokens_for_user(&self, user_id: &Uuid) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?1",
            params![user_id.to_string()],
            |row| row.get(0),
        )?;

        Ok(count)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let role: String = row.get(5)?;
    let status: String = row.get(7)?;
    let created_at: String = row.get(8)?;
    let last_login_at: Option<String> = row.get(9)?;

    Ok(User {
        id: Uuid::parse_str(&id).map_err(|e| conversion_error(0, e))?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        // Unknown strings fall back to least privilege
        role: UserRole::from_str(&role).unwrap_or(UserRole::Viewer),
        tenant_id: row.get(6)?,
        status: UserStatus::from_str(&status).unwrap_or(UserStatus::Inactive),
        created_at: parse_timestamp(&created_at, 8)?,
        last_login_at: last_login_at.map(|raw| parse_timestamp(&raw, 9)).transpose()?,
    })
}

fn parse_timestamp(raw: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, e))
}

fn conversion_error(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}
