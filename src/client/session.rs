//! Client Session Store
//! Mission: Track the auth state machine and token pair for one client

use crate::auth::models::{AuthResponse, ProfileResponse, SignupRequest, UserResponse};
use crate::client::transport::{AuthTransport, ClientError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Verifying,
    Authenticated,
}

/// The payload persisted across process restarts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

/// Session context owned by the embedding application. Verification and
/// refresh are sequential for one session; methods take `&mut self`.
pub struct Session {
    transport: Arc<dyn AuthTransport>,
    state: SessionState,
    data: Option<SessionData>,
}

impl Session {
    pub fn new(transport: Arc<dyn AuthTransport>) -> Self {
        Self {
            transport,
            state: SessionState::Anonymous,
            data: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    pub fn user(&self) -> Option<&UserResponse> {
        self.data.as_ref().map(|d| &d.user)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.access_token.as_str())
    }

    /// Register a new account and authenticate this session with it.
    pub async fn sign_up(&mut self, req: SignupRequest) -> Result<(), ClientError> {
        let response = self.transport.sign_up(&req).await?;
        self.install(response);

        Ok(())
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<(), ClientError> {
        let response = self.transport.sign_in(email, password).await?;
        self.install(response);

        Ok(())
    }

    /// Revoke the refresh token server-side when possible and always clear
    /// local state.
    pub async fn sign_out(&mut self) {
        if let Some(data) = self.data.clone() {
            if let Err(e) = self
                .transport
                .logout(&data.access_token, &data.refresh_token)
                .await
            {
                warn!("Server-side logout failed (clearing local session anyway): {}", e);
            }
        }

        self.clear();
    }

    /// Check the stored access token against the server before entering a
    /// protected area. Returns Ok(false) once the session is unrecoverable;
    /// transport failures leave the session in place and bubble up.
    pub async fn verify_session(&mut self) -> Result<bool, ClientError> {
        let Some(data) = self.data.clone() else {
            return Ok(false);
        };

        self.state = SessionState::Verifying;

        match self.transport.verify(&data.access_token).await {
            Ok(_) => {
                self.state = SessionState::Authenticated;
                Ok(true)
            }
            Err(ClientError::Unauthorized(_)) => self.silent_refresh(&data.refresh_token).await,
            Err(e) => {
                // Transient failure; the tokens may still be good
                self.state = SessionState::Authenticated;
                Err(e)
            }
        }
    }

    /// Mint a fresh access token from the stored refresh token. Only a
    /// server-side rejection of the refresh token ends the session.
    pub async fn refresh_access_token(&mut self) -> Result<(), ClientError> {
        let Some(data) = self.data.clone() else {
            return Err(ClientError::Unauthorized("No active session".to_string()));
        };

        match self.transport.refresh(&data.refresh_token).await {
            Ok(access_token) => {
                if let Some(data) = self.data.as_mut() {
                    data.access_token = access_token;
                }
                Ok(())
            }
            Err(ClientError::Unauthorized(msg)) => {
                info!("🔒 Refresh token rejected; clearing session");
                self.clear();
                Err(ClientError::Unauthorized(msg))
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch the full profile for the signed-in account.
    pub async fn profile(&self) -> Result<ProfileResponse, ClientError> {
        let Some(data) = &self.data else {
            return Err(ClientError::Unauthorized("No active session".to_string()));
        };

        self.transport.profile(&data.access_token).await
    }

    /// Restore a persisted session. Missing file means staying anonymous.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file {}", path.display()))?;
        let data: SessionData = serde_json::from_str(&raw).context("Malformed session file")?;

        info!("🔓 Restored session for {}", data.user.email);
        self.data = Some(data);
        self.state = SessionState::Authenticated;

        Ok(())
    }

    /// Persist the session, or remove the file when signed out.
    pub fn save(&self, path: &Path) -> Result<()> {
        match &self.data {
            Some(data) => {
                let raw =
                    serde_json::to_string_pretty(data).context("Failed to serialize session")?;
                fs::write(path, raw)
                    .with_context(|| format!("Failed to write session file {}", path.display()))?;
            }
            None => {
                if path.exists() {
                    fs::remove_file(path).with_context(|| {
                        format!("Failed to remove session file {}", path.display())
                    })?;
                }
            }
        }

        Ok(())
    }

    async fn silent_refresh(&mut self, refresh_token: &str) -> Result<bool, ClientError> {
        match self.transport.refresh(refresh_token).await {
            Ok(access_token) => {
                if let Some(data) = self.data.as_mut() {
                    data.access_token = access_token;
                }
                self.state = SessionState::Authenticated;
                debug!("Access token refreshed after failed verification");
                Ok(true)
            }
            Err(ClientError::Unauthorized(_)) => {
                info!("🔒 Silent refresh rejected; clearing session");
                self.clear();
                Ok(false)
            }
            Err(e) => {
                self.state = SessionState::Authenticated;
                Err(e)
            }
        }
    }

    fn install(&mut self, response: AuthResponse) {
        info!("🔓 Session authenticated as {}", response.user.email);
        self.data = Some(SessionData {
            user: response.user,
            access_token: response.access_token,
            refresh_token: response.refresh_token,
        });
        self.state = SessionState::Authenticated;
    }

    fn clear(&mut self) {
        self.data = None;
        self.state = SessionState::Anonymous;
    }
}
