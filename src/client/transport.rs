//! Auth Transport
//! Mission: Carry client session calls to the auth API over HTTP

use crate::auth::models::{
    AuthResponse, LogoutRequest, ProfileResponse, RefreshRequest, RefreshResponse, SigninRequest,
    SignupRequest, VerifyResponse,
};
use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;

/// Client-side errors, split by how the session store has to react
#[derive(Debug)]
pub enum ClientError {
    /// The server rejected the credentials or token (HTTP 401)
    Unauthorized(String),
    /// Any other HTTP error response from the API
    Api { status: u16, message: String },
    /// The request never produced an HTTP response
    Network(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ClientError::Api { status, message } => write!(f, "API error {}: {}", status, message),
            ClientError::Network(msg) => write!(f, "Network error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

/// Wire operations the session store needs. Implemented over HTTP in
/// production and by an in-memory fake in tests; the implementation is
/// picked once at construction time.
#[async_trait]
pub trait AuthTransport: Send + Sync {
    async fn sign_up(&self, req: &SignupRequest) -> Result<AuthResponse, ClientError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError>;
    async fn refresh(&self, refresh_token: &str) -> Result<String, ClientError>;
    async fn logout(&self, access_token: &str, refresh_token: &str) -> Result<(), ClientError>;
    async fn verify(&self, access_token: &str) -> Result<VerifyResponse, ClientError>;
    async fn profile(&self, access_token: &str) -> Result<ProfileResponse, ClientError>;
}

/// HTTP transport against a running API server
pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }
}

#[async_trait]
impl AuthTransport for HttpTransport {
    async fn sign_up(&self, req: &SignupRequest) -> Result<AuthResponse, ClientError> {
        let resp = self
            .http
            .post(self.url("/auth/signup"))
            .json(req)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        read_json(resp).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let body = SigninRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let resp = self
            .http
            .post(self.url("/auth/signin"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        read_json(resp).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, ClientError> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };

        let resp = self
            .http
            .post(self.url("/auth/refresh"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let refreshed: RefreshResponse = read_json(resp).await?;
        Ok(refreshed.access_token)
    }

    async fn logout(&self, access_token: &str, refresh_token: &str) -> Result<(), ClientError> {
        let body = LogoutRequest {
            refresh_token: refresh_token.to_string(),
        };

        let resp = self
            .http
            .post(self.url("/auth/logout"))
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if resp.status().is_success() {
            return Ok(());
        }

        Err(read_error(resp).await)
    }

    async fn verify(&self, access_token: &str) -> Result<VerifyResponse, ClientError> {
        let resp = self
            .http
            .get(self.url("/auth/verify"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        read_json(resp).await
    }

    async fn profile(&self, access_token: &str) -> Result<ProfileResponse, ClientError> {
        let resp = self
            .http
            .get(self.url("/auth/profile"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        read_json(resp).await
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    if !resp.status().is_success() {
        return Err(read_error(resp).await);
    }

    resp.json::<T>()
        .await
        .map_err(|e| ClientError::Network(format!("Invalid response body: {}", e)))
}

/// Map a non-2xx response to a `ClientError`, pulling the detail out of the
/// API's `{"message": ..., "error": ...}` body when present.
async fn read_error(resp: reqwest::Response) -> ClientError {
    let status = resp.status().as_u16();
    let message = resp
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| "Request failed".to_string());

    if status == 401 {
        ClientError::Unauthorized(message)
    } else {
        ClientError::Api { status, message }
    }
}
