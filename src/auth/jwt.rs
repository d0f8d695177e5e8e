//! JWT Token Issuer
//! Mission: Generate and validate signed access and refresh tokens securely

use crate::auth::models::{AccessClaims, RefreshClaims, User};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;
use uuid::Uuid;

/// HS256 issuer for the access/refresh token pair
pub struct TokenIssuer {
    secret: String,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(secret: String, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            secret,
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    /// Issue a short-lived access token binding the user's id and email.
    pub fn issue_access_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(Duration::seconds(self.access_ttl_secs))
            .context("Invalid timestamp")?;

        let claims = AccessClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            iat: now.timestamp() as usize,
            exp: expiration.timestamp() as usize,
        };

        debug!(
            "Issuing access token for user {} (expires in {}s)",
            user.id, self.access_ttl_secs
        );

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to sign access token")
    }

    /// Issue a refresh token together with the expiry to persist alongside it.
    pub fn issue_refresh_token(&self, user: &User) -> Result<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(Duration::seconds(self.refresh_ttl_secs))
            .context("Invalid timestamp")?;

        let claims = RefreshClaims {
            sub: user.id.to_string(),
            token_type: "refresh".to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to sign refresh token")?;

        Ok((token, expires_at))
    }

    /// Validate an access token and extract its claims.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims> {
        let decoded = decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .context("Invalid or expired token")?;

        Ok(decoded.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{UserRole, UserStatus};

    fn create_test_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role: UserRole::Member,
            tenant_id: None,
            status: UserStatus::Active,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    fn test_issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret-key-12345".to_string(), 900, 7 * 24 * 3600)
    }

    #[test]
    fn test_access_token_round_trip() {
        let issuer = test_issuer();
        let user = create_test_user();

        let token = issuer.issue_access_token(&user).unwrap();
        assert!(!token.is_empty());

        let claims = issuer.validate_access_token(&token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, user.email);
        assert!(claims.exp > Utc::now().timestamp() as usize);
    }

    #[test]
    fn test_invalid_token_rejected() {
        let issuer = test_issuer();

        let result = issuer.validate_access_token("invalid.token.here");
        assert!(result.is_err());
    }

    #[test]
    fn test_different_secrets_reject() {
        let issuer1 = TokenIssuer::new("secret1".to_string(), 900, 3600);
        let issuer2 = TokenIssuer::new("secret2".to_string(), 900, 3600);
        let user = create_test_user();

        let token = issuer1.issue_access_token(&user).unwrap();

        let result = issuer2.validate_access_token(&token);
        assert!(result.is_err());
    }

    #[test]
    fn test_expired_access_token_rejected() {
        // Negative TTL puts the expiry far enough in the past to clear the
        // default validation leeway.
        let issuer = TokenIssuer::new("test-secret-key-12345".to_string(), -3600, 3600);
        let user = create_test_user();

        let token = issuer.issue_access_token(&user).unwrap();
        assert!(issuer.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_refresh_tokens_are_unique_per_issuance() {
        let issuer = test_issuer();
        let user = create_test_user();

        let (first, _) = issuer.issue_refresh_token(&user).unwrap();
        let (second, _) = issuer.issue_refresh_token(&user).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_refresh_expiry_matches_ttl() {
        let issuer = test_issuer();
        let user = create_test_user();

        let (_, expires_at) = issuer.issue_refresh_token(&user).unwrap();
        let expected = Utc::now() + Duration::seconds(7 * 24 * 3600);
        assert!((expires_at - expected).num_seconds().abs() < 5);
    }

    #[test]
    fn test_refresh_token_rejected_as_access_token() {
        let issuer = test_issuer();
        let user = create_test_user();

        // Refresh claims carry no email, so access validation must fail even
        // though the signature is genuine.
        let (refresh, _) = issuer.issue_refresh_token(&user).unwrap();
        assert!(issuer.validate_access_token(&refresh).is_err());
    }
}
