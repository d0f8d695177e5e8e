//! Authentication Models
//! Mission: Define secure user, token, and wire data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub tenant_id: Option<String>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// User roles for RBAC
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,  // Full access including admin-only endpoints
    Member, // Default role for new sign-ups
    Viewer, // Read-only access
}

impl UserRole {
    pub fn as_str(&self) -> &str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Member => "MEMBER",
            UserRole::Viewer => "VIEWER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Some(UserRole::Admin),
            "MEMBER" => Some(UserRole::Member),
            "VIEWER" => Some(UserRole::Viewer),
            _ => None,
        }
    }
}

/// Account lifecycle states. Only ACTIVE accounts may sign in or use tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

impl UserStatus {
    pub fn as_str(&self) -> &str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Inactive => "INACTIVE",
            UserStatus::Suspended => "SUSPENDED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Some(UserStatus::Active),
            "INACTIVE" => Some(UserStatus::Inactive),
            "SUSPENDED" => Some(UserStatus::Suspended),
            _ => None,
        }
    }
}

/// Access token claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String, // subject (user id)
    pub email: String,
    pub iat: usize,
    pub exp: usize,
}

/// Refresh token claims payload. The `jti` makes every issued token unique
/// even when two are minted for the same user within the same second.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub jti: String,
    pub iat: usize,
    pub exp: usize,
}

/// Persisted refresh token row. Validity is decided by this record alone.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Sign-up request body
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<UserRole>,
    pub tenant_id: Option<String>,
}

/// Sign-in request body
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SigninRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub password: String,
}

/// Refresh request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Logout request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// User projection returned from sign-up and sign-in (sanitized)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub tenant_id: Option<String>,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role.clone(),
            tenant_id: user.tenant_id.clone(),
        }
    }
}

/// Compact user echo for guarded endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub role: UserRole,
}

impl UserSummary {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.clone(),
        }
    }
}

/// Full profile projection for GET /auth/profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub tenant_id: Option<String>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl ProfileResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role.clone(),
            tenant_id: user.tenant_id.clone(),
            status: user.status.clone(),
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

/// Sign-up / sign-in response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserResponse,
}

/// Refresh response. Only a new access token; the refresh token is unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Verify response for GET /auth/verify
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: UserSummary,
}

/// Generic message response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
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

    #[test]
    fn test_user_role_serialization() {
        let admin = UserRole::Admin;
        let json = serde_json::to_string(&admin).unwrap();
        assert_eq!(json, r#""ADMIN""#);

        let member: UserRole = serde_json::from_str(r#""MEMBER""#).unwrap();
        assert_eq!(member, UserRole::Member);
    }

    #[test]
    fn test_user_role_string_conversion() {
        assert_eq!(UserRole::Admin.as_str(), "ADMIN");
        assert_eq!(UserRole::Member.as_str(), "MEMBER");
        assert_eq!(UserRole::Viewer.as_str(), "VIEWER");

        assert_eq!(UserRole::from_str("ADMIN"), Some(UserRole::Admin));
        assert_eq!(UserRole::from_str("member"), Some(UserRole::Member));
        assert_eq!(UserRole::from_str("invalid"), None);
    }

    #[test]
    fn test_user_status_string_conversion() {
        assert_eq!(UserStatus::Active.as_str(), "ACTIVE");
        assert_eq!(UserStatus::from_str("suspended"), Some(UserStatus::Suspended));
        assert_eq!(UserStatus::from_str("deleted"), None);
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = sample_user();
        let value = serde_json::to_value(&user).unwrap();

        assert!(value.get("passwordHash").is_none());
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["email"], "test@example.com");
    }

    #[test]
    fn test_wire_field_names_are_camel_case() {
        let response = AuthResponse {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            user: UserResponse::from_user(&sample_user()),
        };
        let value = serde_json::to_value(&response).unwrap();

        assert!(value.get("accessToken").is_some());
        assert!(value.get("refreshToken").is_some());
        assert!(value["user"].get("firstName").is_some());
        assert!(value["user"].get("tenantId").is_some());
    }

    #[test]
    fn test_signup_request_deserializes_camel_case() {
        let raw = r#"{
            "email": "new@example.com",
            "password": "Passw0rd!",
            "firstName": "New",
            "lastName": "User",
            "tenantId": "acme"
        }"#;
        let req: SignupRequest = serde_json::from_str(raw).unwrap();

        assert_eq!(req.first_name, "New");
        assert_eq!(req.tenant_id.as_deref(), Some("acme"));
        assert!(req.role.is_none());
    }

    #[test]
    fn test_signup_request_validation() {
        let valid = SignupRequest {
            email: "ok@example.com".to_string(),
            password: "longenough".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            role: None,
            tenant_id: None,
        };
        assert!(valid.validate().is_ok());

        let bad_email = SignupRequest {
            email: "not-an-email".to_string(),
            ..valid.clone()
        };
        assert!(bad_email.validate().is_err());

        let short_password = SignupRequest {
            password: "short".to_string(),
            ..valid
        };
        assert!(short_password.validate().is_err());
    }
}
