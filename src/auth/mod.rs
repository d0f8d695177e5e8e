//! Authentication Module
//! Mission: Secure API access with JWT tokens, refresh sessions, and RBAC

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod service;
pub mod store;

pub use jwt::TokenIssuer;
pub use middleware::{require_auth, require_roles};
pub use service::{AuthError, AuthService};
pub use store::AuthStore;
