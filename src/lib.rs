//! Tenantkit Backend Library
//!
//! Exposes the auth service, API router, and client session store for use
//! by the server binary, embedding applications, and tests.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
