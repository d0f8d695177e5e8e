//! Client Session Demo
//!
//! Walks the full session lifecycle against a running server: sign-up,
//! verification, token refresh, profile fetch, and sign-out.
//!
//! Start the server first:
//!   cargo run
//!
//! Then:
//!   cargo run --example client_session
//!
//! Point it at another server with:
//!   API_BASE_URL=http://localhost:3001 cargo run --example client_session

use anyhow::Result;
use std::env;
use std::sync::Arc;
use tenantkit_backend::auth::models::SignupRequest;
use tenantkit_backend::client::{HttpTransport, Session};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let base_url =
        env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string());

    println!("=== Client Session Demo ({}) ===\n", base_url);

    let transport = Arc::new(HttpTransport::new(&base_url)?);
    let mut session = Session::new(transport);

    // Throwaway account so the demo can be re-run
    let email = format!("demo-{}@example.com", Uuid::new_v4());
    session
        .sign_up(SignupRequest {
            email: email.clone(),
            password: "Passw0rd!".to_string(),
            first_name: "Demo".to_string(),
            last_name: "User".to_string(),
            role: None,
            tenant_id: None,
        })
        .await?;
    println!("Signed up as {} (state: {:?})", email, session.state());

    let verified = session.verify_session().await?;
    println!("Session verified: {}", verified);

    session.refresh_access_token().await?;
    println!("Access token refreshed");

    let profile = session.profile().await?;
    println!(
        "Profile: {} {} <{}> role={:?}",
        profile.first_name, profile.last_name, profile.email, profile.role
    );

    session.sign_out().await;
    println!("Signed out (state: {:?})", session.state());

    Ok(())
}
