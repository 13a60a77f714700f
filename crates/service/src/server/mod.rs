//! Axum HTTP(S) server and routing.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Inject shared application state (`AppState`) into handlers.
//! - Serve over rustls when a certificate and key are configured.

pub mod handlers;
pub mod router;
pub mod state;
pub mod tls;
