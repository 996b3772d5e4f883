//! Stowage HTTP API Service.
//!
//! This crate provides the HTTP API for the stowage marketplace, including:
//!
//! - Profile, storage space, product, rental and order endpoints
//! - Checkout session creation against Stripe
//! - The Stripe webhook reconciliation pipeline
//! - The background reconciliation sweep
//!
//! # Authentication
//!
//! End-user requests carry a bearer JWT verified against the identity
//! provider's JWKS; admin endpoints use an API key header. The webhook
//! endpoint authenticates by payload signature instead.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers need async for routing consistency

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod reconcile;
pub mod routes;
pub mod state;
pub mod stripe;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
pub use stripe::{StripeClient, StripeError};
