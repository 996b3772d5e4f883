//! Stowage Client SDK.
//!
//! This crate provides a client library for frontends and services to
//! interact with the stowage marketplace API.
//!
//! # Example
//!
//! ```no_run
//! use stowage_client::{StowageClient, StorageCheckoutRequest};
//!
//! # async fn example() -> Result<(), stowage_client::ClientError> {
//! let client = StowageClient::new("http://stowage:8080", "user-jwt-token");
//!
//! // Browse spaces with free surface
//! let spaces = client.list_available_spaces().await?;
//!
//! // Open a checkout session for the first one
//! let checkout = client
//!     .create_storage_checkout(StorageCheckoutRequest {
//!         storage_id: spaces[0].id.clone(),
//!         space_to_rent: 10,
//!         start_date: "2025-06-01".into(),
//!         end_date: "2025-09-01".into(),
//!     })
//!     .await?;
//!
//! println!("Pay at: {}", checkout.checkout_url);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, StowageClient};
pub use error::ClientError;
pub use types::*;
