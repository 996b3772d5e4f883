//! Stripe integration: API client and wire types.

pub mod client;
pub mod types;

pub use client::{CheckoutSessionRequest, StripeClient, StripeError};
pub use types::{CheckoutSession, PurchaseMetadata, RentalMetadata};
