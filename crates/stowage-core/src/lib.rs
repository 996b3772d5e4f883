//! Core types for the stowage marketplace.
//!
//! This crate provides the foundational types shared by the storage layer,
//! the HTTP service and the client SDK:
//!
//! - **Identifiers**: `UserId`, `SpaceId`, `ProductId`, `RentalId`, `OrderId`
//! - **Profiles**: `Profile`, `Role`
//! - **Spaces and rentals**: `StorageSpace`, `Rental`
//! - **Products and orders**: `Product`, `Order`, `OrderStatus`
//! - **Payments**: `LedgerTransaction`, `TransactionKind`, `Payout`
//! - **Webhooks**: `WebhookEvent`, `EventStatus`
//!
//! # Money
//!
//! All monetary amounts are integer cents (`i64`); currencies are lowercase
//! ISO codes (`"eur"` by default). Floating point never touches a price.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod event;
pub mod ids;
pub mod ledger;
pub mod order;
pub mod payout;
pub mod product;
pub mod profile;
pub mod rental;
pub mod space;

pub use error::{DomainError, Result};
pub use event::{EventStatus, WebhookEvent};
pub use ids::{IdError, OrderId, OrderNumber, ProductId, RentalId, SpaceId, UserId};
pub use ledger::{LedgerTransaction, TransactionKind, TransactionStatus};
pub use order::{Order, OrderStatus};
pub use payout::{Payout, PayoutStatus};
pub use product::Product;
pub use profile::{Profile, Role};
pub use rental::Rental;
pub use space::StorageSpace;
