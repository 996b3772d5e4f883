//! `RocksDB` storage layer for the stowage marketplace.
//!
//! This crate persists profiles, storage spaces, rentals, products, orders,
//! ledger transactions, payouts and the webhook event log using `RocksDB`
//! with column families for indexing.
//!
//! # Consistency
//!
//! The webhook side effects (rental activation, order fulfillment) are
//! exposed only as compound operations that validate and commit in a single
//! `WriteBatch` under an internal commit lock: the availability check and
//! the counter decrement either land together or not at all, and two
//! concurrent confirmations cannot both pass the same check. The ledger's
//! unique transaction key is checked inside the same critical section, so a
//! redelivered event can never apply its side effect twice.
//!
//! # Example
//!
//! ```no_run
//! use stowage_store::{RocksStore, Store};
//! use stowage_core::{Profile, Role, UserId};
//!
//! let store = RocksStore::open("/tmp/stowage-db").unwrap();
//!
//! let lessor = Profile::new(UserId::generate(), "Dock Sud", Role::Lessor);
//! store.put_profile(&lessor).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use chrono::NaiveDate;
use stowage_core::{
    EventStatus, LedgerTransaction, Order, OrderId, OrderStatus, Payout, Product, ProductId,
    Profile, Rental, RentalId, SpaceId, StorageSpace, UserId, WebhookEvent,
};

/// A confirmed rental booking, as read back from checkout-session metadata.
#[derive(Debug, Clone)]
pub struct RentalBooking {
    /// The renter paying for the surface.
    pub renter_id: UserId,
    /// The space being rented.
    pub storage_id: SpaceId,
    /// Surface units to rent.
    pub space_amount: i64,
    /// First day of the rental period.
    pub start_date: NaiveDate,
    /// Last day of the rental period.
    pub end_date: NaiveDate,
}

/// A confirmed product purchase, as read back from checkout-session metadata.
#[derive(Debug, Clone)]
pub struct OrderPlacement {
    /// The buyer.
    pub buyer_id: UserId,
    /// The space the goods are collected from.
    pub storage_id: SpaceId,
    /// The purchased product.
    pub product_id: ProductId,
    /// Units purchased.
    pub quantity: i64,
    /// Unit price in cents, echoed from the session metadata.
    pub unit_price_cents: i64,
    /// The checkout session that paid for the order.
    pub session_id: String,
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (e.g. `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Profile Operations
    // =========================================================================

    /// Insert or update a profile, maintaining the payout-account index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_profile(&self, profile: &Profile) -> Result<()>;

    /// Get a profile by user id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>>;

    /// Look a profile up by its connected payout account id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_profile_by_account(&self, account_id: &str) -> Result<Option<Profile>>;

    /// List profiles (admin dashboard), newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_profiles(&self, limit: usize, offset: usize) -> Result<Vec<Profile>>;

    // =========================================================================
    // Storage Space Operations
    // =========================================================================

    /// Insert a new space.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the name is already taken.
    fn create_space(&self, space: &StorageSpace) -> Result<()>;

    /// Update an existing space, re-checking name uniqueness on rename.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the space doesn't exist, or
    /// `StoreError::Conflict` if the new name is taken.
    fn update_space(&self, space: &StorageSpace) -> Result<()>;

    /// Get a space by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_space(&self, space_id: &SpaceId) -> Result<Option<StorageSpace>>;

    /// Delete a space.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the space doesn't exist.
    fn delete_space(&self, space_id: &SpaceId) -> Result<()>;

    /// List all spaces owned by one lessor.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_spaces_by_owner(&self, owner_id: &UserId) -> Result<Vec<StorageSpace>>;

    /// List spaces with free surface, for the public rental listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_available_spaces(&self) -> Result<Vec<StorageSpace>>;

    /// List all spaces (admin dashboard), newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_spaces(&self, limit: usize, offset: usize) -> Result<Vec<StorageSpace>>;

    // =========================================================================
    // Rental Operations
    // =========================================================================

    /// Get a rental by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_rental(&self, rental_id: RentalId) -> Result<Option<Rental>>;

    /// List a renter's rentals, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_rentals_by_renter(&self, renter_id: &UserId) -> Result<Vec<Rental>>;

    /// Find the renter's live (not yet ended) rental on a space, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_live_rental(
        &self,
        renter_id: &UserId,
        storage_id: &SpaceId,
        today: NaiveDate,
    ) -> Result<Option<Rental>>;

    /// Flip reserved rentals whose start date has arrived to active.
    ///
    /// Returns how many rentals were activated.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn activate_due_rentals(&self, today: NaiveDate) -> Result<usize>;

    // =========================================================================
    // Product Operations
    // =========================================================================

    /// Insert a new product.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the name is already taken.
    fn create_product(&self, product: &Product) -> Result<()>;

    /// Update an existing product, re-checking name uniqueness on rename.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product doesn't exist, or
    /// `StoreError::Conflict` if the new name is taken.
    fn update_product(&self, product: &Product) -> Result<()>;

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>>;

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product doesn't exist.
    fn delete_product(&self, product_id: &ProductId) -> Result<()>;

    /// List the products stocked on one rental.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_products_by_rental(&self, rental_id: RentalId) -> Result<Vec<Product>>;

    /// List all products (admin dashboard), newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_products(&self, limit: usize, offset: usize) -> Result<Vec<Product>>;

    // =========================================================================
    // Order Operations
    // =========================================================================

    /// Get an order by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Get the order created by a checkout session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_order_by_session(&self, session_id: &str) -> Result<Option<Order>>;

    /// List a buyer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_orders_by_buyer(&self, buyer_id: &UserId) -> Result<Vec<Order>>;

    /// Update an order's collection status, returning the updated order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the order doesn't exist.
    fn update_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order>;

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    /// Check whether a provider transaction was already processed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn ledger_contains(&self, transaction_id: &str) -> Result<bool>;

    /// Get a ledger entry by provider transaction id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_transaction(&self, transaction_id: &str) -> Result<Option<LedgerTransaction>>;

    /// List ledger entries (admin dashboard), newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions(&self, limit: usize, offset: usize) -> Result<Vec<LedgerTransaction>>;

    // =========================================================================
    // Webhook Event Log
    // =========================================================================

    /// Log an inbound webhook event.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateEvent` if the event id was seen
    /// before. Callers treat this as an audit signal, not a correctness
    /// guarantee: the ledger check still runs.
    fn record_event(&self, event: &WebhookEvent) -> Result<()>;

    /// Get a logged event by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_event(&self, event_id: &str) -> Result<Option<WebhookEvent>>;

    /// Update a logged event's application status.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the event was never logged.
    fn set_event_status(&self, event_id: &str, status: EventStatus) -> Result<()>;

    /// List logged events in a given status (reconciliation sweep input).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_events_with_status(
        &self,
        status: EventStatus,
        limit: usize,
    ) -> Result<Vec<WebhookEvent>>;

    // =========================================================================
    // Payout Operations
    // =========================================================================

    /// Get a payout by provider payout id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_payout(&self, payout_id: &str) -> Result<Option<Payout>>;

    /// Record a payout creation and its ledger entry atomically.
    ///
    /// If the payout already exists only its status is refreshed; the
    /// ledger entry is written once.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn record_payout(&self, payout: &Payout, transaction: &LedgerTransaction) -> Result<()>;

    /// Mark a payout failed, inserting `fallback` when the creation event
    /// was never observed. The matching ledger entry is updated alongside.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn mark_payout_failed(&self, payout_id: &str, fallback: &Payout) -> Result<Payout>;

    // =========================================================================
    // Compound Operations (webhook side effects)
    // =========================================================================

    /// Apply a confirmed rental payment: capacity check, surface move,
    /// rental insert and ledger entry in one atomic commit.
    ///
    /// Returns the created rental.
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicateTransaction` if the ledger already holds
    ///   this transaction (side effect applied before).
    /// - `StoreError::NotFound` if the space doesn't exist.
    /// - `StoreError::InsufficientCapacity` if the free surface is short.
    /// - `StoreError::AlreadyRented` if the renter already holds a live
    ///   rental on this space.
    fn apply_rental(
        &self,
        transaction: &LedgerTransaction,
        booking: &RentalBooking,
        today: NaiveDate,
    ) -> Result<Rental>;

    /// Apply a confirmed product purchase: stock check, stock decrement,
    /// order insert and ledger entry in one atomic commit. The stock check
    /// runs strictly before anything is written; a short-stock purchase
    /// persists nothing.
    ///
    /// Returns the created order.
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicateTransaction` if the ledger already holds
    ///   this transaction, or an order exists for the session.
    /// - `StoreError::NotFound` if the space or product doesn't exist.
    /// - `StoreError::InsufficientStock` if the stock is short.
    fn apply_order(
        &self,
        transaction: &LedgerTransaction,
        placement: &OrderPlacement,
    ) -> Result<Order>;
}
