//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Marketplace profiles, keyed by `user_id`.
    pub const PROFILES: &str = "profiles";

    /// Index: profile by connected payout account, keyed by the account id.
    /// Value is the `user_id` bytes.
    pub const PROFILES_BY_ACCOUNT: &str = "profiles_by_account";

    /// Storage spaces, keyed by `space_id`.
    pub const SPACES: &str = "spaces";

    /// Index: space by unique name, keyed by the name bytes.
    /// Value is the `space_id` bytes.
    pub const SPACES_BY_NAME: &str = "spaces_by_name";

    /// Index: spaces by owner, keyed by `owner_id || space_id`.
    /// Value is empty (index only).
    pub const SPACES_BY_OWNER: &str = "spaces_by_owner";

    /// Rentals, keyed by `rental_id` (ULID).
    pub const RENTALS: &str = "rentals";

    /// Index: rentals by renter, keyed by `renter_id || rental_id`.
    /// Value is empty (index only).
    pub const RENTALS_BY_RENTER: &str = "rentals_by_renter";

    /// Products, keyed by `product_id`.
    pub const PRODUCTS: &str = "products";

    /// Index: product by unique name, keyed by the name bytes.
    /// Value is the `product_id` bytes.
    pub const PRODUCTS_BY_NAME: &str = "products_by_name";

    /// Index: products by rental, keyed by `rental_id || product_id`.
    /// Value is empty (index only).
    pub const PRODUCTS_BY_RENTAL: &str = "products_by_rental";

    /// Orders, keyed by `order_id` (ULID).
    pub const ORDERS: &str = "orders";

    /// Index: orders by buyer, keyed by `buyer_id || order_id`.
    /// Value is empty (index only).
    pub const ORDERS_BY_BUYER: &str = "orders_by_buyer";

    /// Index: order by checkout session, keyed by the session id.
    /// Value is the `order_id` bytes. Enforces one order per session.
    pub const ORDERS_BY_SESSION: &str = "orders_by_session";

    /// Ledger transactions, keyed by the provider transaction id.
    pub const TRANSACTIONS: &str = "transactions";

    /// Payouts, keyed by the provider payout id.
    pub const PAYOUTS: &str = "payouts";

    /// Webhook event log, keyed by the provider event id.
    pub const EVENTS: &str = "events";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::PROFILES,
        cf::PROFILES_BY_ACCOUNT,
        cf::SPACES,
        cf::SPACES_BY_NAME,
        cf::SPACES_BY_OWNER,
        cf::RENTALS,
        cf::RENTALS_BY_RENTER,
        cf::PRODUCTS,
        cf::PRODUCTS_BY_NAME,
        cf::PRODUCTS_BY_RENTAL,
        cf::ORDERS,
        cf::ORDERS_BY_BUYER,
        cf::ORDERS_BY_SESSION,
        cf::TRANSACTIONS,
        cf::PAYOUTS,
        cf::EVENTS,
    ]
}
