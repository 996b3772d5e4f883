//! Error types for stowage storage.

use stowage_core::DomainError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// Unique constraint violated.
    #[error("{entity} already exists: {id}")]
    Conflict {
        /// Entity kind.
        entity: &'static str,
        /// The conflicting key.
        id: String,
    },

    /// Webhook event already logged (exact-duplicate delivery).
    #[error("duplicate event: {event_id}")]
    DuplicateEvent {
        /// The duplicated event id.
        event_id: String,
    },

    /// Ledger already holds this transaction; the side effect was applied
    /// before.
    #[error("transaction already processed: {transaction_id}")]
    DuplicateTransaction {
        /// The provider transaction id.
        transaction_id: String,
    },

    /// The renter already holds a live rental on this space.
    #[error("renter already holds a rental on space {storage_id}")]
    AlreadyRented {
        /// The space in question.
        storage_id: String,
    },

    /// Not enough free surface on the space.
    #[error("insufficient capacity: available={available}, requested={requested}")]
    InsufficientCapacity {
        /// Free surface on the space.
        available: i64,
        /// Surface requested.
        requested: i64,
    },

    /// Not enough product stock.
    #[error("insufficient stock: stock={stock}, requested={requested}")]
    InsufficientStock {
        /// Units in stock.
        stock: i64,
        /// Units requested.
        requested: i64,
    },

    /// Domain-level validation failed (bad period, non-positive amount, ...).
    #[error("invalid input: {0}")]
    Invalid(String),
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InsufficientCapacity {
                available,
                requested,
            } => Self::InsufficientCapacity {
                available,
                requested,
            },
            DomainError::InsufficientStock { stock, requested } => Self::InsufficientStock {
                stock,
                requested,
            },
            other => Self::Invalid(other.to_string()),
        }
    }
}
