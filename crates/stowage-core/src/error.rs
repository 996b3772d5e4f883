//! Error types for core domain operations.

use crate::ids::IdError;

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

/// Errors produced by domain-level validation.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// A storage space does not have enough free surface.
    #[error("insufficient capacity: available={available}, requested={requested}")]
    InsufficientCapacity {
        /// Free surface on the space.
        available: i64,
        /// Surface the rental asked for.
        requested: i64,
    },

    /// A product does not have enough stock.
    #[error("insufficient stock: stock={stock}, requested={requested}")]
    InsufficientStock {
        /// Units currently in stock.
        stock: i64,
        /// Units the order asked for.
        requested: i64,
    },

    /// A rental period is empty or inverted.
    #[error("invalid rental period: start={start}, end={end}")]
    InvalidPeriod {
        /// Requested start date.
        start: chrono::NaiveDate,
        /// Requested end date.
        end: chrono::NaiveDate,
    },

    /// A quantity or amount was zero or negative.
    #[error("amount must be positive: {0}")]
    NonPositiveAmount(i64),

    /// An identifier failed to parse.
    #[error(transparent)]
    Id(#[from] IdError),
}
