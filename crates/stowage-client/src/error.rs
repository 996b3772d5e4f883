//! Client error types.

/// Errors that can occur when using the stowage client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// Not enough free surface on the requested space.
    #[error("insufficient capacity: available={available}, requested={requested}")]
    InsufficientCapacity {
        /// Free surface.
        available: i64,
        /// Requested surface.
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

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}
