//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but insufficient permissions.
    #[error("forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input or webhook signature failure.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - duplicate unique key or invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Not enough free surface on the storage space.
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

    /// Duplicate event or transaction (idempotency).
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::InsufficientCapacity {
                available,
                requested,
            } => (
                StatusCode::CONFLICT,
                "insufficient_capacity",
                self.to_string(),
                Some(serde_json::json!({
                    "available": available,
                    "requested": requested
                })),
            ),
            Self::InsufficientStock { stock, requested } => (
                StatusCode::CONFLICT,
                "insufficient_stock",
                self.to_string(),
                Some(serde_json::json!({
                    "stock": stock,
                    "requested": requested
                })),
            ),
            Self::Duplicate(id) => (
                StatusCode::CONFLICT,
                "duplicate",
                format!("{id} already processed"),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<stowage_store::StoreError> for ApiError {
    fn from(err: stowage_store::StoreError) -> Self {
        use stowage_store::StoreError;

        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity}: {id}")),
            StoreError::Conflict { entity, id } => {
                Self::Conflict(format!("{entity} already exists: {id}"))
            }
            StoreError::AlreadyRented { storage_id } => {
                Self::Conflict(format!("already renting space {storage_id}"))
            }
            StoreError::InsufficientCapacity {
                available,
                requested,
            } => Self::InsufficientCapacity {
                available,
                requested,
            },
            StoreError::InsufficientStock { stock, requested } => Self::InsufficientStock {
                stock,
                requested,
            },
            StoreError::DuplicateEvent { event_id } => Self::Duplicate(event_id),
            StoreError::DuplicateTransaction { transaction_id } => Self::Duplicate(transaction_id),
            StoreError::Invalid(msg) => Self::BadRequest(msg),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}
