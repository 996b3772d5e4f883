//! Request and response types for the stowage client.

use serde::{Deserialize, Serialize};

/// Marketplace profile.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResponse {
    /// User ID.
    pub user_id: String,
    /// Display name.
    pub display_name: String,
    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,
    /// Marketplace role (`lessor`, `supplier`, `consumer`).
    pub role: String,
    /// Connected payout account, if linked.
    #[serde(default)]
    pub payout_account_id: Option<String>,
    /// Whether payout onboarding finished.
    pub onboarding_complete: bool,
    /// Created timestamp.
    pub created_at: String,
}

/// Create profile request.
#[derive(Debug, Clone, Serialize)]
pub struct CreateProfileRequest {
    /// Display name.
    pub display_name: String,
    /// Optional contact email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Marketplace role (`lessor`, `supplier`, `consumer`).
    pub role: String,
}

/// Storage space listing.
#[derive(Debug, Clone, Deserialize)]
pub struct SpaceResponse {
    /// Space ID.
    pub id: String,
    /// Owner user ID.
    pub owner_id: String,
    /// Display name.
    pub name: String,
    /// Physical address.
    pub address: String,
    /// Total surface in units.
    pub total_surface: i64,
    /// Surface still free.
    pub available_surface: i64,
    /// Surface rented out.
    pub rented_surface: i64,
    /// Price per surface unit, in cents.
    pub price_cents: i64,
    /// Created timestamp.
    pub created_at: String,
}

/// Rental listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RentalResponse {
    /// Rental ID.
    pub id: String,
    /// The rented space.
    pub storage_id: String,
    /// Space display name.
    #[serde(default)]
    pub storage_name: Option<String>,
    /// Space address.
    #[serde(default)]
    pub storage_address: Option<String>,
    /// Rented surface in units.
    pub space_amount: i64,
    /// Period start (`YYYY-MM-DD`).
    pub start_date: String,
    /// Period end (`YYYY-MM-DD`).
    pub end_date: String,
    /// Whether the rental is running.
    pub active: bool,
    /// Whether the rental is booked for a future start.
    pub reserved: bool,
}

/// Order listing.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    /// Order ID.
    pub id: String,
    /// Human-readable reference.
    pub order_number: String,
    /// The space the goods are collected from.
    pub storage_id: String,
    /// The purchased product.
    pub product_id: String,
    /// Units purchased.
    pub quantity: i64,
    /// Total paid, in cents.
    pub total_price_cents: i64,
    /// Collection status (`to_collect`, `collected`).
    pub status: String,
    /// Created timestamp.
    pub created_at: String,
}

/// Storage checkout request.
#[derive(Debug, Clone, Serialize)]
pub struct StorageCheckoutRequest {
    /// The space to rent from.
    pub storage_id: String,
    /// Surface units to rent.
    pub space_to_rent: i64,
    /// Period start (`YYYY-MM-DD`).
    pub start_date: String,
    /// Period end (`YYYY-MM-DD`).
    pub end_date: String,
}

/// Product checkout request.
#[derive(Debug, Clone, Serialize)]
pub struct ProductCheckoutRequest {
    /// The product to buy.
    pub product_id: String,
    /// Units to buy.
    pub quantity: i64,
}

/// Checkout session response.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutResponse {
    /// Session ID for tracking.
    pub session_id: String,
    /// Hosted payment page URL.
    pub checkout_url: String,
}

/// API error response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// API error detail.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Structured details (capacity/stock numbers).
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}
