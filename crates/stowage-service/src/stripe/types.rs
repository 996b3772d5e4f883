//! Stripe API types.
//!
//! Checkout-session metadata is the wire contract between session creation
//! and webhook reconciliation: whatever is attached at creation time comes
//! back verbatim in `checkout.session.completed`. Stripe stores metadata
//! values as strings, so the metadata structs here are all-string and the
//! webhook side parses them back into domain types.

use serde::{Deserialize, Serialize};

/// Stripe Checkout session object.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Session ID.
    pub id: String,
    /// Checkout URL to redirect the user to.
    #[serde(default)]
    pub url: Option<String>,
    /// Payment status (`paid`, `unpaid`, `no_payment_required`).
    #[serde(default)]
    pub payment_status: Option<String>,
    /// Total amount in cents.
    #[serde(default)]
    pub amount_total: Option<i64>,
    /// Client reference ID (our user id).
    #[serde(default)]
    pub client_reference_id: Option<String>,
    /// Session status.
    #[serde(default)]
    pub status: Option<String>,
    /// Metadata attached at session creation.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Metadata attached to a storage-rental checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalMetadata {
    /// The space being rented.
    pub storage_id: String,
    /// Surface units to rent.
    pub space_to_rent: String,
    /// Rental period start (`YYYY-MM-DD`).
    pub start_date: String,
    /// Rental period end (`YYYY-MM-DD`).
    pub end_date: String,
    /// The paying renter.
    pub renter_id: String,
    /// The lessor receiving the payment.
    pub lessor_id: String,
    /// Total charged, in cents.
    pub total_price_cents: String,
}

impl RentalMetadata {
    /// Decode rental metadata from a session's metadata object.
    ///
    /// Returns `None` when the required fields are absent - the session
    /// belongs to a different flow then.
    #[must_use]
    pub fn from_value(metadata: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(metadata.clone()).ok()
    }

    /// Flatten into `metadata[...]` form fields for session creation.
    #[must_use]
    pub fn to_form_fields(&self) -> Vec<(String, String)> {
        vec![
            ("storage_id".into(), self.storage_id.clone()),
            ("space_to_rent".into(), self.space_to_rent.clone()),
            ("start_date".into(), self.start_date.clone()),
            ("end_date".into(), self.end_date.clone()),
            ("renter_id".into(), self.renter_id.clone()),
            ("lessor_id".into(), self.lessor_id.clone()),
            ("total_price_cents".into(), self.total_price_cents.clone()),
        ]
    }
}

/// Metadata attached to a product-purchase checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseMetadata {
    /// The space the goods are collected from.
    pub storage_id: String,
    /// The purchased product.
    pub product_id: String,
    /// Units purchased.
    pub quantity: String,
    /// Unit price in cents.
    pub price_cents: String,
    /// The buyer.
    pub buyer_id: String,
    /// The supplier receiving the payment.
    pub seller_id: String,
    /// Total charged, in cents.
    pub total_price_cents: String,
}

impl PurchaseMetadata {
    /// Decode purchase metadata from a session's metadata object.
    #[must_use]
    pub fn from_value(metadata: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(metadata.clone()).ok()
    }

    /// Flatten into `metadata[...]` form fields for session creation.
    #[must_use]
    pub fn to_form_fields(&self) -> Vec<(String, String)> {
        vec![
            ("storage_id".into(), self.storage_id.clone()),
            ("product_id".into(), self.product_id.clone()),
            ("quantity".into(), self.quantity.clone()),
            ("price_cents".into(), self.price_cents.clone()),
            ("buyer_id".into(), self.buyer_id.clone()),
            ("seller_id".into(), self.seller_id.clone()),
            ("total_price_cents".into(), self.total_price_cents.clone()),
        ]
    }
}

/// Stripe API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorResponse {
    /// Error details.
    pub error: StripeErrorDetail,
}

/// Stripe error detail.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorDetail {
    /// Error type.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message.
    pub message: String,
    /// Error code.
    #[serde(default)]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rental_metadata_roundtrips_through_json() {
        let meta = RentalMetadata {
            storage_id: "3fa0c8c4-0000-0000-0000-000000000001".into(),
            space_to_rent: "12".into(),
            start_date: "2025-05-01".into(),
            end_date: "2025-08-01".into(),
            renter_id: "3fa0c8c4-0000-0000-0000-000000000002".into(),
            lessor_id: "3fa0c8c4-0000-0000-0000-000000000003".into(),
            total_price_cents: "60000".into(),
        };

        let value = serde_json::to_value(&meta).unwrap();
        let parsed = RentalMetadata::from_value(&value).unwrap();
        assert_eq!(parsed.space_to_rent, "12");
        assert_eq!(parsed.start_date, "2025-05-01");
    }

    #[test]
    fn rental_metadata_absent_fields_yield_none() {
        let value = serde_json::json!({ "product_id": "x" });
        assert!(RentalMetadata::from_value(&value).is_none());
    }

    #[test]
    fn purchase_metadata_detects_its_flow() {
        let value = serde_json::json!({
            "storage_id": "a",
            "product_id": "b",
            "quantity": "2",
            "price_cents": "2500",
            "buyer_id": "c",
            "seller_id": "d",
            "total_price_cents": "5000",
        });
        assert!(PurchaseMetadata::from_value(&value).is_some());
        assert!(RentalMetadata::from_value(&value).is_none());
    }
}
