//! Checkout session handlers.
//!
//! Creating a session is the advisory half of a booking: availability is
//! checked here so the buyer isn't sent to pay for something that's gone,
//! but the authoritative check-and-commit happens in the webhook pipeline
//! when the payment is confirmed. The metadata attached here comes back
//! verbatim in `checkout.session.completed` and must round-trip exactly.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stowage_core::{Profile, UserId};
use stowage_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::stripe::{CheckoutSessionRequest, PurchaseMetadata, RentalMetadata, StripeClient};

/// Checkout session response.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// Session ID for tracking.
    pub session_id: String,
    /// Hosted payment page URL.
    pub checkout_url: String,
}

fn stripe_client(state: &AppState) -> Result<&Arc<StripeClient>, ApiError> {
    state
        .stripe
        .as_ref()
        .ok_or_else(|| ApiError::ExternalService("Stripe not configured".into()))
}

/// Load a seller profile and insist it can receive payments.
fn payable_profile(state: &AppState, user_id: &UserId) -> Result<Profile, ApiError> {
    let profile = state
        .store
        .get_profile(user_id)?
        .ok_or_else(|| ApiError::BadRequest("seller has no profile".into()))?;

    if !profile.can_receive_payments() {
        return Err(ApiError::BadRequest(
            "seller has not completed payout onboarding".into(),
        ));
    }
    Ok(profile)
}

fn platform_fee(state: &AppState, total_cents: i64) -> i64 {
    total_cents * i64::from(state.config.platform_fee_percent) / 100
}

// ============================================================================
// Storage rental checkout
// ============================================================================

/// Storage checkout request.
#[derive(Debug, Deserialize)]
pub struct StorageCheckoutRequest {
    /// The space to rent from.
    pub storage_id: String,
    /// Surface units to rent.
    pub space_to_rent: i64,
    /// Period start (`YYYY-MM-DD`).
    pub start_date: NaiveDate,
    /// Period end (`YYYY-MM-DD`).
    pub end_date: NaiveDate,
}

/// Create a checkout session for renting storage surface.
pub async fn create_storage_checkout(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<StorageCheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let stripe = stripe_client(&state)?;

    let storage_id = body
        .storage_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid space id: {}", body.storage_id)))?;

    if body.space_to_rent <= 0 {
        return Err(ApiError::BadRequest("space_to_rent must be positive".into()));
    }
    if body.end_date < body.start_date {
        return Err(ApiError::BadRequest("end_date before start_date".into()));
    }

    let space = state
        .store
        .get_space(&storage_id)?
        .ok_or_else(|| ApiError::NotFound(format!("storage space: {storage_id}")))?;

    // Advisory checks. The space can still fill up between here and the
    // payment confirmation; the webhook-side atomic check is the one that
    // counts, and a then-failed booking is rejected there.
    if !space.can_fit(body.space_to_rent) {
        return Err(ApiError::InsufficientCapacity {
            available: space.available_surface,
            requested: body.space_to_rent,
        });
    }
    let today = chrono::Utc::now().date_naive();
    if state
        .store
        .find_live_rental(&auth.user_id, &storage_id, today)?
        .is_some()
    {
        return Err(ApiError::Conflict("already renting this space".into()));
    }

    let lessor = payable_profile(&state, &space.owner_id)?;
    let total_cents = space.price_cents * body.space_to_rent;

    let metadata = RentalMetadata {
        storage_id: storage_id.to_string(),
        space_to_rent: body.space_to_rent.to_string(),
        start_date: body.start_date.to_string(),
        end_date: body.end_date.to_string(),
        renter_id: auth.user_id.to_string(),
        lessor_id: space.owner_id.to_string(),
        total_price_cents: total_cents.to_string(),
    };

    let request = CheckoutSessionRequest {
        client_reference_id: auth.user_id.to_string(),
        product_name: format!("Storage rental - {}", space.name),
        product_description: format!(
            "{} unit(s) from {} to {}",
            body.space_to_rent, body.start_date, body.end_date
        ),
        unit_amount_cents: total_cents,
        quantity: 1,
        currency: state.config.currency.clone(),
        success_url: format!(
            "{}/storage-payment-success?session_id={{CHECKOUT_SESSION_ID}}",
            state.config.frontend_url
        ),
        cancel_url: format!("{}/search", state.config.frontend_url),
        metadata: metadata.to_form_fields(),
        application_fee_cents: platform_fee(&state, total_cents),
        destination_account: lessor
            .payout_account_id
            .clone()
            .unwrap_or_default(),
    };

    let session = stripe.create_checkout_session(&request).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to create Stripe checkout session");
        ApiError::ExternalService(format!("Failed to create checkout session: {e}"))
    })?;

    let checkout_url = session
        .url
        .ok_or_else(|| ApiError::ExternalService("Stripe returned no checkout URL".into()))?;

    tracing::info!(
        renter_id = %auth.user_id,
        storage_id = %storage_id,
        session_id = %session.id,
        total_cents = %total_cents,
        "Storage checkout session created"
    );

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        checkout_url,
    }))
}

// ============================================================================
// Product purchase checkout
// ============================================================================

/// Product checkout request.
#[derive(Debug, Deserialize)]
pub struct ProductCheckoutRequest {
    /// The product to buy.
    pub product_id: String,
    /// Units to buy.
    pub quantity: i64,
}

/// Create a checkout session for buying a product.
pub async fn create_product_checkout(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<ProductCheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let stripe = stripe_client(&state)?;

    let product_id = body
        .product_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid product id: {}", body.product_id)))?;

    if body.quantity <= 0 {
        return Err(ApiError::BadRequest("quantity must be positive".into()));
    }

    let product = state
        .store
        .get_product(&product_id)?
        .ok_or_else(|| ApiError::NotFound(format!("product: {product_id}")))?;

    // Advisory stock check; the webhook-side atomic check is authoritative.
    if !product.has_stock(body.quantity) {
        return Err(ApiError::InsufficientStock {
            stock: product.stock_quantity,
            requested: body.quantity,
        });
    }

    // The seller is the supplier renting the surface the product sits on.
    let rental = state
        .store
        .get_rental(product.rental_id)?
        .ok_or_else(|| ApiError::Internal("product without a rental".into()))?;
    let seller = payable_profile(&state, &rental.renter_id)?;

    let total_cents = product.price_cents * body.quantity;

    let metadata = PurchaseMetadata {
        storage_id: rental.storage_id.to_string(),
        product_id: product_id.to_string(),
        quantity: body.quantity.to_string(),
        price_cents: product.price_cents.to_string(),
        buyer_id: auth.user_id.to_string(),
        seller_id: rental.renter_id.to_string(),
        total_price_cents: total_cents.to_string(),
    };

    let request = CheckoutSessionRequest {
        client_reference_id: auth.user_id.to_string(),
        product_name: product.name.clone(),
        product_description: product.description.clone(),
        unit_amount_cents: product.price_cents,
        quantity: body.quantity,
        currency: state.config.currency.clone(),
        success_url: format!(
            "{}/product-listing?session_id={{CHECKOUT_SESSION_ID}}",
            state.config.frontend_url
        ),
        cancel_url: format!("{}/product-listing", state.config.frontend_url),
        metadata: metadata.to_form_fields(),
        application_fee_cents: platform_fee(&state, total_cents),
        destination_account: seller
            .payout_account_id
            .clone()
            .unwrap_or_default(),
    };

    let session = stripe.create_checkout_session(&request).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to create Stripe checkout session");
        ApiError::ExternalService(format!("Failed to create checkout session: {e}"))
    })?;

    let checkout_url = session
        .url
        .ok_or_else(|| ApiError::ExternalService("Stripe returned no checkout URL".into()))?;

    tracing::info!(
        buyer_id = %auth.user_id,
        product_id = %product_id,
        session_id = %session.id,
        total_cents = %total_cents,
        "Product checkout session created"
    );

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        checkout_url,
    }))
}

// ============================================================================
// Payment success callback
// ============================================================================

/// Payment success query parameters.
#[derive(Debug, Deserialize)]
pub struct PaymentSuccessQuery {
    /// The checkout session to look up.
    pub session_id: String,
}

/// Payment success response.
#[derive(Debug, Serialize)]
pub struct PaymentSuccessResponse {
    /// Whether the session is paid.
    pub success: bool,
    /// Provider payment status.
    pub payment_status: Option<String>,
    /// The session's metadata, echoed for the frontend.
    pub metadata: serde_json::Value,
}

/// Confirm a payment for the frontend redirect.
///
/// Read-only: all side effects belong to the webhook pipeline, this only
/// echoes what the provider reports.
pub async fn payment_success(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaymentSuccessQuery>,
) -> Result<Json<PaymentSuccessResponse>, ApiError> {
    let stripe = stripe_client(&state)?;

    let session = stripe
        .get_checkout_session(&query.session_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, session_id = %query.session_id, "Failed to fetch session");
            ApiError::ExternalService(format!("Failed to fetch checkout session: {e}"))
        })?;

    let paid = session.payment_status.as_deref() == Some("paid");

    Ok(Json(PaymentSuccessResponse {
        success: paid,
        payment_status: session.payment_status,
        metadata: session.metadata,
    }))
}
