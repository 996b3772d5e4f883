//! Stripe webhook handler and event dispatch.
//!
//! The pipeline is: verify signature against the raw body, log the event,
//! then apply side effects keyed on the event type. Once the event is
//! logged the endpoint answers 200 no matter how application went - the
//! provider's retries cannot fix a domain failure, the reconciliation
//! sweep picks those up instead. The ledger's unique transaction key makes
//! every application idempotent, so redeliveries and the sweep can both
//! run the same code path safely.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use stowage_core::{
    EventStatus, LedgerTransaction, Payout, PayoutStatus, TransactionStatus, WebhookEvent,
};
use stowage_store::{OrderPlacement, RentalBooking, Store, StoreError};

use crate::error::ApiError;
use crate::state::AppState;
use crate::stripe::{PurchaseMetadata, RentalMetadata};

/// Stripe webhook envelope (the fields we dispatch on).
#[derive(Debug, Deserialize)]
pub struct StripeWebhook {
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event ID.
    pub id: String,
    /// Event data.
    pub data: StripeEventData,
}

/// Stripe event data container.
#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    /// Event object.
    pub object: serde_json::Value,
}

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was accepted.
    pub received: bool,
}

/// Handle Stripe webhooks.
///
/// Takes the body as a raw `String`: signature verification must see the
/// exact bytes Stripe signed, so JSON parsing happens only afterwards.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    if state.config.stripe_webhook_secret.is_some() {
        let signature = headers
            .get("stripe-signature")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest("Missing Stripe signature".into()))?;

        let stripe = state
            .stripe
            .as_ref()
            .ok_or_else(|| ApiError::ExternalService("Stripe not configured".into()))?;

        stripe.verify_webhook_signature(&body, signature).map_err(|e| {
            tracing::warn!(error = %e, "Invalid Stripe webhook signature");
            ApiError::BadRequest("Invalid webhook signature".into())
        })?;
    } else {
        // No webhook_secret configured - skip verification (development mode)
        tracing::warn!("Stripe webhook_secret not configured - skipping signature verification");
    }

    let webhook: StripeWebhook =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(
        event_type = %webhook.event_type,
        event_id = %webhook.id,
        "Received Stripe webhook"
    );

    // Log the event. A duplicate id is an audit signal, not a stop: the
    // previous delivery may have crashed between logging and applying, so
    // processing continues and the ledger decides.
    let payload = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
    let event = WebhookEvent::received(&webhook.id, &webhook.event_type, payload);
    match state.store.record_event(&event) {
        Ok(()) => {}
        Err(StoreError::DuplicateEvent { event_id }) => {
            tracing::warn!(event_id = %event_id, "Duplicate webhook delivery");
        }
        Err(e) => return Err(e.into()),
    }

    // Apply side effects. Failures are logged and swallowed: the provider
    // already got its 200 contract once the event is safely logged, and
    // the reconciliation sweep retries failed applications.
    let status = match apply_event(&state, &webhook.event_type, &webhook.data.object) {
        Ok(status) => status,
        Err(e) => {
            tracing::error!(
                event_id = %webhook.id,
                event_type = %webhook.event_type,
                error = %e,
                "Webhook side effect failed; leaving to reconciliation"
            );
            EventStatus::Failed
        }
    };

    if let Err(e) = state.store.set_event_status(&webhook.id, status) {
        tracing::error!(event_id = %webhook.id, error = %e, "Failed to update event status");
    }

    Ok(Json(WebhookResponse { received: true }))
}

/// Dispatch one event's side effects. Shared between the HTTP handler and
/// the reconciliation sweep; every branch is idempotent.
pub(crate) fn apply_event(
    state: &AppState,
    event_type: &str,
    object: &serde_json::Value,
) -> Result<EventStatus, ApiError> {
    match event_type {
        "checkout.session.completed" => handle_checkout_completed(state, object),
        "payout.created" => handle_payout_created(state, object),
        "payout.failed" => handle_payout_failed(state, object),
        "account.updated" => handle_account_updated(state, object),
        _ => {
            tracing::debug!(event_type = %event_type, "Unhandled Stripe event");
            Ok(EventStatus::Ignored)
        }
    }
}

// ============================================================================
// checkout.session.completed
// ============================================================================

fn handle_checkout_completed(
    state: &AppState,
    object: &serde_json::Value,
) -> Result<EventStatus, ApiError> {
    let session_id = object
        .get("id")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");

    let payment_status = object
        .get("payment_status")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");

    if payment_status != "paid" {
        tracing::info!(
            session_id = %session_id,
            payment_status = %payment_status,
            "Checkout session not paid yet, skipping"
        );
        return Ok(EventStatus::Ignored);
    }

    let metadata = object
        .get("metadata")
        .cloned()
        .unwrap_or(serde_json::Value::Null);

    if let Some(meta) = RentalMetadata::from_value(&metadata) {
        return handle_rental_confirmed(state, session_id, &meta);
    }

    if let Some(meta) = PurchaseMetadata::from_value(&metadata) {
        return handle_purchase_confirmed(state, session_id, &meta);
    }

    tracing::info!(
        session_id = %session_id,
        "Checkout session carries neither rental nor purchase metadata, ignoring"
    );
    Ok(EventStatus::Ignored)
}

fn handle_rental_confirmed(
    state: &AppState,
    session_id: &str,
    meta: &RentalMetadata,
) -> Result<EventStatus, ApiError> {
    let (booking, lessor_id, total_cents) = match parse_rental_metadata(meta) {
        Ok(parsed) => parsed,
        Err(reason) => {
            tracing::warn!(
                session_id = %session_id,
                reason = %reason,
                "Unparseable rental metadata, ignoring event"
            );
            return Ok(EventStatus::Ignored);
        }
    };

    let transaction = LedgerTransaction::rental(
        session_id,
        booking.renter_id,
        lessor_id,
        total_cents,
        state.config.currency.clone(),
    );

    match state
        .store
        .apply_rental(&transaction, &booking, Utc::now().date_naive())
    {
        Ok(rental) => {
            tracing::info!(
                session_id = %session_id,
                rental_id = %rental.id,
                storage_id = %booking.storage_id,
                renter_id = %booking.renter_id,
                space_amount = %booking.space_amount,
                active = %rental.active,
                "Payment confirmed, storage surface rented"
            );
            Ok(EventStatus::Applied)
        }
        Err(StoreError::DuplicateTransaction { transaction_id }) => {
            tracing::info!(
                transaction_id = %transaction_id,
                "Rental already applied for this session, skipping"
            );
            Ok(EventStatus::Applied)
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_rental_metadata(
    meta: &RentalMetadata,
) -> Result<(RentalBooking, stowage_core::UserId, i64), String> {
    let storage_id = meta
        .storage_id
        .parse()
        .map_err(|_| format!("bad storage_id: {}", meta.storage_id))?;
    let renter_id = meta
        .renter_id
        .parse()
        .map_err(|_| format!("bad renter_id: {}", meta.renter_id))?;
    let lessor_id = meta
        .lessor_id
        .parse()
        .map_err(|_| format!("bad lessor_id: {}", meta.lessor_id))?;
    let space_amount: i64 = meta
        .space_to_rent
        .parse()
        .map_err(|_| format!("bad space_to_rent: {}", meta.space_to_rent))?;
    let start_date = chrono::NaiveDate::parse_from_str(&meta.start_date, "%Y-%m-%d")
        .map_err(|_| format!("bad start_date: {}", meta.start_date))?;
    let end_date = chrono::NaiveDate::parse_from_str(&meta.end_date, "%Y-%m-%d")
        .map_err(|_| format!("bad end_date: {}", meta.end_date))?;
    let total_cents: i64 = meta
        .total_price_cents
        .parse()
        .map_err(|_| format!("bad total_price_cents: {}", meta.total_price_cents))?;

    Ok((
        RentalBooking {
            renter_id,
            storage_id,
            space_amount,
            start_date,
            end_date,
        },
        lessor_id,
        total_cents,
    ))
}

fn handle_purchase_confirmed(
    state: &AppState,
    session_id: &str,
    meta: &PurchaseMetadata,
) -> Result<EventStatus, ApiError> {
    let (placement, seller_id, total_cents) = match parse_purchase_metadata(meta, session_id) {
        Ok(parsed) => parsed,
        Err(reason) => {
            tracing::warn!(
                session_id = %session_id,
                reason = %reason,
                "Unparseable purchase metadata, ignoring event"
            );
            return Ok(EventStatus::Ignored);
        }
    };

    let transaction = LedgerTransaction::purchase(
        session_id,
        placement.buyer_id,
        seller_id,
        total_cents,
        state.config.currency.clone(),
    );

    match state.store.apply_order(&transaction, &placement) {
        Ok(order) => {
            tracing::info!(
                session_id = %session_id,
                order_id = %order.id,
                order_number = %order.order_number,
                product_id = %placement.product_id,
                buyer_id = %placement.buyer_id,
                quantity = %placement.quantity,
                "Payment confirmed, order created"
            );
            Ok(EventStatus::Applied)
        }
        Err(StoreError::DuplicateTransaction { transaction_id }) => {
            tracing::info!(
                transaction_id = %transaction_id,
                "Order already applied for this session, skipping"
            );
            Ok(EventStatus::Applied)
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_purchase_metadata(
    meta: &PurchaseMetadata,
    session_id: &str,
) -> Result<(OrderPlacement, stowage_core::UserId, i64), String> {
    let storage_id = meta
        .storage_id
        .parse()
        .map_err(|_| format!("bad storage_id: {}", meta.storage_id))?;
    let product_id = meta
        .product_id
        .parse()
        .map_err(|_| format!("bad product_id: {}", meta.product_id))?;
    let buyer_id = meta
        .buyer_id
        .parse()
        .map_err(|_| format!("bad buyer_id: {}", meta.buyer_id))?;
    let seller_id = meta
        .seller_id
        .parse()
        .map_err(|_| format!("bad seller_id: {}", meta.seller_id))?;
    let quantity: i64 = meta
        .quantity
        .parse()
        .map_err(|_| format!("bad quantity: {}", meta.quantity))?;
    let unit_price_cents: i64 = meta
        .price_cents
        .parse()
        .map_err(|_| format!("bad price_cents: {}", meta.price_cents))?;
    let total_cents: i64 = meta
        .total_price_cents
        .parse()
        .map_err(|_| format!("bad total_price_cents: {}", meta.total_price_cents))?;

    Ok((
        OrderPlacement {
            buyer_id,
            storage_id,
            product_id,
            quantity,
            unit_price_cents,
            session_id: session_id.to_string(),
        },
        seller_id,
        total_cents,
    ))
}

// ============================================================================
// payout.created / payout.failed
// ============================================================================

fn payout_from_object(object: &serde_json::Value) -> Option<Payout> {
    let payout_id = object.get("id")?.as_str()?.to_string();
    let destination = object
        .get("destination")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    let amount_cents = object
        .get("amount")
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(0);
    let currency = object
        .get("currency")
        .and_then(|v| v.as_str())
        .unwrap_or("eur")
        .to_string();
    let status = object
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or("pending");
    let created_at = object
        .get("created")
        .and_then(serde_json::Value::as_i64)
        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
        .unwrap_or_else(Utc::now);

    Some(Payout {
        payout_id,
        destination_account_id: destination,
        amount_cents,
        currency,
        status: PayoutStatus::from_provider(status),
        created_at,
    })
}

fn ledger_status(status: PayoutStatus) -> TransactionStatus {
    match status {
        PayoutStatus::Paid => TransactionStatus::Succeeded,
        PayoutStatus::Failed => TransactionStatus::Failed,
        PayoutStatus::Pending => TransactionStatus::Pending,
    }
}

fn handle_payout_created(
    state: &AppState,
    object: &serde_json::Value,
) -> Result<EventStatus, ApiError> {
    let Some(payout) = payout_from_object(object) else {
        tracing::warn!("Payout event without an id, ignoring");
        return Ok(EventStatus::Ignored);
    };

    let transaction = LedgerTransaction::payout(
        payout.payout_id.clone(),
        payout.destination_account_id.clone(),
        payout.amount_cents,
        payout.currency.clone(),
        ledger_status(payout.status),
    );

    state.store.record_payout(&payout, &transaction)?;

    tracing::info!(
        payout_id = %payout.payout_id,
        destination = %payout.destination_account_id,
        amount_cents = %payout.amount_cents,
        currency = %payout.currency,
        "Payout recorded"
    );

    Ok(EventStatus::Applied)
}

fn handle_payout_failed(
    state: &AppState,
    object: &serde_json::Value,
) -> Result<EventStatus, ApiError> {
    let Some(payout) = payout_from_object(object) else {
        tracing::warn!("Payout event without an id, ignoring");
        return Ok(EventStatus::Ignored);
    };

    // Upsert: the failure may be the first notification we see for this
    // payout id.
    let updated = state.store.mark_payout_failed(&payout.payout_id, &payout)?;

    tracing::warn!(
        payout_id = %updated.payout_id,
        destination = %updated.destination_account_id,
        amount_cents = %updated.amount_cents,
        "Payout failed"
    );

    Ok(EventStatus::Applied)
}

// ============================================================================
// account.updated (connected account onboarding)
// ============================================================================

fn handle_account_updated(
    state: &AppState,
    object: &serde_json::Value,
) -> Result<EventStatus, ApiError> {
    let account_id = object
        .get("id")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");

    let ready = ["details_submitted", "charges_enabled", "payouts_enabled"]
        .iter()
        .all(|field| {
            object
                .get(*field)
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false)
        });

    if !ready {
        tracing::info!(account_id = %account_id, "Connected account not fully enabled yet");
        return Ok(EventStatus::Ignored);
    }

    let Some(mut profile) = state.store.get_profile_by_account(account_id)? else {
        tracing::warn!(account_id = %account_id, "No profile matches connected account");
        return Ok(EventStatus::Ignored);
    };

    if !profile.onboarding_complete {
        profile.onboarding_complete = true;
        profile.updated_at = Utc::now();
        state.store.put_profile(&profile)?;

        tracing::info!(
            user_id = %profile.user_id,
            account_id = %account_id,
            "Connected account onboarding completed"
        );
    }

    Ok(EventStatus::Applied)
}
