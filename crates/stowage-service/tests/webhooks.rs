//! Webhook reconciliation integration tests.
//!
//! These drive the full pipeline over HTTP: event logging, dispatch,
//! idempotent side-effect application and the reconciliation sweep. The
//! harness configures no webhook secret, so signature verification is
//! skipped (the signature scheme itself is covered by unit tests in the
//! Stripe client).

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

use stowage_core::{EventStatus, PayoutStatus, TransactionKind, UserId};
use stowage_service::reconcile;
use stowage_store::Store;

fn checkout_completed(event_id: &str, session_id: &str, metadata: serde_json::Value) -> String {
    json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "object": "checkout.session",
                "payment_status": "paid",
                "metadata": metadata,
            }
        }
    })
    .to_string()
}

fn rental_metadata(
    harness: &TestHarness,
    space: &stowage_core::StorageSpace,
    renter: UserId,
    amount: i64,
) -> serde_json::Value {
    let start = TestHarness::today();
    let end = start + chrono::Days::new(90);
    json!({
        "storage_id": space.id.to_string(),
        "space_to_rent": amount.to_string(),
        "start_date": start.to_string(),
        "end_date": end.to_string(),
        "renter_id": renter.to_string(),
        "lessor_id": space.owner_id.to_string(),
        "total_price_cents": (space.price_cents * amount).to_string(),
    })
}

async fn post_webhook(harness: &TestHarness, body: &str) {
    let response = harness
        .server
        .post("/api/webhook/stripe")
        .add_header("stripe-signature", "t=1700000000,v1=unverified")
        .text(body.to_string())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["received"], true);
}

fn event_status(harness: &TestHarness, event_id: &str) -> EventStatus {
    harness
        .store
        .get_event(event_id)
        .unwrap()
        .expect("event should be logged")
        .status
}

// ============================================================================
// Rental activation
// ============================================================================

#[tokio::test]
async fn rental_webhook_creates_rental_transaction_and_moves_surface() {
    let harness = TestHarness::new();
    let space = harness.seed_space(100, 500);
    let renter = UserId::generate();

    let body = checkout_completed(
        "evt_rental_1",
        "cs_rental_1",
        rental_metadata(&harness, &space, renter, 40),
    );
    post_webhook(&harness, &body).await;

    // Exactly one rental, active from today.
    let rentals = harness.store.list_rentals_by_renter(&renter).unwrap();
    assert_eq!(rentals.len(), 1);
    assert!(rentals[0].active);
    assert!(!rentals[0].reserved);
    assert_eq!(rentals[0].space_amount, 40);

    // Surface moved by exactly the rented amount.
    let updated = harness.store.get_space(&space.id).unwrap().unwrap();
    assert_eq!(updated.available_surface, 60);
    assert_eq!(updated.rented_surface, 40);

    // Exactly one ledger entry, kind rental.
    let tx = harness.store.get_transaction("cs_rental_1").unwrap().unwrap();
    assert_eq!(tx.kind, TransactionKind::Rental);
    assert_eq!(tx.amount_cents, 500 * 40);
    assert_eq!(tx.buyer_id, Some(renter));

    assert_eq!(event_status(&harness, "evt_rental_1"), EventStatus::Applied);
}

#[tokio::test]
async fn replayed_rental_webhook_changes_nothing() {
    let harness = TestHarness::new();
    let space = harness.seed_space(100, 500);
    let renter = UserId::generate();

    let body = checkout_completed(
        "evt_rental_replay",
        "cs_rental_replay",
        rental_metadata(&harness, &space, renter, 40),
    );

    for _ in 0..4 {
        post_webhook(&harness, &body).await;
    }

    assert_eq!(harness.store.list_rentals_by_renter(&renter).unwrap().len(), 1);
    let updated = harness.store.get_space(&space.id).unwrap().unwrap();
    assert_eq!(updated.available_surface, 60);
    assert_eq!(updated.rented_surface, 40);
    assert_eq!(
        event_status(&harness, "evt_rental_replay"),
        EventStatus::Applied
    );
}

#[tokio::test]
async fn retry_with_fresh_event_id_but_same_session_is_still_idempotent() {
    let harness = TestHarness::new();
    let space = harness.seed_space(100, 500);
    let renter = UserId::generate();
    let metadata = rental_metadata(&harness, &space, renter, 40);

    // Provider retries sometimes mint a new event id for the same logical
    // transaction; the ledger key is what stops the replay.
    post_webhook(
        &harness,
        &checkout_completed("evt_retry_a", "cs_same_session", metadata.clone()),
    )
    .await;
    post_webhook(
        &harness,
        &checkout_completed("evt_retry_b", "cs_same_session", metadata),
    )
    .await;

    assert_eq!(harness.store.list_rentals_by_renter(&renter).unwrap().len(), 1);
    let updated = harness.store.get_space(&space.id).unwrap().unwrap();
    assert_eq!(updated.available_surface, 60);
    // The second delivery found the work done and counts as applied.
    assert_eq!(event_status(&harness, "evt_retry_b"), EventStatus::Applied);
}

#[tokio::test]
async fn duplicate_event_id_with_fresh_session_still_applies() {
    let harness = TestHarness::new();
    let space = harness.seed_space(100, 500);

    // Same event id twice, but the second carries a different session:
    // the event log is an audit aid, not the idempotency barrier.
    let first = UserId::generate();
    post_webhook(
        &harness,
        &checkout_completed(
            "evt_shared",
            "cs_first",
            rental_metadata(&harness, &space, first, 10),
        ),
    )
    .await;

    let second = UserId::generate();
    post_webhook(
        &harness,
        &checkout_completed(
            "evt_shared",
            "cs_second",
            rental_metadata(&harness, &space, second, 10),
        ),
    )
    .await;

    assert!(harness.store.ledger_contains("cs_first").unwrap());
    assert!(harness.store.ledger_contains("cs_second").unwrap());
    assert_eq!(harness.store.list_rentals_by_renter(&second).unwrap().len(), 1);
}

#[tokio::test]
async fn rental_exceeding_capacity_is_rejected_without_mutation() {
    let harness = TestHarness::new();
    let space = harness.seed_space(100, 500);

    let first = UserId::generate();
    post_webhook(
        &harness,
        &checkout_completed(
            "evt_cap_a",
            "cs_cap_a",
            rental_metadata(&harness, &space, first, 40),
        ),
    )
    .await;

    let second = UserId::generate();
    post_webhook(
        &harness,
        &checkout_completed(
            "evt_cap_b",
            "cs_cap_b",
            rental_metadata(&harness, &space, second, 70),
        ),
    )
    .await;

    // First rental landed, second was rejected wholesale.
    let updated = harness.store.get_space(&space.id).unwrap().unwrap();
    assert_eq!(updated.available_surface, 60);
    assert_eq!(updated.rented_surface, 40);
    assert!(harness.store.list_rentals_by_renter(&second).unwrap().is_empty());
    assert!(!harness.store.ledger_contains("cs_cap_b").unwrap());
    assert_eq!(event_status(&harness, "evt_cap_b"), EventStatus::Failed);
}

#[tokio::test]
async fn future_start_date_books_a_reservation() {
    let harness = TestHarness::new();
    let space = harness.seed_space(100, 500);
    let renter = UserId::generate();

    let start = TestHarness::today() + chrono::Days::new(14);
    let metadata = json!({
        "storage_id": space.id.to_string(),
        "space_to_rent": "10",
        "start_date": start.to_string(),
        "end_date": (start + chrono::Days::new(30)).to_string(),
        "renter_id": renter.to_string(),
        "lessor_id": space.owner_id.to_string(),
        "total_price_cents": "5000",
    });
    post_webhook(
        &harness,
        &checkout_completed("evt_future", "cs_future", metadata),
    )
    .await;

    let rentals = harness.store.list_rentals_by_renter(&renter).unwrap();
    assert_eq!(rentals.len(), 1);
    assert!(rentals[0].reserved);
    assert!(!rentals[0].active);
    // Surface is committed at confirmation time, not at start date.
    let updated = harness.store.get_space(&space.id).unwrap().unwrap();
    assert_eq!(updated.available_surface, 90);
}

// ============================================================================
// Order fulfillment
// ============================================================================

#[tokio::test]
async fn purchase_webhook_creates_order_and_decrements_stock() {
    let harness = TestHarness::new();
    let space = harness.seed_space(100, 500);
    let product = harness.seed_product(&space, 10, 2500);
    let buyer = UserId::generate();
    let supplier_rental = harness.store.get_rental(product.rental_id).unwrap().unwrap();

    let metadata = json!({
        "storage_id": space.id.to_string(),
        "product_id": product.id.to_string(),
        "quantity": "3",
        "price_cents": "2500",
        "buyer_id": buyer.to_string(),
        "seller_id": supplier_rental.renter_id.to_string(),
        "total_price_cents": "7500",
    });
    post_webhook(
        &harness,
        &checkout_completed("evt_order_1", "cs_order_1", metadata),
    )
    .await;

    let orders = harness.store.list_orders_by_buyer(&buyer).unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].quantity, 3);
    assert_eq!(orders[0].total_price_cents, 7500);
    assert!(orders[0].order_number.to_string().starts_with("ORD-"));

    let updated = harness.store.get_product(&product.id).unwrap().unwrap();
    assert_eq!(updated.stock_quantity, 7);

    let tx = harness.store.get_transaction("cs_order_1").unwrap().unwrap();
    assert_eq!(tx.kind, TransactionKind::Purchase);
    assert_eq!(event_status(&harness, "evt_order_1"), EventStatus::Applied);
}

#[tokio::test]
async fn purchase_exceeding_stock_persists_nothing() {
    let harness = TestHarness::new();
    let space = harness.seed_space(100, 500);
    let product = harness.seed_product(&space, 2, 2500);
    let buyer = UserId::generate();
    let supplier_rental = harness.store.get_rental(product.rental_id).unwrap().unwrap();

    let metadata = json!({
        "storage_id": space.id.to_string(),
        "product_id": product.id.to_string(),
        "quantity": "3",
        "price_cents": "2500",
        "buyer_id": buyer.to_string(),
        "seller_id": supplier_rental.renter_id.to_string(),
        "total_price_cents": "7500",
    });
    post_webhook(
        &harness,
        &checkout_completed("evt_short", "cs_short", metadata),
    )
    .await;

    // No order, no ledger entry, stock untouched.
    assert!(harness.store.list_orders_by_buyer(&buyer).unwrap().is_empty());
    assert!(harness.store.get_order_by_session("cs_short").unwrap().is_none());
    assert!(!harness.store.ledger_contains("cs_short").unwrap());
    assert_eq!(
        harness.store.get_product(&product.id).unwrap().unwrap().stock_quantity,
        2
    );
    assert_eq!(event_status(&harness, "evt_short"), EventStatus::Failed);
}

// ============================================================================
// Payouts
// ============================================================================

fn payout_event(event_id: &str, event_type: &str, payout_id: &str, status: &str) -> String {
    json!({
        "id": event_id,
        "type": event_type,
        "data": {
            "object": {
                "id": payout_id,
                "object": "payout",
                "destination": "acct_test_77",
                "amount": 12_000,
                "currency": "eur",
                "status": status,
                "created": 1_700_000_000,
            }
        }
    })
    .to_string()
}

#[tokio::test]
async fn payout_created_is_recorded_with_ledger_entry() {
    let harness = TestHarness::new();

    post_webhook(
        &harness,
        &payout_event("evt_po_1", "payout.created", "po_1", "pending"),
    )
    .await;

    let payout = harness.store.get_payout("po_1").unwrap().unwrap();
    assert_eq!(payout.status, PayoutStatus::Pending);
    assert_eq!(payout.amount_cents, 12_000);
    assert_eq!(payout.destination_account_id, "acct_test_77");

    let tx = harness.store.get_transaction("po_1").unwrap().unwrap();
    assert_eq!(tx.kind, TransactionKind::Payout);
    assert!(tx.buyer_id.is_none());
}

#[tokio::test]
async fn payout_failed_after_created_updates_status() {
    let harness = TestHarness::new();

    post_webhook(
        &harness,
        &payout_event("evt_po_a", "payout.created", "po_2", "pending"),
    )
    .await;
    post_webhook(
        &harness,
        &payout_event("evt_po_b", "payout.failed", "po_2", "failed"),
    )
    .await;

    let payout = harness.store.get_payout("po_2").unwrap().unwrap();
    assert_eq!(payout.status, PayoutStatus::Failed);
}

#[tokio::test]
async fn payout_failed_without_prior_creation_still_upserts() {
    let harness = TestHarness::new();

    post_webhook(
        &harness,
        &payout_event("evt_po_ghost", "payout.failed", "po_ghost", "failed"),
    )
    .await;

    let payout = harness.store.get_payout("po_ghost").unwrap().unwrap();
    assert_eq!(payout.status, PayoutStatus::Failed);
    assert_eq!(event_status(&harness, "evt_po_ghost"), EventStatus::Applied);
}

// ============================================================================
// Edge cases and dispatch
// ============================================================================

#[tokio::test]
async fn unknown_metadata_is_logged_and_ignored() {
    let harness = TestHarness::new();

    let body = checkout_completed(
        "evt_opaque",
        "cs_opaque",
        json!({ "campaign": "spring-sale" }),
    );
    post_webhook(&harness, &body).await;

    assert_eq!(event_status(&harness, "evt_opaque"), EventStatus::Ignored);
    assert!(!harness.store.ledger_contains("cs_opaque").unwrap());
    assert!(harness.store.list_transactions(10, 0).unwrap().is_empty());
}

#[tokio::test]
async fn unpaid_session_is_ignored() {
    let harness = TestHarness::new();
    let space = harness.seed_space(100, 500);
    let renter = UserId::generate();

    let body = json!({
        "id": "evt_unpaid",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_unpaid",
                "payment_status": "unpaid",
                "metadata": rental_metadata(&harness, &space, renter, 10),
            }
        }
    })
    .to_string();
    post_webhook(&harness, &body).await;

    assert_eq!(event_status(&harness, "evt_unpaid"), EventStatus::Ignored);
    assert!(harness.store.list_rentals_by_renter(&renter).unwrap().is_empty());
}

#[tokio::test]
async fn unhandled_event_types_are_ignored() {
    let harness = TestHarness::new();

    let body = json!({
        "id": "evt_misc",
        "type": "customer.created",
        "data": { "object": { "id": "cus_1" } }
    })
    .to_string();
    post_webhook(&harness, &body).await;

    assert_eq!(event_status(&harness, "evt_misc"), EventStatus::Ignored);
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/api/webhook/stripe")
        .text("not json at all")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn account_updated_completes_onboarding() {
    let harness = TestHarness::new();

    let mut profile = stowage_core::Profile::new(
        UserId::generate(),
        "Atelier Nord",
        stowage_core::Role::Supplier,
    );
    profile.payout_account_id = Some("acct_onboard".into());
    harness.store.put_profile(&profile).unwrap();
    assert!(!profile.onboarding_complete);

    let body = json!({
        "id": "evt_acct",
        "type": "account.updated",
        "data": {
            "object": {
                "id": "acct_onboard",
                "details_submitted": true,
                "charges_enabled": true,
                "payouts_enabled": true,
            }
        }
    })
    .to_string();
    post_webhook(&harness, &body).await;

    let updated = harness.store.get_profile(&profile.user_id).unwrap().unwrap();
    assert!(updated.onboarding_complete);
    assert_eq!(event_status(&harness, "evt_acct"), EventStatus::Applied);
}

// ============================================================================
// Reconciliation sweep
// ============================================================================

#[tokio::test]
async fn sweep_reapplies_a_failed_event_after_restock() {
    let harness = TestHarness::new();
    let space = harness.seed_space(100, 500);
    let product = harness.seed_product(&space, 0, 2500);
    let buyer = UserId::generate();
    let supplier_rental = harness.store.get_rental(product.rental_id).unwrap().unwrap();

    let metadata = json!({
        "storage_id": space.id.to_string(),
        "product_id": product.id.to_string(),
        "quantity": "2",
        "price_cents": "2500",
        "buyer_id": buyer.to_string(),
        "seller_id": supplier_rental.renter_id.to_string(),
        "total_price_cents": "5000",
    });
    post_webhook(
        &harness,
        &checkout_completed("evt_sweep", "cs_sweep", metadata),
    )
    .await;
    assert_eq!(event_status(&harness, "evt_sweep"), EventStatus::Failed);

    // Supplier restocks; the sweep finishes the job.
    let mut restocked = harness.store.get_product(&product.id).unwrap().unwrap();
    restocked.stock_quantity = 5;
    harness.store.update_product(&restocked).unwrap();

    let report = reconcile::sweep(&harness.state);
    assert_eq!(report.applied, 1);

    assert_eq!(event_status(&harness, "evt_sweep"), EventStatus::Applied);
    let orders = harness.store.list_orders_by_buyer(&buyer).unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(
        harness.store.get_product(&product.id).unwrap().unwrap().stock_quantity,
        3
    );

    // A second sweep finds nothing to do.
    let report = reconcile::sweep(&harness.state);
    assert_eq!(report.applied, 0);
    assert_eq!(report.still_failing, 0);
}
