//! Reconciliation sweep.
//!
//! The webhook endpoint answers 200 once an event is logged, even when its
//! side effects fail - the provider must not retry what it cannot fix.
//! This sweep is the other half of that contract: it periodically re-runs
//! events left in `received` or `failed` state through the same dispatch
//! code (idempotent via the ledger barrier), and flips reserved rentals
//! whose start date has arrived to active.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use stowage_core::EventStatus;
use stowage_store::Store;

use crate::handlers::webhooks::apply_event;
use crate::state::AppState;

/// How many backlogged events one sweep picks up per status.
const SWEEP_BATCH: usize = 100;

/// What one sweep accomplished.
#[derive(Debug, Default, Clone, Copy)]
pub struct SweepReport {
    /// Events whose side effects were applied (or found already applied).
    pub applied: usize,
    /// Events that turned out to carry nothing for us.
    pub ignored: usize,
    /// Events that failed again and stay in the backlog.
    pub still_failing: usize,
    /// Reserved rentals flipped to active.
    pub rentals_activated: usize,
}

/// Run the sweep forever at the configured interval.
///
/// Spawned from `main`; a zero interval disables the sweep.
pub async fn run(state: Arc<AppState>) {
    let interval_secs = state.config.reconcile_interval_seconds;
    if interval_secs == 0 {
        tracing::info!("Reconciliation sweep disabled");
        return;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        interval.tick().await;
        let report = sweep(&state);
        if report.applied + report.ignored + report.still_failing + report.rentals_activated > 0 {
            tracing::info!(
                applied = report.applied,
                ignored = report.ignored,
                still_failing = report.still_failing,
                rentals_activated = report.rentals_activated,
                "Reconciliation sweep finished"
            );
        }
    }
}

/// Run one sweep pass. Errors are contained per event so one poisoned
/// payload cannot stall the backlog.
pub fn sweep(state: &AppState) -> SweepReport {
    let mut report = SweepReport::default();

    for status in [EventStatus::Received, EventStatus::Failed] {
        let backlog = match state.store.list_events_with_status(status, SWEEP_BATCH) {
            Ok(events) => events,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list backlogged events");
                continue;
            }
        };

        for event in backlog {
            let object = event
                .payload
                .get("data")
                .and_then(|d| d.get("object"))
                .cloned()
                .unwrap_or(serde_json::Value::Null);

            let outcome = match apply_event(state, &event.event_type, &object) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(
                        event_id = %event.event_id,
                        event_type = %event.event_type,
                        error = %e,
                        "Reconciliation retry failed"
                    );
                    report.still_failing += 1;
                    EventStatus::Failed
                }
            };

            match outcome {
                EventStatus::Applied => report.applied += 1,
                EventStatus::Ignored => report.ignored += 1,
                EventStatus::Received | EventStatus::Failed => {}
            }

            if outcome != event.status {
                if let Err(e) = state.store.set_event_status(&event.event_id, outcome) {
                    tracing::error!(
                        event_id = %event.event_id,
                        error = %e,
                        "Failed to update event status"
                    );
                }
            }
        }
    }

    match state.store.activate_due_rentals(Utc::now().date_naive()) {
        Ok(count) => report.rentals_activated = count,
        Err(e) => tracing::error!(error = %e, "Failed to activate due rentals"),
    }

    report
}
