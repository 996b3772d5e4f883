//! Webhook event log types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An inbound provider event, logged verbatim for audit and replay.
///
/// The log detects exact-duplicate deliveries by event id, but it is not
/// the idempotency barrier: retries may carry a fresh event id for the same
/// logical transaction, and a crash can land between logging and applying.
/// The ledger's unique transaction key is what actually guards side
/// effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// The provider's event id. Unique.
    pub event_id: String,

    /// The provider's event type string (e.g. `checkout.session.completed`).
    pub event_type: String,

    /// The full event payload, stored opaque.
    pub payload: serde_json::Value,

    /// When we received the event.
    pub received_at: DateTime<Utc>,

    /// Where the event sits in the application pipeline.
    pub status: EventStatus,
}

impl WebhookEvent {
    /// Log a freshly received event.
    #[must_use]
    pub fn received(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            payload,
            received_at: Utc::now(),
            status: EventStatus::Received,
        }
    }
}

/// Application status of a logged event.
///
/// `Received` and `Failed` events are picked up again by the
/// reconciliation sweep; `Applied` and `Ignored` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Logged, side effects not yet confirmed.
    Received,

    /// Side effects committed (or found already committed).
    Applied,

    /// Carried nothing for us; no side effects.
    Ignored,

    /// Side-effect application failed; the sweep will retry.
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn received_event_starts_unapplied() {
        let ev = WebhookEvent::received(
            "evt_1",
            "checkout.session.completed",
            serde_json::json!({"object": "event"}),
        );
        assert_eq!(ev.status, EventStatus::Received);
        assert_eq!(ev.event_type, "checkout.session.completed");
    }
}
