//! Payout tracking types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A provider payout to a connected account.
///
/// Payout records are upserted by payout id: a failure notification may be
/// the first thing we ever hear about a payout, so absence of a prior
/// creation record is never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payout {
    /// The provider's payout id. Unique.
    pub payout_id: String,

    /// The connected account the money goes to.
    pub destination_account_id: String,

    /// Amount in cents.
    pub amount_cents: i64,

    /// Lowercase ISO currency code.
    pub currency: String,

    /// Lifecycle status.
    pub status: PayoutStatus,

    /// When the payout was created at the provider.
    pub created_at: DateTime<Utc>,
}

impl Payout {
    /// Mark the payout failed.
    pub fn mark_failed(&mut self) {
        self.status = PayoutStatus::Failed;
    }
}

/// Lifecycle status of a payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    /// Created, not yet settled.
    Pending,

    /// Funds arrived at the destination.
    Paid,

    /// The payout failed.
    Failed,
}

impl PayoutStatus {
    /// Map the provider's status string onto our lifecycle.
    ///
    /// The provider reports more granular states (`in_transit`,
    /// `canceled`, ...); everything that is neither settled nor failed is
    /// pending.
    #[must_use]
    pub fn from_provider(status: &str) -> Self {
        match status {
            "paid" => Self::Paid,
            "failed" | "canceled" => Self::Failed,
            _ => Self::Pending,
        }
    }
}
