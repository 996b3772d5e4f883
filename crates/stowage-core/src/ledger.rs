//! Ledger transaction types.
//!
//! Every financial movement confirmed by the payment provider lands in the
//! ledger, keyed by the provider's own identifier (checkout session id or
//! payout id). The unique key doubles as the idempotency barrier: a side
//! effect runs at most once per `transaction_id`, no matter how many times
//! the provider redelivers the event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// An append-only ledger entry for a confirmed payment or payout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// The provider's session or payout id. Unique.
    pub transaction_id: String,

    /// The paying party, when one exists (payouts have none).
    pub buyer_id: Option<UserId>,

    /// The receiving party: a user id for purchases and rentals, the
    /// destination connected-account id for payouts that arrive before the
    /// owner's profile is known.
    pub seller_id: String,

    /// Amount in cents.
    pub amount_cents: i64,

    /// Lowercase ISO currency code.
    pub currency: String,

    /// Settlement status.
    pub status: TransactionStatus,

    /// What the money moved for.
    pub kind: TransactionKind,

    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    /// Ledger entry for a confirmed product purchase.
    #[must_use]
    pub fn purchase(
        session_id: impl Into<String>,
        buyer_id: UserId,
        seller_id: UserId,
        amount_cents: i64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            transaction_id: session_id.into(),
            buyer_id: Some(buyer_id),
            seller_id: seller_id.to_string(),
            amount_cents,
            currency: currency.into(),
            status: TransactionStatus::Succeeded,
            kind: TransactionKind::Purchase,
            created_at: Utc::now(),
        }
    }

    /// Ledger entry for a confirmed storage rental.
    #[must_use]
    pub fn rental(
        session_id: impl Into<String>,
        renter_id: UserId,
        lessor_id: UserId,
        amount_cents: i64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            transaction_id: session_id.into(),
            buyer_id: Some(renter_id),
            seller_id: lessor_id.to_string(),
            amount_cents,
            currency: currency.into(),
            status: TransactionStatus::Succeeded,
            kind: TransactionKind::Rental,
            created_at: Utc::now(),
        }
    }

    /// Ledger entry for a provider payout to a connected account.
    #[must_use]
    pub fn payout(
        payout_id: impl Into<String>,
        destination: impl Into<String>,
        amount_cents: i64,
        currency: impl Into<String>,
        status: TransactionStatus,
    ) -> Self {
        Self {
            transaction_id: payout_id.into(),
            buyer_id: None,
            seller_id: destination.into(),
            amount_cents,
            currency: currency.into(),
            status,
            kind: TransactionKind::Payout,
            created_at: Utc::now(),
        }
    }
}

/// Settlement status of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Payment confirmed by the provider.
    Succeeded,

    /// Payment or payout failed.
    Failed,

    /// Awaiting settlement.
    Pending,
}

/// What a ledger entry paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// A product purchase by a buyer.
    Purchase,

    /// A storage surface rental.
    Rental,

    /// A provider payout to a lessor or supplier.
    Payout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_entry() {
        let buyer = UserId::generate();
        let seller = UserId::generate();
        let tx = LedgerTransaction::purchase("cs_test_1", buyer, seller, 10_000, "eur");

        assert_eq!(tx.transaction_id, "cs_test_1");
        assert_eq!(tx.buyer_id, Some(buyer));
        assert_eq!(tx.seller_id, seller.to_string());
        assert_eq!(tx.kind, TransactionKind::Purchase);
        assert_eq!(tx.status, TransactionStatus::Succeeded);
    }

    #[test]
    fn payout_entry_has_no_buyer() {
        let tx =
            LedgerTransaction::payout("po_1", "acct_123", 5_000, "eur", TransactionStatus::Pending);
        assert!(tx.buyer_id.is_none());
        assert_eq!(tx.seller_id, "acct_123");
        assert_eq!(tx.kind, TransactionKind::Payout);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&TransactionKind::Rental).unwrap();
        assert_eq!(json, "\"rental\"");
    }
}
