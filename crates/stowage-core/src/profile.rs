//! Marketplace profile types.
//!
//! Authentication itself lives with the external identity provider; a
//! profile only carries the marketplace-facing attributes of a user (role,
//! payout account, onboarding state).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// A marketplace participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// User id from the identity provider.
    pub user_id: UserId,

    /// Display name.
    pub display_name: String,

    /// Contact email, if shared.
    pub email: Option<String>,

    /// What the user does on the marketplace.
    pub role: Role,

    /// Connected payment-provider account receiving payouts
    /// (lessors and suppliers).
    pub payout_account_id: Option<String>,

    /// Whether the provider confirmed the connected account can receive
    /// charges and payouts.
    pub onboarding_complete: bool,

    /// When the profile was created.
    pub created_at: DateTime<Utc>,

    /// When the profile was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Create a new profile.
    #[must_use]
    pub fn new(user_id: UserId, display_name: impl Into<String>, role: Role) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            display_name: display_name.into(),
            email: None,
            role,
            payout_account_id: None,
            onboarding_complete: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this profile can receive payments for sales or rentals.
    #[must_use]
    pub fn can_receive_payments(&self) -> bool {
        self.payout_account_id.is_some() && self.onboarding_complete
    }
}

/// Marketplace role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Owns storage spaces and rents surface out.
    Lessor,

    /// Rents surface and sells products out of it.
    Supplier,

    /// Buys products.
    Consumer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_profile_cannot_receive_payments() {
        let p = Profile::new(UserId::generate(), "Atelier Dupont", Role::Supplier);
        assert!(!p.can_receive_payments());
    }

    #[test]
    fn onboarded_profile_receives_payments() {
        let mut p = Profile::new(UserId::generate(), "Atelier Dupont", Role::Supplier);
        p.payout_account_id = Some("acct_123".into());
        p.onboarding_complete = true;
        assert!(p.can_receive_payments());
    }

    #[test]
    fn role_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Lessor).unwrap(), "\"lessor\"");
    }
}
