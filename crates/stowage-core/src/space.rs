//! Storage space types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::{SpaceId, UserId};

/// A storage space offered for rent by a lessor.
///
/// Surfaces are tracked in whole units (pallet slots). The invariant
/// `available_surface + rented_surface == total_surface` holds at all
/// times; every mutation goes through [`StorageSpace::commit_rental`],
/// which refuses to let `available_surface` go negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSpace {
    /// Unique space id.
    pub id: SpaceId,

    /// The lessor who owns this space.
    pub owner_id: UserId,

    /// Display name, unique across all spaces.
    pub name: String,

    /// Physical address.
    pub address: String,

    /// Total surface in units.
    pub total_surface: i64,

    /// Surface still free for rental.
    pub available_surface: i64,

    /// Surface currently rented out.
    pub rented_surface: i64,

    /// Price per surface unit for the booked period, in cents.
    pub price_cents: i64,

    /// When the space was created.
    pub created_at: DateTime<Utc>,

    /// When the space was last updated.
    pub updated_at: DateTime<Utc>,
}

impl StorageSpace {
    /// Create a new space with all surface available.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface or price is not positive.
    pub fn new(
        owner_id: UserId,
        name: impl Into<String>,
        address: impl Into<String>,
        total_surface: i64,
        price_cents: i64,
    ) -> Result<Self> {
        if total_surface <= 0 {
            return Err(DomainError::NonPositiveAmount(total_surface));
        }
        if price_cents <= 0 {
            return Err(DomainError::NonPositiveAmount(price_cents));
        }

        let now = Utc::now();
        Ok(Self {
            id: SpaceId::generate(),
            owner_id,
            name: name.into(),
            address: address.into(),
            total_surface,
            available_surface: total_surface,
            rented_surface: 0,
            price_cents,
            created_at: now,
            updated_at: now,
        })
    }

    /// Check whether `amount` units of surface are free.
    #[must_use]
    pub fn can_fit(&self, amount: i64) -> bool {
        self.available_surface >= amount
    }

    /// Move `amount` units from available to rented.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientCapacity` if less than `amount` is free, or
    /// `NonPositiveAmount` for a zero/negative request. On error the space
    /// is left untouched.
    pub fn commit_rental(&mut self, amount: i64) -> Result<()> {
        if amount <= 0 {
            return Err(DomainError::NonPositiveAmount(amount));
        }
        if self.available_surface < amount {
            return Err(DomainError::InsufficientCapacity {
                available: self.available_surface,
                requested: amount,
            });
        }

        self.available_surface -= amount;
        self.rented_surface += amount;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space(total: i64) -> StorageSpace {
        StorageSpace::new(UserId::generate(), "Hangar Nord", "12 rue des Docks", total, 500)
            .unwrap()
    }

    #[test]
    fn new_space_is_fully_available() {
        let s = space(100);
        assert_eq!(s.available_surface, 100);
        assert_eq!(s.rented_surface, 0);
    }

    #[test]
    fn commit_rental_moves_surface() {
        let mut s = space(100);
        s.commit_rental(40).unwrap();
        assert_eq!(s.available_surface, 60);
        assert_eq!(s.rented_surface, 40);
        assert_eq!(s.available_surface + s.rented_surface, s.total_surface);
    }

    #[test]
    fn commit_rental_rejects_overcommit() {
        let mut s = space(10);
        s.commit_rental(6).unwrap();
        let err = s.commit_rental(6).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientCapacity {
                available: 4,
                requested: 6
            }
        ));
        // Untouched on failure.
        assert_eq!(s.available_surface, 4);
        assert_eq!(s.rented_surface, 6);
    }

    #[test]
    fn zero_surface_space_rejected() {
        assert!(StorageSpace::new(UserId::generate(), "x", "y", 0, 100).is_err());
    }
}
