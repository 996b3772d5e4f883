//! Rental types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::{RentalId, SpaceId, UserId};

/// A rental of surface on a storage space.
///
/// A rental whose period starts on the day it is created is `active`
/// immediately; one starting later is `reserved` and becomes active once
/// its start date arrives (the reconciliation sweep performs the flip).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rental {
    /// Unique rental id (time-ordered).
    pub id: RentalId,

    /// The renter holding the surface.
    pub renter_id: UserId,

    /// The space the surface belongs to.
    pub storage_id: SpaceId,

    /// Rented surface in units.
    pub space_amount: i64,

    /// First day of the rental period.
    pub start_date: NaiveDate,

    /// Last day of the rental period (inclusive).
    pub end_date: NaiveDate,

    /// Whether the rental is currently running.
    pub active: bool,

    /// Whether the rental is booked for a future start date.
    pub reserved: bool,

    /// When the rental record was created.
    pub created_at: DateTime<Utc>,
}

impl Rental {
    /// Create a rental for a confirmed payment.
    ///
    /// `today` decides whether the rental starts out active or reserved.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriod` if the period is inverted, or
    /// `NonPositiveAmount` for a zero/negative surface amount.
    pub fn new(
        renter_id: UserId,
        storage_id: SpaceId,
        space_amount: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Self> {
        if space_amount <= 0 {
            return Err(DomainError::NonPositiveAmount(space_amount));
        }
        if end_date < start_date {
            return Err(DomainError::InvalidPeriod {
                start: start_date,
                end: end_date,
            });
        }

        let active = start_date <= today;
        Ok(Self {
            id: RentalId::generate(),
            renter_id,
            storage_id,
            space_amount,
            start_date,
            end_date,
            active,
            reserved: !active,
            created_at: Utc::now(),
        })
    }

    /// Whether the rental still holds surface on `today` (running or booked).
    #[must_use]
    pub fn is_live(&self, today: NaiveDate) -> bool {
        self.end_date >= today
    }

    /// Whether a reserved rental's start date has arrived.
    #[must_use]
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.reserved && self.start_date <= today
    }

    /// Flip a due reservation to active.
    pub fn activate(&mut self) {
        self.active = true;
        self.reserved = false;
    }
}
