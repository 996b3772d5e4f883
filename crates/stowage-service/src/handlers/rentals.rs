//! Rental listing handlers.
//!
//! Rentals are created by the webhook pipeline only; the API surface here
//! is read-only.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use stowage_core::Rental;
use stowage_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Rental response, with the space details a renter needs.
#[derive(Debug, Serialize)]
pub struct RentalResponse {
    /// Rental ID.
    pub id: String,
    /// The rented space.
    pub storage_id: String,
    /// Space display name (when the space still exists).
    pub storage_name: Option<String>,
    /// Space address.
    pub storage_address: Option<String>,
    /// Rented surface in units.
    pub space_amount: i64,
    /// Period start.
    pub start_date: String,
    /// Period end.
    pub end_date: String,
    /// Whether the rental is running.
    pub active: bool,
    /// Whether the rental is booked for a future start.
    pub reserved: bool,
}

impl RentalResponse {
    fn new(rental: &Rental, state: &AppState) -> Result<Self, ApiError> {
        let space = state.store.get_space(&rental.storage_id)?;

        Ok(Self {
            id: rental.id.to_string(),
            storage_id: rental.storage_id.to_string(),
            storage_name: space.as_ref().map(|s| s.name.clone()),
            storage_address: space.map(|s| s.address),
            space_amount: rental.space_amount,
            start_date: rental.start_date.to_string(),
            end_date: rental.end_date.to_string(),
            active: rental.active,
            reserved: rental.reserved,
        })
    }
}

/// List the caller's rentals, newest first.
pub async fn list_my_rentals(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<RentalResponse>>, ApiError> {
    let rentals = state.store.list_rentals_by_renter(&auth.user_id)?;

    let mut responses = Vec::with_capacity(rentals.len());
    for rental in &rentals {
        responses.push(RentalResponse::new(rental, &state)?);
    }

    Ok(Json(responses))
}
