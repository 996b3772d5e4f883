//! Storage space handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use stowage_core::{SpaceId, StorageSpace};
use stowage_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Storage space response.
#[derive(Debug, Serialize)]
pub struct SpaceResponse {
    /// Space ID.
    pub id: String,
    /// Owner user ID.
    pub owner_id: String,
    /// Display name.
    pub name: String,
    /// Physical address.
    pub address: String,
    /// Total surface in units.
    pub total_surface: i64,
    /// Surface still free.
    pub available_surface: i64,
    /// Surface rented out.
    pub rented_surface: i64,
    /// Price per surface unit, in cents.
    pub price_cents: i64,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&StorageSpace> for SpaceResponse {
    fn from(space: &StorageSpace) -> Self {
        Self {
            id: space.id.to_string(),
            owner_id: space.owner_id.to_string(),
            name: space.name.clone(),
            address: space.address.clone(),
            total_surface: space.total_surface,
            available_surface: space.available_surface,
            rented_surface: space.rented_surface,
            price_cents: space.price_cents,
            created_at: space.created_at.to_rfc3339(),
        }
    }
}

/// Create space request.
#[derive(Debug, Deserialize)]
pub struct CreateSpaceRequest {
    /// Display name, unique across all spaces.
    pub name: String,
    /// Physical address.
    pub address: String,
    /// Total surface in units.
    pub total_surface: i64,
    /// Price per surface unit, in cents.
    pub price_cents: i64,
}

/// Create a storage space owned by the caller.
pub async fn create_space(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateSpaceRequest>,
) -> Result<Json<SpaceResponse>, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".into()));
    }

    let space = StorageSpace::new(
        auth.user_id,
        body.name.trim(),
        body.address,
        body.total_surface,
        body.price_cents,
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.store.create_space(&space)?;

    tracing::info!(
        space_id = %space.id,
        owner_id = %auth.user_id,
        total_surface = %space.total_surface,
        "Storage space created"
    );

    Ok(Json(SpaceResponse::from(&space)))
}

/// List the caller's spaces.
pub async fn list_my_spaces(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<SpaceResponse>>, ApiError> {
    let spaces = state.store.list_spaces_by_owner(&auth.user_id)?;
    Ok(Json(spaces.iter().map(SpaceResponse::from).collect()))
}

/// Public listing of spaces with free surface, for renters.
pub async fn list_available_spaces(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SpaceResponse>>, ApiError> {
    let spaces = state.store.list_available_spaces()?;
    Ok(Json(spaces.iter().map(SpaceResponse::from).collect()))
}

fn parse_space_id(id: &str) -> Result<SpaceId, ApiError> {
    id.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid space id: {id}")))
}

/// Load a space and check the caller owns it.
fn owned_space(
    state: &AppState,
    auth: &AuthUser,
    space_id: &SpaceId,
) -> Result<StorageSpace, ApiError> {
    let space = state
        .store
        .get_space(space_id)?
        .ok_or_else(|| ApiError::NotFound(format!("storage space: {space_id}")))?;

    if space.owner_id != auth.user_id {
        return Err(ApiError::Forbidden);
    }
    Ok(space)
}

/// Get one of the caller's spaces.
pub async fn get_space(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SpaceResponse>, ApiError> {
    let space_id = parse_space_id(&id)?;
    let space = owned_space(&state, &auth, &space_id)?;
    Ok(Json(SpaceResponse::from(&space)))
}

/// Update space request. Absent fields are left unchanged. Surfaces are
/// not editable here: they move only through confirmed rentals.
#[derive(Debug, Deserialize)]
pub struct UpdateSpaceRequest {
    /// New display name.
    pub name: Option<String>,
    /// New address.
    pub address: Option<String>,
    /// New price per surface unit, in cents.
    pub price_cents: Option<i64>,
}

/// Update one of the caller's spaces.
pub async fn update_space(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateSpaceRequest>,
) -> Result<Json<SpaceResponse>, ApiError> {
    let space_id = parse_space_id(&id)?;
    let mut space = owned_space(&state, &auth, &space_id)?;

    if let Some(name) = body.name {
        if name.trim().is_empty() {
            return Err(ApiError::BadRequest("name cannot be empty".into()));
        }
        space.name = name.trim().to_string();
    }
    if let Some(address) = body.address {
        space.address = address;
    }
    if let Some(price) = body.price_cents {
        if price <= 0 {
            return Err(ApiError::BadRequest("price_cents must be positive".into()));
        }
        space.price_cents = price;
    }
    space.updated_at = chrono::Utc::now();

    state.store.update_space(&space)?;

    tracing::info!(space_id = %space.id, "Storage space updated");

    Ok(Json(SpaceResponse::from(&space)))
}

/// Delete one of the caller's spaces.
pub async fn delete_space(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let space_id = parse_space_id(&id)?;
    let space = owned_space(&state, &auth, &space_id)?;

    if space.rented_surface > 0 {
        return Err(ApiError::Conflict(
            "space still has rented surface".into(),
        ));
    }

    state.store.delete_space(&space_id)?;

    tracing::info!(space_id = %space_id, "Storage space deleted");

    Ok(Json(serde_json::json!({ "deleted": true })))
}
