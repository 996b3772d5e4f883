//! Profile management handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use stowage_core::{Profile, Role};
use stowage_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Profile response.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    /// User ID.
    pub user_id: String,
    /// Display name.
    pub display_name: String,
    /// Contact email.
    pub email: Option<String>,
    /// Marketplace role.
    pub role: Role,
    /// Connected payout account, if linked.
    pub payout_account_id: Option<String>,
    /// Whether the payout account finished onboarding.
    pub onboarding_complete: bool,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&Profile> for ProfileResponse {
    fn from(profile: &Profile) -> Self {
        Self {
            user_id: profile.user_id.to_string(),
            display_name: profile.display_name.clone(),
            email: profile.email.clone(),
            role: profile.role,
            payout_account_id: profile.payout_account_id.clone(),
            onboarding_complete: profile.onboarding_complete,
            created_at: profile.created_at.to_rfc3339(),
        }
    }
}

/// Create profile request.
#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    /// Display name.
    pub display_name: String,
    /// Optional contact email.
    pub email: Option<String>,
    /// Marketplace role.
    pub role: Role,
}

/// Create the caller's profile.
pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    if body.display_name.trim().is_empty() {
        return Err(ApiError::BadRequest("display_name is required".into()));
    }

    if state.store.get_profile(&auth.user_id)?.is_some() {
        return Err(ApiError::Conflict("Profile already exists".into()));
    }

    let mut profile = Profile::new(auth.user_id, body.display_name.trim(), body.role);
    profile.email = body.email;

    state.store.put_profile(&profile)?;

    tracing::info!(user_id = %auth.user_id, role = ?body.role, "Profile created");

    Ok(Json(ProfileResponse::from(&profile)))
}

/// Get the caller's profile.
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state
        .store
        .get_profile(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("Profile not found".into()))?;

    Ok(Json(ProfileResponse::from(&profile)))
}

/// Update profile request. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    /// New display name.
    pub display_name: Option<String>,
    /// New contact email.
    pub email: Option<String>,
    /// New marketplace role.
    pub role: Option<Role>,
    /// Connected payout account id (`acct_...`).
    pub payout_account_id: Option<String>,
}

/// Update the caller's profile.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let mut profile = state
        .store
        .get_profile(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("Profile not found".into()))?;

    if let Some(name) = body.display_name {
        if name.trim().is_empty() {
            return Err(ApiError::BadRequest("display_name cannot be empty".into()));
        }
        profile.display_name = name.trim().to_string();
    }
    if let Some(email) = body.email {
        profile.email = Some(email);
    }
    if let Some(role) = body.role {
        profile.role = role;
    }
    if let Some(account) = body.payout_account_id {
        // A new connected account starts unverified; the provider's
        // account.updated webhook flips the flag once onboarding finishes.
        if profile.payout_account_id.as_deref() != Some(account.as_str()) {
            profile.onboarding_complete = false;
        }
        profile.payout_account_id = Some(account);
    }
    profile.updated_at = chrono::Utc::now();

    state.store.put_profile(&profile)?;

    tracing::info!(user_id = %auth.user_id, "Profile updated");

    Ok(Json(ProfileResponse::from(&profile)))
}
