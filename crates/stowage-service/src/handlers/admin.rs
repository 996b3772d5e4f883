//! Admin dashboard handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use stowage_store::Store;

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Upper bound on one dashboard page.
const DASHBOARD_LIMIT: usize = 500;

/// Dashboard query parameters.
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// Which collection to fetch.
    #[serde(rename = "type")]
    pub data_type: String,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

/// Admin dashboard query: one collection per request.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let data = match query.data_type.as_str() {
        "transactions" => {
            serde_json::to_value(state.store.list_transactions(DASHBOARD_LIMIT, query.offset)?)
        }
        "profiles" => serde_json::to_value(state.store.list_profiles(DASHBOARD_LIMIT, query.offset)?),
        "spaces" => serde_json::to_value(state.store.list_spaces(DASHBOARD_LIMIT, query.offset)?),
        "products" => serde_json::to_value(state.store.list_products(DASHBOARD_LIMIT, query.offset)?),
        other => {
            return Err(ApiError::BadRequest(format!(
                "invalid dashboard type: {other}"
            )))
        }
    }
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(
        admin_id = %admin.admin_id,
        data_type = %query.data_type,
        "Dashboard query served"
    );

    Ok(Json(serde_json::json!({ "success": true, "data": data })))
}
