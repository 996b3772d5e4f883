//! Order handlers.
//!
//! Orders are created by the webhook pipeline only; the API lets buyers
//! review them and the parties flip the collection status.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use stowage_core::{Order, OrderId, OrderStatus};
use stowage_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Order response.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    /// Order ID.
    pub id: String,
    /// Human-readable reference.
    pub order_number: String,
    /// The space the goods are collected from.
    pub storage_id: String,
    /// The purchased product.
    pub product_id: String,
    /// Units purchased.
    pub quantity: i64,
    /// Total paid, in cents.
    pub total_price_cents: i64,
    /// Collection status.
    pub status: OrderStatus,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            order_number: order.order_number.to_string(),
            storage_id: order.storage_id.to_string(),
            product_id: order.product_id.to_string(),
            quantity: order.quantity,
            total_price_cents: order.total_price_cents,
            status: order.status,
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

/// List the caller's orders, newest first.
pub async fn list_my_orders(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.store.list_orders_by_buyer(&auth.user_id)?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// Update order status request.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    /// New collection status.
    pub status: OrderStatus,
}

/// Update an order's collection status.
///
/// Allowed for the buyer and for the supplier whose rental stocks the
/// product (the party physically handing the goods over).
pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateOrderStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid order id: {id}")))?;

    let order = state
        .store
        .get_order(order_id)?
        .ok_or_else(|| ApiError::NotFound(format!("order: {order_id}")))?;

    if !may_update(&state, &auth, &order)? {
        return Err(ApiError::Forbidden);
    }

    let updated = state.store.update_order_status(order_id, body.status)?;

    tracing::info!(
        order_id = %order_id,
        order_number = %updated.order_number,
        status = ?updated.status,
        "Order status updated"
    );

    Ok(Json(OrderResponse::from(&updated)))
}

fn may_update(state: &AppState, auth: &AuthUser, order: &Order) -> Result<bool, ApiError> {
    if order.buyer_id == auth.user_id {
        return Ok(true);
    }

    // The supplier is the renter behind the product's rental.
    let Some(product) = state.store.get_product(&order.product_id)? else {
        return Ok(false);
    };
    let Some(rental) = state.store.get_rental(product.rental_id)? else {
        return Ok(false);
    };
    Ok(rental.renter_id == auth.user_id)
}
