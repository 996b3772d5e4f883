//! Product listing handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use stowage_core::{Product, ProductId, Rental, RentalId};
use stowage_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Product response.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    /// Product ID.
    pub id: String,
    /// The rental stocking this product.
    pub rental_id: String,
    /// Product name.
    pub name: String,
    /// Brand label.
    pub brand: String,
    /// Description.
    pub description: String,
    /// Unit price in cents.
    pub price_cents: i64,
    /// Units in stock.
    pub stock_quantity: i64,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            rental_id: product.rental_id.to_string(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            description: product.description.clone(),
            price_cents: product.price_cents,
            stock_quantity: product.stock_quantity,
            created_at: product.created_at.to_rfc3339(),
        }
    }
}

/// Create product request.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    /// The caller's rental the product is stocked on.
    pub rental_id: String,
    /// Product name, unique across all products.
    pub name: String,
    /// Brand label.
    pub brand: String,
    /// Description.
    pub description: String,
    /// Unit price in cents.
    pub price_cents: i64,
    /// Initial stock.
    pub stock_quantity: i64,
}

/// Load a rental and check it belongs to the caller.
fn owned_rental(
    state: &AppState,
    auth: &AuthUser,
    rental_id: RentalId,
) -> Result<Rental, ApiError> {
    let rental = state
        .store
        .get_rental(rental_id)?
        .ok_or_else(|| ApiError::NotFound(format!("rental: {rental_id}")))?;

    if rental.renter_id != auth.user_id {
        return Err(ApiError::Forbidden);
    }
    Ok(rental)
}

/// List a product on one of the caller's rentals.
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let rental_id: RentalId = body
        .rental_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid rental id: {}", body.rental_id)))?;

    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".into()));
    }

    owned_rental(&state, &auth, rental_id)?;

    let product = Product::new(
        rental_id,
        body.name.trim(),
        body.brand,
        body.description,
        body.price_cents,
        body.stock_quantity,
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.store.create_product(&product)?;

    tracing::info!(
        product_id = %product.id,
        rental_id = %rental_id,
        supplier_id = %auth.user_id,
        stock = %product.stock_quantity,
        "Product listed"
    );

    Ok(Json(ProductResponse::from(&product)))
}

/// List the products on all of the caller's rentals.
pub async fn list_my_products(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let rentals = state.store.list_rentals_by_renter(&auth.user_id)?;

    let mut products = Vec::new();
    for rental in rentals {
        products.extend(state.store.list_products_by_rental(rental.id)?);
    }

    Ok(Json(products.iter().map(ProductResponse::from).collect()))
}

fn parse_product_id(id: &str) -> Result<ProductId, ApiError> {
    id.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid product id: {id}")))
}

/// Get a product (any authenticated user: buyers browse these).
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id = parse_product_id(&id)?;
    let product = state
        .store
        .get_product(&product_id)?
        .ok_or_else(|| ApiError::NotFound(format!("product: {product_id}")))?;

    Ok(Json(ProductResponse::from(&product)))
}

/// Update product request. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    /// New product name.
    pub name: Option<String>,
    /// New brand label.
    pub brand: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New unit price in cents.
    pub price_cents: Option<i64>,
    /// Restocked quantity (absolute, not a delta).
    pub stock_quantity: Option<i64>,
}

/// Update one of the caller's products.
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id = parse_product_id(&id)?;
    let mut product = state
        .store
        .get_product(&product_id)?
        .ok_or_else(|| ApiError::NotFound(format!("product: {product_id}")))?;

    owned_rental(&state, &auth, product.rental_id)?;

    if let Some(name) = body.name {
        if name.trim().is_empty() {
            return Err(ApiError::BadRequest("name cannot be empty".into()));
        }
        product.name = name.trim().to_string();
    }
    if let Some(brand) = body.brand {
        product.brand = brand;
    }
    if let Some(description) = body.description {
        product.description = description;
    }
    if let Some(price) = body.price_cents {
        if price <= 0 {
            return Err(ApiError::BadRequest("price_cents must be positive".into()));
        }
        product.price_cents = price;
    }
    if let Some(stock) = body.stock_quantity {
        if stock < 0 {
            return Err(ApiError::BadRequest(
                "stock_quantity cannot be negative".into(),
            ));
        }
        product.stock_quantity = stock;
    }
    product.updated_at = chrono::Utc::now();

    state.store.update_product(&product)?;

    tracing::info!(product_id = %product.id, "Product updated");

    Ok(Json(ProductResponse::from(&product)))
}

/// Delete one of the caller's products.
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let product_id = parse_product_id(&id)?;
    let product = state
        .store
        .get_product(&product_id)?
        .ok_or_else(|| ApiError::NotFound(format!("product: {product_id}")))?;

    owned_rental(&state, &auth, product.rental_id)?;

    state.store.delete_product(&product_id)?;

    tracing::info!(product_id = %product_id, "Product delisted");

    Ok(Json(serde_json::json!({ "deleted": true })))
}
