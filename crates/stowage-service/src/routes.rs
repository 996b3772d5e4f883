//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, checkout, health, orders, products, profiles, rentals, spaces, webhooks};
use crate::state::AppState;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /api/spaces/available` - Spaces with free surface
/// - `GET /api/checkout/success` - Payment confirmation callback
///
/// ## Authenticated (bearer JWT)
/// - `/api/profile` - Create/fetch/update the caller's profile
/// - `/api/spaces` - Storage space CRUD (owner-scoped)
/// - `/api/products` - Product CRUD (supplier-scoped)
/// - `/api/rentals` - The caller's rentals
/// - `/api/orders` - The caller's orders + status updates
/// - `/api/checkout/*` - Checkout session creation
///
/// ## Admin (X-Admin-Key)
/// - `GET /api/admin/dashboard` - Collection dumps
///
/// ## Webhooks (signature verification, no rate limiting)
/// - `POST /api/webhook/stripe` - Stripe events, raw body
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Concurrency-limited API surface. The webhook route stays out of this
    // router on purpose: provider retries must never be shed by our own
    // limiter, and the raw-body handler must not sit behind any
    // body-consuming middleware.
    let api_routes = Router::new()
        .route(
            "/api/profile",
            post(profiles::create_profile)
                .get(profiles::get_profile)
                .put(profiles::update_profile),
        )
        .route(
            "/api/spaces",
            post(spaces::create_space).get(spaces::list_my_spaces),
        )
        .route("/api/spaces/available", get(spaces::list_available_spaces))
        .route(
            "/api/spaces/:id",
            get(spaces::get_space)
                .put(spaces::update_space)
                .delete(spaces::delete_space),
        )
        .route(
            "/api/products",
            post(products::create_product).get(products::list_my_products),
        )
        .route(
            "/api/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/api/rentals", get(rentals::list_my_rentals))
        .route("/api/orders", get(orders::list_my_orders))
        .route("/api/orders/:id/status", put(orders::update_order_status))
        .route(
            "/api/checkout/storage",
            post(checkout::create_storage_checkout),
        )
        .route(
            "/api/checkout/product",
            post(checkout::create_product_checkout),
        )
        .route("/api/checkout/success", get(checkout::payment_success))
        .route("/api/admin/dashboard", get(admin::dashboard))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API routes (rate limited)
        .merge(api_routes)
        // Webhooks (no rate limit - retries are the provider's business)
        .route("/api/webhook/stripe", post(webhooks::stripe_webhook))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
