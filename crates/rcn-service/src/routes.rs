//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    customers, earnings, health, promos, redemption, referrals, sessions, shops,
};
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Customers
/// - `POST /v1/customers` - Register customer (service auth)
/// - `GET /v1/customers/:address` - Get customer record
/// - `GET /v1/customers/:address/earned-balance` - Balance breakdown
///
/// ## Shops
/// - `POST /v1/shops` - Register shop (service auth)
/// - `GET /v1/shops/:id` - Get shop record
///
/// ## Earnings (service auth)
/// - `POST /v1/earnings/repair` - Credit a completed repair
/// - `POST /v1/earnings/gift` - Record an inbound gift transfer
/// - `POST /v1/earnings/market` - Record a market purchase
/// - `POST /v1/referrals/complete` - Complete a referral
///
/// ## Redemption
/// - `POST /v1/redemption/verify` - Verify a redemption (service auth)
/// - `POST /v1/redemption-sessions` - Open a session (service auth)
/// - `GET /v1/redemption-sessions/:id` - Get a session
/// - `POST /v1/redemption-sessions/:id/approve` - Approve (customer auth)
/// - `POST /v1/redemption-sessions/:id/reject` - Reject (customer auth)
/// - `POST /v1/redemption-sessions/:id/use` - Redeem (service auth)
///
/// ## Promos (service auth)
/// - `POST /v1/promos` - Create a promo code
/// - `POST /v1/promos/validate` - Validate a code for a customer
/// - `POST /v1/promos/use` - Use a code, crediting the bonus
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Customers
        .route("/v1/customers", post(customers::create_customer))
        .route("/v1/customers/:address", get(customers::get_customer))
        .route(
            "/v1/customers/:address/earned-balance",
            get(customers::earned_balance),
        )
        // Shops
        .route("/v1/shops", post(shops::create_shop))
        .route("/v1/shops/:id", get(shops::get_shop))
        // Earnings
        .route("/v1/earnings/repair", post(earnings::record_repair))
        .route("/v1/earnings/gift", post(earnings::record_gift))
        .route("/v1/earnings/market", post(earnings::record_market_purchase))
        .route("/v1/referrals/complete", post(referrals::complete_referral))
        // Redemption
        .route("/v1/redemption/verify", post(redemption::verify))
        .route("/v1/redemption-sessions", post(sessions::create_session))
        .route("/v1/redemption-sessions/:id", get(sessions::get_session))
        .route(
            "/v1/redemption-sessions/:id/approve",
            post(sessions::approve_session),
        )
        .route(
            "/v1/redemption-sessions/:id/reject",
            post(sessions::reject_session),
        )
        .route(
            "/v1/redemption-sessions/:id/use",
            post(sessions::use_session),
        )
        // Promos
        .route("/v1/promos", post(promos::create_promo))
        .route("/v1/promos/validate", post(promos::validate_promo))
        .route("/v1/promos/use", post(promos::use_promo))
        // Middleware
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
