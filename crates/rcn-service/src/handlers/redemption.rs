//! Redemption verification handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use rcn_core::{Address, RedemptionCheck, ShopId};
use rcn_store::Store;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Redemption verification request.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// The redeeming customer.
    pub customer: String,
    /// The shop asking to redeem.
    pub shop_id: String,
    /// Requested amount in RCN.
    pub amount: i64,
}

/// Verify a redemption against current ledger state.
///
/// An amount over the cap is not an error: the decision comes back with
/// `can_redeem = false` and an explanation.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<RedemptionCheck>, ApiError> {
    let customer: Address = body
        .customer
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid wallet address".into()))?;
    let shop_id: ShopId = body
        .shop_id
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid shop id".into()))?;

    let check = state
        .store
        .verify_redemption(&customer, &shop_id, body.amount)?;

    Ok(Json(check))
}
