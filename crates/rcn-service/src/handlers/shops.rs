//! Shop registration and lookup handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use rcn_core::{Address, Shop, ShopId};
use rcn_store::Store;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Shop registration request.
#[derive(Debug, Deserialize)]
pub struct CreateShopRequest {
    /// Display name.
    pub name: String,
    /// Wallet the shop redeems into.
    pub wallet_address: String,
    /// Whether the shop is registered as already verified.
    #[serde(default)]
    pub verified: bool,
}

/// Shop record response.
#[derive(Debug, Serialize)]
pub struct ShopResponse {
    /// Shop identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Shop wallet address.
    pub wallet_address: String,
    /// Whether the shop is operating.
    pub active: bool,
    /// Whether the shop is verified.
    pub verified: bool,
    /// Registration timestamp.
    pub created_at: String,
}

impl From<&Shop> for ShopResponse {
    fn from(shop: &Shop) -> Self {
        Self {
            id: shop.id.to_string(),
            name: shop.name.clone(),
            wallet_address: shop.wallet_address.to_string(),
            active: shop.active,
            verified: shop.verified,
            created_at: shop.created_at.to_rfc3339(),
        }
    }
}

/// Register a new shop.
pub async fn create_shop(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<CreateShopRequest>,
) -> Result<Json<ShopResponse>, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("shop name must not be empty".into()));
    }

    let wallet: Address = body
        .wallet_address
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid wallet address".into()))?;

    let mut shop = Shop::new(body.name.trim().to_string(), wallet, Utc::now());
    shop.verified = body.verified;
    state.store.put_shop(&shop)?;

    tracing::info!(shop_id = %shop.id, name = %shop.name, "shop registered");

    Ok(Json(ShopResponse::from(&shop)))
}

/// Get a shop record.
pub async fn get_shop(
    State(state): State<Arc<AppState>>,
    Path(shop_id): Path<String>,
) -> Result<Json<ShopResponse>, ApiError> {
    let shop_id: ShopId = shop_id
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid shop id".into()))?;

    let shop = state
        .store
        .get_shop(&shop_id)?
        .ok_or_else(|| ApiError::NotFound(format!("shop {shop_id}")))?;

    Ok(Json(ShopResponse::from(&shop)))
}
