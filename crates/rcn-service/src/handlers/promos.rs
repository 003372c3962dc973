//! Promo code handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rcn_core::{Address, BonusKind, PromoCode, ShopId, TransactionId};
use rcn_store::{PromoApplication, Store};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::handlers::earnings::forward_mint;
use crate::state::AppState;

/// Promo code creation request.
#[derive(Debug, Deserialize)]
pub struct CreatePromoRequest {
    /// The issuing shop.
    pub shop_id: String,
    /// Human-facing code, unique per shop.
    pub code: String,
    /// Bonus computation mode.
    pub bonus_kind: BonusKind,
    /// Flat RCN for `fixed`, whole percent for `percentage`.
    pub bonus_value: i64,
    /// Ceiling for percentage bonuses.
    pub max_bonus: Option<i64>,
    /// Start of the validity window.
    pub start_date: DateTime<Utc>,
    /// End of the validity window.
    pub end_date: DateTime<Utc>,
    /// Cap on total uses across all customers.
    pub total_usage_limit: Option<u32>,
    /// Cap on uses per customer (default 1).
    #[serde(default = "default_per_customer_limit")]
    pub per_customer_limit: u32,
}

fn default_per_customer_limit() -> u32 {
    1
}

/// Promo code response.
#[derive(Debug, Serialize)]
pub struct PromoResponse {
    /// Record identifier.
    pub id: String,
    /// The code string as stored.
    pub code: String,
    /// The issuing shop.
    pub shop_id: String,
    /// Bonus computation mode.
    pub bonus_kind: BonusKind,
    /// Bonus value.
    pub bonus_value: i64,
    /// Percentage bonus ceiling.
    pub max_bonus: Option<i64>,
    /// Use counter.
    pub times_used: u32,
    /// Sum of bonuses issued.
    pub total_bonus_issued: i64,
    /// Whether the code is switched on.
    pub active: bool,
}

impl From<&PromoCode> for PromoResponse {
    fn from(promo: &PromoCode) -> Self {
        Self {
            id: promo.id.to_string(),
            code: promo.code.clone(),
            shop_id: promo.shop_id.to_string(),
            bonus_kind: promo.bonus_kind,
            bonus_value: promo.bonus_value,
            max_bonus: promo.max_bonus,
            times_used: promo.times_used,
            total_bonus_issued: promo.total_bonus_issued,
            active: promo.active,
        }
    }
}

/// Create a promo code for a shop.
pub async fn create_promo(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<CreatePromoRequest>,
) -> Result<Json<PromoResponse>, ApiError> {
    let shop_id: ShopId = body
        .shop_id
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid shop id".into()))?;

    state
        .store
        .get_shop(&shop_id)?
        .ok_or_else(|| ApiError::NotFound(format!("shop {shop_id}")))?;

    if body.code.trim().is_empty() {
        return Err(ApiError::BadRequest("promo code must not be empty".into()));
    }
    if body.bonus_value <= 0 {
        return Err(ApiError::BadRequest("bonus value must be positive".into()));
    }
    if body.end_date <= body.start_date {
        return Err(ApiError::BadRequest(
            "end date must be after start date".into(),
        ));
    }
    if body.per_customer_limit == 0 {
        return Err(ApiError::BadRequest(
            "per-customer limit must be at least 1".into(),
        ));
    }

    let promo = PromoCode::new(
        &body.code,
        shop_id,
        body.bonus_kind,
        body.bonus_value,
        body.max_bonus,
        body.start_date,
        body.end_date,
        body.total_usage_limit,
        body.per_customer_limit,
        Utc::now(),
    );
    state.store.create_promo(&promo)?;

    tracing::info!(shop_id = %shop_id, code = %promo.code, "promo code created");

    Ok(Json(PromoResponse::from(&promo)))
}

/// Promo validation request.
#[derive(Debug, Deserialize)]
pub struct ValidatePromoRequest {
    /// The shop whose code is being checked.
    pub shop_id: String,
    /// The code string.
    pub code: String,
    /// The customer who would use it.
    pub customer: String,
    /// Base reward to preview the bonus against (default 0).
    #[serde(default)]
    pub base_reward: i64,
}

/// Promo validation response.
#[derive(Debug, Serialize)]
pub struct ValidatePromoResponse {
    /// Always true on success; failures return error responses.
    pub valid: bool,
    /// The code string as stored.
    pub code: String,
    /// The bonus the customer would receive for the given base reward.
    pub bonus: i64,
    /// Current use counter.
    pub times_used: u32,
}

/// Validate a promo code for a customer without using it.
pub async fn validate_promo(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<ValidatePromoRequest>,
) -> Result<Json<ValidatePromoResponse>, ApiError> {
    let shop_id: ShopId = body
        .shop_id
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid shop id".into()))?;
    let customer: Address = body
        .customer
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid wallet address".into()))?;

    let promo = state
        .store
        .get_promo(&shop_id, &body.code)?
        .ok_or_else(|| ApiError::NotFound(format!("promo code {}", body.code)))?;

    let uses = state.store.promo_use_count(&promo.id, &customer)?;
    promo.validate(uses, Utc::now()).map_err(ApiError::from)?;

    Ok(Json(ValidatePromoResponse {
        valid: true,
        code: promo.code.clone(),
        bonus: promo.bonus_for(body.base_reward),
        times_used: promo.times_used,
    }))
}

/// Promo use request.
#[derive(Debug, Deserialize)]
pub struct UsePromoRequest {
    /// The shop whose code is being used.
    pub shop_id: String,
    /// The code string.
    pub code: String,
    /// The customer using it.
    pub customer: String,
    /// The base reward the bonus is computed on.
    pub base_reward: i64,
    /// Caller-supplied idempotency key (ULID); generated when absent.
    pub transaction_id: Option<String>,
}

/// Promo use response.
#[derive(Debug, Serialize)]
pub struct UsePromoResponse {
    /// The bonus credited.
    pub bonus: i64,
    /// `base_reward + bonus`.
    pub total_reward: i64,
    /// The code's use counter after this application.
    pub times_used: u32,
    /// The idempotency key used.
    pub transaction_id: String,
    /// Whether this request had already been recorded.
    pub already_recorded: bool,
}

/// Use a promo code, crediting the bonus to the customer.
pub async fn use_promo(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<UsePromoRequest>,
) -> Result<Json<UsePromoResponse>, ApiError> {
    let shop_id: ShopId = body
        .shop_id
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid shop id".into()))?;
    let customer: Address = body
        .customer
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid wallet address".into()))?;
    let transaction_id = match body.transaction_id {
        Some(ref s) => s
            .parse::<TransactionId>()
            .map_err(|_| ApiError::BadRequest("invalid transaction id".into()))?,
        None => TransactionId::generate(),
    };

    let outcome = state.store.apply_promo(
        &PromoApplication {
            shop_id,
            code: body.code.clone(),
            customer: customer.clone(),
            base_reward: body.base_reward,
            transaction_id,
        },
        Utc::now(),
    )?;

    tracing::info!(
        customer = %customer,
        shop_id = %shop_id,
        code = %body.code,
        bonus = outcome.bonus,
        already_recorded = outcome.already_recorded,
        "promo code used"
    );

    if !outcome.already_recorded {
        forward_mint(&state, &customer, outcome.bonus, Some(&transaction_id)).await;
    }

    Ok(Json(UsePromoResponse {
        bonus: outcome.bonus,
        total_reward: outcome.total_reward,
        times_used: outcome.times_used,
        transaction_id: transaction_id.to_string(),
        already_recorded: outcome.already_recorded,
    }))
}
