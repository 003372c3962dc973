//! Earning handlers: repair completions, gifts, and market purchases.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use rcn_core::{Address, ShopId, TransactionId};
use rcn_store::{GiftCredit, MarketCredit, RepairCredit, Store};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Forward a committed credit to the minter, best-effort.
///
/// The ledger is the source of truth; a minter failure is logged and the
/// settlement hash simply stays unset.
pub(crate) async fn forward_mint(
    state: &AppState,
    address: &Address,
    amount: i64,
    transaction_id: Option<&TransactionId>,
) {
    let Some(minter) = state.minter.as_ref() else {
        return;
    };

    match minter.mint(address, amount).await {
        Ok(receipt) if receipt.success => {
            if let (Some(tx_id), Some(hash)) = (transaction_id, receipt.transaction_hash) {
                if let Err(e) = state.store.attach_settlement_hash(tx_id, &hash) {
                    tracing::error!(error = %e, transaction_id = %tx_id, "failed to record settlement hash");
                }
            }
        }
        Ok(_) => {
            tracing::warn!(customer = %address, amount, "minter declined the mint");
        }
        Err(e) => {
            tracing::error!(error = %e, customer = %address, amount, "mint forwarding failed");
        }
    }
}

fn parse_address(s: &str) -> Result<Address, ApiError> {
    s.parse()
        .map_err(|_| ApiError::BadRequest("invalid wallet address".into()))
}

fn parse_transaction_id(id: Option<&String>) -> Result<TransactionId, ApiError> {
    match id {
        Some(s) => s
            .parse()
            .map_err(|_| ApiError::BadRequest("invalid transaction id".into())),
        None => Ok(TransactionId::generate()),
    }
}

/// Repair completion request.
#[derive(Debug, Deserialize)]
pub struct RepairRequest {
    /// The earning customer.
    pub customer: String,
    /// The shop where the repair happened.
    pub shop_id: String,
    /// Repair value in USD cents.
    pub repair_amount_cents: i64,
    /// Caller-supplied idempotency key (ULID); generated when absent.
    pub transaction_id: Option<String>,
}

/// Repair completion response.
#[derive(Debug, Serialize)]
pub struct RepairResponse {
    /// Base RCN reward.
    pub base_reward: i64,
    /// Tier bonus credited on top.
    pub tier_bonus: i64,
    /// Total credited.
    pub total_credited: i64,
    /// Tier before the credit.
    pub old_tier: String,
    /// Tier after the credit.
    pub new_tier: String,
    /// The idempotency key used.
    pub transaction_id: String,
    /// Whether this request had already been recorded.
    pub already_recorded: bool,
}

/// Credit a completed repair.
pub async fn record_repair(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<RepairRequest>,
) -> Result<Json<RepairResponse>, ApiError> {
    let customer = parse_address(&body.customer)?;
    let shop_id: ShopId = body
        .shop_id
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid shop id".into()))?;
    let transaction_id = parse_transaction_id(body.transaction_id.as_ref())?;

    let credit = RepairCredit {
        customer: customer.clone(),
        shop_id,
        repair_amount_cents: body.repair_amount_cents,
        transaction_id,
    };
    let outcome = state.store.record_repair(&credit, Utc::now())?;

    tracing::info!(
        customer = %customer,
        shop_id = %shop_id,
        base_reward = outcome.base_reward,
        tier_bonus = outcome.tier_bonus,
        already_recorded = outcome.already_recorded,
        "repair credit recorded"
    );

    if !outcome.already_recorded {
        forward_mint(
            &state,
            &customer,
            outcome.total_credited,
            Some(&transaction_id),
        )
        .await;
    }

    Ok(Json(RepairResponse {
        base_reward: outcome.base_reward,
        tier_bonus: outcome.tier_bonus,
        total_credited: outcome.total_credited,
        old_tier: outcome.old_tier.as_str().to_string(),
        new_tier: outcome.new_tier.as_str().to_string(),
        transaction_id: transaction_id.to_string(),
        already_recorded: outcome.already_recorded,
    }))
}

/// Gift transfer request.
#[derive(Debug, Deserialize)]
pub struct GiftRequest {
    /// Receiving customer.
    pub to: String,
    /// Sending wallet, when known.
    pub from: Option<String>,
    /// Amount in RCN.
    pub amount: i64,
    /// Caller-supplied idempotency key (ULID); generated when absent.
    pub transaction_id: Option<String>,
}

/// Simple credit response.
#[derive(Debug, Serialize)]
pub struct CreditResponse {
    /// The credited amount.
    pub amount: i64,
    /// The idempotency key used.
    pub transaction_id: String,
    /// Whether this request had already been recorded.
    pub already_recorded: bool,
}

/// Record an inbound gift transfer.
pub async fn record_gift(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<GiftRequest>,
) -> Result<Json<CreditResponse>, ApiError> {
    let to = parse_address(&body.to)?;
    let from = body.from.as_deref().map(parse_address).transpose()?;
    let transaction_id = parse_transaction_id(body.transaction_id.as_ref())?;

    let outcome = state.store.record_gift(
        &GiftCredit {
            to: to.clone(),
            from,
            amount: body.amount,
            transaction_id,
        },
        Utc::now(),
    )?;

    tracing::info!(
        customer = %to,
        amount = outcome.amount,
        already_recorded = outcome.already_recorded,
        "gift recorded"
    );

    Ok(Json(CreditResponse {
        amount: outcome.amount,
        transaction_id: transaction_id.to_string(),
        already_recorded: outcome.already_recorded,
    }))
}

/// Market purchase request.
#[derive(Debug, Deserialize)]
pub struct MarketPurchaseRequest {
    /// Purchasing customer.
    pub customer: String,
    /// Amount in RCN.
    pub amount: i64,
    /// Caller-supplied idempotency key (ULID); generated when absent.
    pub transaction_id: Option<String>,
}

/// Record a market purchase.
pub async fn record_market_purchase(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<MarketPurchaseRequest>,
) -> Result<Json<CreditResponse>, ApiError> {
    let customer = parse_address(&body.customer)?;
    let transaction_id = parse_transaction_id(body.transaction_id.as_ref())?;

    let outcome = state.store.record_market_purchase(
        &MarketCredit {
            customer: customer.clone(),
            amount: body.amount,
            transaction_id,
        },
        Utc::now(),
    )?;

    tracing::info!(
        customer = %customer,
        amount = outcome.amount,
        already_recorded = outcome.already_recorded,
        "market purchase recorded"
    );

    Ok(Json(CreditResponse {
        amount: outcome.amount,
        transaction_id: transaction_id.to_string(),
        already_recorded: outcome.already_recorded,
    }))
}
