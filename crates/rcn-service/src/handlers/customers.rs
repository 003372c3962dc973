//! Customer registration and balance handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use rcn_core::{Address, Customer};
use rcn_store::Store;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Customer registration request.
#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    /// Wallet address to register.
    pub address: String,
}

/// Customer record response.
#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    /// Wallet address.
    pub address: String,
    /// Lifetime earnings in RCN.
    pub lifetime_earnings: i64,
    /// Current tier.
    pub tier: String,
    /// RCN earned today.
    pub daily_earnings: i64,
    /// RCN earned this month.
    pub monthly_earnings: i64,
    /// Home shop, if established.
    pub home_shop_id: Option<String>,
    /// Whether the customer is active.
    pub is_active: bool,
    /// Registration timestamp.
    pub created_at: String,
}

impl From<&Customer> for CustomerResponse {
    fn from(customer: &Customer) -> Self {
        Self {
            address: customer.address.to_string(),
            lifetime_earnings: customer.lifetime_earnings,
            tier: customer.tier.as_str().to_string(),
            daily_earnings: customer.daily_earnings,
            monthly_earnings: customer.monthly_earnings,
            home_shop_id: customer.home_shop_id.map(|id| id.to_string()),
            is_active: customer.is_active,
            created_at: customer.created_at.to_rfc3339(),
        }
    }
}

/// Register a new customer.
pub async fn create_customer(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<CreateCustomerRequest>,
) -> Result<Json<CustomerResponse>, ApiError> {
    let address: Address = body
        .address
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid wallet address".into()))?;

    if state.store.get_customer(&address)?.is_some() {
        return Err(ApiError::Conflict(format!(
            "customer {address} is already registered"
        )));
    }

    let customer = Customer::new(address.clone(), Utc::now());
    state.store.put_customer(&customer)?;

    tracing::info!(customer = %address, "customer registered");

    Ok(Json(CustomerResponse::from(&customer)))
}

/// Get a customer record.
pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<CustomerResponse>, ApiError> {
    let address: Address = address
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid wallet address".into()))?;

    let customer = state
        .store
        .get_customer(&address)?
        .ok_or_else(|| ApiError::NotFound(format!("customer {address}")))?;

    Ok(Json(CustomerResponse::from(&customer)))
}

/// Balance breakdown response.
#[derive(Debug, Serialize)]
pub struct EarnedBalanceResponse {
    /// Wallet address.
    pub address: String,
    /// Redeemable credits minus debits.
    pub earned_balance: i64,
    /// All credits minus debits.
    pub total_balance: i64,
    /// Gifted and market-purchased tokens.
    pub market_balance: i64,
    /// Monotonic lifetime earnings.
    pub lifetime_earnings: i64,
    /// Current tier.
    pub tier: String,
    /// Home shop, if established.
    pub home_shop_id: Option<String>,
}

/// Get a customer's ledger-derived balance breakdown.
pub async fn earned_balance(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<EarnedBalanceResponse>, ApiError> {
    let address: Address = address
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid wallet address".into()))?;

    let customer = state
        .store
        .get_customer(&address)?
        .ok_or_else(|| ApiError::NotFound(format!("customer {address}")))?;

    let balances = state.store.balances(&address)?;
    let home_shop = state.store.home_shop(&address)?;

    Ok(Json(EarnedBalanceResponse {
        address: address.to_string(),
        earned_balance: balances.earned,
        total_balance: balances.total,
        market_balance: balances.market,
        lifetime_earnings: balances.lifetime_earnings,
        tier: customer.tier.as_str().to_string(),
        home_shop_id: home_shop.map(|id| id.to_string()),
    }))
}
