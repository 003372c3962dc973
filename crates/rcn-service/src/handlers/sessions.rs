//! Redemption session handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use rcn_core::{Address, RedemptionSession, SessionId, ShopId};
use rcn_store::Store;

use crate::auth::{AuthCustomer, ServiceAuth};
use crate::error::ApiError;
use crate::state::AppState;

/// Session creation request (shop-initiated).
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// The redeeming customer.
    pub customer: String,
    /// The shop opening the session.
    pub shop_id: String,
    /// Amount to authorize, in RCN.
    pub amount: i64,
}

/// Session response.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Session identifier.
    pub session_id: String,
    /// The customer whose balance would be debited.
    pub customer: String,
    /// The shop requesting the redemption.
    pub shop_id: String,
    /// Authorized amount.
    pub max_amount: i64,
    /// Lifecycle state.
    pub status: String,
    /// When the session was opened.
    pub created_at: String,
    /// When a pending session lapses.
    pub expires_at: String,
    /// When the customer approved, if they did.
    pub approved_at: Option<String>,
    /// When the shop redeemed, if it did.
    pub used_at: Option<String>,
    /// Scannable approval payload.
    pub qr_code: String,
}

impl From<&RedemptionSession> for SessionResponse {
    fn from(session: &RedemptionSession) -> Self {
        Self {
            session_id: session.id.to_string(),
            customer: session.customer.to_string(),
            shop_id: session.shop_id.to_string(),
            max_amount: session.max_amount,
            status: session.status.as_str().to_string(),
            created_at: session.created_at.to_rfc3339(),
            expires_at: session.expires_at.to_rfc3339(),
            approved_at: session.approved_at.map(|t| t.to_rfc3339()),
            used_at: session.used_at.map(|t| t.to_rfc3339()),
            qr_code: session.qr_code.clone(),
        }
    }
}

fn parse_session_id(s: &str) -> Result<SessionId, ApiError> {
    s.parse()
        .map_err(|_| ApiError::BadRequest("invalid session id".into()))
}

/// Open a pending redemption session.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<CreateSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let customer: Address = body
        .customer
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid wallet address".into()))?;
    let shop_id: ShopId = body
        .shop_id
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid shop id".into()))?;

    let session = state
        .store
        .create_session(&customer, &shop_id, body.amount, Utc::now())?;

    Ok(Json(SessionResponse::from(&session)))
}

/// Get a session by ID.
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session_id = parse_session_id(&session_id)?;

    let session = state
        .store
        .get_session(&session_id)?
        .ok_or_else(|| ApiError::NotFound(format!("session {session_id}")))?;

    Ok(Json(SessionResponse::from(&session)))
}

/// Session approval request.
#[derive(Debug, Deserialize)]
pub struct ApproveSessionRequest {
    /// The customer's approval signature.
    pub signature: String,
}

/// Customer approves a pending session.
pub async fn approve_session(
    State(state): State<Arc<AppState>>,
    auth: AuthCustomer,
    Path(session_id): Path<String>,
    Json(body): Json<ApproveSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session_id = parse_session_id(&session_id)?;

    let session =
        state
            .store
            .approve_session(&session_id, &auth.address, body.signature, Utc::now())?;

    tracing::info!(
        session_id = %session.id,
        customer = %auth.address,
        "redemption session approved"
    );

    Ok(Json(SessionResponse::from(&session)))
}

/// Customer rejects a pending session.
pub async fn reject_session(
    State(state): State<Arc<AppState>>,
    auth: AuthCustomer,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session_id = parse_session_id(&session_id)?;

    let session = state
        .store
        .reject_session(&session_id, &auth.address, Utc::now())?;

    tracing::info!(
        session_id = %session.id,
        customer = %auth.address,
        "redemption session rejected"
    );

    Ok(Json(SessionResponse::from(&session)))
}

/// Session redemption request (shop-initiated).
#[derive(Debug, Deserialize)]
pub struct UseSessionRequest {
    /// The shop redeeming the session; must be the one that opened it.
    pub shop_id: String,
}

/// Session redemption response.
#[derive(Debug, Serialize)]
pub struct UseSessionResponse {
    /// The session, now used.
    pub session: SessionResponse,
    /// The debited amount.
    pub debited: i64,
    /// Earned balance after the debit.
    pub earned_after: i64,
}

/// Shop redeems an approved session, debiting the ledger.
pub async fn use_session(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(session_id): Path<String>,
    Json(body): Json<UseSessionRequest>,
) -> Result<Json<UseSessionResponse>, ApiError> {
    let session_id = parse_session_id(&session_id)?;
    let shop_id: ShopId = body
        .shop_id
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid shop id".into()))?;

    let outcome = state.store.use_session(&session_id, &shop_id, Utc::now())?;

    Ok(Json(UseSessionResponse {
        session: SessionResponse::from(&outcome.session),
        debited: outcome.debited,
        earned_after: outcome.earned_after,
    }))
}
