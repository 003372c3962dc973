//! Referral completion handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use rcn_core::{Address, TransactionId};
use rcn_store::{ReferralCompletion, Store};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::handlers::earnings::forward_mint;
use crate::state::AppState;

/// Referral completion request.
#[derive(Debug, Deserialize)]
pub struct ReferralRequest {
    /// The referring customer.
    pub referrer: String,
    /// The newly referred customer.
    pub referee: String,
    /// Caller-supplied idempotency key (ULID); generated when absent.
    pub transaction_id: Option<String>,
}

/// Referral completion response.
#[derive(Debug, Serialize)]
pub struct ReferralResponse {
    /// RCN credited to the referrer.
    pub referrer_tokens: i64,
    /// RCN credited to the referee.
    pub referee_tokens: i64,
    /// The idempotency key used.
    pub transaction_id: String,
    /// Whether this completion had already been recorded.
    pub already_recorded: bool,
}

/// Complete a referral, crediting both sides atomically.
pub async fn complete_referral(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<ReferralRequest>,
) -> Result<Json<ReferralResponse>, ApiError> {
    let referrer: Address = body
        .referrer
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid referrer address".into()))?;
    let referee: Address = body
        .referee
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid referee address".into()))?;
    let transaction_id = match body.transaction_id {
        Some(ref s) => s
            .parse::<TransactionId>()
            .map_err(|_| ApiError::BadRequest("invalid transaction id".into()))?,
        None => TransactionId::generate(),
    };

    let outcome = state.store.complete_referral(
        &ReferralCompletion {
            referrer: referrer.clone(),
            referee: referee.clone(),
            transaction_id,
        },
        Utc::now(),
    )?;

    tracing::info!(
        referrer = %referrer,
        referee = %referee,
        already_recorded = outcome.already_recorded,
        "referral completed"
    );

    if !outcome.already_recorded {
        forward_mint(
            &state,
            &referrer,
            outcome.reward.referrer_tokens,
            Some(&transaction_id),
        )
        .await;
        forward_mint(&state, &referee, outcome.reward.referee_tokens, None).await;
    }

    Ok(Json(ReferralResponse {
        referrer_tokens: outcome.reward.referrer_tokens,
        referee_tokens: outcome.reward.referee_tokens,
        transaction_id: transaction_id.to_string(),
        already_recorded: outcome.already_recorded,
    }))
}
