//! Request and outcome types for the guarded ledger operations.
//!
//! Every compound operation takes a request carrying the caller-supplied
//! transaction id (the idempotency key) and returns an outcome that says
//! what was credited. A replayed request comes back with
//! `already_recorded = true` and the originally credited amounts — never a
//! second credit.

use serde::Serialize;

use rcn_core::{Address, RedemptionSession, ReferralReward, ShopId, Tier, TransactionId};

/// A repair-completion credit request.
#[derive(Debug, Clone)]
pub struct RepairCredit {
    /// The earning customer.
    pub customer: Address,

    /// The shop where the repair happened.
    pub shop_id: ShopId,

    /// Repair value in USD cents; determines the base reward.
    pub repair_amount_cents: i64,

    /// Idempotency key for this credit event.
    pub transaction_id: TransactionId,
}

/// Outcome of a repair credit.
#[derive(Debug, Clone, Serialize)]
pub struct RepairOutcome {
    /// Base RCN reward from the repair value.
    pub base_reward: i64,

    /// Tier bonus credited on top, from the tier held before the credit.
    pub tier_bonus: i64,

    /// Tier before the credit.
    pub old_tier: Tier,

    /// Tier after the credit.
    pub new_tier: Tier,

    /// `base_reward + tier_bonus`.
    pub total_credited: i64,

    /// True when the transaction id had already been recorded.
    pub already_recorded: bool,
}

/// An inbound gift transfer.
#[derive(Debug, Clone)]
pub struct GiftCredit {
    /// Receiving customer.
    pub to: Address,

    /// Sending wallet, when known.
    pub from: Option<Address>,

    /// Amount in RCN.
    pub amount: i64,

    /// Idempotency key.
    pub transaction_id: TransactionId,
}

/// A market purchase credit.
#[derive(Debug, Clone)]
pub struct MarketCredit {
    /// Purchasing customer.
    pub customer: Address,

    /// Amount in RCN.
    pub amount: i64,

    /// Idempotency key.
    pub transaction_id: TransactionId,
}

/// Outcome of a gift or market credit.
#[derive(Debug, Clone, Serialize)]
pub struct CreditOutcome {
    /// The credited amount.
    pub amount: i64,

    /// True when the transaction id had already been recorded.
    pub already_recorded: bool,
}

/// A referral completion: both sides credited or neither.
#[derive(Debug, Clone)]
pub struct ReferralCompletion {
    /// The referring customer.
    pub referrer: Address,

    /// The newly referred customer.
    pub referee: Address,

    /// Idempotency key for the completion.
    pub transaction_id: TransactionId,
}

/// Outcome of a referral completion.
#[derive(Debug, Clone, Serialize)]
pub struct ReferralOutcome {
    /// The credited split.
    pub reward: ReferralReward,

    /// True when the transaction id had already been recorded.
    pub already_recorded: bool,
}

/// A promo code application.
#[derive(Debug, Clone)]
pub struct PromoApplication {
    /// The shop whose code is being applied.
    pub shop_id: ShopId,

    /// The human-facing code.
    pub code: String,

    /// The customer applying it.
    pub customer: Address,

    /// The base reward the bonus is computed on.
    pub base_reward: i64,

    /// Idempotency key.
    pub transaction_id: TransactionId,
}

/// Outcome of a promo application.
#[derive(Debug, Clone, Serialize)]
pub struct PromoOutcome {
    /// The bonus credited.
    pub bonus: i64,

    /// `base_reward + bonus`.
    pub total_reward: i64,

    /// The code's use counter after this application.
    pub times_used: u32,

    /// True when the transaction id had already been recorded.
    pub already_recorded: bool,
}

/// Outcome of redeeming an approved session.
#[derive(Debug, Clone, Serialize)]
pub struct RedemptionOutcome {
    /// The session, now `used`.
    pub session: RedemptionSession,

    /// The debited amount.
    pub debited: i64,

    /// Earned balance after the debit.
    pub earned_after: i64,
}
