//! Core types and engine rules for the RCN loyalty ledger.
//!
//! This crate provides the domain model and the pure business rules of the
//! platform:
//!
//! - **Identifiers**: `Address`, `ShopId`, `SessionId`, `PromoId`,
//!   `TransactionId`
//! - **Customers**: `Customer`, `Balances`, `Tier`
//! - **Provenance**: `SourceEntry`, `SourceKind`, home-shop resolution
//! - **Earning rules**: `CapacityGuard`, repair rewards, referral bonuses
//! - **Redemption**: `verify_redemption`, `RedemptionSession`
//! - **Promos**: `PromoCode`, `PromoUse`
//! - **Audit trail**: `Transaction`, `TxMetadata`
//!
//! # RCN Unit
//!
//! **Amounts are `i64` whole RCN tokens.** The observed rules never split a
//! token (caps of 50/500, bonuses of 25/10, a floored 20% cross-shop cap),
//! and integer arithmetic reproduces the floor semantics without
//! floating-point drift.
//!
//! Everything here is pure: no I/O, no clocks. Callers pass `now` in, which
//! keeps the date-rollover and expiry rules directly testable.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod capacity;
pub mod customer;
pub mod error;
pub mod ids;
pub mod promo;
pub mod referral;
pub mod repair;
pub mod session;
pub mod shop;
pub mod source;
pub mod tier;
pub mod transaction;
pub mod verify;

pub use capacity::{CapacityGuard, EarningCaps, DAILY_EARN_CAP, MONTHLY_EARN_CAP};
pub use customer::{Balances, Customer};
pub use error::{EngineError, Result};
pub use ids::{Address, IdError, PromoId, SessionId, ShopId, TransactionId};
pub use promo::{BonusKind, PromoCode, PromoUse};
pub use referral::{ReferralReward, REFEREE_BONUS, REFERRER_BONUS};
pub use repair::reward_for_repair;
pub use session::{
    RedemptionSession, SessionStatus, DEFAULT_SESSION_TTL_SECONDS,
};
pub use shop::Shop;
pub use source::{home_shop, SourceEntry, SourceKind};
pub use tier::{Tier, GOLD_THRESHOLD, SILVER_THRESHOLD};
pub use transaction::{Transaction, TxKind, TxMetadata, TxStatus};
pub use verify::{
    max_redeemable, verify_redemption, RedemptionCheck, CROSS_SHOP_REDEMPTION_PERCENT,
};
