//! `RocksDB` storage layer for the RCN loyalty ledger.
//!
//! This crate persists customers, shops, provenance entries, redemption
//! sessions, promo codes, and the transaction audit trail using `RocksDB`
//! column families, and implements the guarded compound operations that
//! hold the ledger invariants.
//!
//! # Architecture
//!
//! Balance truth lives in the ledger (`sources` plus `redeem` transactions);
//! the customer record caches derived projections. Every balance-mutating
//! operation — credit, debit, promo use, session transition — acquires a
//! per-customer advisory lock, re-reads state, applies the engine rules from
//! `rcn-core`, and commits a single `WriteBatch`. No operation spans two
//! batches, so partial credit or debit is unrepresentable.
//!
//! # Example
//!
//! ```no_run
//! use rcn_store::{RocksStore, Store};
//! use rcn_core::{Address, Customer};
//! use chrono::Utc;
//!
//! let store = RocksStore::open("/tmp/rcn-db").unwrap();
//!
//! let address = Address::new("0x1111111111111111111111111111111111111111").unwrap();
//! let customer = Customer::new(address.clone(), Utc::now());
//! store.put_customer(&customer).unwrap();
//!
//! let balances = store.balances(&address).unwrap();
//! assert_eq!(balances.earned, 0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod ops;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use ops::{
    CreditOutcome, GiftCredit, MarketCredit, PromoApplication, PromoOutcome, RedemptionOutcome,
    ReferralCompletion, ReferralOutcome, RepairCredit, RepairOutcome,
};
pub use rocks::RocksStore;

use chrono::{DateTime, Utc};

use rcn_core::{
    Address, Balances, Customer, PromoCode, PromoId, RedemptionCheck, RedemptionSession,
    SessionId, Shop, ShopId, SourceEntry, Transaction, TransactionId,
};

/// The storage trait defining all ledger operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (e.g., `RocksDB`, in-memory for testing). Time-sensitive
/// operations take `now` explicitly so rollover and expiry rules are
/// testable without a clock.
pub trait Store: Send + Sync {
    // =========================================================================
    // Customer & Shop Records
    // =========================================================================

    /// Insert or update a customer record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_customer(&self, customer: &Customer) -> Result<()>;

    /// Get a customer by wallet address.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_customer(&self, address: &Address) -> Result<Option<Customer>>;

    /// Insert or update a shop record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_shop(&self, shop: &Shop) -> Result<()>;

    /// Get a shop by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_shop(&self, shop_id: &ShopId) -> Result<Option<Shop>>;

    // =========================================================================
    // Ledger Reads
    // =========================================================================

    /// List a customer's provenance entries in commit order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_sources(&self, address: &Address) -> Result<Vec<SourceEntry>>;

    /// List a customer's transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions(
        &self,
        address: &Address,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>>;

    /// Derive the customer's balance breakdown from the ledger.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotFound` if the customer doesn't exist.
    fn balances(&self, address: &Address) -> Result<Balances>;

    /// Resolve the customer's home shop from the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn home_shop(&self, address: &Address) -> Result<Option<ShopId>>;

    // =========================================================================
    // Guarded Credits
    // =========================================================================

    /// Credit a completed repair: base reward plus tier bonus, both
    /// capacity-guarded, committed atomically with the audit transaction.
    ///
    /// Idempotent on the request's transaction id.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if customer or shop is missing.
    /// - `EngineError::Validation` if the shop is inactive/unverified or the
    ///   repair value is below the earning minimum.
    /// - `EngineError::LimitExceeded` if a cap would be exceeded.
    fn record_repair(&self, credit: &RepairCredit, now: DateTime<Utc>) -> Result<RepairOutcome>;

    /// Record an inbound gift transfer (non-redeemable, bypasses the caps).
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotFound` for a missing customer and
    /// `EngineError::Validation` for a non-positive amount.
    fn record_gift(&self, credit: &GiftCredit, now: DateTime<Utc>) -> Result<CreditOutcome>;

    /// Record a market purchase (non-redeemable, bypasses the caps).
    ///
    /// # Errors
    ///
    /// Same as [`Self::record_gift`].
    fn record_market_purchase(
        &self,
        credit: &MarketCredit,
        now: DateTime<Utc>,
    ) -> Result<CreditOutcome>;

    /// Complete a referral: credit both sides or neither.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if either customer is missing.
    /// - `EngineError::Validation` if referrer and referee are the same.
    /// - `EngineError::LimitExceeded` if either side's caps are exhausted.
    fn complete_referral(
        &self,
        completion: &ReferralCompletion,
        now: DateTime<Utc>,
    ) -> Result<ReferralOutcome>;

    // =========================================================================
    // Promo Codes
    // =========================================================================

    /// Insert a new promo code.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Conflict` if the shop already has a code with
    /// the same (case-insensitive) name.
    fn create_promo(&self, promo: &PromoCode) -> Result<()>;

    /// Look up a promo code by shop and code string.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_promo(&self, shop_id: &ShopId, code: &str) -> Result<Option<PromoCode>>;

    /// Count one customer's uses of a promo code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn promo_use_count(&self, promo_id: &PromoId, customer: &Address) -> Result<u32>;

    /// Apply a promo code: validate against a fresh snapshot, insert the use
    /// row, bump the code counters, and credit the bonus — all in one write.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if code, shop, or customer is missing.
    /// - `EngineError::Validation` if the code is inactive/outside window.
    /// - `EngineError::LimitExceeded` / `EngineError::Conflict` for usage
    ///   limits, or `LimitExceeded` if the bonus overruns the earning caps.
    fn apply_promo(&self, application: &PromoApplication, now: DateTime<Utc>)
        -> Result<PromoOutcome>;

    // =========================================================================
    // Redemption Verification & Sessions
    // =========================================================================

    /// Run the redemption verifier against current ledger state.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if customer or shop is missing.
    /// - `EngineError::Validation` if the shop is inactive/unverified or the
    ///   amount is not positive.
    fn verify_redemption(
        &self,
        customer: &Address,
        shop_id: &ShopId,
        requested: i64,
    ) -> Result<RedemptionCheck>;

    /// Open a pending redemption session for an amount the verifier
    /// approved.
    ///
    /// # Errors
    ///
    /// - Verifier errors as in [`Self::verify_redemption`].
    /// - `EngineError::LimitExceeded` if the verifier denies the amount.
    /// - `EngineError::Conflict` if a live pending session already exists
    ///   for the (customer, shop) pair.
    fn create_session(
        &self,
        customer: &Address,
        shop_id: &ShopId,
        requested: i64,
        now: DateTime<Utc>,
    ) -> Result<RedemptionSession>;

    /// Get a session by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_session(&self, session_id: &SessionId) -> Result<Option<RedemptionSession>>;

    /// Customer approves a pending session.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if the session is missing.
    /// - `EngineError::Unauthorized` if `acting` is not the session owner.
    /// - `EngineError::Expired` if the session has lapsed (the row is swept
    ///   to `expired` as a side effect).
    /// - `EngineError::Conflict` for any other non-pending state.
    fn approve_session(
        &self,
        session_id: &SessionId,
        acting: &Address,
        signature: String,
        now: DateTime<Utc>,
    ) -> Result<RedemptionSession>;

    /// Customer rejects a pending session.
    ///
    /// # Errors
    ///
    /// Same state and ownership requirements as [`Self::approve_session`].
    fn reject_session(
        &self,
        session_id: &SessionId,
        acting: &Address,
        now: DateTime<Utc>,
    ) -> Result<RedemptionSession>;

    /// Shop redeems an approved session: the verifier re-check runs against
    /// current balances and the ledger debit commits atomically with the
    /// status flip.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if the session is missing.
    /// - `EngineError::Unauthorized` if `acting_shop` did not open it.
    /// - `EngineError::Conflict` unless the session is `approved`.
    /// - `EngineError::LimitExceeded` if the amount no longer fits the
    ///   re-checked cap.
    fn use_session(
        &self,
        session_id: &SessionId,
        acting_shop: &ShopId,
        now: DateTime<Utc>,
    ) -> Result<RedemptionOutcome>;

    /// Sweep pending sessions past their expiry to `expired`.
    ///
    /// Idempotent and safe to run concurrently from multiple instances.
    /// Returns how many sessions were expired by this call.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn expire_sessions(&self, now: DateTime<Utc>) -> Result<usize>;

    // =========================================================================
    // Settlement
    // =========================================================================

    /// Attach a settlement-layer hash to a recorded transaction.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotFound` if the transaction doesn't exist.
    fn attach_settlement_hash(&self, transaction_id: &TransactionId, hash: &str) -> Result<()>;
}
