//! The append-only transaction audit trail.
//!
//! Every mint (credit) and redeem (debit) produces a transaction row. The
//! trail is authoritative: balances can be reconstructed from it together
//! with the source entries. Metadata is a tagged variant per event kind, so
//! nothing about the originating event is lost to a free-form blob.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{Address, SessionId, ShopId, TransactionId};
use crate::tier::Tier;

/// Direction of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    /// Tokens credited to a customer.
    Mint,

    /// Tokens debited by a redemption.
    Redeem,
}

/// Settlement status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Submitted to the settlement layer, awaiting confirmation.
    Pending,

    /// Settled.
    Confirmed,

    /// Settlement failed; the amount does not count toward balances.
    Failed,
}

/// Typed context for a transaction, one variant per event kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TxMetadata {
    /// A completed repair earning.
    Repair {
        /// Repair value in USD cents.
        repair_amount_cents: i64,
        /// Tier before the credit.
        old_tier: Tier,
        /// Tier after the credit.
        new_tier: Tier,
    },

    /// A tier bonus issued alongside a repair.
    TierBonus {
        /// The tier that granted the bonus.
        tier: Tier,
    },

    /// One side of a referral completion.
    Referral {
        /// The referring customer.
        referrer: Address,
        /// The referred customer.
        referee: Address,
        /// RCN credited to the referrer.
        referrer_tokens: i64,
        /// RCN credited to the referee.
        referee_tokens: i64,
    },

    /// A promo code bonus.
    Promo {
        /// The code that was applied.
        code: String,
        /// Base reward the bonus was computed on.
        base_reward: i64,
        /// The bonus credited.
        bonus_amount: i64,
    },

    /// An inbound transfer from outside the earning flow.
    Gift {
        /// Sending wallet, when known.
        from: Option<Address>,
    },

    /// A market purchase.
    MarketPurchase,

    /// A redemption debit.
    Redemption {
        /// The approval session that authorized the debit.
        session_id: SessionId,
    },
}

/// One row of the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID (ULID for time-ordering).
    pub id: TransactionId,

    /// Credit or debit.
    pub kind: TxKind,

    /// The affected customer.
    pub customer: Address,

    /// The shop involved, if any.
    pub shop_id: Option<ShopId>,

    /// Amount in RCN. Always positive; `kind` carries the direction.
    pub amount: i64,

    /// Settlement status.
    pub status: TxStatus,

    /// Settlement-layer hash, once known.
    pub settlement_hash: Option<String>,

    /// Typed event context.
    pub metadata: TxMetadata,

    /// When the transaction was recorded.
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Create a mint (credit) transaction.
    #[must_use]
    pub fn mint(
        id: TransactionId,
        customer: Address,
        shop_id: Option<ShopId>,
        amount: i64,
        metadata: TxMetadata,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind: TxKind::Mint,
            customer,
            shop_id,
            amount,
            status: TxStatus::Confirmed,
            settlement_hash: None,
            metadata,
            timestamp: now,
        }
    }

    /// Create a redeem (debit) transaction.
    #[must_use]
    pub fn redeem(
        id: TransactionId,
        customer: Address,
        shop_id: ShopId,
        amount: i64,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind: TxKind::Redeem,
            customer,
            shop_id: Some(shop_id),
            amount,
            status: TxStatus::Confirmed,
            settlement_hash: None,
            metadata: TxMetadata::Redemption { session_id },
            timestamp: now,
        }
    }

    /// Attach the settlement-layer hash.
    #[must_use]
    pub fn with_settlement_hash(mut self, hash: Option<String>) -> Self {
        self.settlement_hash = hash;
        self
    }

    /// Whether this row reduces balances when summing debits.
    #[must_use]
    pub const fn is_debit(&self) -> bool {
        matches!(self.kind, TxKind::Redeem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> Address {
        Address::new("0x1100000000000000000000000000000000000011").unwrap()
    }

    #[test]
    fn redeem_carries_session_metadata() {
        let session_id = SessionId::generate();
        let tx = Transaction::redeem(
            TransactionId::generate(),
            addr(),
            ShopId::generate(),
            20,
            session_id,
            Utc::now(),
        );
        assert!(tx.is_debit());
        assert_eq!(tx.metadata, TxMetadata::Redemption { session_id });
    }

    #[test]
    fn metadata_serializes_tagged() {
        let meta = TxMetadata::Repair {
            repair_amount_cents: 12_500,
            old_tier: Tier::Bronze,
            new_tier: Tier::Silver,
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["kind"], "repair");
        assert_eq!(json["repair_amount_cents"], 12_500);
        assert_eq!(json["new_tier"], "silver");
    }

    #[test]
    fn mint_is_confirmed_without_settlement_hash() {
        let tx = Transaction::mint(
            TransactionId::generate(),
            addr(),
            None,
            10,
            TxMetadata::MarketPurchase,
            Utc::now(),
        );
        assert_eq!(tx.status, TxStatus::Confirmed);
        assert!(tx.settlement_hash.is_none());
        assert!(!tx.is_debit());
    }
}
