//! The provenance ledger's entry type and its derived aggregations.
//!
//! Every credited token carries a source entry tagging where it came from.
//! Entries are immutable once written and idempotent on their transaction
//! id. Redemption debits are *not* entries here — they are `redeem`
//! transactions — so the earned-balance derivation never double-counts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ids::{Address, ShopId, TransactionId};

/// How a credited token entered the customer's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Earned from a completed repair at a shop.
    ShopRepair,

    /// Referral completion bonus (referrer or referee side).
    ReferralBonus,

    /// Tier bonus granted on top of a repair reward.
    TierBonus,

    /// Shop promo code bonus.
    Promotion,

    /// Bought on the open market; never redeemable.
    MarketPurchase,

    /// Received by transfer from outside the earning flow; never redeemable.
    Gift,
}

impl SourceKind {
    /// Whether tokens from this source are redeemable at shops.
    #[must_use]
    pub const fn redeemable(&self) -> bool {
        !matches!(self, Self::MarketPurchase | Self::Gift)
    }

    /// Whether credits of this kind count against the earning caps.
    ///
    /// Gifts and market purchases are acquisitions, not earnings; they
    /// bypass the capacity guard.
    #[must_use]
    pub const fn counts_toward_caps(&self) -> bool {
        self.redeemable()
    }

    /// Get the source name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ShopRepair => "shop_repair",
            Self::ReferralBonus => "referral_bonus",
            Self::TierBonus => "tier_bonus",
            Self::Promotion => "promotion",
            Self::MarketPurchase => "market_purchase",
            Self::Gift => "gift",
        }
    }
}

/// One credited token batch with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    /// The credited customer.
    pub customer: Address,

    /// Where the tokens came from.
    pub kind: SourceKind,

    /// The shop attributed with the earning, if any. Always `None` for
    /// gifts and market purchases.
    pub shop_id: Option<ShopId>,

    /// Credited amount in RCN. Always positive.
    pub amount: i64,

    /// Snapshot of `kind.redeemable()` at write time.
    pub is_redeemable: bool,

    /// Idempotency key; one entry per credit event.
    pub transaction_id: TransactionId,

    /// When the credit happened.
    pub earned_at: DateTime<Utc>,
}

impl SourceEntry {
    /// Build an entry, deriving the redeemability flag from the kind.
    #[must_use]
    pub fn new(
        customer: Address,
        kind: SourceKind,
        shop_id: Option<ShopId>,
        amount: i64,
        transaction_id: TransactionId,
        earned_at: DateTime<Utc>,
    ) -> Self {
        let shop_id = if kind.redeemable() { shop_id } else { None };
        Self {
            customer,
            kind,
            shop_id,
            amount,
            is_redeemable: kind.redeemable(),
            transaction_id,
            earned_at,
        }
    }

    /// A repair earning attributed to a shop.
    #[must_use]
    pub fn repair(
        customer: Address,
        shop_id: ShopId,
        amount: i64,
        transaction_id: TransactionId,
        earned_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            customer,
            SourceKind::ShopRepair,
            Some(shop_id),
            amount,
            transaction_id,
            earned_at,
        )
    }

    /// A tier bonus attributed to the shop whose repair triggered it.
    #[must_use]
    pub fn tier_bonus(
        customer: Address,
        shop_id: ShopId,
        amount: i64,
        transaction_id: TransactionId,
        earned_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            customer,
            SourceKind::TierBonus,
            Some(shop_id),
            amount,
            transaction_id,
            earned_at,
        )
    }

    /// A referral bonus; not attributed to any shop.
    #[must_use]
    pub fn referral_bonus(
        customer: Address,
        amount: i64,
        transaction_id: TransactionId,
        earned_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            customer,
            SourceKind::ReferralBonus,
            None,
            amount,
            transaction_id,
            earned_at,
        )
    }

    /// A promo bonus attributed to the issuing shop.
    #[must_use]
    pub fn promotion(
        customer: Address,
        shop_id: ShopId,
        amount: i64,
        transaction_id: TransactionId,
        earned_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            customer,
            SourceKind::Promotion,
            Some(shop_id),
            amount,
            transaction_id,
            earned_at,
        )
    }

    /// A gifted transfer; non-redeemable, no shop.
    #[must_use]
    pub fn gift(
        customer: Address,
        amount: i64,
        transaction_id: TransactionId,
        earned_at: DateTime<Utc>,
    ) -> Self {
        Self::new(customer, SourceKind::Gift, None, amount, transaction_id, earned_at)
    }

    /// A market purchase; non-redeemable, no shop.
    #[must_use]
    pub fn market_purchase(
        customer: Address,
        amount: i64,
        transaction_id: TransactionId,
        earned_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            customer,
            SourceKind::MarketPurchase,
            None,
            amount,
            transaction_id,
            earned_at,
        )
    }
}

/// Sum of redeemable credits across entries (before debits).
#[must_use]
pub fn redeemable_credit_total(entries: &[SourceEntry]) -> i64 {
    entries
        .iter()
        .filter(|e| e.is_redeemable)
        .map(|e| e.amount)
        .sum()
}

/// Sum of all credits across entries.
#[must_use]
pub fn credit_total(entries: &[SourceEntry]) -> i64 {
    entries.iter().map(|e| e.amount).sum()
}

/// Resolve the customer's home shop from their ledger entries.
///
/// The home shop is the shop with the greatest sum of redeemable,
/// shop-attributed amounts. Gifts and market purchases carry no shop and can
/// never establish one. On a tie, the shop that *reached* the maximum first
/// wins: entries must be supplied in ledger (commit) order, and a later shop
/// only takes over by strictly exceeding the current leader.
#[must_use]
pub fn home_shop(entries: &[SourceEntry]) -> Option<ShopId> {
    let mut totals: HashMap<ShopId, i64> = HashMap::new();
    let mut leader: Option<(ShopId, i64)> = None;

    for entry in entries {
        let Some(shop_id) = entry.shop_id else {
            continue;
        };
        if !entry.is_redeemable {
            continue;
        }

        let total = totals.entry(shop_id).or_insert(0);
        *total += entry.amount;

        match &mut leader {
            None => leader = Some((shop_id, *total)),
            Some((leader_id, best)) if *leader_id == shop_id => *best = *total,
            Some((_, best)) if *total > *best => leader = Some((shop_id, *total)),
            Some(_) => {}
        }
    }

    leader.map(|(shop_id, _)| shop_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> Address {
        Address::new("0x00000000000000000000000000000000000000cc").unwrap()
    }

    fn entry(kind: SourceKind, shop: Option<ShopId>, amount: i64) -> SourceEntry {
        SourceEntry::new(
            addr(),
            kind,
            shop,
            amount,
            TransactionId::generate(),
            Utc::now(),
        )
    }

    #[test]
    fn gift_and_market_are_not_redeemable() {
        assert!(!SourceKind::Gift.redeemable());
        assert!(!SourceKind::MarketPurchase.redeemable());
        assert!(SourceKind::ShopRepair.redeemable());
        assert!(SourceKind::ReferralBonus.redeemable());
        assert!(SourceKind::TierBonus.redeemable());
        assert!(SourceKind::Promotion.redeemable());
    }

    #[test]
    fn gift_drops_shop_attribution() {
        let shop = ShopId::generate();
        let e = entry(SourceKind::Gift, Some(shop), 50);
        assert!(e.shop_id.is_none());
        assert!(!e.is_redeemable);
    }

    #[test]
    fn redeemable_total_excludes_gifts() {
        let shop = ShopId::generate();
        let entries = vec![
            entry(SourceKind::ShopRepair, Some(shop), 100),
            entry(SourceKind::Gift, None, 50),
            entry(SourceKind::MarketPurchase, None, 30),
        ];
        assert_eq!(redeemable_credit_total(&entries), 100);
        assert_eq!(credit_total(&entries), 180);
    }

    #[test]
    fn home_shop_is_largest_earner() {
        let a = ShopId::generate();
        let b = ShopId::generate();
        let entries = vec![
            entry(SourceKind::ShopRepair, Some(a), 25),
            entry(SourceKind::ShopRepair, Some(b), 40),
            entry(SourceKind::ShopRepair, Some(a), 30),
        ];
        assert_eq!(home_shop(&entries), Some(a));
    }

    #[test]
    fn home_shop_none_for_gift_only_customer() {
        let entries = vec![
            entry(SourceKind::Gift, None, 500),
            entry(SourceKind::MarketPurchase, None, 200),
        ];
        assert_eq!(home_shop(&entries), None);
        assert_eq!(home_shop(&[]), None);
    }

    #[test]
    fn home_shop_tie_keeps_earliest_leader() {
        let a = ShopId::generate();
        let b = ShopId::generate();
        // Shop A reaches 50 first; shop B matching it does not take over.
        let entries = vec![
            entry(SourceKind::ShopRepair, Some(a), 50),
            entry(SourceKind::ShopRepair, Some(b), 50),
        ];
        assert_eq!(home_shop(&entries), Some(a));

        // But strictly exceeding does.
        let entries = vec![
            entry(SourceKind::ShopRepair, Some(a), 50),
            entry(SourceKind::ShopRepair, Some(b), 51),
        ];
        assert_eq!(home_shop(&entries), Some(b));
    }

    #[test]
    fn referral_bonus_counts_toward_home_shop_only_when_shop_attributed() {
        // Referral bonuses are redeemable but carry no shop, so they raise
        // earned balance without establishing a home shop.
        let entries = vec![entry(SourceKind::ReferralBonus, None, 25)];
        assert_eq!(redeemable_credit_total(&entries), 25);
        assert_eq!(home_shop(&entries), None);
    }
}
