//! Customer records and balance projections.
//!
//! The provenance ledger owns balance truth; the fields cached here
//! (`lifetime_earnings`, `tier`, `home_shop_id`) are derived projections,
//! recomputed inside the same atomic write that changes the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{Address, ShopId};
use crate::tier::Tier;

/// A registered customer.
///
/// Created on first registration or first credit, soft-deactivated only —
/// never destroyed. The rolling daily/monthly counters reset lazily against
/// `last_earned_at` (see the capacity guard); nothing outside the guarded
/// credit path may write them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Wallet address (unique key).
    pub address: Address,

    /// Monotonic sum of every credited amount, including gift and market
    /// tokens. Drives the tier; never reduced by redemptions.
    pub lifetime_earnings: i64,

    /// Cached tier projection of `lifetime_earnings`.
    pub tier: Tier,

    /// RCN earned since the start of the current UTC day.
    pub daily_earnings: i64,

    /// RCN earned since the start of the current UTC month.
    pub monthly_earnings: i64,

    /// Anchor for the rolling counters: when the customer last earned.
    pub last_earned_at: Option<DateTime<Utc>>,

    /// Cached home shop projection; `None` until the customer has redeemable
    /// shop-attributed earnings.
    pub home_shop_id: Option<ShopId>,

    /// Soft-deactivation flag.
    pub is_active: bool,

    /// When the customer was created.
    pub created_at: DateTime<Utc>,

    /// When the customer was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Create a new active customer with zero balances.
    #[must_use]
    pub fn new(address: Address, now: DateTime<Utc>) -> Self {
        Self {
            address,
            lifetime_earnings: 0,
            tier: Tier::Bronze,
            daily_earnings: 0,
            monthly_earnings: 0,
            last_earned_at: None,
            home_shop_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fold a credited amount into the lifetime total and recompute the tier.
    pub fn apply_credit(&mut self, amount: i64, now: DateTime<Utc>) {
        self.lifetime_earnings += amount;
        self.tier = Tier::for_lifetime_earnings(self.lifetime_earnings);
        self.updated_at = now;
    }
}

/// Balance breakdown derived from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    /// Monotonic sum of all credits.
    pub lifetime_earnings: i64,

    /// All credits minus redemption debits.
    pub total: i64,

    /// Redeemable, shop/referral/promo-attributed credits minus redemption
    /// debits. Never negative.
    pub earned: i64,

    /// `total - earned`: gifted and market-purchased tokens.
    pub market: i64,
}
