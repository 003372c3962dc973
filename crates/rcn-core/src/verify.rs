//! The redemption verifier decision function.
//!
//! Pure: operates on a snapshot (shop record, earned balance, home shop) and
//! produces a decision. The store re-runs it at session-use time because
//! balances can change between approval and use.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ids::ShopId;
use crate::shop::Shop;

/// Share of earned balance redeemable away from the home shop, in percent.
pub const CROSS_SHOP_REDEMPTION_PERCENT: i64 = 20;

/// Maximum redeemable amount for an earned balance at a shop.
///
/// 100% at the home shop; elsewhere the cross-shop share, floored by integer
/// division. A customer with no home shop gets the cross-shop cap
/// everywhere: gifted and market tokens never qualify for 100% redemption.
#[must_use]
pub const fn max_redeemable(earned_balance: i64, is_home_shop: bool) -> i64 {
    if is_home_shop {
        earned_balance
    } else {
        earned_balance * CROSS_SHOP_REDEMPTION_PERCENT / 100
    }
}

/// Outcome of a redemption verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionCheck {
    /// Whether the requested amount can be redeemed at this shop right now.
    pub can_redeem: bool,

    /// The customer's earned balance (redeemable credits minus debits).
    pub earned_balance: i64,

    /// The most this shop may redeem for this customer right now.
    pub max_redeemable: i64,

    /// Whether this shop is the customer's home shop.
    pub is_home_shop: bool,

    /// Human-readable explanation of the decision.
    pub message: String,
}

/// Verify a redemption request against a snapshot of the customer's
/// standing.
///
/// The caps are computed from *earned* balance only — gifted or
/// market-purchased tokens never widen them.
///
/// # Errors
///
/// Returns `EngineError::Validation` if the shop is inactive/unverified or
/// the requested amount is not positive. An amount over the cap is not an
/// error: the decision comes back with `can_redeem = false`.
pub fn verify_redemption(
    shop: &Shop,
    home_shop: Option<&ShopId>,
    earned_balance: i64,
    requested: i64,
) -> Result<RedemptionCheck> {
    shop.ensure_operational()?;

    if requested <= 0 {
        return Err(crate::error::EngineError::Validation(format!(
            "redemption amount must be positive, got {requested}"
        )));
    }

    let is_home_shop = home_shop == Some(&shop.id);
    let max = max_redeemable(earned_balance, is_home_shop);
    let can_redeem = requested <= max;

    let message = if can_redeem {
        if is_home_shop {
            format!("{requested} RCN redeemable at home shop")
        } else {
            format!(
                "{requested} RCN redeemable cross-shop ({CROSS_SHOP_REDEMPTION_PERCENT}% cap)"
            )
        }
    } else if is_home_shop {
        format!("requested {requested} RCN exceeds earned balance {earned_balance}")
    } else {
        format!(
            "requested {requested} RCN exceeds cross-shop limit {max} ({CROSS_SHOP_REDEMPTION_PERCENT}% of {earned_balance} earned)"
        )
    };

    Ok(RedemptionCheck {
        can_redeem,
        earned_balance,
        max_redeemable: max,
        is_home_shop,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Address;
    use chrono::Utc;

    fn shop() -> Shop {
        let wallet = Address::new("0x00000000000000000000000000000000000000ee").unwrap();
        let mut s = Shop::new("Main Street Repair".into(), wallet, Utc::now());
        s.verified = true;
        s
    }

    #[test]
    fn home_shop_gets_full_balance() {
        assert_eq!(max_redeemable(100, true), 100);
        assert_eq!(max_redeemable(0, true), 0);
    }

    #[test]
    fn cross_shop_cap_floors() {
        assert_eq!(max_redeemable(100, false), 20);
        assert_eq!(max_redeemable(55, false), 11);
        assert_eq!(max_redeemable(53, false), 10);
        assert_eq!(max_redeemable(4, false), 0);
        assert_eq!(max_redeemable(0, false), 0);
    }

    #[test]
    fn verify_at_home_shop() {
        let s = shop();
        let check = verify_redemption(&s, Some(&s.id), 100, 100).unwrap();
        assert!(check.can_redeem);
        assert!(check.is_home_shop);
        assert_eq!(check.max_redeemable, 100);
    }

    #[test]
    fn verify_cross_shop_boundary() {
        let s = shop();
        let other_home = ShopId::generate();

        let approved = verify_redemption(&s, Some(&other_home), 100, 20).unwrap();
        assert!(approved.can_redeem);
        assert_eq!(approved.max_redeemable, 20);

        let denied = verify_redemption(&s, Some(&other_home), 100, 21).unwrap();
        assert!(!denied.can_redeem);
    }

    #[test]
    fn no_home_shop_means_cross_shop_everywhere() {
        let s = shop();
        let check = verify_redemption(&s, None, 100, 100).unwrap();
        assert!(!check.is_home_shop);
        assert_eq!(check.max_redeemable, 20);
        assert!(!check.can_redeem);
    }

    #[test]
    fn inactive_or_unverified_shop_rejected() {
        let mut s = shop();
        s.active = false;
        assert!(verify_redemption(&s, None, 100, 10).is_err());

        let mut s = shop();
        s.verified = false;
        assert!(verify_redemption(&s, None, 100, 10).is_err());
    }

    #[test]
    fn non_positive_request_rejected() {
        let s = shop();
        assert!(verify_redemption(&s, Some(&s.id), 100, 0).is_err());
        assert!(verify_redemption(&s, Some(&s.id), 100, -5).is_err());
    }
}
