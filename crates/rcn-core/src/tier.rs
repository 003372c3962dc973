//! Customer tier calculation.

use serde::{Deserialize, Serialize};

/// Lifetime earnings required for Silver.
pub const SILVER_THRESHOLD: i64 = 200;

/// Lifetime earnings required for Gold.
pub const GOLD_THRESHOLD: i64 = 1000;

/// A customer loyalty tier, derived from lifetime earnings.
///
/// The tier is a pure projection of `lifetime_earnings` and must be
/// recomputed every time lifetime earnings change; it is cached on the
/// customer record but never hand-edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Lifetime earnings in `[0, 200)`.
    Bronze,
    /// Lifetime earnings in `[200, 1000)`.
    Silver,
    /// Lifetime earnings of 1000 or more.
    Gold,
}

impl Tier {
    /// Compute the tier for a lifetime earnings total.
    #[must_use]
    pub const fn for_lifetime_earnings(lifetime: i64) -> Self {
        if lifetime >= GOLD_THRESHOLD {
            Self::Gold
        } else if lifetime >= SILVER_THRESHOLD {
            Self::Silver
        } else {
            Self::Bronze
        }
    }

    /// The extra RCN credited per completed repair at this tier.
    #[must_use]
    pub const fn repair_bonus(&self) -> i64 {
        match self {
            Self::Bronze => 10,
            Self::Silver => 20,
            Self::Gold => 30,
        }
    }

    /// Get the tier name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries() {
        assert_eq!(Tier::for_lifetime_earnings(0), Tier::Bronze);
        assert_eq!(Tier::for_lifetime_earnings(199), Tier::Bronze);
        assert_eq!(Tier::for_lifetime_earnings(200), Tier::Silver);
        assert_eq!(Tier::for_lifetime_earnings(999), Tier::Silver);
        assert_eq!(Tier::for_lifetime_earnings(1000), Tier::Gold);
        assert_eq!(Tier::for_lifetime_earnings(50_000), Tier::Gold);
    }

    #[test]
    fn repair_bonus_per_tier() {
        assert_eq!(Tier::Bronze.repair_bonus(), 10);
        assert_eq!(Tier::Silver.repair_bonus(), 20);
        assert_eq!(Tier::Gold.repair_bonus(), 30);
    }

    #[test]
    fn tiers_order() {
        assert!(Tier::Bronze < Tier::Silver);
        assert!(Tier::Silver < Tier::Gold);
    }
}
