//! Referral completion bonuses.

use serde::{Deserialize, Serialize};

/// RCN credited to the referrer when a referral completes.
pub const REFERRER_BONUS: i64 = 25;

/// RCN credited to the referee when a referral completes.
pub const REFEREE_BONUS: i64 = 10;

/// The two sides of a completed referral.
///
/// Both credits are capacity-guarded and committed as one unit: if either
/// fails, the referral is not marked completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralReward {
    /// Credit for the referring customer.
    pub referrer_tokens: i64,

    /// Credit for the referred customer.
    pub referee_tokens: i64,
}

impl Default for ReferralReward {
    fn default() -> Self {
        Self {
            referrer_tokens: REFERRER_BONUS,
            referee_tokens: REFEREE_BONUS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reward_split() {
        let reward = ReferralReward::default();
        assert_eq!(reward.referrer_tokens, 25);
        assert_eq!(reward.referee_tokens, 10);
    }
}
