//! Repair reward rule.

use crate::error::{EngineError, Result};

/// Repair value (USD cents) required for the small reward.
pub const MINOR_REPAIR_THRESHOLD_CENTS: i64 = 5_000;

/// Repair value (USD cents) required for the large reward.
pub const MAJOR_REPAIR_THRESHOLD_CENTS: i64 = 10_000;

/// RCN earned for a repair of at least $50.
pub const MINOR_REPAIR_REWARD: i64 = 10;

/// RCN earned for a repair of at least $100.
pub const MAJOR_REPAIR_REWARD: i64 = 25;

/// Base RCN reward for a completed repair.
///
/// # Errors
///
/// Returns `EngineError::Validation` when the repair value is below the
/// minimum earning threshold or not positive.
pub fn reward_for_repair(repair_amount_cents: i64) -> Result<i64> {
    if repair_amount_cents >= MAJOR_REPAIR_THRESHOLD_CENTS {
        Ok(MAJOR_REPAIR_REWARD)
    } else if repair_amount_cents >= MINOR_REPAIR_THRESHOLD_CENTS {
        Ok(MINOR_REPAIR_REWARD)
    } else {
        Err(EngineError::Validation(format!(
            "repair amount {repair_amount_cents} cents is below the earning minimum"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_thresholds() {
        assert!(reward_for_repair(4_999).is_err());
        assert_eq!(reward_for_repair(5_000).unwrap(), 10);
        assert_eq!(reward_for_repair(9_999).unwrap(), 10);
        assert_eq!(reward_for_repair(10_000).unwrap(), 25);
        assert_eq!(reward_for_repair(250_000).unwrap(), 25);
    }

    #[test]
    fn zero_and_negative_rejected() {
        assert!(reward_for_repair(0).is_err());
        assert!(reward_for_repair(-100).is_err());
    }
}
