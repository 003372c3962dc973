//! Shop promo codes and their usage rules.
//!
//! Validation is a pure function over a snapshot of the code row plus the
//! customer's prior use count; the compare-and-increment of the usage
//! counters happens transactionally in the store so `times_used` stays 1:1
//! with the use rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::ids::{Address, PromoId, ShopId};

/// How the bonus is computed from the base reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusKind {
    /// A flat RCN amount regardless of base reward.
    Fixed,

    /// A percentage of the base reward, optionally capped by `max_bonus`.
    Percentage,
}

/// A shop-issued promo code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoCode {
    /// Record identifier.
    pub id: PromoId,

    /// Human-facing code, unique per shop, stored uppercased.
    pub code: String,

    /// The issuing shop.
    pub shop_id: ShopId,

    /// Bonus computation mode.
    pub bonus_kind: BonusKind,

    /// Flat RCN for `Fixed`, whole percent for `Percentage`.
    pub bonus_value: i64,

    /// Ceiling for percentage bonuses; `None` means uncapped.
    pub max_bonus: Option<i64>,

    /// Start of the validity window.
    pub start_date: DateTime<Utc>,

    /// End of the validity window.
    pub end_date: DateTime<Utc>,

    /// Cap on total uses across all customers; `None` means unlimited.
    pub total_usage_limit: Option<u32>,

    /// Cap on uses per customer.
    pub per_customer_limit: u32,

    /// Monotonic use counter; updated only via `record_use`.
    pub times_used: u32,

    /// Monotonic sum of bonuses issued; updated only via `record_use`.
    pub total_bonus_issued: i64,

    /// Whether the shop has the code switched on.
    pub active: bool,

    /// When the code was created.
    pub created_at: DateTime<Utc>,

    /// When the code was last updated.
    pub updated_at: DateTime<Utc>,
}

impl PromoCode {
    /// Create a new active promo code.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        code: &str,
        shop_id: ShopId,
        bonus_kind: BonusKind,
        bonus_value: i64,
        max_bonus: Option<i64>,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        total_usage_limit: Option<u32>,
        per_customer_limit: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PromoId::generate(),
            code: code.trim().to_ascii_uppercase(),
            shop_id,
            bonus_kind,
            bonus_value,
            max_bonus,
            start_date,
            end_date,
            total_usage_limit,
            per_customer_limit,
            times_used: 0,
            total_bonus_issued: 0,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate the code against a customer's prior use count.
    ///
    /// # Errors
    ///
    /// - `EngineError::Validation` if the code is inactive or outside its
    ///   date window.
    /// - `EngineError::LimitExceeded` if the total usage limit is exhausted.
    /// - `EngineError::Conflict` if this customer has reached the
    ///   per-customer limit.
    pub fn validate(&self, customer_uses: u32, now: DateTime<Utc>) -> Result<()> {
        if !self.active {
            return Err(EngineError::Validation(format!(
                "promo code {} is not active",
                self.code
            )));
        }
        if now < self.start_date || now > self.end_date {
            return Err(EngineError::Validation(format!(
                "promo code {} is outside its validity window",
                self.code
            )));
        }
        if let Some(limit) = self.total_usage_limit {
            if self.times_used >= limit {
                return Err(EngineError::LimitExceeded {
                    limit: i64::from(limit),
                    requested: 1,
                    remaining: 0,
                });
            }
        }
        if customer_uses >= self.per_customer_limit {
            return Err(EngineError::Conflict(format!(
                "promo code {} already used {} of {} times by this customer",
                self.code, customer_uses, self.per_customer_limit
            )));
        }
        Ok(())
    }

    /// Compute the bonus for a base reward.
    ///
    /// Percentage bonuses floor by integer division and never exceed
    /// `max_bonus` when one is set.
    #[must_use]
    pub fn bonus_for(&self, base_reward: i64) -> i64 {
        match self.bonus_kind {
            BonusKind::Fixed => self.bonus_value,
            BonusKind::Percentage => {
                let raw = base_reward * self.bonus_value / 100;
                self.max_bonus.map_or(raw, |cap| raw.min(cap))
            }
        }
    }

    /// Fold one successful use into the monotonic counters.
    ///
    /// Must be written in the same transaction as the corresponding use row.
    pub fn record_use(&mut self, bonus: i64, now: DateTime<Utc>) {
        self.times_used += 1;
        self.total_bonus_issued += bonus;
        self.updated_at = now;
    }
}

/// One audited use of a promo code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoUse {
    /// The code that was used.
    pub promo_id: PromoId,

    /// The customer who used it.
    pub customer: Address,

    /// The shop the base reward came from.
    pub shop_id: ShopId,

    /// Base reward the bonus was computed on.
    pub base_reward: i64,

    /// The bonus credited.
    pub bonus_amount: i64,

    /// `base_reward + bonus_amount`.
    pub total_reward: i64,

    /// When the code was used.
    pub used_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap()
    }

    fn percentage_code() -> PromoCode {
        PromoCode::new(
            "summer50",
            ShopId::generate(),
            BonusKind::Percentage,
            50,
            Some(20),
            now() - Duration::days(1),
            now() + Duration::days(30),
            Some(100),
            1,
            now(),
        )
    }

    #[test]
    fn code_is_uppercased() {
        assert_eq!(percentage_code().code, "SUMMER50");
    }

    #[test]
    fn fixed_bonus_ignores_base() {
        let code = PromoCode::new(
            "FLAT5",
            ShopId::generate(),
            BonusKind::Fixed,
            5,
            None,
            now() - Duration::days(1),
            now() + Duration::days(1),
            None,
            3,
            now(),
        );
        assert_eq!(code.bonus_for(10), 5);
        assert_eq!(code.bonus_for(1000), 5);
    }

    #[test]
    fn percentage_bonus_floors_and_caps() {
        let code = percentage_code();
        // 50% of 25 = 12.5 -> 12
        assert_eq!(code.bonus_for(25), 12);
        // 50% of 100 = 50, capped at 20
        assert_eq!(code.bonus_for(100), 20);
    }

    #[test]
    fn uncapped_percentage() {
        let mut code = percentage_code();
        code.max_bonus = None;
        assert_eq!(code.bonus_for(100), 50);
    }

    #[test]
    fn validate_window() {
        let code = percentage_code();
        assert!(code.validate(0, now()).is_ok());
        assert!(matches!(
            code.validate(0, now() - Duration::days(2)),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            code.validate(0, now() + Duration::days(31)),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn validate_inactive() {
        let mut code = percentage_code();
        code.active = false;
        assert!(matches!(
            code.validate(0, now()),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn validate_total_usage_limit() {
        let mut code = percentage_code();
        code.times_used = 100;
        assert!(matches!(
            code.validate(0, now()),
            Err(EngineError::LimitExceeded { .. })
        ));
    }

    #[test]
    fn validate_per_customer_limit() {
        let code = percentage_code();
        assert!(code.validate(0, now()).is_ok());
        assert!(matches!(
            code.validate(1, now()),
            Err(EngineError::Conflict(_))
        ));
    }

    #[test]
    fn record_use_advances_counters() {
        let mut code = percentage_code();
        code.record_use(12, now());
        code.record_use(20, now());
        assert_eq!(code.times_used, 2);
        assert_eq!(code.total_bonus_issued, 32);
    }
}
