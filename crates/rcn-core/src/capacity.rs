//! Daily and monthly earning caps.
//!
//! The counters on the customer record reset lazily: no cron job zeroes them
//! at midnight. Instead, every read or write of the counters first applies
//! the rollover implied by `last_earned_at` versus the current time. The
//! store runs `check` and `record` inside the same atomic write as the
//! ledger entry they gate, so two concurrent credits cannot both pass a cap
//! they jointly violate.

use chrono::{DateTime, Datelike, Utc};

use crate::customer::Customer;
use crate::error::{EngineError, Result};

/// Default daily earning cap in RCN.
pub const DAILY_EARN_CAP: i64 = 50;

/// Default monthly earning cap in RCN.
pub const MONTHLY_EARN_CAP: i64 = 500;

/// Configurable earning caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EarningCaps {
    /// Maximum RCN earnable per UTC day.
    pub daily: i64,
    /// Maximum RCN earnable per UTC month.
    pub monthly: i64,
}

impl Default for EarningCaps {
    fn default() -> Self {
        Self {
            daily: DAILY_EARN_CAP,
            monthly: MONTHLY_EARN_CAP,
        }
    }
}

/// Enforces the earning caps for guarded credits.
#[derive(Debug, Clone, Copy)]
pub struct CapacityGuard {
    caps: EarningCaps,
}

impl CapacityGuard {
    /// Create a guard with the given caps.
    #[must_use]
    pub const fn new(caps: EarningCaps) -> Self {
        Self { caps }
    }

    /// The caps in force.
    #[must_use]
    pub const fn caps(&self) -> EarningCaps {
        self.caps
    }

    /// The customer's counters as of `now`, with lazy rollover applied.
    ///
    /// Returns `(daily, monthly)` without mutating the record.
    #[must_use]
    pub fn rolled_counters(&self, customer: &Customer, now: DateTime<Utc>) -> (i64, i64) {
        match customer.last_earned_at {
            None => (0, 0),
            Some(anchor) => {
                let daily = if anchor.date_naive() == now.date_naive() {
                    customer.daily_earnings
                } else {
                    0
                };
                let monthly =
                    if (anchor.year(), anchor.month()) == (now.year(), now.month()) {
                        customer.monthly_earnings
                    } else {
                        0
                    };
                (daily, monthly)
            }
        }
    }

    /// Check whether a proposed credit fits within both caps.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::LimitExceeded` naming the tighter cap when the
    /// amount does not fit, and `EngineError::Validation` for non-positive
    /// amounts.
    pub fn check(&self, customer: &Customer, amount: i64, now: DateTime<Utc>) -> Result<()> {
        if amount <= 0 {
            return Err(EngineError::Validation(format!(
                "credit amount must be positive, got {amount}"
            )));
        }

        let (daily, monthly) = self.rolled_counters(customer, now);

        let daily_remaining = self.caps.daily - daily;
        if daily_remaining <= 0 || amount > daily_remaining {
            return Err(EngineError::LimitExceeded {
                limit: self.caps.daily,
                requested: amount,
                remaining: daily_remaining.max(0),
            });
        }

        let monthly_remaining = self.caps.monthly - monthly;
        if monthly_remaining <= 0 || amount > monthly_remaining {
            return Err(EngineError::LimitExceeded {
                limit: self.caps.monthly,
                requested: amount,
                remaining: monthly_remaining.max(0),
            });
        }

        Ok(())
    }

    /// Accept a credit: apply rollover, advance both counters, move the
    /// anchor. Call only after `check` has passed for the same `now`.
    pub fn record(&self, customer: &mut Customer, amount: i64, now: DateTime<Utc>) {
        let (daily, monthly) = self.rolled_counters(customer, now);
        customer.daily_earnings = daily + amount;
        customer.monthly_earnings = monthly + amount;
        customer.last_earned_at = Some(now);
        customer.updated_at = now;
    }
}
