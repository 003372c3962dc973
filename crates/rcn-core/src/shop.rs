//! Participating shop records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::ids::{Address, ShopId};

/// A shop participating in the loyalty program.
///
/// The redemption verifier consumes only `active` and `verified`; the rest
/// is bookkeeping for the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shop {
    /// Shop identifier.
    pub id: ShopId,

    /// Display name.
    pub name: String,

    /// Wallet the shop redeems into and mints from.
    pub wallet_address: Address,

    /// Whether the shop is currently operating in the program.
    pub active: bool,

    /// Whether the shop has completed verification.
    pub verified: bool,

    /// When the shop registered.
    pub created_at: DateTime<Utc>,

    /// When the shop record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Shop {
    /// Create a new shop, active but unverified.
    #[must_use]
    pub fn new(name: String, wallet_address: Address, now: DateTime<Utc>) -> Self {
        Self {
            id: ShopId::generate(),
            name,
            wallet_address,
            active: true,
            verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check that the shop can take part in earning and redemption flows.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` if the shop is inactive or
    /// unverified.
    pub fn ensure_operational(&self) -> Result<()> {
        if !self.active {
            return Err(EngineError::Validation(format!(
                "shop {} is not active",
                self.id
            )));
        }
        if !self.verified {
            return Err(EngineError::Validation(format!(
                "shop {} is not verified",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop() -> Shop {
        let wallet = Address::new("0x00000000000000000000000000000000000000dd").unwrap();
        Shop::new("Fix-It Corner".into(), wallet, Utc::now())
    }

    #[test]
    fn new_shop_requires_verification() {
        let s = shop();
        assert!(s.active);
        assert!(!s.verified);
        assert!(s.ensure_operational().is_err());
    }

    #[test]
    fn verified_active_shop_is_operational() {
        let mut s = shop();
        s.verified = true;
        assert!(s.ensure_operational().is_ok());

        s.active = false;
        assert!(s.ensure_operational().is_err());
    }
}
