//! Redemption session lifecycle.
//!
//! A session is a short-lived, customer-approved authorization for one shop
//! to debit a specific amount:
//!
//! ```text
//! pending ──► approved ──► used
//!    │
//!    ├──► rejected
//!    └──► expired        (sweep, or lazily on access past expires_at)
//! ```
//!
//! `rejected`, `expired`, and `used` are terminal. The `max_amount` captured
//! at creation is a snapshot of the verifier decision; the debit at use time
//! re-verifies against current balances.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{EngineError, Result};
use crate::ids::{Address, SessionId, ShopId};

/// Default session time-to-live in seconds.
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 300;

/// Lifecycle state of a redemption session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Awaiting customer approval.
    Pending,

    /// Customer signed; the shop may redeem.
    Approved,

    /// Customer declined. Terminal.
    Rejected,

    /// Lapsed without approval. Terminal.
    Expired,

    /// Shop redeemed and the ledger was debited. Terminal.
    Used,
}

impl SessionStatus {
    /// Whether no further transition is possible from this state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Expired | Self::Used)
    }

    /// Get the status name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Used => "used",
        }
    }
}

/// A redemption approval session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionSession {
    /// Session identifier.
    pub id: SessionId,

    /// The customer whose balance would be debited.
    pub customer: Address,

    /// The shop requesting the redemption.
    pub shop_id: ShopId,

    /// Amount authorized at creation (verifier snapshot).
    pub max_amount: i64,

    /// Current lifecycle state.
    pub status: SessionStatus,

    /// When the session was opened.
    pub created_at: DateTime<Utc>,

    /// When a pending session lapses.
    pub expires_at: DateTime<Utc>,

    /// When the customer approved, if they did.
    pub approved_at: Option<DateTime<Utc>>,

    /// When the shop redeemed, if it did.
    pub used_at: Option<DateTime<Utc>>,

    /// Scannable payload shown to the customer for approval.
    pub qr_code: String,

    /// The customer's approval signature, once given.
    pub signature: Option<String>,
}

impl RedemptionSession {
    /// Open a new pending session.
    #[must_use]
    pub fn new(
        customer: Address,
        shop_id: ShopId,
        max_amount: i64,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let id = SessionId::generate();
        let qr_code = qr_payload(&id, &customer, &shop_id, max_amount);
        Self {
            id,
            customer,
            shop_id,
            max_amount,
            status: SessionStatus::Pending,
            created_at: now,
            expires_at: now + ttl,
            approved_at: None,
            used_at: None,
            qr_code,
            signature: None,
        }
    }

    /// Whether a pending session has lapsed past its expiry.
    #[must_use]
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Pending && now >= self.expires_at
    }

    /// Customer approves: records the signature and timestamp.
    ///
    /// # Errors
    ///
    /// - `EngineError::Expired` if the session has lapsed (it must become
    ///   `expired`, never `approved`).
    /// - `EngineError::Conflict` if the session is not pending.
    /// - `EngineError::Validation` for an empty signature.
    pub fn approve(&mut self, signature: String, now: DateTime<Utc>) -> Result<()> {
        if signature.trim().is_empty() {
            return Err(EngineError::Validation("signature must not be empty".into()));
        }
        self.ensure_pending(now)?;

        self.status = SessionStatus::Approved;
        self.approved_at = Some(now);
        self.signature = Some(signature);
        Ok(())
    }

    /// Customer declines. Terminal.
    ///
    /// # Errors
    ///
    /// Same state requirements as [`Self::approve`].
    pub fn reject(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_pending(now)?;
        self.status = SessionStatus::Rejected;
        Ok(())
    }

    /// Transition a pending session to `expired`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Conflict` if the session is not pending.
    pub fn expire(&mut self) -> Result<()> {
        if self.status != SessionStatus::Pending {
            return Err(EngineError::Conflict(format!(
                "cannot expire a {} session",
                self.status.as_str()
            )));
        }
        self.status = SessionStatus::Expired;
        Ok(())
    }

    /// Shop redeems an approved session.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Conflict` unless the session is `approved` —
    /// `used` is reachable from no other state.
    pub fn mark_used(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != SessionStatus::Approved {
            return Err(EngineError::Conflict(format!(
                "cannot redeem a {} session",
                self.status.as_str()
            )));
        }
        self.status = SessionStatus::Used;
        self.used_at = Some(now);
        Ok(())
    }

    fn ensure_pending(&self, now: DateTime<Utc>) -> Result<()> {
        match self.status {
            SessionStatus::Pending if now >= self.expires_at => Err(EngineError::Expired(
                format!("session {} expired at {}", self.id, self.expires_at),
            )),
            SessionStatus::Pending => Ok(()),
            SessionStatus::Expired => Err(EngineError::Expired(format!(
                "session {} is expired",
                self.id
            ))),
            status => Err(EngineError::Conflict(format!(
                "session {} is {}",
                self.id,
                status.as_str()
            ))),
        }
    }
}

/// Build the scannable approval payload for a session.
///
/// The trailing checksum binds the session id to the customer, shop, and
/// amount so a tampered payload fails to match the stored one.
#[must_use]
pub fn qr_payload(id: &SessionId, customer: &Address, shop_id: &ShopId, amount: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(customer.as_bytes());
    hasher.update(shop_id.as_bytes());
    hasher.update(amount.to_be_bytes());
    let digest = hasher.finalize();
    format!("rcn:redeem:{id}:{}", &hex::encode(digest)[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn addr() -> Address {
        Address::new("0x00000000000000000000000000000000000000ff").unwrap()
    }

    fn session(now: DateTime<Utc>) -> RedemptionSession {
        RedemptionSession::new(addr(), ShopId::generate(), 20, Duration::minutes(5), now)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn new_session_is_pending_with_ttl() {
        let now = t0();
        let s = session(now);
        assert_eq!(s.status, SessionStatus::Pending);
        assert_eq!(s.expires_at, now + Duration::minutes(5));
        assert!(s.qr_code.starts_with("rcn:redeem:"));
    }

    #[test]
    fn approve_records_signature() {
        let now = t0();
        let mut s = session(now);
        s.approve("0xsigned".into(), now + Duration::minutes(1)).unwrap();
        assert_eq!(s.status, SessionStatus::Approved);
        assert_eq!(s.signature.as_deref(), Some("0xsigned"));
        assert!(s.approved_at.is_some());
    }

    #[test]
    fn approve_after_expiry_fails() {
        let now = t0();
        let mut s = session(now);
        let late = now + Duration::minutes(6);
        assert!(matches!(
            s.approve("0xsigned".into(), late),
            Err(EngineError::Expired(_))
        ));
        // The row itself stays pending until expired explicitly.
        assert_eq!(s.status, SessionStatus::Pending);
        assert!(s.is_lapsed(late));
    }

    #[test]
    fn approve_requires_signature() {
        let now = t0();
        let mut s = session(now);
        assert!(matches!(
            s.approve("  ".into(), now),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn reject_is_terminal() {
        let now = t0();
        let mut s = session(now);
        s.reject(now).unwrap();
        assert_eq!(s.status, SessionStatus::Rejected);
        assert!(s.status.is_terminal());
        assert!(matches!(
            s.approve("0xsig".into(), now),
            Err(EngineError::Conflict(_))
        ));
    }

    #[test]
    fn used_only_from_approved() {
        let now = t0();
        let mut s = session(now);
        assert!(matches!(s.mark_used(now), Err(EngineError::Conflict(_))));

        s.approve("0xsig".into(), now).unwrap();
        s.mark_used(now + Duration::minutes(2)).unwrap();
        assert_eq!(s.status, SessionStatus::Used);
        assert!(s.used_at.is_some());

        // Double-use fails.
        assert!(matches!(
            s.mark_used(now + Duration::minutes(3)),
            Err(EngineError::Conflict(_))
        ));
    }

    #[test]
    fn expire_only_from_pending() {
        let now = t0();
        let mut s = session(now);
        s.expire().unwrap();
        assert_eq!(s.status, SessionStatus::Expired);
        assert!(s.expire().is_err());

        // Expired sessions cannot be approved.
        assert!(matches!(
            s.approve("0xsig".into(), now),
            Err(EngineError::Expired(_))
        ));
    }

    #[test]
    fn qr_payload_binds_fields() {
        let id = SessionId::generate();
        let shop = ShopId::generate();
        let a = qr_payload(&id, &addr(), &shop, 20);
        let b = qr_payload(&id, &addr(), &shop, 21);
        assert_ne!(a, b);
    }
}
