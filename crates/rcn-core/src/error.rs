//! Error types for the RCN engine.

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur in ledger and redemption operations.
///
/// These are expected business failures. They cross the engine boundary as
/// values and are mapped to structured API responses by the service layer;
/// only infrastructure failures surface differently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind ("customer", "shop", "session", "promo code").
        entity: &'static str,
        /// The identifier that was not found.
        id: String,
    },

    /// Input failed validation (non-positive amount, inactive shop, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An earning cap or redemption cap would be exceeded.
    #[error("limit exceeded: requested={requested}, remaining={remaining}, limit={limit}")]
    LimitExceeded {
        /// The cap in force.
        limit: i64,
        /// The amount that was requested.
        requested: i64,
        /// How much of the cap remains.
        remaining: i64,
    },

    /// The operation conflicts with existing state (duplicate pending
    /// session, invalid state transition).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The target is expired or otherwise past the point of the operation.
    #[error("expired: {0}")]
    Expired(String),

    /// The acting party does not own the target resource.
    #[error("unauthorized")]
    Unauthorized,
}

impl EngineError {
    /// Build a `NotFound` error for a customer address.
    #[must_use]
    pub fn customer_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "customer",
            id: id.into(),
        }
    }

    /// Build a `NotFound` error for a shop id.
    #[must_use]
    pub fn shop_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "shop",
            id: id.into(),
        }
    }

    /// Build a `NotFound` error for a session id.
    #[must_use]
    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "session",
            id: id.into(),
        }
    }

    /// Build a `NotFound` error for a promo code.
    #[must_use]
    pub fn promo_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "promo code",
            id: id.into(),
        }
    }
}
