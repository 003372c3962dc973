//! Error types for RCN storage.

use rcn_core::EngineError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
///
/// Business failures from the engine pass through unchanged; only genuine
/// infrastructure problems use the `Database`/`Serialization` variants.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A business rule rejected the operation.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl StoreError {
    /// Whether this is an expected business failure rather than an
    /// infrastructure fault.
    #[must_use]
    pub const fn is_business(&self) -> bool {
        matches!(self, Self::Engine(_))
    }
}
