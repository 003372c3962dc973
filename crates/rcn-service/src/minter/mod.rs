//! Token minter integration.
//!
//! The settlement layer is an opaque capability from the engine's point of
//! view: credits are ledgered locally first, then forwarded to the minter
//! best-effort. A failed or absent minter never rolls back a ledger write.

mod http;

pub use http::HttpMinter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use rcn_core::Address;

/// Error type for minter operations.
#[derive(Debug, thiserror::Error)]
pub enum MinterError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Minter API returned an error.
    #[error("minter API error: {status} - {error}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message.
        error: String,
    },
}

/// Receipt for a mint request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintReceipt {
    /// Whether the mint was accepted.
    pub success: bool,

    /// Settlement-layer transaction hash, when accepted.
    pub transaction_hash: Option<String>,
}

/// The minting capability consumed by the earning endpoints.
#[async_trait]
pub trait Minter: Send + Sync {
    /// Mint tokens to a wallet address.
    ///
    /// # Errors
    ///
    /// Returns a `MinterError` if the request fails or the API rejects it.
    async fn mint(&self, address: &Address, amount: i64) -> Result<MintReceipt, MinterError>;

    /// Read the on-chain balance of a wallet address.
    ///
    /// # Errors
    ///
    /// Returns a `MinterError` if the request fails or the API rejects it.
    async fn balance_of(&self, address: &Address) -> Result<i64, MinterError>;
}
