//! Application state.

use std::sync::Arc;

use rcn_store::RocksStore;

use crate::config::ServiceConfig;
use crate::minter::{HttpMinter, Minter};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend and ledger engine.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Token minter for on-chain settlement (optional).
    pub minter: Option<Arc<dyn Minter>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        // Create the minter client if configured
        let minter: Option<Arc<dyn Minter>> = config
            .minter_api_url
            .as_ref()
            .zip(config.minter_api_key.as_ref())
            .map(|(url, key)| {
                tracing::info!(minter_url = %url, "Minter integration enabled");
                Arc::new(HttpMinter::new(url, key)) as Arc<dyn Minter>
            });

        if minter.is_none() {
            tracing::warn!("Minter not configured - credits settle locally only");
        }

        Self {
            store,
            config,
            minter,
        }
    }

    /// Check if a minter is configured.
    #[must_use]
    pub fn has_minter(&self) -> bool {
        self.minter.is_some()
    }
}
