//! Background expiry sweep for redemption sessions.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use rcn_store::Store;

use crate::state::AppState;

/// Spawn the periodic sweep that expires lapsed pending sessions.
///
/// The sweep is idempotent and safe to run from multiple service instances
/// at once; sessions also expire lazily on access, so the sweep only bounds
/// how long a stale `pending` row can linger.
pub fn spawn(state: Arc<AppState>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so startup stays quiet.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match state.store.expire_sessions(Utc::now()) {
                Ok(0) => {}
                Ok(count) => tracing::info!(count, "session sweep expired lapsed sessions"),
                Err(e) => tracing::error!(error = %e, "session sweep failed"),
            }
        }
    })
}
