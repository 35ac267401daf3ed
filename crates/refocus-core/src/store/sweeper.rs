//! Background expiry sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::SnapshotStore;

/// Run [`SnapshotStore::sweep_expired`] every `interval` until the handle is aborted.
///
/// Sweeps run on the blocking pool because backends may do synchronous I/O.
/// A failed sweep is logged and retried on the next tick.
pub fn spawn_sweeper(store: Arc<SnapshotStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let store = Arc::clone(&store);
            match tokio::task::spawn_blocking(move || store.sweep_expired(Utc::now())).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "snapshot sweep failed"),
                Err(e) => tracing::warn!(error = %e, "snapshot sweep task panicked"),
            }
        }
    })
}
