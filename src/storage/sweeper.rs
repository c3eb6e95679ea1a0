//! Expiration Sweeper
//!
//! Lazy expiry alone never frees memory: an entry whose TTL lapses and is
//! never read again would sit in the index forever. The sweeper is the
//! active half of the policy - a background task that wakes on a fixed
//! interval and asks the store to purge everything whose deadline has
//! passed.
//!
//! Each wake-up is a single [`ValueStore::purge_expired`] call: one
//! exclusive pass over the expiration mirror, deleting lapsed entries from
//! both indices, then back to waiting. The pass holds the store's write
//! lock for its duration, so sweep intervals should stay coarse relative
//! to expected key counts.
//!
//! The sweeper is advisory: point reads never depend on it, and a key is
//! logically absent the instant its deadline passes. Stopping is explicit
//! (`stop`, or dropping the handle); the shutdown signal is observed
//! before the next pass begins, never mid-pass.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::storage::store::ValueStore;

/// Handle to a running sweeper task.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct ExpirationSweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirationSweeper {
    /// Spawns the sweeper for `store` on the store's configured interval.
    ///
    /// Returns `None` when the interval is zero: sweeping is disabled and
    /// expiration stays purely lazy (checked on access, never physically
    /// reclaimed).
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = Arc::new(ValueStore::new(config));
    /// let sweeper = ExpirationSweeper::start(Arc::clone(&store));
    /// // ... serve traffic ...
    /// if let Some(sweeper) = sweeper {
    ///     sweeper.stop();
    /// }
    /// ```
    pub fn start(store: Arc<ValueStore>) -> Option<Self> {
        let interval = store.sweep_interval();
        if interval.is_zero() {
            info!("expiration sweeper disabled, expiry is lazy only");
            return None;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(sweep_loop(store, interval, shutdown_rx));
        info!(interval_ms = interval.as_millis() as u64, "expiration sweeper started");

        Some(Self { shutdown_tx })
    }

    /// Signals the task to stop. The signal is observed at the next tick
    /// boundary; a pass already underway completes first.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for ExpirationSweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The tick loop: wait out the interval (or the shutdown signal), purge,
/// repeat.
async fn sweep_loop(
    store: Arc<ValueStore>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    debug!("expiration sweeper stopped");
                    return;
                }
            }
        }

        let reclaimed = store.purge_expired();
        if reclaimed > 0 {
            debug!(reclaimed, remaining = store.len(), "sweep pass complete");
        }
    }
}
