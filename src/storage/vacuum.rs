//! Vacuum
//!
//! Full-table sweep of expired entries, and the background task that decides
//! when a sweep is worth it.

use chrono::Utc;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::entry::now_secs;
use super::store::Shared;
use crate::config::VacuumConfig;

impl Shared {
    /// One O(n) pass under the exclusive lock
    pub(super) fn vacuum(&self) -> usize {
        let mut table = self.table.write();
        let now = now_secs();
        let before = table.entries.len();

        let mut expiring = 0;
        table.entries.retain(|_, entry| {
            if entry.is_permanent() {
                true
            } else if entry.is_valid_at(now) {
                expiring += 1;
                true
            } else {
                false
            }
        });

        let removed = before - table.entries.len();
        table.dirty_estimate = expiring;
        table.last_vacuum_at = Some(Utc::now());
        table.vacuum_count += 1;

        debug!(removed, remaining = table.entries.len(), expiring, "vacuum pass complete");
        removed
    }

    fn needs_vacuum(&self, config: &VacuumConfig) -> bool {
        let table = self.table.read();
        config.should_vacuum(table.dirty_estimate, table.entries.len())
    }
}

/// Background vacuum task
///
/// Holds only a weak reference so it never keeps the store alive.
pub(super) struct AutoVacuum {
    shared: Weak<Shared>,
    config: VacuumConfig,
    shutdown_rx: watch::Receiver<bool>,
}

impl AutoVacuum {
    pub(super) fn new(
        shared: Weak<Shared>,
        config: VacuumConfig,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            shared,
            config,
            shutdown_rx,
        }
    }

    /// Run until shutdown is signalled or the store is gone
    pub(super) async fn run(self) {
        let Self {
            shared,
            config,
            mut shutdown_rx,
        } = self;

        // A zero period would make `interval` panic
        let nap = config.nap_interval.max(Duration::from_millis(1));
        let mut ticker = interval(nap);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        info!(
            "Auto-vacuum started, nap interval: {:?}, threshold: {}, scale factor: {}",
            nap, config.threshold, config.scale_factor
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(shared) = shared.upgrade() else {
                        break;
                    };
                    if shared.needs_vacuum(&config) {
                        shared.vacuum();
                    }
                }
                changed = shutdown_rx.changed() => {
                    // Err: the sender went away with the store
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Auto-vacuum stopped");
    }
}
