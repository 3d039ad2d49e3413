//! Recurring sweep scheduling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::sweeper::SettlementSweeper;

/// Drives the settlement sweeper on a fixed interval until shutdown.
///
/// Ticks that land while a sweep is still running are dropped rather
/// than queued; the sweeper's own run flag also skips overlapping runs,
/// so a slow sweep simply delays the next one.
pub struct SweepScheduler {
    sweeper: Arc<SettlementSweeper>,
    interval: Duration,
}

impl SweepScheduler {
    pub fn new(sweeper: Arc<SettlementSweeper>, interval: Duration) -> Self {
        Self { sweeper, interval }
    }

    /// Spawn the schedule loop. Returns the task handle and the shutdown
    /// trigger; send `true` (or drop the sender) to stop the loop.
    pub fn spawn(self) -> (JoinHandle<()>, watch::Sender<bool>) {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(interval_secs = self.interval.as_secs(), "Sweep scheduler started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.sweeper.run_once().await {
                            Ok(_) => {}
                            Err(err) => {
                                // Config faults persist until an operator
                                // intervenes; keep ticking and keep saying so.
                                error!(error = %err, "Settlement sweep aborted");
                            }
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            info!("Sweep scheduler stopping");
                            break;
                        }
                    }
                }
            }
        });

        (handle, shutdown_tx)
    }
}
