//! Periodic driver for the ingestion pipeline.
//!
//! Runs one cycle immediately, then one per interval until the shutdown
//! channel flips to `true`. Cycles are awaited inline, so they never
//! overlap; a tick that comes due while a cycle is still running is
//! skipped rather than queued.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::ingest::{CycleOptions, Pipeline};

pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(pipeline: Arc<Pipeline>, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until `shutdown` reads `true` (or its sender is dropped).
    /// Returns the number of cycles started.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> usize {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let opts = CycleOptions::default();
        let mut cycles = 0usize;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            if *shutdown.borrow() {
                break;
            }

            cycles += 1;
            let report = self.pipeline.run_cycle(&opts, &shutdown).await;
            if report.cancelled {
                break;
            }
        }

        info!(cycles, "Scheduler stopped");
        cycles
    }
}
