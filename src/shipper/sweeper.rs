use crate::shipper::registry::BatchRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Periodically flushes every non-empty batch, whatever its fill level.
///
/// Bounds how long an event from a quiet source can sit unsent. Cancellation
/// is only observed between ticks; a sweep that has started runs to the end.
pub struct Sweeper {
    registry: Arc<BatchRegistry>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(registry: Arc<BatchRegistry>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    pub async fn run(self, cancel: CancellationToken) {
        info!(interval_ms = self.interval.as_millis() as u64, "Starting sweeper");

        // First sweep one full interval after start
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let report = self.registry.sweep().await;
            debug!(
                flushed = report.flushed,
                failed = report.failed,
                events = report.events,
                "Sweeper tick"
            );
        }

        info!("Sweeper stopped");
    }
}
