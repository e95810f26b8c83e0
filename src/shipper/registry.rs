//! Per-source batch ownership and the flush/token bookkeeping around it.
//!
//! The registry owns one [`Batch`] per started source. Every structural change
//! (start, stop, flush-and-replace) and every append happens while holding the
//! registry lock, so for any one source there is never more than one
//! submission in flight and the continuation token returned by submission `n`
//! is always the one used by submission `n + 1`.
//!
//! The lock is held across remote calls. Each call is bounded by
//! `call_timeout`, so a hung endpoint stalls ingestion for at most that long.
//!
//! Failure policy: a failed flush never discards pending events. The batch is
//! kept, with its token, and retried at the next opportunity (the next
//! overflow or sweep). The exceptions are [`BatchRegistry::stop`],
//! [`BatchRegistry::shutdown`], and batches the remote refuses outright
//! ([`RemoteError::is_permanent`]), which would otherwise be retried forever.

use crate::remote::{Ingestor, RemoteError, StreamProvisioner};
use crate::shipper::batch::{Batch, BatchLimits, Destination, LogEvent};
use crate::shipper::stats::ShipperStats;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// What happened to an event handed to [`BatchRegistry::handle_event`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Appended,
    /// The batch was full; it was submitted and the event opened a new one
    FlushedAndAppended,
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No batch is registered for the source (not started, or already stopped)
    UnknownSource,
    /// The event alone exceeds the batch byte limit
    Oversized,
    /// The batch was full and could not be submitted
    FlushFailed,
}

/// Result of one pass over every registered batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub flushed: usize,
    pub failed: usize,
    pub events: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceSnapshot {
    pub source_id: String,
    pub destination: Destination,
    pub pending_events: usize,
    pub pending_bytes: usize,
    pub has_token: bool,
}

pub struct BatchRegistry {
    batches: Mutex<HashMap<String, Batch>>,
    provisioner: Arc<dyn StreamProvisioner>,
    ingestor: Arc<dyn Ingestor>,
    limits: BatchLimits,
    call_timeout: Duration,
    stats: Arc<ShipperStats>,
}

impl BatchRegistry {
    pub fn new(
        provisioner: Arc<dyn StreamProvisioner>,
        ingestor: Arc<dyn Ingestor>,
        limits: BatchLimits,
        call_timeout: Duration,
    ) -> Self {
        Self {
            batches: Mutex::new(HashMap::new()),
            provisioner,
            ingestor,
            limits,
            call_timeout,
            stats: Arc::new(ShipperStats::new()),
        }
    }

    pub fn stats(&self) -> Arc<ShipperStats> {
        Arc::clone(&self.stats)
    }

    pub fn limits(&self) -> BatchLimits {
        self.limits
    }

    /// Registers a source, opening its stream to learn the starting token.
    ///
    /// If the stream cannot be opened the source is still admitted with no
    /// token; the first submission may then be rejected, and the token carried
    /// by that rejection is adopted for the retry. Starting an already
    /// registered source is a no-op.
    pub async fn start(&self, source_id: &str, destination: Destination) {
        let mut batches = self.batches.lock().await;

        if batches.contains_key(source_id) {
            debug!(source_id = %source_id, "Source already registered");
            return;
        }

        let token = match self
            .bounded(self.provisioner.open_stream(&destination))
            .await
        {
            Ok(token) => token,
            Err(e) => {
                self.stats.provision_failed();
                warn!(
                    source_id = %source_id,
                    destination = %destination,
                    error = %e,
                    "Failed to open log stream, admitting source without a token"
                );
                None
            }
        };

        info!(
            source_id = %source_id,
            destination = %destination,
            has_token = token.is_some(),
            "Source started"
        );
        batches.insert(
            source_id.to_string(),
            Batch::new(destination, token, self.limits),
        );
    }

    /// Flushes the source's batch and unregisters it.
    ///
    /// The entry is removed even if the final flush fails; its pending events
    /// are then lost.
    pub async fn stop(&self, source_id: &str) {
        let mut batches = self.batches.lock().await;

        let Some(mut batch) = batches.remove(source_id) else {
            debug!(source_id = %source_id, "Stop for unregistered source");
            return;
        };

        if let Err(e) = self.flush_batch(source_id, &mut batch).await {
            error!(
                source_id = %source_id,
                destination = %batch.destination(),
                dropped = batch.len(),
                error = %e,
                "Final flush failed, dropping pending events"
            );
        }

        info!(source_id = %source_id, "Source stopped");
    }

    /// Routes one event into the source's batch, submitting the batch first
    /// if the event would push it past a limit
    pub async fn handle_event(&self, source_id: &str, event: LogEvent) -> EventOutcome {
        let mut batches = self.batches.lock().await;

        let Some(batch) = batches.get_mut(source_id) else {
            debug!(source_id = %source_id, "Dropping event for unregistered source");
            self.stats.event_dropped();
            return EventOutcome::Dropped(DropReason::UnknownSource);
        };

        if self.limits.is_oversized(&event) {
            warn!(
                source_id = %source_id,
                size = self.limits.wire_size(&event),
                max_bytes = self.limits.max_bytes,
                "Dropping event larger than a whole batch"
            );
            self.stats.event_oversized();
            return EventOutcome::Dropped(DropReason::Oversized);
        }

        if batch.accepts(&event) {
            batch.append(event);
            self.stats.event_accepted();
            return EventOutcome::Appended;
        }

        let flushed = match self.flush_batch(source_id, batch).await {
            Ok(_) => true,
            Err(e) => {
                error!(
                    source_id = %source_id,
                    destination = %batch.destination(),
                    error = %e,
                    "Failed to submit full batch"
                );
                false
            }
        };

        // Still full unless the failed batch was discarded
        if !batch.accepts(&event) {
            warn!(source_id = %source_id, "Batch still full, dropping event");
            self.stats.event_dropped();
            return EventOutcome::Dropped(DropReason::FlushFailed);
        }

        batch.append(event);
        self.stats.event_accepted();
        if flushed {
            EventOutcome::FlushedAndAppended
        } else {
            EventOutcome::Appended
        }
    }

    /// Submits the source's pending events, if any.
    ///
    /// Returns the number of events submitted. An unregistered source or an
    /// empty batch yields `Ok(0)` without a remote call.
    pub async fn flush(&self, source_id: &str) -> Result<usize, RemoteError> {
        let mut batches = self.batches.lock().await;
        match batches.get_mut(source_id) {
            Some(batch) => self.flush_batch(source_id, batch).await,
            None => Ok(0),
        }
    }

    /// Flushes every non-empty batch. Failures are logged and left for the
    /// next sweep.
    pub async fn sweep(&self) -> SweepReport {
        let mut batches = self.batches.lock().await;
        let mut report = SweepReport::default();

        for (source_id, batch) in batches.iter_mut() {
            if batch.is_empty() {
                continue;
            }
            match self.flush_batch(source_id, batch).await {
                Ok(events) => {
                    report.flushed += 1;
                    report.events += events;
                }
                Err(e) => {
                    report.failed += 1;
                    error!(
                        source_id = %source_id,
                        destination = %batch.destination(),
                        pending = batch.len(),
                        error = %e,
                        "Sweep flush failed, will retry next sweep"
                    );
                }
            }
        }

        if report.flushed > 0 || report.failed > 0 {
            debug!(
                flushed = report.flushed,
                failed = report.failed,
                events = report.events,
                "Sweep complete"
            );
        }
        report
    }

    /// Flushes and unregisters every source. Returns how many were removed.
    pub async fn shutdown(&self) -> usize {
        let mut batches = self.batches.lock().await;
        let count = batches.len();

        for (source_id, mut batch) in batches.drain() {
            if let Err(e) = self.flush_batch(&source_id, &mut batch).await {
                error!(
                    source_id = %source_id,
                    destination = %batch.destination(),
                    dropped = batch.len(),
                    error = %e,
                    "Flush on shutdown failed, dropping pending events"
                );
            }
        }

        info!(sources = count, "Registry shut down");
        count
    }

    pub async fn contains(&self, source_id: &str) -> bool {
        self.batches.lock().await.contains_key(source_id)
    }

    pub async fn len(&self) -> usize {
        self.batches.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.batches.lock().await.is_empty()
    }

    /// Copy of the source's current batch
    pub async fn batch(&self, source_id: &str) -> Option<Batch> {
        self.batches.lock().await.get(source_id).cloned()
    }

    /// Per-source view for status reporting, ordered by source ID.
    ///
    /// Returns `None` instead of waiting when the lock is held, e.g. by a
    /// sweep blocked on a slow remote.
    pub fn try_snapshot(&self) -> Option<Vec<SourceSnapshot>> {
        let batches = self.batches.try_lock().ok()?;
        let mut sources: Vec<SourceSnapshot> = batches
            .iter()
            .map(|(source_id, batch)| SourceSnapshot {
                source_id: source_id.clone(),
                destination: batch.destination().clone(),
                pending_events: batch.len(),
                pending_bytes: batch.bytes(),
                has_token: batch.token().is_some(),
            })
            .collect();
        sources.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        Some(sources)
    }

    /// Submits `batch` and replaces it with an empty successor on success.
    /// Must be called with the registry lock held.
    async fn flush_batch(&self, source_id: &str, batch: &mut Batch) -> Result<usize, RemoteError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let count = batch.len();
        let result = self
            .bounded(
                self.ingestor
                    .submit(batch.events(), batch.destination(), batch.token()),
            )
            .await;

        match result {
            Ok(next_token) => {
                debug!(
                    source_id = %source_id,
                    destination = %batch.destination(),
                    events = count,
                    bytes = batch.bytes(),
                    "Submitted batch"
                );
                self.stats.flush_succeeded(count);
                *batch = batch.successor(next_token);
                Ok(count)
            }
            Err(RemoteError::DataAlreadyAccepted { expected }) => {
                // Stored by an earlier attempt whose response was lost
                warn!(
                    source_id = %source_id,
                    destination = %batch.destination(),
                    events = count,
                    "Batch was already accepted, continuing with the remote token"
                );
                self.stats.token_reconciled();
                self.stats.flush_succeeded(count);
                *batch = batch.successor(expected);
                Ok(count)
            }
            Err(e) if e.is_permanent() => {
                error!(
                    source_id = %source_id,
                    destination = %batch.destination(),
                    events = count,
                    error = %e,
                    "Remote refused batch, dropping it"
                );
                self.stats.batch_rejected(count);
                self.stats.flush_failed();
                // The stream's token did not advance
                let token = batch.token().map(str::to_string);
                *batch = batch.successor(token);
                Err(e)
            }
            Err(e) => {
                if let RemoteError::InvalidSequenceToken {
                    expected: Some(expected),
                } = &e
                {
                    warn!(
                        source_id = %source_id,
                        destination = %batch.destination(),
                        "Sequence token rejected, adopting the token expected by the remote"
                    );
                    batch.set_token(Some(expected.clone()));
                    self.stats.token_reconciled();
                }
                self.stats.flush_failed();
                Err(e)
            }
        }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, RemoteError>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_elapsed) => Err(RemoteError::Timeout(self.call_timeout)),
        }
    }
}
