use crate::host::naming::NameResolver;
use crate::host::HostEvent;
use crate::shipper::batch::{Destination, LogEvent};
use crate::shipper::registry::BatchRegistry;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Applies host events to the registry: starts and stops sources and routes
/// log lines into their batches
pub struct EventRouter {
    registry: Arc<BatchRegistry>,
    resolver: Arc<dyn NameResolver>,
}

impl EventRouter {
    pub fn new(registry: Arc<BatchRegistry>, resolver: Arc<dyn NameResolver>) -> Self {
        Self { registry, resolver }
    }

    pub async fn dispatch(&self, event: HostEvent) {
        match event {
            HostEvent::Start {
                source,
                group,
                stream,
            } => {
                let destination = self.destination_for(&source, group, stream);
                self.registry.start(&source, destination).await;
            }
            HostEvent::Stop { source } => {
                self.registry.stop(&source).await;
            }
            HostEvent::Log {
                source,
                message,
                timestamp,
            } => {
                let event = match timestamp {
                    Some(ts) => LogEvent::new(message, ts),
                    None => LogEvent::now(message),
                };
                let outcome = self.registry.handle_event(&source, event).await;
                debug!(source_id = %source, outcome = ?outcome, "Routed log event");
            }
        }
    }

    /// Dispatches events until the stream ends or `cancel` fires. Returns the
    /// number of events dispatched.
    pub async fn run<S>(&self, events: S, cancel: CancellationToken) -> u64
    where
        S: Stream<Item = HostEvent>,
    {
        tokio::pin!(events);
        let mut dispatched = 0u64;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = events.next() => next,
            };
            let Some(event) = next else {
                break;
            };
            self.dispatch(event).await;
            dispatched += 1;
        }

        info!(dispatched = dispatched, "Event router stopped");
        dispatched
    }

    fn destination_for(
        &self,
        source_id: &str,
        group: Option<String>,
        stream: Option<String>,
    ) -> Destination {
        match (group, stream) {
            (Some(group), Some(stream)) => Destination::new(group, stream),
            (group, stream) => {
                let resolved = self.resolver.resolve(source_id);
                Destination::new(
                    group.unwrap_or(resolved.group),
                    stream.unwrap_or(resolved.stream),
                )
            }
        }
    }
}
