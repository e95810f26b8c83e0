use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Maximum number of events accepted by a single `PutLogEvents` call
pub const MAX_BATCH_EVENTS: usize = 1000;

/// Maximum accounted payload size of a single `PutLogEvents` call, in bytes
pub const MAX_BATCH_BYTES: usize = 32_768;

/// Bytes the ingestion API adds to every event when accounting batch size
pub const EVENT_OVERHEAD_BYTES: usize = 28;

/// A single log line as it goes over the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,

    pub message: String,
}

impl LogEvent {
    pub fn new(message: impl Into<String>, timestamp: i64) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }

    /// Event stamped with the current wall clock
    pub fn now(message: impl Into<String>) -> Self {
        Self::new(message, Utc::now().timestamp_millis())
    }
}

/// Count and size limits a batch must stay within
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_events: usize,
    pub max_bytes: usize,
    pub event_overhead: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_events: MAX_BATCH_EVENTS,
            max_bytes: MAX_BATCH_BYTES,
            event_overhead: EVENT_OVERHEAD_BYTES,
        }
    }
}

impl BatchLimits {
    /// Bytes the remote API charges for this event
    pub fn wire_size(&self, event: &LogEvent) -> usize {
        event.message.len() + self.event_overhead
    }

    /// True if the event could never fit, even in an empty batch
    pub fn is_oversized(&self, event: &LogEvent) -> bool {
        self.wire_size(event) > self.max_bytes
    }
}

/// Remote log group and stream a batch is submitted to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    pub group: String,
    pub stream: String,
}

impl Destination {
    pub fn new(group: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            stream: stream.into(),
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.group, self.stream)
    }
}

/// Pending events for one destination, plus the token the next submission needs.
///
/// A batch never holds more than `limits.max_events` events or more than
/// `limits.max_bytes` accounted bytes. Callers check [`Batch::accepts`] before
/// [`Batch::append`]; the registry is the only owner and hands out `&mut Batch`
/// only while its lock is held.
#[derive(Debug, Clone)]
pub struct Batch {
    destination: Destination,

    /// `None` until the stream has been written to at least once
    token: Option<String>,

    events: Vec<LogEvent>,
    bytes: usize,
    limits: BatchLimits,
}

impl Batch {
    pub fn new(destination: Destination, token: Option<String>, limits: BatchLimits) -> Self {
        Self {
            destination,
            token,
            events: Vec::new(),
            bytes: 0,
            limits,
        }
    }

    /// Empty batch for the same destination, seeded with `token`
    pub fn successor(&self, token: Option<String>) -> Self {
        Self::new(self.destination.clone(), token, self.limits)
    }

    /// True if appending `event` keeps both the count and byte limits
    pub fn accepts(&self, event: &LogEvent) -> bool {
        self.events.len() < self.limits.max_events
            && self.bytes + self.limits.wire_size(event) <= self.limits.max_bytes
    }

    /// Append without checking limits; call [`Batch::accepts`] first.
    ///
    /// The remote rejects batches that are not in time order, so an event
    /// older than the last pending one takes that event's timestamp.
    pub fn append(&mut self, mut event: LogEvent) {
        debug_assert!(self.accepts(&event));
        if let Some(last) = self.events.last() {
            event.timestamp = event.timestamp.max(last.timestamp);
        }
        self.bytes += self.limits.wire_size(&event);
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Accounted wire size of all pending events
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Replace the continuation token, keeping pending events
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }
}
