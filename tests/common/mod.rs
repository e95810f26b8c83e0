//! In-memory remote for exercising the registry.
//!
//! Behaves like the real ingestion API with respect to the token chain: a
//! submission must carry the stream's current token, and each accepted
//! submission issues a new one. It also records every call and flags any
//! overlapping submissions to the same destination.

#![allow(dead_code)]

use async_trait::async_trait;
use logship::remote::{Ingestor, RemoteError, StreamProvisioner};
use logship::shipper::{Destination, LogEvent};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub mod server;

#[derive(Debug, Clone)]
pub struct Submission {
    pub destination: Destination,
    pub token: Option<String>,
    pub events: Vec<LogEvent>,
}

#[derive(Default)]
pub struct MockRemote {
    /// Current upload token per stream; `None` until first write
    streams: Mutex<HashMap<Destination, Option<String>>>,
    stored: Mutex<HashMap<Destination, Vec<LogEvent>>>,
    submissions: Mutex<Vec<Submission>>,
    in_flight: Mutex<HashSet<Destination>>,
    overlapped: AtomicBool,
    token_counter: AtomicUsize,
    fail_submits: AtomicUsize,
    fail_opens: AtomicUsize,
    reject_submits: AtomicUsize,
    submit_delay: Mutex<Option<Duration>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create a stream that has already been written to
    pub fn with_stream(self, destination: Destination, token: &str) -> Self {
        self.streams
            .lock()
            .unwrap()
            .insert(destination, Some(token.to_string()));
        self
    }

    pub fn set_submit_delay(&self, delay: Duration) {
        *self.submit_delay.lock().unwrap() = Some(delay);
    }

    /// The next `n` submissions fail with a throttling error
    pub fn fail_next_submits(&self, n: usize) {
        self.fail_submits.store(n, Ordering::SeqCst);
    }

    /// The next `n` submissions are refused as invalid, which is permanent
    pub fn reject_next_submits(&self, n: usize) {
        self.reject_submits.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_opens(&self, n: usize) {
        self.fail_opens.store(n, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn stored(&self, destination: &Destination) -> Vec<LogEvent> {
        self.stored
            .lock()
            .unwrap()
            .get(destination)
            .cloned()
            .unwrap_or_default()
    }

    pub fn stream_token(&self, destination: &Destination) -> Option<String> {
        self.streams
            .lock()
            .unwrap()
            .get(destination)
            .cloned()
            .flatten()
    }

    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Marks a destination busy until dropped, including when the submission
/// future is cancelled by a timeout
struct InFlight<'a> {
    set: &'a Mutex<HashSet<Destination>>,
    destination: Destination,
}

impl<'a> InFlight<'a> {
    fn enter(set: &'a Mutex<HashSet<Destination>>, destination: &Destination, overlapped: &AtomicBool) -> Self {
        if !set.lock().unwrap().insert(destination.clone()) {
            overlapped.store(true, Ordering::SeqCst);
        }
        Self {
            set,
            destination: destination.clone(),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.lock().unwrap().remove(&self.destination);
    }
}

#[async_trait]
impl StreamProvisioner for MockRemote {
    async fn open_stream(&self, destination: &Destination) -> Result<Option<String>, RemoteError> {
        if Self::take_failure(&self.fail_opens) {
            return Err(RemoteError::Api {
                status: 500,
                kind: "ServiceUnavailableException".to_string(),
                message: "provisioning unavailable".to_string(),
            });
        }
        let mut streams = self.streams.lock().unwrap();
        Ok(streams.entry(destination.clone()).or_insert(None).clone())
    }
}

#[async_trait]
impl Ingestor for MockRemote {
    async fn submit(
        &self,
        events: &[LogEvent],
        destination: &Destination,
        token: Option<&str>,
    ) -> Result<Option<String>, RemoteError> {
        let _in_flight = InFlight::enter(&self.in_flight, destination, &self.overlapped);

        let delay = *self.submit_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.submissions.lock().unwrap().push(Submission {
            destination: destination.clone(),
            token: token.map(str::to_string),
            events: events.to_vec(),
        });

        if Self::take_failure(&self.fail_submits) {
            Err(RemoteError::Throttled("Rate exceeded".to_string()))
        } else if Self::take_failure(&self.reject_submits) {
            Err(RemoteError::InvalidParameter("Invalid log events".to_string()))
        } else {
            let mut streams = self.streams.lock().unwrap();
            let current = streams.entry(destination.clone()).or_insert(None);
            if current.as_deref() != token {
                Err(RemoteError::InvalidSequenceToken {
                    expected: current.clone(),
                })
            } else {
                let n = self.token_counter.fetch_add(1, Ordering::SeqCst) + 1;
                let next = format!("T{}", n);
                *current = Some(next.clone());
                self.stored
                    .lock()
                    .unwrap()
                    .entry(destination.clone())
                    .or_default()
                    .extend_from_slice(events);
                Ok(Some(next))
            }
        }
    }
}
