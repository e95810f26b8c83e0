use crate::shipper::batch::{BatchLimits, EVENT_OVERHEAD_BYTES, MAX_BATCH_BYTES, MAX_BATCH_EVENTS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub remote: RemoteConfig,
    #[serde(default)]
    pub destination: DestinationConfig,
    #[serde(default)]
    pub batching: BatchingConfig,
    /// Status server; omitted means no server
    #[serde(default)]
    pub status: Option<StatusConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the ingestion API
    pub endpoint: String,
    /// Timeout applied by the HTTP client to every request
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
    /// Upper bound on any remote call made while holding the registry lock
    #[serde(with = "humantime_serde", default = "default_call_timeout")]
    pub call_timeout: Duration,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_call_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DestinationConfig {
    pub group: Option<String>,
    pub stream_prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchingConfig {
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    #[serde(default = "default_event_overhead")]
    pub event_overhead: usize,
    #[serde(with = "humantime_serde", default = "default_sweep_interval")]
    pub sweep_interval: Duration,
}

fn default_max_events() -> usize {
    MAX_BATCH_EVENTS
}

fn default_max_bytes() -> usize {
    MAX_BATCH_BYTES
}

fn default_event_overhead() -> usize {
    EVENT_OVERHEAD_BYTES
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(10)
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
            max_bytes: default_max_bytes(),
            event_overhead: default_event_overhead(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl BatchingConfig {
    pub fn limits(&self) -> BatchLimits {
        BatchLimits {
            max_events: self.max_events,
            max_bytes: self.max_bytes,
            event_overhead: self.event_overhead,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    pub listen: String,
}
