pub mod input;
pub mod naming;
pub mod router;

use serde::{Deserialize, Serialize};

pub use input::{max_line_bytes, parse_line, read_host_events, HostError};
pub use naming::{HostNameResolver, NameResolver};
pub use router::EventRouter;

/// Notification from the log-routing host.
///
/// On the wire each event is one JSON object per line, tagged by `type`:
///
/// ```text
/// {"type":"start","source":"c1"}
/// {"type":"start","source":"c2","group":"payments","stream":"api-2"}
/// {"type":"log","source":"c1","message":"GET / 200","timestamp":1700000000000}
/// {"type":"stop","source":"c1"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// A source began emitting. `group`/`stream` override the resolved names.
    Start {
        source: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stream: Option<String>,
    },
    Stop {
        source: String,
    },
    /// One log line. Missing timestamps are filled in on arrival.
    Log {
        source: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
}

impl HostEvent {
    pub fn source(&self) -> &str {
        match self {
            HostEvent::Start { source, .. }
            | HostEvent::Stop { source }
            | HostEvent::Log { source, .. } => source,
        }
    }
}
