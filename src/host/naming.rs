use crate::config::types::DestinationConfig;
use crate::shipper::batch::Destination;

/// Maps a source ID to the log group and stream it ships to
pub trait NameResolver: Send + Sync {
    fn resolve(&self, source_id: &str) -> Destination;
}

/// Names destinations after the local host: every source shares one group,
/// and each source gets its own `<prefix>-<source_id>` stream.
#[derive(Debug, Clone)]
pub struct HostNameResolver {
    group: String,
    stream_prefix: String,
}

impl HostNameResolver {
    pub fn new(group: impl Into<String>, stream_prefix: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            stream_prefix: stream_prefix.into(),
        }
    }

    /// Fills unset names from the hostname: group `logship-<host>`, prefix `<host>`
    pub fn from_config(config: &DestinationConfig) -> Self {
        let host = local_hostname();
        Self::new(
            config
                .group
                .clone()
                .unwrap_or_else(|| format!("logship-{}", host)),
            config.stream_prefix.clone().unwrap_or(host),
        )
    }

    pub fn group(&self) -> &str {
        &self.group
    }
}

impl NameResolver for HostNameResolver {
    fn resolve(&self, source_id: &str) -> Destination {
        Destination::new(
            self.group.clone(),
            format!("{}-{}", self.stream_prefix, source_id),
        )
    }
}

fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.to_str().map(|s| s.to_string()))
        .unwrap_or_else(|| "logship".to_string())
}
