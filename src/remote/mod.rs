pub mod client;

use crate::shipper::batch::{Destination, LogEvent};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use client::HttpLogsClient;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The token sent does not match the stream's current upload token
    #[error("invalid sequence token, expected {expected:?}")]
    InvalidSequenceToken { expected: Option<String> },

    /// The same batch was already stored by an earlier submission
    #[error("batch already accepted, next token {expected:?}")]
    DataAlreadyAccepted { expected: Option<String> },

    /// The request itself is invalid, e.g. events out of time order
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("request throttled: {0}")]
    Throttled(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("resource already exists: {0}")]
    AlreadyExists(String),

    #[error("remote returned error status {status} ({kind}): {message}")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },

    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),
}

impl RemoteError {
    /// True if resubmitting the same batch can never succeed
    pub fn is_permanent(&self) -> bool {
        matches!(self, RemoteError::InvalidParameter(_))
    }
}

pub type Result<T> = std::result::Result<T, RemoteError>;

/// Makes sure a destination exists remotely and reports the token its next
/// write needs. `None` means the stream has never been written to.
#[async_trait]
pub trait StreamProvisioner: Send + Sync {
    async fn open_stream(&self, destination: &Destination) -> Result<Option<String>>;
}

/// Submits one batch of events and returns the token for the following batch
#[async_trait]
pub trait Ingestor: Send + Sync {
    async fn submit(
        &self,
        events: &[LogEvent],
        destination: &Destination,
        token: Option<&str>,
    ) -> Result<Option<String>>;
}
