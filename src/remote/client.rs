use crate::config::types::RemoteConfig;
use crate::remote::{Ingestor, RemoteError, Result, StreamProvisioner};
use crate::shipper::batch::{Destination, LogEvent};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Value of the `X-Amz-Target` header is `<TARGET_PREFIX>.<Operation>`
const TARGET_PREFIX: &str = "Logs_20140328";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// HTTP client for a JSON-1.1 log ingestion API.
///
/// Requests are sent unsigned; the endpoint is expected to be a gateway that
/// attaches credentials, or a local emulator.
#[derive(Debug, Clone)]
pub struct HttpLogsClient {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpLogsClient {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<Req, Resp>(&self, operation: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/", self.endpoint))
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, operation))
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(serde_json::to_vec(request)?)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), &body));
        }

        // Some operations answer with an empty body
        if body.is_empty() {
            return Ok(serde_json::from_slice(b"{}")?);
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn group_exists(&self, group: &str) -> Result<bool> {
        let mut next_token: Option<String> = None;
        loop {
            let request = DescribeLogGroupsRequest {
                log_group_name_prefix: group,
                next_token: next_token.as_deref(),
            };
            let page: DescribeLogGroupsResponse = self.call("DescribeLogGroups", &request).await?;

            if page.log_groups.iter().any(|g| g.log_group_name == group) {
                return Ok(true);
            }
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => return Ok(false),
            }
        }
    }

    async fn create_group(&self, group: &str) -> Result<()> {
        if self.group_exists(group).await? {
            return Ok(());
        }

        info!(group = %group, "Creating log group");
        let request = CreateLogGroupRequest {
            log_group_name: group,
        };
        match self.call::<_, Empty>("CreateLogGroup", &request).await {
            Ok(_) | Err(RemoteError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Looks the stream up by exact name; `Ok(None)` if it does not exist
    async fn find_stream(&self, destination: &Destination) -> Result<Option<LogStreamInfo>> {
        let mut next_token: Option<String> = None;
        loop {
            let request = DescribeLogStreamsRequest {
                log_group_name: &destination.group,
                log_stream_name_prefix: &destination.stream,
                next_token: next_token.as_deref(),
            };
            let page: DescribeLogStreamsResponse =
                self.call("DescribeLogStreams", &request).await?;

            if let Some(stream) = page
                .log_streams
                .into_iter()
                .find(|s| s.log_stream_name == destination.stream)
            {
                return Ok(Some(stream));
            }
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => return Ok(None),
            }
        }
    }
}

#[async_trait]
impl StreamProvisioner for HttpLogsClient {
    async fn open_stream(&self, destination: &Destination) -> Result<Option<String>> {
        self.create_group(&destination.group).await?;

        if let Some(stream) = self.find_stream(destination).await? {
            debug!(destination = %destination, "Log stream exists");
            return Ok(stream.upload_sequence_token);
        }

        debug!(destination = %destination, "Creating log stream");
        let request = CreateLogStreamRequest {
            log_group_name: &destination.group,
            log_stream_name: &destination.stream,
        };
        match self.call::<_, Empty>("CreateLogStream", &request).await {
            Ok(_) => Ok(None),
            // Created concurrently by someone else, so it may already carry a token
            Err(RemoteError::AlreadyExists(_)) => Ok(self
                .find_stream(destination)
                .await?
                .and_then(|s| s.upload_sequence_token)),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Ingestor for HttpLogsClient {
    async fn submit(
        &self,
        events: &[LogEvent],
        destination: &Destination,
        token: Option<&str>,
    ) -> Result<Option<String>> {
        let request = PutLogEventsRequest {
            log_group_name: &destination.group,
            log_stream_name: &destination.stream,
            log_events: events,
            sequence_token: token,
        };
        let response: PutLogEventsResponse = self.call("PutLogEvents", &request).await?;

        if let Some(rejected) = response.rejected_log_events_info {
            warn!(
                destination = %destination,
                too_new_start = ?rejected.too_new_log_event_start_index,
                too_old_end = ?rejected.too_old_log_event_end_index,
                expired_end = ?rejected.expired_log_event_end_index,
                "Remote rejected some log events"
            );
        }

        Ok(response.next_sequence_token)
    }
}

/// Maps an error response body onto a [`RemoteError`]
fn error_from_body(status: u16, body: &[u8]) -> RemoteError {
    let parsed: ErrorBody = match serde_json::from_slice(body) {
        Ok(parsed) => parsed,
        Err(_) => {
            return RemoteError::Api {
                status,
                kind: "Unknown".to_string(),
                message: String::from_utf8_lossy(body).into_owned(),
            }
        }
    };

    // Types may come namespaced, e.g. "com.amazonaws.logs#ThrottlingException"
    let kind = parsed
        .kind
        .rsplit('#')
        .next()
        .unwrap_or_default()
        .to_string();
    let message = parsed.message.unwrap_or_default();

    match kind.as_str() {
        "InvalidSequenceTokenException" => RemoteError::InvalidSequenceToken {
            expected: parsed.expected_sequence_token,
        },
        "DataAlreadyAcceptedException" => RemoteError::DataAlreadyAccepted {
            expected: parsed.expected_sequence_token,
        },
        "InvalidParameterException" => RemoteError::InvalidParameter(message),
        "ThrottlingException" => RemoteError::Throttled(message),
        "ResourceNotFoundException" => RemoteError::NotFound(message),
        "ResourceAlreadyExistsException" => RemoteError::AlreadyExists(message),
        _ => RemoteError::Api {
            status,
            kind,
            message,
        },
    }
}

// ===== Wire Types =====

#[derive(Debug, Deserialize, Default)]
struct Empty {}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    kind: String,
    #[serde(alias = "Message", default)]
    message: Option<String>,
    #[serde(rename = "expectedSequenceToken", default)]
    expected_sequence_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogGroupsRequest<'a> {
    log_group_name_prefix: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogGroupsResponse {
    #[serde(default)]
    log_groups: Vec<LogGroupInfo>,
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogGroupInfo {
    log_group_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLogGroupRequest<'a> {
    log_group_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogStreamsRequest<'a> {
    log_group_name: &'a str,
    log_stream_name_prefix: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogStreamsResponse {
    #[serde(default)]
    log_streams: Vec<LogStreamInfo>,
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogStreamInfo {
    log_stream_name: String,
    upload_sequence_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLogStreamRequest<'a> {
    log_group_name: &'a str,
    log_stream_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PutLogEventsRequest<'a> {
    log_group_name: &'a str,
    log_stream_name: &'a str,
    log_events: &'a [LogEvent],
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PutLogEventsResponse {
    next_sequence_token: Option<String>,
    rejected_log_events_info: Option<RejectedLogEventsInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RejectedLogEventsInfo {
    too_new_log_event_start_index: Option<i64>,
    too_old_log_event_end_index: Option<i64>,
    expired_log_event_end_index: Option<i64>,
}
