//! Minimal HTTP ingestion API for exercising `HttpLogsClient` end to end.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Default)]
pub struct IngestState {
    pub groups: HashSet<String>,
    pub streams: HashMap<(String, String), Option<String>>,
    pub stored: HashMap<(String, String), Vec<Value>>,
    pub operations: Vec<String>,
    token_counter: usize,
}

#[derive(Clone)]
pub struct MockIngestServer {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<IngestState>>,
}

impl MockIngestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("Failed to get local addr");
        let state = Arc::new(Mutex::new(IngestState::default()));

        let app = Router::new()
            .route("/", post(handle))
            .with_state(Arc::clone(&state));
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { addr, state }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn operations(&self) -> Vec<String> {
        self.state.lock().unwrap().operations.clone()
    }

    pub fn stored_timestamps(&self, group: &str, stream: &str) -> Vec<i64> {
        self.state
            .lock()
            .unwrap()
            .stored
            .get(&(group.to_string(), stream.to_string()))
            .map(|events| events.iter().filter_map(|e| e["timestamp"].as_i64()).collect())
            .unwrap_or_default()
    }

    pub fn stored_messages(&self, group: &str, stream: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .stored
            .get(&(group.to_string(), stream.to_string()))
            .map(|events| {
                events
                    .iter()
                    .filter_map(|e| e["message"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn error(kind: &str, message: &str, expected: Option<&Option<String>>) -> Response {
    let mut body = json!({ "__type": kind, "message": message });
    if let Some(expected) = expected {
        body["expectedSequenceToken"] = json!(expected);
    }
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

async fn handle(
    State(state): State<Arc<Mutex<IngestState>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let target = headers
        .get("x-amz-target")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let operation = target.rsplit('.').next().unwrap_or_default().to_string();
    let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let mut state = state.lock().unwrap();
    state.operations.push(operation.clone());

    let group = request["logGroupName"].as_str().unwrap_or_default().to_string();
    let stream = request["logStreamName"].as_str().unwrap_or_default().to_string();

    match operation.as_str() {
        "DescribeLogGroups" => {
            let prefix = request["logGroupNamePrefix"].as_str().unwrap_or_default();
            let groups: Vec<Value> = state
                .groups
                .iter()
                .filter(|g| g.starts_with(prefix))
                .map(|g| json!({ "logGroupName": g }))
                .collect();
            Json(json!({ "logGroups": groups })).into_response()
        }
        "CreateLogGroup" => {
            if !state.groups.insert(group) {
                return error("ResourceAlreadyExistsException", "group exists", None);
            }
            Json(json!({})).into_response()
        }
        "DescribeLogStreams" => {
            if !state.groups.contains(&group) {
                return error("ResourceNotFoundException", "no such group", None);
            }
            let prefix = request["logStreamNamePrefix"].as_str().unwrap_or_default();
            let streams: Vec<Value> = state
                .streams
                .iter()
                .filter(|((g, s), _)| *g == group && s.starts_with(prefix))
                .map(|((_, s), token)| json!({ "logStreamName": s, "uploadSequenceToken": token }))
                .collect();
            Json(json!({ "logStreams": streams })).into_response()
        }
        "CreateLogStream" => {
            let key = (group, stream);
            if state.streams.contains_key(&key) {
                return error("ResourceAlreadyExistsException", "stream exists", None);
            }
            state.streams.insert(key, None);
            // Mirrors the real API: an empty body
            StatusCode::OK.into_response()
        }
        "PutLogEvents" => {
            let key = (group, stream);
            let sent = request["sequenceToken"].as_str().map(str::to_string);
            let current = match state.streams.get(&key) {
                Some(current) => current.clone(),
                None => return error("ResourceNotFoundException", "no such stream", None),
            };
            if current != sent {
                return error(
                    "InvalidSequenceTokenException",
                    "The given sequenceToken is invalid",
                    Some(&current),
                );
            }
            let events = request["logEvents"].as_array().cloned().unwrap_or_default();
            let timestamps: Vec<i64> = events
                .iter()
                .map(|e| e["timestamp"].as_i64().unwrap_or_default())
                .collect();
            if timestamps.windows(2).any(|pair| pair[1] < pair[0]) {
                return error(
                    "InvalidParameterException",
                    "Log events in a single PutLogEvents request must be in chronological order.",
                    None,
                );
            }
            state.token_counter += 1;
            let next = format!("{:056}", state.token_counter);
            state.streams.insert(key.clone(), Some(next.clone()));
            state.stored.entry(key).or_default().extend(events);
            Json(json!({ "nextSequenceToken": next })).into_response()
        }
        _ => error("UnknownOperationException", &target, None),
    }
}
