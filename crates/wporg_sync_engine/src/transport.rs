//! Transport layer abstraction for fetch operations.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};

/// One GET request against the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// API root.
    pub base_url: String,
    /// Endpoint path.
    pub path: String,
    /// Query parameters, in order.
    pub query: Vec<(String, String)>,
    /// Request headers.
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    /// Creates a request without parameters or headers.
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// Appends a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Appends a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the value of query parameter `name`, if present.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the request URL without its query string.
    pub fn endpoint_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.path)
    }
}

/// A raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Creates a `200 OK` response carrying `value` as JSON.
    pub fn json(value: &Value) -> Self {
        Self::new(200, value.to_string())
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A transport performs fetches for the engine.
///
/// This trait abstracts the network layer. Implementations own timeouts,
/// TLS, connection reuse and any retry policy; the engine issues exactly
/// one call per page and never retries.
pub trait Transport: Send + Sync {
    /// Performs a GET request.
    ///
    /// Non-2xx statuses are returned as `Ok` responses; the engine decides
    /// what they mean.
    fn fetch(&self, request: &FetchRequest) -> SyncResult<FetchResponse>;
}

#[derive(Debug, Clone)]
enum MockReply {
    Response(FetchResponse),
    Failure(String),
}

/// A mock transport for testing.
///
/// Replies are queued per path and consumed in order. Every request is
/// recorded for later inspection.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<String, VecDeque<MockReply>>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a raw response for `path`.
    pub fn push_response(&self, path: &str, response: FetchResponse) {
        self.replies
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(MockReply::Response(response));
    }

    /// Queues a `200 OK` JSON response for `path`.
    pub fn push_json(&self, path: &str, value: Value) {
        self.push_response(path, FetchResponse::json(&value));
    }

    /// Queues a network failure for `path`.
    pub fn push_failure(&self, path: &str, message: &str) {
        self.replies
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(MockReply::Failure(message.to_string()));
    }

    /// Returns all requests seen so far.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().clone()
    }

    /// Returns the requests seen for `path`.
    pub fn requests_for(&self, path: &str) -> Vec<FetchRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    /// Returns the number of replies still queued for `path`.
    pub fn pending(&self, path: &str) -> usize {
        self.replies.lock().get(path).map_or(0, VecDeque::len)
    }
}

impl Transport for MockTransport {
    fn fetch(&self, request: &FetchRequest) -> SyncResult<FetchResponse> {
        self.requests.lock().push(request.clone());

        let reply = self
            .replies
            .lock()
            .get_mut(&request.path)
            .and_then(VecDeque::pop_front);

        match reply {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Failure(message)) => Err(SyncError::transport_retryable(message)),
            None => Err(SyncError::transport_fatal(format!(
                "no mock response queued for {}",
                request.path
            ))),
        }
    }
}
