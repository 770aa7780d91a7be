//! HTTP transport implementation.
//!
//! This module provides an HTTP-based transport for the sync engine.
//! The actual HTTP client is abstracted via a trait so the engine carries
//! no networking stack of its own (the `wporg` binary plugs in reqwest).

use crate::error::{SyncError, SyncResult};
use crate::transport::{FetchRequest, FetchResponse, Transport};
use parking_lot::RwLock;
use url::Url;

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. Timeouts,
/// TLS and connection pooling belong to the implementation.
pub trait HttpClient: Send + Sync {
    /// Sends a GET request and returns the status code and body.
    fn get(&self, url: &Url, headers: &[(String, String)]) -> Result<(u16, Vec<u8>), String>;
}

/// HTTP-based transport.
pub struct HttpTransport<C: HttpClient> {
    client: C,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport.
    pub fn new(client: C) -> Self {
        Self {
            client,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn set_error(&self, err: &str) {
        *self.last_error.write() = Some(err.to_string());
    }

    fn clear_error(&self) {
        *self.last_error.write() = None;
    }
}

/// Builds the full request URL, query string included.
pub fn build_url(request: &FetchRequest) -> SyncResult<Url> {
    let mut url = Url::parse(&request.endpoint_url()).map_err(|e| {
        SyncError::transport_fatal(format!("invalid URL {}: {}", request.endpoint_url(), e))
    })?;
    if !request.query.is_empty() {
        url.query_pairs_mut().extend_pairs(
            request
                .query
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
    }
    Ok(url)
}

impl<C: HttpClient> Transport for HttpTransport<C> {
    fn fetch(&self, request: &FetchRequest) -> SyncResult<FetchResponse> {
        let url = build_url(request)?;

        let (status, body) = self.client.get(&url, &request.headers).map_err(|e| {
            self.set_error(&e);
            SyncError::transport_retryable(e)
        })?;

        self.clear_error();
        Ok(FetchResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct TestClient {
        reply: Mutex<Result<(u16, Vec<u8>), String>>,
        seen: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl TestClient {
        fn new(reply: Result<(u16, Vec<u8>), String>) -> Self {
            Self {
                reply: Mutex::new(reply),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl HttpClient for TestClient {
        fn get(&self, url: &Url, headers: &[(String, String)]) -> Result<(u16, Vec<u8>), String> {
            self.seen.lock().push((url.to_string(), headers.to_vec()));
            self.reply.lock().clone()
        }
    }

    #[test]
    fn url_carries_encoded_query() {
        let request = FetchRequest::new("https://api.wordpress.org", "/themes/info/1.2/")
            .with_query("action", "query_themes")
            .with_query("request[page]", "2");
        let url = build_url(&request).unwrap();

        assert_eq!(url.path(), "/themes/info/1.2/");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("action".to_string(), "query_themes".to_string()),
                ("request[page]".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn url_without_query() {
        let request = FetchRequest::new("https://api.wordpress.org/", "/stats/php/1.0/");
        let url = build_url(&request).unwrap();
        assert_eq!(url.as_str(), "https://api.wordpress.org/stats/php/1.0/");
    }

    #[test]
    fn invalid_base_url_is_fatal() {
        let request = FetchRequest::new("not a url", "/x/");
        let err = build_url(&request).unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn transport_passes_status_and_headers() {
        let client = TestClient::new(Ok((404, b"nope".to_vec())));
        let transport = HttpTransport::new(client);
        let request = FetchRequest::new("https://api.wordpress.org", "/events/1.0/")
            .with_header("User-Agent", "test-agent/1.0");

        let response = transport.fetch(&request).unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.body, b"nope".to_vec());

        let seen = transport.client.seen.lock();
        assert_eq!(seen[0].1[0].1, "test-agent/1.0");
    }

    #[test]
    fn client_failure_is_recorded() {
        let transport = HttpTransport::new(TestClient::new(Err("connection refused".into())));
        let request = FetchRequest::new("https://api.wordpress.org", "/events/1.0/");

        let err = transport.fetch(&request).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(transport.last_error().as_deref(), Some("connection refused"));
    }
}
