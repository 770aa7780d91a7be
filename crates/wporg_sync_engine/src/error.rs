//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that end an endpoint sync.
///
/// Record-level problems (missing keys, failed normalization) never surface
/// here; they are handled per record by the driver.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The response body was not the expected JSON.
    #[error("malformed response body: {0}")]
    MalformedBody(String),

    /// The output sink rejected a record.
    #[error("sink error: {0}")]
    Sink(String),

    /// The watermark store failed.
    #[error("state error: {0}")]
    State(String),

    /// An endpoint name is not in the registry.
    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),

    /// Sync was cancelled.
    #[error("sync cancelled")]
    Cancelled,
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if a caller could reasonably retry the endpoint.
    ///
    /// The engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns true for failures of the fetch itself (status, network, body).
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            SyncError::Transport { .. } | SyncError::HttpStatus { .. } | SyncError::MalformedBody(_)
        )
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::MalformedBody(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection reset").is_retryable());
        assert!(!SyncError::transport_fatal("invalid certificate").is_retryable());
        assert!(SyncError::HttpStatus {
            status: 503,
            url: "https://api.wordpress.org/plugins/info/1.2/".into(),
        }
        .is_retryable());
        assert!(!SyncError::HttpStatus {
            status: 404,
            url: "https://api.wordpress.org/nope/".into(),
        }
        .is_retryable());
        assert!(!SyncError::Cancelled.is_retryable());
    }

    #[test]
    fn fetch_failures() {
        assert!(SyncError::MalformedBody("eof".into()).is_fetch_failure());
        assert!(SyncError::transport_fatal("dns").is_fetch_failure());
        assert!(!SyncError::Sink("closed".into()).is_fetch_failure());
    }

    #[test]
    fn error_display() {
        let err = SyncError::HttpStatus {
            status: 500,
            url: "https://api.wordpress.org/events/1.0/".into(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP 500 from https://api.wordpress.org/events/1.0/"
        );

        let err: SyncError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(err.to_string().starts_with("malformed response body"));
    }
}
