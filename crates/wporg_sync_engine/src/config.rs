//! Configuration for the sync engine.

use std::collections::BTreeMap;
use std::time::Duration;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.wordpress.org";

/// Default politeness delay inserted before every request.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(500);

/// Configuration for sync operations.
///
/// Read-only once the engine is built; concurrent endpoint syncs share it.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// API root, without a trailing slash.
    pub base_url: String,
    /// `User-Agent` header value.
    pub user_agent: Option<String>,
    /// Fixed delay before every request.
    pub request_delay: Duration,
    /// Initial watermark for endpoints without persisted state.
    pub start_date: Option<String>,
    /// Endpoint names to sync; `None` syncs the whole registry.
    pub endpoint_allowlist: Option<Vec<String>>,
    /// Extra query parameters per endpoint name.
    pub endpoint_params: BTreeMap<String, Vec<(String, String)>>,
}

impl SyncConfig {
    /// Creates a configuration for the given API root.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: Some(concat!("wporg-extract/", env!("CARGO_PKG_VERSION")).to_string()),
            request_delay: DEFAULT_REQUEST_DELAY,
            start_date: None,
            endpoint_allowlist: None,
            endpoint_params: BTreeMap::new(),
        }
    }

    /// Sets the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the delay before every request.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Sets the initial watermark used when no state was persisted.
    pub fn with_start_date(mut self, start_date: impl Into<String>) -> Self {
        self.start_date = Some(start_date.into());
        self
    }

    /// Restricts syncing to the named endpoints.
    pub fn with_endpoints<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoint_allowlist = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a query parameter sent with every request to `endpoint`.
    pub fn with_endpoint_param(
        mut self,
        endpoint: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.endpoint_params
            .entry(endpoint.into())
            .or_default()
            .push((name.into(), value.into()));
        self
    }

    /// Returns true if `endpoint` passes the allowlist.
    pub fn is_selected(&self, endpoint: &str) -> bool {
        match &self.endpoint_allowlist {
            Some(names) => names.iter().any(|n| n == endpoint),
            None => true,
        }
    }

    /// Returns the extra query parameters for `endpoint`.
    pub fn params_for(&self, endpoint: &str) -> &[(String, String)] {
        self.endpoint_params
            .get(endpoint)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new("https://mirror.example.com/")
            .with_user_agent("test-agent/1.0")
            .with_request_delay(Duration::ZERO)
            .with_start_date("2024-01-01T00:00:00Z")
            .with_endpoint_param("events", "location", "Seattle, WA");

        assert_eq!(config.base_url, "https://mirror.example.com");
        assert_eq!(config.user_agent.as_deref(), Some("test-agent/1.0"));
        assert_eq!(config.request_delay, Duration::ZERO);
        assert_eq!(config.start_date.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(
            config.params_for("events"),
            &[("location".to_string(), "Seattle, WA".to_string())]
        );
        assert!(config.params_for("plugins").is_empty());
    }

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.request_delay, DEFAULT_REQUEST_DELAY);
        assert!(config
            .user_agent
            .as_deref()
            .is_some_and(|ua| ua.starts_with("wporg-extract/")));
        assert!(config.start_date.is_none());
    }

    #[test]
    fn allowlist_selection() {
        let config = SyncConfig::default();
        assert!(config.is_selected("plugins"));

        let config = config.with_endpoints(["plugins", "php_stats"]);
        assert!(config.is_selected("php_stats"));
        assert!(!config.is_selected("themes"));
    }
}
