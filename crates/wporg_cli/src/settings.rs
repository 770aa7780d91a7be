//! The JSON settings file.

use crate::error::CliError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use wporg_sync_engine::{SyncConfig, DEFAULT_BASE_URL};

/// Default transport timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings accepted in the `--config` file.
///
/// Every key is optional. Durations are given in seconds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// API root.
    pub api_url: Option<String>,
    /// `User-Agent` header value.
    pub user_agent: Option<String>,
    /// `location` parameter for the events endpoint.
    pub events_location: Option<String>,
    /// `ip` parameter for the events endpoint.
    pub events_ip: Option<String>,
    /// Endpoints to sync.
    pub stream_selection: Option<Vec<String>>,
    /// Initial watermark for incremental endpoints.
    pub start_date: Option<String>,
    /// Delay before every request, in seconds.
    pub request_delay: Option<f64>,
    /// Transport timeout, in seconds.
    pub timeout: Option<f64>,
}

impl Settings {
    /// Reads settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| CliError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Builds the engine configuration.
    pub fn sync_config(&self) -> Result<SyncConfig, CliError> {
        let mut config = SyncConfig::new(self.api_url.as_deref().unwrap_or(DEFAULT_BASE_URL));

        if let Some(agent) = &self.user_agent {
            config = config.with_user_agent(agent.as_str());
        }
        if let Some(delay) = self.request_delay {
            config = config.with_request_delay(seconds("request_delay", delay)?);
        }
        if let Some(start) = &self.start_date {
            config = config.with_start_date(start.as_str());
        }
        if let Some(names) = &self.stream_selection {
            config = config.with_endpoints(names.iter().cloned());
        }
        if let Some(location) = &self.events_location {
            config = config.with_endpoint_param("events", "location", location.as_str());
        }
        if let Some(ip) = &self.events_ip {
            config = config.with_endpoint_param("events", "ip", ip.as_str());
        }

        Ok(config)
    }

    /// Returns the transport timeout.
    pub fn timeout(&self) -> Result<Duration, CliError> {
        match self.timeout {
            Some(t) => seconds("timeout", t),
            None => Ok(DEFAULT_TIMEOUT),
        }
    }
}

fn seconds(name: &'static str, value: f64) -> Result<Duration, CliError> {
    Duration::try_from_secs_f64(value).map_err(|e| CliError::InvalidSetting {
        name,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_settings_use_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        let config = settings.sync_config().unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.endpoint_allowlist.is_none());
        assert_eq!(settings.timeout().unwrap(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn settings_map_onto_config() {
        let settings: Settings = serde_json::from_str(
            r#"{
                "api_url": "http://localhost:8080/",
                "user_agent": "my-tap/2.0",
                "events_location": "Berlin",
                "events_ip": "203.0.113.7",
                "stream_selection": ["events", "plugins"],
                "start_date": "2024-01-01T00:00:00Z",
                "request_delay": 0.25,
                "timeout": 5
            }"#,
        )
        .unwrap();
        let config = settings.sync_config().unwrap();

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.user_agent.as_deref(), Some("my-tap/2.0"));
        assert_eq!(config.request_delay, Duration::from_millis(250));
        assert_eq!(config.start_date.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert!(config.is_selected("events"));
        assert!(!config.is_selected("themes"));
        assert_eq!(
            config.params_for("events"),
            &[
                ("location".to_string(), "Berlin".to_string()),
                ("ip".to_string(), "203.0.113.7".to_string()),
            ]
        );
        assert_eq!(settings.timeout().unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn negative_delay_is_rejected() {
        let settings: Settings = serde_json::from_str(r#"{"request_delay": -1}"#).unwrap();
        assert!(matches!(
            settings.sync_config(),
            Err(CliError::InvalidSetting { name: "request_delay", .. })
        ));
    }

    #[test]
    fn load_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(Settings::load(file.path()), Err(CliError::Json { .. })));

        let missing = file.path().with_extension("missing");
        assert!(matches!(Settings::load(&missing), Err(CliError::Io { .. })));
    }
}
