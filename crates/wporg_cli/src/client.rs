//! Blocking reqwest client for the engine's HTTP transport.

use crate::error::CliError;
use std::time::Duration;
use url::Url;
use wporg_sync_engine::HttpClient;

/// [`HttpClient`] backed by `reqwest::blocking`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Builds a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, CliError> {
        let inner = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { inner })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &Url, headers: &[(String, String)]) -> Result<(u16, Vec<u8>), String> {
        let mut request = self.inner.get(url.clone());
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| e.to_string())?;
        Ok((status, body.to_vec()))
    }
}
