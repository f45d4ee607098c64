//! Small JSON-over-HTTP helper shared by the provider adapters.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AdapterError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) struct JsonClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl JsonClient {
    pub(crate) fn new(base_url: String, timeout: Duration) -> Result<Self, AdapterError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdapterError::Connection(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET and decode; any non-success status is an error.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AdapterError> {
        match self.get_optional(path, query).await? {
            Some(value) => Ok(value),
            None => Err(AdapterError::Status {
                status: StatusCode::NOT_FOUND.as_u16(),
                body: format!("{} not found", path),
            }),
        }
    }

    /// GET and decode; 404 maps to `Ok(None)`.
    pub(crate) async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, AdapterError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET request");

        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AdapterError::Timeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    AdapterError::Connection(e.to_string())
                }
            })?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = resp
            .text()
            .await
            .map_err(|e| AdapterError::Connection(e.to_string()))?;
        if !status.is_success() {
            return Err(AdapterError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| AdapterError::Decode(e.to_string()))
    }
}
