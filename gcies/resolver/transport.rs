use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::error::SourceError;

/// Minimal HTTP surface the sources depend on.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GETs `url` with query `params` and decodes the body as JSON.
    async fn get_json(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, SourceError>;

    /// GETs `url` with query `params` and returns the body as text.
    async fn get_text(&self, url: &str, params: &[(&str, &str)]) -> Result<String, SourceError>;
}

/// `reqwest`-backed transport with a fixed per-call timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Wraps a shared client.
    #[must_use]
    pub const fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn send(&self, url: &str, params: &[(&str, &str)]) -> Result<reqwest::Response, SourceError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| transport_error(url, &err))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

fn transport_error(url: &str, err: &reqwest::Error) -> SourceError {
    SourceError::Transport {
        url: url.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get_json(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, SourceError> {
        self.send(url, params)
            .await?
            .json::<Value>()
            .await
            .map_err(|err| SourceError::Decode(format!("{url}: {err}")))
    }

    async fn get_text(&self, url: &str, params: &[(&str, &str)]) -> Result<String, SourceError> {
        self.send(url, params)
            .await?
            .text()
            .await
            .map_err(|err| transport_error(url, &err))
    }
}
