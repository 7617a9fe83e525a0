//! Host runtime reached over HTTP.
//!
//! Talks to an LMS bridge that exposes the CMI data model as JSON endpoints
//! under a base URL:
//!
//! ```text
//! POST {base}/initialize      body: ConfigureOptions   -> InitResult
//! GET  {base}/values/{key}                             -> {"value": string|null}
//! PUT  {base}/values/{key}    body: {"value": string}
//! POST {base}/commit
//! POST {base}/terminate
//! ```
//!
//! There is no request timeout; a call blocks until the bridge answers or
//! the transport fails.

use async_trait::async_trait;
use coursemark_core::{ConfigureOptions, InitResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Backend, BackendError, BackendKind, Result};

#[derive(Debug, Serialize, Deserialize)]
struct ValueBody {
    value: Option<String>,
}

/// HTTP-backed host runtime.
#[derive(Debug, Clone)]
pub struct HttpHost {
    client: reqwest::Client,
    base_url: String,
    options: ConfigureOptions,
    initialized: bool,
}

impl HttpHost {
    /// Create a host for the bridge at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a host with a preconfigured client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            options: ConfigureOptions::default(),
            initialized: false,
        }
    }

    /// Base URL of the bridge.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(BackendError::NotInitialized)
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(BackendError::Host {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl Backend for HttpHost {
    fn kind(&self) -> BackendKind {
        BackendKind::Host
    }

    async fn configure(&mut self, options: &ConfigureOptions) -> Result<()> {
        self.options = options.clone();
        Ok(())
    }

    async fn initialize(&mut self) -> Result<InitResult> {
        let sent = self
            .client
            .post(self.url("initialize"))
            .json(&self.options)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %self.base_url, error = %e, "LMS bridge unreachable");
                return Ok(InitResult::failed());
            }
        };

        if !response.status().is_success() {
            warn!(url = %self.base_url, status = %response.status(), "LMS bridge refused initialize");
            return Ok(InitResult::failed());
        }

        let init: InitResult = response.json().await?;
        self.initialized = init.success;
        debug!(url = %self.base_url, version = %init.version, success = init.success, "LMS bridge initialized");
        Ok(init)
    }

    async fn terminate(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        let response = self.client.post(self.url("terminate")).send().await?;
        check_status(response).await?;
        self.initialized = false;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.ensure_initialized()?;
        let response = self
            .client
            .get(self.url(&format!("values/{}", key)))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: ValueBody = check_status(response).await?.json().await?;
        Ok(body.value)
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.ensure_initialized()?;
        let body = ValueBody {
            value: Some(value.to_string()),
        };
        let response = self
            .client
            .put(self.url(&format!("values/{}", key)))
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        let response = self.client.post(self.url("commit")).send().await?;
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_trimmed() {
        let host = HttpHost::new("http://lms.example/api/");
        assert_eq!(host.base_url(), "http://lms.example/api");
        assert_eq!(host.url("commit"), "http://lms.example/api/commit");
    }

    #[tokio::test]
    async fn test_unreachable_bridge_fails_soft() {
        // Nothing listens on the discard port in CI containers.
        let mut host = HttpHost::new("http://127.0.0.1:9");
        let init = host.initialize().await.unwrap();
        assert!(!init.success);
    }

    #[tokio::test]
    async fn test_data_access_requires_initialize() {
        let mut host = HttpHost::new("http://127.0.0.1:9");
        assert!(matches!(
            host.get("cmi.location").await,
            Err(BackendError::NotInitialized)
        ));
        assert!(matches!(
            host.set("cmi.location", "1").await,
            Err(BackendError::NotInitialized)
        ));
        assert!(matches!(host.commit().await, Err(BackendError::NotInitialized)));
    }
}
