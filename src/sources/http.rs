//! HTTP source client
//!
//! `reqwest`-backed implementation of [`SourceClient`]. One call is one GET:
//! no retries and no caching happen at this layer.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, trace};

use super::SourceClient;
use crate::config::SourceConfig;
use crate::errors::{SourceError, SourceResult};

#[derive(Clone)]
pub struct HttpSourceClient {
    client: Client,
}

impl HttpSourceClient {
    /// Create a new client using the configured timeout and user agent
    pub fn new(config: &SourceConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    fn map_request_error(url: &str, error: reqwest::Error) -> SourceError {
        if error.is_timeout() {
            SourceError::timeout(url)
        } else {
            SourceError::transport(url, error.to_string())
        }
    }
}

#[async_trait]
impl SourceClient for HttpSourceClient {
    async fn fetch_bytes(&self, url: &str) -> SourceResult<Vec<u8>> {
        trace!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::map_request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            debug!("Source returned {} for {}", status, url);
            return Err(SourceError::http(url, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_request_error(url, e))?;

        Ok(body.to_vec())
    }
}
