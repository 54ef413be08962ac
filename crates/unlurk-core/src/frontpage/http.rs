//! HTTP layer for the listing page: client setup and status mapping.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::error::{UnlurkError, UnlurkResult};
use crate::USER_AGENT as USER_AGENT_VALUE;

/// Fetches the listing page body.
#[derive(Debug, Clone)]
pub(crate) struct ListingClient {
    client: reqwest::Client,
    url: String,
}

impl ListingClient {
    pub(crate) fn new(url: impl Into<String>, timeout: Duration) -> UnlurkResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| UnlurkError::Config {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    /// GET the listing; any non-2xx status is an upstream failure. No retries.
    pub(crate) async fn fetch_body(&self) -> UnlurkResult<String> {
        debug!(url = %self.url, "fetching listing page");

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(UnlurkError::upstream(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unexpected status")
            )));
        }

        response
            .text()
            .await
            .map_err(|e| UnlurkError::upstream(format!("failed to read body: {}", e)))
    }
}
