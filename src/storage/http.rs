//! HTTP fetcher for documents published behind a content-delivery URL.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::error::StorageError;

/// Plain GET client; no retries.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Fetches `url` and returns the body text, failing on non-2xx status.
    pub async fn get_text(&self, url: &str) -> Result<String, StorageError> {
        debug!(url, "Fetching document over HTTP");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(StorageError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.text().await?)
    }
}
