//! HTTP transport: manifest retrieval and timed segment probes.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, instrument, trace};

use crate::config::ClientConfig;
use crate::error::{MonitorError, Result};

/// Retrieves the raw body of a manifest document.
#[async_trait]
pub trait ManifestLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<Bytes>;
}

/// Fetches one segment and reports how long the whole transfer took.
#[async_trait]
pub trait SegmentProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<Duration>;
}

/// `reqwest`-backed implementation of both transport traits.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            client: config.build_client()?,
        })
    }
}

#[async_trait]
impl ManifestLoader for HttpFetcher {
    #[instrument(skip(self), level = "debug")]
    async fn load(&self, url: &str) -> Result<Bytes> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::http_status(status, url, "manifest fetch"));
        }
        let body = response.bytes().await?;
        debug!(bytes = body.len(), "Fetched manifest");
        Ok(body)
    }
}

#[async_trait]
impl SegmentProbe for HttpFetcher {
    async fn probe(&self, url: &str) -> Result<Duration> {
        let start = Instant::now();
        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::http_status(status, url, "segment probe"));
        }

        // Body is drained and dropped; only the transfer time matters.
        let mut drained = 0usize;
        while let Some(chunk) = response.chunk().await? {
            drained += chunk.len();
        }

        let elapsed = start.elapsed();
        trace!(url = %url, bytes = drained, elapsed_ms = elapsed.as_millis() as u64, "Segment probed");
        Ok(elapsed)
    }
}
