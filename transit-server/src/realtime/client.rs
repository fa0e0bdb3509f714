//! Upstream feed HTTP client.
//!
//! Fetches raw feed bodies over HTTP. Decoding is left to the caller so the
//! same client serves protobuf feeds and JSON accessibility documents.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::ClientConfig;

use super::error::FetchError;

/// Source of raw feed bodies.
///
/// This abstraction allows the aggregation service to be tested without
/// network access.
pub trait FeedFetcher: Send + Sync {
    /// Fetch the body at `url`.
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>>;
}

/// HTTP feed client.
///
/// Uses a semaphore to limit concurrent requests to upstream.
#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    http: reqwest::Client,
    semaphore: Arc<Semaphore>,
}

impl HttpFeedClient {
    /// Create a new client with the given configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            http,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| FetchError::Http("Semaphore closed".to_string()))?;

        debug!(url, "Fetching feed");
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "Upstream returned error status");
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

impl FeedFetcher for HttpFeedClient {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        self.get(url).boxed()
    }
}
