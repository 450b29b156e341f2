//! Listing retrieval: the injectable transport seam, its HTTP implementation,
//! and an opt-in retry wrapper.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use tracing::{debug, info, warn};

use crate::config::{HttpConfig, RetryConfig};
use crate::StoreResult;
use cxinfo_core::error::ExtensionInfoError;
use cxinfo_core::types::ExtensionId;

/// Unparsed listing page as returned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawListing {
    body: String,
}

impl RawListing {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.body
    }

    pub fn is_blank(&self) -> bool {
        self.body.trim().is_empty()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

impl From<String> for RawListing {
    fn from(body: String) -> Self {
        Self { body }
    }
}

impl From<&str> for RawListing {
    fn from(body: &str) -> Self {
        Self::new(body)
    }
}

/// Transport capability: fetch the raw listing for a canonical ID.
///
/// Implementations report `NotFound` for a definitive "no such listing",
/// `Network` or `RateLimited` for everything transient. They must not cache.
#[async_trait]
pub trait ListingFetcher: Send + Sync {
    async fn fetch(&self, id: &ExtensionId) -> StoreResult<RawListing>;
}

#[async_trait]
impl<F> ListingFetcher for Arc<F>
where
    F: ListingFetcher + ?Sized,
{
    async fn fetch(&self, id: &ExtensionId) -> StoreResult<RawListing> {
        (**self).fetch(id).await
    }
}

/// HTTP fetcher for the Chrome Web Store
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Store origin, without trailing slash
    base_url: String,
    /// Value of the `hl` query parameter
    language: String,
}

impl HttpFetcher {
    /// Create a fetcher with default HTTP settings
    pub fn new() -> StoreResult<Self> {
        Self::with_config(&HttpConfig::default())
    }

    /// Create a fetcher from HTTP configuration
    pub fn with_config(config: &HttpConfig) -> StoreResult<Self> {
        let client = ClientBuilder::new()
            // Connection pooling configuration
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .gzip(true)
            .user_agent(config.user_agent.as_str())
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::ACCEPT_LANGUAGE,
                    config.language.parse().map_err(|e| {
                        ExtensionInfoError::config(format!(
                            "Invalid language '{}': {}",
                            config.language, e
                        ))
                    })?,
                );
                headers
            })
            .build()
            .map_err(|e| {
                ExtensionInfoError::network(format!("Failed to create HTTP client: {}", e), e)
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Listing URL for an ID on the configured store origin
    fn listing_url(&self, id: &ExtensionId) -> String {
        format!("{}/detail/{}", self.base_url, id)
    }
}

#[async_trait]
impl ListingFetcher for HttpFetcher {
    async fn fetch(&self, id: &ExtensionId) -> StoreResult<RawListing> {
        let url = self.listing_url(id);
        let started = Instant::now();
        debug!(%id, %url, "fetching listing");

        let response = self
            .client
            .get(&url)
            .query(&[("hl", self.language.as_str())])
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    format!("Timed out fetching {}", url)
                } else {
                    format!("Failed to fetch {}: {}", url, e)
                };
                ExtensionInfoError::network(message, e)
            })?;

        match response.status() {
            status if status.is_success() => {
                let body = response.text().await.map_err(|e| {
                    ExtensionInfoError::network(format!("Failed to read listing body: {}", e), e)
                })?;
                if body.trim().is_empty() {
                    return Err(ExtensionInfoError::NotFound { id: id.to_string() });
                }
                info!(
                    %id,
                    bytes = body.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "fetched listing"
                );
                Ok(RawListing::from(body))
            }
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                Err(ExtensionInfoError::NotFound { id: id.to_string() })
            }
            StatusCode::TOO_MANY_REQUESTS => Err(ExtensionInfoError::RateLimited {
                retry_after: parse_retry_after(response.headers()),
            }),
            status => Err(ExtensionInfoError::network_message(format!(
                "Store returned status {} for {}",
                status, id
            ))),
        }
    }
}

/// Read a `Retry-After` header given in seconds
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Wraps a fetcher with exponential backoff for transient failures.
///
/// `NotFound` is definitive and returned immediately.
#[derive(Debug, Clone)]
pub struct RetryingFetcher<F> {
    inner: F,
    retry_config: RetryConfig,
}

impl<F> RetryingFetcher<F> {
    pub fn new(inner: F, retry_config: RetryConfig) -> Self {
        Self {
            inner,
            retry_config,
        }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        std::cmp::min(
            Duration::from_millis((delay.as_millis() as f64 * self.retry_config.multiplier) as u64),
            self.retry_config.max_delay(),
        )
    }
}

#[async_trait]
impl<F> ListingFetcher for RetryingFetcher<F>
where
    F: ListingFetcher,
{
    async fn fetch(&self, id: &ExtensionId) -> StoreResult<RawListing> {
        let mut delay = self.retry_config.initial_delay();
        let mut attempt = 0;

        loop {
            let error = match self.inner.fetch(id).await {
                Ok(listing) => return Ok(listing),
                Err(error) => error,
            };

            // Don't retry definitive answers or on the final attempt
            if !error.is_recoverable() || attempt >= self.retry_config.max_retries {
                return Err(error);
            }
            attempt += 1;

            let wait = match &error {
                ExtensionInfoError::RateLimited {
                    retry_after: Some(after),
                } => std::cmp::min(std::cmp::max(*after, delay), self.retry_config.max_delay()),
                _ => delay,
            };
            warn!(
                %id,
                attempt,
                max_retries = self.retry_config.max_retries,
                wait_ms = wait.as_millis() as u64,
                error = %error,
                "retrying listing fetch"
            );

            tokio::time::sleep(wait).await;
            delay = self.next_delay(delay);
        }
    }
}
