//! Lookup orchestration: validate, consult the cache, fetch, extract.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheStats, ExtensionCache};
use crate::config::{CacheConfig, ClientConfig};
use crate::extract::ListingExtractor;
use crate::fetch::{HttpFetcher, ListingFetcher, RetryingFetcher};
use crate::StoreResult;
use cxinfo_core::types::{ExtensionId, ExtensionRecord};

/// Extension metadata client.
///
/// Cloning is cheap; clones share the fetcher and the cache.
#[derive(Clone)]
pub struct ExtensionClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    fetcher: Arc<dyn ListingFetcher>,
    extractor: ListingExtractor,
    cache: ExtensionCache,
    config: ClientConfig,
}

impl ExtensionClient {
    /// Create a client with default configuration and the HTTP fetcher
    pub fn new() -> StoreResult<Self> {
        Self::builder().build()
    }

    /// Create a client with default configuration around a custom fetcher
    pub fn with_fetcher<F>(fetcher: F) -> Self
    where
        F: ListingFetcher + 'static,
    {
        Self::assemble(ClientConfig::default(), Arc::new(fetcher))
    }

    pub fn builder() -> ExtensionClientBuilder {
        ExtensionClientBuilder::default()
    }

    fn assemble(config: ClientConfig, fetcher: Arc<dyn ListingFetcher>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                fetcher,
                extractor: ListingExtractor::new(&config.extract),
                cache: ExtensionCache::with_policy(config.cache.clone()),
                config,
            }),
        }
    }

    /// Look up an extension by its canonical ID.
    ///
    /// Anything that is not a canonical ID, listing URLs included, fails
    /// with `InvalidIdentifier`; use [`Self::get_extension_by_url`] for URLs.
    pub async fn get_extension(&self, input: &str) -> StoreResult<ExtensionRecord> {
        let id = ExtensionId::parse(input)?;
        self.get(&id).await
    }

    /// Look up an extension by its listing URL
    pub async fn get_extension_by_url(&self, url: &str) -> StoreResult<ExtensionRecord> {
        let id = self.inner.config.urls.parse_url(url)?;
        self.get(&id).await
    }

    /// Look up an extension by canonical ID
    pub async fn get(&self, id: &ExtensionId) -> StoreResult<ExtensionRecord> {
        let inner = Arc::clone(&self.inner);
        let owned = id.clone();
        self.inner
            .cache
            .get_or_fetch(id, move || async move {
                let raw = inner.fetcher.fetch(&owned).await?;
                let attributes = inner.extractor.extract(&owned, &raw)?;
                debug!(id = %owned, fields = attributes.present_count(), "assembled extension record");
                Ok(ExtensionRecord::from_parts(owned, attributes))
            })
            .await
    }

    pub fn cache(&self) -> &ExtensionCache {
        &self.inner.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}

impl fmt::Debug for ExtensionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionClient")
            .field("config", &self.inner.config)
            .field("cache", &self.inner.cache.stats())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ExtensionClient`]
#[derive(Default)]
pub struct ExtensionClientBuilder {
    config: ClientConfig,
    fetcher: Option<Arc<dyn ListingFetcher>>,
}

impl ExtensionClientBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the HTTP fetcher with a custom transport
    pub fn fetcher<F>(mut self, fetcher: F) -> Self
    where
        F: ListingFetcher + 'static,
    {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    pub fn cache_policy(mut self, policy: CacheConfig) -> Self {
        self.config.cache = policy;
        self
    }

    /// Validate the configuration and build the client.
    ///
    /// Without a custom fetcher an [`HttpFetcher`] is built from the `http`
    /// section. A `retry` section wraps whichever fetcher is used.
    pub fn build(self) -> StoreResult<ExtensionClient> {
        self.config.validate()?;

        let fetcher: Arc<dyn ListingFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::with_config(&self.config.http)?),
        };

        let fetcher: Arc<dyn ListingFetcher> = match &self.config.retry {
            Some(retry) => Arc::new(RetryingFetcher::new(fetcher, retry.clone())),
            None => fetcher,
        };

        Ok(ExtensionClient::assemble(self.config, fetcher))
    }
}
