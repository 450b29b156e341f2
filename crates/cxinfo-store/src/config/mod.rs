//! Client configuration, loadable from TOML.
//!
//! Every section and field has a default, so an empty document is a valid
//! configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::StoreResult;
use cxinfo_core::error::ExtensionInfoError;
use cxinfo_core::utils::UrlGrammar;

/// Environment variable that overrides `http.base_url`
pub const BASE_URL_ENV: &str = "CXINFO_BASE_URL";

/// Complete client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Transport settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Cache eviction policy
    #[serde(default)]
    pub cache: CacheConfig,

    /// Retry policy; absent means no retries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,

    /// Recognized listing URL shapes
    #[serde(default)]
    pub urls: UrlGrammar,

    /// Extraction tables
    #[serde(default)]
    pub extract: ExtractConfig,
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Store origin
    pub base_url: String,
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// User-Agent header
    pub user_agent: String,
    /// Listing language; sent as `hl` and `Accept-Language`
    pub language: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: cxinfo_core::types::STORE_BASE_URL.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: concat!("cxinfo/", env!("CARGO_PKG_VERSION")).to_string(),
            language: "en".to_string(),
        }
    }
}

/// Cache eviction policy. Both limits are off by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
    /// Maximum number of cached records; the oldest is evicted first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay_ms: u64,
    /// Maximum delay between retries
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 10_000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Tables that steer listing extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// CSS selectors whose presence marks a not-found page
    pub not_found_selectors: Vec<String>,
    /// Heading or `<title>` texts that mark a not-found page (case-insensitive)
    pub not_found_phrases: Vec<String>,
    /// Abbreviation suffixes for counts, e.g. `K = 1000`
    pub count_suffixes: BTreeMap<String, u64>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            not_found_selectors: vec![
                "[data-error-page]".to_string(),
                "#error-page".to_string(),
                ".not-found".to_string(),
            ],
            not_found_phrases: vec![
                "This item is not available".to_string(),
                "Item not found".to_string(),
                "The requested URL was not found on this server.".to_string(),
                "404. That's an error.".to_string(),
                "Chrome Web Store".to_string(),
            ],
            count_suffixes: BTreeMap::from([
                ("K".to_string(), 1_000),
                ("M".to_string(), 1_000_000),
                ("B".to_string(), 1_000_000_000),
            ]),
        }
    }
}

impl ClientConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> StoreResult<Self> {
        let config: ClientConfig = toml::from_str(content)
            .map_err(|e| ExtensionInfoError::config(format!("TOML parsing error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string
    pub fn to_toml_string(&self) -> StoreResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ExtensionInfoError::config(format!("TOML serialization error: {}", e)))
    }

    /// Load, parse and validate a TOML file
    pub async fn load_from_file(path: &std::path::Path) -> StoreResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ExtensionInfoError::io(format!("Failed to read {}", path.display()), e)
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ExtensionInfoError::Config { message } => {
                ExtensionInfoError::config(format!("In file {}: {}", path.display(), message))
            }
            other => other,
        })
    }

    /// Apply environment overrides
    pub fn apply_env(mut self) -> Self {
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                self.http.base_url = base_url.trim().to_string();
            }
        }
        self
    }

    /// Validate configuration completeness
    pub fn validate(&self) -> StoreResult<()> {
        if url::Url::parse(&self.http.base_url).is_err() {
            return Err(ExtensionInfoError::config(format!(
                "http.base_url '{}' is not a valid URL",
                self.http.base_url
            )));
        }

        if self.http.timeout_secs == 0 {
            return Err(ExtensionInfoError::config("http.timeout_secs must be greater than zero"));
        }

        if self.http.language.trim().is_empty() {
            return Err(ExtensionInfoError::config("http.language must not be empty"));
        }

        if self.cache.max_entries == Some(0) {
            return Err(ExtensionInfoError::config("cache.max_entries must be greater than zero"));
        }

        if let Some(retry) = &self.retry {
            if !(retry.multiplier >= 1.0) {
                return Err(ExtensionInfoError::config("retry.multiplier must be at least 1.0"));
            }
            if retry.initial_delay_ms > retry.max_delay_ms {
                return Err(ExtensionInfoError::config(
                    "retry.initial_delay_ms must not exceed retry.max_delay_ms",
                ));
            }
        }

        if self.urls.hosts.is_empty() {
            return Err(ExtensionInfoError::config("urls.hosts must list at least one host"));
        }

        if let Some(prefix) = self
            .urls
            .path_prefixes
            .iter()
            .find(|p| !p.starts_with('/') || !p.ends_with('/'))
        {
            return Err(ExtensionInfoError::config(format!(
                "urls.path_prefixes entry '{}' must start and end with '/'",
                prefix
            )));
        }

        if self.urls.path_prefixes.is_empty() {
            return Err(ExtensionInfoError::config(
                "urls.path_prefixes must list at least one prefix",
            ));
        }

        for (suffix, multiplier) in &self.extract.count_suffixes {
            if suffix.is_empty() || *multiplier == 0 {
                return Err(ExtensionInfoError::config(format!(
                    "extract.count_suffixes entry '{}' must be non-empty with a positive multiplier",
                    suffix
                )));
            }
        }

        for selector in &self.extract.not_found_selectors {
            if scraper::Selector::parse(selector).is_err() {
                return Err(ExtensionInfoError::config(format!(
                    "extract.not_found_selectors entry '{}' is not a valid CSS selector",
                    selector
                )));
            }
        }

        Ok(())
    }
}
