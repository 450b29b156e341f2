//! Chrome Web Store listing client
//!
//! This crate turns an extension ID or listing URL into an [`ExtensionRecord`]:
//! it fetches the listing page, extracts fields tolerantly, and caches records
//! per client with at most one in-flight fetch per ID.

pub mod cache;
pub mod client;
pub mod config;
pub mod extract;
pub mod fetch;

// Re-export main types
pub use cache::{CacheEntry, CacheStats, ExtensionCache};
pub use client::{ExtensionClient, ExtensionClientBuilder};
pub use config::{CacheConfig, ClientConfig, ExtractConfig, HttpConfig, RetryConfig};
pub use extract::ListingExtractor;
pub use fetch::{HttpFetcher, ListingFetcher, RawListing, RetryingFetcher};

pub use cxinfo_core::error::ExtensionInfoError;
pub use cxinfo_core::types::{ExtensionId, ExtensionRecord, ListingAttributes};

/// Result type for store operations
pub type StoreResult<T> = Result<T, ExtensionInfoError>;
