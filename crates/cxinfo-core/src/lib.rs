//! # cxinfo-core
//!
//! Core types and utilities shared across all cxinfo crates.
//!
//! This crate provides:
//! - `ExtensionId`, the validated canonical listing identifier
//! - `ExtensionRecord`, the immutable metadata value returned to callers
//! - `ExtensionInfoError` enum for unified error handling
//! - URL and ID normalization
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (ExtensionId, ListingAttributes, ExtensionRecord)
//! - `error`: Error types and result aliases
//! - `utils`: Listing URL normalization

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{ExtensionInfoError, ExtensionResult};
pub use types::{ExtensionId, ExtensionRecord, ListingAttributes};
pub use utils::{normalize, UrlGrammar};
