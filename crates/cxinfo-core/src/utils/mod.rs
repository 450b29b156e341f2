//! Utility functions and helpers.
//!
//! Pure input normalization shared by the store client and the CLI.

pub mod listing_url;

// Re-export commonly used utilities
pub use listing_url::{looks_like_url, normalize, UrlGrammar};
