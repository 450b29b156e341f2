//! Core data types for extension metadata.
//!
//! Defines the canonical extension ID, the attribute mapping produced by
//! extraction, and the immutable record handed back to callers.

pub mod attributes;
pub mod id;
pub mod record;

pub use attributes::ListingAttributes;
pub use id::{ExtensionId, EXTENSION_ID_LEN};
pub use record::{ExtensionRecord, MAX_RATING, STORE_BASE_URL};
