//! Error types and result aliases for extension lookups.
//!
//! Every failure a caller can observe is one variant of [`ExtensionInfoError`].
//! Field-level extraction problems are not errors: they surface as absent
//! fields on the record instead.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for all extension metadata operations
#[derive(Error, Debug)]
pub enum ExtensionInfoError {
    // Identifier errors
    #[error("Invalid extension ID '{candidate}': expected 32 lowercase alphanumeric characters")]
    InvalidIdentifier { candidate: String },

    #[error("Invalid listing URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    // Store errors
    #[error("Extension '{id}' not found in the Chrome Web Store")]
    NotFound { id: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Rate limited by the Chrome Web Store{}", format_retry_after(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    // Config errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Cloning keeps every variant and message. Underlying causes are carried
/// over as their rendered text, since they are not themselves cloneable.
impl Clone for ExtensionInfoError {
    fn clone(&self) -> Self {
        match self {
            Self::InvalidIdentifier { candidate } => Self::InvalidIdentifier {
                candidate: candidate.clone(),
            },
            Self::InvalidUrl { url, reason } => Self::InvalidUrl {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::NotFound { id } => Self::NotFound { id: id.clone() },
            Self::Network { message, source } => Self::Network {
                message: message.clone(),
                source: source.as_ref().map(|source| source.to_string().into()),
            },
            Self::RateLimited { retry_after } => Self::RateLimited {
                retry_after: *retry_after,
            },
            Self::Config { message } => Self::Config {
                message: message.clone(),
            },
            Self::Io { message, source } => Self::Io {
                message: message.clone(),
                source: std::io::Error::new(source.kind(), source.to_string()),
            },
        }
    }
}

/// Result type alias for extension metadata operations
pub type ExtensionResult<T> = Result<T, ExtensionInfoError>;

fn format_retry_after(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(delay) => format!(" (retry after {}s)", delay.as_secs()),
        None => String::new(),
    }
}

impl ExtensionInfoError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create a network error without an underlying cause
    pub fn network_message(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True when the store definitively reported that the listing does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExtensionInfoError::NotFound { .. })
    }

    /// True for transport failures, rate limiting included
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            ExtensionInfoError::Network { .. } | ExtensionInfoError::RateLimited { .. }
        )
    }

    /// Check if retrying the same request may succeed
    pub fn is_recoverable(&self) -> bool {
        self.is_network()
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            ExtensionInfoError::InvalidIdentifier { .. } => {
                Some("Extension IDs are the 32-character code at the end of the store URL")
            },
            ExtensionInfoError::InvalidUrl { .. } => {
                Some("Use a URL like https://chromewebstore.google.com/detail/<name>/<id>")
            },
            ExtensionInfoError::NotFound { .. } => {
                Some("Check the extension ID; the listing may have been removed or unpublished")
            },
            ExtensionInfoError::Network { .. } => Some("Check your internet connection and try again"),
            ExtensionInfoError::RateLimited { .. } => Some("Wait a moment before sending more requests"),
            _ => None,
        }
    }
}
