//! Listing URL and ID normalization.
//!
//! The accepted host list and path prefixes are data, not code: the store has
//! moved hosts before (`chrome.google.com/webstore` → `chromewebstore.google.com`)
//! and callers can extend the grammar through configuration.

use crate::error::{ExtensionInfoError, ExtensionResult};
use crate::types::ExtensionId;
use serde::{Deserialize, Serialize};
use url::Url;

/// Hosts that serve extension listings
pub const DEFAULT_HOSTS: &[&str] = &["chromewebstore.google.com", "chrome.google.com"];

/// Path prefixes that precede the `[slug/]id` tail
pub const DEFAULT_PATH_PREFIXES: &[&str] = &["/detail/", "/webstore/detail/"];

/// Recognized listing URL shapes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlGrammar {
    /// Accepted hosts, compared case-insensitively
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,

    /// Accepted path prefixes, each ending with `/`
    #[serde(default = "default_path_prefixes")]
    pub path_prefixes: Vec<String>,
}

fn default_hosts() -> Vec<String> {
    DEFAULT_HOSTS.iter().map(|h| h.to_string()).collect()
}

fn default_path_prefixes() -> Vec<String> {
    DEFAULT_PATH_PREFIXES.iter().map(|p| p.to_string()).collect()
}

impl Default for UrlGrammar {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            path_prefixes: default_path_prefixes(),
        }
    }
}

impl UrlGrammar {
    /// Extract the canonical ID from a listing URL.
    ///
    /// Accepts `/detail/{slug}/{id}` and `/detail/{id}` under any configured
    /// prefix. Query strings and fragments are ignored. Every failure, including
    /// a malformed trailing ID, is reported as `InvalidUrl`.
    pub fn parse_url(&self, raw: &str) -> ExtensionResult<ExtensionId> {
        let invalid = |reason: &str| ExtensionInfoError::InvalidUrl {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }

        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        if !self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
            return Err(invalid(&format!("unsupported host '{}'", host)));
        }

        let path = url.path();
        let tail = self
            .path_prefixes
            .iter()
            .find_map(|prefix| path.strip_prefix(prefix.as_str()))
            .ok_or_else(|| invalid("path is not a listing path"))?;

        let segments: Vec<&str> = tail.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() || segments.len() > 2 {
            return Err(invalid("expected /detail/[name/]<id>"));
        }

        let candidate = segments[segments.len() - 1];
        ExtensionId::parse(candidate)
            .map_err(|_| invalid(&format!("'{}' is not a valid extension ID", candidate)))
    }

    /// Normalize either a raw ID or a listing URL
    pub fn normalize(&self, input: &str) -> ExtensionResult<ExtensionId> {
        if looks_like_url(input) {
            self.parse_url(input)
        } else {
            ExtensionId::parse(input)
        }
    }
}

/// Heuristic used by [`UrlGrammar::normalize`] to route input
pub fn looks_like_url(input: &str) -> bool {
    input.contains("://")
}

/// Normalize with the default grammar
pub fn normalize(input: &str) -> ExtensionResult<ExtensionId> {
    UrlGrammar::default().normalize(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TRANSLATE: &str = "aapbdbdomjkkjkaonfhkkikfgjllcleb";

    fn expect_invalid_url(grammar: &UrlGrammar, url: &str) {
        match grammar.parse_url(url) {
            Err(ExtensionInfoError::InvalidUrl { url: u, .. }) => assert_eq!(u, url),
            other => panic!("expected InvalidUrl for {url:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_supported_url_forms() {
        let grammar = UrlGrammar::default();
        for url in [
            "https://chromewebstore.google.com/detail/google-translate/aapbdbdomjkkjkaonfhkkikfgjllcleb",
            "https://chromewebstore.google.com/detail/aapbdbdomjkkjkaonfhkkikfgjllcleb",
            "https://chromewebstore.google.com/detail/google-translate/aapbdbdomjkkjkaonfhkkikfgjllcleb/",
            "https://chromewebstore.google.com/detail/google-translate/aapbdbdomjkkjkaonfhkkikfgjllcleb?hl=en&pli=1",
            "https://chromewebstore.google.com/detail/google-translate/aapbdbdomjkkjkaonfhkkikfgjllcleb#reviews",
            "https://chrome.google.com/webstore/detail/google-translate/aapbdbdomjkkjkaonfhkkikfgjllcleb",
            "http://CHROMEWEBSTORE.google.com/detail/x/aapbdbdomjkkjkaonfhkkikfgjllcleb",
        ] {
            assert_eq!(grammar.parse_url(url).unwrap().as_str(), TRANSLATE, "{url}");
        }
    }

    #[test]
    fn test_rejected_urls() {
        let grammar = UrlGrammar::default();
        for url in [
            "https://example.com/detail/google-translate/aapbdbdomjkkjkaonfhkkikfgjllcleb",
            "https://chromewebstore.google.com/category/extensions",
            "https://chromewebstore.google.com/detail/google-translate",
            "https://chromewebstore.google.com/detail/",
            "https://chromewebstore.google.com/detail/google-translate/AAPBDBDOMJKKJKAONFHKKIKFGJLLCLEB",
            "https://chromewebstore.google.com/detail/a/b/aapbdbdomjkkjkaonfhkkikfgjllcleb",
            "ftp://chromewebstore.google.com/detail/x/aapbdbdomjkkjkaonfhkkikfgjllcleb",
            "not a url at all",
        ] {
            expect_invalid_url(&grammar, url);
        }
    }

    #[test]
    fn test_custom_grammar() {
        let grammar = UrlGrammar {
            hosts: vec!["mirror.example.org".to_string()],
            path_prefixes: vec!["/ext/".to_string()],
        };
        let id = grammar
            .parse_url("https://mirror.example.org/ext/aapbdbdomjkkjkaonfhkkikfgjllcleb")
            .unwrap();
        assert_eq!(id.as_str(), TRANSLATE);
        expect_invalid_url(
            &grammar,
            "https://chromewebstore.google.com/detail/aapbdbdomjkkjkaonfhkkikfgjllcleb",
        );
    }

    #[test]
    fn test_normalize_routes_by_shape() {
        assert_eq!(normalize(TRANSLATE).unwrap().as_str(), TRANSLATE);
        assert!(matches!(
            normalize("invalid-extension-id-12345"),
            Err(ExtensionInfoError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            normalize("https://example.com/detail/aapbdbdomjkkjkaonfhkkikfgjllcleb"),
            Err(ExtensionInfoError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_grammar_deserializes_with_defaults() {
        let grammar: UrlGrammar = serde_json::from_str("{}").unwrap();
        assert_eq!(grammar, UrlGrammar::default());
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(id in "[a-z0-9]{32}") {
            let once = normalize(&id).unwrap();
            let twice = normalize(once.as_str()).unwrap();
            prop_assert_eq!(once.as_str(), id.as_str());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_url_forms_yield_embedded_id(id in "[a-z0-9]{32}", slug in "[a-z][a-z0-9-]{0,40}") {
            let long = format!("https://chromewebstore.google.com/detail/{}/{}", slug, id);
            let short = format!("https://chromewebstore.google.com/detail/{}", id);
            let legacy = format!("https://chrome.google.com/webstore/detail/{}/{}", slug, id);
            for url in [long, short, legacy] {
                let normalized = normalize(&url).unwrap();
                prop_assert_eq!(normalized.as_str(), id.as_str());
            }
        }
    }
}
