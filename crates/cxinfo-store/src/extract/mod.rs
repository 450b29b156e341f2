//! Tolerant field extraction from listing pages.
//!
//! The store page is not a stable contract, so every field has its own chain
//! of strategies (embedded JSON-LD, meta tags, labelled text, text patterns)
//! and yields `None` when none of them work. One field failing never affects
//! another.
//!
//! The only hard failure is a page judged to be a not-found page. That call
//! is made from structural markers (a not-found banner, a not-found heading, or
//! the absence of any listing title), never from how many fields were found.

pub mod normalize;
pub mod page;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Selector;
use tracing::{debug, trace, warn};

use crate::config::ExtractConfig;
use crate::fetch::RawListing;
use crate::StoreResult;
use cxinfo_core::error::ExtensionInfoError;
use cxinfo_core::types::{ExtensionId, ListingAttributes};

pub use normalize::SuffixTable;
pub use page::ListingPage;

use normalize::{clean_text, parse_count, parse_date, parse_rating};

/// Suffix the store appends to page titles
const TITLE_SUFFIX: &str = " - Chrome Web Store";

/// Title the store uses for pages that are not a listing
const STORE_TITLE: &str = "Chrome Web Store";

static USERS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d[\d.,\u{a0}\u{202f}]*\s?[a-z]{0,3})\+?\s*users\b").expect("users regex")
});

// Bounded on both sides so dates such as 11/5/2024 never read as a rating
static RATING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^\d/.,])(\d(?:[.,]\d+)?)\s*(?:out of|/)\s*5(?:[.,]0+)?(?:$|[^\d/.,]|[.,](?:$|\D))")
        .expect("rating regex")
});

static RATING_COUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d[\d.,\u{a0}\u{202f}]*\s?[a-z]{0,3})\s*ratings?\b").expect("rating count regex")
});

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+(?:\.\d+){0,3}$").expect("version regex")
});

/// Extracts [`ListingAttributes`] from raw listing pages
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    not_found_selectors: Vec<Selector>,
    /// Lowercased phrases
    not_found_phrases: Vec<String>,
    suffixes: SuffixTable,
}

impl ListingExtractor {
    pub fn new(config: &ExtractConfig) -> Self {
        let not_found_selectors = config
            .not_found_selectors
            .iter()
            .filter_map(|css| match Selector::parse(css) {
                Ok(sel) => Some(sel),
                Err(e) => {
                    warn!("Failed to parse not-found selector '{}': {:?}", css, e);
                    None
                }
            })
            .collect();

        Self {
            not_found_selectors,
            not_found_phrases: config
                .not_found_phrases
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            suffixes: SuffixTable::new(
                config.count_suffixes.iter().map(|(s, m)| (s.as_str(), *m)),
            ),
        }
    }

    /// Extract every field from a listing page.
    ///
    /// Returns `NotFound` when the page is not a listing; otherwise succeeds
    /// with whatever subset of fields could be read.
    pub fn extract(&self, id: &ExtensionId, listing: &RawListing) -> StoreResult<ListingAttributes> {
        let page = ListingPage::parse(listing.as_str());

        if let Some(reason) = self.not_found_reason(&page) {
            debug!(%id, reason, "listing page judged not found");
            return Err(ExtensionInfoError::NotFound { id: id.to_string() });
        }

        let attrs = ListingAttributes {
            name: self.name(&page),
            version: self.version(&page),
            developer: self.developer(&page),
            category: self.category(&page),
            description: self.description(&page),
            user_count: self.user_count(&page),
            rating: self.rating(&page),
            rating_count: self.rating_count(&page),
            last_updated: self.last_updated(&page),
            size: self.size(&page),
            languages: self.languages(&page),
            website: self.website(&page),
            icon_url: self.icon_url(&page),
        };

        trace!(%id, ?attrs, "extracted listing attributes");
        debug!(%id, present = attrs.present_count(), "extracted listing");
        Ok(attrs)
    }

    /// Structural not-found judgement
    fn not_found_reason(&self, page: &ListingPage) -> Option<&'static str> {
        if self
            .not_found_selectors
            .iter()
            .any(|sel| page.document().select(sel).next().is_some())
        {
            return Some("not-found marker element present");
        }

        let headings = ["title", "h1"]
            .iter()
            .filter_map(|css| page.text_of(css))
            .map(|t| t.to_lowercase());
        for heading in headings {
            if self.not_found_phrases.iter().any(|p| *p == heading) {
                return Some("not-found heading present");
            }
        }

        if listing_title(page).is_none() {
            return Some("no listing title");
        }

        None
    }

    fn name(&self, page: &ListingPage) -> Option<String> {
        listing_title(page)
    }

    fn description(&self, page: &ListingPage) -> Option<String> {
        page.ld_str(&["description"])
            .or_else(|| page.meta(r#"meta[property="og:description"]"#))
            .or_else(|| page.meta(r#"meta[name="description"]"#))
    }

    fn version(&self, page: &ListingPage) -> Option<String> {
        page.meta(r#"meta[itemprop="version"]"#)
            .or_else(|| page.ld_str(&["softwareVersion"]))
            .into_iter()
            .chain(page.labelled_values(&["Version"]))
            .find_map(|candidate| {
                let token = candidate.split_whitespace().next()?.trim_start_matches(['v', 'V']);
                VERSION_RE.is_match(token).then(|| token.to_string())
            })
    }

    fn developer(&self, page: &ListingPage) -> Option<String> {
        page.ld_str(&["author"])
            .or_else(|| page.ld_str(&["publisher"]))
            .or_else(|| {
                page.labelled_values(&["Offered by", "Developer", "Publisher"])
                    .into_iter()
                    .find_map(|v| clean_text(&v))
            })
    }

    /// Deepest `/category/...` link wins; navigation links point at shallower
    /// category roots.
    fn category(&self, page: &ListingPage) -> Option<String> {
        let from_links = page
            .select_all(r#"a[href*="/category/"]"#)
            .into_iter()
            .filter_map(|link| {
                let href = link.value().attr("href")?;
                let depth = href
                    .split("/category/")
                    .nth(1)?
                    .split(['?', '#'])
                    .next()?
                    .split('/')
                    .filter(|s| !s.is_empty())
                    .count();
                let text = clean_text(&link.text().collect::<String>())?;
                Some((depth, text))
            })
            .fold(None::<(usize, String)>, |best, (depth, text)| match best {
                Some((d, _)) if d >= depth => best,
                _ => Some((depth, text)),
            })
            .map(|(_, text)| text);

        from_links.or_else(|| page.ld_str(&["applicationCategory"]))
    }

    fn user_count(&self, page: &ListingPage) -> Option<u64> {
        page.ld_str(&["interactionStatistic", "userInteractionCount"])
            .and_then(|raw| parse_count(&raw, &self.suffixes))
            .or_else(|| {
                page.meta(r#"meta[itemprop="interactionCount"]"#).and_then(|raw| {
                    let value = raw.rsplit(':').next()?;
                    parse_count(value, &self.suffixes)
                })
            })
            .or_else(|| self.scan_count(page, &USERS_RE))
    }

    fn rating(&self, page: &ListingPage) -> Option<f64> {
        page.ld_str(&["aggregateRating", "ratingValue"])
            .and_then(|raw| parse_rating(&raw))
            .or_else(|| {
                page.meta(r#"meta[itemprop="ratingValue"]"#)
                    .and_then(|raw| parse_rating(&raw))
            })
            .or_else(|| {
                page.select_all(r#"[aria-label*="out of 5"]"#)
                    .into_iter()
                    .filter_map(|el| el.value().attr("aria-label"))
                    .find_map(|label| capture_rating(label))
            })
            .or_else(|| page.blocks().iter().find_map(|b| capture_rating(b)))
    }

    fn rating_count(&self, page: &ListingPage) -> Option<u64> {
        page.ld_str(&["aggregateRating", "ratingCount"])
            .and_then(|raw| parse_count(&raw, &self.suffixes))
            .or_else(|| self.scan_count(page, &RATING_COUNT_RE))
    }

    fn last_updated(&self, page: &ListingPage) -> Option<NaiveDate> {
        page.labelled_values(&["Updated", "Last updated"])
            .iter()
            .find_map(|v| parse_date(v))
            .or_else(|| {
                page.meta(r#"meta[itemprop="dateModified"]"#)
                    .and_then(|raw| parse_date(&raw))
            })
            .or_else(|| page.ld_str(&["dateModified"]).and_then(|raw| parse_date(&raw)))
    }

    fn size(&self, page: &ListingPage) -> Option<String> {
        page.labelled_values(&["Size"])
            .into_iter()
            .find(|v| v.starts_with(|c: char| c.is_ascii_digit()))
    }

    fn languages(&self, page: &ListingPage) -> Option<Vec<String>> {
        page.labelled_values(&["Languages", "Language"])
            .into_iter()
            .map(|v| {
                v.split(',')
                    .filter_map(clean_text)
                    .filter(|l| !l.to_lowercase().starts_with("see all"))
                    .collect::<Vec<_>>()
            })
            .find(|langs| !langs.is_empty())
    }

    fn website(&self, page: &ListingPage) -> Option<String> {
        page.select_all("a[href]")
            .into_iter()
            .find(|a| {
                clean_text(&a.text().collect::<String>())
                    .map_or(false, |t| t.eq_ignore_ascii_case("Website"))
            })
            .and_then(|a| a.value().attr("href").map(str::to_string))
            .or_else(|| {
                page.labelled_values(&["Website"])
                    .into_iter()
                    .find(|v| v.starts_with("http://") || v.starts_with("https://"))
            })
    }

    fn icon_url(&self, page: &ListingPage) -> Option<String> {
        page.meta(r#"meta[property="og:image"]"#)
            .or_else(|| page.meta(r#"meta[itemprop="image"]"#))
    }

    /// First text block where `re` captures a parsable count
    fn scan_count(&self, page: &ListingPage, re: &Regex) -> Option<u64> {
        page.blocks().iter().find_map(|block| {
            re.captures_iter(block)
                .find_map(|caps| parse_count(caps.get(1)?.as_str(), &self.suffixes))
        })
    }
}

impl Default for ListingExtractor {
    fn default() -> Self {
        Self::new(&ExtractConfig::default())
    }
}

/// Listing title from JSON-LD, `og:title` or the first `h1`
fn listing_title(page: &ListingPage) -> Option<String> {
    page.ld_str(&["name"])
        .or_else(|| {
            page.meta(r#"meta[property="og:title"]"#).and_then(|t| {
                let stripped = t.strip_suffix(TITLE_SUFFIX).unwrap_or(&t);
                clean_text(stripped)
            })
        })
        .or_else(|| page.text_of("h1"))
        .filter(|t| !t.eq_ignore_ascii_case(STORE_TITLE))
}

fn capture_rating(text: &str) -> Option<f64> {
    RATING_RE
        .captures_iter(text)
        .find_map(|caps| parse_rating(caps.get(1)?.as_str()))
}
