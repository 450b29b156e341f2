//! Intermediate attribute mapping produced by field extraction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Attributes extracted from a listing page, before the record is assembled.
///
/// Every field is independent: `None` means the extractor could not find or
/// parse a value, never that the value is zero or empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingAttributes {
    pub name: Option<String>,
    pub version: Option<String>,
    pub developer: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub user_count: Option<u64>,
    pub rating: Option<f64>,
    pub rating_count: Option<u64>,
    pub last_updated: Option<NaiveDate>,
    pub size: Option<String>,
    pub languages: Option<Vec<String>>,
    pub website: Option<String>,
    pub icon_url: Option<String>,
}

impl ListingAttributes {
    /// Number of attributes that carry a value
    pub fn present_count(&self) -> usize {
        [
            self.name.is_some(),
            self.version.is_some(),
            self.developer.is_some(),
            self.category.is_some(),
            self.description.is_some(),
            self.user_count.is_some(),
            self.rating.is_some(),
            self.rating_count.is_some(),
            self.last_updated.is_some(),
            self.size.is_some(),
            self.languages.is_some(),
            self.website.is_some(),
            self.icon_url.is_some(),
        ]
        .iter()
        .filter(|&&present| present)
        .count()
    }
}
