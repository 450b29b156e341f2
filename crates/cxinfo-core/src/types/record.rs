//! Immutable extension metadata record.

use super::{ExtensionId, ListingAttributes};
use crate::error::ExtensionResult;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Store host used to build canonical listing URLs
pub const STORE_BASE_URL: &str = "https://chromewebstore.google.com";

/// Highest rating the store displays
pub const MAX_RATING: f64 = 5.0;

/// Metadata for one Chrome Web Store listing.
///
/// Fields are private; a record never changes after it has been built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionRecord {
    id: ExtensionId,
    name: Option<String>,
    version: Option<String>,
    developer: Option<String>,
    category: Option<String>,
    description: Option<String>,
    user_count: Option<u64>,
    rating: Option<f64>,
    rating_count: Option<u64>,
    last_updated: Option<NaiveDate>,
    size: Option<String>,
    languages: Option<Vec<String>>,
    website: Option<String>,
    icon_url: Option<String>,
}

impl ExtensionRecord {
    /// Build a record from a raw ID and extracted attributes.
    ///
    /// Fails only when `id` is not a canonical extension ID.
    pub fn new(id: &str, attributes: ListingAttributes) -> ExtensionResult<Self> {
        Ok(Self::from_parts(ExtensionId::parse(id)?, attributes))
    }

    /// Build a record from an already validated ID. Ratings outside `[0, 5]`
    /// are dropped rather than clamped.
    pub fn from_parts(id: ExtensionId, attributes: ListingAttributes) -> Self {
        let ListingAttributes {
            name,
            version,
            developer,
            category,
            description,
            user_count,
            rating,
            rating_count,
            last_updated,
            size,
            languages,
            website,
            icon_url,
        } = attributes;

        Self {
            id,
            name,
            version,
            developer,
            category,
            description,
            user_count,
            rating: rating.filter(|r| r.is_finite() && (0.0..=MAX_RATING).contains(r)),
            rating_count,
            last_updated,
            size,
            languages,
            website,
            icon_url,
        }
    }

    pub fn id(&self) -> &ExtensionId {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn developer(&self) -> Option<&str> {
        self.developer.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn user_count(&self) -> Option<u64> {
        self.user_count
    }

    pub fn rating(&self) -> Option<f64> {
        self.rating
    }

    pub fn rating_count(&self) -> Option<u64> {
        self.rating_count
    }

    pub fn last_updated(&self) -> Option<NaiveDate> {
        self.last_updated
    }

    pub fn size(&self) -> Option<&str> {
        self.size.as_deref()
    }

    pub fn languages(&self) -> Option<&[String]> {
        self.languages.as_deref()
    }

    pub fn website(&self) -> Option<&str> {
        self.website.as_deref()
    }

    pub fn icon_url(&self) -> Option<&str> {
        self.icon_url.as_deref()
    }

    /// Canonical store URL for this listing
    pub fn listing_url(&self) -> String {
        format!("{}/detail/{}", STORE_BASE_URL, self.id)
    }

    /// Export every attribute, in declaration order. Absent values are
    /// present in the map as `Value::Null`.
    pub fn to_map(&self) -> IndexMap<&'static str, Value> {
        let mut map = IndexMap::with_capacity(15);
        map.insert("id", Value::from(self.id.as_str()));
        map.insert("name", opt_value(&self.name));
        map.insert("version", opt_value(&self.version));
        map.insert("developer", opt_value(&self.developer));
        map.insert("category", opt_value(&self.category));
        map.insert("description", opt_value(&self.description));
        map.insert("user_count", opt_value(&self.user_count));
        map.insert("rating", opt_value(&self.rating));
        map.insert("rating_count", opt_value(&self.rating_count));
        map.insert(
            "last_updated",
            opt_value(&self.last_updated.map(|d| d.format("%Y-%m-%d").to_string())),
        );
        map.insert("size", opt_value(&self.size));
        map.insert("languages", opt_value(&self.languages));
        map.insert("website", opt_value(&self.website));
        map.insert("icon_url", opt_value(&self.icon_url));
        map.insert("listing_url", Value::from(self.listing_url()));
        map
    }

    /// Pretty-printed JSON of [`ExtensionRecord::to_map`]
    pub fn to_json(&self) -> String {
        // A map of JSON values with string keys always serializes.
        serde_json::to_string_pretty(&self.to_map()).unwrap_or_default()
    }
}

fn opt_value<T>(value: &Option<T>) -> Value
where
    T: Clone + Into<Value>,
{
    value.clone().map(Into::into).unwrap_or(Value::Null)
}

impl fmt::Display for ExtensionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSLATE: &str = "aapbdbdomjkkjkaonfhkkikfgjllcleb";

    fn full_attributes() -> ListingAttributes {
        ListingAttributes {
            name: Some("Google Translate".to_string()),
            version: Some("2.0.16".to_string()),
            developer: Some("translate.google.com".to_string()),
            category: Some("Tools".to_string()),
            description: Some("View translations easily as you browse the web.".to_string()),
            user_count: Some(10_000_000),
            rating: Some(4.6),
            rating_count: Some(43_000),
            last_updated: NaiveDate::from_ymd_opt(2024, 5, 2),
            size: Some("1.2MiB".to_string()),
            languages: Some(vec!["English".to_string(), "Deutsch".to_string()]),
            website: Some("https://translate.google.com".to_string()),
            icon_url: Some("https://lh3.googleusercontent.com/icon".to_string()),
        }
    }

    #[test]
    fn test_record_creation() {
        let record = ExtensionRecord::new(TRANSLATE, full_attributes()).unwrap();

        assert_eq!(record.id().as_str(), TRANSLATE);
        assert_eq!(record.name(), Some("Google Translate"));
        assert_eq!(record.user_count(), Some(10_000_000));
        assert_eq!(record.rating(), Some(4.6));
        assert_eq!(record.last_updated(), NaiveDate::from_ymd_opt(2024, 5, 2));
    }

    #[test]
    fn test_record_requires_valid_id() {
        let result = ExtensionRecord::new("not-an-id", ListingAttributes::default());
        assert!(matches!(
            result,
            Err(crate::ExtensionInfoError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_missing_fields_do_not_fail() {
        let record = ExtensionRecord::new(TRANSLATE, ListingAttributes::default()).unwrap();
        assert_eq!(record.name(), None);
        assert_eq!(record.developer(), None);
        assert_eq!(record.to_string(), TRANSLATE);
    }

    #[test]
    fn test_out_of_range_rating_is_dropped() {
        for bad in [5.5, -0.1, f64::NAN] {
            let attrs = ListingAttributes {
                rating: Some(bad),
                ..Default::default()
            };
            let record = ExtensionRecord::new(TRANSLATE, attrs).unwrap();
            assert_eq!(record.rating(), None);
        }
    }

    #[test]
    fn test_display() {
        let record = ExtensionRecord::new(TRANSLATE, full_attributes()).unwrap();
        assert_eq!(
            record.to_string(),
            "Google Translate (aapbdbdomjkkjkaonfhkkikfgjllcleb)"
        );
    }

    #[test]
    fn test_export_contains_every_field() {
        let record = ExtensionRecord::new(TRANSLATE, full_attributes()).unwrap();
        let map = record.to_map();

        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(
            keys,
            vec![
                "id", "name", "version", "developer", "category", "description",
                "user_count", "rating", "rating_count", "last_updated", "size",
                "languages", "website", "icon_url", "listing_url",
            ]
        );
        assert_eq!(map["name"], Value::from("Google Translate"));
        assert_eq!(map["user_count"], Value::from(10_000_000u64));
        assert_eq!(map["rating"], Value::from(4.6));
        assert_eq!(map["last_updated"], Value::from("2024-05-02"));
        assert_eq!(map["languages"], serde_json::json!(["English", "Deutsch"]));
        assert_eq!(
            map["listing_url"],
            Value::from("https://chromewebstore.google.com/detail/aapbdbdomjkkjkaonfhkkikfgjllcleb")
        );
    }

    #[test]
    fn test_export_marks_absent_fields_null() {
        let record = ExtensionRecord::new(TRANSLATE, ListingAttributes::default()).unwrap();
        let map = record.to_map();

        assert_eq!(map.len(), 15);
        for key in ["name", "developer", "rating", "last_updated", "languages"] {
            assert_eq!(map[key], Value::Null, "{key} should be null");
        }
    }

    #[test]
    fn test_to_json() {
        let record = ExtensionRecord::new(TRANSLATE, full_attributes()).unwrap();
        let parsed: Value = serde_json::from_str(&record.to_json()).unwrap();
        assert_eq!(parsed["id"], Value::from(TRANSLATE));
        assert_eq!(parsed["category"], Value::from("Tools"));
    }
}
