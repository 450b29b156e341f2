//! Terminal output: record summaries, JSON export and error reports.

pub mod colors;
pub mod errors;

use cxinfo_core::error::ExtensionInfoError;
use cxinfo_core::types::ExtensionRecord;

use colors::ColorSupport;
use errors::ErrorFormatter;

/// Output handler for consistent terminal formatting
pub struct OutputHandler {
    colors: ColorSupport,
    errors: ErrorFormatter,
}

impl OutputHandler {
    pub fn new() -> Self {
        let colors = ColorSupport::detect();
        Self {
            colors,
            errors: ErrorFormatter::new(colors),
        }
    }

    /// Print a record to stdout
    pub fn record(&self, record: &ExtensionRecord, json: bool) {
        if json {
            println!("{}", record.to_json());
        } else {
            print!("{}", format_summary(record, &self.colors));
        }
    }

    /// Print an error report to stderr
    pub fn error(&self, error: &ExtensionInfoError) {
        eprint!("{}", self.errors.format_error(error));
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Characters of the description shown in a summary
const DESCRIPTION_WIDTH: usize = 100;

/// Human-readable summary; absent fields are skipped
pub fn format_summary(record: &ExtensionRecord, colors: &ColorSupport) -> String {
    let mut out = format!("{}\n", colors.bold(&record.to_string()));

    let mut line = |label: &str, value: Option<String>| {
        if let Some(value) = value {
            // Pad before painting so escape codes do not count toward the width
            let label = colors.dim(&format!("{:<13}", format!("{label}:")));
            out.push_str(&format!("  {label}{value}\n"));
        }
    };

    line(
        "Description",
        record.description().map(|d| shorten(d, DESCRIPTION_WIDTH)),
    );
    line("Version", record.version().map(str::to_string));
    line("Developer", record.developer().map(str::to_string));
    line("Category", record.category().map(str::to_string));
    line("Users", record.user_count().map(|n| n.to_string()));
    line(
        "Rating",
        record.rating().map(|r| match record.rating_count() {
            Some(count) => format!("{r:.1} ({count} ratings)"),
            None => format!("{r:.1}"),
        }),
    );
    line(
        "Updated",
        record.last_updated().map(|d| d.format("%Y-%m-%d").to_string()),
    );
    line("Size", record.size().map(str::to_string));
    line("Languages", record.languages().map(|l| l.join(", ")));
    line("Website", record.website().map(str::to_string));
    line("Listing", Some(record.listing_url()));

    out
}

/// First `max` characters of `text`, with an ellipsis when cut
fn shorten(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxinfo_core::types::ListingAttributes;

    #[test]
    fn test_summary_skips_absent_fields() {
        let record = ExtensionRecord::new(
            "aapbdbdomjkkjkaonfhkkikfgjllcleb",
            ListingAttributes {
                name: Some("Google Translate".to_string()),
                version: Some("2.0.16".to_string()),
                rating: Some(4.6),
                rating_count: Some(43_000),
                last_updated: chrono::NaiveDate::from_ymd_opt(2024, 5, 2),
                ..ListingAttributes::default()
            },
        )
        .unwrap();

        let summary = format_summary(&record, &ColorSupport::disabled());
        let lines: Vec<&str> = summary.lines().collect();

        assert_eq!(lines[0], "Google Translate (aapbdbdomjkkjkaonfhkkikfgjllcleb)");
        assert!(summary.contains("Version:     2.0.16"));
        assert!(summary.contains("Rating:      4.6 (43000 ratings)"));
        assert!(summary.contains("Updated:     2024-05-02"));
        assert!(!summary.contains("Developer:"));
        assert!(lines
            .last()
            .unwrap()
            .ends_with("https://chromewebstore.google.com/detail/aapbdbdomjkkjkaonfhkkikfgjllcleb"));
    }

    #[test]
    fn test_summary_shortens_description() {
        let description = "Übersetzungen ".repeat(20);
        let record = ExtensionRecord::new(
            "aapbdbdomjkkjkaonfhkkikfgjllcleb",
            ListingAttributes {
                name: Some("Google Translate".to_string()),
                description: Some(description.clone()),
                ..ListingAttributes::default()
            },
        )
        .unwrap();

        let summary = format_summary(&record, &ColorSupport::disabled());
        let line = summary
            .lines()
            .find(|l| l.starts_with("  Description: "))
            .unwrap();
        let shown = line.trim_start_matches("  Description: ");

        assert!(shown.ends_with("..."));
        assert!(shown.chars().count() <= DESCRIPTION_WIDTH + 3);
        assert!(description.starts_with(shown.trim_end_matches("...")));

        assert_eq!(shorten("short", DESCRIPTION_WIDTH), "short");
    }

    #[test]
    fn test_colored_labels_stay_aligned() {
        let record = ExtensionRecord::new(
            "aapbdbdomjkkjkaonfhkkikfgjllcleb",
            ListingAttributes {
                name: Some("Google Translate".to_string()),
                version: Some("2.0.16".to_string()),
                ..ListingAttributes::default()
            },
        )
        .unwrap();

        let summary = format_summary(&record, &ColorSupport::forced());
        assert!(summary.contains("  \x1b[2mVersion:     \x1b[0m2.0.16\n"));
        assert!(summary.contains("  \x1b[2mListing:     \x1b[0mhttps://"));
    }
}
