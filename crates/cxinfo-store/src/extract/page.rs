//! Parsed listing page and the lookups field strategies are built from.

use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;

use super::normalize::{clean_text, collapse_whitespace};

/// Elements whose text is never visible content
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// `@type` values that identify the listing object in JSON-LD
const LISTING_LD_TYPES: &[&str] = &[
    "WebApplication",
    "SoftwareApplication",
    "BrowserApplication",
    "MobileApplication",
    "Product",
];

/// A listing document with its derived lookup structures
pub struct ListingPage {
    document: Html,
    /// Listing object from embedded JSON-LD, if any
    ld: Option<Value>,
    /// Visible text nodes in document order, whitespace-collapsed
    blocks: Vec<String>,
}

impl ListingPage {
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        let ld = find_listing_ld(&document);
        let blocks = visible_text_blocks(&document);
        Self { document, ld, blocks }
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    pub fn blocks(&self) -> &[String] {
        &self.blocks
    }

    /// First element matching `css`
    pub fn select_first(&self, css: &str) -> Option<ElementRef<'_>> {
        let sel = Selector::parse(css).ok()?;
        self.document.select(&sel).next()
    }

    /// All elements matching `css`
    pub fn select_all(&self, css: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(css) {
            Ok(sel) => self.document.select(&sel).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Trimmed `content` attribute of the first matching `<meta>`
    pub fn meta(&self, css: &str) -> Option<String> {
        let node = self.select_first(css)?;
        clean_text(node.value().attr("content")?)
    }

    /// Collapsed text of the first matching element
    pub fn text_of(&self, css: &str) -> Option<String> {
        let node = self.select_first(css)?;
        clean_text(&node.text().collect::<String>())
    }

    /// JSON-LD value at `path`, rendered as a string. Numbers are stringified;
    /// objects yield their `name`; arrays yield their first usable element.
    pub fn ld_str(&self, path: &[&str]) -> Option<String> {
        let mut current = self.ld.as_ref()?;
        for key in path {
            current = first_of(current).get(*key)?;
        }
        value_to_string(current)
    }

    /// Values that follow a label among the visible text blocks.
    ///
    /// A block equal to a label (ignoring case and a trailing colon) yields the
    /// next block; a block starting with `label:` yields its remainder.
    /// Labels are tried in the order given, so every candidate for the first
    /// label comes before any candidate for the second.
    pub fn labelled_values(&self, labels: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        for label in labels {
            for (i, block) in self.blocks.iter().enumerate() {
                let bare = block.trim_end_matches(':').trim();
                if bare.eq_ignore_ascii_case(label) {
                    if let Some(next) = self.blocks.get(i + 1) {
                        out.push(next.clone());
                    }
                } else if let Some(rest) = strip_label(block, label) {
                    out.push(rest.to_string());
                }
            }
        }
        out
    }
}

/// `"{label}: rest"` → `rest`, case-insensitive
fn strip_label<'a>(block: &'a str, label: &str) -> Option<&'a str> {
    let head = block.get(..label.len())?;
    if !head.eq_ignore_ascii_case(label) {
        return None;
    }
    let rest = block[label.len()..].trim_start().strip_prefix(':')?.trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}

fn first_of(value: &Value) -> &Value {
    match value {
        Value::Array(items) => items.first().unwrap_or(value),
        other => other,
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => clean_text(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("name").and_then(value_to_string),
        Value::Array(items) => items.iter().find_map(value_to_string),
        _ => None,
    }
}

fn visible_text_blocks(document: &Html) -> Vec<String> {
    document
        .root_element()
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let hidden = node.ancestors().any(|a| {
                    a.value()
                        .as_element()
                        .map_or(false, |e| HIDDEN_ELEMENTS.contains(&e.name()))
                });
                if hidden {
                    None
                } else {
                    let block = collapse_whitespace(text);
                    (!block.is_empty()).then_some(block)
                }
            }
            _ => None,
        })
        .collect()
}

fn find_listing_ld(document: &Html) -> Option<Value> {
    let sel = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;
    let mut candidates = Vec::new();

    for script in document.select(&sel) {
        let raw = script.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(raw.trim()) else {
            continue;
        };
        collect_ld_objects(value, &mut candidates);
    }

    let typed = candidates.iter().position(|obj| {
        obj.get("@type").map_or(false, |t| match t {
            Value::String(s) => LISTING_LD_TYPES.contains(&s.as_str()),
            Value::Array(items) => items
                .iter()
                .any(|i| i.as_str().map_or(false, |s| LISTING_LD_TYPES.contains(&s))),
            _ => false,
        })
    });

    match typed {
        Some(idx) => Some(candidates.swap_remove(idx)),
        None => candidates.into_iter().find(|obj| obj.get("name").is_some()),
    }
}

/// Flatten top-level arrays and `@graph` containers into plain objects
fn collect_ld_objects(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_ld_objects(item, out);
            }
        }
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                collect_ld_objects(graph, out);
            }
            if !map.is_empty() {
                out.push(Value::Object(map));
            }
        }
        _ => {}
    }
}
