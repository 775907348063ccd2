//! Field-bag decoding and outbound field mapping.
//!
//! The external store serves every custom field under two naming
//! conventions, camelCase and snake_case, depending on which plugin layer
//! answered the request. Each logical key therefore has an ordered alias
//! list, resolved through one lookup helper; camelCase wins when both are
//! present.

use serde_json::Value;
use wordpress_client::FieldBag;

use crate::types::{SelectorConfig, SemanticField, Snapshot};

/// Bookkeeping field names on the write side.
pub const LAST_SCRAPED: &str = "last_scraped";
pub const LATEST_UPDATE: &str = "latest_update";
pub const ERROR_LOG: &str = "scrape_error_log";

pub const DEFAULT_FREQUENCY_HOURS: u32 = 24;

const SELECTOR_ALIASES: &[(SemanticField, [&str; 2])] = &[
    (SemanticField::Version, ["versionSelector", "version_selector"]),
    (SemanticField::Owner, ["ownerSelector", "owner_selector"]),
    (
        SemanticField::Description,
        ["descriptionSelector", "description_selector"],
    ),
    (SemanticField::ImageUrl, ["imageSelector", "image_selector"]),
    (
        SemanticField::PublishedDate,
        ["publishedSelector", "published_selector"],
    ),
    (
        SemanticField::ProductWebsite,
        ["productWebsiteSelector", "product_website_selector"],
    ),
];

/// Scrape configuration decoded from an entry's field bag.
#[derive(Debug, Clone)]
pub struct EntryConfig {
    pub enabled: bool,
    pub target_url: Option<String>,
    pub selectors: SelectorConfig,
    pub frequency_hours: u32,
    pub last_scraped: Option<String>,
}

impl EntryConfig {
    pub fn from_field_bag(bag: &FieldBag) -> Self {
        let enabled = lookup(bag, &["scrapeEnabled", "scrape_enabled"])
            .map(is_truthy)
            .unwrap_or(false);

        let target_url = lookup(bag, &["scrapeUrl", "scrape_url"])
            .and_then(as_text)
            .filter(|url| !url.trim().is_empty());

        let frequency_hours = lookup(bag, &["scrapeFrequencyHours", "scrape_frequency_hours"])
            .and_then(parse_hours)
            .unwrap_or(DEFAULT_FREQUENCY_HOURS);

        let last_scraped = lookup(bag, &["lastScraped", "last_scraped"])
            .and_then(as_text)
            .filter(|ts| !ts.trim().is_empty());

        let mut selectors = SelectorConfig::default();
        for (field, aliases) in SELECTOR_ALIASES {
            if let Some(selector) = lookup(bag, aliases).and_then(as_text) {
                selectors.set(*field, selector);
            }
        }

        Self {
            enabled,
            target_url,
            selectors,
            frequency_hours,
            last_scraped,
        }
    }
}

/// Look a logical key up under each alias in order; the first present,
/// non-null value wins.
pub fn lookup<'a>(bag: &'a FieldBag, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|key| bag.get(*key))
        .find(|value| !value.is_null())
}

/// Tolerant boolean coercion for flag fields, which arrive as bool, int,
/// or string depending on the store's serializer.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        _ => false,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_hours(value: &Value) -> Option<u32> {
    let hours = match value {
        Value::Number(n) => u32::try_from(n.as_u64()?).ok()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (hours > 0).then_some(hours)
}

/// External store name for each extracted field.
fn store_field_name(field: SemanticField) -> &'static str {
    match field {
        SemanticField::Version => "latest_version",
        SemanticField::Owner => "seller",
        SemanticField::Description => "overview",
        SemanticField::ImageUrl => "logo",
        SemanticField::PublishedDate => "published_date",
        SemanticField::ProductWebsite => "product_website",
    }
}

/// Map a snapshot onto the store's field names, normalizing the version
/// string along the way. Fields absent from the snapshot stay absent.
pub fn map_to_store_fields(snapshot: &Snapshot, product_name: Option<&str>) -> FieldBag {
    let mut fields = FieldBag::new();
    for (field, value) in snapshot.iter() {
        let value = if field == SemanticField::Version {
            normalize_version(value, product_name)
        } else {
            value.to_string()
        };
        fields.insert(store_field_name(field).to_string(), Value::String(value));
    }
    fields
}

/// Reduce a freeform version string ("Gemini 2.5 Flash update") to its
/// short form ("v 2.5 Flash").
///
/// Patterns are tried in priority order (product-name-prefixed, then
/// "version N", then "vN", then a bare dotted number) and the first match
/// wins. A result that does not start with a letter gets a "v " prefix.
/// Unmatched input passes through unchanged.
pub fn normalize_version(raw: &str, product_name: Option<&str>) -> String {
    let mut patterns: Vec<String> = Vec::new();
    if let Some(name) = product_name.map(str::trim).filter(|name| !name.is_empty()) {
        patterns.push(format!(
            r"{}\s+([\d.]+(?:\s+[A-Za-z]+)?)",
            regex::escape(name)
        ));
    }
    patterns.push(r"version\s+([\d.]+(?:\s+[A-Za-z]+)?)".to_string());
    patterns.push(r"v\s*([\d.]+(?:\s+[A-Za-z]+)?)".to_string());
    patterns.push(r"([\d]+\.[\d]+(?:\s+[A-Za-z]+)?)".to_string());

    for pattern in &patterns {
        let Ok(re) = regex::RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
        else {
            continue;
        };
        let Some(caps) = re.captures(raw) else {
            continue;
        };
        let matched = caps
            .get(1)
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().trim())
            .unwrap_or(raw);
        return if matched.chars().next().is_some_and(char::is_alphabetic) {
            matched.to_string()
        } else {
            format!("v {matched}")
        };
    }

    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag(pairs: &[(&str, Value)]) -> FieldBag {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn truthy_accepts_all_encodings() {
        for value in [json!(true), json!(1), json!("1"), json!("true"), json!("YES"), json!("on")] {
            assert!(is_truthy(&value), "{value} should be truthy");
        }
        for value in [json!(false), json!(0), json!(""), json!("no"), json!("enabled"), json!(null)] {
            assert!(!is_truthy(&value), "{value} should be falsy");
        }
    }

    #[test]
    fn lookup_prefers_camel_case() {
        let bag = bag(&[
            ("scrapeUrl", json!("https://camel.example.com")),
            ("scrape_url", json!("https://snake.example.com")),
        ]);
        let config = EntryConfig::from_field_bag(&bag);
        assert_eq!(
            config.target_url.as_deref(),
            Some("https://camel.example.com")
        );
    }

    #[test]
    fn lookup_falls_through_null_to_snake_case() {
        let bag = bag(&[
            ("scrapeUrl", json!(null)),
            ("scrape_url", json!("https://snake.example.com")),
        ]);
        let config = EntryConfig::from_field_bag(&bag);
        assert_eq!(
            config.target_url.as_deref(),
            Some("https://snake.example.com")
        );
    }

    #[test]
    fn entry_config_defaults() {
        let config = EntryConfig::from_field_bag(&FieldBag::new());
        assert!(!config.enabled);
        assert!(config.target_url.is_none());
        assert!(config.selectors.is_empty());
        assert_eq!(config.frequency_hours, DEFAULT_FREQUENCY_HOURS);
        assert!(config.last_scraped.is_none());
    }

    #[test]
    fn frequency_tolerates_string_encoding() {
        let config = EntryConfig::from_field_bag(&bag(&[("scrapeFrequencyHours", json!("12"))]));
        assert_eq!(config.frequency_hours, 12);

        let config = EntryConfig::from_field_bag(&bag(&[("scrape_frequency_hours", json!(48))]));
        assert_eq!(config.frequency_hours, 48);

        // Zero and garbage fall back to the default
        let config = EntryConfig::from_field_bag(&bag(&[("scrapeFrequencyHours", json!(0))]));
        assert_eq!(config.frequency_hours, DEFAULT_FREQUENCY_HOURS);
    }

    #[test]
    fn selectors_decoded_from_both_conventions() {
        let config = EntryConfig::from_field_bag(&bag(&[
            ("versionSelector", json!("h2.version")),
            ("owner_selector", json!(".company")),
            ("imageSelector", json!("")),
        ]));

        assert_eq!(config.selectors.get(SemanticField::Version), Some("h2.version"));
        assert_eq!(config.selectors.get(SemanticField::Owner), Some(".company"));
        assert_eq!(config.selectors.get(SemanticField::ImageUrl), None);
    }

    #[test]
    fn maps_to_store_field_names() {
        let mut snapshot = Snapshot::new();
        snapshot.set(SemanticField::Owner, "Acme");
        snapshot.set(SemanticField::ImageUrl, "https://a.com/logo.png");

        let fields = map_to_store_fields(&snapshot, None);
        assert_eq!(fields.get("seller"), Some(&json!("Acme")));
        assert_eq!(fields.get("logo"), Some(&json!("https://a.com/logo.png")));
        // Omission preserved: nothing else appears
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn version_normalized_during_mapping() {
        let mut snapshot = Snapshot::new();
        snapshot.set(SemanticField::Version, "Gemini 2.5 Flash update");

        let fields = map_to_store_fields(&snapshot, Some("Gemini"));
        assert_eq!(fields.get("latest_version"), Some(&json!("v 2.5 Flash")));
    }

    #[test]
    fn normalize_version_product_prefix() {
        assert_eq!(
            normalize_version("Gemini 2.5 Flash update", Some("Gemini")),
            "v 2.5 Flash"
        );
    }

    #[test]
    fn normalize_version_version_keyword() {
        assert_eq!(normalize_version("version 3.1", None), "v 3.1");
    }

    #[test]
    fn normalize_version_v_prefix() {
        assert_eq!(normalize_version("v2.0.1", None), "v 2.0.1");
    }

    #[test]
    fn normalize_version_bare_number() {
        assert_eq!(normalize_version("Release 4.2 Turbo today", None), "v 4.2 Turbo");
    }

    #[test]
    fn normalize_version_no_match_passes_through() {
        assert_eq!(normalize_version("latest build", None), "latest build");
    }
}
