use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The six semantic fields the extractor knows how to pull from a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticField {
    Version,
    Owner,
    Description,
    ImageUrl,
    PublishedDate,
    ProductWebsite,
}

impl SemanticField {
    pub const ALL: [SemanticField; 6] = [
        SemanticField::Version,
        SemanticField::Owner,
        SemanticField::Description,
        SemanticField::ImageUrl,
        SemanticField::PublishedDate,
        SemanticField::ProductWebsite,
    ];

    /// True for fields whose value is a link-like attribute rather than
    /// element text.
    pub fn is_link(&self) -> bool {
        matches!(self, SemanticField::ImageUrl | SemanticField::ProductWebsite)
    }
}

/// Field values extracted from a single fetch.
///
/// Invariant: no key maps to an empty string. Blank extraction results are
/// dropped at insertion, so "extracted as empty" and "failed to extract"
/// are indistinguishable downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot(BTreeMap<SemanticField, String>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value. Values that trim to empty are dropped.
    pub fn set(&mut self, field: SemanticField, value: impl Into<String>) {
        let value = value.into();
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            self.0.insert(field, trimmed.to_string());
        }
    }

    pub fn get(&self, field: SemanticField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// An empty snapshot signals that extraction produced nothing.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SemanticField, &str)> {
        self.0.iter().map(|(field, value)| (*field, value.as_str()))
    }

    /// Fields whose value differs from `prior`, by exact string inequality.
    pub fn diff_against(&self, prior: &Snapshot) -> Snapshot {
        let mut diff = Snapshot::new();
        for (field, value) in self.iter() {
            if prior.get(field) != Some(value) {
                diff.set(field, value);
            }
        }
        diff
    }
}

/// CSS selector per semantic field, as configured on the catalog entry.
/// Blank selectors are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct SelectorConfig(BTreeMap<SemanticField, String>);

impl SelectorConfig {
    pub fn set(&mut self, field: SemanticField, selector: impl Into<String>) {
        let selector = selector.into();
        let trimmed = selector.trim();
        if !trimmed.is_empty() {
            self.0.insert(field, trimmed.to_string());
        }
    }

    pub fn get(&self, field: SemanticField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Most recent snapshot for an entry plus the scrape bookkeeping stamp.
/// Owned exclusively by the snapshot cache.
///
/// Serialized with the fields flattened so a cache file reads as one flat
/// record: `{"version": "...", "owner": "...", "last_scraped": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    #[serde(flatten)]
    pub fields: Snapshot,
    pub last_scraped: DateTime<Utc>,
}

impl CacheRecord {
    pub fn new(fields: Snapshot, last_scraped: DateTime<Utc>) -> Self {
        Self {
            fields,
            last_scraped,
        }
    }

    /// Merge a fresh snapshot in: new values overwrite, fields missing
    /// from the snapshot keep their cached value. The bookkeeping stamp
    /// advances even when nothing changed.
    pub fn merge(&mut self, snapshot: &Snapshot, now: DateTime<Utc>) {
        for (field, value) in snapshot.iter() {
            self.fields.set(field, value);
        }
        self.last_scraped = now;
    }
}

/// Result of one scrape cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// New or changed fields: the full snapshot on a first scrape, the
    /// diff on subsequent ones.
    Changed(Snapshot),
    /// Fetch succeeded but nothing differs from the cached record.
    Unchanged,
    /// Extraction produced nothing; the cache was left untouched.
    Failed,
}
