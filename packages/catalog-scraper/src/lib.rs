//! Change-detection scrape engine for a product catalog.
//!
//! Periodically re-derives structured fields (version, owner, description,
//! logo, publish date, site URL) for catalog entries by fetching each
//! entry's public page, extracting values with configured CSS selectors,
//! diffing against the cached snapshot, and writing only the changed
//! fields back to the content store.
//!
//! The pipeline is `runner` → `engine` → `extractor`, with `cache` as the
//! record of what was last observed and `fields` translating between the
//! store's field bags and the extractor's semantic fields.

pub mod cache;
pub mod config;
pub mod engine;
pub mod extractor;
pub mod fields;
pub mod runner;
pub mod testing;
pub mod types;

pub use cache::{CacheError, FileCache, MemoryCache, SnapshotCache};
pub use config::Config;
pub use engine::{is_due, ScrapeEngine};
pub use extractor::{FieldExtractor, HttpExtractor};
pub use runner::{CatalogStore, RunSummary, Runner};
pub use types::{CacheRecord, Outcome, SelectorConfig, SemanticField, Snapshot};
