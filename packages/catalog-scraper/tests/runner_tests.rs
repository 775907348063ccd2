//! Batch orchestration tests: skip rules, due-check gating, write-back
//! contents, and per-entry failure isolation.

use std::sync::Arc;

use catalog_scraper::testing::{FakeCatalogStore, StubExtractor};
use catalog_scraper::{
    CacheRecord, MemoryCache, Runner, ScrapeEngine, SemanticField, Snapshot, SnapshotCache,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use wordpress_client::FieldBag;

fn bag(pairs: &[(&str, Value)]) -> FieldBag {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

/// An enabled entry with a URL and a version selector, never scraped.
fn scrapable_bag(url: &str) -> FieldBag {
    bag(&[
        ("scrapeEnabled", json!(true)),
        ("scrapeUrl", json!(url)),
        ("versionSelector", json!("h2.version")),
    ])
}

fn snapshot(pairs: &[(SemanticField, &str)]) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for (field, value) in pairs {
        snapshot.set(*field, *value);
    }
    snapshot
}

#[tokio::test]
async fn one_failing_entry_does_not_abort_the_batch() {
    let store = Arc::new(
        FakeCatalogStore::new()
            .with_entry(1, "Alpha", scrapable_bag("https://alpha.example.com"))
            .with_entry(2, "Beta", scrapable_bag("https://beta.example.com"))
            .with_entry(3, "Gamma", scrapable_bag("https://gamma.example.com")),
    );
    // The middle entry's fetch times out
    let extractor = StubExtractor::new()
        .with_snapshot(snapshot(&[(SemanticField::Version, "1.0")]))
        .with_failure()
        .with_snapshot(snapshot(&[(SemanticField::Version, "3.0")]));

    let runner = Runner::new(
        store.clone(),
        ScrapeEngine::new(extractor, MemoryCache::new()),
        1,
    );
    let summary = runner.run("ai-review").await.unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.errored, 0);

    // The failing entry got no write at all
    assert!(store.writes_for(2).is_empty());
    assert!(!store.writes_for(1).is_empty());
    assert!(!store.writes_for(3).is_empty());
}

#[tokio::test]
async fn disabled_and_unconfigured_entries_are_skipped_without_fetching() {
    let store = Arc::new(
        FakeCatalogStore::new()
            .with_entry(
                1,
                "Disabled",
                bag(&[
                    ("scrapeEnabled", json!("0")),
                    ("scrapeUrl", json!("https://a.example.com")),
                    ("versionSelector", json!("h2")),
                ]),
            )
            .with_entry(
                2,
                "No URL",
                bag(&[
                    ("scrapeEnabled", json!(true)),
                    ("versionSelector", json!("h2")),
                ]),
            )
            .with_entry(
                3,
                "No selectors",
                bag(&[
                    ("scrapeEnabled", json!(1)),
                    ("scrapeUrl", json!("https://c.example.com")),
                ]),
            ),
    );
    let extractor = Arc::new(StubExtractor::new());

    let runner = Runner::new(
        store.clone(),
        ScrapeEngine::new(extractor.clone(), MemoryCache::new()),
        1,
    );
    let summary = runner.run("ai-review").await.unwrap();

    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.errored, 0);
    assert!(extractor.calls().is_empty());
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn recently_scraped_entry_is_not_due() {
    let last = (Utc::now() - Duration::hours(1)).to_rfc3339();
    let mut fields = scrapable_bag("https://a.example.com");
    fields.insert("scrapeFrequencyHours".to_string(), json!(24));
    fields.insert("lastScraped".to_string(), json!(last));

    let store = Arc::new(FakeCatalogStore::new().with_entry(1, "Alpha", fields));
    let extractor = Arc::new(StubExtractor::new());

    let runner = Runner::new(
        store.clone(),
        ScrapeEngine::new(extractor.clone(), MemoryCache::new()),
        1,
    );
    let summary = runner.run("ai-review").await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert!(extractor.calls().is_empty());
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn changed_entry_writes_mapped_fields_and_bookkeeping() {
    let store = Arc::new(FakeCatalogStore::new().with_entry(
        7,
        "Gemini",
        scrapable_bag("https://gemini.google.com"),
    ));
    let extractor = StubExtractor::new().with_snapshot(snapshot(&[
        (SemanticField::Version, "Gemini 2.5 Flash update"),
        (SemanticField::Owner, "Google"),
    ]));

    let runner = Runner::new(
        store.clone(),
        ScrapeEngine::new(extractor, MemoryCache::new()),
        1,
    );
    let summary = runner.run("ai-review").await.unwrap();

    assert_eq!(summary.updated, 1);

    let writes = store.writes_for(7);
    assert_eq!(writes.len(), 1);
    let update = &writes[0];

    // Mapped + normalized field names and values
    assert_eq!(update.get("latest_version"), Some(&json!("v 2.5 Flash")));
    assert_eq!(update.get("seller"), Some(&json!("Google")));
    // Bookkeeping: timestamp, human-readable date, cleared error trail
    assert!(update.get("last_scraped").is_some());
    assert!(update.get("latest_update").is_some());
    assert_eq!(update.get("scrape_error_log"), Some(&json!("")));
}

#[tokio::test]
async fn unchanged_entry_gets_only_a_timestamp_refresh() {
    let store = Arc::new(FakeCatalogStore::new().with_entry(
        5,
        "Alpha",
        scrapable_bag("https://a.example.com"),
    ));

    let page = snapshot(&[(SemanticField::Version, "2.5")]);
    let cache = Arc::new(MemoryCache::new());
    cache
        .save(
            5,
            &CacheRecord::new(page.clone(), Utc::now() - Duration::hours(48)),
        )
        .await
        .unwrap();

    let extractor = StubExtractor::new().with_snapshot(page);
    let runner = Runner::new(store.clone(), ScrapeEngine::new(extractor, cache), 1);
    let summary = runner.run("ai-review").await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.updated, 0);

    let writes = store.writes_for(5);
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].len(), 1);
    assert!(writes[0].get("last_scraped").is_some());
}

#[tokio::test]
async fn rejected_write_counts_as_errored() {
    let store = Arc::new(
        FakeCatalogStore::new()
            .with_entry(1, "Alpha", scrapable_bag("https://a.example.com"))
            .rejecting_writes(),
    );
    let extractor =
        StubExtractor::new().with_snapshot(snapshot(&[(SemanticField::Version, "1.0")]));

    let runner = Runner::new(
        store.clone(),
        ScrapeEngine::new(extractor, MemoryCache::new()),
        1,
    );
    let summary = runner.run("ai-review").await.unwrap();

    assert_eq!(summary.errored, 1);
    assert_eq!(summary.updated, 0);
}

#[tokio::test]
async fn entry_without_custom_fields_is_skipped() {
    let store = Arc::new(FakeCatalogStore::new().with_entry(9, "Bare", FieldBag::new()));
    let extractor = Arc::new(StubExtractor::new());

    let runner = Runner::new(
        store.clone(),
        ScrapeEngine::new(extractor.clone(), MemoryCache::new()),
        1,
    );
    let summary = runner.run("ai-review").await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert!(extractor.calls().is_empty());
}
