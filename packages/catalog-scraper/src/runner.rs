//! Batch orchestration: walk the catalog, scrape due entries, and write
//! changes back to the store.
//!
//! Failure isolation is the one piece of control flow that matters here:
//! everything that can go wrong for an entry is caught at the entry
//! boundary, recorded on that entry, and the loop moves on. No single
//! entry can abort the batch.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Local, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use wordpress_client::{CatalogEntry, FieldBag, WordPressClient, WriteOutcome};

use crate::cache::SnapshotCache;
use crate::engine::{is_due, ScrapeEngine};
use crate::extractor::FieldExtractor;
use crate::fields::{self, EntryConfig};
use crate::types::Outcome;

/// Read/write contract with the external content store.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All published entries in the named category.
    async fn list_entries(&self, category_slug: &str) -> Result<Vec<CatalogEntry>>;

    /// The entry's full custom-field bag.
    async fn fields(&self, entry_id: i64) -> Result<FieldBag>;

    /// Best-effort field write. `Accepted` is not a persistence guarantee.
    async fn set_fields(&self, entry_id: i64, fields: &FieldBag) -> Result<WriteOutcome>;
}

#[async_trait]
impl<T: CatalogStore + ?Sized> CatalogStore for std::sync::Arc<T> {
    async fn list_entries(&self, category_slug: &str) -> Result<Vec<CatalogEntry>> {
        (**self).list_entries(category_slug).await
    }

    async fn fields(&self, entry_id: i64) -> Result<FieldBag> {
        (**self).fields(entry_id).await
    }

    async fn set_fields(&self, entry_id: i64, fields: &FieldBag) -> Result<WriteOutcome> {
        (**self).set_fields(entry_id, fields).await
    }
}

#[async_trait]
impl CatalogStore for WordPressClient {
    async fn list_entries(&self, category_slug: &str) -> Result<Vec<CatalogEntry>> {
        Ok(WordPressClient::list_entries(self, category_slug).await?)
    }

    async fn fields(&self, entry_id: i64) -> Result<FieldBag> {
        Ok(WordPressClient::fields(self, entry_id).await?)
    }

    async fn set_fields(&self, entry_id: i64, fields: &FieldBag) -> Result<WriteOutcome> {
        Ok(WordPressClient::set_fields(self, entry_id, fields).await?)
    }
}

/// Counts for one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub updated: usize,
    pub skipped: usize,
    pub errored: usize,
    pub total: usize,
}

enum EntryResult {
    Updated,
    Skipped,
    Errored,
}

pub struct Runner<S, E, C> {
    store: S,
    engine: ScrapeEngine<E, C>,
    min_hours: u32,
}

impl<S, E, C> Runner<S, E, C>
where
    S: CatalogStore,
    E: FieldExtractor,
    C: SnapshotCache,
{
    pub fn new(store: S, engine: ScrapeEngine<E, C>, min_hours: u32) -> Self {
        Self {
            store,
            engine,
            min_hours,
        }
    }

    /// Run one batch over every entry in the category.
    pub async fn run(&self, category_slug: &str) -> Result<RunSummary> {
        let entries = self
            .store
            .list_entries(category_slug)
            .await
            .context("Failed to list catalog entries")?;

        info!(category = category_slug, count = entries.len(), "Processing catalog");

        let mut summary = RunSummary {
            total: entries.len(),
            ..Default::default()
        };

        for entry in &entries {
            match self.process_entry(entry).await {
                Ok(EntryResult::Updated) => summary.updated += 1,
                Ok(EntryResult::Skipped) => summary.skipped += 1,
                Ok(EntryResult::Errored) => summary.errored += 1,
                Err(error) => {
                    warn!(entry_id = entry.id, title = %entry.title, error = %error, "Entry failed");
                    self.record_error(entry.id, &error).await;
                    summary.errored += 1;
                }
            }
        }

        info!(
            updated = summary.updated,
            skipped = summary.skipped,
            errored = summary.errored,
            total = summary.total,
            "Scrape run complete"
        );

        Ok(summary)
    }

    async fn process_entry(&self, entry: &CatalogEntry) -> Result<EntryResult> {
        let bag = self.store.fields(entry.id).await?;
        if bag.is_empty() {
            debug!(entry_id = entry.id, "No custom fields, skipping");
            return Ok(EntryResult::Skipped);
        }

        let config = EntryConfig::from_field_bag(&bag);

        if !config.enabled {
            debug!(entry_id = entry.id, "Scraping disabled, skipping");
            return Ok(EntryResult::Skipped);
        }
        let Some(url) = config.target_url.as_deref() else {
            debug!(entry_id = entry.id, "No scrape URL configured, skipping");
            return Ok(EntryResult::Skipped);
        };
        if config.selectors.is_empty() {
            debug!(entry_id = entry.id, "No selectors configured, skipping");
            return Ok(EntryResult::Skipped);
        }
        if !is_due(
            config.last_scraped.as_deref(),
            config.frequency_hours,
            self.min_hours,
            Utc::now(),
        ) {
            debug!(
                entry_id = entry.id,
                frequency_hours = config.frequency_hours,
                "Not due yet, skipping"
            );
            return Ok(EntryResult::Skipped);
        }

        info!(entry_id = entry.id, title = %entry.title, url, "Scraping entry");

        match self.engine.scrape(entry.id, url, &config.selectors).await? {
            Outcome::Failed => {
                warn!(entry_id = entry.id, url, "Extraction failed, nothing written");
                Ok(EntryResult::Skipped)
            }
            Outcome::Unchanged => {
                // Refresh the store's own bookkeeping stamp so the
                // due-check doesn't re-trigger every run.
                let mut updates = FieldBag::new();
                updates.insert(
                    fields::LAST_SCRAPED.to_string(),
                    Value::String(Utc::now().to_rfc3339()),
                );
                self.store.set_fields(entry.id, &updates).await?;
                debug!(entry_id = entry.id, "No changes, timestamp refreshed");
                Ok(EntryResult::Skipped)
            }
            Outcome::Changed(changes) => {
                let mut updates = fields::map_to_store_fields(&changes, Some(&entry.title));
                updates.insert(
                    fields::LAST_SCRAPED.to_string(),
                    Value::String(Utc::now().to_rfc3339()),
                );
                updates.insert(
                    fields::LATEST_UPDATE.to_string(),
                    Value::String(Local::now().format("%Y, %b, %d").to_string()),
                );
                updates.insert(fields::ERROR_LOG.to_string(), Value::String(String::new()));

                match self.store.set_fields(entry.id, &updates).await? {
                    WriteOutcome::Accepted => {
                        info!(
                            entry_id = entry.id,
                            fields = updates.len(),
                            "Store updated"
                        );
                        Ok(EntryResult::Updated)
                    }
                    WriteOutcome::Rejected => {
                        warn!(entry_id = entry.id, "Store rejected the update");
                        Ok(EntryResult::Errored)
                    }
                }
            }
        }
    }

    /// Best-effort error trail: a failure to record the error is itself
    /// swallowed.
    async fn record_error(&self, entry_id: i64, error: &anyhow::Error) {
        let mut updates = FieldBag::new();
        updates.insert(
            fields::ERROR_LOG.to_string(),
            Value::String(format!("{}: {}", Utc::now().to_rfc3339(), error)),
        );
        if let Err(e) = self.store.set_fields(entry_id, &updates).await {
            warn!(entry_id, error = %e, "Failed to record scrape error");
        }
    }
}
