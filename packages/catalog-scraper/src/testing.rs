//! Test doubles for the scrape pipeline.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use wordpress_client::{CatalogEntry, FieldBag, WriteOutcome};

use crate::extractor::FieldExtractor;
use crate::runner::CatalogStore;
use crate::types::{SelectorConfig, Snapshot};

/// Extractor returning queued snapshots in order; an empty queue yields
/// empty snapshots (fetch failure).
#[derive(Default)]
pub struct StubExtractor {
    responses: Mutex<VecDeque<Snapshot>>,
    calls: Mutex<Vec<String>>,
}

impl StubExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(self, snapshot: Snapshot) -> Self {
        self.responses.lock().unwrap().push_back(snapshot);
        self
    }

    /// Queue a fetch failure.
    pub fn with_failure(self) -> Self {
        self.responses.lock().unwrap().push_back(Snapshot::new());
        self
    }

    /// URLs extracted so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FieldExtractor for StubExtractor {
    async fn extract(&self, url: &str, _selectors: &SelectorConfig) -> Snapshot {
        self.calls.lock().unwrap().push(url.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default()
    }
}

/// In-memory catalog store capturing every write.
#[derive(Default)]
pub struct FakeCatalogStore {
    entries: Vec<CatalogEntry>,
    field_bags: HashMap<i64, FieldBag>,
    writes: Mutex<Vec<(i64, FieldBag)>>,
    reject_writes: bool,
}

impl FakeCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, id: i64, title: &str, fields: FieldBag) -> Self {
        self.entries.push(CatalogEntry {
            id,
            title: title.to_string(),
            fields: fields.clone(),
        });
        self.field_bags.insert(id, fields);
        self
    }

    /// Make every write come back `Rejected`.
    pub fn rejecting_writes(mut self) -> Self {
        self.reject_writes = true;
        self
    }

    /// Writes captured so far, in call order.
    pub fn writes(&self) -> Vec<(i64, FieldBag)> {
        self.writes.lock().unwrap().clone()
    }

    /// Writes captured for one entry.
    pub fn writes_for(&self, entry_id: i64) -> Vec<FieldBag> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == entry_id)
            .map(|(_, fields)| fields.clone())
            .collect()
    }
}

#[async_trait]
impl CatalogStore for FakeCatalogStore {
    async fn list_entries(&self, _category_slug: &str) -> Result<Vec<CatalogEntry>> {
        Ok(self.entries.clone())
    }

    async fn fields(&self, entry_id: i64) -> Result<FieldBag> {
        Ok(self.field_bags.get(&entry_id).cloned().unwrap_or_default())
    }

    async fn set_fields(&self, entry_id: i64, fields: &FieldBag) -> Result<WriteOutcome> {
        self.writes.lock().unwrap().push((entry_id, fields.clone()));
        Ok(if self.reject_writes {
            WriteOutcome::Rejected
        } else {
            WriteOutcome::Accepted
        })
    }
}
