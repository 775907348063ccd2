//! Snapshot cache: the sole source of truth for "what did we last observe".
//!
//! One record per catalog entry, keyed by the entry's stable store id.
//! Records are created on first successful scrape and overwritten on every
//! later scrape attempt that reaches the cache; the core never deletes
//! them (cache invalidation is an operational action, done by removing
//! the file).

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use tracing::warn;

use crate::types::CacheRecord;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[async_trait]
pub trait SnapshotCache: Send + Sync {
    /// Load the record for an entry. `None` if never written.
    async fn load(&self, entry_id: i64) -> Result<Option<CacheRecord>, CacheError>;

    /// Atomically replace the record for an entry.
    async fn save(&self, entry_id: i64, record: &CacheRecord) -> Result<(), CacheError>;
}

#[async_trait]
impl<T: SnapshotCache + ?Sized> SnapshotCache for std::sync::Arc<T> {
    async fn load(&self, entry_id: i64) -> Result<Option<CacheRecord>, CacheError> {
        (**self).load(entry_id).await
    }

    async fn save(&self, entry_id: i64, record: &CacheRecord) -> Result<(), CacheError> {
        (**self).save(entry_id, record).await
    }
}

/// File-backed cache: one JSON file per entry id under `dir`.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Open (and create if needed) the cache directory.
    pub fn new(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn record_path(&self, entry_id: i64) -> PathBuf {
        self.dir.join(format!("{entry_id}.json"))
    }
}

#[async_trait]
impl SnapshotCache for FileCache {
    async fn load(&self, entry_id: i64) -> Result<Option<CacheRecord>, CacheError> {
        let path = self.record_path(entry_id);

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                // Fail open: an unreadable record is treated as a first scrape
                warn!(entry_id, path = %path.display(), error = %e, "Failed to read cache record");
                return Ok(None);
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(entry_id, path = %path.display(), error = %e, "Corrupt cache record, ignoring");
                Ok(None)
            }
        }
    }

    async fn save(&self, entry_id: i64, record: &CacheRecord) -> Result<(), CacheError> {
        let path = self.record_path(entry_id);
        let tmp = self.dir.join(format!("{entry_id}.json.tmp"));

        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// In-memory cache for tests and development. Data is lost on restart.
pub struct MemoryCache {
    records: RwLock<HashMap<i64, CacheRecord>>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().unwrap().is_empty()
    }
}

#[async_trait]
impl SnapshotCache for MemoryCache {
    async fn load(&self, entry_id: i64) -> Result<Option<CacheRecord>, CacheError> {
        Ok(self.records.read().unwrap().get(&entry_id).cloned())
    }

    async fn save(&self, entry_id: i64, record: &CacheRecord) -> Result<(), CacheError> {
        self.records
            .write()
            .unwrap()
            .insert(entry_id, record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SemanticField, Snapshot};
    use chrono::Utc;

    fn sample_record() -> CacheRecord {
        let mut fields = Snapshot::new();
        fields.set(SemanticField::Version, "2.5");
        fields.set(SemanticField::Owner, "Acme");
        CacheRecord::new(fields, Utc::now())
    }

    #[tokio::test]
    async fn memory_cache_round_trip() {
        let cache = MemoryCache::new();
        assert!(cache.load(42).await.unwrap().is_none());

        let record = sample_record();
        cache.save(42, &record).await.unwrap();

        let loaded = cache.load(42).await.unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn file_cache_round_trip() {
        let dir = std::env::temp_dir().join(format!("snapshot-cache-{}", std::process::id()));
        let cache = FileCache::new(&dir).unwrap();

        assert!(cache.load(7).await.unwrap().is_none());

        let record = sample_record();
        cache.save(7, &record).await.unwrap();

        let loaded = cache.load(7).await.unwrap().unwrap();
        assert_eq!(loaded, record);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn file_cache_ignores_corrupt_records() {
        let dir = std::env::temp_dir().join(format!("snapshot-cache-bad-{}", std::process::id()));
        let cache = FileCache::new(&dir).unwrap();

        std::fs::write(dir.join("9.json"), "{ not json").unwrap();
        assert!(cache.load(9).await.unwrap().is_none());

        std::fs::remove_dir_all(&dir).ok();
    }
}
