//! Scrape engine: the due-check and the per-entry scrape cycle.
//!
//! The cycle extracts, diffs against the cached record, merges, and
//! persists. The cache's `last_scraped` advances on every cycle that
//! reaches it, including no-change cycles, so repeated no-op scrapes
//! never re-diff against stale state.

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use tracing::{debug, info, warn};

use crate::cache::{CacheError, SnapshotCache};
use crate::extractor::FieldExtractor;
use crate::types::{CacheRecord, Outcome, SelectorConfig};

/// Accepted layouts for store timestamps without an offset.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Decide whether an entry is eligible for scraping.
///
/// `last_scraped` is advisory text from the external store: absent means
/// never scraped (always due), and an unparsable value is treated as due
/// rather than wedging the entry forever. The required wait is the larger
/// of `frequency_hours` and the operator's `min_hours` floor.
pub fn is_due(
    last_scraped: Option<&str>,
    frequency_hours: u32,
    min_hours: u32,
    now: DateTime<Utc>,
) -> bool {
    let Some(raw) = last_scraped.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return true;
    };

    let Some(elapsed) = elapsed_hours(raw, now) else {
        warn!(last_scraped = raw, "Unparsable last-scraped timestamp, treating entry as due");
        return true;
    };

    elapsed >= u32::max(min_hours, frequency_hours) as f64
}

/// Hours since `raw`. Offset-aware timestamps compare against UTC now;
/// naive ones against local wall-clock time, matching how the store
/// records them.
fn elapsed_hours(raw: &str, now: DateTime<Utc>) -> Option<f64> {
    if let Ok(aware) = DateTime::parse_from_rfc3339(raw) {
        let elapsed = now - aware.with_timezone(&Utc);
        return Some(elapsed.num_seconds() as f64 / 3600.0);
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            let elapsed = Local::now().naive_local() - naive;
            return Some(elapsed.num_seconds() as f64 / 3600.0);
        }
    }

    None
}

/// One scrape cycle per call: extract, diff, merge, persist.
pub struct ScrapeEngine<E, C> {
    extractor: E,
    cache: C,
}

impl<E: FieldExtractor, C: SnapshotCache> ScrapeEngine<E, C> {
    pub fn new(extractor: E, cache: C) -> Self {
        Self { extractor, cache }
    }

    pub async fn scrape(
        &self,
        entry_id: i64,
        url: &str,
        selectors: &SelectorConfig,
    ) -> Result<Outcome, CacheError> {
        let latest = self.extractor.extract(url, selectors).await;
        if latest.is_empty() {
            return Ok(Outcome::Failed);
        }

        let now = Utc::now();
        match self.cache.load(entry_id).await? {
            None => {
                let record = CacheRecord::new(latest.clone(), now);
                self.cache.save(entry_id, &record).await?;
                info!(entry_id, fields = latest.len(), "First scrape, cache primed");
                Ok(Outcome::Changed(latest))
            }
            Some(mut record) => {
                let diff = latest.diff_against(&record.fields);
                record.merge(&latest, now);
                self.cache.save(entry_id, &record).await?;

                if diff.is_empty() {
                    debug!(entry_id, "No changes detected");
                    Ok(Outcome::Unchanged)
                } else {
                    info!(entry_id, changed = diff.len(), "Field changes detected");
                    Ok(Outcome::Changed(diff))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn never_scraped_is_always_due() {
        assert!(is_due(None, 24, 1, Utc::now()));
        assert!(is_due(Some(""), 24, 1, Utc::now()));
        assert!(is_due(None, 10_000, 1, Utc::now()));
    }

    #[test]
    fn due_just_past_the_frequency_boundary() {
        let now = Utc::now();
        let last = (now - Duration::hours(24) - Duration::seconds(1)).to_rfc3339();
        assert!(is_due(Some(&last), 24, 1, now));
    }

    #[test]
    fn not_due_just_before_the_frequency_boundary() {
        let now = Utc::now();
        let last = (now - Duration::hours(24) + Duration::seconds(1)).to_rfc3339();
        assert!(!is_due(Some(&last), 24, 1, now));
    }

    #[test]
    fn min_hours_floors_short_frequencies() {
        let now = Utc::now();
        let last = (now - Duration::minutes(90)).to_rfc3339();
        // Frequency says hourly, but the floor is 2h
        assert!(!is_due(Some(&last), 1, 2, now));
        assert!(is_due(Some(&last), 1, 1, now));
    }

    #[test]
    fn naive_timestamp_compared_against_local_time() {
        let last = (Local::now().naive_local() - Duration::hours(3))
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();
        assert!(is_due(Some(&last), 2, 1, Utc::now()));
        assert!(!is_due(Some(&last), 6, 1, Utc::now()));
    }

    #[test]
    fn malformed_timestamp_fails_open() {
        assert!(is_due(Some("not a date"), 24, 1, Utc::now()));
        assert!(is_due(Some("2024-13-45"), 24, 1, Utc::now()));
    }

    #[test]
    fn zulu_suffix_parses_as_utc() {
        let now = Utc::now();
        let last = (now - Duration::hours(30)).format("%Y-%m-%dT%H:%M:%SZ").to_string();
        assert!(is_due(Some(&last), 24, 1, now));
    }
}
