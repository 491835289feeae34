use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime};
use tracing::debug;

use crate::types::{SchemaPresence, SurveyRecord};

/// Parse `_ingest_ts`. Accepts naive ISO-8601 and RFC 3339; anything else
/// (or a missing value) is `None`.
pub fn parse_ingest_ts(ingest_ts: Option<&str>) -> Option<NaiveDateTime> {
    let text = ingest_ts?.trim();
    text.parse::<NaiveDateTime>()
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").ok())
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.naive_utc()))
}

/// Ordering key for deduplication. Missing and unparseable timestamps sort
/// after every parsed one, so an unstamped record outranks a stamped
/// duplicate.
pub fn ingest_sort_key(ingest_ts: Option<&str>) -> (bool, Option<NaiveDateTime>) {
    let parsed = parse_ingest_ts(ingest_ts);
    (parsed.is_none(), parsed)
}

/// Collapse records sharing a business key, keeping the most recently
/// ingested version.
///
/// Records are stably sorted by ingestion timestamp and the last record of
/// each key wins, so equal timestamps resolve to the later record in input
/// order. Records without a usable key are never merged. The sorted order is
/// the output order.
pub fn deduplicate(records: Vec<SurveyRecord>, presence: SchemaPresence) -> Vec<SurveyRecord> {
    if !presence.business_key {
        debug!("No business key column, skipping deduplication");
        return records;
    }

    let before = records.len();
    let mut records = records;
    if presence.ingest_ts {
        // sort_by_cached_key is stable
        records.sort_by_cached_key(|r| ingest_sort_key(r.provenance.ingest_ts.as_deref()));
    }

    // Walk backwards so the first occurrence seen is the survivor
    let mut seen: HashSet<String> = HashSet::new();
    let mut survivors: Vec<SurveyRecord> = Vec::with_capacity(records.len());
    for record in records.into_iter().rev() {
        let keep = match record.business_key() {
            Some(key) => seen.insert(key.to_string()),
            None => true,
        };
        if keep {
            survivors.push(record);
        }
    }
    survivors.reverse();

    let removed = before - survivors.len();
    if removed > 0 {
        debug!(removed, remaining = survivors.len(), "Collapsed duplicated responses");
    }
    crate::observability::metrics::dedupe::duplicates_removed(removed);

    survivors
}
