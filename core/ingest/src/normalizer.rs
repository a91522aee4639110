// Path and File Name : /home/diamondeye/rebuild/core/ingest/src/normalizer.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Indicator normalizer - maps raw feed records onto the canonical indicator enumeration and deduplicates by value within a batch

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use kb::{IndicatorCandidate, IndicatorKind};

/// One record as delivered by a feed client: a source-defined type tag, the
/// observable value, and free-text context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub kind: String,
    pub value: String,
    pub context: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NormalizerReport {
    /// Distinct candidates surviving normalization.
    pub accepted: usize,
    /// Records whose type tag does not map onto the canonical enumeration.
    pub skipped_unsupported: usize,
    /// Records with an empty value.
    pub skipped_empty: usize,
    /// Records collapsed into an earlier candidate with the same value.
    pub duplicates_collapsed: usize,
}

/// Normalize a batch of raw feed records.
///
/// Pure and deterministic given the input ordering. Unsupported types and
/// empty values are dropped and counted, never an error. Candidates are
/// deduplicated by value with the last record winning; callers must not rely
/// on which duplicate's description survives.
pub fn normalize(records: &[RawRecord]) -> (Vec<IndicatorCandidate>, NormalizerReport) {
    let mut report = NormalizerReport::default();
    let mut survivors: IndexMap<String, IndicatorCandidate> = IndexMap::new();

    for record in records {
        if record.value.is_empty() {
            report.skipped_empty += 1;
            debug!("Skipping record with empty value (tag '{}')", record.kind);
            continue;
        }
        let Some(kind) = IndicatorKind::from_feed_tag(&record.kind) else {
            report.skipped_unsupported += 1;
            debug!(
                "Skipping record with unsupported type tag '{}' (value '{}')",
                record.kind, record.value
            );
            continue;
        };

        let candidate = IndicatorCandidate {
            kind,
            value: record.value.clone(),
            description: record.context.clone(),
        };
        if survivors.insert(record.value.clone(), candidate).is_some() {
            report.duplicates_collapsed += 1;
        }
    }

    report.accepted = survivors.len();
    (survivors.into_values().collect(), report)
}
