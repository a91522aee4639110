// Path and File Name : /home/diamondeye/rebuild/core/kb/src/store.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Narrow query/write contract against the knowledge base - the only surface the ingestion pipeline and attribution engine are allowed to touch

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::errors::KbError;
use crate::model::{
    AdversaryInventory, AdversaryProfile, AttributionLink, IndicatorCandidate, IndicatorRow,
    KbSummary, NewAttributionEvent, TechniqueCandidate, TechniqueRecord,
};

/// The knowledge base contract.
///
/// Every batch write method (`insert_*`, `upsert_techniques`) is a single
/// transaction: it either applies completely or rolls back and returns an
/// error. Entity inserts are insert-if-absent on the resolution key
/// (adversary name, indicator value) and never clobber existing rows.
#[async_trait]
pub trait KnowledgeStore: Send {
    /// Whether the underlying connection has been dropped/closed.
    fn is_closed(&self) -> bool;

    /// Re-establish a dropped connection. Callers retry the failed
    /// operation exactly once after a successful reconnect.
    async fn reconnect(&mut self) -> Result<(), KbError>;

    /// Point lookup of an indicator by exact value.
    async fn find_indicator(&self, value: &str) -> Result<Option<IndicatorRow>, KbError>;

    /// Batch lookup: name -> adversary identity for every name present.
    async fn adversaries_by_names(&self, names: &[String])
        -> Result<HashMap<String, i64>, KbError>;

    /// Batch lookup: value -> indicator identity for every value present.
    async fn indicators_by_values(
        &self,
        values: &[String],
    ) -> Result<HashMap<String, i64>, KbError>;

    /// Insert-if-absent by name; returns the number of rows created.
    async fn insert_adversaries(&mut self, profiles: &[AdversaryProfile]) -> Result<u64, KbError>;

    /// Insert-if-absent by value; returns the number of rows created.
    async fn insert_indicators(&mut self, candidates: &[IndicatorCandidate])
        -> Result<u64, KbError>;

    /// Append attribution events; callers validate rows before handing them
    /// over (see the batch writer).
    async fn insert_events(&mut self, events: &[NewAttributionEvent]) -> Result<u64, KbError>;

    /// Insert-or-update keyed by tid.
    async fn upsert_techniques(&mut self, records: &[TechniqueRecord]) -> Result<u64, KbError>;

    /// Which of the given tids exist in the techniques table.
    async fn known_tids(&self, tids: &[String]) -> Result<HashSet<String>, KbError>;

    /// Existing (adversary_id, tid) technique-usage links for the given
    /// adversaries, so knowledge-base re-ingestion skips duplicates.
    async fn technique_links(
        &self,
        adversary_ids: &[i64],
    ) -> Result<HashSet<(i64, String)>, KbError>;

    /// Stage-1 pivot: every event referencing the indicator, joined to its
    /// adversary. One entry per event, no dedup.
    async fn attribution_links(&self, indicator_id: i64) -> Result<Vec<AttributionLink>, KbError>;

    /// Stage-2 join: adversaries with at least one usage event on any of the
    /// observed tids, with distinct-match counts, ordered by count
    /// descending then name ascending (deterministic ties).
    async fn technique_candidates(
        &self,
        tids: &[String],
    ) -> Result<Vec<TechniqueCandidate>, KbError>;

    /// Read-side collaborator query: an adversary's indicators grouped by
    /// kind plus its linked technique ids.
    async fn adversary_inventory(&self, name: &str)
        -> Result<Option<AdversaryInventory>, KbError>;

    /// Knowledge base totals.
    async fn summary_counts(&self) -> Result<KbSummary, KbError>;
}
