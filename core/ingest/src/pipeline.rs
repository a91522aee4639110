// Path and File Name : /home/diamondeye/rebuild/core/ingest/src/pipeline.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Ingestion pipeline runs - sequential normalization, identity resolution, link building and batched writes for feed batches and knowledge base snapshots

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use kb::{AdversaryProfile, IndicatorCandidate, KnowledgeStore, TechniqueRecord};

use crate::batch::{BatchTuning, BatchWriter};
use crate::errors::IngestError;
use crate::linker::{build_indicator_events, build_technique_events, SourceClass};
use crate::normalizer::{normalize, RawRecord};
use crate::resolver::{resolve_adversaries, resolve_indicators, ResolvedIndicators};

/// One normalized unit of feed output, as handed over by a fetch task:
/// the attributed source, its confidence class, a human-readable label
/// (pulse name, blocklist title) and the raw records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedBatch {
    pub source_name: String,
    pub source_class: SourceClass,
    pub label: String,
    pub records: Vec<RawRecord>,
}

/// A curated adversary group and the technique ids it is known to use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupProfile {
    pub profile: AdversaryProfile,
    pub technique_tids: Vec<String>,
}

/// Curated ATT&CK content for knowledge-base ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseSnapshot {
    pub techniques: Vec<TechniqueRecord>,
    pub groups: Vec<GroupProfile>,
}

/// Counters for one ingestion run, consumed read-only by the presentation
/// collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionSummary {
    pub run_id: Uuid,
    pub accepted: usize,
    pub skipped_unsupported: usize,
    pub skipped_empty: usize,
    pub duplicates_collapsed: usize,
    pub adversaries_resolved: usize,
    pub indicators_resolved: usize,
    pub techniques_upserted: u64,
    pub events_written: u64,
    pub events_dropped: usize,
    pub links_skipped: usize,
    pub failed_chunks: usize,
}

impl IngestionSummary {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            accepted: 0,
            skipped_unsupported: 0,
            skipped_empty: 0,
            duplicates_collapsed: 0,
            adversaries_resolved: 0,
            indicators_resolved: 0,
            techniques_upserted: 0,
            events_written: 0,
            events_dropped: 0,
            links_skipped: 0,
            failed_chunks: 0,
        }
    }
}

/// Reconnect a connection that dropped between runs. Failure here is the
/// one fatal condition: a run never starts against an unreachable store.
async fn ensure_connected<S: KnowledgeStore>(store: &mut S) -> Result<(), IngestError> {
    if store.is_closed() {
        warn!("Knowledge base connection closed at run start; reconnecting");
        store.reconnect().await?;
    }
    Ok(())
}

/// Run the feed ingestion pipeline over a set of normalized source batches.
///
/// Sequential stages: normalize -> resolve adversaries -> resolve indicators
/// (chunked insert-if-absent) -> build sighting events -> chunked event
/// writes. Failures are contained per batch/chunk and reported through the
/// summary; the run only aborts if the store is unreachable.
pub async fn run_feed_ingestion<S: KnowledgeStore>(
    store: &mut S,
    tuning: BatchTuning,
    batches: &[FeedBatch],
) -> Result<IngestionSummary, IngestError> {
    let run_id = Uuid::new_v4();
    info!(
        "Starting feed ingestion run {} ({} source batches)",
        run_id,
        batches.len()
    );
    ensure_connected(store).await?;
    let writer = BatchWriter::new(tuning);
    let mut summary = IngestionSummary::new(run_id);

    let mut normalized: Vec<Vec<IndicatorCandidate>> = Vec::with_capacity(batches.len());
    for batch in batches {
        let (candidates, report) = normalize(&batch.records);
        summary.skipped_unsupported += report.skipped_unsupported;
        summary.skipped_empty += report.skipped_empty;
        summary.duplicates_collapsed += report.duplicates_collapsed;
        normalized.push(candidates);
    }

    // One resolution pass over the union of all batches; cross-batch
    // duplicates collapse here, last batch wins.
    let mut union: IndexMap<String, IndicatorCandidate> = IndexMap::new();
    for candidates in &normalized {
        for c in candidates {
            if union.insert(c.value.clone(), c.clone()).is_some() {
                summary.duplicates_collapsed += 1;
            }
        }
    }
    summary.accepted = union.len();
    let union: Vec<IndicatorCandidate> = union.into_values().collect();

    let mut sources: IndexMap<String, AdversaryProfile> = IndexMap::new();
    for batch in batches {
        sources
            .entry(batch.source_name.clone())
            .or_insert_with(|| AdversaryProfile::named(batch.source_name.clone()));
    }
    let profiles: Vec<AdversaryProfile> = sources.into_values().collect();
    let adversary_ids = match resolve_adversaries(store, &profiles).await {
        Ok(map) => map,
        Err(e) => {
            error!("Adversary resolution failed for run {}: {}", run_id, e);
            HashMap::new()
        }
    };
    summary.adversaries_resolved = adversary_ids.len();

    let resolved = match resolve_indicators(store, &writer, &union).await {
        Ok(r) => r,
        Err(e) => {
            error!("Indicator resolution failed for run {}: {}", run_id, e);
            ResolvedIndicators::default()
        }
    };
    summary.indicators_resolved = resolved.map.len();
    summary.failed_chunks += resolved.outcome.failed.len();

    let observed_at = Utc::now();
    let mut events = Vec::new();
    for (batch, candidates) in batches.iter().zip(&normalized) {
        let Some(&adversary_id) = adversary_ids.get(&batch.source_name) else {
            warn!(
                "No identity for source '{}'; dropping {} events",
                batch.source_name,
                candidates.len()
            );
            summary.events_dropped += candidates.len();
            continue;
        };
        let (batch_events, report) = build_indicator_events(
            adversary_id,
            candidates,
            &resolved.map,
            batch.source_class,
            &batch.label,
            observed_at,
        );
        summary.events_dropped += report.dropped;
        events.extend(batch_events);
    }

    let outcome = writer.write_events(store, &events).await;
    summary.events_written = outcome.written;
    summary.events_dropped += outcome.dropped_invalid as usize;
    summary.failed_chunks += outcome.failed.len();

    info!(
        "Feed ingestion run {} complete: {} events written, {} dropped, {} failed chunks",
        run_id, summary.events_written, summary.events_dropped, summary.failed_chunks
    );
    Ok(summary)
}

/// Run the knowledge-base ingestion pipeline over a curated snapshot.
///
/// Technique upserts first (FK anchor), then group identity resolution with
/// descriptions and aliases carried, then technique-usage events at full
/// confidence. Unknown tids are dropped; pairs already linked are skipped so
/// re-ingestion does not duplicate facts.
pub async fn run_knowledge_base_ingestion<S: KnowledgeStore>(
    store: &mut S,
    tuning: BatchTuning,
    snapshot: &KnowledgeBaseSnapshot,
) -> Result<IngestionSummary, IngestError> {
    let run_id = Uuid::new_v4();
    info!(
        "Starting knowledge base ingestion run {} ({} techniques, {} groups)",
        run_id,
        snapshot.techniques.len(),
        snapshot.groups.len()
    );
    ensure_connected(store).await?;
    let writer = BatchWriter::new(tuning);
    let mut summary = IngestionSummary::new(run_id);

    let mut techniques: IndexMap<String, TechniqueRecord> = IndexMap::new();
    for t in &snapshot.techniques {
        techniques.insert(t.tid.clone(), t.clone());
    }
    let techniques: Vec<TechniqueRecord> = techniques.into_values().collect();
    let outcome = writer.upsert_techniques(store, &techniques).await;
    summary.techniques_upserted = outcome.written;
    summary.failed_chunks += outcome.failed.len();

    let mut profiles: IndexMap<String, AdversaryProfile> = IndexMap::new();
    for g in &snapshot.groups {
        profiles
            .entry(g.profile.name.clone())
            .or_insert_with(|| g.profile.clone());
    }
    let profiles: Vec<AdversaryProfile> = profiles.into_values().collect();
    let adversary_ids = match resolve_adversaries(store, &profiles).await {
        Ok(map) => map,
        Err(e) => {
            error!("Group resolution failed for run {}: {}", run_id, e);
            HashMap::new()
        }
    };
    summary.adversaries_resolved = adversary_ids.len();

    let mut all_tids: Vec<String> = snapshot
        .groups
        .iter()
        .flat_map(|g| g.technique_tids.iter().cloned())
        .collect();
    all_tids.sort();
    all_tids.dedup();
    let known = match store.known_tids(&all_tids).await {
        Ok(k) => k,
        Err(e) => {
            error!("Technique lookup failed for run {}: {}", run_id, e);
            HashSet::new()
        }
    };
    let ids: Vec<i64> = adversary_ids.values().copied().collect();
    let existing = match store.technique_links(&ids).await {
        Ok(l) => l,
        Err(e) => {
            error!("Existing-link lookup failed for run {}: {}", run_id, e);
            HashSet::new()
        }
    };

    let observed_at = Utc::now();
    let mut events = Vec::new();
    for g in &snapshot.groups {
        let Some(&adversary_id) = adversary_ids.get(&g.profile.name) else {
            warn!(
                "No identity for group '{}'; dropping {} technique links",
                g.profile.name,
                g.technique_tids.len()
            );
            summary.events_dropped += g.technique_tids.len();
            continue;
        };
        let (group_events, report) = build_technique_events(
            adversary_id,
            &g.profile.name,
            &g.technique_tids,
            &known,
            &existing,
            observed_at,
        );
        summary.events_dropped += report.dropped;
        summary.links_skipped += report.skipped;
        events.extend(group_events);
    }
    summary.accepted = events.len();

    let outcome = writer.write_events(store, &events).await;
    summary.events_written = outcome.written;
    summary.events_dropped += outcome.dropped_invalid as usize;
    summary.failed_chunks += outcome.failed.len();

    info!(
        "Knowledge base ingestion run {} complete: {} techniques upserted, {} events written, {} skipped as already linked",
        run_id, summary.techniques_upserted, summary.events_written, summary.links_skipped
    );
    Ok(summary)
}
