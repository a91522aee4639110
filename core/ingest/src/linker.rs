// Path and File Name : /home/diamondeye/rebuild/core/ingest/src/linker.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Link builder - constructs attribution events from resolved identities and source metadata, with per-source-class confidence policy

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use kb::{IndicatorCandidate, NewAttributionEvent};

/// Confidence assigned to curated attack-pattern facts.
pub const KNOWLEDGE_BASE_CONFIDENCE: f64 = 1.0;
/// Confidence assigned to confirmed command-and-control tracker sightings.
pub const C2_TRACKER_CONFIDENCE: f64 = 0.95;
/// Confidence assigned to generic aggregated-feed sightings.
pub const AGGREGATED_FEED_CONFIDENCE: f64 = 0.8;

/// Source classification driving the confidence policy. This is ingestion
/// policy, not correlator policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceClass {
    KnowledgeBase,
    C2Tracker,
    AggregatedFeed,
}

impl SourceClass {
    pub fn confidence(self) -> f64 {
        match self {
            SourceClass::KnowledgeBase => KNOWLEDGE_BASE_CONFIDENCE,
            SourceClass::C2Tracker => C2_TRACKER_CONFIDENCE,
            SourceClass::AggregatedFeed => AGGREGATED_FEED_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LinkReport {
    pub built: usize,
    /// Events referencing an identity that failed to resolve. Never written
    /// with a null foreign key; dropped here instead.
    pub dropped: usize,
    /// Technique links already present in the knowledge base.
    pub skipped: usize,
}

/// Build indicator-sighting events for one source batch.
pub fn build_indicator_events(
    adversary_id: i64,
    candidates: &[IndicatorCandidate],
    indicator_ids: &HashMap<String, i64>,
    class: SourceClass,
    label: &str,
    observed_at: DateTime<Utc>,
) -> (Vec<NewAttributionEvent>, LinkReport) {
    let mut report = LinkReport::default();
    let mut events = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let Some(&indicator_id) = indicator_ids.get(&candidate.value) else {
            report.dropped += 1;
            continue;
        };
        let description = if candidate.description.is_empty() {
            label.to_string()
        } else {
            candidate.description.clone()
        };
        events.push(NewAttributionEvent {
            description,
            adversary_id,
            indicator_id: Some(indicator_id),
            capability_id: None,
            technique_id: None,
            event_time: observed_at,
            confidence_score: class.confidence(),
        });
        report.built += 1;
    }

    if report.dropped > 0 {
        info!(
            "Dropped {} events for '{}' whose indicators failed to resolve",
            report.dropped, label
        );
    }
    (events, report)
}

/// Build technique-usage events for one adversary group out of the curated
/// knowledge base. Tids absent from the techniques table are dropped; pairs
/// already linked are skipped so re-ingestion does not duplicate facts.
pub fn build_technique_events(
    adversary_id: i64,
    group_name: &str,
    tids: &[String],
    known_tids: &HashSet<String>,
    existing_links: &HashSet<(i64, String)>,
    observed_at: DateTime<Utc>,
) -> (Vec<NewAttributionEvent>, LinkReport) {
    let mut report = LinkReport::default();
    let mut events = Vec::with_capacity(tids.len());
    let mut seen: HashSet<&String> = HashSet::new();

    for tid in tids {
        if !seen.insert(tid) {
            continue;
        }
        if !known_tids.contains(tid) {
            report.dropped += 1;
            continue;
        }
        if existing_links.contains(&(adversary_id, tid.clone())) {
            report.skipped += 1;
            continue;
        }
        events.push(NewAttributionEvent {
            description: format!("Knowledge base: {group_name} uses {tid}"),
            adversary_id,
            indicator_id: None,
            capability_id: None,
            technique_id: Some(tid.clone()),
            event_time: observed_at,
            confidence_score: KNOWLEDGE_BASE_CONFIDENCE,
        });
        report.built += 1;
    }

    if report.dropped > 0 {
        info!(
            "Dropped {} technique links for '{}' referencing unknown tids",
            report.dropped, group_name
        );
    }
    (events, report)
}
