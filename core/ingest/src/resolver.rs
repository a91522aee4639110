// Path and File Name : /home/diamondeye/rebuild/core/ingest/src/resolver.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Identity resolver - get-or-create resolution of adversary names and indicator values to stable identities, no-clobber semantics

use std::collections::HashMap;

use tracing::{info, warn};

use kb::{AdversaryProfile, IndicatorCandidate, KnowledgeStore};

use crate::batch::{BatchOutcome, BatchWriter};
use crate::errors::IngestError;

/// Resolve adversary display names to stable identities, creating backing
/// rows for names not already present.
///
/// Lookup, set difference, atomic insert-if-absent, re-fetch. Empty input
/// returns an empty mapping without touching the store; input that all
/// pre-exists performs zero insert operations. A failed insert is logged and
/// the mapping resolvable from pre-existing rows is returned; the run goes
/// on.
pub async fn resolve_adversaries<S: KnowledgeStore>(
    store: &mut S,
    profiles: &[AdversaryProfile],
) -> Result<HashMap<String, i64>, IngestError> {
    if profiles.is_empty() {
        return Ok(HashMap::new());
    }

    let names: Vec<String> = profiles.iter().map(|p| p.name.clone()).collect();
    let mut resolved = store
        .adversaries_by_names(&names)
        .await
        .map_err(|e| IngestError::Resolution(format!("adversary lookup failed: {e}")))?;

    let missing: Vec<AdversaryProfile> = profiles
        .iter()
        .filter(|p| !resolved.contains_key(&p.name))
        .cloned()
        .collect();
    if missing.is_empty() {
        return Ok(resolved);
    }

    if let Err(e) = store.insert_adversaries(&missing).await {
        warn!(
            "Adversary insert failed for {} names; continuing with {} pre-existing identities: {}",
            missing.len(),
            resolved.len(),
            e
        );
        return Ok(resolved);
    }

    // The insert does not hand identities back; re-fetch the created names.
    let missing_names: Vec<String> = missing.into_iter().map(|p| p.name).collect();
    let created = store
        .adversaries_by_names(&missing_names)
        .await
        .map_err(|e| IngestError::Resolution(format!("adversary re-fetch failed: {e}")))?;
    info!("Resolved {} new adversaries", created.len());
    resolved.extend(created);
    Ok(resolved)
}

/// Value -> identity mapping after indicator resolution, plus the write
/// outcome of the insert step (failed chunks leave their values unresolved).
#[derive(Debug, Default)]
pub struct ResolvedIndicators {
    pub map: HashMap<String, i64>,
    pub outcome: BatchOutcome,
}

/// Resolve indicator values to stable identities, creating backing rows in
/// bounded-size chunks through the batch writer.
pub async fn resolve_indicators<S: KnowledgeStore>(
    store: &mut S,
    writer: &BatchWriter,
    candidates: &[IndicatorCandidate],
) -> Result<ResolvedIndicators, IngestError> {
    if candidates.is_empty() {
        return Ok(ResolvedIndicators::default());
    }

    let values: Vec<String> = candidates.iter().map(|c| c.value.clone()).collect();
    let mut map = store
        .indicators_by_values(&values)
        .await
        .map_err(|e| IngestError::Resolution(format!("indicator lookup failed: {e}")))?;

    let missing: Vec<IndicatorCandidate> = candidates
        .iter()
        .filter(|c| !map.contains_key(&c.value))
        .cloned()
        .collect();
    if missing.is_empty() {
        return Ok(ResolvedIndicators {
            map,
            outcome: BatchOutcome::default(),
        });
    }

    let outcome = writer.write_indicators(store, &missing).await;

    let missing_values: Vec<String> = missing.into_iter().map(|c| c.value).collect();
    let created = store
        .indicators_by_values(&missing_values)
        .await
        .map_err(|e| IngestError::Resolution(format!("indicator re-fetch failed: {e}")))?;
    info!(
        "Resolved {} of {} new indicator values ({} chunks failed)",
        created.len(),
        missing_values.len(),
        outcome.failed.len()
    );
    map.extend(created);
    Ok(ResolvedIndicators { map, outcome })
}
