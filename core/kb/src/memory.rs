// Path and File Name : /home/diamondeye/rebuild/core/kb/src/memory.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Embedded in-memory knowledge store - deterministic ordering, same insert-if-absent semantics as the PostgreSQL store, with fault injection hooks for tests

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::errors::KbError;
use crate::model::{
    AdversaryInventory, AdversaryProfile, AttributionLink, IndicatorCandidate, IndicatorRow,
    KbSummary, NewAttributionEvent, TechniqueCandidate, TechniqueRecord,
};
use crate::store::KnowledgeStore;

struct AdversaryRecord {
    id: i64,
    profile: AdversaryProfile,
}

struct IndicatorRecord {
    id: i64,
    candidate: IndicatorCandidate,
}

/// How many times each write entry point has been invoked. Resolver
/// idempotence tests assert on these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub adversary_inserts: usize,
    pub indicator_inserts: usize,
    pub event_inserts: usize,
    pub technique_upserts: usize,
}

/// In-memory `KnowledgeStore`.
///
/// Mirrors the PostgreSQL store's contract: batch writes are atomic (an
/// injected failure leaves no partial state), entity inserts never clobber
/// rows that already hold the resolution key, and grouped queries order
/// deterministically (count descending, name ascending).
#[derive(Default)]
pub struct MemoryStore {
    adversaries: Vec<AdversaryRecord>,
    indicators: Vec<IndicatorRecord>,
    techniques: BTreeMap<String, TechniqueRecord>,
    events: Vec<NewAttributionEvent>,
    closed: bool,
    reconnects: usize,
    // fault injection (1-based call numbers)
    adversary_insert_failures: HashSet<usize>,
    indicator_insert_failures: HashSet<usize>,
    event_insert_failures: HashSet<usize>,
    disconnect_reads: AtomicUsize,
    counts: CallCounts,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the server dropping the connection; every operation fails
    /// with a connectivity error until `reconnect` is called.
    pub fn drop_connection(&mut self) {
        self.closed = true;
    }

    /// Fail the next `n` read operations with a connectivity error without
    /// marking the connection closed (mid-query connection reset).
    pub fn disconnect_next_reads(&mut self, n: usize) {
        self.disconnect_reads.fetch_add(n, Ordering::Relaxed);
    }

    /// Fail the given (1-based) `insert_adversaries` call with a query error.
    pub fn fail_adversary_insert_call(&mut self, call: usize) {
        self.adversary_insert_failures.insert(call);
    }

    /// Fail the given (1-based) `insert_indicators` call with a query error.
    pub fn fail_indicator_insert_call(&mut self, call: usize) {
        self.indicator_insert_failures.insert(call);
    }

    /// Fail the given (1-based) `insert_events` call with a query error.
    pub fn fail_event_insert_call(&mut self, call: usize) {
        self.event_insert_failures.insert(call);
    }

    pub fn reconnect_count(&self) -> usize {
        self.reconnects
    }

    pub fn call_counts(&self) -> CallCounts {
        self.counts
    }

    pub fn adversary_count(&self) -> usize {
        self.adversaries.len()
    }

    pub fn indicator_count(&self) -> usize {
        self.indicators.len()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn technique_count(&self) -> usize {
        self.techniques.len()
    }

    pub fn indicator_id_of(&self, value: &str) -> Option<i64> {
        self.indicators
            .iter()
            .find(|r| r.candidate.value == value)
            .map(|r| r.id)
    }

    pub fn adversary_id_of(&self, name: &str) -> Option<i64> {
        self.adversaries
            .iter()
            .find(|r| r.profile.name == name)
            .map(|r| r.id)
    }

    pub fn stored_events(&self) -> &[NewAttributionEvent] {
        &self.events
    }

    fn adversary_name(&self, id: i64) -> Option<&str> {
        self.adversaries
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.profile.name.as_str())
    }

    fn guard_write(&self) -> Result<(), KbError> {
        if self.closed {
            return Err(KbError::Connectivity("connection closed".to_string()));
        }
        Ok(())
    }

    fn guard_read(&self) -> Result<(), KbError> {
        if self.closed {
            return Err(KbError::Connectivity("connection closed".to_string()));
        }
        if self.disconnect_reads.load(Ordering::Relaxed) > 0 {
            self.disconnect_reads.fetch_sub(1, Ordering::Relaxed);
            return Err(KbError::Connectivity("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KnowledgeStore for MemoryStore {
    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn reconnect(&mut self) -> Result<(), KbError> {
        self.closed = false;
        self.reconnects += 1;
        Ok(())
    }

    async fn find_indicator(&self, value: &str) -> Result<Option<IndicatorRow>, KbError> {
        self.guard_read()?;
        Ok(self
            .indicators
            .iter()
            .find(|r| r.candidate.value == value)
            .map(|r| IndicatorRow {
                indicator_id: r.id,
                kind: r.candidate.kind,
                value: r.candidate.value.clone(),
                description: Some(r.candidate.description.clone()),
            }))
    }

    async fn adversaries_by_names(
        &self,
        names: &[String],
    ) -> Result<HashMap<String, i64>, KbError> {
        self.guard_read()?;
        let wanted: HashSet<&String> = names.iter().collect();
        Ok(self
            .adversaries
            .iter()
            .filter(|r| wanted.contains(&r.profile.name))
            .map(|r| (r.profile.name.clone(), r.id))
            .collect())
    }

    async fn indicators_by_values(
        &self,
        values: &[String],
    ) -> Result<HashMap<String, i64>, KbError> {
        self.guard_read()?;
        let wanted: HashSet<&String> = values.iter().collect();
        Ok(self
            .indicators
            .iter()
            .filter(|r| wanted.contains(&r.candidate.value))
            .map(|r| (r.candidate.value.clone(), r.id))
            .collect())
    }

    async fn insert_adversaries(&mut self, profiles: &[AdversaryProfile]) -> Result<u64, KbError> {
        self.guard_write()?;
        self.counts.adversary_inserts += 1;
        if self
            .adversary_insert_failures
            .contains(&self.counts.adversary_inserts)
        {
            return Err(KbError::Query("injected adversary insert failure".to_string()));
        }
        let mut created = 0u64;
        for p in profiles {
            if self.adversary_id_of(&p.name).is_none() {
                let id = self.adversaries.len() as i64 + 1;
                self.adversaries.push(AdversaryRecord {
                    id,
                    profile: p.clone(),
                });
                created += 1;
            }
        }
        Ok(created)
    }

    async fn insert_indicators(
        &mut self,
        candidates: &[IndicatorCandidate],
    ) -> Result<u64, KbError> {
        self.guard_write()?;
        self.counts.indicator_inserts += 1;
        if self
            .indicator_insert_failures
            .contains(&self.counts.indicator_inserts)
        {
            return Err(KbError::Query("injected indicator insert failure".to_string()));
        }
        let mut created = 0u64;
        for c in candidates {
            if self.indicator_id_of(&c.value).is_none() {
                let id = self.indicators.len() as i64 + 1;
                self.indicators.push(IndicatorRecord {
                    id,
                    candidate: c.clone(),
                });
                created += 1;
            }
        }
        Ok(created)
    }

    async fn insert_events(&mut self, events: &[NewAttributionEvent]) -> Result<u64, KbError> {
        self.guard_write()?;
        self.counts.event_inserts += 1;
        if self.event_insert_failures.contains(&self.counts.event_inserts) {
            return Err(KbError::Query("injected event insert failure".to_string()));
        }
        self.events.extend(events.iter().cloned());
        Ok(events.len() as u64)
    }

    async fn upsert_techniques(&mut self, records: &[TechniqueRecord]) -> Result<u64, KbError> {
        self.guard_write()?;
        self.counts.technique_upserts += 1;
        for r in records {
            self.techniques.insert(r.tid.clone(), r.clone());
        }
        Ok(records.len() as u64)
    }

    async fn known_tids(&self, tids: &[String]) -> Result<HashSet<String>, KbError> {
        self.guard_read()?;
        Ok(tids
            .iter()
            .filter(|t| self.techniques.contains_key(*t))
            .cloned()
            .collect())
    }

    async fn technique_links(
        &self,
        adversary_ids: &[i64],
    ) -> Result<HashSet<(i64, String)>, KbError> {
        self.guard_read()?;
        let wanted: HashSet<i64> = adversary_ids.iter().copied().collect();
        Ok(self
            .events
            .iter()
            .filter(|e| wanted.contains(&e.adversary_id))
            .filter_map(|e| e.technique_id.clone().map(|t| (e.adversary_id, t)))
            .collect())
    }

    async fn attribution_links(&self, indicator_id: i64) -> Result<Vec<AttributionLink>, KbError> {
        self.guard_read()?;
        Ok(self
            .events
            .iter()
            .filter(|e| e.indicator_id == Some(indicator_id))
            .map(|e| AttributionLink {
                adversary: self
                    .adversary_name(e.adversary_id)
                    .unwrap_or_default()
                    .to_string(),
                confidence_score: e.confidence_score,
            })
            .collect())
    }

    async fn technique_candidates(
        &self,
        tids: &[String],
    ) -> Result<Vec<TechniqueCandidate>, KbError> {
        self.guard_read()?;
        let observed: HashSet<&String> = tids.iter().collect();
        let mut matched: BTreeMap<String, HashSet<String>> = BTreeMap::new();
        for e in &self.events {
            let Some(tid) = &e.technique_id else {
                continue;
            };
            if !observed.contains(tid) {
                continue;
            }
            let Some(name) = self.adversary_name(e.adversary_id) else {
                continue;
            };
            matched
                .entry(name.to_string())
                .or_default()
                .insert(tid.clone());
        }
        let mut out: Vec<TechniqueCandidate> = matched
            .into_iter()
            .map(|(adversary, tids)| TechniqueCandidate {
                adversary,
                matched: tids.len() as i64,
            })
            .collect();
        // BTreeMap iteration is name-ordered; the stable sort keeps that as
        // the tie-break, matching the SQL ORDER BY matched DESC, name ASC.
        out.sort_by(|a, b| b.matched.cmp(&a.matched));
        Ok(out)
    }

    async fn adversary_inventory(
        &self,
        name: &str,
    ) -> Result<Option<AdversaryInventory>, KbError> {
        self.guard_read()?;
        let Some(record) = self.adversaries.iter().find(|r| r.profile.name == name) else {
            return Ok(None);
        };

        let mut indicators: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut seen_values: HashSet<i64> = HashSet::new();
        for e in self.events.iter().filter(|e| e.adversary_id == record.id) {
            let Some(indicator_id) = e.indicator_id else {
                continue;
            };
            if !seen_values.insert(indicator_id) {
                continue;
            }
            if let Some(row) = self.indicators.iter().find(|r| r.id == indicator_id) {
                indicators
                    .entry(row.candidate.kind.as_str().to_string())
                    .or_default()
                    .push(row.candidate.value.clone());
            }
        }
        for values in indicators.values_mut() {
            values.sort();
        }

        let mut techniques: Vec<String> = self
            .events
            .iter()
            .filter(|e| e.adversary_id == record.id)
            .filter_map(|e| e.technique_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        techniques.sort();

        Ok(Some(AdversaryInventory {
            name: record.profile.name.clone(),
            description: record.profile.description.clone(),
            indicators,
            techniques,
        }))
    }

    async fn summary_counts(&self) -> Result<KbSummary, KbError> {
        self.guard_read()?;
        Ok(KbSummary {
            adversaries: self.adversaries.len() as u64,
            indicators: self.indicators.len() as u64,
            events: self.events.len() as u64,
        })
    }
}
