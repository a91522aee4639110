// Path and File Name : /home/diamondeye/rebuild/core/ingest/src/batch.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Batch writer - commits entity and event creation in bounded-size chunks, one transaction per chunk, isolating failures per chunk

use std::time::Duration;

use tracing::{error, info, warn};

use kb::{IndicatorCandidate, KnowledgeStore, NewAttributionEvent, TechniqueRecord};

use crate::errors::IngestError;

/// Ingestion write tunables.
#[derive(Debug, Clone, Copy)]
pub struct BatchTuning {
    /// Maximum rows committed per transaction.
    pub chunk_size: usize,
    /// Per-chunk deadline; timeout is treated like any other chunk failure.
    pub chunk_timeout: Duration,
}

impl Default for BatchTuning {
    fn default() -> Self {
        Self {
            chunk_size: 5000,
            chunk_timeout: Duration::from_secs(30),
        }
    }
}

/// A chunk that rolled back, identified by its offset range in the input.
#[derive(Debug, Clone)]
pub struct ChunkFailure {
    pub offset: usize,
    pub len: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub written: u64,
    pub dropped_invalid: u64,
    pub failed: Vec<ChunkFailure>,
}

impl BatchOutcome {
    pub fn absorb(&mut self, other: BatchOutcome) {
        self.written += other.written;
        self.dropped_invalid += other.dropped_invalid;
        self.failed.extend(other.failed);
    }
}

/// Commits pipeline output in bounded-size chunks.
///
/// Each chunk is one store transaction. A failed chunk is rolled back by the
/// store, logged with its offset range, and processing continues with the
/// next chunk; partial success, never all-or-nothing. No error escapes the
/// writer.
pub struct BatchWriter {
    tuning: BatchTuning,
}

impl BatchWriter {
    pub fn new(tuning: BatchTuning) -> Self {
        Self { tuning }
    }

    fn chunk_size(&self) -> usize {
        self.tuning.chunk_size.max(1)
    }

    pub async fn write_indicators<S: KnowledgeStore>(
        &self,
        store: &mut S,
        rows: &[IndicatorCandidate],
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let chunk_size = self.chunk_size();
        for (idx, chunk) in rows.chunks(chunk_size).enumerate() {
            let offset = idx * chunk_size;
            match tokio::time::timeout(self.tuning.chunk_timeout, store.insert_indicators(chunk))
                .await
            {
                Ok(Ok(created)) => {
                    outcome.written += created;
                    info!(
                        "Committed indicator chunk {}..{} ({} created)",
                        offset,
                        offset + chunk.len(),
                        created
                    );
                }
                Ok(Err(e)) => {
                    error!(
                        "Indicator chunk {}..{} failed and was rolled back: {}",
                        offset,
                        offset + chunk.len(),
                        e
                    );
                    outcome.failed.push(ChunkFailure {
                        offset,
                        len: chunk.len(),
                        error: e.to_string(),
                    });
                }
                Err(_) => {
                    error!(
                        "Indicator chunk {}..{} timed out after {:?}",
                        offset,
                        offset + chunk.len(),
                        self.tuning.chunk_timeout
                    );
                    outcome.failed.push(ChunkFailure {
                        offset,
                        len: chunk.len(),
                        error: "chunk timeout".to_string(),
                    });
                }
            }
        }
        outcome
    }

    pub async fn write_events<S: KnowledgeStore>(
        &self,
        store: &mut S,
        rows: &[NewAttributionEvent],
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let mut valid: Vec<NewAttributionEvent> = Vec::with_capacity(rows.len());
        for event in rows {
            match validate_event(event) {
                Ok(()) => valid.push(event.clone()),
                Err(e) => {
                    warn!("Dropping event at write time: {}", e);
                    outcome.dropped_invalid += 1;
                }
            }
        }

        let chunk_size = self.chunk_size();
        for (idx, chunk) in valid.chunks(chunk_size).enumerate() {
            let offset = idx * chunk_size;
            match tokio::time::timeout(self.tuning.chunk_timeout, store.insert_events(chunk)).await
            {
                Ok(Ok(written)) => {
                    outcome.written += written;
                    info!(
                        "Committed event chunk {}..{} ({} written)",
                        offset,
                        offset + chunk.len(),
                        written
                    );
                }
                Ok(Err(e)) => {
                    error!(
                        "Event chunk {}..{} failed and was rolled back: {}",
                        offset,
                        offset + chunk.len(),
                        e
                    );
                    outcome.failed.push(ChunkFailure {
                        offset,
                        len: chunk.len(),
                        error: e.to_string(),
                    });
                }
                Err(_) => {
                    error!(
                        "Event chunk {}..{} timed out after {:?}",
                        offset,
                        offset + chunk.len(),
                        self.tuning.chunk_timeout
                    );
                    outcome.failed.push(ChunkFailure {
                        offset,
                        len: chunk.len(),
                        error: "chunk timeout".to_string(),
                    });
                }
            }
        }
        outcome
    }

    pub async fn upsert_techniques<S: KnowledgeStore>(
        &self,
        store: &mut S,
        rows: &[TechniqueRecord],
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let chunk_size = self.chunk_size();
        for (idx, chunk) in rows.chunks(chunk_size).enumerate() {
            let offset = idx * chunk_size;
            match tokio::time::timeout(self.tuning.chunk_timeout, store.upsert_techniques(chunk))
                .await
            {
                Ok(Ok(written)) => outcome.written += written,
                Ok(Err(e)) => {
                    error!(
                        "Technique chunk {}..{} failed and was rolled back: {}",
                        offset,
                        offset + chunk.len(),
                        e
                    );
                    outcome.failed.push(ChunkFailure {
                        offset,
                        len: chunk.len(),
                        error: e.to_string(),
                    });
                }
                Err(_) => {
                    error!(
                        "Technique chunk {}..{} timed out after {:?}",
                        offset,
                        offset + chunk.len(),
                        self.tuning.chunk_timeout
                    );
                    outcome.failed.push(ChunkFailure {
                        offset,
                        len: chunk.len(),
                        error: "chunk timeout".to_string(),
                    });
                }
            }
        }
        outcome
    }
}

/// Write-time validation. An event must link an indicator or a technique
/// (never neither) and carry an in-range confidence.
fn validate_event(event: &NewAttributionEvent) -> Result<(), IngestError> {
    if !event.is_linked() {
        return Err(IngestError::Validation(format!(
            "event for adversary {} links neither indicator nor technique",
            event.adversary_id
        )));
    }
    if !(0.0..=1.0).contains(&event.confidence_score) {
        return Err(IngestError::Validation(format!(
            "event for adversary {} carries out-of-range confidence {}",
            event.adversary_id, event.confidence_score
        )));
    }
    Ok(())
}
