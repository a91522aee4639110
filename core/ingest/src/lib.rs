// Path and File Name : /home/diamondeye/rebuild/core/ingest/src/lib.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Ingestion pipeline crate root - normalizer, identity resolver, link builder, batch writer and the per-source pipeline runs

pub mod batch;
pub mod errors;
pub mod linker;
pub mod normalizer;
pub mod pipeline;
pub mod resolver;

#[cfg(test)]
mod tests;

pub use batch::{BatchOutcome, BatchTuning, BatchWriter, ChunkFailure};
pub use errors::IngestError;
pub use linker::{LinkReport, SourceClass};
pub use normalizer::{normalize, NormalizerReport, RawRecord};
pub use pipeline::{
    run_feed_ingestion, run_knowledge_base_ingestion, FeedBatch, GroupProfile, IngestionSummary,
    KnowledgeBaseSnapshot,
};
pub use resolver::{resolve_adversaries, resolve_indicators, ResolvedIndicators};
