// Path and File Name : /home/diamondeye/rebuild/core/kb/src/lib.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Knowledge base crate root - canonical entity model, store contract, PostgreSQL and in-memory store implementations

pub mod config;
pub mod errors;
pub mod memory;
pub mod model;
pub mod pg;
pub mod store;
pub mod telemetry;

#[cfg(test)]
mod tests;

pub use config::KbConfig;
pub use errors::KbError;
pub use memory::MemoryStore;
pub use model::{
    AdversaryInventory, AdversaryProfile, AttributionLink, IndicatorCandidate, IndicatorKind,
    IndicatorRow, KbSummary, NewAttributionEvent, TechniqueCandidate, TechniqueRecord,
};
pub use pg::PgStore;
pub use store::KnowledgeStore;
