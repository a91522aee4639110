// Path and File Name : /home/diamondeye/rebuild/core/ingest/src/errors.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Ingestion error taxonomy - store connectivity is the only fatal class; resolution and validation failures are contained per batch

use thiserror::Error;

use kb::KbError;

#[derive(Debug, Error)]
pub enum IngestError {
    /// The knowledge base could not be reached at all. Fatal for the run.
    #[error("knowledge store unavailable: {0}")]
    Store(#[from] KbError),
    /// A batch lookup or insert failed. Logged; the run continues with
    /// whatever identities could still be resolved.
    #[error("identity resolution failed: {0}")]
    Resolution(String),
    /// A malformed input record. Dropped and counted, never fatal.
    #[error("invalid input record: {0}")]
    Validation(String),
}
