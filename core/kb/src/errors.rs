// Path and File Name : /home/diamondeye/rebuild/core/kb/src/errors.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Knowledge base error taxonomy - connectivity failures (reconnectable) vs query failures (surfaced)

use thiserror::Error;

/// Store-layer failures.
///
/// `Connectivity` marks a dropped/unreachable connection and is the only
/// class callers may answer with a reconnect-and-retry; everything else
/// surfaces as `Query`.
#[derive(Debug, Error)]
pub enum KbError {
    #[error("knowledge base unreachable: {0}")]
    Connectivity(String),
    #[error("knowledge base query failed: {0}")]
    Query(String),
}

impl KbError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, KbError::Connectivity(_))
    }
}
