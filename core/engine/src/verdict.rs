// Path and File Name : /home/diamondeye/rebuild/core/engine/src/verdict.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Correlation verdict types - classification, overall confidence and ranked matches as consumed by collaborators

use serde::Serialize;

/// Terminal classification of one correlation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The indicator exists in the knowledge base with direct links.
    Known,
    /// No exact match; ranked by overlap with observed techniques.
    HeuristicMatch,
    /// No exact match and nothing to rank.
    Unknown,
}

/// One candidate adversary in a verdict.
#[derive(Debug, Clone, Serialize)]
pub struct AttributionMatch {
    pub adversary: String,
    /// How many observed technique ids matched (heuristic verdicts only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_ttps: Option<usize>,
    pub score: f64,
}

/// The correlator's answer: verdict, overall confidence and ranked matches.
#[derive(Debug, Clone, Serialize)]
pub struct Attribution {
    pub verdict: Verdict,
    pub confidence: f64,
    pub matches: Vec<AttributionMatch>,
}

impl Attribution {
    pub fn unknown() -> Self {
        Self {
            verdict: Verdict::Unknown,
            confidence: 0.0,
            matches: Vec::new(),
        }
    }
}
