// Path and File Name : /home/diamondeye/rebuild/core/engine/src/lib.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Attribution correlator - two-stage decision procedure (exact match, technique heuristics) with single reconnect-and-retry on dropped connections

use std::collections::HashSet;

use thiserror::Error;
use tracing::{info, warn};

use kb::{AdversaryInventory, KbError, KbSummary, KnowledgeStore};

pub mod verdict;

#[cfg(test)]
mod tests;

pub use verdict::{Attribution, AttributionMatch, Verdict};

/// A correlator query failed after the single reconnect-and-retry. Distinct
/// from an `Unknown` verdict: an infrastructure failure is never reported as
/// "no match".
#[derive(Debug, Error)]
pub enum CorrelateError {
    #[error("attribution query failed: {0}")]
    Query(#[from] KbError),
}

/// Answers "what do we know about indicator V, optionally given observed
/// techniques T?". Stateless across queries; the store connection is the
/// only held resource.
pub struct Correlator<S: KnowledgeStore> {
    store: S,
}

impl<S: KnowledgeStore> Correlator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Two-stage correlation.
    ///
    /// Stage 1 looks the value up exactly and pivots through every linked
    /// attribution event; a hit is `Known` at confidence 1.0 regardless of
    /// the individual event confidences. Stage 2 (only without an exact
    /// match, only with observed techniques) ranks adversaries by overlap
    /// with the observed technique ids. Anything else is `Unknown`.
    pub async fn correlate(
        &mut self,
        value: &str,
        observed_ttps: &[String],
    ) -> Result<Attribution, CorrelateError> {
        info!("Processing correlation request for indicator: {}", value);

        if self.store.is_closed() {
            warn!("Knowledge base connection was closed; reconnecting");
            self.store.reconnect().await?;
        }

        // Stage 1: exact match
        let found = match self.store.find_indicator(value).await {
            Err(e) if e.is_connectivity() => {
                self.recover(&e).await?;
                self.store.find_indicator(value).await?
            }
            other => other?,
        };

        if let Some(row) = found {
            info!(
                "Existing indicator found: {} (id {})",
                value, row.indicator_id
            );
            let links = match self.store.attribution_links(row.indicator_id).await {
                Err(e) if e.is_connectivity() => {
                    self.recover(&e).await?;
                    self.store.attribution_links(row.indicator_id).await?
                }
                other => other?,
            };
            info!(
                "Found {} attribution links for indicator {}",
                links.len(),
                value
            );
            // One match per linking event; an adversary linked by several
            // events appears several times.
            let matches = links
                .into_iter()
                .map(|l| AttributionMatch {
                    adversary: l.adversary,
                    matched_ttps: None,
                    score: l.confidence_score,
                })
                .collect();
            return Ok(Attribution {
                verdict: Verdict::Known,
                confidence: 1.0,
                matches,
            });
        }

        // Stage 2: heuristic over observed techniques
        let observed = dedup_preserving_order(observed_ttps);
        if observed.is_empty() {
            info!(
                "Indicator {} not known and no observed techniques supplied",
                value
            );
            return Ok(Attribution::unknown());
        }

        info!(
            "Indicator {} not known; analyzing {} observed techniques",
            value,
            observed.len()
        );
        let candidates = match self.store.technique_candidates(&observed).await {
            Err(e) if e.is_connectivity() => {
                self.recover(&e).await?;
                self.store.technique_candidates(&observed).await?
            }
            other => other?,
        };

        let total_observed = observed.len();
        let mut matches: Vec<AttributionMatch> = candidates
            .into_iter()
            .map(|c| AttributionMatch {
                adversary: c.adversary,
                matched_ttps: Some(c.matched as usize),
                score: heuristic_score(c.matched as usize, total_observed),
            })
            .collect();
        // The store orders candidates deterministically; the stable sort
        // keeps that order within equal scores.
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        if matches.is_empty() {
            info!("Heuristic analysis returned no candidates for {}", value);
            return Ok(Attribution::unknown());
        }

        info!(
            "Heuristic analysis returned {} candidates for {}",
            matches.len(),
            value
        );
        Ok(Attribution {
            verdict: Verdict::HeuristicMatch,
            confidence: matches[0].score,
            matches,
        })
    }

    /// Read-side collaborator query: an adversary's resolved indicators
    /// grouped by kind plus its linked technique ids.
    pub async fn adversary_inventory(
        &mut self,
        name: &str,
    ) -> Result<Option<AdversaryInventory>, CorrelateError> {
        if self.store.is_closed() {
            warn!("Knowledge base connection was closed; reconnecting");
            self.store.reconnect().await?;
        }
        match self.store.adversary_inventory(name).await {
            Err(e) if e.is_connectivity() => {
                self.recover(&e).await?;
                Ok(self.store.adversary_inventory(name).await?)
            }
            other => Ok(other?),
        }
    }

    /// Knowledge base totals for dashboards.
    pub async fn summary(&mut self) -> Result<KbSummary, CorrelateError> {
        if self.store.is_closed() {
            warn!("Knowledge base connection was closed; reconnecting");
            self.store.reconnect().await?;
        }
        match self.store.summary_counts().await {
            Err(e) if e.is_connectivity() => {
                self.recover(&e).await?;
                Ok(self.store.summary_counts().await?)
            }
            other => Ok(other?),
        }
    }

    async fn recover(&mut self, cause: &KbError) -> Result<(), CorrelateError> {
        warn!(
            "Knowledge base connection lost mid-query; reconnecting once: {}",
            cause
        );
        self.store.reconnect().await?;
        Ok(())
    }
}

/// Score = matched / total observed, rounded to two decimal places.
pub(crate) fn heuristic_score(matched: usize, total_observed: usize) -> f64 {
    if total_observed == 0 {
        return 0.0;
    }
    let matched = matched.min(total_observed);
    ((matched as f64 / total_observed as f64) * 100.0).round() / 100.0
}

/// Observed technique ids are a set; duplicates would skew the denominator.
fn dedup_preserving_order(tids: &[String]) -> Vec<String> {
    let mut seen: HashSet<&String> = HashSet::new();
    tids.iter()
        .filter(|t| seen.insert(*t))
        .cloned()
        .collect()
}
