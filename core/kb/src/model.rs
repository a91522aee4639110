// Path and File Name : /home/diamondeye/rebuild/core/kb/src/model.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Canonical knowledge base entity model - indicator kinds, adversary profiles, techniques and attribution events

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical indicator classification.
///
/// Feed-specific type tags are mapped here by the normalizer; anything that
/// does not map is dropped upstream, so the store only ever sees these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndicatorKind {
    #[serde(rename = "IPv4")]
    IPv4,
    #[serde(rename = "IPv6")]
    IPv6,
    #[serde(rename = "domain")]
    Domain,
    #[serde(rename = "URL")]
    Url,
    #[serde(rename = "FileHash-SHA256")]
    FileHashSha256,
}

impl IndicatorKind {
    /// Map a source-defined feed tag onto the canonical enumeration.
    ///
    /// Accepts the tag variants the supported feeds emit (MISP attribute
    /// types, OTX pulse indicator types, tracker blocklists). Returns None
    /// for unsupported tags.
    pub fn from_feed_tag(tag: &str) -> Option<Self> {
        match tag {
            "IPv4" | "ip-src" | "ip-dst" => Some(IndicatorKind::IPv4),
            "IPv6" => Some(IndicatorKind::IPv6),
            "domain" | "hostname" => Some(IndicatorKind::Domain),
            "URL" | "url" => Some(IndicatorKind::Url),
            "FileHash-SHA256" | "sha256" => Some(IndicatorKind::FileHashSha256),
            _ => None,
        }
    }

    /// Canonical label as persisted in the `indicators.kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::IPv4 => "IPv4",
            IndicatorKind::IPv6 => "IPv6",
            IndicatorKind::Domain => "domain",
            IndicatorKind::Url => "URL",
            IndicatorKind::FileHashSha256 => "FileHash-SHA256",
        }
    }

    /// Parse a canonical label read back from the store.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "IPv4" => Some(IndicatorKind::IPv4),
            "IPv6" => Some(IndicatorKind::IPv6),
            "domain" => Some(IndicatorKind::Domain),
            "URL" => Some(IndicatorKind::Url),
            "FileHash-SHA256" => Some(IndicatorKind::FileHashSha256),
            _ => None,
        }
    }
}

/// A normalized indicator awaiting persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorCandidate {
    pub kind: IndicatorKind,
    pub value: String,
    pub description: String,
}

/// An indicator row as stored.
#[derive(Debug, Clone)]
pub struct IndicatorRow {
    pub indicator_id: i64,
    pub kind: IndicatorKind,
    pub value: String,
    pub description: Option<String>,
}

/// Adversary identity material for get-or-create resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdversaryProfile {
    pub name: String,
    pub description: Option<String>,
    pub aliases: Vec<String>,
}

impl AdversaryProfile {
    /// Profile carrying only a display name (feed authors, tracker sources).
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            aliases: Vec::new(),
        }
    }
}

/// A MITRE ATT&CK technique, upserted keyed by `tid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechniqueRecord {
    pub tid: String,
    pub name: String,
    pub description: String,
}

/// An attribution fact awaiting persistence. Immutable once written.
#[derive(Debug, Clone)]
pub struct NewAttributionEvent {
    pub description: String,
    pub adversary_id: i64,
    pub indicator_id: Option<i64>,
    pub capability_id: Option<i64>,
    pub technique_id: Option<String>,
    pub event_time: DateTime<Utc>,
    pub confidence_score: f64,
}

impl NewAttributionEvent {
    /// An event must assert something: an indicator sighting or a technique
    /// usage. Events with neither are degenerate and rejected at write time.
    pub fn is_linked(&self) -> bool {
        self.indicator_id.is_some() || self.technique_id.is_some()
    }
}

/// Stage-1 pivot result: one row per event linking an adversary to an
/// indicator, carrying that event's own confidence.
#[derive(Debug, Clone)]
pub struct AttributionLink {
    pub adversary: String,
    pub confidence_score: f64,
}

/// Stage-2 join result: an adversary and how many of the observed technique
/// identifiers it is known to use.
#[derive(Debug, Clone)]
pub struct TechniqueCandidate {
    pub adversary: String,
    pub matched: i64,
}

/// Read-side view for the rule-generation and presentation collaborators:
/// an adversary's resolved indicators grouped by kind, plus linked TTPs.
#[derive(Debug, Clone, Serialize)]
pub struct AdversaryInventory {
    pub name: String,
    pub description: Option<String>,
    pub indicators: BTreeMap<String, Vec<String>>,
    pub techniques: Vec<String>,
}

/// Knowledge base totals for dashboards.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct KbSummary {
    pub adversaries: u64,
    pub indicators: u64,
    pub events: u64,
}
