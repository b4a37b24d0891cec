//! Response normalization — turns the generator's free-text answer into typed
//! blocks and candidate records.
//!
//! The generator's output format is not a contract this service controls:
//! it drifts with prompt wording and model behavior. The normalizer is
//! therefore layered and defensive — several dialect parsers are tried in a
//! fixed priority order, and the universal fallback renders the answer as
//! prose. `normalize` is total: any input string, including the empty string,
//! produces a valid result and never panics.

use serde::{Deserialize, Serialize};

pub mod normalizer;
mod prose;
mod table;

pub use normalizer::normalize;

/// Ordinal confidence label attached to a candidate match, sourced from the
/// generator's own text — not independently computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelevanceTier {
    High,
    Medium,
    Low,
}

impl RelevanceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelevanceTier::High => "High",
            RelevanceTier::Medium => "Medium",
            RelevanceTier::Low => "Low",
        }
    }

    /// Tolerant parse: accepts casing/markup noise and trailing detail,
    /// e.g. `**High**`, `high (9/10)`, `Strong match`.
    pub fn parse(s: &str) -> Option<Self> {
        let lowered = s.trim().to_lowercase();
        let first = lowered
            .split(|c: char| !c.is_alphabetic())
            .find(|w| !w.is_empty())?;
        match first {
            "high" | "strong" => Some(RelevanceTier::High),
            "medium" | "moderate" => Some(RelevanceTier::Medium),
            "low" | "weak" => Some(RelevanceTier::Low),
            _ => None,
        }
    }
}

/// One candidate extracted from the generator's answer. Name is the only
/// required field — a record without one is not a record. Transient: rebuilt
/// for every response, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub name: String,
    pub role: Option<String>,
    pub company: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub experience: Option<String>,
    pub relevance: Option<RelevanceTier>,
    pub justification: Option<String>,
}

impl CandidateRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: None,
            company: None,
            skills: Vec::new(),
            experience: None,
            relevance: None,
            justification: None,
        }
    }
}

/// Typed view of one segment of the generator's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ParsedBlock {
    Candidate(CandidateRecord),
    Table(Vec<CandidateRecord>),
    Info(String),
    Text(String),
}

/// Normalizer output: ordered blocks, the flattened candidate list, and
/// whether structured extraction succeeded (`false` ⇒ render as prose).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedResponse {
    pub blocks: Vec<ParsedBlock>,
    pub candidates: Vec<CandidateRecord>,
    pub structured: bool,
}

impl NormalizedResponse {
    pub(crate) fn from_blocks(blocks: Vec<ParsedBlock>) -> Self {
        let mut candidates = Vec::new();
        for block in &blocks {
            match block {
                ParsedBlock::Candidate(record) => candidates.push(record.clone()),
                ParsedBlock::Table(records) => candidates.extend(records.iter().cloned()),
                _ => {}
            }
        }
        Self {
            blocks,
            candidates,
            structured: true,
        }
    }

    pub(crate) fn prose(raw: &str) -> Self {
        let trimmed = raw.trim();
        let blocks = if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![ParsedBlock::Text(trimmed.to_string())]
        };
        Self {
            blocks,
            candidates: Vec::new(),
            structured: false,
        }
    }
}
