//! Best-effort structured extraction from model output.
//!
//! Two strategies feed one record type ([`CompetitorProfile`]):
//!
//! - [`strict`]: the text is JSON (a record array, or an object holding
//!   one under `records` / `competitors`).
//! - [`heuristic`]: the text is prose and an ordered line grammar picks
//!   out headers and labeled fields.
//!
//! [`extract`] tries strict first and falls back to heuristic. Both are
//! pure: the same text always yields the same records, and malformed
//! input yields an empty or partial list rather than an error.

pub mod heuristic;
pub mod normalize;
pub mod sections;
pub mod strict;

pub use heuristic::parse_heuristic;
pub use normalize::{clamp_similarity, normalize_url, parse_number};
pub use sections::{
    MemoAnalysis, Recommendation, Valuation, extract_market_positioning, extract_recommendations,
    parse_memo,
};
pub use strict::parse_strict;

use crate::core::CompetitorProfile;

/// Which strategy produced a set of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// JSON parse.
    Strict,
    /// Line grammar.
    Heuristic,
}

/// Records plus how they were obtained.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Extracted records, deduplicated by name.
    pub records: Vec<CompetitorProfile>,
    /// Strategy that produced them.
    pub method: ExtractionMethod,
    /// Why strict parsing was abandoned, when it was.
    pub strict_error: Option<String>,
}

/// Extracts records from `text`, trying JSON before the line grammar.
#[must_use]
pub fn extract(text: &str) -> Extraction {
    match parse_strict(text) {
        Ok(records) => Extraction {
            records,
            method: ExtractionMethod::Strict,
            strict_error: None,
        },
        Err(e) => Extraction {
            records: parse_heuristic(text),
            method: ExtractionMethod::Heuristic,
            strict_error: Some(e.to_string()),
        },
    }
}
