//! Competitor records: transient extraction output and persisted rows.

use serde::{Deserialize, Serialize};

/// Confidence assigned when a record carries none.
pub const DEFAULT_SIMILARITY: f64 = 0.8;

/// A competitor extracted from report text.
///
/// `name` is the natural key. Every other attribute is optional because
/// extraction is best-effort; `None` means "not found in the text" and is
/// never written over an existing value when persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitorProfile {
    /// Company name (natural key).
    pub name: String,
    /// What the company does.
    #[serde(default)]
    pub description: Option<String>,
    /// Year founded.
    #[serde(default)]
    pub founded_year: Option<i64>,
    /// Headcount.
    #[serde(default)]
    pub employee_count: Option<i64>,
    /// Total funding raised in USD.
    #[serde(default)]
    pub funding_raised: Option<f64>,
    /// Annual revenue in USD.
    #[serde(default)]
    pub revenue: Option<f64>,
    /// `LinkedIn` company page.
    #[serde(default)]
    pub linkedin_url: Option<String>,
    /// Company website.
    #[serde(default)]
    pub website_url: Option<String>,
    /// Free-text feature list.
    #[serde(default)]
    pub main_features: Option<String>,
    /// Similarity to the subject in `[0, 1]`.
    #[serde(default)]
    pub similarity_score: Option<f64>,
}

impl CompetitorProfile {
    /// Creates a profile with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Similarity score, or [`DEFAULT_SIMILARITY`] when absent.
    #[must_use]
    pub fn similarity(&self) -> f64 {
        self.similarity_score.unwrap_or(DEFAULT_SIMILARITY)
    }

    /// Returns `true` if the profile has a name and a description.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && self
                .description
                .as_deref()
                .is_some_and(|d| !d.trim().is_empty())
    }
}

/// A competitor row in the store, unique per `(startup_id, name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCompetitor {
    /// Row identifier (UUID).
    pub id: String,
    /// Owning startup.
    pub startup_id: String,
    /// Company name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Year founded (0 when unknown).
    pub founded_year: i64,
    /// Headcount (0 when unknown).
    pub employee_count: i64,
    /// Funding raised (0 when unknown).
    pub funding_raised: f64,
    /// Revenue (0 when unknown).
    pub revenue: f64,
    /// `LinkedIn` URL.
    pub linkedin_url: String,
    /// Website URL.
    pub website_url: String,
    /// Feature list.
    pub main_features: String,
    /// Similarity in `[0, 1]`.
    pub similarity_score: f64,
    /// Found by research rather than entered by hand.
    pub is_external: bool,
    /// Research status (`"completed"` after a research pass touched it).
    pub research_status: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    /// A new row was created.
    Inserted,
    /// An existing row was updated.
    Updated,
}
