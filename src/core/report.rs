//! Report requests and generated reports.

use serde::{Deserialize, Serialize};

use super::startup::{DocumentSummary, Metrics};
use crate::error::CommandError;

/// The three report flows served by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Competitor research and analysis.
    Competitors,
    /// Market research.
    Market,
    /// Investment memo.
    Memo,
}

impl ReportKind {
    /// Parses a kind name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownKind`] for anything else.
    pub fn parse(s: &str) -> Result<Self, CommandError> {
        match s.trim().to_lowercase().as_str() {
            "competitors" | "competitor" => Ok(Self::Competitors),
            "market" => Ok(Self::Market),
            "memo" => Ok(Self::Memo),
            other => Err(CommandError::UnknownKind(other.to_string())),
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Competitors => "competitors",
            Self::Market => "market",
            Self::Memo => "memo",
        }
    }

    /// Action used when a caller does not name one.
    #[must_use]
    pub const fn default_action(self) -> ReportAction {
        match self {
            Self::Competitors | Self::Market => ReportAction::Research,
            Self::Memo => ReportAction::Generate,
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action selecting the prompt template and tool set within a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportAction {
    /// Open-ended research (competitors, market).
    Research,
    /// Analysis of known records (competitors, market).
    Analyze,
    /// Side-by-side comparison (competitors).
    Compare,
    /// Forward-looking market view (market).
    Forecast,
    /// Fresh memo (memo).
    Generate,
    /// Memo refreshed with new data (memo).
    Update,
    /// Memo deepened in place (memo).
    Enhance,
}

impl ReportAction {
    /// Parses an action and checks it is valid for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownAction`] when the action is unknown
    /// or does not belong to the kind.
    pub fn parse_for(kind: ReportKind, s: &str) -> Result<Self, CommandError> {
        let action = match s.trim().to_lowercase().as_str() {
            "research" => Self::Research,
            "analyze" | "analyse" => Self::Analyze,
            "compare" => Self::Compare,
            "forecast" => Self::Forecast,
            "generate" => Self::Generate,
            "update" => Self::Update,
            "enhance" => Self::Enhance,
            _ => {
                return Err(CommandError::UnknownAction {
                    kind: kind.to_string(),
                    action: s.to_string(),
                });
            }
        };

        if action.belongs_to(kind) {
            Ok(action)
        } else {
            Err(CommandError::UnknownAction {
                kind: kind.to_string(),
                action: s.to_string(),
            })
        }
    }

    /// Returns `true` if the action is meaningful for `kind`.
    #[must_use]
    pub const fn belongs_to(self, kind: ReportKind) -> bool {
        matches!(
            (kind, self),
            (
                ReportKind::Competitors,
                Self::Research | Self::Analyze | Self::Compare
            ) | (
                ReportKind::Market,
                Self::Research | Self::Analyze | Self::Forecast
            ) | (
                ReportKind::Memo,
                Self::Generate | Self::Update | Self::Enhance
            )
        )
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Analyze => "analyze",
            Self::Compare => "compare",
            Self::Forecast => "forecast",
            Self::Generate => "generate",
            Self::Update => "update",
            Self::Enhance => "enhance",
        }
    }
}

impl std::fmt::Display for ReportAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A related record handed to the prompt as context (e.g. a known competitor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorRecord {
    /// Natural key of the record.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
}

/// Extra inputs for the memo flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoContext {
    /// Free-text team information.
    #[serde(default)]
    pub team_info: Option<String>,
    /// Latest entered metrics.
    #[serde(default)]
    pub metrics: Option<Metrics>,
    /// Latest market research report.
    #[serde(default)]
    pub market_report: Option<String>,
    /// Processed documents.
    #[serde(default)]
    pub documents: Vec<DocumentSummary>,
    /// Memo to update or enhance.
    #[serde(default)]
    pub existing_memo: Option<String>,
}

/// Input to one invocation of the pipeline.
///
/// Constructed once per request and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    /// Identifier of the startup the report is about.
    pub subject_id: String,
    /// Startup name.
    pub subject_name: String,
    /// Startup description.
    #[serde(default)]
    pub subject_description: String,
    /// Startup sector or category.
    #[serde(default)]
    pub subject_category: String,
    /// Report flow.
    pub kind: ReportKind,
    /// Action within the flow.
    pub action: ReportAction,
    /// Related records (known competitors).
    #[serde(default)]
    pub prior_context: Vec<PriorRecord>,
    /// Memo inputs; only read by the memo flow.
    #[serde(default)]
    pub memo: Option<MemoContext>,
}

impl ReportRequest {
    /// Creates a request with no prior context.
    #[must_use]
    pub fn new(
        subject_id: impl Into<String>,
        subject_name: impl Into<String>,
        kind: ReportKind,
        action: ReportAction,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            subject_name: subject_name.into(),
            subject_description: String::new(),
            subject_category: String::new(),
            kind,
            action,
            prior_context: Vec::new(),
            memo: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.subject_description = description.into();
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.subject_category = category.into();
        self
    }

    /// Sets the prior context records.
    #[must_use]
    pub fn with_prior_context(mut self, prior: Vec<PriorRecord>) -> Self {
        self.prior_context = prior;
        self
    }

    /// Sets the memo context.
    #[must_use]
    pub fn with_memo_context(mut self, memo: MemoContext) -> Self {
        self.memo = Some(memo);
        self
    }

    /// Category with the default used when none was entered.
    #[must_use]
    pub fn category_or_default(&self) -> &str {
        let trimmed = self.subject_category.trim();
        if trimmed.is_empty() {
            "Technology"
        } else {
            trimmed
        }
    }
}

/// Lifecycle of a generated report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Generation has started but not finished.
    Pending,
    /// Generation finished (with model output or fallback).
    Completed,
}

impl ReportStatus {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    /// Parses a stored status; unknown values read as pending.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("completed") {
            Self::Completed
        } else {
            Self::Pending
        }
    }
}

/// Where the report text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportOrigin {
    /// Produced by the language model.
    Model,
    /// Deterministic boilerplate built from the request.
    Fallback,
}

impl ReportOrigin {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Fallback => "fallback",
        }
    }

    /// Parses a stored origin; unknown values read as model.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("fallback") {
            Self::Fallback
        } else {
            Self::Model
        }
    }
}

/// Output of the report generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedReport {
    /// Startup the report is about.
    pub subject_id: String,
    /// Report flow.
    pub kind: ReportKind,
    /// Action that produced it.
    pub action: ReportAction,
    /// Full report text (never empty once completed).
    pub report_text: String,
    /// Lifecycle status.
    pub status: ReportStatus,
    /// Model output or fallback.
    pub origin: ReportOrigin,
}

impl GeneratedReport {
    /// Returns `true` if the text is deterministic fallback boilerplate.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.origin == ReportOrigin::Fallback
    }
}

/// A persisted report row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredReport {
    /// Row identifier.
    pub id: i64,
    /// Startup the report is about.
    pub subject_id: String,
    /// Report flow.
    pub kind: ReportKind,
    /// Action that produced it.
    pub action: String,
    /// Report text.
    pub report_text: String,
    /// Lifecycle status.
    pub status: ReportStatus,
    /// Model output or fallback.
    pub origin: ReportOrigin,
    /// Creation timestamp (`SQLite` `CURRENT_TIMESTAMP`).
    pub created_at: String,
}
