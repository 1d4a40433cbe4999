//! Whole-startup analyses and conversation turns.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::report::ReportOrigin;
use crate::error::CommandError;

/// What an analysis row holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Investment analysis over documents and metrics.
    Investment,
    /// Structured executive summary.
    Summary,
}

impl AnalysisKind {
    /// Parses a kind name.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownKind`] for anything else.
    pub fn parse(s: &str) -> Result<Self, CommandError> {
        match s.trim().to_lowercase().as_str() {
            "investment" | "analysis" => Ok(Self::Investment),
            "summary" => Ok(Self::Summary),
            other => Err(CommandError::UnknownKind(other.to_string())),
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Investment => "investment",
            Self::Summary => "summary",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAnalysis {
    /// Row identifier.
    pub id: i64,
    /// Analysed startup.
    pub startup_id: String,
    /// Analysis kind.
    pub kind: AnalysisKind,
    /// Model output.
    pub content: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// One prior message of an analyst conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// `user` or `assistant`.
    #[serde(default = "default_role")]
    pub role: String,
    /// Message text.
    #[serde(default)]
    pub content: String,
}

fn default_role() -> String {
    "user".to_string()
}

/// Text produced by one advisor call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvisorAnswer {
    /// Answer text.
    pub text: String,
    /// Whether the model or the fallback produced it.
    pub origin: ReportOrigin,
}

impl AdvisorAnswer {
    /// Returns `true` for fallback text.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.origin == ReportOrigin::Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("investment", AnalysisKind::Investment)]
    #[test_case("Analysis", AnalysisKind::Investment)]
    #[test_case(" summary ", AnalysisKind::Summary)]
    fn test_parse(input: &str, expected: AnalysisKind) {
        assert_eq!(AnalysisKind::parse(input).ok(), Some(expected));
    }

    #[test]
    fn test_parse_unknown() {
        assert!(AnalysisKind::parse("weather").is_err());
    }

    #[test]
    fn test_chat_turn_defaults_to_user() {
        let turn: ChatTurn =
            serde_json::from_str(r#"{"content": "hi"}"#).unwrap_or_else(|_| unreachable!());
        assert_eq!(turn.role, "user");
    }
}
