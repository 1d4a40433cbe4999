//! Output rendering for CLI commands.
//!
//! Every command renders to a `String` in the selected [`OutputFormat`];
//! `main` writes it to stdout.

use std::fmt::Write as _;

use serde::Serialize;

use crate::agent::ReportOutcome;
use crate::core::Startup;
use crate::storage::StorageStats;

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
    /// One compact JSON document per line.
    Ndjson,
}

impl OutputFormat {
    /// Parses a format name; unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            "ndjson" | "jsonl" => Self::Ndjson,
            _ => Self::Text,
        }
    }

    /// Serializes `value` for the JSON formats.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        let rendered = match self {
            Self::Ndjson => serde_json::to_string(value),
            Self::Text | Self::Json => serde_json::to_string_pretty(value),
        };
        rendered.unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {e}"}}"#))
    }
}

/// Renders `dealroom status`.
#[must_use]
pub fn format_status(stats: &StorageStats, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!(
            "Schema version: {}\nStartups:       {}\nCompetitors:    {}\nReports:        {}\nDocuments:      {}\n",
            stats.schema_version, stats.startups, stats.competitors, stats.reports, stats.documents
        ),
        OutputFormat::Json | OutputFormat::Ndjson => format.to_json(stats),
    }
}

/// Renders the result of `dealroom report`.
#[must_use]
pub fn format_report(outcome: &ReportOutcome, format: OutputFormat) -> String {
    if format != OutputFormat::Text {
        return format.to_json(outcome);
    }

    let report = &outcome.report;
    let mut output = report.report_text.trim_end().to_string();
    let _ = write!(
        output,
        "\n\n---\nKind: {} | Action: {} | Origin: {} | Competitors: {} | Recommendations: {}",
        report.kind,
        report.action,
        report.origin.as_str(),
        outcome.competitors.len(),
        outcome.recommendations.len(),
    );
    if let Some(saved) = &outcome.persisted {
        let _ = write!(
            output,
            "\nSaved: {} inserted, {} updated",
            saved.inserted, saved.updated
        );
        for err in &saved.errors {
            let _ = write!(output, "\nSave error: {err}");
        }
    }
    if let Some(memo) = &outcome.memo {
        let _ = write!(
            output,
            "\nRecommendation: {} ({}% confidence)",
            memo.recommendation.as_str(),
            memo.confidence
        );
    }
    output.push('\n');
    output
}

/// Renders a list of startups.
#[must_use]
pub fn format_startups(startups: &[Startup], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if startups.is_empty() {
                return "No startups.\n".to_string();
            }
            let mut output = String::new();
            for startup in startups {
                let _ = writeln!(
                    output,
                    "{}  {}  {}",
                    startup.id,
                    startup.name,
                    startup.sector.as_deref().unwrap_or("-")
                );
            }
            output
        }
        OutputFormat::Json => format.to_json(startups),
        OutputFormat::Ndjson => startups
            .iter()
            .map(|s| format.to_json(s) + "\n")
            .collect(),
    }
}
