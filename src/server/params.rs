//! Request bodies and query strings for the HTTP API.
//!
//! Bodies use camelCase field names; responses are the snake_case
//! serializations of the pipeline and storage types.

use serde::Deserialize;

use crate::agent::Subject;
use crate::core::{ChatTurn, Metrics, Startup};

/// Body of `POST /api/agents/{competitors,market,memo}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentBody {
    /// Startup the report is about.
    #[serde(default)]
    pub subject_id: String,

    /// Display name; read from the stored startup when absent.
    #[serde(default)]
    pub subject_name: Option<String>,

    /// Description; read from the stored startup when absent.
    #[serde(default)]
    pub subject_description: Option<String>,

    /// Sector or category; read from the stored startup when absent.
    #[serde(default)]
    pub subject_category: Option<String>,

    /// Flow action; the kind's default when absent.
    #[serde(default)]
    pub action: Option<String>,
}

impl AgentBody {
    /// The report subject named by this body.
    #[must_use]
    pub fn subject(&self) -> Subject {
        Subject {
            id: self.subject_id.clone(),
            name: self.subject_name.clone(),
            description: self.subject_description.clone(),
            category: self.subject_category.clone(),
        }
    }
}

/// Query string of the agent endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct StreamQuery {
    /// Respond with `text/event-stream` instead of JSON.
    #[serde(default)]
    pub stream: Option<bool>,
}

/// Body of `POST /api/competitors/process`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessCompetitorsBody {
    /// Startup the competitors belong to.
    pub startup_id: String,

    /// Research text; the latest stored competitors report when absent.
    #[serde(default)]
    pub research_report: Option<String>,
}

/// Body of `POST /api/documents/process`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentBody {
    /// Startup to file the review under; nothing is stored when absent.
    #[serde(default)]
    pub startup_id: Option<String>,

    /// File or display name.
    #[serde(default)]
    pub name: String,

    /// Kind of document.
    #[serde(default)]
    pub doc_type: Option<String>,

    /// Extracted text.
    #[serde(default)]
    pub content: String,
}

/// `?startupId=` query of the metrics endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupQuery {
    /// Startup id.
    pub startup_id: String,
}

/// Body of `POST /api/analyze-startup` and `POST /api/generate-summary`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisBody {
    /// Stored startup to analyze.
    #[serde(default)]
    pub startup_id: String,
}

/// Body of `POST /api/chat-analysis`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    /// Stored startup under discussion.
    #[serde(default)]
    pub startup_id: String,

    /// The analyst's message.
    #[serde(default)]
    pub message: String,

    /// Earlier turns, oldest first.
    #[serde(default)]
    pub conversation_history: Vec<ChatTurn>,
}

/// `?kind=` filter of the analyses list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysesQuery {
    /// `investment` or `summary`; every kind when absent.
    #[serde(default)]
    pub kind: Option<String>,
}

/// Body of `POST /api/metrics`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsBody {
    /// Startup the metrics belong to.
    pub startup_id: String,

    /// Fields to upsert.
    #[serde(flatten)]
    pub metrics: Metrics,
}

/// Body of `POST /api/startups`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupBody {
    /// Explicit id; a v4 UUID is generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Display name.
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub team_info: Option<String>,
}

impl StartupBody {
    /// Builds the startup row.
    #[must_use]
    pub fn into_startup(self) -> Startup {
        let mut startup = Startup::new(self.name.trim());
        if let Some(id) = self.id.filter(|id| !id.trim().is_empty()) {
            startup.id = id;
        }
        startup.description = self.description;
        startup.sector = self.sector;
        startup.stage = self.stage;
        startup.country = self.country;
        startup.team_info = self.team_info;
        startup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_body_is_camel_case() {
        let body: AgentBody = serde_json::from_str(
            r#"{"subjectId":"42","subjectName":"Acme","subjectCategory":"Fintech"}"#,
        )
        .unwrap_or_else(|_| unreachable!());
        let subject = body.subject();
        assert_eq!(subject.id, "42");
        assert_eq!(subject.name.as_deref(), Some("Acme"));
        assert_eq!(subject.category.as_deref(), Some("Fintech"));
        assert!(body.action.is_none());
    }

    #[test]
    fn test_metrics_body_flattens_fields() {
        let body: MetricsBody =
            serde_json::from_str(r#"{"startupId":"42","arr":1200000.0,"burn_rate":80000}"#)
                .unwrap_or_else(|_| unreachable!());
        assert_eq!(body.startup_id, "42");
        assert_eq!(body.metrics.arr, Some(1_200_000.0));
    }

    #[test]
    fn test_startup_body_keeps_explicit_id() {
        let body: StartupBody =
            serde_json::from_str(r#"{"id":"s1","name":" Acme ","teamInfo":"Two founders"}"#)
                .unwrap_or_else(|_| unreachable!());
        let startup = body.into_startup();
        assert_eq!(startup.id, "s1");
        assert_eq!(startup.name, "Acme");
        assert_eq!(startup.team_info.as_deref(), Some("Two founders"));
    }

    #[test]
    fn test_chat_body_history_defaults_to_empty() {
        let body: ChatBody = serde_json::from_str(r#"{"startupId":"s1","message":"Burn?"}"#)
            .unwrap_or_else(|_| unreachable!());
        assert!(body.conversation_history.is_empty());

        let body: ChatBody = serde_json::from_str(
            r#"{"startupId":"s1","message":"And churn?","conversationHistory":[{"role":"assistant","content":"Burn is 80k."}]}"#,
        )
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(body.conversation_history[0].role, "assistant");
    }
}
