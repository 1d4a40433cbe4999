//! Tools declared to the model.
//!
//! Two tools exist: `web_search` for every report flow, and
//! `save_competitor` for competitor research only. Whether a call is
//! executed or only narrated is decided by [`ToolMode`](super::config::ToolMode).

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::CompetitorProfile;
use crate::error::AgentError;
use crate::extract::strict::parse_record;

/// Name of the search tool.
pub const WEB_SEARCH: &str = "web_search";
/// Name of the competitor persistence tool.
pub const SAVE_COMPETITOR: &str = "save_competitor";

/// A tool declaration sent with a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name, matched by the executor.
    pub name: String,
    /// What the tool does, for the model.
    pub description: String,
    /// JSON Schema of the arguments.
    pub parameters: Value,
}

/// A call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned id.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Raw JSON arguments.
    pub arguments: String,
}

/// The answer fed back to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Call being answered.
    pub tool_call_id: String,
    /// JSON on success, message on failure.
    pub content: String,
    /// Whether the call failed.
    pub is_error: bool,
}

impl ToolResult {
    /// Successful result.
    #[must_use]
    pub fn ok(call: &ToolCall, content: String) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            content,
            is_error: false,
        }
    }

    /// Failed result carrying the error text.
    #[must_use]
    pub fn error(call: &ToolCall, error: &AgentError) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            content: error.to_string(),
            is_error: true,
        }
    }
}

/// Tools offered to one flow.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    definitions: Vec<ToolDefinition>,
}

impl ToolSet {
    /// Declarations in this set.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Owned declarations for a request.
    #[must_use]
    pub fn into_definitions(self) -> Vec<ToolDefinition> {
        self.definitions
    }

    /// `true` when no tool is offered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Number of tools offered.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.definitions.len()
    }

    /// `web_search` and `save_competitor`.
    #[must_use]
    pub fn research_tools() -> Self {
        Self {
            definitions: vec![def_web_search(), def_save_competitor()],
        }
    }

    /// `web_search` only.
    #[must_use]
    pub fn search_tools() -> Self {
        Self {
            definitions: vec![def_web_search()],
        }
    }

    /// No tools.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

fn def_web_search() -> ToolDefinition {
    ToolDefinition {
        name: WEB_SEARCH.to_string(),
        description: "Search the web for current information about companies, markets and \
                      competitors."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query."
                }
            },
            "required": ["query"]
        }),
    }
}

fn def_save_competitor() -> ToolDefinition {
    ToolDefinition {
        name: SAVE_COMPETITOR.to_string(),
        description: "Save a competitor found during research for the startup under analysis."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "startupId": {
                    "type": "string",
                    "description": "Id of the startup being analyzed."
                },
                "competitor": {
                    "type": "object",
                    "properties": {
                        "competitor_name": { "type": "string" },
                        "description": { "type": "string" },
                        "founded_year": { "type": "number" },
                        "employee_count": { "type": "number" },
                        "funding_raised": { "type": "number" },
                        "revenue": { "type": "number" },
                        "linkedin_url": { "type": "string" },
                        "website_url": { "type": "string" },
                        "main_features": { "type": "string" },
                        "similarity_score": {
                            "type": "number",
                            "description": "Similarity to the startup, between 0 and 1."
                        }
                    },
                    "required": ["competitor_name", "description"]
                }
            },
            "required": ["startupId", "competitor"]
        }),
    }
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
}

/// Parses `web_search` arguments.
///
/// # Errors
///
/// Returns [`AgentError::ToolExecution`] when `query` is missing or blank.
pub fn parse_search_args(arguments: &str) -> Result<String, AgentError> {
    let args: SearchArgs =
        serde_json::from_str(arguments).map_err(|e| invalid(WEB_SEARCH, &e.to_string()))?;
    let query = args.query.trim();
    if query.is_empty() {
        return Err(invalid(WEB_SEARCH, "empty query"));
    }
    Ok(query.to_string())
}

/// Parses `save_competitor` arguments into a record.
///
/// The competitor may sit under `competitor` or be the argument object
/// itself.
///
/// # Errors
///
/// Returns [`AgentError::ToolExecution`] when the arguments are not JSON or
/// the competitor lacks a name or a description.
pub fn parse_save_args(arguments: &str) -> Result<CompetitorProfile, AgentError> {
    let value: Value =
        serde_json::from_str(arguments).map_err(|e| invalid(SAVE_COMPETITOR, &e.to_string()))?;
    let competitor = value.get("competitor").unwrap_or(&value);
    parse_record(competitor)
        .ok_or_else(|| invalid(SAVE_COMPETITOR, "competitor needs a name and a description"))
}

/// Best-effort label for a call, used in trace lines and stream events.
///
/// Works on partial argument JSON as long as it parses.
#[must_use]
pub fn call_label(name: &str, arguments: &str) -> Option<String> {
    let value: Value = serde_json::from_str(arguments).ok()?;
    let label = match name {
        WEB_SEARCH => value.get("query")?.as_str()?.to_string(),
        SAVE_COMPETITOR => {
            let competitor = value.get("competitor").unwrap_or(&value);
            ["competitor_name", "name"]
                .iter()
                .find_map(|k| competitor.get(*k).and_then(Value::as_str))?
                .to_string()
        }
        _ => return None,
    };
    Some(label)
}

/// Trace line appended to a report for a tool call.
///
/// Narrated calls also carry a note that nothing was executed.
#[must_use]
pub fn trace_line(call: &ToolCall, executed: bool) -> String {
    let label = call_label(&call.name, &call.arguments).unwrap_or_default();
    match (call.name.as_str(), executed) {
        (WEB_SEARCH, true) => format!("\n\n--- SEARCHING FOR: {label} ---\n"),
        (WEB_SEARCH, false) => format!(
            "\n\n--- SEARCHING FOR: {label} ---\n\
             Note: web search was not executed; live results are not part of this report.\n"
        ),
        (SAVE_COMPETITOR, true) => format!("\n\n--- SAVING COMPETITOR: {label} ---\n"),
        (SAVE_COMPETITOR, false) => format!(
            "\n\n--- SAVING COMPETITOR: {label} ---\n\
             Note: the competitor was not saved by this call; it is picked up from the report text.\n"
        ),
        (other, _) => format!("\n\n--- TOOL CALL: {other} ---\n"),
    }
}

fn invalid(name: &str, message: &str) -> AgentError {
    AgentError::ToolExecution {
        name: name.to_string(),
        message: format!("invalid arguments: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[test]
    fn test_research_tools() {
        let ts = ToolSet::research_tools();
        assert_eq!(ts.len(), 2);
        let names: Vec<&str> = ts.definitions().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec![WEB_SEARCH, SAVE_COMPETITOR]);
    }

    #[test]
    fn test_search_tools_and_none() {
        assert_eq!(ToolSet::search_tools().len(), 1);
        assert!(ToolSet::none().is_empty());
    }

    #[test]
    fn test_definitions_have_object_schemas() {
        for def in ToolSet::research_tools().definitions() {
            assert!(!def.description.is_empty());
            assert_eq!(def.parameters["type"], "object");
        }
    }

    #[test]
    fn test_parse_search_args() {
        assert_eq!(
            parse_search_args(r#"{"query": " fintech lenders "}"#).ok(),
            Some("fintech lenders".to_string())
        );
        assert!(parse_search_args(r#"{"query": ""}"#).is_err());
        assert!(parse_search_args("not json").is_err());
    }

    #[test]
    fn test_parse_save_args_nested() {
        let profile = parse_save_args(
            r#"{"startupId": "42", "competitor": {"competitor_name": "Plaid", "description": "Bank APIs", "similarity_score": 1.4}}"#,
        )
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(profile.name, "Plaid");
        assert_eq!(profile.similarity_score, Some(1.0));
    }

    #[test]
    fn test_parse_save_args_requires_description() {
        let err = parse_save_args(r#"{"competitor": {"competitor_name": "Plaid"}}"#);
        assert!(matches!(err, Err(AgentError::ToolExecution { .. })));
    }

    #[test]
    fn test_trace_lines() {
        let search = call(WEB_SEARCH, r#"{"query": "neobanks"}"#);
        assert!(trace_line(&search, true).contains("--- SEARCHING FOR: neobanks ---"));
        assert!(trace_line(&search, false).contains("not executed"));

        let save = call(SAVE_COMPETITOR, r#"{"competitor": {"competitor_name": "Plaid"}}"#);
        assert!(trace_line(&save, true).contains("--- SAVING COMPETITOR: Plaid ---"));
    }

    #[test]
    fn test_call_label_on_bad_json() {
        assert_eq!(call_label(WEB_SEARCH, "{\"que"), None);
        assert_eq!(call_label("other", "{}"), None);
    }
}
