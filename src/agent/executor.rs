//! Executes tool calls in [`ToolMode::Execute`](super::config::ToolMode).
//!
//! `web_search` goes to a [`SearchBackend`]; `save_competitor` goes through
//! the idempotent persister, always scoped to the subject of the running
//! request whatever `startupId` the model passes.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::search::SearchBackend;
use super::tool::{
    SAVE_COMPETITOR, ToolCall, ToolResult, WEB_SEARCH, parse_save_args, parse_search_args,
};
use crate::core::UpsertAction;
use crate::error::AgentError;
use crate::persist::upsert_competitor;
use crate::storage::{SharedStorage, lock};

/// Maximum raw byte length of tool argument JSON from the model.
const MAX_TOOL_ARGS_LEN: usize = 100_000;

/// Dispatches tool calls.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Runs one call. Failures come back as error results, never panics.
    async fn execute(&self, call: &ToolCall) -> ToolResult;
}

/// Executor backed by a search backend and, optionally, the store.
pub struct ToolExecutor {
    search: Arc<dyn SearchBackend>,
    storage: Option<SharedStorage>,
    subject_id: String,
}

impl ToolExecutor {
    /// Creates an executor for one subject.
    #[must_use]
    pub fn new(
        search: Arc<dyn SearchBackend>,
        storage: Option<SharedStorage>,
        subject_id: impl Into<String>,
    ) -> Self {
        Self {
            search,
            storage,
            subject_id: subject_id.into(),
        }
    }

    async fn tool_web_search(&self, args: &str) -> Result<String, AgentError> {
        let query = parse_search_args(args)?;
        let hits = self.search.search(&query).await?;
        serde_json::to_string_pretty(&json!({ "query": query, "results": hits })).map_err(|e| {
            AgentError::ToolExecution {
                name: WEB_SEARCH.to_string(),
                message: format!("serialization error: {e}"),
            }
        })
    }

    fn tool_save_competitor(&self, args: &str) -> Result<String, AgentError> {
        let profile = parse_save_args(args)?;
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| AgentError::ToolExecution {
                name: SAVE_COMPETITOR.to_string(),
                message: "no storage available".to_string(),
            })?;

        let tool_err = |e: crate::error::Error| AgentError::ToolExecution {
            name: SAVE_COMPETITOR.to_string(),
            message: e.to_string(),
        };
        let action = {
            let mut guard = lock(storage).map_err(tool_err)?;
            upsert_competitor(&mut *guard, &self.subject_id, &profile).map_err(tool_err)?
        };

        let action = match action {
            UpsertAction::Inserted => "inserted",
            UpsertAction::Updated => "updated",
        };
        Ok(json!({ "saved": profile.name, "action": action }).to_string())
    }
}

#[async_trait]
impl ToolHandler for ToolExecutor {
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        if call.arguments.len() > MAX_TOOL_ARGS_LEN {
            return ToolResult::error(
                call,
                &AgentError::ToolExecution {
                    name: call.name.clone(),
                    message: format!(
                        "tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                        call.arguments.len()
                    ),
                },
            );
        }

        let result = match call.name.as_str() {
            WEB_SEARCH => self.tool_web_search(&call.arguments).await,
            SAVE_COMPETITOR => self.tool_save_competitor(&call.arguments),
            other => Err(AgentError::ToolExecution {
                name: other.to_string(),
                message: "unknown tool".to_string(),
            }),
        };

        match result {
            Ok(content) => ToolResult::ok(call, content),
            Err(e) => {
                debug!(tool = %call.name, error = %e, "tool call failed");
                ToolResult::error(call, &e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::search::{NoSearch, SearchHit};
    use crate::storage::{SqliteStorage, Storage, shared};

    struct FixedSearch;

    #[async_trait]
    impl SearchBackend for FixedSearch {
        async fn search(&self, query: &str) -> Result<Vec<SearchHit>, AgentError> {
            Ok(vec![SearchHit {
                title: format!("About {query}"),
                url: "https://example.com".to_string(),
                snippet: "snippet".to_string(),
            }])
        }
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    fn store() -> SharedStorage {
        let mut storage = SqliteStorage::in_memory().unwrap_or_else(|_| unreachable!());
        storage.init().unwrap_or_else(|_| unreachable!());
        shared(storage)
    }

    #[tokio::test]
    async fn test_web_search_returns_hits() {
        let executor = ToolExecutor::new(Arc::new(FixedSearch), None, "s1");
        let result = executor
            .execute(&call(WEB_SEARCH, r#"{"query": "neobanks"}"#))
            .await;
        assert!(!result.is_error);
        assert!(result.content.contains("About neobanks"));
        assert_eq!(result.tool_call_id, "call_1");
    }

    #[tokio::test]
    async fn test_web_search_without_backend_is_error_result() {
        let executor = ToolExecutor::new(Arc::new(NoSearch), None, "s1");
        let result = executor.execute(&call(WEB_SEARCH, r#"{"query": "x"}"#)).await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn test_save_competitor_is_scoped_to_subject() {
        let storage = store();
        let executor = ToolExecutor::new(Arc::new(NoSearch), Some(Arc::clone(&storage)), "s1");
        let args = r#"{"startupId": "other", "competitor": {"competitor_name": "Plaid", "description": "Bank APIs"}}"#;

        let first = executor.execute(&call(SAVE_COMPETITOR, args)).await;
        assert!(!first.is_error, "{}", first.content);
        assert!(first.content.contains("inserted"));
        let second = executor.execute(&call(SAVE_COMPETITOR, args)).await;
        assert!(second.content.contains("updated"));

        let guard = lock(&storage).unwrap_or_else(|_| unreachable!());
        assert_eq!(guard.list_competitors("s1").map(|c| c.len()).unwrap_or(0), 1);
        assert_eq!(guard.list_competitors("other").map(|c| c.len()).unwrap_or(0), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_and_oversized_args() {
        let executor = ToolExecutor::new(Arc::new(NoSearch), None, "s1");
        assert!(executor.execute(&call("delete_all", "{}")).await.is_error);

        let big = format!(r#"{{"query": "{}"}}"#, "x".repeat(MAX_TOOL_ARGS_LEN));
        let result = executor.execute(&call(WEB_SEARCH, &big)).await;
        assert!(result.is_error);
        assert!(result.content.contains("too large"));
    }
}
