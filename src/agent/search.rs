//! Backends answering the `web_search` tool.
//!
//! The HTTP backend posts `{"query": ...}` to a configured endpoint and
//! expects `{"results": [{"title", "url", "snippet"}]}` (a bare array is
//! accepted too).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AgentError;

/// Maximum hits returned to the model.
const MAX_RESULTS: usize = 8;

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Page URL.
    #[serde(default)]
    pub url: String,
    /// Text excerpt.
    #[serde(default, alias = "content", alias = "description")]
    pub snippet: String,
}

/// Answers web search queries.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Runs a query.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Search`] when the backend fails.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, AgentError>;
}

/// Backend used when no search endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSearch;

#[async_trait]
impl SearchBackend for NoSearch {
    async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, AgentError> {
        Err(AgentError::Search {
            message: "no search backend configured".to_string(),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SearchPayload {
    Wrapped { results: Vec<SearchHit> },
    Bare(Vec<SearchHit>),
}

/// JSON-over-HTTP search endpoint.
#[derive(Debug, Clone)]
pub struct HttpSearchBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpSearchBackend {
    /// Creates a backend for `url` with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Search`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Search {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, AgentError> {
        let search_err = |e: reqwest::Error| AgentError::Search {
            message: e.to_string(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(search_err)?
            .error_for_status()
            .map_err(search_err)?;

        let payload: SearchPayload = response.json().await.map_err(search_err)?;
        let mut hits = match payload {
            SearchPayload::Wrapped { results } | SearchPayload::Bare(results) => results,
        };
        hits.truncate(MAX_RESULTS);

        debug!(query, hits = hits.len(), "web search complete");
        Ok(hits)
    }
}
