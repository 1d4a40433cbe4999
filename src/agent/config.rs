//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::error::AgentError;

/// Default model for competitor and market reports.
const DEFAULT_REPORT_MODEL: &str = "gpt-4o";
/// Default model for memos.
const DEFAULT_MEMO_MODEL: &str = "gpt-4o";
/// Default model for JSON extraction and document processing.
const DEFAULT_EXTRACTION_MODEL: &str = "gpt-4o-mini";
/// Default temperature for report generation.
const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Temperature for JSON extraction.
const EXTRACTION_TEMPERATURE: f32 = 0.1;
/// Default report max tokens.
const DEFAULT_REPORT_MAX_TOKENS: u32 = 4000;
/// Default extraction max tokens.
const DEFAULT_EXTRACTION_MAX_TOKENS: u32 = 2000;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default maximum tool-calling loop iterations.
const DEFAULT_MAX_TOOL_ITERATIONS: usize = 5;

/// Which model backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// OpenAI-compatible chat API.
    OpenAi,
    /// No model; every flow serves its fallback report.
    Offline,
}

impl ProviderKind {
    /// Parses a provider name.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnsupportedProvider`] for unknown names.
    pub fn parse(s: &str) -> Result<Self, AgentError> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "offline" | "none" | "disabled" => Ok(Self::Offline),
            other => Err(AgentError::UnsupportedProvider {
                name: other.to_string(),
            }),
        }
    }

    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Offline => "offline",
        }
    }
}

/// What happens to tool calls the model makes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolMode {
    /// Record a trace line per call and execute nothing.
    #[default]
    Narrate,
    /// Run the calls and feed results back to the model.
    Execute,
}

impl ToolMode {
    /// Parses `narrate` / `execute`; anything else is narrate.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("execute") {
            Self::Execute
        } else {
            Self::Narrate
        }
    }

    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Narrate => "narrate",
            Self::Execute => "execute",
        }
    }
}

/// Configuration for the report pipeline's model calls.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Backend.
    pub provider: ProviderKind,
    /// API key; empty when offline.
    pub api_key: String,
    /// Base URL override for OpenAI-compatible endpoints.
    pub base_url: Option<String>,
    /// Model for competitor and market reports.
    pub report_model: String,
    /// Model for memos.
    pub memo_model: String,
    /// Model for JSON extraction and document processing.
    pub extraction_model: String,
    /// Temperature for report generation.
    pub temperature: f32,
    /// Temperature for extraction calls.
    pub extraction_temperature: f32,
    /// Token cap for reports.
    pub report_max_tokens: u32,
    /// Token cap for extraction calls.
    pub extraction_max_tokens: u32,
    /// Request timeout for model and search calls.
    pub timeout: Duration,
    /// Tool call handling.
    pub tool_mode: ToolMode,
    /// Maximum model round-trips in execute mode.
    pub max_tool_iterations: usize,
    /// HTTP search backend endpoint (execute mode).
    pub search_url: Option<String>,
    /// Directory with prompt overrides.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnsupportedProvider`] for an unknown provider name.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }

    /// Configuration with the model disabled.
    #[must_use]
    pub fn offline() -> Self {
        Self::builder()
            .provider(ProviderKind::Offline)
            .build()
            .unwrap_or_else(|_| Self::defaults(ProviderKind::Offline, String::new()))
    }

    fn defaults(provider: ProviderKind, api_key: String) -> Self {
        Self {
            provider,
            api_key,
            base_url: None,
            report_model: DEFAULT_REPORT_MODEL.to_string(),
            memo_model: DEFAULT_MEMO_MODEL.to_string(),
            extraction_model: DEFAULT_EXTRACTION_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            extraction_temperature: EXTRACTION_TEMPERATURE,
            report_max_tokens: DEFAULT_REPORT_MAX_TOKENS,
            extraction_max_tokens: DEFAULT_EXTRACTION_MAX_TOKENS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            tool_mode: ToolMode::Narrate,
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
            search_url: None,
            prompt_dir: None,
        }
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    provider_kind: Option<ProviderKind>,
    api_key: Option<String>,
    base_url: Option<String>,
    report_model: Option<String>,
    memo_model: Option<String>,
    extraction_model: Option<String>,
    temperature: Option<f32>,
    timeout: Option<Duration>,
    tool_mode: Option<ToolMode>,
    max_tool_iterations: Option<usize>,
    search_url: Option<String>,
    prompt_dir: Option<PathBuf>,
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() && self.provider_kind.is_none() {
            self.provider = env("DEALROOM_PROVIDER");
        }
        if self.api_key.is_none() {
            self.api_key = env("OPENAI_API_KEY").or_else(|| env("DEALROOM_API_KEY"));
        }
        if self.base_url.is_none() {
            self.base_url = env("OPENAI_BASE_URL").or_else(|| env("DEALROOM_BASE_URL"));
        }
        if self.report_model.is_none() {
            self.report_model = env("DEALROOM_REPORT_MODEL");
        }
        if self.memo_model.is_none() {
            self.memo_model = env("DEALROOM_MEMO_MODEL");
        }
        if self.extraction_model.is_none() {
            self.extraction_model = env("DEALROOM_EXTRACTION_MODEL");
        }
        if self.tool_mode.is_none() {
            self.tool_mode = env("DEALROOM_TOOL_MODE").map(|v| ToolMode::parse(&v));
        }
        if self.search_url.is_none() {
            self.search_url = env("DEALROOM_SEARCH_URL");
        }
        if self.timeout.is_none() {
            self.timeout = env("DEALROOM_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs);
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = env("DEALROOM_PROMPT_DIR").map(PathBuf::from);
        }
        self
    }

    /// Sets the provider by name; validated in [`Self::build`].
    #[must_use]
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider = Some(name.into());
        self
    }

    /// Sets the provider.
    #[must_use]
    pub const fn provider(mut self, kind: ProviderKind) -> Self {
        self.provider_kind = Some(kind);
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the report model.
    #[must_use]
    pub fn report_model(mut self, model: impl Into<String>) -> Self {
        self.report_model = Some(model.into());
        self
    }

    /// Sets the memo model.
    #[must_use]
    pub fn memo_model(mut self, model: impl Into<String>) -> Self {
        self.memo_model = Some(model.into());
        self
    }

    /// Sets the extraction model.
    #[must_use]
    pub fn extraction_model(mut self, model: impl Into<String>) -> Self {
        self.extraction_model = Some(model.into());
        self
    }

    /// Sets the report temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the tool mode.
    #[must_use]
    pub const fn tool_mode(mut self, mode: ToolMode) -> Self {
        self.tool_mode = Some(mode);
        self
    }

    /// Sets the maximum tool loop iterations.
    #[must_use]
    pub const fn max_tool_iterations(mut self, n: usize) -> Self {
        self.max_tool_iterations = Some(n);
        self
    }

    /// Sets the search backend URL.
    #[must_use]
    pub fn search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = Some(url.into());
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// A missing API key downgrades an `openai` provider to offline with a
    /// warning instead of failing.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnsupportedProvider`] for an unknown provider name.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let requested = match (self.provider_kind, self.provider.as_deref()) {
            (Some(kind), _) => kind,
            (None, Some(name)) => ProviderKind::parse(name)?,
            (None, None) => ProviderKind::OpenAi,
        };

        let api_key = self.api_key.unwrap_or_default();
        let provider = if requested == ProviderKind::OpenAi && api_key.trim().is_empty() {
            warn!("no API key configured; model calls are disabled and fallback reports will be served");
            ProviderKind::Offline
        } else {
            requested
        };

        let defaults = AgentConfig::defaults(provider, api_key);
        Ok(AgentConfig {
            base_url: self.base_url,
            report_model: self.report_model.unwrap_or(defaults.report_model),
            memo_model: self.memo_model.unwrap_or(defaults.memo_model),
            extraction_model: self.extraction_model.unwrap_or(defaults.extraction_model),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            timeout: self.timeout.unwrap_or(defaults.timeout),
            tool_mode: self.tool_mode.unwrap_or(defaults.tool_mode),
            max_tool_iterations: self
                .max_tool_iterations
                .unwrap_or(defaults.max_tool_iterations),
            search_url: self.search_url,
            prompt_dir: self.prompt_dir,
            ..defaults
        })
    }
}
