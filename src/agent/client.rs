//! Provider factory.
//!
//! Maps the configured [`ProviderKind`] to a concrete [`LlmProvider`].

use std::sync::Arc;

use crate::agent::config::{AgentConfig, ProviderKind};
use crate::agent::provider::LlmProvider;
use crate::agent::providers::{DisabledProvider, OpenAiProvider};

/// Creates the provider selected by `config`.
///
/// - `openai`: OpenAI-compatible APIs via `async-openai`
/// - `offline`: refuses every call so flows serve fallback reports
#[must_use]
pub fn create_provider(config: &AgentConfig) -> Arc<dyn LlmProvider> {
    match config.provider {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config)),
        ProviderKind::Offline => Arc::new(DisabledProvider),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_openai_provider() {
        let config = AgentConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(create_provider(&config).name(), "openai");
    }

    #[test]
    fn test_create_offline_provider() {
        assert_eq!(create_provider(&AgentConfig::offline()).name(), "offline");
    }
}
