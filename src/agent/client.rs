//! Provider registry and factory.
//!
//! Maps the configured backend to a concrete [`LlmProvider`].

use std::sync::Arc;

use tracing::debug;

use crate::agent::config::AgentConfig;
use crate::agent::model::BackendKind;
use crate::agent::provider::LlmProvider;
use crate::agent::providers::OpenAiProvider;
use crate::error::AgentError;

/// Creates an [`LlmProvider`] for the configured backend.
///
/// # Supported Backends
///
/// - [`BackendKind::OpenAi`]: the hosted API via `async-openai`
/// - [`BackendKind::Ollama`]: a self-hosted server through its
///   `OpenAI`-compatible endpoint
///
/// # Errors
///
/// Returns [`AgentError::ApiKeyMissing`] if the hosted backend has no key.
pub fn create_provider(config: &AgentConfig) -> Result<Arc<dyn LlmProvider>, AgentError> {
    match config.backend {
        BackendKind::OpenAi if config.api_key.is_empty() => Err(AgentError::ApiKeyMissing),
        BackendKind::OpenAi | BackendKind::Ollama => {
            debug!(
                backend = %config.backend,
                base_url = config.base_url.as_deref().unwrap_or("default"),
                "creating provider"
            );
            Ok(Arc::new(OpenAiProvider::new(config)))
        }
    }
}
