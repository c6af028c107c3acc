//! Agent factory.
//!
//! Chooses the answering strategy from the configured backend so callers
//! hold only a `Box<dyn Agent>`.

use std::sync::Arc;

use tracing::debug;

use super::config::AgentConfig;
use super::direct::DirectRetrievalAgent;
use super::model::BackendKind;
use super::provider::LlmProvider;
use super::tool_calling::ToolCallingAgent;
use super::traits::Agent;
use crate::store::{ActiveDocumentStore, VectorIndex};

/// Creates unbuilt agents for one deployment.
#[derive(Clone)]
pub struct AgentFactory {
    config: Arc<AgentConfig>,
    documents: Arc<dyn ActiveDocumentStore>,
    index: Arc<dyn VectorIndex>,
    provider: Option<Arc<dyn LlmProvider>>,
}

impl AgentFactory {
    /// Creates a factory over the given collaborators.
    #[must_use]
    pub fn new(
        config: Arc<AgentConfig>,
        documents: Arc<dyn ActiveDocumentStore>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            config,
            documents,
            index,
            provider: None,
        }
    }

    /// Hands `provider` to every agent instead of creating one per build.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// The shared configuration.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Returns an unbuilt agent; call [`Agent::build`] before answering.
    #[must_use]
    pub fn create(&self) -> Box<dyn Agent> {
        let config = Arc::clone(&self.config);
        let documents = Arc::clone(&self.documents);
        let index = Arc::clone(&self.index);
        debug!(backend = %config.backend, "creating agent");

        match config.backend {
            BackendKind::OpenAi => {
                let agent = ToolCallingAgent::new(config, documents, index);
                match &self.provider {
                    Some(provider) => Box::new(agent.with_provider(Arc::clone(provider))),
                    None => Box::new(agent),
                }
            }
            BackendKind::Ollama => {
                let agent = DirectRetrievalAgent::new(config, documents, index);
                match &self.provider {
                    Some(provider) => Box::new(agent.with_provider(Arc::clone(provider))),
                    None => Box::new(agent),
                }
            }
        }
    }
}

impl std::fmt::Debug for AgentFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentFactory")
            .field("backend", &self.config.backend)
            .field("provider_injected", &self.provider.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::traits::AgentState;
    use crate::error::AgentError;
    use crate::store::{ActiveDocumentSet, RetrievedPassage};

    use async_trait::async_trait;

    struct NoDocs;

    #[async_trait]
    impl ActiveDocumentStore for NoDocs {
        async fn active_documents(&self) -> Result<ActiveDocumentSet, AgentError> {
            Ok(ActiveDocumentSet::default())
        }
    }

    struct EmptyIndex;

    #[async_trait]
    impl VectorIndex for EmptyIndex {
        async fn similarity_search(
            &self,
            _query: &str,
            _k: usize,
            _filter: Option<&ActiveDocumentSet>,
        ) -> Result<Vec<RetrievedPassage>, AgentError> {
            Ok(Vec::new())
        }
    }

    fn factory(backend: BackendKind) -> AgentFactory {
        let config = AgentConfig::builder()
            .backend(backend)
            .api_key("sk-test")
            .collection("kb")
            .build()
            .unwrap_or_else(|e| panic!("config failed: {e}"));
        AgentFactory::new(Arc::new(config), Arc::new(NoDocs), Arc::new(EmptyIndex))
    }

    #[test]
    fn test_hosted_backend_gets_tool_calling_agent() {
        let agent = factory(BackendKind::OpenAi).create();
        assert_eq!(agent.name(), "tool-calling");
        assert_eq!(agent.state(), AgentState::Uninitialized);
    }

    #[test]
    fn test_self_hosted_backend_gets_direct_agent() {
        let agent = factory(BackendKind::Ollama).create();
        assert_eq!(agent.name(), "direct-retrieval");
        assert_eq!(agent.state(), AgentState::Uninitialized);
    }

    #[test]
    fn test_created_agent_builds_with_configured_provider() {
        let mut agent = factory(BackendKind::Ollama).create();
        agent.build().unwrap_or_else(|e| panic!("build failed: {e}"));
        assert_eq!(agent.state(), AgentState::Ready);
    }
}
