//! Direct-retrieval agent.
//!
//! Retrieves unconditionally before a single plain completion. Used with the
//! self-hosted backend, whose index cannot filter by source, so candidates
//! are over-fetched and filtered client-side.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::client::create_provider;
use super::config::AgentConfig;
use super::history::ConversationTurn;
use super::message::ChatRequest;
use super::provider::LlmProvider;
use super::retrieval::{FilterMode, Retriever, newline_context, with_deadline};
use super::traits::{Agent, AgentResponse, AgentState, prepare_system_prompt};
use crate::error::AgentError;
use crate::store::{ActiveDocumentStore, VectorIndex};

/// Clients wired by the second build phase.
struct Wiring {
    model: &'static str,
    provider: Arc<dyn LlmProvider>,
    retriever: Retriever,
}

/// Agent that always retrieves, then asks the model once.
pub struct DirectRetrievalAgent {
    config: Arc<AgentConfig>,
    documents: Arc<dyn ActiveDocumentStore>,
    index: Arc<dyn VectorIndex>,
    provider: Option<Arc<dyn LlmProvider>>,
    system_prompt: Option<String>,
    wiring: Option<Wiring>,
}

impl DirectRetrievalAgent {
    /// Creates an unbuilt agent.
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
            system_prompt: None,
            wiring: None,
        }
    }

    /// Uses `provider` instead of creating one from the configuration.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// The rendered system prompt, once built.
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }
}

impl std::fmt::Debug for DirectRetrievalAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectRetrievalAgent")
            .field("backend", &self.config.backend)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Assembles the single-blob completion prompt.
#[must_use]
pub fn direct_prompt(system_prompt: &str, context: &str, query: &str) -> String {
    format!("{system_prompt}\n\nContext:\n{context}\n\nUser: {query}")
}

#[async_trait]
impl Agent for DirectRetrievalAgent {
    fn name(&self) -> &'static str {
        "direct-retrieval"
    }

    fn state(&self) -> AgentState {
        if self.wiring.is_some() {
            AgentState::Ready
        } else if self.system_prompt.is_some() {
            AgentState::Built
        } else {
            AgentState::Uninitialized
        }
    }

    fn build(&mut self) -> Result<(), AgentError> {
        let system_prompt = prepare_system_prompt(&self.config)?;
        self.system_prompt = Some(system_prompt);

        let provider = match &self.provider {
            Some(provider) => Arc::clone(provider),
            None => create_provider(&self.config)?,
        };
        let retriever = Retriever::new(
            Arc::clone(&self.documents),
            Arc::clone(&self.index),
            self.config.retrieval_k,
            FilterMode::OverFetch {
                factor: self.config.over_fetch_factor,
            },
            self.config.timeout,
        );
        let model = self.config.model_name();
        self.wiring = Some(Wiring {
            model,
            provider,
            retriever,
        });

        info!(agent = self.name(), model, "agent built");
        Ok(())
    }

    async fn try_answer(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<AgentResponse, AgentError> {
        let (Some(wiring), Some(system_prompt)) = (&self.wiring, &self.system_prompt) else {
            return Err(AgentError::NotBuilt { agent: self.name() });
        };

        // Only the latest query and fresh context reach the model.
        debug!(history_turns = history.len(), "history not included in direct prompt");

        let passages = wiring.retriever.retrieve_or_empty(query).await;
        let context = newline_context(&passages);
        let prompt = direct_prompt(system_prompt, &context, query);

        let request = ChatRequest::completion(wiring.model, &prompt, self.config.temperature);
        let response = with_deadline(
            "generation",
            self.config.timeout,
            wiring.provider.chat(&request),
        )
        .await?;

        if response.content.trim().is_empty() {
            return Err(AgentError::ResponseParse {
                message: "model returned an empty answer".to_string(),
                content: response.content,
            });
        }

        info!(
            agent = self.name(),
            passages = passages.len(),
            total_tokens = response.usage.total_tokens,
            "answer generated"
        );

        Ok(AgentResponse {
            answer: response.content,
            evidence: context,
        })
    }
}
