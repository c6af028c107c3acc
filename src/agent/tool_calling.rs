//! Tool-calling agent.
//!
//! Exposes retrieval to the model as the `semantic_search` tool and lets the
//! model decide whether, and how often, to search. Used with the hosted
//! backend, whose index filters by source natively.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::agentic_loop::{ToolStep, agentic_loop};
use super::client::create_provider;
use super::config::AgentConfig;
use super::executor::RetrievalToolExecutor;
use super::history::{ConversationTurn, adapt_history};
use super::message::{ChatRequest, system_message, user_message};
use super::provider::LlmProvider;
use super::retrieval::{FilterMode, Retriever};
use super::tool::ToolSet;
use super::traits::{Agent, AgentResponse, AgentState, prepare_system_prompt};
use crate::error::AgentError;
use crate::store::{ActiveDocumentStore, VectorIndex};

/// Separator placed between tool outputs in the evidence trail.
const EVIDENCE_SEPARATOR: &str = ";";

/// Clients wired by the second build phase.
struct Wiring {
    model: &'static str,
    provider: Arc<dyn LlmProvider>,
    executor: RetrievalToolExecutor,
}

/// Agent that retrieves through a model-invoked tool.
pub struct ToolCallingAgent {
    config: Arc<AgentConfig>,
    documents: Arc<dyn ActiveDocumentStore>,
    index: Arc<dyn VectorIndex>,
    provider: Option<Arc<dyn LlmProvider>>,
    system_prompt: Option<String>,
    wiring: Option<Wiring>,
}

impl ToolCallingAgent {
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

impl std::fmt::Debug for ToolCallingAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCallingAgent")
            .field("backend", &self.config.backend)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Prefixes every tool observation with `;`, in invocation order.
fn tool_evidence(steps: &[ToolStep]) -> String {
    steps.iter().fold(String::new(), |mut evidence, step| {
        evidence.push_str(EVIDENCE_SEPARATOR);
        evidence.push_str(&step.result.content);
        evidence
    })
}

#[async_trait]
impl Agent for ToolCallingAgent {
    fn name(&self) -> &'static str {
        "tool-calling"
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
            FilterMode::Native,
            self.config.timeout,
        );
        let model = self.config.model_name();
        self.wiring = Some(Wiring {
            model,
            provider,
            executor: RetrievalToolExecutor::new(retriever),
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

        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(system_message(system_prompt));
        messages.extend(adapt_history(history));
        messages.push(user_message(query));

        let mut request = ChatRequest {
            model: wiring.model.to_string(),
            messages,
            temperature: Some(self.config.temperature),
            max_tokens: None,
            tools: ToolSet::retrieval().definitions().to_vec(),
        };

        let outcome = agentic_loop(
            wiring.provider.as_ref(),
            &mut request,
            &wiring.executor,
            self.config.max_tool_iterations,
            self.config.timeout,
        )
        .await?;

        if outcome.response.content.trim().is_empty() {
            return Err(AgentError::ResponseParse {
                message: "model returned an empty answer".to_string(),
                content: outcome.response.content,
            });
        }

        let evidence = tool_evidence(&outcome.steps);
        info!(
            agent = self.name(),
            tool_calls = outcome.steps.len(),
            evidence_len = evidence.len(),
            total_tokens = outcome.response.usage.total_tokens,
            "answer generated"
        );

        Ok(AgentResponse {
            answer: outcome.response.content,
            evidence,
        })
    }
}
