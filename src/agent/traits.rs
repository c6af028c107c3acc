//! Agent trait definition.
//!
//! Both strategies (tool-calling and direct retrieval) implement this
//! trait, so callers depend only on the contract and never on the concrete
//! strategy picked by the factory.

use async_trait::async_trait;
use serde::Serialize;
use tracing::error;

use super::config::AgentConfig;
use super::history::ConversationTurn;
use super::prompt;
use crate::error::AgentError;

/// Text returned to the caller when answering failed.
pub const APOLOGY: &str = "I apologize, but I encountered an error while processing your request.";

/// Response from an agent execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentResponse {
    /// The agent's answer text.
    pub answer: String,
    /// Passage text the answer was grounded on. Empty when nothing was
    /// retrieved or answering failed.
    pub evidence: String,
}

impl AgentResponse {
    /// The soft-failure response: fixed apology, no evidence.
    #[must_use]
    pub fn apology() -> Self {
        Self {
            answer: APOLOGY.to_string(),
            evidence: String::new(),
        }
    }

    /// Returns `true` if this is the soft-failure response.
    #[must_use]
    pub fn is_apology(&self) -> bool {
        self.answer == APOLOGY && self.evidence.is_empty()
    }
}

/// Lifecycle of an agent instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    /// Created by the factory, nothing resolved yet.
    Uninitialized,
    /// System prompt rendered, clients not yet wired.
    Built,
    /// Fully wired; `answer` may be called.
    Ready,
}

/// Trait implemented by both answering strategies.
///
/// An agent is created unbuilt, must be [`built`](Agent::build) once, and
/// can then answer any number of queries concurrently. Nothing below the
/// agent boundary escapes [`Agent::answer`]: failures become the
/// [`AgentResponse::apology`] response.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Current lifecycle state.
    fn state(&self) -> AgentState;

    /// Renders the system prompt, then wires the model client and
    /// retrieval bindings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error ([`AgentError::is_configuration`])
    /// when a required identifier is missing.
    fn build(&mut self) -> Result<(), AgentError>;

    /// Answers `query`, propagating every failure.
    ///
    /// `history` holds earlier turns of the same conversation, oldest first,
    /// and is never modified.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::NotBuilt`] before [`Agent::build`], otherwise
    /// retrieval or generation errors.
    async fn try_answer(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<AgentResponse, AgentError>;

    /// Answers `query` with a best-effort response.
    ///
    /// Any failure other than a missing [`Agent::build`] is logged and
    /// replaced with [`AgentResponse::apology`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::NotBuilt`] if called before [`Agent::build`].
    async fn answer(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<AgentResponse, AgentError> {
        match self.try_answer(query, history).await {
            Ok(response) => Ok(response),
            Err(e @ AgentError::NotBuilt { .. }) => Err(e),
            Err(e) => {
                error!(agent = self.name(), error = %e, details = ?e, "answer failed");
                Ok(AgentResponse::apology())
            }
        }
    }
}

/// Renders the system prompt for `config`, including any project text.
///
/// Does not validate the configuration.
#[must_use]
pub fn system_prompt(config: &AgentConfig) -> String {
    let extra_info =
        prompt::load_project_extra_info(config.prompt_dir.as_deref(), config.project.as_deref());
    prompt::render(&config.prompt, &extra_info)
}

/// First build phase shared by both strategies: checks the required
/// identifiers and renders the system prompt.
pub(crate) fn prepare_system_prompt(config: &AgentConfig) -> Result<String, AgentError> {
    match config.collection.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => {}
        _ => {
            return Err(AgentError::Configuration {
                message: "vector collection name is not set (VECTORSTORE_COLLECTION_NAME)"
                    .to_string(),
            });
        }
    }
    Ok(system_prompt(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    fn config() -> AgentConfig {
        AgentConfig::builder()
            .api_key("sk-test")
            .collection("kb")
            .persona("support engineer")
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_apology_response() {
        let r = AgentResponse::apology();
        assert_eq!(r.answer, APOLOGY);
        assert!(r.evidence.is_empty());
        assert!(r.is_apology());
    }

    #[test]
    fn test_prepare_requires_collection() {
        let mut cfg = config();
        cfg.collection = None;
        let result = prepare_system_prompt(&cfg);
        assert!(matches!(result, Err(AgentError::Configuration { .. })));
    }

    #[test]
    fn test_prepare_rejects_blank_collection() {
        let mut cfg = config();
        cfg.collection = Some("   ".to_string());
        let result = prepare_system_prompt(&cfg);
        assert!(matches!(result, Err(ref e) if e.is_configuration()));
    }

    #[test]
    fn test_prepare_renders_persona() {
        let prompt = prepare_system_prompt(&config()).unwrap_or_else(|_| unreachable!());
        assert!(prompt.starts_with("You are a support engineer,"));
    }

    #[test]
    fn test_system_prompt_includes_project_text() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        fs::create_dir_all(dir.path().join("projects")).unwrap_or_else(|_| unreachable!());
        fs::write(
            dir.path().join("projects").join("acme.md"),
            "Acme sells anvils.",
        )
        .unwrap_or_else(|_| unreachable!());

        let mut cfg = config();
        cfg.project = Some("acme".to_string());
        cfg.prompt_dir = Some(dir.path().to_path_buf());
        assert!(system_prompt(&cfg).contains("Acme sells anvils."));
    }
}
