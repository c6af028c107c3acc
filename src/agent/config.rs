//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! The resulting [`AgentConfig`] is the only place backend selection lives;
//! agents receive it by value at construction and never read the environment.

use std::path::PathBuf;
use std::time::Duration;

use super::model::{self, BackendKind};
use super::prompt::{self, PromptParams};
use crate::error::AgentError;

/// Default request timeout in seconds, applied to every suspension point.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default maximum tool-calling loop iterations.
const DEFAULT_MAX_TOOL_ITERATIONS: usize = 10;
/// Passages kept per retrieval.
const DEFAULT_RETRIEVAL_K: usize = 5;
/// Candidates fetched per kept passage when the index cannot filter natively.
const DEFAULT_OVER_FETCH_FACTOR: usize = 4;
/// `OpenAI`-compatible endpoint exposed by a local Ollama server.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
/// Ollama ignores the API key but the client requires one.
const OLLAMA_PLACEHOLDER_KEY: &str = "ollama";

/// Configuration for an agent instance.
///
/// Immutable once built; shared read-only between concurrent `answer` calls.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Which backend (and therefore which agent strategy) to use.
    pub backend: BackendKind,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Requested logical model identifier, resolved by the model selector.
    pub model: Option<String>,
    /// Vector collection holding this deployment's passages.
    pub collection: Option<String>,
    /// Project name used to look up supplementary prompt text.
    pub project: Option<String>,
    /// Persona, tone, and the other system prompt inputs.
    pub prompt: PromptParams,
    /// Sampling temperature.
    pub temperature: f32,
    /// Deadline for each model, retrieval, and persistence call.
    pub timeout: Duration,
    /// Maximum tool-calling loop iterations before aborting.
    pub max_tool_iterations: usize,
    /// Passages kept per retrieval.
    pub retrieval_k: usize,
    /// Over-fetch multiplier for client-side filtering.
    pub over_fetch_factor: usize,
    /// Directory containing project prompt files.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if the hosted backend is
    /// selected and no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }

    /// Concrete chat model name for this configuration.
    #[must_use]
    pub fn model_name(&self) -> &'static str {
        model::resolve(self.model.as_deref(), self.backend)
    }

    /// Embedding model name for this configuration's backend.
    #[must_use]
    pub const fn embedding_model(&self) -> &'static str {
        model::embedding_model(self.backend)
    }

    /// Number of candidates fetched before client-side filtering.
    #[must_use]
    pub const fn over_fetch_k(&self) -> usize {
        self.retrieval_k.saturating_mul(self.over_fetch_factor)
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    backend: Option<BackendKind>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    collection: Option<String>,
    project: Option<String>,
    persona: Option<String>,
    glossary: Option<String>,
    tone: Option<String>,
    response_length: Option<String>,
    content: Option<String>,
    temperature: Option<f32>,
    timeout: Option<Duration>,
    max_tool_iterations: Option<usize>,
    retrieval_k: Option<usize>,
    over_fetch_factor: Option<usize>,
    prompt_dir: Option<PathBuf>,
}

fn env_string(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.backend.is_none() {
            self.backend = std::env::var("KBCHAT_BACKEND")
                .ok()
                .and_then(|v| BackendKind::parse(&v))
                .or_else(|| {
                    std::env::var("USE_OPENAI").ok().map(|v| {
                        if v.eq_ignore_ascii_case("true") {
                            BackendKind::OpenAi
                        } else {
                            BackendKind::Ollama
                        }
                    })
                });
        }
        if self.api_key.is_none() {
            self.api_key = env_string(&["OPENAI_API_KEY", "KBCHAT_API_KEY"]);
        }
        if self.base_url.is_none() {
            self.base_url = env_string(&["OPENAI_BASE_URL", "KBCHAT_BASE_URL"]);
        }
        if self.model.is_none() {
            self.model = env_string(&["LLM_MODEL", "KBCHAT_MODEL"]);
        }
        if self.collection.is_none() {
            self.collection = env_string(&["VECTORSTORE_COLLECTION_NAME"]);
        }
        if self.project.is_none() {
            self.project = env_string(&["PROJECT_NAME"]);
        }
        if self.persona.is_none() {
            self.persona = env_string(&["KBCHAT_PERSONA"]);
        }
        if self.glossary.is_none() {
            self.glossary = env_string(&["KBCHAT_GLOSSARY"]);
        }
        if self.tone.is_none() {
            self.tone = env_string(&["KBCHAT_TONE"]);
        }
        if self.response_length.is_none() {
            self.response_length = env_string(&["KBCHAT_RESPONSE_LENGTH"]);
        }
        if self.content.is_none() {
            self.content = env_string(&["KBCHAT_CONTENT"]);
        }
        if self.timeout.is_none() {
            self.timeout = env_parse("KBCHAT_TIMEOUT_SECS").map(Duration::from_secs);
        }
        if self.retrieval_k.is_none() {
            self.retrieval_k = env_parse("KBCHAT_RETRIEVAL_K");
        }
        if self.over_fetch_factor.is_none() {
            self.over_fetch_factor = env_parse("KBCHAT_OVER_FETCH");
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = env_string(&["KBCHAT_PROMPT_DIR"]).map(PathBuf::from);
        }
        self
    }

    /// Sets the backend kind.
    #[must_use]
    pub const fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = Some(backend);
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

    /// Sets the requested model identifier.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the vector collection name.
    #[must_use]
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    /// Sets the project name.
    #[must_use]
    pub fn project(mut self, name: impl Into<String>) -> Self {
        self.project = Some(name.into());
        self
    }

    /// Sets the assistant persona.
    #[must_use]
    pub fn persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    /// Sets the glossary text.
    #[must_use]
    pub fn glossary(mut self, glossary: impl Into<String>) -> Self {
        self.glossary = Some(glossary.into());
        self
    }

    /// Sets the response tone.
    #[must_use]
    pub fn tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }

    /// Sets the desired response length.
    #[must_use]
    pub fn response_length(mut self, length: impl Into<String>) -> Self {
        self.response_length = Some(length.into());
        self
    }

    /// Sets the free-form content instructions.
    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the maximum tool-calling loop iterations.
    #[must_use]
    pub const fn max_tool_iterations(mut self, n: usize) -> Self {
        self.max_tool_iterations = Some(n);
        self
    }

    /// Sets the number of passages kept per retrieval.
    #[must_use]
    pub const fn retrieval_k(mut self, k: usize) -> Self {
        self.retrieval_k = Some(k);
        self
    }

    /// Sets the over-fetch multiplier.
    #[must_use]
    pub const fn over_fetch_factor(mut self, factor: usize) -> Self {
        self.over_fetch_factor = Some(factor);
        self
    }

    /// Sets the prompt directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Backend selected so far, or the default.
    #[must_use]
    pub fn configured_backend(&self) -> BackendKind {
        self.backend.unwrap_or_default()
    }

    /// Prompt inputs gathered so far, with defaults for anything unset.
    #[must_use]
    pub fn prompt_params(&self) -> PromptParams {
        let defaults = PromptParams::default();
        PromptParams {
            persona: self.persona.clone().unwrap_or(defaults.persona),
            glossary: self.glossary.clone().unwrap_or(defaults.glossary),
            tone: self.tone.clone().unwrap_or(defaults.tone),
            response_length: self
                .response_length
                .clone()
                .unwrap_or(defaults.response_length),
            content: self.content.clone().unwrap_or(defaults.content),
        }
    }

    /// Renders the system prompt from the values gathered so far.
    ///
    /// Unlike [`Self::build`], needs no credentials.
    #[must_use]
    pub fn render_system_prompt(&self) -> String {
        let extra_info =
            prompt::load_project_extra_info(self.prompt_dir.as_deref(), self.project.as_deref());
        prompt::render(&self.prompt_params(), &extra_info)
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if the hosted backend has no
    /// API key, or [`AgentError::Configuration`] for a zero retrieval size.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let backend = self.backend.unwrap_or_default();
        let prompt = self.prompt_params();

        let api_key = match (backend, self.api_key) {
            (_, Some(key)) => key,
            (BackendKind::Ollama, None) => OLLAMA_PLACEHOLDER_KEY.to_string(),
            (BackendKind::OpenAi, None) => return Err(AgentError::ApiKeyMissing),
        };

        let base_url = match backend {
            BackendKind::OpenAi => self.base_url,
            BackendKind::Ollama => Some(
                self.base_url
                    .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string()),
            ),
        };

        let retrieval_k = self.retrieval_k.unwrap_or(DEFAULT_RETRIEVAL_K);
        if retrieval_k == 0 {
            return Err(AgentError::Configuration {
                message: "retrieval_k must be at least 1".to_string(),
            });
        }

        Ok(AgentConfig {
            backend,
            api_key,
            base_url,
            model: self.model,
            collection: self.collection,
            project: self.project,
            prompt,
            temperature: self.temperature.unwrap_or(0.0),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_tool_iterations: self
                .max_tool_iterations
                .unwrap_or(DEFAULT_MAX_TOOL_ITERATIONS),
            retrieval_k,
            over_fetch_factor: self
                .over_fetch_factor
                .unwrap_or(DEFAULT_OVER_FETCH_FACTOR)
                .max(1),
            prompt_dir: self.prompt_dir,
        })
    }
}
