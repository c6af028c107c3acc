//! Model selection.
//!
//! Maps a logical backend plus an optional requested identifier to the
//! concrete model name sent to the provider. Unknown identifiers fall back
//! to the backend default instead of failing.

use serde::{Deserialize, Serialize};

/// Which class of language-model provider an agent talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hosted `OpenAI` API. Drives the tool-calling agent.
    #[default]
    OpenAi,
    /// Self-hosted Ollama server. Drives the direct-retrieval agent.
    Ollama,
}

impl BackendKind {
    /// Parses a backend name (case-insensitive).
    ///
    /// Accepts `openai`/`hosted` and `ollama`/`self-hosted`/`local`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "hosted" => Some(Self::OpenAi),
            "ollama" | "self-hosted" | "selfhosted" | "local" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical id → model name for the hosted backend.
const OPENAI_MODELS: &[(&str, &str)] = &[
    ("gpt-3.5-turbo", "gpt-3.5-turbo"),
    ("gpt-4", "gpt-4"),
    ("gpt-4-turbo", "gpt-4-turbo-preview"),
];

/// Logical id → model name for the self-hosted backend.
const OLLAMA_MODELS: &[(&str, &str)] = &[("gemma", "gemma3:27b")];

/// Default chat model for the hosted backend.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4";
/// Default chat model for the self-hosted backend.
pub const DEFAULT_OLLAMA_MODEL: &str = "gemma3:27b";

/// Embedding model used by the hosted backend.
pub const OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-large";
/// Embedding model used by the self-hosted backend.
pub const OLLAMA_EMBEDDING_MODEL: &str = "mxbai-embed-large:latest";

const fn table(backend: BackendKind) -> &'static [(&'static str, &'static str)] {
    match backend {
        BackendKind::OpenAi => OPENAI_MODELS,
        BackendKind::Ollama => OLLAMA_MODELS,
    }
}

/// Returns the default chat model for a backend.
#[must_use]
pub const fn default_model(backend: BackendKind) -> &'static str {
    match backend {
        BackendKind::OpenAi => DEFAULT_OPENAI_MODEL,
        BackendKind::Ollama => DEFAULT_OLLAMA_MODEL,
    }
}

/// Resolves a requested model identifier to a concrete model name.
///
/// Never fails: an absent or unmapped identifier yields the backend default.
#[must_use]
pub fn resolve(requested: Option<&str>, backend: BackendKind) -> &'static str {
    requested
        .and_then(|id| {
            table(backend)
                .iter()
                .find(|(key, _)| *key == id)
                .map(|(_, name)| *name)
        })
        .unwrap_or_else(|| default_model(backend))
}

/// Returns the embedding model for a backend.
#[must_use]
pub const fn embedding_model(backend: BackendKind) -> &'static str {
    match backend {
        BackendKind::OpenAi => OPENAI_EMBEDDING_MODEL,
        BackendKind::Ollama => OLLAMA_EMBEDDING_MODEL,
    }
}

/// Models known for a backend.
#[derive(Debug, Clone, Serialize)]
pub struct AvailableModels {
    /// Backend these models belong to.
    pub backend: BackendKind,
    /// Logical chat model identifiers accepted by [`resolve`].
    pub chat: Vec<&'static str>,
    /// Default chat model name.
    pub default_chat: &'static str,
    /// Embedding model name.
    pub embedding: &'static str,
}

/// Lists the chat and embedding models known for a backend.
#[must_use]
pub fn available_models(backend: BackendKind) -> AvailableModels {
    AvailableModels {
        backend,
        chat: table(backend).iter().map(|(id, _)| *id).collect(),
        default_chat: default_model(backend),
        embedding: embedding_model(backend),
    }
}
