//! Error types for kbchat.
//!
//! Each layer has its own error enum; [`Error`] unifies them for callers
//! that cross layers (the CLI).

use std::time::Duration;

use thiserror::Error;

/// Result alias using the crate-wide [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error.
#[derive(Debug, Error)]
pub enum Error {
    /// Agent construction or execution failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Errors raised by the agent layer.
///
/// Only the configuration variants ever escape [`Agent::build`]; everything
/// else is contained by [`Agent::answer`] and turned into a soft failure.
///
/// [`Agent::build`]: crate::agent::Agent::build
/// [`Agent::answer`]: crate::agent::Agent::answer
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key configured for a backend that needs one.
    #[error("API key missing: set OPENAI_API_KEY or KBCHAT_API_KEY")]
    ApiKeyMissing,

    /// A required identifier or setting is absent or invalid.
    #[error("configuration error: {message}")]
    Configuration {
        /// What is missing or wrong.
        message: String,
    },

    /// `answer` was called on an agent that has not been built.
    #[error("agent '{agent}' used before build()")]
    NotBuilt {
        /// Agent name.
        agent: &'static str,
    },

    /// Model API call failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Error text from the client.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// Model returned output that could not be used.
    #[error("response parse error: {message}")]
    ResponseParse {
        /// What went wrong.
        message: String,
        /// Raw content received.
        content: String,
    },

    /// A suspension point exceeded its deadline.
    #[error("{operation} timed out after {}s", .timeout.as_secs())]
    Timeout {
        /// Which operation timed out (`"generation"`, `"retrieval"`, ...).
        operation: &'static str,
        /// Configured deadline.
        timeout: Duration,
    },

    /// A tool call could not be executed.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Tool name.
        name: String,
        /// Failure detail.
        message: String,
    },

    /// The model kept requesting tools past the iteration limit.
    #[error("tool loop exceeded {max_iterations} iterations")]
    ToolLoopExceeded {
        /// Configured limit.
        max_iterations: usize,
    },

    /// Vector index or active-document lookup failed.
    #[error("retrieval failed: {message}")]
    Retrieval {
        /// Failure detail.
        message: String,
    },

    /// Query embedding failed.
    #[error("embedding failed: {message}")]
    Embedding {
        /// Failure detail.
        message: String,
    },
}

impl AgentError {
    /// Returns `true` for errors that mean the agent cannot function at all.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::ApiKeyMissing | Self::Configuration { .. })
    }

    /// Returns `true` for failures of the vector index, embedder or
    /// active-document store.
    #[must_use]
    pub fn is_retrieval(&self) -> bool {
        matches!(
            self,
            Self::Retrieval { .. }
                | Self::Embedding { .. }
                | Self::Timeout {
                    operation: "retrieval",
                    ..
                }
        )
    }
}

impl From<StorageError> for AgentError {
    fn from(err: StorageError) -> Self {
        Self::Retrieval {
            message: err.to_string(),
        }
    }
}

/// Errors raised by the SQLite store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying SQLite failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Schema has not been created yet.
    #[error("database not initialized. Run `kbchat init` first")]
    NotInitialized,

    /// Filesystem failure (creating the database directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {message}")]
    Task {
        /// Join error text.
        message: String,
    },
}

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command ran but could not complete.
    #[error("{0}")]
    ExecutionFailed(String),

    /// A command-line argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
