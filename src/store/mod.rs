//! Collaborator contracts and their SQLite implementations.
//!
//! Agents reach persistence and the vector index only through the traits
//! defined here. Every call is async; implementations backed by blocking
//! I/O move the work onto the blocking pool.

pub mod embedding;
pub mod sqlite;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

pub use embedding::OpenAiEmbedder;
pub use sqlite::{DocumentRecord, SqliteStore, SqliteVectorIndex};

/// Default database location, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".kbchat/kbchat.db";

/// Identifier of a source document (its `source` metadata value).
pub type DocumentId = String;

/// Documents a conversation may draw answers from.
///
/// Read once per retrieval call and not changed during it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveDocumentSet(HashSet<DocumentId>);

impl ActiveDocumentSet {
    /// Returns `true` if `source` is active.
    #[must_use]
    pub fn contains(&self, source: &str) -> bool {
        self.0.contains(source)
    }

    /// Number of active documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no document is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the active identifiers in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<DocumentId>> FromIterator<S> for ActiveDocumentSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A passage returned by similarity search, in relevance order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Passage text.
    pub content: String,
    /// Document the passage was cut from.
    pub source: DocumentId,
}

impl RetrievedPassage {
    /// Creates a passage.
    #[must_use]
    pub fn new(content: impl Into<String>, source: impl Into<DocumentId>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
        }
    }
}

/// Source of the active-document allow-list.
#[async_trait]
pub trait ActiveDocumentStore: Send + Sync {
    /// Returns the currently active documents. May be empty.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Retrieval`] when the store cannot be read.
    async fn active_documents(&self) -> Result<ActiveDocumentSet, AgentError>;
}

/// Semantic similarity search over indexed passages.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Returns up to `k` passages nearest to `query`, most relevant first.
    ///
    /// When `filter` is given, only passages whose source is in the set are
    /// considered.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Retrieval`] or [`AgentError::Embedding`] on
    /// index or embedding failures.
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&ActiveDocumentSet>,
    ) -> Result<Vec<RetrievedPassage>, AgentError>;
}

/// Turns text into an embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds `text`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Embedding`] on API failures.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AgentError>;
}
