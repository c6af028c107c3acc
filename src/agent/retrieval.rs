//! Retrieval restricted to the active document set.
//!
//! Two modes reach the same guarantee, that every returned passage comes
//! from a document active at call time:
//!
//! - [`FilterMode::Native`] hands the allow-list to the index.
//! - [`FilterMode::OverFetch`] asks the index for `k * factor` unfiltered
//!   candidates and keeps the first `k` whose source is active.
//!
//! Both modes re-check membership client-side before returning.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::AgentError;
use crate::store::{ActiveDocumentSet, ActiveDocumentStore, RetrievedPassage, VectorIndex};

/// How the active-set restriction is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// The index filters by source itself.
    Native,
    /// Fetch `k * factor` unfiltered candidates, filter client-side.
    OverFetch {
        /// Candidates fetched per passage wanted.
        factor: usize,
    },
}

/// Runs `fut` with a deadline, mapping expiry to [`AgentError::Timeout`].
pub async fn with_deadline<T, F>(
    operation: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<T, AgentError>
where
    F: Future<Output = Result<T, AgentError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| AgentError::Timeout { operation, timeout })?
}

/// Keeps, in order, the first `k` candidates whose source is active.
#[must_use]
pub fn keep_active(
    candidates: Vec<RetrievedPassage>,
    active: &ActiveDocumentSet,
    k: usize,
) -> Vec<RetrievedPassage> {
    candidates
        .into_iter()
        .filter(|p| active.contains(&p.source))
        .take(k)
        .collect()
}

/// Concatenates passage contents with no separator.
#[must_use]
pub fn concat_passages(passages: &[RetrievedPassage]) -> String {
    passages.iter().map(|p| p.content.as_str()).collect()
}

/// Concatenates passage contents, each followed by a newline.
#[must_use]
pub fn newline_context(passages: &[RetrievedPassage]) -> String {
    passages.iter().fold(String::new(), |mut acc, p| {
        acc.push_str(&p.content);
        acc.push('\n');
        acc
    })
}

/// Searches `index` for `query`, restricted to `active`.
///
/// # Errors
///
/// Propagates index failures.
pub async fn retrieve(
    index: &dyn VectorIndex,
    query: &str,
    active: &ActiveDocumentSet,
    k: usize,
    mode: FilterMode,
) -> Result<Vec<RetrievedPassage>, AgentError> {
    let candidates = match mode {
        FilterMode::Native => {
            if active.is_empty() {
                return Ok(Vec::new());
            }
            index.similarity_search(query, k, Some(active)).await?
        }
        FilterMode::OverFetch { factor } => {
            let fetch = k.saturating_mul(factor.max(1));
            index.similarity_search(query, fetch, None).await?
        }
    };
    let fetched = candidates.len();
    let kept = keep_active(candidates, active, k);
    debug!(?mode, fetched, kept = kept.len(), k, "retrieval filtered");
    Ok(kept)
}

/// Retrieval bound to one deployment's collaborators.
///
/// Each call reads a fresh allow-list, so membership changes between
/// requests are honoured.
#[derive(Clone)]
pub struct Retriever {
    documents: Arc<dyn ActiveDocumentStore>,
    index: Arc<dyn VectorIndex>,
    k: usize,
    mode: FilterMode,
    timeout: Duration,
}

impl Retriever {
    /// Creates a retriever.
    #[must_use]
    pub fn new(
        documents: Arc<dyn ActiveDocumentStore>,
        index: Arc<dyn VectorIndex>,
        k: usize,
        mode: FilterMode,
        timeout: Duration,
    ) -> Self {
        Self {
            documents,
            index,
            k,
            mode,
            timeout,
        }
    }

    /// Passages kept per call.
    #[must_use]
    pub const fn k(&self) -> usize {
        self.k
    }

    /// Filtering mode.
    #[must_use]
    pub const fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Fetches the allow-list, then searches within it.
    ///
    /// # Errors
    ///
    /// Returns retrieval errors, including [`AgentError::Timeout`] when
    /// either call exceeds the deadline.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedPassage>, AgentError> {
        let active =
            with_deadline("retrieval", self.timeout, self.documents.active_documents()).await?;
        with_deadline(
            "retrieval",
            self.timeout,
            retrieve(self.index.as_ref(), query, &active, self.k, self.mode),
        )
        .await
    }

    /// Like [`Self::retrieve`], but a failure yields no passages.
    pub async fn retrieve_or_empty(&self, query: &str) -> Vec<RetrievedPassage> {
        match self.retrieve(query).await {
            Ok(passages) => passages,
            Err(e) => {
                warn!(error = %e, "retrieval failed, continuing without context");
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("k", &self.k)
            .field("mode", &self.mode)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
