//! Tool executor that dispatches tool calls to retrieval.
//!
//! Maps tool names to direct async calls. Retrieval failures are not tool
//! errors: they come back to the model as an empty result so generation can
//! continue.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::retrieval::{Retriever, concat_passages};
use super::tool::{SEMANTIC_SEARCH, ToolCall, ToolResult};
use crate::error::AgentError;

/// Maximum raw byte length of tool argument JSON from the LLM.
const MAX_TOOL_ARGS_LEN: usize = 100_000;
/// Maximum byte length of a search term.
const MAX_SEARCH_TERM_LEN: usize = 2_000;

/// Dispatches tool calls requested by the model.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Executes one call. Failures are reported in the result, never raised.
    async fn execute(&self, call: &ToolCall) -> ToolResult;
}

/// Executor for the `semantic_search` tool.
#[derive(Debug, Clone)]
pub struct RetrievalToolExecutor {
    retriever: Retriever,
}

impl RetrievalToolExecutor {
    /// Creates an executor backed by `retriever`.
    #[must_use]
    pub const fn new(retriever: Retriever) -> Self {
        Self { retriever }
    }

    /// Runs a semantic search and returns the concatenated passages.
    async fn tool_semantic_search(&self, args: &str) -> Result<String, AgentError> {
        #[derive(Deserialize)]
        struct Args {
            search_term: String,
        }
        let args: Args = serde_json::from_str(args).map_err(|e| AgentError::ToolExecution {
            name: SEMANTIC_SEARCH.to_string(),
            message: format!("invalid arguments: {e}"),
        })?;

        if args.search_term.trim().is_empty() {
            return Err(AgentError::ToolExecution {
                name: SEMANTIC_SEARCH.to_string(),
                message: "search_term must not be empty".to_string(),
            });
        }
        if args.search_term.len() > MAX_SEARCH_TERM_LEN {
            return Err(AgentError::ToolExecution {
                name: SEMANTIC_SEARCH.to_string(),
                message: format!(
                    "search_term too long ({} bytes, max {MAX_SEARCH_TERM_LEN})",
                    args.search_term.len()
                ),
            });
        }

        let passages = match self.retriever.retrieve(&args.search_term).await {
            Ok(passages) => passages,
            Err(e) => {
                warn!(error = %e, "semantic_search retrieval failed, returning no passages");
                Vec::new()
            }
        };
        Ok(concat_passages(&passages))
    }
}

#[async_trait]
impl ToolExecutor for RetrievalToolExecutor {
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        if call.arguments.len() > MAX_TOOL_ARGS_LEN {
            return ToolResult {
                tool_call_id: call.id.clone(),
                content: format!(
                    "tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                    call.arguments.len()
                ),
                is_error: true,
            };
        }

        let result = match call.name.as_str() {
            SEMANTIC_SEARCH => self.tool_semantic_search(&call.arguments).await,
            other => Err(AgentError::ToolExecution {
                name: other.to_string(),
                message: "unknown tool".to_string(),
            }),
        };

        match result {
            Ok(content) => ToolResult {
                tool_call_id: call.id.clone(),
                content,
                is_error: false,
            },
            Err(e) => ToolResult {
                tool_call_id: call.id.clone(),
                content: e.to_string(),
                is_error: true,
            },
        }
    }
}
