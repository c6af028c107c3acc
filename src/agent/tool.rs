//! Tool type definitions for function-calling.
//!
//! Provides provider-agnostic types for tool definitions, calls, and results.
//! The tool-calling agent exposes exactly one tool: semantic search over the
//! active document set.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Name of the retrieval tool.
pub const SEMANTIC_SEARCH: &str = "semantic_search";

/// A tool definition that can be sent to an LLM for function-calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match dispatch table in executor).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (assigned by the provider).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments for the tool.
    pub arguments: String,
}

/// The result of executing a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this result corresponds to.
    pub tool_call_id: String,
    /// Text returned to the model (passages on success, error message on failure).
    pub content: String,
    /// Whether this result represents an error.
    pub is_error: bool,
}

/// A set of tool definitions offered to the model.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    definitions: Vec<ToolDefinition>,
}

impl ToolSet {
    /// Returns the tool definitions in this set.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Returns `true` if this set contains no tools.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns the number of tools in this set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Tool set for the tool-calling agent: `semantic_search` only.
    #[must_use]
    pub fn retrieval() -> Self {
        Self {
            definitions: vec![def_semantic_search()],
        }
    }
}

/// Defines the `semantic_search` tool.
fn def_semantic_search() -> ToolDefinition {
    ToolDefinition {
        name: SEMANTIC_SEARCH.to_string(),
        description: "This function utilizes a vector store to retrieve relevant documents \
                      based on the semantic similarity of their content to the provided \
                      search term."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "search_term": {
                    "type": "string",
                    "description": "Text to search the knowledge base for."
                }
            },
            "required": ["search_term"],
            "additionalProperties": false
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_toolset() {
        let ts = ToolSet::retrieval();
        assert_eq!(ts.len(), 1);
        assert!(!ts.is_empty());
        let def = &ts.definitions()[0];
        assert_eq!(def.name, SEMANTIC_SEARCH);
        assert_eq!(def.parameters["type"], "object");
        assert_eq!(def.parameters["required"][0], "search_term");
    }

    #[test]
    fn test_default_toolset_empty() {
        assert!(ToolSet::default().is_empty());
    }
}
