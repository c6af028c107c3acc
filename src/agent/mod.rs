//! Retrieval-augmented answering agents.
//!
//! Answers questions from a knowledge base restricted to the documents a
//! deployment has activated. Two strategies share one contract:
//!
//! ```text
//! AgentFactory::create (by backend)
//!   ├── ToolCallingAgent   hosted backend
//!   │   └── model ↔ semantic_search tool (native source filter, k = 5)
//!   └── DirectRetrievalAgent   self-hosted backend
//!       └── retrieve 20 → keep 5 active → one plain completion
//! ```
//!
//! Callers build the agent once and call [`Agent::answer`] per query.
//! Failures below the agent boundary come back as a fixed apology with
//! empty evidence.

pub mod agentic_loop;
pub mod client;
pub mod config;
pub mod direct;
pub mod executor;
pub mod factory;
pub mod history;
pub mod message;
pub mod model;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod retrieval;
pub mod tool;
pub mod tool_calling;
pub mod traits;

// Re-export key types
pub use config::AgentConfig;
pub use direct::DirectRetrievalAgent;
pub use factory::AgentFactory;
pub use history::{ConversationTurn, adapt_history};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use model::BackendKind;
pub use prompt::PromptParams;
pub use provider::LlmProvider;
pub use retrieval::{FilterMode, Retriever};
pub use tool::{ToolCall, ToolDefinition, ToolResult, ToolSet};
pub use tool_calling::ToolCallingAgent;
pub use traits::{APOLOGY, Agent, AgentResponse, AgentState};
