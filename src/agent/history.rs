//! Conversation history adaptation.
//!
//! Turns stored conversation turns into the role-tagged message sequence a
//! chat request expects.

use serde::{Deserialize, Serialize};

use super::message::{ChatMessage, assistant_message, user_message};

/// One stored exchange, oldest first in a conversation.
///
/// A turn without a response is only valid as the in-flight final turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// What the human asked.
    pub prompt: String,
    /// What the assistant answered, if it has answered yet.
    pub response: Option<String>,
}

impl ConversationTurn {
    /// Creates an answered turn.
    #[must_use]
    pub fn answered(prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response: Some(response.into()),
        }
    }

    /// Creates a turn still waiting for its answer.
    #[must_use]
    pub fn pending(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response: None,
        }
    }
}

/// Converts turns into alternating user/assistant messages.
///
/// Every turn contributes its prompt; only turns with a response contribute
/// an assistant message. The input is not modified.
#[must_use]
pub fn adapt_history(turns: &[ConversationTurn]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(turns.len() * 2);
    for turn in turns {
        messages.push(user_message(&turn.prompt));
        if let Some(response) = &turn.response {
            messages.push(assistant_message(response));
        }
    }
    messages
}
