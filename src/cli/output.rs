//! Output formatting for CLI commands.
//!
//! Every command renders either human-readable text or pretty JSON.

use std::fmt::Write as _;

use serde::Serialize;

use crate::agent::history::ConversationTurn;
use crate::agent::model::{self, AvailableModels};
use crate::agent::traits::AgentResponse;
use crate::store::DocumentRecord;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name; anything unrecognized is text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }

    /// Serializes `value` as JSON followed by a newline.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        let mut out = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
            serde_json::json!({ "error": format!("serialization failed: {e}") }).to_string()
        });
        out.push('\n');
        out
    }
}

/// Formats an agent answer, optionally with its evidence.
#[must_use]
pub fn format_answer(response: &AgentResponse, show_evidence: bool, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = format!("{}\n", response.answer);
            if show_evidence {
                out.push_str("\n--- evidence ---\n");
                if response.evidence.is_empty() {
                    out.push_str("(none)\n");
                } else {
                    out.push_str(&response.evidence);
                    if !response.evidence.ends_with('\n') {
                        out.push('\n');
                    }
                }
            }
            out
        }
        OutputFormat::Json => format.to_json(response),
    }
}

/// Formats the document list.
#[must_use]
pub fn format_documents(documents: &[DocumentRecord], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if documents.is_empty() {
                return "No documents.\n".to_string();
            }
            let width = documents.iter().map(|d| d.source.len()).max().unwrap_or(0);
            let mut out = String::new();
            for doc in documents {
                let _ = writeln!(
                    out,
                    "{:<width$}  {:<8}  {} passage(s)",
                    doc.source,
                    if doc.active { "active" } else { "inactive" },
                    doc.passages,
                );
            }
            out
        }
        OutputFormat::Json => format.to_json(documents),
    }
}

/// Formats a conversation's stored turns.
#[must_use]
pub fn format_history(
    conversation_id: &str,
    turns: &[ConversationTurn],
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => {
            if turns.is_empty() {
                return format!("No turns in conversation {conversation_id}.\n");
            }
            let mut out = String::new();
            for (i, turn) in turns.iter().enumerate() {
                let _ = writeln!(out, "[{}] user: {}", i + 1, turn.prompt);
                match &turn.response {
                    Some(response) => {
                        let _ = writeln!(out, "[{}] assistant: {response}", i + 1);
                    }
                    None => {
                        let _ = writeln!(out, "[{}] assistant: (no response)", i + 1);
                    }
                }
            }
            out
        }
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "conversation_id": conversation_id,
            "turns": turns,
        })),
    }
}

/// Formats the model tables for one backend.
#[must_use]
pub fn format_models(models: &AvailableModels, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = format!("Backend: {}\n\nChat models:\n", models.backend);
            for &requested in &models.chat {
                let resolved = model::resolve(Some(requested), models.backend);
                let marker = if resolved == models.default_chat {
                    " (default)"
                } else {
                    ""
                };
                let _ = writeln!(out, "  {requested:<16} -> {resolved}{marker}");
            }
            let _ = writeln!(out, "\nEmbedding model: {}", models.embedding);
            out
        }
        OutputFormat::Json => format.to_json(models),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::model::{BackendKind, available_models};

    #[test]
    fn test_parse_format() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("yaml"), OutputFormat::Text);
    }

    #[test]
    fn test_format_answer_with_evidence() {
        let response = AgentResponse {
            answer: "Two years.".to_string(),
            evidence: "Warranty is two years.\n".to_string(),
        };
        let out = format_answer(&response, true, OutputFormat::Text);
        assert_eq!(out, "Two years.\n\n--- evidence ---\nWarranty is two years.\n");
        assert_eq!(
            format_answer(&response, false, OutputFormat::Text),
            "Two years.\n"
        );
    }

    #[test]
    fn test_format_answer_json() {
        let response = AgentResponse::apology();
        let out = format_answer(&response, false, OutputFormat::Json);
        let value: serde_json::Value =
            serde_json::from_str(&out).unwrap_or_else(|_| unreachable!());
        assert_eq!(value["evidence"], "");
    }

    #[test]
    fn test_format_documents_text() {
        let docs = vec![
            DocumentRecord {
                source: "manual.pdf".to_string(),
                active: true,
                passages: 3,
            },
            DocumentRecord {
                source: "faq.md".to_string(),
                active: false,
                passages: 0,
            },
        ];
        let out = format_documents(&docs, OutputFormat::Text);
        assert!(out.contains("manual.pdf  active"));
        assert!(out.contains("faq.md      inactive"));
        assert_eq!(format_documents(&[], OutputFormat::Text), "No documents.\n");
    }

    #[test]
    fn test_format_history_pending_turn() {
        let turns = vec![
            ConversationTurn::answered("hi", "hello"),
            ConversationTurn::pending("still there?"),
        ];
        let out = format_history("c1", &turns, OutputFormat::Text);
        assert!(out.contains("[1] assistant: hello"));
        assert!(out.contains("[2] assistant: (no response)"));
    }

    #[test]
    fn test_format_models_marks_default() {
        let out = format_models(&available_models(BackendKind::Ollama), OutputFormat::Text);
        assert!(out.contains("Backend: ollama"));
        assert!(out.contains("(default)"));
        assert!(out.contains("mxbai-embed-large:latest"));
    }
}
