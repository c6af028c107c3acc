//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// kbchat: knowledge-base chat over your active documents.
///
/// Answers questions from a document collection, citing only documents
/// that are currently marked active.
#[derive(Parser, Debug)]
#[command(name = "kbchat")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the kbchat database file.
    ///
    /// Defaults to `.kbchat/kbchat.db` in the current directory.
    #[arg(short, long, env = "KBCHAT_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the kbchat database.
    ///
    /// Creates the database file and schema if they don't exist.
    #[command(after_help = r#"Examples:
  kbchat init                    # Initialize in current directory
  kbchat init --force            # Re-initialize (destroys existing data)
  kbchat --db-path ./kb.db init  # Initialize with custom path
"#)]
    Init {
        /// Force re-initialization (destroys existing data).
        #[arg(short, long)]
        force: bool,
    },

    /// Ask a question against the active documents.
    ///
    /// Loads the conversation's earlier turns, answers, and records the
    /// new turn.
    #[command(after_help = r#"Examples:
  kbchat ask "What is the warranty period?"
  kbchat ask "And for refurbished units?" --conversation support-42
  kbchat ask "Summarize returns" --backend ollama --model gemma
  kbchat --format json ask "What is covered?" --evidence | jq .evidence

Environment:
  VECTORSTORE_COLLECTION_NAME    Passage collection to search (required)
  OPENAI_API_KEY                 Key for the hosted backend
  KBCHAT_BACKEND                 openai (default) or ollama
"#)]
    Ask {
        /// The question to answer.
        query: String,

        /// Conversation to continue (a new one is started if unknown).
        #[arg(short, long, default_value = "default")]
        conversation: String,

        /// Logical model identifier (unknown ids use the backend default).
        #[arg(short, long)]
        model: Option<String>,

        /// Backend override: openai or ollama.
        #[arg(short, long)]
        backend: Option<String>,

        /// Vector collection override.
        #[arg(long)]
        collection: Option<String>,

        /// Project whose supplementary prompt text is loaded.
        #[arg(short, long)]
        project: Option<String>,

        /// Print the evidence the answer was grounded on.
        #[arg(short, long)]
        evidence: bool,
    },

    /// Document operations (list, activate, deactivate).
    #[command(subcommand)]
    Documents(DocumentCommands),

    /// Show the stored turns of a conversation.
    History {
        /// Conversation identifier.
        conversation: String,
    },

    /// Print the rendered system prompt.
    Prompt {
        /// Project whose supplementary prompt text is included.
        #[arg(short, long)]
        project: Option<String>,
    },

    /// List chat and embedding models for a backend.
    Models {
        /// Backend: openai or ollama (defaults to the configured backend).
        #[arg(short, long)]
        backend: Option<String>,
    },

    /// Write a project prompt template to the prompt directory.
    #[command(after_help = r#"Examples:
  kbchat init-prompts --project acme             # ~/.config/kbchat/prompts/projects/acme.md
  kbchat init-prompts --project acme --dir ./p   # ./p/projects/acme.md
"#)]
    InitPrompts {
        /// Target directory (default: ~/.config/kbchat/prompts).
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Project to scaffold.
        #[arg(short, long)]
        project: String,
    },
}

/// Document subcommands.
#[derive(Subcommand, Debug)]
pub enum DocumentCommands {
    /// List known documents and whether they are active.
    List,

    /// Mark a document active so answers may draw from it.
    Activate {
        /// Document source identifier.
        source: String,
    },

    /// Mark a document inactive.
    Deactivate {
        /// Document source identifier.
        source: String,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::store::DEFAULT_DB_PATH))
    }
}
