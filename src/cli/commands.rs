//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::agent::config::AgentConfig;
use crate::agent::factory::AgentFactory;
use crate::agent::model::{self, BackendKind};
use crate::agent::prompt;
use crate::agent::traits::AgentResponse;
use crate::cli::output::{
    OutputFormat, format_answer, format_documents, format_history, format_models,
};
use crate::cli::parser::{Cli, Commands, DocumentCommands};
use crate::error::{CommandError, Result, StorageError};
use crate::store::{OpenAiEmbedder, SqliteStore, SqliteVectorIndex};

/// Parameters for the ask command.
#[derive(Debug, Clone)]
pub struct AskParams<'a> {
    /// The question to answer.
    pub query: &'a str,
    /// Conversation to continue.
    pub conversation: &'a str,
    /// Logical model identifier override.
    pub model: Option<&'a str>,
    /// Backend override.
    pub backend: Option<&'a str>,
    /// Vector collection override.
    pub collection: Option<&'a str>,
    /// Project override.
    pub project: Option<&'a str>,
    /// Include evidence in the output.
    pub show_evidence: bool,
}

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();

    match &cli.command {
        Commands::Init { force } => cmd_init(&db_path, *force, format),
        Commands::Ask {
            query,
            conversation,
            model,
            backend,
            collection,
            project,
            evidence,
        } => {
            let params = AskParams {
                query,
                conversation,
                model: model.as_deref(),
                backend: backend.as_deref(),
                collection: collection.as_deref(),
                project: project.as_deref(),
                show_evidence: *evidence,
            };
            cmd_ask(&db_path, &params, format)
        }
        Commands::Documents(sub) => execute_documents(sub, &db_path, format),
        Commands::History { conversation } => cmd_history(&db_path, conversation, format),
        Commands::Prompt { project } => Ok(cmd_prompt(project.as_deref(), format)),
        Commands::Models { backend } => cmd_models(backend.as_deref(), format),
        Commands::InitPrompts { dir, project } => {
            cmd_init_prompts(dir.as_deref(), project, format)
        }
    }
}

fn execute_documents(
    sub: &DocumentCommands,
    db_path: &Path,
    format: OutputFormat,
) -> Result<String> {
    match sub {
        DocumentCommands::List => cmd_list_documents(db_path, format),
        DocumentCommands::Activate { source } => cmd_set_active(db_path, source, true, format),
        DocumentCommands::Deactivate { source } => {
            cmd_set_active(db_path, source, false, format)
        }
    }
}

/// Opens the store and ensures it's initialized.
fn open_store(db_path: &Path) -> Result<SqliteStore> {
    let store = SqliteStore::open(db_path);

    if !store.is_initialized()? {
        return Err(StorageError::NotInitialized.into());
    }

    Ok(store)
}

fn parse_backend(name: &str) -> Result<BackendKind> {
    BackendKind::parse(name).ok_or_else(|| {
        CommandError::InvalidArgument(format!(
            "unknown backend '{name}' (expected openai or ollama)"
        ))
        .into()
    })
}

// ==================== Command Implementations ====================

fn cmd_init(db_path: &Path, force: bool, format: OutputFormat) -> Result<String> {
    if db_path.exists() && !force {
        return Err(CommandError::ExecutionFailed(
            "Database already exists. Use --force to reinitialize.".to_string(),
        )
        .into());
    }

    SqliteStore::open(db_path).init(force)?;
    info!(path = %db_path.display(), force, "database initialized");

    match format {
        OutputFormat::Text => Ok(format!(
            "Initialized kbchat database at: {}\n",
            db_path.display()
        )),
        OutputFormat::Json => {
            let json = serde_json::json!({
                "success": true,
                "path": db_path.to_string_lossy(),
                "force": force
            });
            Ok(format.to_json(&json))
        }
    }
}

fn cmd_ask(db_path: &Path, params: &AskParams<'_>, format: OutputFormat) -> Result<String> {
    let store = open_store(db_path)?;

    // Build agent configuration from env + CLI overrides
    let mut builder = AgentConfig::builder();
    if let Some(name) = params.backend {
        builder = builder.backend(parse_backend(name)?);
    }
    if let Some(model) = params.model {
        builder = builder.model(model);
    }
    if let Some(collection) = params.collection {
        builder = builder.collection(collection);
    }
    if let Some(project) = params.project {
        builder = builder.project(project);
    }
    let config = Arc::new(builder.from_env().build()?);

    let collection = config.collection.clone().unwrap_or_default();
    let embedder = Arc::new(OpenAiEmbedder::new(&config));
    let index = SqliteVectorIndex::new(store.clone(), collection, embedder);
    let factory = AgentFactory::new(Arc::clone(&config), Arc::new(store.clone()), Arc::new(index));

    let mut agent = factory.create();
    agent.build()?;

    let history = store.load_turns(params.conversation)?;
    debug!(
        conversation = params.conversation,
        turns = history.len(),
        "loaded conversation history"
    );
    let turn_id = store.begin_turn(params.conversation, params.query)?;

    // Create tokio runtime as sync/async bridge
    let rt = tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}"))
    })?;
    let response = match rt.block_on(agent.answer(params.query, &history)) {
        Ok(response) => response,
        Err(e) => {
            store.discard_turn(turn_id)?;
            return Err(e.into());
        }
    };
    record_answer(&store, turn_id, &response)?;

    Ok(format_answer(&response, params.show_evidence, format))
}

/// Persists an answered turn; an apology is not kept in the conversation.
fn record_answer(store: &SqliteStore, turn_id: i64, response: &AgentResponse) -> Result<()> {
    if response.is_apology() {
        warn!(turn_id, "answer failed, discarding turn");
        store.discard_turn(turn_id)?;
    } else {
        store.complete_turn(turn_id, &response.answer, &response.evidence)?;
    }
    Ok(())
}

fn cmd_list_documents(db_path: &Path, format: OutputFormat) -> Result<String> {
    let store = open_store(db_path)?;
    let documents = store.list_documents()?;
    Ok(format_documents(&documents, format))
}

fn cmd_set_active(
    db_path: &Path,
    source: &str,
    active: bool,
    format: OutputFormat,
) -> Result<String> {
    if source.trim().is_empty() {
        return Err(
            CommandError::InvalidArgument("document source must not be empty".to_string()).into(),
        );
    }
    let store = open_store(db_path)?;
    store.set_document_active(source, active)?;
    info!(source, active, "document state changed");

    match format {
        OutputFormat::Text => Ok(format!(
            "{} document: {source}\n",
            if active { "Activated" } else { "Deactivated" }
        )),
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "source": source,
            "active": active,
        }))),
    }
}

fn cmd_history(db_path: &Path, conversation: &str, format: OutputFormat) -> Result<String> {
    let store = open_store(db_path)?;
    let turns = store.load_turns(conversation)?;
    Ok(format_history(conversation, &turns, format))
}

fn cmd_prompt(project: Option<&str>, format: OutputFormat) -> String {
    let mut builder = AgentConfig::builder();
    if let Some(project) = project {
        builder = builder.project(project);
    }
    let system_prompt = builder.from_env().render_system_prompt();

    match format {
        OutputFormat::Text => system_prompt,
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "system_prompt": system_prompt,
        })),
    }
}

fn cmd_models(backend: Option<&str>, format: OutputFormat) -> Result<String> {
    let backend = match backend {
        Some(name) => parse_backend(name)?,
        None => AgentConfig::builder().from_env().configured_backend(),
    };
    Ok(format_models(&model::available_models(backend), format))
}

fn cmd_init_prompts(dir: Option<&Path>, project: &str, format: OutputFormat) -> Result<String> {
    let from_env = std::env::var_os("KBCHAT_PROMPT_DIR").map(std::path::PathBuf::from);
    let target_dir = prompt::resolve_prompt_dir(dir.or(from_env.as_deref())).ok_or_else(|| {
        CommandError::ExecutionFailed(
            "Could not determine home directory for default prompt path".to_string(),
        )
    })?;

    let written = prompt::write_project_template(&target_dir, project).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write project template: {e}"))
    })?;
    let path = prompt::project_file(&target_dir, project);

    match format {
        OutputFormat::Text => Ok(if written.is_some() {
            format!(
                "Wrote project template to: {}\n\nEdit this file to add project context to the system prompt.\n",
                path.display()
            )
        } else {
            format!("Project template already exists: {}\n", path.display())
        }),
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "path": path.to_string_lossy(),
            "written": written.is_some(),
        }))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::Parser;
    use tempfile::TempDir;

    fn run(dir: &TempDir, args: &[&str]) -> Result<String> {
        let db = dir.path().join("kb.db").to_string_lossy().into_owned();
        let mut argv = vec!["kbchat", "--db-path", db.as_str()];
        argv.extend_from_slice(args);
        execute(&Cli::parse_from(argv))
    }

    #[test]
    fn test_init_then_reinit_requires_force() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let out = run(&dir, &["init"]).unwrap_or_else(|_| unreachable!());
        assert!(out.starts_with("Initialized kbchat database at:"));
        assert!(run(&dir, &["init"]).is_err());
        assert!(run(&dir, &["init", "--force"]).is_ok());
    }

    #[test]
    fn test_documents_require_init() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let result = run(&dir, &["documents", "list"]);
        assert!(matches!(
            result,
            Err(crate::error::Error::Storage(StorageError::NotInitialized))
        ));
    }

    #[test]
    fn test_activate_and_list_documents() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        run(&dir, &["init"]).unwrap_or_else(|_| unreachable!());
        run(&dir, &["documents", "activate", "manual.pdf"]).unwrap_or_else(|_| unreachable!());
        run(&dir, &["documents", "activate", "faq.md"]).unwrap_or_else(|_| unreachable!());
        run(&dir, &["documents", "deactivate", "faq.md"]).unwrap_or_else(|_| unreachable!());

        let out = run(&dir, &["--format", "json", "documents", "list"])
            .unwrap_or_else(|_| unreachable!());
        let value: serde_json::Value =
            serde_json::from_str(&out).unwrap_or_else(|_| unreachable!());
        let docs = value.as_array().cloned().unwrap_or_default();
        assert_eq!(docs.len(), 2);
        assert!(
            docs.iter()
                .any(|d| d["source"] == "manual.pdf" && d["active"] == true)
        );
        assert!(docs.iter().any(|d| d["source"] == "faq.md" && d["active"] == false));
    }

    #[test]
    fn test_apology_is_not_recorded() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let store = SqliteStore::open(dir.path().join("kb.db"));
        store.init(false).unwrap_or_else(|_| unreachable!());

        let failed = store
            .begin_turn("c1", "what is the warranty period")
            .unwrap_or_else(|_| unreachable!());
        record_answer(&store, failed, &AgentResponse::apology())
            .unwrap_or_else(|_| unreachable!());
        assert!(store.load_turns("c1").unwrap_or_default().is_empty());

        let answered = store
            .begin_turn("c1", "what is the warranty period")
            .unwrap_or_else(|_| unreachable!());
        let response = AgentResponse {
            answer: "Two years.".to_string(),
            evidence: ";Two years.".to_string(),
        };
        record_answer(&store, answered, &response).unwrap_or_else(|_| unreachable!());
        let turns = store.load_turns("c1").unwrap_or_default();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].response.as_deref(), Some("Two years."));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let result = run(&dir, &["models", "--backend", "mainframe"]);
        assert!(matches!(
            result,
            Err(crate::error::Error::Command(CommandError::InvalidArgument(_)))
        ));
    }

    #[test]
    fn test_models_for_ollama() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let out = run(&dir, &["models", "--backend", "ollama"]).unwrap_or_else(|_| unreachable!());
        assert!(out.contains("gemma3:27b"));
    }

    #[test]
    fn test_init_prompts_writes_once() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let prompts = dir.path().join("prompts").to_string_lossy().into_owned();
        let first = run(&dir, &["init-prompts", "--dir", prompts.as_str(), "--project", "acme"])
            .unwrap_or_else(|_| unreachable!());
        assert!(first.starts_with("Wrote project template"));
        let second = run(&dir, &["init-prompts", "--dir", prompts.as_str(), "--project", "acme"])
            .unwrap_or_else(|_| unreachable!());
        assert!(second.starts_with("Project template already exists"));
    }
}
