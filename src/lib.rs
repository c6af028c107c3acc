//! # kbchat
//!
//! Knowledge-base chat: answers questions from a document collection,
//! grounded only on the documents currently marked active.
//!
//! ## Overview
//!
//! - [`agent`]: the answering contract, its two strategies, and the pieces
//!   they share (model selection, prompt rendering, history adaptation,
//!   active-set retrieval)
//! - [`store`]: collaborator traits plus `SQLite` implementations
//! - [`cli`]: the `kbchat` command-line interface
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use kbchat::agent::{AgentConfig, AgentFactory};
//! use kbchat::store::{OpenAiEmbedder, SqliteStore, SqliteVectorIndex};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(AgentConfig::builder().from_env().collection("kb").build()?);
//! let store = SqliteStore::open(".kbchat/kbchat.db");
//! let embedder = Arc::new(OpenAiEmbedder::new(&config));
//! let index = SqliteVectorIndex::new(store.clone(), "kb", embedder);
//!
//! let mut agent = AgentFactory::new(config, Arc::new(store), Arc::new(index)).create();
//! agent.build()?;
//! let response = agent.answer("What is the warranty period?", &[]).await?;
//! # let _ = response;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod error;
pub mod store;

pub use agent::{Agent, AgentConfig, AgentFactory, AgentResponse, ConversationTurn};
pub use error::{AgentError, CommandError, Error, Result, StorageError};
