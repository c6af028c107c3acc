//! SQLite-backed persistence and vector index.
//!
//! A connection is opened per operation and dropped when it returns, so no
//! handle outlives the call that needed it, on success or failure. Async
//! trait methods run the blocking work on `spawn_blocking`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::debug;

use super::{
    ActiveDocumentSet, ActiveDocumentStore, DocumentId, Embedder, RetrievedPassage, VectorIndex,
};
use crate::agent::history::ConversationTurn;
use crate::error::{AgentError, StorageError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    source   TEXT PRIMARY KEY,
    active   INTEGER NOT NULL DEFAULT 1,
    added_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
);

CREATE TABLE IF NOT EXISTS conversation_turns (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id TEXT NOT NULL,
    prompt          TEXT NOT NULL,
    response        TEXT,
    evidence        TEXT NOT NULL DEFAULT '',
    created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_turns_conversation
    ON conversation_turns (conversation_id, id);

CREATE TABLE IF NOT EXISTS passages (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    source     TEXT NOT NULL,
    content    TEXT NOT NULL,
    embedding  BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_passages_collection ON passages (collection);
";

/// A document known to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRecord {
    /// Source identifier.
    pub source: DocumentId,
    /// Whether answers may draw from it.
    pub active: bool,
    /// Number of indexed passages across all collections.
    pub passages: usize,
}

/// SQLite store for documents, conversation turns, and passages.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Creates a store handle for the database at `path`. Nothing is opened yet.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Database file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the database file and schema.
    ///
    /// With `force`, an existing database is deleted first.
    pub fn init(&self, force: bool) -> Result<(), StorageError> {
        if force && self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Returns `true` if the schema exists.
    pub fn is_initialized(&self) -> Result<bool, StorageError> {
        if !self.path.exists() {
            return Ok(false);
        }
        let conn = Connection::open(&self.path)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'documents'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn connect(&self) -> Result<Connection, StorageError> {
        if !self.path.exists() {
            return Err(StorageError::NotInitialized);
        }
        Ok(Connection::open(&self.path)?)
    }

    /// Runs `f` against this store on the blocking pool.
    async fn run_blocking<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Self) -> Result<T, StorageError> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| StorageError::Task {
                message: e.to_string(),
            })?
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    /// Lists all documents with their passage counts.
    pub fn list_documents(&self) -> Result<Vec<DocumentRecord>, StorageError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT d.source, d.active, COUNT(p.id)
             FROM documents d LEFT JOIN passages p ON p.source = d.source
             GROUP BY d.source ORDER BY d.source",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DocumentRecord {
                source: row.get(0)?,
                active: row.get(1)?,
                passages: usize::try_from(row.get::<_, i64>(2)?).unwrap_or(0),
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Marks a document active or inactive, registering it if unknown.
    pub fn set_document_active(&self, source: &str, active: bool) -> Result<(), StorageError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO documents (source, active) VALUES (?1, ?2)
             ON CONFLICT(source) DO UPDATE SET active = excluded.active",
            params![source, active],
        )?;
        Ok(())
    }

    /// Returns the sources of all active documents.
    pub fn active_sources(&self) -> Result<Vec<DocumentId>, StorageError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT source FROM documents WHERE active = 1")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // -----------------------------------------------------------------------
    // Conversation turns
    // -----------------------------------------------------------------------

    /// Loads a conversation's turns, oldest first.
    ///
    /// An unanswered turn is only returned when it is the latest one.
    pub fn load_turns(&self, conversation_id: &str) -> Result<Vec<ConversationTurn>, StorageError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT prompt, response FROM conversation_turns
             WHERE conversation_id = ?1
               AND (response IS NOT NULL
                    OR id = (SELECT MAX(id) FROM conversation_turns WHERE conversation_id = ?1))
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![conversation_id], |row| {
            Ok(ConversationTurn {
                prompt: row.get(0)?,
                response: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Records an unanswered turn and returns its row ID.
    pub fn begin_turn(&self, conversation_id: &str, prompt: &str) -> Result<i64, StorageError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO conversation_turns (conversation_id, prompt) VALUES (?1, ?2)",
            params![conversation_id, prompt],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Stores the answer and evidence for a turn started with [`Self::begin_turn`].
    pub fn complete_turn(
        &self,
        turn_id: i64,
        response: &str,
        evidence: &str,
    ) -> Result<(), StorageError> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE conversation_turns SET response = ?1, evidence = ?2 WHERE id = ?3",
            params![response, evidence, turn_id],
        )?;
        Ok(())
    }

    /// Deletes a turn that will never be answered.
    pub fn discard_turn(&self, turn_id: i64) -> Result<(), StorageError> {
        let conn = self.connect()?;
        conn.execute(
            "DELETE FROM conversation_turns WHERE id = ?1",
            params![turn_id],
        )?;
        Ok(())
    }

    /// Returns the evidence stored for a turn.
    pub fn turn_evidence(&self, turn_id: i64) -> Result<Option<String>, StorageError> {
        let conn = self.connect()?;
        Ok(conn
            .query_row(
                "SELECT evidence FROM conversation_turns WHERE id = ?1",
                params![turn_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    // -----------------------------------------------------------------------
    // Passages
    // -----------------------------------------------------------------------

    /// Adds a pre-embedded passage to a collection.
    ///
    /// Seeding hook for an external ingestion pipeline; no chunking happens here.
    pub fn insert_passage(
        &self,
        collection: &str,
        source: &str,
        content: &str,
        embedding: &[f32],
    ) -> Result<i64, StorageError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO passages (collection, source, content, embedding) VALUES (?1, ?2, ?3, ?4)",
            params![collection, source, content, encode_embedding(embedding)],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Brute-force cosine search over one collection.
    fn search_passages(
        &self,
        collection: &str,
        query: &[f32],
        k: usize,
        filter: Option<&ActiveDocumentSet>,
    ) -> Result<Vec<RetrievedPassage>, StorageError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT source, content, embedding FROM passages WHERE collection = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![collection], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?;

        let mut scored: Vec<(f32, RetrievedPassage)> = Vec::new();
        for row in rows {
            let (source, content, blob) = row?;
            if filter.is_some_and(|f| !f.contains(&source)) {
                continue;
            }
            let Some(score) = cosine_similarity(query, &decode_embedding(&blob)) else {
                debug!(source, "skipping passage with incompatible embedding");
                continue;
            };
            scored.push((score, RetrievedPassage { content, source }));
        }

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored.into_iter().take(k).map(|(_, p)| p).collect())
    }
}

#[async_trait]
impl ActiveDocumentStore for SqliteStore {
    async fn active_documents(&self) -> Result<ActiveDocumentSet, AgentError> {
        let sources = self.run_blocking(Self::active_sources).await?;
        Ok(sources.into_iter().collect())
    }
}

/// Vector index over the `passages` table of one collection.
pub struct SqliteVectorIndex {
    store: SqliteStore,
    collection: String,
    embedder: Arc<dyn Embedder>,
}

impl SqliteVectorIndex {
    /// Creates an index over `collection`, embedding queries with `embedder`.
    #[must_use]
    pub fn new(
        store: SqliteStore,
        collection: impl Into<String>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            embedder,
        }
    }
}

impl std::fmt::Debug for SqliteVectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteVectorIndex")
            .field("store", &self.store)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&ActiveDocumentSet>,
    ) -> Result<Vec<RetrievedPassage>, AgentError> {
        let embedding = self.embedder.embed(query).await?;
        let collection = self.collection.clone();
        let filter = filter.cloned();
        let passages = self
            .store
            .run_blocking(move |store| {
                store.search_passages(&collection, &embedding, k, filter.as_ref())
            })
            .await?;
        debug!(
            collection = self.collection,
            k,
            returned = passages.len(),
            "similarity search complete"
        );
        Ok(passages)
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Cosine similarity, or `None` for mismatched or zero-length vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f32::EPSILON {
        return None;
    }
    Some(dot / denom)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    /// Embeds every query as the same fixed vector.
    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, AgentError> {
            Ok(self.0.clone())
        }
    }

    fn setup_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let store = SqliteStore::open(dir.path().join("kb").join("kbchat.db"));
        store
            .init(false)
            .unwrap_or_else(|e| panic!("init failed: {e}"));
        (dir, store)
    }

    #[test]
    fn test_uninitialized_store() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let store = SqliteStore::open(dir.path().join("missing.db"));
        assert!(!store.is_initialized().unwrap_or(true));
        assert!(matches!(
            store.list_documents(),
            Err(StorageError::NotInitialized)
        ));
    }

    #[test]
    fn test_document_activation() {
        let (_dir, store) = setup_store();
        assert!(store.is_initialized().unwrap_or(false));
        store
            .set_document_active("manual.pdf", true)
            .unwrap_or_else(|e| panic!("{e}"));
        store
            .set_document_active("old.pdf", true)
            .unwrap_or_else(|e| panic!("{e}"));
        store
            .set_document_active("old.pdf", false)
            .unwrap_or_else(|e| panic!("{e}"));

        let active = store.active_sources().unwrap_or_default();
        assert_eq!(active, vec!["manual.pdf".to_string()]);

        let docs = store.list_documents().unwrap_or_default();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].source, "old.pdf");
        assert!(!docs[1].active);
    }

    #[test]
    fn test_turn_lifecycle() {
        let (_dir, store) = setup_store();
        let first = store
            .begin_turn("c1", "what is the warranty period")
            .unwrap_or_else(|e| panic!("{e}"));
        store
            .complete_turn(first, "Two years.", "passage")
            .unwrap_or_else(|e| panic!("{e}"));
        let _second = store
            .begin_turn("c1", "and for parts?")
            .unwrap_or_else(|e| panic!("{e}"));
        store
            .begin_turn("c2", "unrelated")
            .unwrap_or_else(|e| panic!("{e}"));

        let turns = store.load_turns("c1").unwrap_or_default();
        assert_eq!(
            turns,
            vec![
                ConversationTurn::answered("what is the warranty period", "Two years."),
                ConversationTurn::pending("and for parts?"),
            ]
        );
        assert_eq!(
            store.turn_evidence(first).unwrap_or_default().as_deref(),
            Some("passage")
        );
    }

    #[test]
    fn test_stale_pending_turn_hidden_mid_history() {
        let (_dir, store) = setup_store();
        store
            .begin_turn("c1", "lost in a crash")
            .unwrap_or_else(|e| panic!("{e}"));
        let answered = store
            .begin_turn("c1", "what is the warranty period")
            .unwrap_or_else(|e| panic!("{e}"));
        store
            .complete_turn(answered, "Two years.", "")
            .unwrap_or_else(|e| panic!("{e}"));

        let turns = store.load_turns("c1").unwrap_or_default();
        assert_eq!(
            turns,
            vec![ConversationTurn::answered(
                "what is the warranty period",
                "Two years."
            )]
        );
    }

    #[test]
    fn test_discard_turn() {
        let (_dir, store) = setup_store();
        let turn = store
            .begin_turn("c1", "what is the warranty period")
            .unwrap_or_else(|e| panic!("{e}"));
        store.discard_turn(turn).unwrap_or_else(|e| panic!("{e}"));
        assert!(store.load_turns("c1").unwrap_or_default().is_empty());
        assert_eq!(store.turn_evidence(turn).unwrap_or_default(), None);
    }

    #[test]
    fn test_embedding_encoding() {
        let v = vec![0.5_f32, -1.25, 3.0];
        assert_eq!(decode_embedding(&encode_embedding(&v)), v);
    }

    #[test]
    fn test_cosine_similarity() {
        let same = cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]).unwrap_or_default();
        assert!((same - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0], &[1.0, 0.0]).is_none());
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).is_none());
    }

    #[tokio::test]
    async fn test_active_documents_async() {
        let (_dir, store) = setup_store();
        store
            .set_document_active("doc1", true)
            .unwrap_or_else(|e| panic!("{e}"));
        let active = store
            .active_documents()
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(active.contains("doc1"));
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn test_similarity_search_orders_and_filters() {
        let (_dir, store) = setup_store();
        let seed = [
            ("doc1", "exact", [1.0_f32, 0.0]),
            ("doc2", "close", [0.9, 0.1]),
            ("doc1", "far", [0.0, 1.0]),
        ];
        for (source, content, emb) in seed {
            store
                .insert_passage("kb", source, content, &emb)
                .unwrap_or_else(|e| panic!("{e}"));
        }
        store
            .insert_passage("other", "doc1", "wrong collection", &[1.0, 0.0])
            .unwrap_or_else(|e| panic!("{e}"));

        let index = SqliteVectorIndex::new(store, "kb", Arc::new(FixedEmbedder(vec![1.0, 0.0])));

        let all = index
            .similarity_search("q", 10, None)
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        let contents: Vec<&str> = all.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(contents, vec!["exact", "close", "far"]);

        let only_doc1: ActiveDocumentSet = ["doc1"].into_iter().collect();
        let filtered = index
            .similarity_search("q", 1, Some(&only_doc1))
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(filtered, vec![RetrievedPassage::new("exact", "doc1")]);
    }
}
