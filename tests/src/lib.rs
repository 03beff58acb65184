//! Deterministic stand-ins for the pipeline's collaborators, plus helpers for
//! writing throwaway SQLite indexes.

use domain::capabilities::{EmbeddingFunction, LanguageModel, VectorStore};
use domain::error::RagError;
use domain::models::{Document, RetrievedDocument};
use infrastructure::embedding_storage::SCHEMA;
use rusqlite::{params, Connection};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Always returns the same vector.
#[derive(Clone)]
pub struct FixedEmbedder {
    vector: Vec<f32>,
    calls: Arc<AtomicUsize>,
}

impl FixedEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingFunction for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, RagError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector.clone())
    }
}

pub struct FailingEmbedder;

impl EmbeddingFunction for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, RagError> {
        Err(RagError::ModelLoad("weights not found".to_string()))
    }
}

/// Returns a preset ranked list, truncated to `k`.
pub struct CannedStore {
    results: Result<Vec<RetrievedDocument>, RagError>,
}

impl CannedStore {
    pub fn new(results: Vec<RetrievedDocument>) -> Self {
        Self {
            results: Ok(results),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn failing(err: RagError) -> Self {
        Self { results: Err(err) }
    }
}

impl VectorStore for CannedStore {
    fn search(&self, _query: &[f32], k: usize) -> Result<Vec<RetrievedDocument>, RagError> {
        self.results
            .clone()
            .map(|results| results.into_iter().take(k).collect())
    }
}

/// Replies with a canned answer and remembers every prompt it was sent.
/// Clones share the log.
#[derive(Clone)]
pub struct RecordingModel {
    reply: Result<String, RagError>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl RecordingModel {
    pub fn replying(answer: &str) -> Self {
        Self {
            reply: Ok(answer.to_string()),
            prompts: Arc::default(),
        }
    }

    pub fn failing(err: RagError) -> Self {
        Self {
            reply: Err(err),
            prompts: Arc::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl LanguageModel for RecordingModel {
    async fn complete(&self, prompt: &str) -> Result<String, RagError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone()
    }
}

pub fn doc(content: &str, source: Option<&str>, score: f32) -> RetrievedDocument {
    let document = match source {
        Some(source) => Document::new(content).with_source(source),
        None => Document::new(content),
    };
    RetrievedDocument::new(document, score)
}

pub struct IndexRow {
    pub id: &'static str,
    pub vector: Vec<f32>,
    pub text: &'static str,
    pub metadata: Value,
}

/// Write `rows` into a fresh index file the way the ingestion step does.
pub fn write_index(path: &Path, rows: &[IndexRow]) -> rusqlite::Result<()> {
    let conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;
    let mut stmt = conn.prepare(
        "INSERT INTO embeddings (id, vector, text, metadata) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for row in rows {
        let vector = serde_json::to_vec(&row.vector).expect("vector serializes");
        stmt.execute(params![row.id, vector, row.text, row.metadata.to_string()])?;
    }
    Ok(())
}

/// A temp directory holding `index.db` populated with `rows`.
pub fn temp_index(rows: &[IndexRow]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("index.db");
    write_index(&path, rows).expect("write index");
    (dir, path)
}
