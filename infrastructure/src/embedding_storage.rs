use crate::search::SearchEngine;
use domain::capabilities::VectorStore;
use domain::error::RagError;
use domain::models::{Embedding, Metadata, RetrievedDocument};
use rusqlite::{Connection, OpenFlags};
use std::cell::OnceCell;
use std::path::{Path, PathBuf};

/// Table layout written by the ingestion step. Vectors are JSON arrays of
/// `f32`, metadata is a JSON object.
pub const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS embeddings (
        id TEXT PRIMARY KEY,
        vector BLOB NOT NULL,
        text TEXT NOT NULL,
        metadata TEXT NOT NULL DEFAULT '{}'
    );
";

const REQUIRED_COLUMNS: [&str; 4] = ["id", "vector", "text", "metadata"];

/// Read-only handle on a persisted embedding index.
pub struct EmbeddingStorage {
    conn: Connection,
    path: PathBuf,
}

impl EmbeddingStorage {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, RagError> {
        let path = db_path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(RagError::StoreAccess(format!(
                "no index found at {}",
                path.display()
            )));
        }
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| store_error(&path, e))?;
        Self::check_schema(&conn, &path)?;
        tracing::debug!(path = %path.display(), "opened embedding index");
        Ok(Self { conn, path })
    }

    fn check_schema(conn: &Connection, path: &Path) -> Result<(), RagError> {
        let mut stmt = conn
            .prepare("PRAGMA table_info(embeddings)")
            .map_err(|e| store_error(path, e))?;
        let mut rows = stmt.query([]).map_err(|e| store_error(path, e))?;
        let mut columns = Vec::new();
        while let Some(row) = rows.next().map_err(|e| store_error(path, e))? {
            let col_name: String = row.get(1).map_err(|e| store_error(path, e))?;
            columns.push(col_name);
        }
        if columns.is_empty() {
            return Err(RagError::StoreAccess(format!(
                "{} has no embeddings table",
                path.display()
            )));
        }
        if let Some(missing) = REQUIRED_COLUMNS
            .iter()
            .find(|required| !columns.iter().any(|c| c.as_str() == **required))
        {
            return Err(RagError::StoreAccess(format!(
                "embeddings table in {} lacks column {missing}",
                path.display()
            )));
        }
        Ok(())
    }

    /// Every stored row, in insertion order.
    pub fn get_all_embeddings(&self) -> Result<Vec<Embedding>, RagError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, vector, text, metadata FROM embeddings ORDER BY rowid")
            .map_err(|e| store_error(&self.path, e))?;
        let mut rows = stmt.query([]).map_err(|e| store_error(&self.path, e))?;
        let mut embeddings = Vec::new();
        while let Some(row) = rows.next().map_err(|e| store_error(&self.path, e))? {
            let id: String = row.get(0).map_err(|e| store_error(&self.path, e))?;
            let vector_bytes: Vec<u8> = row.get(1).map_err(|e| store_error(&self.path, e))?;
            let text: String = row.get(2).map_err(|e| store_error(&self.path, e))?;
            let metadata_json: String = row.get(3).map_err(|e| store_error(&self.path, e))?;
            let vector: Vec<f32> = serde_json::from_slice(&vector_bytes).map_err(|e| {
                RagError::StoreAccess(format!("row {id}: undecodable vector: {e}"))
            })?;
            let metadata: Metadata = if metadata_json.trim().is_empty() {
                Metadata::new()
            } else {
                serde_json::from_str(&metadata_json).map_err(|e| {
                    RagError::StoreAccess(format!("row {id}: undecodable metadata: {e}"))
                })?
            };
            embeddings.push(Embedding {
                id,
                vector,
                text,
                metadata,
            });
        }
        Ok(embeddings)
    }
}

impl VectorStore for EmbeddingStorage {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedDocument>, RagError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let embeddings = self.get_all_embeddings()?;
        tracing::debug!(candidates = embeddings.len(), k, "ranking index");
        SearchEngine::find_relevant_chunks(query, embeddings, k)
    }
}

/// Index handle that opens the database on the first search, after the query
/// has been embedded.
pub struct LazyEmbeddingStorage {
    path: PathBuf,
    storage: OnceCell<EmbeddingStorage>,
}

impl LazyEmbeddingStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            storage: OnceCell::new(),
        }
    }

    fn storage(&self) -> Result<&EmbeddingStorage, RagError> {
        if let Some(storage) = self.storage.get() {
            return Ok(storage);
        }
        let storage = EmbeddingStorage::open(&self.path)?;
        Ok(self.storage.get_or_init(|| storage))
    }
}

impl VectorStore for LazyEmbeddingStorage {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedDocument>, RagError> {
        self.storage()?.search(query, k)
    }
}

fn store_error(path: &Path, err: rusqlite::Error) -> RagError {
    RagError::StoreAccess(format!("{}: {err}", path.display()))
}
