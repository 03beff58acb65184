//! The three collaborators the pipeline talks to. Each is a narrow capability
//! so tests can swap in deterministic doubles.

use crate::error::RagError;
use crate::models::RetrievedDocument;
use std::future::Future;

/// Maps text to a fixed-dimension vector. Same text, same model, same vector.
pub trait EmbeddingFunction {
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, RagError>> + Send;
}

/// Number of neighbours retrieved per question unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 3;

/// Read-only similarity index.
pub trait VectorStore {
    /// Up to `k` documents ordered by descending cosine similarity.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedDocument>, RagError>;
}

/// Hosted chat-completion model.
pub trait LanguageModel {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String, RagError>> + Send;
}
