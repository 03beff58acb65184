use crate::error::RagError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::utils::{py_float_repr, py_str_repr, py_value_repr};
use std::collections::BTreeMap;
use std::fmt;

pub type Metadata = BTreeMap<String, Value>;

/// Metadata key holding the provenance of a chunk.
pub const SOURCE_KEY: &str = "source";

/// A validated, non-empty question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    pub fn parse(text: impl Into<String>) -> Result<Self, RagError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One stored row of the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Embedding {
    pub fn into_document(self) -> Document {
        Document {
            page_content: self.text,
            metadata: self.metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.metadata
            .insert(SOURCE_KEY.to_string(), Value::String(source.into()));
        self
    }

    /// The `source` metadata entry as stored; `null` counts as absent.
    pub fn source(&self) -> Option<&Value> {
        self.metadata.get(SOURCE_KEY).filter(|v| !v.is_null())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metadata: Vec<String> = self
            .metadata
            .iter()
            .map(|(k, v)| format!("{}: {}", py_str_repr(k), py_value_repr(v)))
            .collect();
        write!(
            f,
            "Document(page_content={}, metadata={{{}}})",
            py_str_repr(&self.page_content),
            metadata.join(", ")
        )
    }
}

/// A document paired with its cosine relevance in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub document: Document,
    pub score: f32,
}

impl RetrievedDocument {
    pub fn new(document: Document, score: f32) -> Self {
        Self { document, score }
    }
}

impl fmt::Display for RetrievedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.document, py_float_repr(self.score))
    }
}

/// Human-readable dump of a ranked result list.
pub fn render_results(results: &[RetrievedDocument]) -> String {
    let items: Vec<String> = results.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}
