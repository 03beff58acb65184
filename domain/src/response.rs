use crate::models::RetrievedDocument;
use serde_json::Value;
use shared::utils::py_list_repr;
use std::fmt;

/// The model's answer together with the provenance of the context it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedResult {
    pub answer: String,
    /// The `source` metadata of each retrieved document, in rank order.
    pub sources: Vec<Option<Value>>,
}

impl FormattedResult {
    pub fn new(answer: impl Into<String>, results: &[RetrievedDocument]) -> Self {
        Self {
            answer: answer.into(),
            sources: results
                .iter()
                .map(|r| r.document.source().cloned())
                .collect(),
        }
    }
}

impl fmt::Display for FormattedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Response: {}\nSources: {}",
            self.answer,
            py_list_repr(self.sources.iter().map(Option::as_ref))
        )
    }
}
