use crate::models::RetrievedDocument;

pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 0.7;
pub const NO_MATCH_MESSAGE: &str = "Unable to find matching results.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchConfidence {
    Confident,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevancePolicy {
    pub threshold: f32,
}

impl RelevancePolicy {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Low when nothing came back or the best score is strictly below the
    /// threshold. Results are assumed ranked.
    pub fn assess(&self, results: &[RetrievedDocument]) -> MatchConfidence {
        match results.first() {
            Some(top) if top.score >= self.threshold => MatchConfidence::Confident,
            _ => MatchConfidence::Low,
        }
    }
}

impl Default for RelevancePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RELEVANCE_THRESHOLD)
    }
}
