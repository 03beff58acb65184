use domain::error::RagError;
use domain::models::{Embedding, RetrievedDocument};
use rayon::prelude::*;

pub struct SearchEngine;

impl SearchEngine {
    /// Cosine of the angle between `a` and `b`; 0 when either has zero norm.
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot_product / (norm_a * norm_b)
    }

    /// Cosine similarity clamped to the `[0, 1]` relevance range.
    pub fn relevance_score(a: &[f32], b: &[f32]) -> f32 {
        let score = Self::cosine_similarity(a, b);
        if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        }
    }

    /// Top `k` rows by descending relevance. Equal scores keep their stored
    /// order, so the same query over the same index always ranks identically.
    pub fn find_relevant_chunks(
        query_embedding: &[f32],
        embeddings: Vec<Embedding>,
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, RagError> {
        if let Some(bad) = embeddings
            .iter()
            .find(|e| e.vector.len() != query_embedding.len())
        {
            return Err(RagError::StoreAccess(format!(
                "row {} has dimension {}, query has {}",
                bad.id,
                bad.vector.len(),
                query_embedding.len()
            )));
        }

        let scores: Vec<f32> = embeddings
            .par_iter()
            .map(|emb| Self::relevance_score(query_embedding, &emb.vector))
            .collect();

        let mut similarities: Vec<(f32, Embedding)> = scores.into_iter().zip(embeddings).collect();
        similarities.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(similarities
            .into_iter()
            .take(top_k)
            .map(|(score, emb)| RetrievedDocument::new(emb.into_document(), score))
            .collect())
    }
}
