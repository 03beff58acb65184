use super::ollama_client::OllamaClient;
use domain::capabilities::EmbeddingFunction;
use domain::error::RagError;

/// Query-side embedding function backed by an Ollama embedding model.
pub struct Embedder {
    client: OllamaClient,
}

impl Embedder {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }
}

impl EmbeddingFunction for Embedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let vector = self.client.generate_embedding(text).await?;
        if vector.is_empty() {
            return Err(RagError::ModelLoad(format!(
                "embedding model {} returned an empty vector",
                self.client.model()
            )));
        }
        tracing::debug!(model = self.client.model(), dimension = vector.len(), "embedded query");
        Ok(vector)
    }
}
