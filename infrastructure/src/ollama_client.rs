use crate::config::Config;
use anyhow::Context;
use domain::capabilities::LanguageModel;
use domain::error::RagError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::types::Result;
use std::sync::Arc;
use std::time::Duration;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<Message>,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

/// HTTP client for an Ollama-compatible server. Cheap to clone; clones share
/// the connection pool.
#[derive(Clone)]
pub struct OllamaClient {
    client: Arc<Client>,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: crate::config::DEFAULT_TEMPERATURE,
        })
    }

    /// Chat client for the configured answer model and temperature.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.ollama_base_url.as_str(),
            config.chat_model.as_str(),
            config.request_timeout,
        )?
        .with_temperature(config.temperature))
    }

    /// Same connection pool, different model.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate_embedding(&self, text: &str) -> std::result::Result<Vec<f32>, RagError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };
        tracing::debug!(%url, model = %self.model, "requesting embedding");
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::ModelLoad(format!("embedding request to {url} failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::ModelLoad(format!(
                "embedding model {} unavailable ({status}): {}",
                self.model,
                body.trim()
            )));
        }
        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            RagError::ModelLoad(format!("malformed embedding response from {}: {e}", self.model))
        })?;
        Ok(embedding_response.embedding)
    }

    pub async fn generate_response(&self, prompt: &str) -> std::result::Result<String, RagError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };
        tracing::debug!(
            %url,
            model = %self.model,
            temperature = self.temperature,
            "requesting completion"
        );
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::RemoteService(format!("chat request to {url} failed: {e}")))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RagError::RemoteService(format!("reading chat response failed: {e}")))?;
        if !status.is_success() {
            return Err(RagError::RemoteService(format!(
                "{} returned {status}: {}",
                self.model,
                text.trim()
            )));
        }

        // Non-streaming replies are a single object; tolerate NDJSON as well.
        let mut full_content = String::new();
        let mut saw_message = false;
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let chat_resp: ChatResponse = serde_json::from_str(line).map_err(|e| {
                RagError::RemoteService(format!("malformed chat response: {e}"))
            })?;
            if let Some(error) = chat_resp.error {
                return Err(RagError::RemoteService(error));
            }
            if let Some(message) = chat_resp.message {
                saw_message = true;
                full_content.push_str(&message.content);
            }
            if chat_resp.done {
                break;
            }
        }
        if !saw_message {
            return Err(RagError::RemoteService(format!(
                "{} returned no message",
                self.model
            )));
        }
        Ok(full_content)
    }
}

impl LanguageModel for OllamaClient {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, RagError> {
        self.generate_response(prompt).await
    }
}
