pub mod config;
pub mod embedder;
pub mod embedding_storage;
pub mod ollama_client;
pub mod search;
