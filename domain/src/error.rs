use thiserror::Error;

/// Failure categories of a single question/answer run. All of them end the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RagError {
    #[error("query text must not be empty")]
    EmptyQuery,

    /// The embedding model could not produce a vector (not reachable, not
    /// pulled, or returned nothing).
    #[error("failed to load embedding model: {0}")]
    ModelLoad(String),

    /// The persisted index is missing, unreadable or inconsistent.
    #[error("vector store unavailable: {0}")]
    StoreAccess(String),

    /// Network, authentication or quota failure talking to the chat model.
    #[error("remote model request failed: {0}")]
    RemoteService(String),
}
