pub mod capabilities;
pub mod error;
pub mod models;
pub mod prompt;
pub mod relevance_policy;
pub mod response;
