use domain::capabilities::DEFAULT_TOP_K;
use domain::prompt::{PromptTemplate, TemplateError};
use domain::relevance_policy::DEFAULT_RELEVANCE_THRESHOLD;
use dotenvy::dotenv;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";
pub const DEFAULT_CHAT_MODEL: &str = "llama3.1";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_DB_PATH: &str = "chroma/embeddings.db";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key}={value:?}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("cannot read prompt template {path:?}: {source}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bad prompt template {path:?}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub ollama_base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub temperature: f32,
    pub db_path: PathBuf,
    pub top_k: usize,
    pub relevance_threshold: f32,
    pub request_timeout: Duration,
    pub prompt_template_path: Option<PathBuf>,
}

impl Config {
    /// Read `.env` (if any) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let text = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let temperature: f32 =
            parse_var(get("RAG_TEMPERATURE"), "RAG_TEMPERATURE", DEFAULT_TEMPERATURE)?;
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(invalid(
                "RAG_TEMPERATURE",
                temperature,
                "must be a finite number >= 0",
            ));
        }
        let relevance_threshold: f32 = parse_var(
            get("RAG_RELEVANCE_THRESHOLD"),
            "RAG_RELEVANCE_THRESHOLD",
            DEFAULT_RELEVANCE_THRESHOLD,
        )?;
        if !(0.0..=1.0).contains(&relevance_threshold) {
            return Err(invalid(
                "RAG_RELEVANCE_THRESHOLD",
                relevance_threshold,
                "must be within [0, 1]",
            ));
        }
        let timeout_secs: u64 = parse_var(
            get("RAG_REQUEST_TIMEOUT_SECS"),
            "RAG_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(invalid("RAG_REQUEST_TIMEOUT_SECS", timeout_secs, "must be positive"));
        }

        Ok(Self {
            ollama_base_url: text("OLLAMA_BASE_URL", DEFAULT_OLLAMA_BASE_URL),
            embedding_model: text("OLLAMA_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            chat_model: text("OLLAMA_MODEL", DEFAULT_CHAT_MODEL),
            temperature,
            db_path: PathBuf::from(text("DB_PATH", DEFAULT_DB_PATH)),
            top_k: parse_var(get("RAG_TOP_K"), "RAG_TOP_K", DEFAULT_TOP_K)?,
            relevance_threshold,
            request_timeout: Duration::from_secs(timeout_secs),
            prompt_template_path: get("RAG_PROMPT_TEMPLATE_PATH").map(PathBuf::from),
        })
    }

    /// The configured template file, or the built-in one.
    pub fn prompt_template(&self) -> Result<PromptTemplate, ConfigError> {
        let Some(path) = &self.prompt_template_path else {
            return Ok(PromptTemplate::builtin());
        };
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::TemplateRead {
            path: path.clone(),
            source,
        })?;
        PromptTemplate::parse(&source).map_err(|source| ConfigError::Template {
            path: path.clone(),
            source,
        })
    }
}

fn parse_var<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(default),
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::InvalidValue {
                key,
                reason: e.to_string(),
                value,
            }),
        },
    }
}

fn invalid(key: &'static str, value: impl Display, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
