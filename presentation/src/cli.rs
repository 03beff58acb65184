use anyhow::Context;
use application::rag_service::{PipelineSettings, RagService};
use clap::Parser;
use colored::Colorize;
use domain::error::RagError;
use domain::models::Query;
use domain::relevance_policy::RelevancePolicy;
use infrastructure::config::{Config, ConfigError};
use infrastructure::embedder::Embedder;
use infrastructure::embedding_storage::LazyEmbeddingStorage;
use infrastructure::ollama_client::OllamaClient;
use shared::types::Result;
use std::io::{self, Write};

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_USAGE: u8 = 2;
pub const EXIT_MODEL_LOAD: u8 = 3;
pub const EXIT_STORE_ACCESS: u8 = 4;
pub const EXIT_REMOTE_SERVICE: u8 = 5;

#[derive(Parser, Debug)]
#[command(name = "rag_query", version)]
#[command(about = "Answer a question from a local embedding index using an LLM")]
pub struct Cli {
    /// The query text.
    pub query_text: String,
}

pub struct CliApp {
    config: Config,
}

impl CliApp {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn from_env() -> Result<Self> {
        let config = Config::load().context("loading configuration")?;
        Ok(Self::new(config))
    }

    pub fn settings(&self) -> Result<PipelineSettings> {
        Ok(PipelineSettings {
            top_k: self.config.top_k,
            relevance: RelevancePolicy::new(self.config.relevance_threshold),
            template: self.config.prompt_template()?,
        })
    }

    pub async fn run(&self, cli: Cli) -> Result<()> {
        self.run_with(cli, &mut io::stdout()).await
    }

    /// Answer `cli.query_text`, writing every user-visible line to `out`.
    /// The query is embedded before the index is opened.
    pub async fn run_with<W: Write>(&self, cli: Cli, out: &mut W) -> Result<()> {
        let query = Query::parse(cli.query_text)?;
        let settings = self.settings()?;

        let chat = OllamaClient::from_config(&self.config)?;
        let embedder = Embedder::new(chat.with_model(self.config.embedding_model.as_str()));
        let store = LazyEmbeddingStorage::new(self.config.db_path.clone());
        tracing::info!(
            index = %self.config.db_path.display(),
            embedding_model = embedder.model(),
            chat_model = chat.model(),
            "pipeline ready"
        );

        let service = RagService::new(embedder, store, chat, settings);
        service.query(&query, out).await?;
        Ok(())
    }
}

/// Process exit status for a failed run.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(rag) = cause.downcast_ref::<RagError>() {
            return match rag {
                RagError::EmptyQuery => EXIT_USAGE,
                RagError::ModelLoad(_) => EXIT_MODEL_LOAD,
                RagError::StoreAccess(_) => EXIT_STORE_ACCESS,
                RagError::RemoteService(_) => EXIT_REMOTE_SERVICE,
            };
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return EXIT_USAGE;
        }
    }
    EXIT_FAILURE
}

pub fn report_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "Error:".red().bold(), err);
}
