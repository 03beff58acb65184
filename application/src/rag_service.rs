use anyhow::Context;
use domain::capabilities::{DEFAULT_TOP_K, EmbeddingFunction, LanguageModel, VectorStore};
use domain::models::{render_results, Query, RetrievedDocument};
use domain::prompt::{build_context, PromptTemplate};
use domain::relevance_policy::{MatchConfidence, RelevancePolicy, NO_MATCH_MESSAGE};
use domain::response::FormattedResult;
use shared::telemetry::Telemetry;
use shared::types::Result;
use std::io::Write;

/// Knobs of a pipeline run, fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub top_k: usize,
    pub relevance: RelevancePolicy,
    pub template: PromptTemplate,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            relevance: RelevancePolicy::default(),
            template: PromptTemplate::builtin(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub results: Vec<RetrievedDocument>,
    pub confidence: MatchConfidence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RagAnswer {
    pub retrieval: Retrieval,
    pub prompt: String,
    pub formatted: FormattedResult,
}

/// Embed → search → prompt → complete → format, strictly in that order.
pub struct RagService<E, S, M> {
    embedder: E,
    store: S,
    model: M,
    settings: PipelineSettings,
}

impl<E, S, M> RagService<E, S, M>
where
    E: EmbeddingFunction,
    S: VectorStore,
    M: LanguageModel,
{
    pub fn new(embedder: E, store: S, model: M, settings: PipelineSettings) -> Self {
        Self {
            embedder,
            store,
            model,
            settings,
        }
    }

    pub async fn retrieve(&self, query: &Query) -> Result<Retrieval> {
        let timer = Telemetry::new("embed");
        let vector = self
            .embedder
            .embed(query.as_str())
            .await
            .context("embedding the query")?;
        timer.finish();

        let timer = Telemetry::new("search");
        let results = self
            .store
            .search(&vector, self.settings.top_k)
            .context("searching the index")?;
        timer.finish();

        let confidence = self.settings.relevance.assess(&results);
        tracing::debug!(hits = results.len(), ?confidence, "retrieval finished");
        Ok(Retrieval {
            results,
            confidence,
        })
    }

    pub fn assemble_prompt(&self, query: &Query, results: &[RetrievedDocument]) -> String {
        let context = build_context(results);
        self.settings.template.render(&context, query.as_str())
    }

    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let timer = Telemetry::new("complete");
        let answer = self
            .model
            .complete(prompt)
            .await
            .context("asking the model")?;
        timer.finish();
        Ok(answer)
    }

    /// Run the whole pipeline, writing the retrieval dump, the low-confidence
    /// notice, the prompt and finally the answer to `out`. Everything before
    /// the answer is flushed before the model is called.
    ///
    /// A low-confidence retrieval is reported but does not stop the run.
    pub async fn query<W: Write>(&self, query: &Query, out: &mut W) -> Result<RagAnswer> {
        let retrieval = self.retrieve(query).await?;
        writeln!(out, "{}", render_results(&retrieval.results))?;
        if retrieval.confidence == MatchConfidence::Low {
            tracing::warn!(
                threshold = self.settings.relevance.threshold,
                top_score = retrieval.results.first().map(|r| r.score),
                "no confident match"
            );
            writeln!(out, "{NO_MATCH_MESSAGE}")?;
        }

        let prompt = self.assemble_prompt(query, &retrieval.results);
        writeln!(out, "{prompt}")?;
        out.flush()?;

        let answer = self.generate(&prompt).await?;
        let formatted = FormattedResult::new(answer, &retrieval.results);
        writeln!(out, "{formatted}")?;
        out.flush()?;

        Ok(RagAnswer {
            retrieval,
            prompt,
            formatted,
        })
    }
}
