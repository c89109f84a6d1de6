//! Content summarization.
//!
//! All fetched text goes into a single prompt and a single model call;
//! nothing is chunked or reduced in multiple passes.

use crate::config::{Prompts, Settings};
use crate::error::{Result, ScoutError};
use crate::fetch::{Document, Fetcher};
use crate::llm::{LlmBackend, OpenAiBackend, TokenSink};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// A finished summary.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Summary {
    pub text: String,
    /// Where the summarized documents came from.
    pub sources: Vec<String>,
}

/// Summarizes documents with one templated LLM call.
pub struct Summarizer {
    backend: Arc<dyn LlmBackend>,
    prompts: Prompts,
}

impl Summarizer {
    pub fn new(backend: Arc<dyn LlmBackend>, prompts: Prompts) -> Self {
        Self { backend, prompts }
    }

    /// Build the prompt for a set of documents.
    pub fn build_prompt(&self, documents: &[Document]) -> String {
        let text = documents
            .iter()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut vars = HashMap::new();
        vars.insert("text".to_string(), text);
        self.prompts
            .render_with_custom(&self.prompts.summarize.template, &vars)
    }

    /// Summarize `documents`; fails with `NoContentLoaded` when there are none.
    #[instrument(skip_all, fields(documents = documents.len(), model = %self.backend.model()))]
    pub async fn summarize(
        &self,
        documents: &[Document],
        on_token: Option<TokenSink<'_>>,
    ) -> Result<Summary> {
        if documents.is_empty() {
            return Err(ScoutError::NoContentLoaded("the given URL".to_string()));
        }

        let prompt = self.build_prompt(documents);
        info!("Summarizing {} characters", prompt.len());

        let text = self.backend.generate(&prompt, on_token).await?;

        Ok(Summary {
            text,
            sources: documents.iter().map(|d| d.source_ref.clone()).collect(),
        })
    }
}

/// Fetch then summarize, the whole flow behind one "summarize" action.
pub struct SummarizePipeline {
    fetcher: Fetcher,
    summarizer: Summarizer,
}

impl SummarizePipeline {
    pub fn new(fetcher: Fetcher, summarizer: Summarizer) -> Self {
        Self {
            fetcher,
            summarizer,
        }
    }

    /// Wire up the hosted model and the real fetchers.
    pub fn from_settings(
        settings: &Settings,
        prompts: Prompts,
        api_key: &str,
        model: Option<&str>,
    ) -> Result<Self> {
        let model = model.unwrap_or(&settings.llm.summary_model);
        let backend = Arc::new(OpenAiBackend::new(api_key, &settings.llm, model)?);

        Ok(Self::new(
            Fetcher::from_settings(&settings.fetch)?,
            Summarizer::new(backend, prompts),
        ))
    }

    /// Summarize whatever `url` points at.
    pub async fn run(&self, url: &str, on_token: Option<TokenSink<'_>>) -> Result<Summary> {
        let documents = self.fetcher.fetch(url).await?;
        if documents.is_empty() {
            return Err(ScoutError::NoContentLoaded(url.trim().to_string()));
        }
        self.summarizer.summarize(&documents, on_token).await
    }
}
