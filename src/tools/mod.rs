//! Retrieval tools: web search, Wikipedia and Arxiv.
//!
//! Each tool maps a free-text query to a short text result, bounded by its
//! [`ToolLimits`]. Tools are stateless; failures (network, upstream errors,
//! zero results) are returned as errors rather than empty text.

mod arxiv;
mod search;
mod wikipedia;

pub use arxiv::ArxivLookup;
pub use search::DuckDuckGoSearch;
pub use wikipedia::WikipediaLookup;

use crate::config::{Settings, ToolLimits};
use crate::error::{Result, ScoutError};
use crate::llm::ToolSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// The fixed catalogue of tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Search,
    Wikipedia,
    Arxiv,
}

impl ToolKind {
    /// All tools, in the order they are offered to the model.
    pub const ALL: [ToolKind; 3] = [ToolKind::Search, ToolKind::Arxiv, ToolKind::Wikipedia];

    /// Name the model uses to call the tool.
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Search => "search",
            ToolKind::Wikipedia => "wikipedia",
            ToolKind::Arxiv => "arxiv",
        }
    }

    /// Look up a tool by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Description shown to the model.
    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::Search => {
                "A web search engine. Useful for questions about current events \
                 or anything not covered by the other tools. Input should be a search query."
            }
            ToolKind::Wikipedia => {
                "A wrapper around Wikipedia. Useful for general questions about people, \
                 places, companies, facts, historical events, or other subjects. \
                 Input should be a search query."
            }
            ToolKind::Arxiv => {
                "A wrapper around Arxiv.org. Useful for questions about physics, mathematics, \
                 computer science, quantitative biology, quantitative finance, statistics, \
                 electrical engineering, and economics from scientific articles on arxiv.org. \
                 Input should be a search query or an arXiv identifier."
            }
        }
    }

    /// Function-calling definition for this tool.
    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The query to look up"
                    }
                },
                "required": ["query"]
            }),
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("Unknown tool: {}", s))
    }
}

/// A named query function backed by an external source.
#[async_trait]
pub trait RetrievalTool: Send + Sync {
    /// Which tool this is.
    fn kind(&self) -> ToolKind;

    /// Result budget.
    fn limits(&self) -> ToolLimits;

    /// Run a query and return the formatted, truncated result.
    async fn run(&self, query: &str) -> Result<String>;
}

/// Outcome of one tool invocation within a turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub tool_name: String,
    pub query: String,
    pub result_text: String,
}

/// The tools available to the router and the agent.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: HashMap<ToolKind, Arc<dyn RetrievalTool>>,
}

impl ToolSet {
    /// Create an empty tool set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool of the same kind.
    pub fn with_tool(mut self, tool: Arc<dyn RetrievalTool>) -> Self {
        self.tools.insert(tool.kind(), tool);
        self
    }

    /// Build the standard tool set from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.fetch.user_agent.clone())
            .timeout(Duration::from_secs(settings.fetch.timeout_secs))
            .build()?;

        Ok(Self::new()
            .with_tool(Arc::new(DuckDuckGoSearch::new(
                client.clone(),
                settings.tools.search,
            )))
            .with_tool(Arc::new(WikipediaLookup::new(
                client.clone(),
                settings.tools.wikipedia,
                &settings.tools.wikipedia_lang,
            )))
            .with_tool(Arc::new(ArxivLookup::new(client, settings.tools.arxiv))))
    }

    /// Get a registered tool.
    pub fn get(&self, kind: ToolKind) -> Option<&Arc<dyn RetrievalTool>> {
        self.tools.get(&kind)
    }

    /// Registered tool kinds, in catalogue order.
    pub fn kinds(&self) -> Vec<ToolKind> {
        ToolKind::ALL
            .into_iter()
            .filter(|kind| self.tools.contains_key(kind))
            .collect()
    }

    /// Function-calling definitions for the registered tools.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.kinds().iter().map(ToolKind::spec).collect()
    }

    /// Run one tool.
    #[instrument(skip(self, query), fields(tool = %kind))]
    pub async fn run(&self, kind: ToolKind, query: &str) -> Result<ToolResult> {
        let tool = self
            .get(kind)
            .ok_or_else(|| ScoutError::tool(kind.name(), "tool is not available"))?;

        info!("Running {} with query: {}", kind, query);

        match tool.run(query).await {
            Ok(result_text) => Ok(ToolResult {
                tool_name: kind.name().to_string(),
                query: query.to_string(),
                result_text,
            }),
            Err(e) => {
                warn!("{} failed: {}", kind, e);
                Err(e)
            }
        }
    }
}

/// Arguments the model sends with a tool call.
#[derive(Debug, Deserialize)]
struct ToolArguments {
    query: String,
}

/// Parse a tool call from the function-calling format.
///
/// Accepts `{"query": "..."}` or a bare JSON string.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<(ToolKind, String)> {
    let kind = ToolKind::from_name(name)
        .ok_or_else(|| ScoutError::Agent(format!("Unknown tool: {}", name)))?;

    let query = match serde_json::from_str::<ToolArguments>(arguments) {
        Ok(args) => args.query,
        Err(_) => serde_json::from_str::<String>(arguments)
            .map_err(|e| ScoutError::Agent(format!("Invalid tool arguments: {}", e)))?,
    };

    if query.trim().is_empty() {
        return Err(ScoutError::Agent("Missing 'query' argument".to_string()));
    }

    Ok((kind, query))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fake tools for router and agent tests.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Tool returning a fixed reply (or failing), counting calls.
    pub struct FakeTool {
        pub kind: ToolKind,
        pub reply: std::result::Result<String, String>,
        pub calls: AtomicUsize,
    }

    impl FakeTool {
        pub fn ok(kind: ToolKind, reply: &str) -> Arc<Self> {
            Arc::new(Self {
                kind,
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn failing(kind: ToolKind, message: &str) -> Arc<Self> {
            Arc::new(Self {
                kind,
                reply: Err(message.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RetrievalTool for FakeTool {
        fn kind(&self) -> ToolKind {
            self.kind
        }

        fn limits(&self) -> ToolLimits {
            ToolLimits {
                top_k_results: 1,
                max_chars: 200,
            }
        }

        async fn run(&self, _query: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .map_err(|message| ScoutError::tool(self.kind.name(), message))
        }
    }
}
