//! Web search via the DuckDuckGo HTML endpoint.

use super::{RetrievalTool, ToolKind};
use crate::config::ToolLimits;
use crate::error::{Result, ScoutError};
use crate::text::{collapse_whitespace, truncate_chars};
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

/// DuckDuckGo HTML endpoint (no API key required).
const DDG_HTML_URL: &str = "https://html.duckduckgo.com/html/";

/// One organic search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// General web search tool.
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    limits: ToolLimits,
}

impl DuckDuckGoSearch {
    pub fn new(client: reqwest::Client, limits: ToolLimits) -> Self {
        Self { client, limits }
    }
}

#[async_trait]
impl RetrievalTool for DuckDuckGoSearch {
    fn kind(&self) -> ToolKind {
        ToolKind::Search
    }

    fn limits(&self) -> ToolLimits {
        self.limits
    }

    #[instrument(skip(self))]
    async fn run(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .post(DDG_HTML_URL)
            .form(&[("q", query)])
            .send()
            .await
            .map_err(|e| ScoutError::tool("search", format!("Search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoutError::tool(
                "search",
                format!("Search returned HTTP {}", status.as_u16()),
            ));
        }

        let body = response.text().await?;
        let hits = parse_results(&body, self.limits.top_k_results);
        debug!("Parsed {} search results", hits.len());

        if hits.is_empty() {
            return Err(ScoutError::NoResults(query.to_string()));
        }

        Ok(format_hits(&hits, self.limits.max_chars))
    }
}

/// Extract organic results from a DuckDuckGo HTML results page.
pub fn parse_results(html: &str, limit: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);

    let (Ok(result_sel), Ok(title_sel), Ok(snippet_sel)) = (
        Selector::parse("div.result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    document
        .select(&result_sel)
        .filter(|el| !el.value().classes().any(|c| c == "result--ad"))
        .filter_map(|el| {
            let title_el = el.select(&title_sel).next()?;
            let snippet = el
                .select(&snippet_sel)
                .next()
                .map(|s| collapse_whitespace(&s.text().collect::<String>()))
                .unwrap_or_default();

            if snippet.is_empty() {
                return None;
            }

            Some(SearchHit {
                title: collapse_whitespace(&title_el.text().collect::<String>()),
                snippet,
                url: title_el.value().attr("href").unwrap_or_default().to_string(),
            })
        })
        .take(limit)
        .collect()
}

/// Join result snippets into one answer text.
fn format_hits(hits: &[SearchHit], max_chars: usize) -> String {
    let joined = hits
        .iter()
        .map(|h| h.snippet.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    truncate_chars(&joined, max_chars)
}
