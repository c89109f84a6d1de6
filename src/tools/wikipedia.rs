//! Wikipedia lookup via the MediaWiki action API.

use super::{RetrievalTool, ToolKind};
use crate::config::ToolLimits;
use crate::error::{Result, ScoutError};
use crate::text::truncate_chars;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// MediaWiki rejects longer search strings.
const MAX_QUERY_CHARS: usize = 300;

/// Encyclopedia summary tool.
pub struct WikipediaLookup {
    client: reqwest::Client,
    limits: ToolLimits,
    api_url: String,
}

impl WikipediaLookup {
    pub fn new(client: reqwest::Client, limits: ToolLimits, lang: &str) -> Self {
        Self {
            client,
            limits,
            api_url: format!("https://{}.wikipedia.org/w/api.php", lang),
        }
    }
}

#[async_trait]
impl RetrievalTool for WikipediaLookup {
    fn kind(&self) -> ToolKind {
        ToolKind::Wikipedia
    }

    fn limits(&self) -> ToolLimits {
        self.limits
    }

    #[instrument(skip(self))]
    async fn run(&self, query: &str) -> Result<String> {
        let search = truncate_chars(query, MAX_QUERY_CHARS);
        let limit = self.limits.top_k_results.to_string();

        // One request: search titles and pull the plain-text intro of each hit.
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("generator", "search"),
                ("gsrsearch", search.as_str()),
                ("gsrlimit", limit.as_str()),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("exlimit", "max"),
                ("redirects", "1"),
            ])
            .send()
            .await
            .map_err(|e| ScoutError::tool("wikipedia", format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoutError::tool(
                "wikipedia",
                format!("Wikipedia returned HTTP {}", status.as_u16()),
            ));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            ScoutError::tool("wikipedia", format!("Failed to parse response: {}", e))
        })?;

        let pages = parse_pages(&body);
        debug!("Wikipedia returned {} pages", pages.len());

        if pages.is_empty() {
            return Err(ScoutError::NoResults(query.to_string()));
        }

        let formatted = pages
            .iter()
            .take(self.limits.top_k_results)
            .map(|(title, extract)| format!("Page: {}\nSummary: {}", title, extract))
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(truncate_chars(&formatted, self.limits.max_chars))
    }
}

/// Pull `(title, extract)` pairs out of a generator=search response, in rank order.
fn parse_pages(body: &serde_json::Value) -> Vec<(String, String)> {
    let Some(pages) = body["query"]["pages"].as_object() else {
        return Vec::new();
    };

    let mut ranked: Vec<(u64, String, String)> = pages
        .values()
        .filter_map(|page| {
            let title = page["title"].as_str()?.to_string();
            let extract = page["extract"].as_str().unwrap_or_default().trim().to_string();
            if extract.is_empty() {
                return None;
            }
            let index = page["index"].as_u64().unwrap_or(u64::MAX);
            Some((index, title, extract))
        })
        .collect();

    ranked.sort_by_key(|(index, _, _)| *index);
    ranked
        .into_iter()
        .map(|(_, title, extract)| (title, extract))
        .collect()
}
