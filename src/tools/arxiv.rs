//! Paper lookup via the arXiv Atom API.

use super::{RetrievalTool, ToolKind};
use crate::config::ToolLimits;
use crate::error::{Result, ScoutError};
use crate::text::{collapse_whitespace, decode_entities, truncate_chars};
use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, instrument};

const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

/// arXiv rejects overly long search strings.
const MAX_QUERY_CHARS: usize = 300;

/// A paper entry from the Atom feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Paper {
    pub published: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
}

impl Paper {
    fn format(&self) -> String {
        format!(
            "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}",
            self.published,
            self.title,
            self.authors.join(", "),
            self.summary
        )
    }
}

/// Scientific paper lookup tool.
pub struct ArxivLookup {
    client: reqwest::Client,
    limits: ToolLimits,
    id_regex: Regex,
    marker_regex: Regex,
    entry_regex: Regex,
    author_regex: Regex,
}

impl ArxivLookup {
    pub fn new(client: reqwest::Client, limits: ToolLimits) -> Self {
        // New-style (1706.03762v5) and old-style (hep-th/9901001) identifiers
        let id_regex = Regex::new(
            r"(?x)
            \b(
                \d{4}\.\d{4,5}(?:v\d+)?
                |
                [a-z\-]+(?:\.[A-Z]{2})?/\d{7}(?:v\d+)?
            )\b
        ",
        )
        .expect("Invalid regex");

        Self {
            client,
            limits,
            id_regex,
            marker_regex: Regex::new(r"(?i)arxiv:").expect("Invalid regex"),
            entry_regex: Regex::new(r"(?s)<entry>(.*?)</entry>").expect("Invalid regex"),
            author_regex: Regex::new(r"(?s)<author>\s*<name>(.*?)</name>").expect("Invalid regex"),
        }
    }

    /// arXiv identifiers mentioned in the query, in order of appearance.
    pub fn extract_ids(&self, query: &str) -> Vec<String> {
        self.id_regex
            .captures_iter(query)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }

    /// Query with any `arxiv:` markers removed, capped in length.
    fn clean_query(&self, query: &str) -> String {
        let stripped = self.marker_regex.replace_all(query, " ");
        truncate_chars(&collapse_whitespace(&stripped), MAX_QUERY_CHARS)
    }

    /// Parse entries from an Atom feed.
    pub fn parse_feed(&self, xml: &str) -> Result<Vec<Paper>> {
        let mut papers = Vec::new();

        for caps in self.entry_regex.captures_iter(xml) {
            let entry = &caps[1];

            let id = tag_text(entry, "id").unwrap_or_default();
            if id.contains("/api/errors") {
                let detail = tag_text(entry, "summary").unwrap_or_else(|| "unknown error".to_string());
                return Err(ScoutError::tool("arxiv", detail));
            }

            let published = tag_text(entry, "published")
                .map(|raw| format_date(&raw))
                .unwrap_or_default();

            let authors = self
                .author_regex
                .captures_iter(entry)
                .map(|a| clean_text(&a[1]))
                .collect();

            papers.push(Paper {
                published,
                title: tag_text(entry, "title").unwrap_or_default(),
                authors,
                summary: tag_text(entry, "summary").unwrap_or_default(),
            });
        }

        Ok(papers)
    }
}

#[async_trait]
impl RetrievalTool for ArxivLookup {
    fn kind(&self) -> ToolKind {
        ToolKind::Arxiv
    }

    fn limits(&self) -> ToolLimits {
        self.limits
    }

    #[instrument(skip(self))]
    async fn run(&self, query: &str) -> Result<String> {
        let ids = self.extract_ids(query);
        let max_results = self.limits.top_k_results.to_string();

        let request = if ids.is_empty() {
            let cleaned = self.clean_query(query);
            if cleaned.is_empty() {
                return Err(ScoutError::InvalidInput("Empty arxiv query".to_string()));
            }
            debug!("Searching arxiv for: {}", cleaned);
            self.client.get(ARXIV_API_URL).query(&[
                ("search_query", format!("all:{}", cleaned)),
                ("max_results", max_results),
            ])
        } else {
            debug!("Looking up arxiv ids: {:?}", ids);
            self.client.get(ARXIV_API_URL).query(&[
                ("id_list", ids.join(",")),
                ("max_results", max_results),
            ])
        };

        let response = request
            .send()
            .await
            .map_err(|e| ScoutError::tool("arxiv", format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoutError::tool(
                "arxiv",
                format!("arXiv returned HTTP {}", status.as_u16()),
            ));
        }

        let xml = response.text().await?;
        let papers = self.parse_feed(&xml)?;

        if papers.is_empty() {
            return Err(ScoutError::NoResults(query.to_string()));
        }

        let formatted = papers
            .iter()
            .take(self.limits.top_k_results)
            .map(Paper::format)
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(truncate_chars(&formatted, self.limits.max_chars))
    }
}

/// Text of the first `<tag>` element in an entry, whitespace-collapsed.
fn tag_text(entry: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = entry.find(&open)? + open.len();
    let end = start + entry[start..].find(&close)?;
    Some(clean_text(&entry[start..end]))
}

fn clean_text(raw: &str) -> String {
    collapse_whitespace(&decode_entities(raw))
}

/// `2017-06-12T17:57:34Z` -> `2017-06-12`.
fn format_date(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| raw.to_string())
}
