//! Generic web page loading.

use super::{Document, PageLoader};
use crate::config::FetchSettings;
use crate::error::{Result, ScoutError};
use crate::text::collapse_whitespace;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Node, Selector};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// Maximum response body size (5 MB)
const MAX_BODY_SIZE: usize = 5 * 1024 * 1024;

/// Tags whose entire subtree is not visible text.
const SKIP_TAGS: [&str; 6] = ["script", "style", "noscript", "svg", "template", "head"];

/// Loads a page over HTTP and extracts its visible text.
pub struct WebPageLoader {
    client: reqwest::Client,
}

impl WebPageLoader {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        if !settings.verify_tls {
            warn!("TLS certificate verification is disabled for page loads");
        }

        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .danger_accept_invalid_certs(!settings.verify_tls)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageLoader for WebPageLoader {
    #[instrument(skip(self), fields(url = %url))]
    async fn load(&self, url: &Url) -> Result<Vec<Document>> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ScoutError::Fetch(format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoutError::Fetch(format!(
                "{} returned HTTP {} {}",
                url,
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response.bytes().await?;
        if body.len() > MAX_BODY_SIZE {
            return Err(ScoutError::Fetch(format!(
                "Response too large: {} bytes (max: {} bytes)",
                body.len(),
                MAX_BODY_SIZE
            )));
        }

        let body = String::from_utf8_lossy(&body);
        let text = if content_type.is_empty()
            || content_type.contains("text/html")
            || content_type.contains("application/xhtml")
        {
            html_to_text(&body)
        } else if content_type.starts_with("text/") {
            body.trim().to_string()
        } else {
            return Err(ScoutError::Fetch(format!(
                "Unsupported content type '{}' at {}",
                content_type, url
            )));
        };

        debug!("Extracted {} characters", text.len());

        if text.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![Document {
            text,
            source_ref: url.to_string(),
        }])
    }
}

/// Extract readable text from HTML, stripping tags, scripts, and styles.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next());
    let root = body.unwrap_or_else(|| document.root_element());

    let mut parts = Vec::new();
    collect_text(root, &mut parts);
    collapse_whitespace(&parts.join(" "))
}

fn collect_text(element: ElementRef, parts: &mut Vec<String>) {
    if SKIP_TAGS.contains(&element.value().name()) {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let t = text.trim();
                if !t.is_empty() {
                    parts.push(t.to_string());
                }
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, parts);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_basic() {
        let html = "<html><body><h1>Hello</h1><p>World</p></body></html>";
        assert_eq!(html_to_text(html), "Hello World");
    }

    #[test]
    fn test_html_to_text_strips_invisible_content() {
        let html = r#"
        <html>
          <head><title>Ignored title</title><style>.x { color: red; }</style></head>
          <body>
            <script>var x = 1;</script>
            <p>Visible   text</p>
            <noscript>No JS</noscript>
            <p>Tom &amp; Jerry</p>
          </body>
        </html>
        "#;
        let text = html_to_text(html);
        assert_eq!(text, "Visible text Tom & Jerry");
    }

    #[test]
    fn test_html_to_text_empty() {
        assert!(html_to_text("").is_empty());
        assert!(html_to_text("<html><body><script>x()</script></body></html>").is_empty());
    }

    #[test]
    fn test_loader_builds_with_tls_disabled() {
        let settings = FetchSettings {
            verify_tls: false,
            ..FetchSettings::default()
        };
        assert!(WebPageLoader::new(&settings).is_ok());
    }
}
