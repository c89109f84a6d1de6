//! Document acquisition for the summarizer.
//!
//! A URL is either a YouTube video (summarize its transcript) or any other
//! web page (summarize its visible text). Input is validated before any
//! network call is made.

mod web;
mod youtube;

pub use web::{html_to_text, WebPageLoader};
pub use youtube::{extract_video_id, is_youtube_host, TranscriptSegment, YoutubeTranscripts};

use crate::config::FetchSettings;
use crate::error::{Result, ScoutError};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use url::Url;

/// Fetched text and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub text: String,
    pub source_ref: String,
}

/// What a URL points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlKind {
    Video { id: String },
    WebPage,
}

/// Source of video transcripts.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Transcript segments in playback order.
    ///
    /// Fails with [`ScoutError::TranscriptUnavailable`] when the video has no
    /// transcript or transcripts are disabled.
    async fn fetch(&self, video_id: &str) -> Result<Vec<TranscriptSegment>>;
}

/// Loader for generic web pages.
#[async_trait]
pub trait PageLoader: Send + Sync {
    /// Zero or one document with the page's visible text.
    async fn load(&self, url: &Url) -> Result<Vec<Document>>;
}

/// Parse and check a user-supplied URL.
pub fn validate_url(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ScoutError::InvalidInput("Please provide a URL".to_string()));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| ScoutError::InvalidInput(format!("'{}' is not a valid URL: {}", trimmed, e)))?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(ScoutError::InvalidInput(format!(
            "'{}' is not a valid URL: expected an http(s) address",
            trimmed
        ))),
    }
}

/// Decide how to fetch a validated URL.
pub fn classify_url(url: &Url) -> Result<UrlKind> {
    let host = url.host_str().unwrap_or_default();
    if !is_youtube_host(host) {
        return Ok(UrlKind::WebPage);
    }

    extract_video_id(url.as_str())
        .map(|id| UrlKind::Video { id })
        .ok_or_else(|| {
            ScoutError::InvalidInput(format!("No YouTube video id found in {}", url))
        })
}

/// Turns URLs into documents.
pub struct Fetcher {
    transcripts: Arc<dyn TranscriptSource>,
    pages: Arc<dyn PageLoader>,
}

impl Fetcher {
    pub fn new(transcripts: Arc<dyn TranscriptSource>, pages: Arc<dyn PageLoader>) -> Self {
        Self { transcripts, pages }
    }

    /// Fetcher backed by YouTube and plain HTTP.
    pub fn from_settings(settings: &FetchSettings) -> Result<Self> {
        Ok(Self::new(
            Arc::new(YoutubeTranscripts::new(settings)?),
            Arc::new(WebPageLoader::new(settings)?),
        ))
    }

    /// Fetch the document(s) behind `input`.
    ///
    /// An empty result means the page had no text; callers decide whether
    /// that is an error.
    #[instrument(skip(self))]
    pub async fn fetch(&self, input: &str) -> Result<Vec<Document>> {
        let url = validate_url(input)?;

        match classify_url(&url)? {
            UrlKind::Video { id } => {
                info!("Fetching transcript for video {}", id);
                let segments = self.transcripts.fetch(&id).await?;
                if segments.is_empty() {
                    return Err(ScoutError::TranscriptUnavailable(format!(
                        "Video {} has an empty transcript",
                        id
                    )));
                }

                let text = segments
                    .iter()
                    .map(|s| s.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");

                Ok(vec![Document {
                    text,
                    source_ref: url.to_string(),
                }])
            }
            UrlKind::WebPage => {
                info!("Loading page {}", url);
                self.pages.load(&url).await
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory fetch collaborators.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transcript source with a fixed outcome.
    pub struct FakeTranscripts {
        pub segments: Option<Vec<&'static str>>,
        pub calls: AtomicUsize,
    }

    impl FakeTranscripts {
        pub fn with(segments: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                segments: Some(segments),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn disabled() -> Arc<Self> {
            Arc::new(Self {
                segments: None,
                calls: AtomicUsize::new(0),
            })
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranscriptSource for FakeTranscripts {
        async fn fetch(&self, video_id: &str) -> Result<Vec<TranscriptSegment>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.segments {
                Some(segments) => Ok(segments
                    .iter()
                    .enumerate()
                    .map(|(i, text)| TranscriptSegment {
                        text: text.to_string(),
                        start: i as f64,
                        duration: 1.0,
                    })
                    .collect()),
                None => Err(ScoutError::TranscriptUnavailable(format!(
                    "Transcripts are disabled for video {}",
                    video_id
                ))),
            }
        }
    }

    /// Page loader returning fixed text (empty text means no document).
    pub struct FakePages {
        pub text: &'static str,
        pub calls: AtomicUsize,
    }

    impl FakePages {
        pub fn with(text: &'static str) -> Arc<Self> {
            Arc::new(Self {
                text,
                calls: AtomicUsize::new(0),
            })
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageLoader for FakePages {
        async fn load(&self, url: &Url) -> Result<Vec<Document>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.text.is_empty() {
                return Ok(Vec::new());
            }
            Ok(vec![Document {
                text: self.text.to_string(),
                source_ref: url.to_string(),
            }])
        }
    }
}
