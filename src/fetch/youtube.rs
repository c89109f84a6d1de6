//! YouTube video ids and transcripts.

use super::TranscriptSource;
use crate::config::FetchSettings;
use crate::error::{Result, ScoutError};
use crate::text::{collapse_whitespace, decode_entities};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, instrument};

const WATCH_URL: &str = "https://www.youtube.com/watch";

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Matches various YouTube URL formats and bare video IDs
        Regex::new(
            r"(?x)
            (?:
                # Full YouTube URLs
                (?:https?://)?
                (?:www\.|m\.|music\.)?
                (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/|youtube\.com/live/|youtube-nocookie\.com/embed/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            # Bare video ID (11 characters)
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex")
    })
}

fn timedtext_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<text start="([\d.]+)"(?: dur="([\d.]+)")?[^>]*>(.*?)</text>"#)
            .expect("Invalid regex")
    })
}

/// Extract the 11-character video id from a YouTube URL or bare id.
pub fn extract_video_id(input: &str) -> Option<String> {
    let caps = video_id_regex().captures(input.trim())?;

    // Try group 1 (URL format) then group 2 (bare ID)
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Whether a host serves YouTube videos.
pub fn is_youtube_host(host: &str) -> bool {
    let host = host.trim_start_matches("www.").to_ascii_lowercase();
    matches!(
        host.as_str(),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" | "youtu.be" | "youtube-nocookie.com"
    )
}

/// One timed piece of a transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
}

/// Caption track advertised by the watch page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    /// `"asr"` for auto-generated captions.
    #[serde(default)]
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Transcripts scraped from the public watch page's caption tracks.
pub struct YoutubeTranscripts {
    client: reqwest::Client,
    language: String,
}

impl YoutubeTranscripts {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            language: settings.transcript_language.clone(),
        })
    }
}

#[async_trait]
impl TranscriptSource for YoutubeTranscripts {
    #[instrument(skip(self))]
    async fn fetch(&self, video_id: &str) -> Result<Vec<TranscriptSegment>> {
        let page = self
            .client
            .get(WATCH_URL)
            .query(&[("v", video_id)])
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| ScoutError::Fetch(format!("Failed to load video page: {}", e)))?
            .error_for_status()?
            .text()
            .await?;

        let tracks = parse_caption_tracks(&page, video_id)?;
        let track = select_track(&tracks, &self.language).ok_or_else(|| {
            ScoutError::TranscriptUnavailable(format!("No transcript found for video {}", video_id))
        })?;

        debug!(
            "Using {} transcript ({})",
            track.language_code,
            if track.is_generated() { "generated" } else { "manual" }
        );

        let xml = self
            .client
            .get(&track.base_url)
            .send()
            .await
            .map_err(|e| ScoutError::Fetch(format!("Failed to load transcript: {}", e)))?
            .error_for_status()?
            .text()
            .await?;

        Ok(parse_timedtext(&xml))
    }
}

/// Read the caption track list embedded in a watch page.
fn parse_caption_tracks(page: &str, video_id: &str) -> Result<Vec<CaptionTrack>> {
    const MARKER: &str = "\"captionTracks\":";

    let Some(start) = page.find(MARKER) else {
        if page.contains("\"playabilityStatus\":{\"status\":\"ERROR\"") {
            return Err(ScoutError::TranscriptUnavailable(format!(
                "Video {} is unavailable",
                video_id
            )));
        }
        return Err(ScoutError::TranscriptUnavailable(format!(
            "Transcripts are disabled for video {}",
            video_id
        )));
    };

    // Deserialize just the array; the rest of the page is ignored.
    let rest = &page[start + MARKER.len()..];
    let tracks = serde_json::Deserializer::from_str(rest)
        .into_iter::<Vec<CaptionTrack>>()
        .next()
        .transpose()
        .map_err(|e| ScoutError::Fetch(format!("Malformed caption track list: {}", e)))?
        .unwrap_or_default();

    Ok(tracks)
}

/// Prefer a manual track in `language`, then a generated one, then anything.
fn select_track<'a>(tracks: &'a [CaptionTrack], language: &str) -> Option<&'a CaptionTrack> {
    let in_language = |t: &&CaptionTrack| t.language_code.eq_ignore_ascii_case(language);

    tracks
        .iter()
        .filter(in_language)
        .find(|t| !t.is_generated())
        .or_else(|| tracks.iter().find(in_language))
        .or_else(|| tracks.first())
}

/// Parse the timedtext XML format into segments, dropping empty ones.
fn parse_timedtext(xml: &str) -> Vec<TranscriptSegment> {
    timedtext_regex()
        .captures_iter(xml)
        .filter_map(|caps| {
            // Text is entity-encoded twice (XML, then HTML).
            let text = collapse_whitespace(&decode_entities(&decode_entities(&caps[3])));
            if text.is_empty() {
                return None;
            }
            Some(TranscriptSegment {
                text,
                start: caps[1].parse().unwrap_or(0.0),
                duration: caps
                    .get(2)
                    .and_then(|d| d.as_str().parse().ok())
                    .unwrap_or(0.0),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id() {
        // Test various URL formats
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(extract_video_id("dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".to_string()));

        // Test invalid inputs
        assert_eq!(extract_video_id("not-a-video-id"), None);
        assert_eq!(extract_video_id("https://example.com/articles/42"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn test_is_youtube_host() {
        assert!(is_youtube_host("www.youtube.com"));
        assert!(is_youtube_host("youtu.be"));
        assert!(is_youtube_host("M.YouTube.com"));
        assert!(!is_youtube_host("notyoutube.com"));
        assert!(!is_youtube_host("example.com"));
    }

    #[test]
    fn test_parse_caption_tracks() {
        let page = r#"var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=abc&lang=en","name":{"simpleText":"English (auto-generated)"},"languageCode":"en","kind":"asr"},{"baseUrl":"https://www.youtube.com/api/timedtext?v=abc&lang=de","languageCode":"de"}],"audioTracks":[]}}};"#;

        let tracks = parse_caption_tracks(page, "abc").unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].base_url, "https://www.youtube.com/api/timedtext?v=abc&lang=en");
        assert!(tracks[0].is_generated());
        assert!(!tracks[1].is_generated());
    }

    #[test]
    fn test_missing_captions_is_unavailable() {
        let err = parse_caption_tracks("<html>no captions here</html>", "abc").unwrap_err();
        assert!(matches!(err, ScoutError::TranscriptUnavailable(_)));
    }

    #[test]
    fn test_select_track_prefers_manual_in_language() {
        let track = |lang: &str, kind: Option<&str>| CaptionTrack {
            base_url: format!("https://example.com/{}", lang),
            language_code: lang.to_string(),
            kind: kind.map(str::to_string),
        };

        let tracks = vec![track("en", Some("asr")), track("de", None), track("en", None)];
        let chosen = select_track(&tracks, "en").unwrap();
        assert_eq!(chosen.language_code, "en");
        assert!(!chosen.is_generated());

        let tracks = vec![track("de", None), track("en", Some("asr"))];
        assert!(select_track(&tracks, "en").unwrap().is_generated());

        let tracks = vec![track("fr", None)];
        assert_eq!(select_track(&tracks, "en").unwrap().language_code, "fr");

        assert!(select_track(&[], "en").is_none());
    }

    #[test]
    fn test_parse_timedtext() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript>
            <text start="0.5" dur="2.1">We&amp;#39;re no strangers</text>
            <text start="2.6" dur="1.9">to
love</text>
            <text start="4.5" dur="0.5"></text>
            <text start="5.0">you know the rules &amp;amp; so do I</text>
        </transcript>"#;

        let segments = parse_timedtext(xml);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].text, "We're no strangers");
        assert_eq!(segments[0].start, 0.5);
        assert_eq!(segments[1].text, "to love");
        assert_eq!(segments[2].text, "you know the rules & so do I");
        assert_eq!(segments[2].duration, 0.0);
    }
}
