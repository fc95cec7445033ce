// Transcript handling: video-id extraction, language resolution,
// timed-text fetching, and file formatting

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use crate::config::TransportConfig;

use super::errors::DownloadError;
use super::models::{CaptionTrack, TranscriptEntry};

lazy_static! {
    // The four supported URL shapes, most common first.
    static ref ID_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"youtube\.com/watch\?v=([0-9A-Za-z_-]{11})").unwrap(),
        Regex::new(r"youtube\.com/embed/([0-9A-Za-z_-]{11})").unwrap(),
        Regex::new(r"youtu\.be/([0-9A-Za-z_-]{11})").unwrap(),
        Regex::new(r"youtube\.com/v/([0-9A-Za-z_-]{11})").unwrap(),
    ];
}

/// Pull the 11-character video id out of a URL.
pub fn extract_video_id(url: &str) -> Result<String, DownloadError> {
    for pattern in ID_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(url) {
            if let Some(id) = captures.get(1) {
                return Ok(id.as_str().to_string());
            }
        }
    }
    Err(DownloadError::InvalidUrl(url.to_string()))
}

/// Resolve the requested language against the provider's track list.
///
/// "auto" takes the first listed track. An exact code match wins
/// otherwise; when the code is missing the policy flag decides between
/// substituting the first available track (returning `true` for the
/// fallback marker) and failing.
pub fn resolve_track<'a>(
    tracks: &'a [CaptionTrack],
    language: &str,
    fallback_to_first: bool,
) -> Result<(&'a CaptionTrack, bool), DownloadError> {
    let first = tracks.first().ok_or_else(|| {
        DownloadError::TranscriptUnavailable(
            "Transcript not available for this video. This might be because:\n\
             - The video does not have captions\n\
             - The captions are disabled by the creator\n\
             - The video is private or restricted"
                .to_string(),
        )
    })?;

    if language == "auto" {
        return Ok((first, false));
    }

    if let Some(track) = tracks.iter().find(|t| t.language_code == language) {
        return Ok((track, false));
    }

    if fallback_to_first {
        warn!(
            "Transcript language '{}' not found, falling back to '{}'",
            language, first.language_code
        );
        Ok((first, true))
    } else {
        Err(DownloadError::TranscriptUnavailable(format!(
            "No transcript available in language '{}'",
            language
        )))
    }
}

/// Render entries as `[MM:SS] text` lines. Offsets are integer-divided
/// into minutes and seconds; there is no hours component.
pub fn format_entries(entries: &[TranscriptEntry]) -> String {
    let mut body = String::new();
    for entry in entries {
        let minutes = (entry.start as u64) / 60;
        let seconds = (entry.start as u64) % 60;
        body.push_str(&format!("[{:02}:{:02}] {}\n", minutes, seconds, entry.text));
    }
    body.trim_end().to_string()
}

/// Full transcript document: fixed header block, separator, body.
pub fn render_document(
    title: &str,
    url: &str,
    video_id: &str,
    track: &CaptionTrack,
    body: &str,
) -> String {
    format!(
        "Transcript for: {}\n\
         Video URL: {}\n\
         Video ID: {}\n\
         Language: {} ({})\n\
         Format: [MM:SS] Text with timestamps\n\
         {}\n\n\
         {}",
        title,
        url,
        video_id,
        track.language_code,
        track.language_name,
        "=".repeat(60),
        body
    )
}

/// External timed-text collaborator.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    async fn fetch_entries(
        &self,
        track: &CaptionTrack,
    ) -> Result<Vec<TranscriptEntry>, DownloadError>;
}

/// Fetches json3 timed-text payloads over HTTP. TLS behavior comes from
/// the injected transport configuration, never from process-global state.
pub struct TimedTextProvider {
    client: reqwest::Client,
}

impl TimedTextProvider {
    pub fn new(transport: &TransportConfig) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(transport.accept_invalid_certs)
            .timeout(std::time::Duration::from_secs(transport.timeout_seconds))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TranscriptProvider for TimedTextProvider {
    async fn fetch_entries(
        &self,
        track: &CaptionTrack,
    ) -> Result<Vec<TranscriptEntry>, DownloadError> {
        let payload: serde_json::Value = self
            .client
            .get(&track.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_json3(&payload)
    }
}

/// Parse a json3 timed-text payload into ordered entries.
pub fn parse_json3(payload: &serde_json::Value) -> Result<Vec<TranscriptEntry>, DownloadError> {
    let events = payload["events"]
        .as_array()
        .ok_or_else(|| DownloadError::ParseError("No events in timed-text payload".to_string()))?;

    let mut entries = Vec::new();
    for event in events {
        let Some(segs) = event["segs"].as_array() else {
            continue;
        };
        let text: String = segs
            .iter()
            .filter_map(|s| s["utf8"].as_str())
            .collect::<Vec<_>>()
            .join("")
            .replace('\n', " ")
            .trim()
            .to_string();
        if text.is_empty() {
            continue;
        }
        let start = event["tStartMs"].as_f64().unwrap_or(0.0) / 1000.0;
        entries.push(TranscriptEntry { start, text });
    }
    Ok(entries)
}
