// Common data models for download operations

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::DownloadError;

/// Track type of a stream descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
}

/// One downloadable track as reported by the catalog provider.
///
/// Immutable; built fresh per request and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Provider-side format id (e.g. "137", "140")
    pub id: String,
    pub kind: StreamKind,
    /// Resolution label for video tracks (e.g. "720p")
    pub resolution: Option<String>,
    /// Bitrate label for audio tracks (e.g. "128kbps")
    pub abr: Option<String>,
    /// Container extension (mp4, webm, m4a)
    pub ext: String,
    /// True when the track muxes both audio and video
    pub progressive: bool,
    /// Approximate size in bytes when the provider reports one
    pub filesize: Option<u64>,
    /// Frame rate for video tracks
    pub fps: Option<f32>,
}

impl StreamDescriptor {
    /// Numeric resolution for ordering ("720p" -> 720)
    pub fn resolution_value(&self) -> u32 {
        self.resolution
            .as_deref()
            .and_then(|r| r.trim_end_matches('p').parse().ok())
            .unwrap_or(0)
    }

    /// Numeric bitrate for ordering ("128kbps" -> 128)
    pub fn abr_value(&self) -> u32 {
        self.abr
            .as_deref()
            .and_then(|a| a.trim_end_matches("kbps").parse().ok())
            .unwrap_or(0)
    }
}

/// The set of streams the provider reports for one video at request time.
#[derive(Debug, Clone, Default)]
pub struct StreamCatalog {
    streams: Vec<StreamDescriptor>,
}

impl StreamCatalog {
    pub fn new(streams: Vec<StreamDescriptor>) -> Self {
        Self { streams }
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn streams(&self) -> &[StreamDescriptor] {
        &self.streams
    }

    /// Progressive stream at an exact resolution label
    pub fn progressive_at(&self, resolution: &str) -> Option<&StreamDescriptor> {
        self.streams.iter().find(|s| {
            s.progressive
                && s.kind == StreamKind::Video
                && s.resolution.as_deref() == Some(resolution)
        })
    }

    /// Adaptive (single-track) video streams with the given extension,
    /// ordered by resolution descending
    pub fn adaptive_videos(&self, ext: &str) -> Vec<&StreamDescriptor> {
        let mut found: Vec<&StreamDescriptor> = self
            .streams
            .iter()
            .filter(|s| s.kind == StreamKind::Video && !s.progressive && s.ext == ext)
            .collect();
        found.sort_by(|a, b| b.resolution_value().cmp(&a.resolution_value()));
        found
    }

    /// First adaptive video at an exact resolution label
    pub fn adaptive_video_at(&self, resolution: &str, ext: &str) -> Option<&StreamDescriptor> {
        self.adaptive_videos(ext)
            .into_iter()
            .find(|s| s.resolution.as_deref() == Some(resolution))
    }

    /// Best progressive stream by resolution
    pub fn best_progressive(&self) -> Option<&StreamDescriptor> {
        self.streams
            .iter()
            .filter(|s| s.progressive && s.kind == StreamKind::Video)
            .max_by_key(|s| s.resolution_value())
    }

    /// Best audio-only stream by bitrate
    pub fn best_audio_only(&self) -> Option<&StreamDescriptor> {
        self.streams
            .iter()
            .filter(|s| s.kind == StreamKind::Audio && !s.progressive)
            .max_by_key(|s| s.abr_value())
    }

    /// Audio-only stream at an exact bitrate (digits, "kbps" stripped)
    pub fn audio_at(&self, bitrate: &str) -> Option<&StreamDescriptor> {
        self.streams.iter().find(|s| {
            s.kind == StreamKind::Audio
                && !s.progressive
                && s.abr.as_deref().map(|a| a.trim_end_matches("kbps")) == Some(bitrate)
        })
    }

    /// Lowest available video resolution label, progressive or adaptive
    pub fn lowest_resolution(&self) -> Option<String> {
        self.streams
            .iter()
            .filter(|s| s.kind == StreamKind::Video && s.resolution.is_some())
            .min_by_key(|s| s.resolution_value())
            .and_then(|s| s.resolution.clone())
    }

    /// Sorted unique resolution labels, highest first
    pub fn video_quality_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self
            .streams
            .iter()
            .filter(|s| s.kind == StreamKind::Video)
            .filter_map(|s| s.resolution.clone())
            .collect();
        labels.sort_by_key(|l| {
            std::cmp::Reverse(l.trim_end_matches('p').parse::<u32>().unwrap_or(0))
        });
        labels.dedup();
        labels
    }

    /// Sorted unique audio bitrate labels, highest first
    pub fn audio_quality_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self
            .streams
            .iter()
            .filter(|s| s.kind == StreamKind::Audio && !s.progressive)
            .filter_map(|s| s.abr.clone())
            .collect();
        labels.sort_by_key(|l| {
            std::cmp::Reverse(l.trim_end_matches("kbps").parse::<u32>().unwrap_or(0))
        });
        labels.dedup();
        labels
    }
}

/// User-supplied quality specifier.
///
/// Closed vocabulary plus literal resolution/bitrate tokens; anything else
/// is carried through as a resolution token and resolved by the selection
/// fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualityRequest {
    Highest,
    High,
    Medium,
    Low,
    Resolution(String),
    Bitrate(String),
}

impl QualityRequest {
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim().to_lowercase();
        match value.as_str() {
            "highest" => Self::Highest,
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" | "lowest" => Self::Low,
            _ => {
                if value.ends_with("kbps") {
                    Self::Bitrate(value)
                } else {
                    Self::Resolution(value)
                }
            }
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Highest => "highest",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Resolution(r) => r,
            Self::Bitrate(b) => b,
        }
    }
}

/// The chosen download path: a single stream saved directly, or two
/// adaptive streams that must be merged. Recomputed per call, never stored.
#[derive(Debug, Clone)]
pub enum DownloadPlan {
    Direct(StreamDescriptor),
    Merge {
        video: StreamDescriptor,
        audio: StreamDescriptor,
    },
}

/// A time-bounded clip request.
#[derive(Debug, Clone)]
pub struct SegmentRequest {
    pub start_time: f64,
    pub end_time: f64,
    pub quality: QualityRequest,
}

impl SegmentRequest {
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.start_time < 0.0 {
            return Err(DownloadError::InvalidInput(
                "Start time cannot be negative".to_string(),
            ));
        }
        if self.start_time >= self.end_time {
            return Err(DownloadError::InvalidInput(
                "Start time must be less than end time".to_string(),
            ));
        }
        Ok(())
    }

    /// End time clamped to the actual video duration.
    pub fn clamped_end(&self, video_duration: f64) -> f64 {
        if self.end_time > video_duration {
            video_duration
        } else {
            self.end_time
        }
    }
}

/// One timed-text cue from the transcript provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Offset from the start of the video in seconds
    pub start: f64,
    pub text: String,
}

/// One transcript track the provider lists for a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionTrack {
    pub language_code: String,
    pub language_name: String,
    /// Timed-text payload URL (json3 format)
    pub url: String,
}

/// Video metadata resolved per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub author: String,
    pub duration_seconds: u64,
    pub views: u64,
    pub publish_date: Option<String>,
    pub thumbnail: String,
    pub url: String,
}

/// Everything one catalog fetch yields: metadata, the stream catalog, and
/// the transcript tracks on offer.
#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub info: VideoInfo,
    pub catalog: StreamCatalog,
    pub captions: Vec<CaptionTrack>,
}

/// Requested ordering for keyword search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrder {
    Relevance,
    Date,
    Views,
}

impl SearchOrder {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "date" => Self::Date,
            "views" => Self::Views,
            _ => Self::Relevance,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::Date => "date",
            Self::Views => "views",
        }
    }
}

/// One search result row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub duration: u64,
    pub author: String,
    pub views: u64,
}

/// Coarse lifecycle event for hosts that want progress reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub status: &'static str,
    pub message: String,
    pub progress: u8,
}

/// Injectable observer for lifecycle events. Optional; the pipeline works
/// identically without one.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;
