// Error types for download operations

use std::fmt;

#[derive(Debug)]
pub enum DownloadError {
    /// URL does not match any known video URL shape
    InvalidUrl(String),

    /// Caller-supplied parameters rejected before any network/tool call
    InvalidInput(String),

    /// Upstream reported the video as unavailable (sometimes recoverable
    /// with an alternate player client)
    VideoUnavailable(String),

    /// Catalog has no downloadable video streams
    NoVideoStreams,

    /// Merge plan chosen but the catalog has no audio-only track
    NoAudioStream,

    /// No transcript in the catalog, or captions disabled
    TranscriptUnavailable(String),

    /// Required external binary (yt-dlp, ffmpeg) is not installed
    ToolNotFound(String),

    /// External tool exited nonzero
    ToolFailed { tool: &'static str, detail: String },

    /// Failed to parse tool JSON output or a timed-text payload
    ParseError(String),

    /// Network-level failure (timeout, connection reset)
    Network(String),

    Io(std::io::Error),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl(url) => {
                write!(f, "Could not extract video ID from URL: {}", url)
            }
            Self::InvalidInput(msg) => write!(f, "{}", msg),
            Self::VideoUnavailable(msg) => write!(f, "Video unavailable: {}", msg),
            Self::NoVideoStreams => write!(f, "No downloadable video streams found."),
            Self::NoAudioStream => write!(f, "No audio stream found to merge."),
            Self::TranscriptUnavailable(msg) => write!(f, "{}", msg),
            Self::ToolNotFound(msg) => write!(f, "Tool not found: {}", msg),
            Self::ToolFailed { tool, detail } => write!(f, "{} failed: {}", tool, detail),
            Self::ParseError(msg) => write!(f, "Parse error: {}", msg),
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for DownloadError {}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl DownloadError {
    /// Whether the retry policy may re-attempt after this error.
    ///
    /// Bad input and missing binaries cannot heal on their own, and a
    /// catalog that is missing a track will still be missing it on the
    /// next fetch.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::VideoUnavailable(_)
                | Self::Network(_)
                | Self::ToolFailed { .. }
                | Self::ParseError(_)
        )
    }

    /// Classify yt-dlp stderr output into a structured error.
    pub fn classify_ytdlp(stderr: &str, url: &str) -> Self {
        let lower = stderr.to_lowercase();

        if lower.contains("is not a valid url") || lower.contains("unsupported url") {
            return Self::InvalidUrl(url.to_string());
        }

        if lower.contains("video unavailable")
            || lower.contains("private video")
            || lower.contains("this video is not available")
        {
            return Self::VideoUnavailable(stderr.trim().to_string());
        }

        if lower.contains("timed out") || lower.contains("timeout") {
            return Self::Network(stderr.trim().to_string());
        }

        Self::ToolFailed {
            tool: "yt-dlp",
            detail: stderr.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_invalid_url() {
        let err =
            DownloadError::classify_ytdlp("ERROR: 'htp://x' is not a valid URL", "htp://x");
        assert!(matches!(err, DownloadError::InvalidUrl(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_classify_unavailable_is_retryable() {
        let err = DownloadError::classify_ytdlp("ERROR: Video unavailable", "u");
        assert!(matches!(err, DownloadError::VideoUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_tool_not_found_never_retried() {
        let err = DownloadError::ToolNotFound("ffmpeg".to_string());
        assert!(!err.is_retryable());
    }
}
