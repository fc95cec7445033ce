// Stream catalog provider backed by the yt-dlp extraction tool

use std::path::Path;

use async_trait::async_trait;
use time::macros::format_description;
use tracing::{debug, info, warn};

use crate::retry::RetryPolicy;

use super::errors::DownloadError;
use super::models::{
    CaptionTrack, SearchHit, SearchOrder, StreamCatalog, StreamDescriptor, StreamKind,
    VideoInfo, VideoMetadata,
};
use super::tools::{find_tool, ToolKind};
use super::utils::run_output_with_timeout;

/// External stream-catalog collaborator: lists available tracks, downloads
/// a chosen track, and answers keyword searches.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch metadata, the stream catalog, and transcript tracks for a URL.
    async fn fetch(&self, url: &str) -> Result<VideoMetadata, DownloadError>;

    /// Download one stream to the exact destination path.
    async fn download_stream(
        &self,
        url: &str,
        stream: &StreamDescriptor,
        dest: &Path,
    ) -> Result<(), DownloadError>;

    /// Keyword search. `Date` ordering is handled by the provider; other
    /// orderings are applied by the caller.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        order: SearchOrder,
    ) -> Result<Vec<SearchHit>, DownloadError>;
}

/// Production provider shelling out to the yt-dlp binary.
pub struct YtdlpCatalog {
    binary: String,
    retry: RetryPolicy,
    fetch_timeout_secs: u64,
    download_timeout_secs: u64,
}

impl YtdlpCatalog {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            binary: find_tool(ToolKind::YtDlp),
            retry,
            fetch_timeout_secs: 60,
            download_timeout_secs: 3600,
        }
    }

    async fn run(
        &self,
        args: Vec<String>,
        timeout_secs: u64,
        url: &str,
    ) -> Result<Vec<u8>, DownloadError> {
        let output = run_output_with_timeout(&self.binary, args, timeout_secs)
            .await
            .map_err(|e| {
                if e.contains("Failed to start") {
                    DownloadError::ToolNotFound(ToolKind::YtDlp.install_hint().to_string())
                } else {
                    DownloadError::Network(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::classify_ytdlp(&stderr, url));
        }
        Ok(output.stdout)
    }

    async fn fetch_with_client(
        &self,
        url: &str,
        player_client: Option<&str>,
    ) -> Result<VideoMetadata, DownloadError> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            "15".to_string(),
        ];
        if let Some(client) = player_client {
            args.push("--extractor-args".to_string());
            args.push(format!("youtube:player_client={}", client));
        }
        args.push(url.to_string());

        debug!("Fetching catalog: {} {}", self.binary, args.join(" "));
        let stdout = self.run(args, self.fetch_timeout_secs, url).await?;
        parse_metadata(&stdout)
    }

    /// One attempt = default client, with a single alternate-client pass
    /// when the default reports the video unavailable.
    async fn fetch_once(&self, url: &str) -> Result<VideoMetadata, DownloadError> {
        match self.fetch_with_client(url, None).await {
            Err(DownloadError::VideoUnavailable(msg)) => {
                warn!("Video unavailable, trying TV client... ({})", msg);
                self.fetch_with_client(url, Some("tv")).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl CatalogProvider for YtdlpCatalog {
    async fn fetch(&self, url: &str) -> Result<VideoMetadata, DownloadError> {
        self.retry
            .run(|| self.fetch_once(url), |e| !e.is_retryable())
            .await
    }

    async fn download_stream(
        &self,
        url: &str,
        stream: &StreamDescriptor,
        dest: &Path,
    ) -> Result<(), DownloadError> {
        info!(
            "Downloading stream {} ({}) -> {}",
            stream.id,
            stream
                .resolution
                .as_deref()
                .or(stream.abr.as_deref())
                .unwrap_or("?"),
            dest.display()
        );

        let args = vec![
            "-f".to_string(),
            stream.id.clone(),
            "-o".to_string(),
            dest.to_string_lossy().into_owned(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            url.to_string(),
        ];

        self.run(args, self.download_timeout_secs, url).await?;
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        order: SearchOrder,
    ) -> Result<Vec<SearchHit>, DownloadError> {
        let prefix = match order {
            SearchOrder::Date => "ytsearchdate",
            _ => "ytsearch",
        };
        let args = vec![
            format!("{}{}:{}", prefix, limit, query),
            "--dump-json".to_string(),
            "--flat-playlist".to_string(),
            "--no-warnings".to_string(),
        ];

        let stdout = self.run(args, self.fetch_timeout_secs, query).await?;
        let text = String::from_utf8_lossy(&stdout);

        let mut hits = Vec::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let json: serde_json::Value = serde_json::from_str(line)
                .map_err(|e| DownloadError::ParseError(format!("Invalid search JSON: {}", e)))?;
            let id = json["id"].as_str().unwrap_or("").to_string();
            let url = json["url"]
                .as_str()
                .map(|u| u.to_string())
                .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", id));
            hits.push(SearchHit {
                title: json["title"].as_str().unwrap_or("Unknown").to_string(),
                url,
                duration: json["duration"].as_f64().unwrap_or(0.0) as u64,
                author: json["uploader"]
                    .as_str()
                    .or_else(|| json["channel"].as_str())
                    .unwrap_or("Unknown")
                    .to_string(),
                views: json["view_count"].as_u64().unwrap_or(0),
            });
        }
        Ok(hits)
    }
}

/// Parse a yt-dlp `--dump-json` payload into metadata + catalog + captions.
pub fn parse_metadata(stdout: &[u8]) -> Result<VideoMetadata, DownloadError> {
    let json_str = String::from_utf8_lossy(stdout);
    let json: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {}", e)))?;

    let info = VideoInfo {
        id: json["id"].as_str().unwrap_or("unknown").to_string(),
        title: json["title"].as_str().unwrap_or("Unknown").to_string(),
        author: json["uploader"].as_str().unwrap_or("Unknown").to_string(),
        duration_seconds: json["duration"].as_f64().unwrap_or(0.0) as u64,
        views: json["view_count"].as_u64().unwrap_or(0),
        publish_date: json["upload_date"].as_str().and_then(normalize_date),
        thumbnail: json["thumbnail"].as_str().unwrap_or("").to_string(),
        url: json["webpage_url"].as_str().unwrap_or("").to_string(),
    };

    let catalog = parse_formats(&json);
    let captions = parse_captions(&json);

    Ok(VideoMetadata {
        info,
        catalog,
        captions,
    })
}

fn parse_formats(json: &serde_json::Value) -> StreamCatalog {
    let mut streams = Vec::new();

    if let Some(formats) = json["formats"].as_array() {
        for f in formats {
            let vcodec = f["vcodec"].as_str().unwrap_or("none");
            let acodec = f["acodec"].as_str().unwrap_or("none");
            let has_video = vcodec != "none" && !vcodec.is_empty();
            let has_audio = acodec != "none" && !acodec.is_empty();

            let kind = if has_video {
                StreamKind::Video
            } else if has_audio {
                StreamKind::Audio
            } else {
                continue; // storyboards and other non-media entries
            };

            streams.push(StreamDescriptor {
                id: f["format_id"].as_str().unwrap_or("").to_string(),
                kind,
                resolution: f["height"].as_u64().map(|h| format!("{}p", h)),
                abr: f["abr"]
                    .as_f64()
                    .filter(|a| *a > 0.0)
                    .map(|a| format!("{}kbps", a.round() as u64)),
                ext: f["ext"].as_str().unwrap_or("").to_string(),
                progressive: has_video && has_audio,
                filesize: f["filesize"].as_u64().or(f["filesize_approx"].as_u64()),
                fps: f["fps"].as_f64().map(|fps| fps as f32),
            });
        }
    }

    StreamCatalog::new(streams)
}

/// Collect transcript tracks: manual subtitles first, then automatic
/// captions for languages not already covered. json3 payloads preferred.
fn parse_captions(json: &serde_json::Value) -> Vec<CaptionTrack> {
    let mut tracks = Vec::new();
    collect_caption_map(&json["subtitles"], &mut tracks);
    collect_caption_map(&json["automatic_captions"], &mut tracks);
    tracks
}

fn collect_caption_map(map: &serde_json::Value, tracks: &mut Vec<CaptionTrack>) {
    let Some(languages) = map.as_object() else {
        return;
    };
    for (code, variants) in languages {
        if tracks.iter().any(|t| &t.language_code == code) {
            continue;
        }
        let Some(variants) = variants.as_array() else {
            continue;
        };
        let chosen = variants
            .iter()
            .find(|v| v["ext"].as_str() == Some("json3"))
            .or_else(|| variants.first());
        if let Some(variant) = chosen {
            if let Some(url) = variant["url"].as_str() {
                tracks.push(CaptionTrack {
                    language_code: code.clone(),
                    language_name: variant["name"].as_str().unwrap_or(code).to_string(),
                    url: url.to_string(),
                });
            }
        }
    }
}

/// "20240131" -> "2024-01-31"
fn normalize_date(raw: &str) -> Option<String> {
    let format = format_description!("[year][month][day]");
    time::Date::parse(raw, format).ok().map(|d| d.to_string())
}
