// Tool façade: composes the selector, pipeline, and providers behind the
// operations all three front-ends (CLI, web, agent server) consume.
//
// Every operation returns the uniform result envelope:
//   {"status": "success" | "error", "error"?, ...operation fields}
// Errors never escape as panics; each top-level call is wrapped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::AppConfig;

use super::catalog::CatalogProvider;
use super::errors::DownloadError;
use super::models::{
    DownloadPlan, ProgressEvent, ProgressSink, QualityRequest, SearchOrder, SegmentRequest,
    VideoMetadata,
};
use super::pipeline::{format_timestamp, MediaPipeline};
use super::selector;
use super::transcript::{self, TranscriptProvider};
use super::utils::{safe_title, size_mb};

#[derive(Clone)]
pub struct DownloaderService {
    config: AppConfig,
    catalog: Arc<dyn CatalogProvider>,
    transcripts: Arc<dyn TranscriptProvider>,
    pipeline: MediaPipeline,
    progress: Option<ProgressSink>,
}

impl DownloaderService {
    pub fn new(
        config: AppConfig,
        catalog: Arc<dyn CatalogProvider>,
        transcripts: Arc<dyn TranscriptProvider>,
    ) -> Self {
        Self {
            config,
            catalog,
            transcripts,
            pipeline: MediaPipeline::new(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Same service writing into a different directory. Used by the web
    /// front-end to download into per-request scratch space.
    pub fn with_download_dir(&self, dir: &Path) -> Self {
        let mut clone = self.clone();
        clone.config.download_directory = dir.to_path_buf();
        clone
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn emit(&self, status: &'static str, message: String, progress: u8) {
        if let Some(sink) = &self.progress {
            sink(ProgressEvent {
                status,
                message,
                progress,
            });
        }
    }

    async fn ensure_output_dir(&self) -> Result<PathBuf, DownloadError> {
        let dir = self.config.download_directory.clone();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    // ── operations ─────────────────────────────────────────────────────

    pub async fn video_info(&self, url: &str) -> Value {
        self.wrap("Failed to get video information", self.try_video_info(url).await)
    }

    pub async fn download_video(&self, url: &str, quality: &str) -> Value {
        self.emit("starting", format!("Starting video download for: {}", url), 0);
        let result = self.try_download_video(url, quality).await;
        self.finish(
            "Failed to download video",
            result,
            "Video downloaded successfully",
        )
    }

    pub async fn download_audio(&self, url: &str, quality: &str, format: &str) -> Value {
        self.emit("starting", format!("Starting audio download for: {}", url), 0);
        let result = self.try_download_audio(url, quality, format).await;
        self.finish(
            "Failed to download audio",
            result,
            "Audio downloaded successfully",
        )
    }

    pub async fn download_transcript(&self, url: &str, language: &str) -> Value {
        self.emit(
            "starting",
            format!("Starting transcript download for: {}", url),
            0,
        );
        let result = self.try_download_transcript(url, language).await;
        self.finish(
            "Failed to download transcript",
            result,
            "Transcript downloaded successfully",
        )
    }

    pub async fn download_segment(&self, url: &str, request: &SegmentRequest) -> Value {
        self.emit(
            "starting",
            format!(
                "Starting video segment download: {}s to {}s",
                request.start_time, request.end_time
            ),
            0,
        );
        let result = self.try_download_segment(url, request).await;
        self.finish(
            "Failed to download video segment",
            result,
            "Video segment downloaded successfully",
        )
    }

    pub async fn list_downloads(&self) -> Value {
        self.wrap("Failed to list downloads", self.try_list_downloads().await)
    }

    pub async fn search_videos(&self, query: &str, sort_by: &str) -> Value {
        self.wrap(
            "Failed to search YouTube",
            self.try_search_videos(query, sort_by).await,
        )
    }

    /// Current configuration, as exposed through the agent get_config tool.
    pub fn config_snapshot(&self) -> Value {
        serde_json::to_value(&self.config).unwrap_or_else(|_| json!({}))
    }

    // ── envelope plumbing ──────────────────────────────────────────────

    fn wrap(&self, context: &str, result: Result<Value, DownloadError>) -> Value {
        match result {
            Ok(value) => value,
            Err(err) => {
                let message = format!("{}: {}", context, err);
                tracing::error!("{}", message);
                json!({"status": "error", "error": message})
            }
        }
    }

    fn finish(&self, context: &str, result: Result<Value, DownloadError>, done: &str) -> Value {
        match result {
            Ok(value) => {
                self.emit("completed", done.to_string(), 100);
                value
            }
            Err(err) => {
                let message = format!("{}: {}", context, err);
                tracing::error!("{}", message);
                self.emit("error", message.clone(), 0);
                json!({"status": "error", "error": message})
            }
        }
    }

    // ── implementations ────────────────────────────────────────────────

    async fn try_video_info(&self, url: &str) -> Result<Value, DownloadError> {
        info!("Getting video information...");
        let meta = self.catalog.fetch(url).await?;

        let mut video_qualities = vec!["highest".to_string()];
        video_qualities.extend(meta.catalog.video_quality_labels());
        video_qualities.push("lowest".to_string());

        let mut audio_qualities = vec!["highest".to_string()];
        audio_qualities.extend(meta.catalog.audio_quality_labels());
        audio_qualities.push("lowest".to_string());

        let video_streams: Vec<Value> = meta
            .catalog
            .streams()
            .iter()
            .filter(|s| s.kind == super::models::StreamKind::Video)
            .map(|s| {
                json!({
                    "resolution": s.resolution,
                    "fps": s.fps,
                    "file_size": s.filesize,
                    "progressive": s.progressive,
                })
            })
            .collect();
        let audio_streams: Vec<Value> = meta
            .catalog
            .streams()
            .iter()
            .filter(|s| s.kind == super::models::StreamKind::Audio && !s.progressive)
            .map(|s| json!({"abr": s.abr, "file_size": s.filesize}))
            .collect();

        Ok(json!({
            "status": "success",
            "title": meta.info.title,
            "author": meta.info.author,
            "duration": meta.info.duration_seconds,
            "views": meta.info.views,
            "publish_date": meta.info.publish_date,
            "thumbnail": meta.info.thumbnail,
            "video_qualities": video_qualities,
            "audio_qualities": audio_qualities,
            "video_streams": video_streams,
            "audio_streams": audio_streams,
        }))
    }

    async fn try_download_video(&self, url: &str, quality: &str) -> Result<Value, DownloadError> {
        let dir = self.ensure_output_dir().await?;
        info!("Downloading video from: {}", url);

        let (path, _meta) = self
            .fetch_and_download_video(url, &QualityRequest::parse(quality), &dir)
            .await?;

        self.emit("processing", "Processing downloaded file...".to_string(), 90);
        let bytes = tokio::fs::metadata(&path).await?.len();
        Ok(json!({
            "status": "success",
            "file_path": path,
            "file_size_mb": size_mb(bytes),
            "download_directory": dir,
        }))
    }

    /// Shared by the video and segment operations: fetch the catalog, pick
    /// a plan, and produce a finished file in `dir`.
    async fn fetch_and_download_video(
        &self,
        url: &str,
        quality: &QualityRequest,
        dir: &Path,
    ) -> Result<(PathBuf, VideoMetadata), DownloadError> {
        let meta = self.catalog.fetch(url).await?;
        info!(
            "Title: {} | Author: {} | Duration: {}s",
            meta.info.title, meta.info.author, meta.info.duration_seconds
        );

        let plan = selector::select_video(&meta.catalog, quality)?;
        let stem = safe_title(&meta.info.title);

        match plan {
            DownloadPlan::Direct(stream) => {
                info!(
                    "Downloading video in {} quality...",
                    stream.resolution.as_deref().unwrap_or("best")
                );
                let dest = dir.join(format!("{}.{}", stem, stream.ext));
                self.catalog.download_stream(url, &stream, &dest).await?;
                Ok((dest, meta))
            }
            DownloadPlan::Merge { video, audio } => {
                // Temporary prefixed parts; the final name is the video
                // part with the prefix stripped.
                let video_path = dir.join(format!("video_{}.{}", stem, video.ext));
                let audio_path = dir.join(format!("audio_{}.{}", stem, audio.ext));
                let output = dir.join(format!("{}.{}", stem, video.ext));

                info!(
                    "Downloading video: {} ({:.2}MB)",
                    video.resolution.as_deref().unwrap_or("?"),
                    video.filesize.unwrap_or(0) as f64 / 1e6
                );
                self.catalog.download_stream(url, &video, &video_path).await?;

                info!(
                    "Downloading audio: {} ({:.2}MB)",
                    audio.abr.as_deref().unwrap_or("?"),
                    audio.filesize.unwrap_or(0) as f64 / 1e6
                );
                self.catalog.download_stream(url, &audio, &audio_path).await?;

                self.pipeline.merge(&video_path, &audio_path, &output).await?;
                Ok((output, meta))
            }
        }
    }

    async fn try_download_audio(
        &self,
        url: &str,
        quality: &str,
        format: &str,
    ) -> Result<Value, DownloadError> {
        let dir = self.ensure_output_dir().await?;
        info!("Downloading audio from: {}", url);

        let meta = self.catalog.fetch(url).await?;
        let stream = selector::select_audio(&meta.catalog, &QualityRequest::parse(quality))?;
        let stem = safe_title(&meta.info.title);

        let raw_path = dir.join(format!("{}.{}", stem, stream.ext));
        self.catalog.download_stream(url, stream, &raw_path).await?;

        self.emit("processing", "Processing downloaded audio...".to_string(), 90);

        let final_path = dir.join(format!("{}.{}", stem, format));
        if raw_path == final_path {
            info!("Audio already in target container, skipping conversion");
        } else {
            info!("Converting {} to {}...", raw_path.display(), format);
            self.pipeline
                .convert_audio(&raw_path, &final_path, stream.abr.as_deref())
                .await?;
        }

        let bytes = tokio::fs::metadata(&final_path).await?.len();
        Ok(json!({
            "status": "success",
            "file_path": final_path,
            "file_size_mb": size_mb(bytes),
            "download_directory": dir,
            "format": format,
        }))
    }

    async fn try_download_transcript(
        &self,
        url: &str,
        language: &str,
    ) -> Result<Value, DownloadError> {
        let dir = self.ensure_output_dir().await?;
        info!("Downloading transcript from: {}", url);

        let video_id = transcript::extract_video_id(url)?;
        let meta = self.catalog.fetch(url).await?;

        let (track, fell_back) = transcript::resolve_track(
            &meta.captions,
            language,
            self.config.transcript.fallback_to_first,
        )?;
        info!(
            "Found transcript in {} ({})",
            track.language_code, track.language_name
        );

        self.emit("processing", "Processing transcript...".to_string(), 80);

        let entries = self.transcripts.fetch_entries(track).await?;
        if entries.is_empty() {
            return Err(DownloadError::TranscriptUnavailable(
                "Transcript track is empty".to_string(),
            ));
        }

        let body = transcript::format_entries(&entries);
        let document =
            transcript::render_document(&meta.info.title, url, &video_id, track, &body);

        let filename = format!("{}_transcript.txt", safe_title(&meta.info.title));
        let path = dir.join(filename);
        tokio::fs::write(&path, &document).await?;
        info!("Transcript saved successfully: {}", path.display());

        let bytes = tokio::fs::metadata(&path).await?.len();
        let mut envelope = json!({
            "status": "success",
            "file_path": path,
            "file_size_mb": size_mb(bytes),
            "download_directory": dir,
            "language": track.language_code,
            "transcript_content": document,
        });
        if fell_back {
            envelope["requested_language"] = json!(language);
        }
        Ok(envelope)
    }

    async fn try_download_segment(
        &self,
        url: &str,
        request: &SegmentRequest,
    ) -> Result<Value, DownloadError> {
        request.validate()?;
        let dir = self.ensure_output_dir().await?;

        let meta = self.catalog.fetch(url).await?;
        let duration = meta.info.duration_seconds as f64;
        let end_time = request.clamped_end(duration);
        if end_time < request.end_time {
            warn!(
                "End time ({}s) exceeds video duration ({}s). Using video duration.",
                request.end_time, duration
            );
        }
        info!(
            "Video duration: {}s, trimming from {}s to {}s",
            duration, request.start_time, end_time
        );

        // Full download happens in scratch space; only the clip lands in
        // the output directory.
        let scratch = tempfile::tempdir()?;
        let (full_path, _) = self
            .fetch_and_download_video(url, &request.quality, scratch.path())
            .await?;

        self.emit("processing", "Processing video segment...".to_string(), 90);

        let stem = safe_title(&meta.info.title);
        let start_tag = format_timestamp(request.start_time).replace(':', "-");
        let end_tag = format_timestamp(end_time).replace(':', "-");
        let output = dir.join(format!("{}_segment_{}_to_{}.mp4", stem, start_tag, end_tag));

        self.pipeline
            .trim(
                &full_path,
                request.start_time,
                end_time - request.start_time,
                &output,
            )
            .await?;

        let bytes = tokio::fs::metadata(&output).await?.len();
        Ok(json!({
            "status": "success",
            "file_path": output,
            "file_size_mb": size_mb(bytes),
            "download_directory": dir,
            "start_time": request.start_time,
            "end_time": end_time,
            "duration": end_time - request.start_time,
        }))
    }

    async fn try_list_downloads(&self) -> Result<Value, DownloadError> {
        let dir = &self.config.download_directory;
        if !dir.exists() {
            return Ok(json!({
                "status": "success",
                "files": [],
                "total_count": 0,
                "directory": dir,
            }));
        }

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);
            files.push((
                modified,
                json!({
                    "filename": entry.file_name().to_string_lossy(),
                    "file_path": entry.path(),
                    "size_mb": size_mb(metadata.len()),
                    "modified_time": modified,
                }),
            ));
        }

        // Newest first
        files.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        let files: Vec<Value> = files.into_iter().map(|(_, v)| v).collect();

        Ok(json!({
            "status": "success",
            "total_count": files.len(),
            "files": files,
            "directory": dir,
        }))
    }

    async fn try_search_videos(&self, query: &str, sort_by: &str) -> Result<Value, DownloadError> {
        let order = SearchOrder::parse(sort_by);
        info!("Searching YouTube for: {} (sort_by={})", query, order.as_str());

        let mut hits = self.catalog.search(query, 10, order).await?;
        if order == SearchOrder::Views {
            hits.sort_by(|a, b| b.views.cmp(&a.views));
        }

        Ok(json!({
            "status": "success",
            "query": query,
            "sort_by": order.as_str(),
            "count": hits.len(),
            "results": hits,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::downloader::models::{
        CaptionTrack, SearchHit, StreamCatalog, StreamDescriptor, StreamKind, TranscriptEntry,
        VideoInfo,
    };
    use async_trait::async_trait;

    struct FakeCatalog {
        meta: VideoMetadata,
    }

    #[async_trait]
    impl CatalogProvider for FakeCatalog {
        async fn fetch(&self, _url: &str) -> Result<VideoMetadata, DownloadError> {
            Ok(self.meta.clone())
        }

        async fn download_stream(
            &self,
            _url: &str,
            _stream: &StreamDescriptor,
            dest: &Path,
        ) -> Result<(), DownloadError> {
            tokio::fs::write(dest, b"media-bytes").await?;
            Ok(())
        }

        async fn search(
            &self,
            query: &str,
            _limit: usize,
            _order: SearchOrder,
        ) -> Result<Vec<SearchHit>, DownloadError> {
            Ok(vec![
                SearchHit {
                    title: format!("{} result one", query),
                    url: "https://www.youtube.com/watch?v=aaaaaaaaaaa".to_string(),
                    duration: 60,
                    author: "Channel A".to_string(),
                    views: 10,
                },
                SearchHit {
                    title: format!("{} result two", query),
                    url: "https://www.youtube.com/watch?v=bbbbbbbbbbb".to_string(),
                    duration: 120,
                    author: "Channel B".to_string(),
                    views: 500,
                },
            ])
        }
    }

    struct FakeTranscripts {
        entries: Vec<TranscriptEntry>,
    }

    #[async_trait]
    impl TranscriptProvider for FakeTranscripts {
        async fn fetch_entries(
            &self,
            _track: &CaptionTrack,
        ) -> Result<Vec<TranscriptEntry>, DownloadError> {
            Ok(self.entries.clone())
        }
    }

    fn sample_meta() -> VideoMetadata {
        VideoMetadata {
            info: VideoInfo {
                id: "PDKhUknuQDg".to_string(),
                title: "Sample Video".to_string(),
                author: "Sample Channel".to_string(),
                duration_seconds: 300,
                views: 1000,
                publish_date: Some("2024-01-31".to_string()),
                thumbnail: String::new(),
                url: "https://www.youtube.com/watch?v=PDKhUknuQDg".to_string(),
            },
            catalog: StreamCatalog::new(vec![
                StreamDescriptor {
                    id: "22".to_string(),
                    kind: StreamKind::Video,
                    resolution: Some("720p".to_string()),
                    abr: None,
                    ext: "mp4".to_string(),
                    progressive: true,
                    filesize: Some(5_000_000),
                    fps: Some(30.0),
                },
                StreamDescriptor {
                    id: "140".to_string(),
                    kind: StreamKind::Audio,
                    resolution: None,
                    abr: Some("128kbps".to_string()),
                    ext: "m4a".to_string(),
                    progressive: false,
                    filesize: Some(500_000),
                    fps: None,
                },
            ]),
            captions: vec![
                CaptionTrack {
                    language_code: "en".to_string(),
                    language_name: "English".to_string(),
                    url: "https://example.com/en.json3".to_string(),
                },
                CaptionTrack {
                    language_code: "es".to_string(),
                    language_name: "Spanish".to_string(),
                    url: "https://example.com/es.json3".to_string(),
                },
            ],
        }
    }

    fn service_in(dir: &Path) -> DownloaderService {
        let config = AppConfig::default().with_download_directory(dir.to_path_buf());
        DownloaderService::new(
            config,
            Arc::new(FakeCatalog { meta: sample_meta() }),
            Arc::new(FakeTranscripts {
                entries: vec![
                    TranscriptEntry {
                        start: 9.0,
                        text: "hello".to_string(),
                    },
                    TranscriptEntry {
                        start: 15.0,
                        text: "world".to_string(),
                    },
                ],
            }),
        )
    }

    #[tokio::test]
    async fn test_video_info_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let envelope = service_in(dir.path())
            .video_info("https://youtu.be/PDKhUknuQDg")
            .await;
        assert_eq!(envelope["status"], "success");
        assert_eq!(envelope["title"], "Sample Video");
        assert_eq!(envelope["duration"], 300);
        assert_eq!(envelope["video_qualities"][0], "highest");
    }

    #[tokio::test]
    async fn test_download_video_direct_plan() {
        let dir = tempfile::tempdir().unwrap();
        let envelope = service_in(dir.path())
            .download_video("https://youtu.be/PDKhUknuQDg", "720p")
            .await;
        assert_eq!(envelope["status"], "success");
        let path = PathBuf::from(envelope["file_path"].as_str().unwrap());
        assert!(path.exists());
        assert_eq!(path.file_name().unwrap(), "Sample-Video.mp4");
    }

    #[tokio::test]
    async fn test_download_audio_m4a_passthrough() {
        // Target container matches the raw stream: no conversion step.
        let dir = tempfile::tempdir().unwrap();
        let envelope = service_in(dir.path())
            .download_audio("https://youtu.be/PDKhUknuQDg", "highest", "m4a")
            .await;
        assert_eq!(envelope["status"], "success");
        assert_eq!(envelope["format"], "m4a");
        let path = PathBuf::from(envelope["file_path"].as_str().unwrap());
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "m4a");
    }

    #[tokio::test]
    async fn test_download_audio_conversion_degrades_to_rename() {
        // The fake "stream" is not real media, so ffmpeg either fails or
        // is missing; both degrade to a rename and still succeed.
        let dir = tempfile::tempdir().unwrap();
        let envelope = service_in(dir.path())
            .download_audio("https://youtu.be/PDKhUknuQDg", "highest", "mp3")
            .await;
        assert_eq!(envelope["status"], "success");
        let path = PathBuf::from(envelope["file_path"].as_str().unwrap());
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "mp3");
    }

    #[tokio::test]
    async fn test_download_transcript_writes_header_file() {
        let dir = tempfile::tempdir().unwrap();
        let envelope = service_in(dir.path())
            .download_transcript("https://youtu.be/PDKhUknuQDg", "en")
            .await;
        assert_eq!(envelope["status"], "success");
        assert_eq!(envelope["language"], "en");
        assert!(envelope.get("requested_language").is_none());

        let path = PathBuf::from(envelope["file_path"].as_str().unwrap());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Transcript for: Sample Video\n"));
        assert!(content.contains("Video ID: PDKhUknuQDg"));
        assert!(content.contains("[00:09] hello"));
        assert!(content.contains("[00:15] world"));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("_transcript.txt"));
    }

    #[tokio::test]
    async fn test_transcript_unsupported_language_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let envelope = service_in(dir.path())
            .download_transcript("https://youtu.be/PDKhUknuQDg", "xx")
            .await;
        // Fallback must fire; the resolved language is whatever the
        // provider listed first.
        assert_eq!(envelope["status"], "success");
        assert_eq!(envelope["requested_language"], "xx");
        assert!(envelope["language"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_transcript_invalid_url_is_error_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let envelope = service_in(dir.path())
            .download_transcript("https://example.com/nope", "en")
            .await;
        assert_eq!(envelope["status"], "error");
        assert!(envelope["error"]
            .as_str()
            .unwrap()
            .contains("Could not extract video ID"));
    }

    #[tokio::test]
    async fn test_segment_rejects_bad_time_range() {
        let dir = tempfile::tempdir().unwrap();
        let request = SegmentRequest {
            start_time: 100.0,
            end_time: 50.0,
            quality: QualityRequest::Highest,
        };
        let envelope = service_in(dir.path())
            .download_segment("https://youtu.be/PDKhUknuQDg", &request)
            .await;
        assert_eq!(envelope["status"], "error");
        assert!(envelope["error"]
            .as_str()
            .unwrap()
            .contains("Start time must be less than end time"));
    }

    #[tokio::test]
    async fn test_list_downloads_sorted_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());

        std::fs::write(dir.path().join("older.mp4"), b"a").unwrap();
        let envelope = service.list_downloads().await;
        assert_eq!(envelope["total_count"], 1);
        assert_eq!(envelope["files"][0]["filename"], "older.mp4");
        assert_eq!(envelope["directory"], json!(dir.path()));
    }

    #[tokio::test]
    async fn test_list_downloads_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let service = service_in(&missing);
        let envelope = service.list_downloads().await;
        assert_eq!(envelope["status"], "success");
        assert_eq!(envelope["total_count"], 0);
    }

    #[tokio::test]
    async fn test_search_sorted_by_views() {
        let dir = tempfile::tempdir().unwrap();
        let envelope = service_in(dir.path()).search_videos("rust", "views").await;
        assert_eq!(envelope["status"], "success");
        assert_eq!(envelope["count"], 2);
        assert_eq!(envelope["results"][0]["views"], 500);
    }
}
