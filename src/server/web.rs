// Web front-end: single-page UI plus the JSON API consumed by it.
//
// Download routes execute into per-request scratch space and return the
// finished file as an attachment; the saved-files routes expose the
// persistent download directory.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Body;
use axum::extract::{Path as UrlPath, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::downloader::models::{QualityRequest, SegmentRequest};
use crate::downloader::DownloaderService;

use super::agent::AgentServer;

#[derive(Clone)]
struct AppState {
    service: Arc<DownloaderService>,
    agent: AgentServer,
}

fn default_quality() -> String {
    "highest".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_audio_format() -> String {
    "mp3".to_string()
}

#[derive(Deserialize)]
struct InfoRequest {
    url: String,
}

#[derive(Deserialize)]
struct VideoRequest {
    url: String,
    #[serde(default = "default_quality")]
    quality: String,
}

#[derive(Deserialize)]
struct AudioRequest {
    url: String,
    #[serde(default = "default_quality")]
    quality: String,
    #[serde(default = "default_audio_format")]
    format: String,
}

#[derive(Deserialize)]
struct TranscriptRequest {
    url: String,
    #[serde(default = "default_language")]
    language: String,
}

#[derive(Deserialize)]
struct SegmentBody {
    url: String,
    start_time: f64,
    end_time: f64,
    #[serde(default = "default_quality")]
    quality: String,
}

pub fn router(service: Arc<DownloaderService>) -> Router {
    let state = AppState {
        agent: AgentServer::new(service.clone()),
        service,
    };

    Router::new()
        .route("/", get(index))
        .route("/api/video-info", post(video_info))
        .route("/api/download-video", post(download_video))
        .route("/api/download-audio", post(download_audio))
        .route("/api/download-transcript", post(download_transcript))
        .route("/api/download-video-segment", post(download_segment))
        .route("/api/downloads", get(list_downloads))
        .route("/api/downloads/{filename}", get(stream_download))
        .route("/mcp", post(mcp_endpoint))
        .with_state(state)
}

pub async fn serve(service: Arc<DownloaderService>) -> anyhow::Result<()> {
    let http = service.config().http.clone();
    let app = router(service);

    let addr = format!("{}:{}", http.host, http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    info!("Web server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running web server")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", err);
    }
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}

async fn video_info(State(state): State<AppState>, Json(req): Json<InfoRequest>) -> Response {
    if req.url.is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "No URL provided");
    }
    let envelope = state.service.video_info(&req.url).await;
    if envelope["status"] == "error" {
        let message = envelope["error"].as_str().unwrap_or("unknown error");
        return error_json(info_error_status(message), message);
    }
    Json(envelope).into_response()
}

/// The original front-end treats catalog-side rejections as client errors
/// and everything else as server errors.
fn info_error_status(message: &str) -> StatusCode {
    let lower = message.to_lowercase();
    let client_side = [
        "unavailable",
        "private",
        "deleted",
        "not found",
        "invalid",
        "restricted",
    ]
    .iter()
    .any(|kw| lower.contains(kw));
    if client_side {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

async fn download_video(State(state): State<AppState>, Json(req): Json<VideoRequest>) -> Response {
    let url = req.url.clone();
    run_attachment(&state, &url, "video/mp4", |service| async move {
        service.download_video(&req.url, &req.quality).await
    })
    .await
}

async fn download_audio(State(state): State<AppState>, Json(req): Json<AudioRequest>) -> Response {
    let url = req.url.clone();
    run_attachment(&state, &url, "audio/mpeg", |service| async move {
        service
            .download_audio(&req.url, &req.quality, &req.format)
            .await
    })
    .await
}

async fn download_transcript(
    State(state): State<AppState>,
    Json(req): Json<TranscriptRequest>,
) -> Response {
    let url = req.url.clone();
    run_attachment(
        &state,
        &url,
        "text/plain; charset=utf-8",
        |service| async move { service.download_transcript(&req.url, &req.language).await },
    )
    .await
}

async fn download_segment(State(state): State<AppState>, Json(req): Json<SegmentBody>) -> Response {
    if req.start_time >= req.end_time {
        return error_json(
            StatusCode::BAD_REQUEST,
            "Start time must be less than end time",
        );
    }
    let request = SegmentRequest {
        start_time: req.start_time,
        end_time: req.end_time,
        quality: QualityRequest::parse(&req.quality),
    };
    let url = req.url.clone();
    run_attachment(&state, &url, "video/mp4", |service| async move {
        service.download_segment(&req.url, &request).await
    })
    .await
}

async fn list_downloads(State(state): State<AppState>) -> Response {
    Json(state.service.list_downloads().await).into_response()
}

/// Stream a previously saved file out of the download directory.
async fn stream_download(
    State(state): State<AppState>,
    UrlPath(filename): UrlPath<String>,
) -> Response {
    if !is_plain_filename(&filename) {
        return error_json(StatusCode::BAD_REQUEST, "invalid filename");
    }

    let path = state.service.config().download_directory.join(&filename);
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(_) => return error_json(StatusCode::NOT_FOUND, "file not found"),
    };

    let stream = ReaderStream::new(file);
    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                content_type_for(Path::new(&filename)).to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

async fn mcp_endpoint(State(state): State<AppState>, Json(request): Json<Value>) -> Response {
    match state.agent.handle(request).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

// ── helpers ────────────────────────────────────────────────────────────

/// Run one façade operation in per-request scratch space and ship the
/// produced file back as an attachment. The whole file is read into
/// memory before the scratch directory is dropped.
async fn run_attachment<F, Fut>(
    state: &AppState,
    url: &str,
    content_type: &'static str,
    op: F,
) -> Response
where
    F: FnOnce(DownloaderService) -> Fut,
    Fut: std::future::Future<Output = Value>,
{
    if url.is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "No URL provided");
    }

    let scratch = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => return error_json(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    };

    let service = state.service.with_download_dir(scratch.path());
    let envelope = op(service).await;

    if envelope["status"] == "error" {
        let message = envelope["error"].as_str().unwrap_or("unknown error");
        return error_json(StatusCode::INTERNAL_SERVER_ERROR, message);
    }

    let Some(file_path) = envelope["file_path"].as_str() else {
        return error_json(StatusCode::INTERNAL_SERVER_ERROR, "no file produced");
    };
    let filename = Path::new(file_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());

    let bytes = match tokio::fs::read(file_path).await {
        Ok(bytes) => bytes,
        Err(err) => return error_json(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        Body::from(bytes),
    )
        .into_response()
}

fn error_json(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({"status": "error", "error": message})),
    )
        .into_response()
}

fn is_plain_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains('/')
        && !filename.contains('\\')
        && filename != "."
        && filename != ".."
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
        .as_str()
    {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_filename_guard() {
        assert!(is_plain_filename("video.mp4"));
        assert!(!is_plain_filename("../etc/passwd"));
        assert!(!is_plain_filename("a/b.mp4"));
        assert!(!is_plain_filename(".."));
        assert!(!is_plain_filename(""));
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for(Path::new("a.mp4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("a.MP3")), "audio/mpeg");
        assert_eq!(
            content_type_for(Path::new("a_transcript.txt")),
            "text/plain; charset=utf-8"
        );
        assert_eq!(content_type_for(Path::new("a")), "application/octet-stream");
    }

    #[test]
    fn test_info_error_status_mapping() {
        assert_eq!(
            info_error_status("Video unavailable: gone"),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            info_error_status("Could not extract video ID from URL: x"),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            info_error_status("Invalid YouTube URL"),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            info_error_status("ffmpeg exploded"),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
