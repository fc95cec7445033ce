// Agent-tool server: JSON-RPC 2.0 dispatch shared by the stdio transport
// and the web router's /mcp endpoint.
//
// Methods: initialize, tools/list, tools/call. Tool results are wrapped
// as {"content":[{"type":"text","text":...}]} with the façade's envelope
// serialized into the text field.

use std::sync::Arc;

use anyhow::Context;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use crate::downloader::models::SegmentRequest;
use crate::downloader::QualityRequest;
use crate::downloader::DownloaderService;

pub const PROTOCOL_VERSION: &str = "2025-06-18";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Clone)]
pub struct AgentServer {
    service: Arc<DownloaderService>,
}

impl AgentServer {
    pub fn new(service: Arc<DownloaderService>) -> Self {
        Self { service }
    }

    /// Handle one JSON-RPC request. Notifications (no id) get no response.
    pub async fn handle(&self, request: Value) -> Option<Value> {
        let id = request.get("id").cloned();
        let method = request["method"].as_str().unwrap_or("");

        if id.is_none() {
            // notifications/initialized and friends
            return None;
        }
        let id = id.unwrap();

        match method {
            "initialize" => Some(rpc_result(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {"tools": {}},
                    "serverInfo": {
                        "name": "vidsnatch",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            )),
            "tools/list" => Some(rpc_result(id, json!({"tools": tool_definitions()}))),
            "tools/call" => Some(self.handle_tool_call(id, &request["params"]).await),
            "ping" => Some(rpc_result(id, json!({}))),
            other => Some(rpc_error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )),
        }
    }

    async fn handle_tool_call(&self, id: Value, params: &Value) -> Value {
        let Some(name) = params["name"].as_str() else {
            return rpc_error(id, INVALID_PARAMS, "Missing tool name".to_string());
        };
        let args = &params["arguments"];

        match self.call_tool(name, args).await {
            Ok(envelope) => {
                let text = serde_json::to_string_pretty(&envelope)
                    .unwrap_or_else(|_| envelope.to_string());
                rpc_result(id, json!({"content": [{"type": "text", "text": text}]}))
            }
            Err(ToolCallError::UnknownTool) => rpc_error(
                id,
                INVALID_PARAMS,
                format!("Unknown tool: {}", name),
            ),
            Err(ToolCallError::BadArguments(msg)) => rpc_error(id, INVALID_PARAMS, msg),
        }
    }

    async fn call_tool(&self, name: &str, args: &Value) -> Result<Value, ToolCallError> {
        let envelope = match name {
            "get_video_info" => self.service.video_info(required_str(args, "url")?).await,
            "download_video" => {
                // An explicit resolution overrides the quality preference.
                let quality = args["resolution"]
                    .as_str()
                    .or_else(|| args["quality"].as_str())
                    .unwrap_or("highest");
                self.service.download_video(required_str(args, "url")?, quality).await
            }
            "download_audio" => {
                let quality = args["quality"].as_str().unwrap_or("highest");
                let format = args["format"].as_str().unwrap_or("mp3");
                self.service.download_audio(required_str(args, "url")?, quality, format).await
            }
            "download_transcript" => {
                let language = args["language"].as_str().unwrap_or("en");
                self.service.download_transcript(required_str(args, "url")?, language).await
            }
            "download_video_segment" => {
                let start_time = args["start_time"].as_f64().ok_or_else(|| {
                    ToolCallError::BadArguments("Missing 'start_time' argument".to_string())
                })?;
                let end_time = args["end_time"].as_f64().ok_or_else(|| {
                    ToolCallError::BadArguments("Missing 'end_time' argument".to_string())
                })?;
                let request = SegmentRequest {
                    start_time,
                    end_time,
                    quality: QualityRequest::parse(
                        args["quality"].as_str().unwrap_or("highest"),
                    ),
                };
                self.service.download_segment(required_str(args, "url")?, &request).await
            }
            "list_downloads" => self.service.list_downloads().await,
            "search_videos" => {
                let query = args["query"].as_str().ok_or_else(|| {
                    ToolCallError::BadArguments("Missing 'query' argument".to_string())
                })?;
                let sort_by = args["sort_by"].as_str().unwrap_or("relevance");
                self.service.search_videos(query, sort_by).await
            }
            "get_config" => self.service.config_snapshot(),
            _ => return Err(ToolCallError::UnknownTool),
        };

        Ok(envelope)
    }

    /// One request per line on stdin, one response per line on stdout.
    /// Logging goes to stderr so stdout stays protocol-clean.
    pub async fn run_stdio(&self) -> anyhow::Result<()> {
        info!("Agent-tool server listening on stdio");

        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await.context("reading stdin")? {
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<Value>(&line) {
                Ok(request) => self.handle(request).await,
                Err(err) => Some(rpc_error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {}", err),
                )),
            };

            if let Some(response) = response {
                let serialized =
                    serde_json::to_string(&response).context("serializing response")?;
                stdout.write_all(serialized.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        Ok(())
    }
}

enum ToolCallError {
    UnknownTool,
    BadArguments(String),
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolCallError> {
    args[key]
        .as_str()
        .ok_or_else(|| ToolCallError::BadArguments(format!("Missing '{}' argument", key)))
}

fn rpc_result(id: Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn rpc_error(id: Value, code: i64, message: String) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
}

/// The eight tools exposed to agent hosts.
pub fn tool_definitions() -> Value {
    json!([
        {
            "name": "get_video_info",
            "description": "Get detailed information about a YouTube video including title, duration, and available formats.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "YouTube video URL"}
                },
                "required": ["url"]
            }
        },
        {
            "name": "download_video",
            "description": "Download a YouTube video to the configured download directory.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "YouTube video URL"},
                    "quality": {"type": "string", "description": "Video quality preference", "default": "highest"},
                    "resolution": {"type": "string", "description": "Specific resolution such as 720p (overrides quality)"}
                },
                "required": ["url"]
            }
        },
        {
            "name": "download_audio",
            "description": "Download audio from a YouTube video.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "YouTube video URL"},
                    "quality": {"type": "string", "description": "Audio quality preference", "default": "highest"},
                    "format": {"type": "string", "description": "Audio format (mp3, m4a, wav)", "default": "mp3"}
                },
                "required": ["url"]
            }
        },
        {
            "name": "download_transcript",
            "description": "Download a timestamped transcript. Essential for locating topics before clipping a segment: find the [MM:SS] timestamps first, then call download_video_segment.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "YouTube video URL"},
                    "language": {"type": "string", "description": "Language code (e.g. en, es, fr) or 'auto'", "default": "en"}
                },
                "required": ["url"]
            }
        },
        {
            "name": "download_video_segment",
            "description": "Download a precise time-bounded clip. Use download_transcript first to find the start and end timestamps of the topic.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "YouTube video URL"},
                    "start_time": {"type": "number", "description": "Start time in seconds"},
                    "end_time": {"type": "number", "description": "End time in seconds"},
                    "quality": {"type": "string", "description": "Video quality preference", "default": "highest"}
                },
                "required": ["url", "start_time", "end_time"]
            }
        },
        {
            "name": "list_downloads",
            "description": "List all files in the download directory, newest first.",
            "inputSchema": {"type": "object", "properties": {}}
        },
        {
            "name": "search_videos",
            "description": "Search YouTube for videos matching a query. Returns up to 10 results whose URLs feed directly into the other tools.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search query string"},
                    "sort_by": {
                        "type": "string",
                        "description": "Sort order",
                        "default": "relevance",
                        "enum": ["relevance", "date", "views"]
                    }
                },
                "required": ["query"]
            }
        },
        {
            "name": "get_config",
            "description": "Get the current server configuration.",
            "inputSchema": {"type": "object", "properties": {}}
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::downloader::catalog::CatalogProvider;
    use crate::downloader::errors::DownloadError;
    use crate::downloader::models::{
        CaptionTrack, SearchHit, SearchOrder, StreamCatalog, StreamDescriptor, TranscriptEntry,
        VideoInfo, VideoMetadata,
    };
    use crate::downloader::transcript::TranscriptProvider;
    use async_trait::async_trait;
    use std::path::Path;

    struct StubCatalog;

    #[async_trait]
    impl CatalogProvider for StubCatalog {
        async fn fetch(&self, _url: &str) -> Result<VideoMetadata, DownloadError> {
            Ok(VideoMetadata {
                info: VideoInfo {
                    id: "PDKhUknuQDg".to_string(),
                    title: "Stub".to_string(),
                    author: "Stub".to_string(),
                    duration_seconds: 10,
                    views: 1,
                    publish_date: None,
                    thumbnail: String::new(),
                    url: String::new(),
                },
                catalog: StreamCatalog::default(),
                captions: Vec::new(),
            })
        }

        async fn download_stream(
            &self,
            _url: &str,
            _stream: &StreamDescriptor,
            _dest: &Path,
        ) -> Result<(), DownloadError> {
            Ok(())
        }

        async fn search(
            &self,
            _query: &str,
            _limit: usize,
            _order: SearchOrder,
        ) -> Result<Vec<SearchHit>, DownloadError> {
            Ok(Vec::new())
        }
    }

    struct StubTranscripts;

    #[async_trait]
    impl TranscriptProvider for StubTranscripts {
        async fn fetch_entries(
            &self,
            _track: &CaptionTrack,
        ) -> Result<Vec<TranscriptEntry>, DownloadError> {
            Ok(Vec::new())
        }
    }

    fn server(dir: &Path) -> AgentServer {
        let config = AppConfig::default().with_download_directory(dir.to_path_buf());
        let service =
            DownloaderService::new(config, Arc::new(StubCatalog), Arc::new(StubTranscripts));
        AgentServer::new(Arc::new(service))
    }

    #[tokio::test]
    async fn test_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let response = server(dir.path())
            .handle(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}))
            .await
            .unwrap();
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], "vidsnatch");
    }

    #[tokio::test]
    async fn test_tools_list_has_eight_tools() {
        let dir = tempfile::tempdir().unwrap();
        let response = server(dir.path())
            .handle(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}))
            .await
            .unwrap();
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 8);
        assert!(tools.iter().any(|t| t["name"] == "download_video_segment"));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let dir = tempfile::tempdir().unwrap();
        let response = server(dir.path())
            .handle(json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"}))
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let dir = tempfile::tempdir().unwrap();
        let response = server(dir.path())
            .handle(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_tool_call_missing_name() {
        let dir = tempfile::tempdir().unwrap();
        let response = server(dir.path())
            .handle(json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": {}}))
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tool_call_unknown_tool() {
        let dir = tempfile::tempdir().unwrap();
        let response = server(dir.path())
            .handle(json!({
                "jsonrpc": "2.0", "id": 5, "method": "tools/call",
                "params": {"name": "explode", "arguments": {}}
            }))
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tool_call_wraps_envelope_as_text_content() {
        let dir = tempfile::tempdir().unwrap();
        let response = server(dir.path())
            .handle(json!({
                "jsonrpc": "2.0", "id": 6, "method": "tools/call",
                "params": {"name": "get_config", "arguments": {}}
            }))
            .await
            .unwrap();
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        let envelope: Value = serde_json::from_str(text).unwrap();
        assert!(envelope["download_directory"].is_string());
    }

    #[tokio::test]
    async fn test_error_envelopes_still_travel_as_results() {
        // A failing operation is a successful tools/call whose text holds
        // the error envelope; protocol errors are only for bad requests.
        let dir = tempfile::tempdir().unwrap();
        let response = server(dir.path())
            .handle(json!({
                "jsonrpc": "2.0", "id": 7, "method": "tools/call",
                "params": {"name": "download_video", "arguments": {"url": "https://youtu.be/PDKhUknuQDg"}}
            }))
            .await
            .unwrap();
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        let envelope: Value = serde_json::from_str(text).unwrap();
        assert_eq!(envelope["status"], "error");
        assert!(envelope["error"]
            .as_str()
            .unwrap()
            .contains("No downloadable video streams"));
    }
}
