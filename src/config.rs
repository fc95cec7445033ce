// Runtime configuration: JSON file plus VIDSNATCH_* environment overrides

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "vidsnatch.json";
pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 8090;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub download_directory: PathBuf,
    pub default_video_quality: String,
    pub default_audio_quality: String,
    pub max_file_size_mb: u64,
    pub allowed_formats: Vec<String>,
    pub transcript: TranscriptConfig,
    pub transport: TransportConfig,
    pub http: HttpConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            download_directory: PathBuf::from("./downloads"),
            default_video_quality: "highest".to_string(),
            default_audio_quality: "highest".to_string(),
            max_file_size_mb: 500,
            allowed_formats: vec![
                "mp4".to_string(),
                "webm".to_string(),
                "mp3".to_string(),
                "m4a".to_string(),
            ],
            transcript: TranscriptConfig::default(),
            transport: TransportConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

/// Transcript language policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// When the requested language is missing, substitute the provider's
    /// first listed transcript instead of failing.
    pub fallback_to_first: bool,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            fallback_to_first: true,
        }
    }
}

/// Explicit transport settings, injected into HTTP clients instead of any
/// process-global TLS override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub accept_invalid_certs: bool,
    pub timeout_seconds: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            accept_invalid_certs: false,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HTTP_HOST.to_string(),
            port: DEFAULT_HTTP_PORT,
        }
    }
}

impl AppConfig {
    /// Load from `vidsnatch.json` in the working directory (when present),
    /// then apply environment overrides.
    pub fn load() -> Self {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!("Ignoring malformed config {}: {}", path.display(), err);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("VIDSNATCH_DOWNLOAD_DIR") {
            self.download_directory = PathBuf::from(dir);
        }
        if let Some(quality) = lookup("VIDSNATCH_VIDEO_QUALITY") {
            self.default_video_quality = quality;
        }
        if let Some(quality) = lookup("VIDSNATCH_AUDIO_QUALITY") {
            self.default_audio_quality = quality;
        }
        if let Some(size) = lookup("VIDSNATCH_MAX_FILE_SIZE_MB") {
            if let Ok(parsed) = size.parse() {
                self.max_file_size_mb = parsed;
            }
        }
        if let Some(host) = lookup("VIDSNATCH_HTTP_HOST") {
            self.http.host = host;
        }
        if let Some(port) = lookup("VIDSNATCH_HTTP_PORT") {
            if let Ok(parsed) = port.parse() {
                self.http.port = parsed;
            }
        }
        if let Some(flag) = lookup("VIDSNATCH_TRANSCRIPT_FALLBACK") {
            self.transcript.fallback_to_first = flag.to_lowercase() == "true";
        }
    }

    pub fn with_download_directory(mut self, dir: PathBuf) -> Self {
        self.download_directory = dir;
        self
    }
}
