// ffmpeg pipeline: merge, trim, audio conversion

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use super::errors::DownloadError;
use super::tools::{find_tool, ToolKind};

/// Removes the listed files when dropped. Keeps temporary download parts
/// from leaking even when the merge step errors out.
struct CleanupGuard {
    paths: Vec<PathBuf>,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            if path.exists() {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

/// Render seconds as `HH:MM:SS` for ffmpeg seek/duration arguments.
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

#[derive(Debug, Clone)]
pub struct MediaPipeline {
    ffmpeg: String,
}

impl MediaPipeline {
    pub fn new() -> Self {
        Self {
            ffmpeg: find_tool(ToolKind::Ffmpeg),
        }
    }

    async fn run_ffmpeg(&self, args: &[String]) -> Result<(), DownloadError> {
        let output = tokio::process::Command::new(&self.ffmpeg)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DownloadError::ToolNotFound(ToolKind::Ffmpeg.install_hint().to_string())
                } else {
                    DownloadError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::ToolFailed {
                tool: "ffmpeg",
                detail: stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    /// Merge separately downloaded video and audio tracks into one file.
    ///
    /// The video track is copied as-is; audio is re-encoded to AAC for
    /// container compatibility. Both temporary inputs are removed whether
    /// or not the merge succeeds; a failed merge is fatal to the download.
    pub async fn merge(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
    ) -> Result<(), DownloadError> {
        info!("Merging video and audio files...");

        let _cleanup = CleanupGuard {
            paths: vec![video_path.to_path_buf(), audio_path.to_path_buf()],
        };

        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            video_path.to_string_lossy().into_owned(),
            "-i".to_string(),
            audio_path.to_string_lossy().into_owned(),
            "-c:v".to_string(),
            "copy".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-strict".to_string(),
            "experimental".to_string(),
            output_path.to_string_lossy().into_owned(),
        ];

        match self.run_ffmpeg(&args).await {
            Ok(()) => {
                info!("Files merged successfully.");
                Ok(())
            }
            Err(err) => {
                error!("{}", ToolKind::Ffmpeg.install_hint());
                if let DownloadError::ToolFailed { detail, .. } = &err {
                    error!("ffmpeg error: {}", detail);
                }
                Err(err)
            }
        }
    }

    /// Extract a time-bounded clip.
    ///
    /// Seek is placed before the input for frame accuracy and both tracks
    /// are re-encoded for compatibility. On a nonzero exit the extraction
    /// is retried once with stream copy; a missing binary fails
    /// immediately.
    pub async fn trim(
        &self,
        input_path: &Path,
        start_seconds: f64,
        duration_seconds: f64,
        output_path: &Path,
    ) -> Result<(), DownloadError> {
        let seek = format_timestamp(start_seconds);
        let duration = format_timestamp(duration_seconds);

        info!("Trimming video segment: {} for {}", seek, duration);

        let encode_args = vec![
            "-y".to_string(),
            "-ss".to_string(),
            seek.clone(),
            "-i".to_string(),
            input_path.to_string_lossy().into_owned(),
            "-t".to_string(),
            duration.clone(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-preset".to_string(),
            "fast".to_string(),
            "-crf".to_string(),
            "23".to_string(),
            "-avoid_negative_ts".to_string(),
            "make_zero".to_string(),
            output_path.to_string_lossy().into_owned(),
        ];

        match self.run_ffmpeg(&encode_args).await {
            Ok(()) => Ok(()),
            Err(DownloadError::ToolNotFound(msg)) => Err(DownloadError::ToolNotFound(msg)),
            Err(first_err) => {
                warn!("Re-encoding trim failed, retrying with stream copy...");
                if let DownloadError::ToolFailed { detail, .. } = &first_err {
                    warn!("ffmpeg error: {}", detail);
                }

                let copy_args = vec![
                    "-y".to_string(),
                    "-i".to_string(),
                    input_path.to_string_lossy().into_owned(),
                    "-ss".to_string(),
                    seek,
                    "-t".to_string(),
                    duration,
                    "-c".to_string(),
                    "copy".to_string(),
                    "-avoid_negative_ts".to_string(),
                    "make_zero".to_string(),
                    output_path.to_string_lossy().into_owned(),
                ];
                self.run_ffmpeg(&copy_args).await
            }
        }
    }

    /// Convert a raw audio download to the target container.
    ///
    /// Resamples to 44.1kHz stereo. Conversion is a nicety, not a
    /// structural step: any tool failure degrades to renaming the raw
    /// file to the target extension.
    pub async fn convert_audio(
        &self,
        input_path: &Path,
        output_path: &Path,
        bitrate: Option<&str>,
    ) -> Result<(), DownloadError> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input_path.to_string_lossy().into_owned(),
            "-vn".to_string(),
            "-ar".to_string(),
            "44100".to_string(),
            "-ac".to_string(),
            "2".to_string(),
        ];

        let is_wav = output_path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("wav"));
        if !is_wav {
            args.push("-b:a".to_string());
            args.push(
                bitrate
                    .map(|b| b.replace("kbps", "k"))
                    .unwrap_or_else(|| "192k".to_string()),
            );
        }
        args.push(output_path.to_string_lossy().into_owned());

        match self.run_ffmpeg(&args).await {
            Ok(()) => {
                tokio::fs::remove_file(input_path).await?;
                Ok(())
            }
            Err(err) => {
                error!("Audio conversion failed ({}), keeping raw stream", err);
                tokio::fs::rename(input_path, output_path).await?;
                Ok(())
            }
        }
    }
}

impl Default for MediaPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00:00");
        assert_eq!(format_timestamp(90.0), "00:01:30");
        assert_eq!(format_timestamp(3661.0), "01:01:01");
        assert_eq!(format_timestamp(-5.0), "00:00:00");
    }

    #[test]
    fn test_trim_arguments_for_90_to_180() {
        // start=90, end=180: seek point and -t duration are both 00:01:30
        let seek = format_timestamp(90.0);
        let duration = format_timestamp(180.0 - 90.0);
        assert_eq!(seek, "00:01:30");
        assert_eq!(duration, "00:01:30");
    }

    #[test]
    fn test_cleanup_guard_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("video_part.mp4");
        let b = dir.path().join("audio_part.m4a");
        std::fs::write(&a, b"x").unwrap();
        std::fs::write(&b, b"x").unwrap();

        {
            let _guard = CleanupGuard {
                paths: vec![a.clone(), b.clone()],
            };
        }

        assert!(!a.exists());
        assert!(!b.exists());
    }
}
