// Shared helpers: subprocess capture, timestamp parsing, filenames

use std::process::Stdio;

use lazy_static::lazy_static;
use regex::Regex;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};

use super::errors::DownloadError;

/// Run a command and capture both pipes, killing the child on timeout.
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    timeout_secs: u64,
) -> Result<std::process::Output, String> {
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to start {}: {}", program, e))?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| format!("Failed to capture stdout from {}", program))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| format!("Failed to capture stderr from {}", program))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe
            .read_to_end(&mut buf)
            .await
            .map_err(|e| format!("Failed to read stdout: {}", e))?;
        Ok::<Vec<u8>, String>(buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe
            .read_to_end(&mut buf)
            .await
            .map_err(|e| format!("Failed to read stderr: {}", e))?;
        Ok::<Vec<u8>, String>(buf)
    });

    let waited = timeout(Duration::from_secs(timeout_secs), child.wait()).await;
    match waited {
        Ok(status_res) => {
            let status =
                status_res.map_err(|e| format!("Failed to wait for {}: {}", program, e))?;
            let stdout = stdout_task
                .await
                .map_err(|e| format!("stdout task failed: {}", e))??;
            let stderr = stderr_task
                .await
                .map_err(|e| format!("stderr task failed: {}", e))??;
            Ok(std::process::Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(format!("Timed out after {}s", timeout_secs))
        }
    }
}

/// Parse a trim boundary: `HH:MM:SS`, `MM:SS`, or raw seconds.
pub fn parse_timestamp(raw: &str) -> Result<f64, DownloadError> {
    let invalid = || {
        DownloadError::InvalidInput(format!(
            "Invalid timestamp '{}': use HH:MM:SS, MM:SS, or seconds",
            raw
        ))
    };

    let parts: Vec<&str> = raw.trim().split(':').collect();
    match parts.len() {
        3 => {
            let hours: u64 = parts[0].parse().map_err(|_| invalid())?;
            let minutes: u64 = parts[1].parse().map_err(|_| invalid())?;
            let seconds: f64 = parts[2].parse().map_err(|_| invalid())?;
            Ok(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
        }
        2 => {
            let minutes: u64 = parts[0].parse().map_err(|_| invalid())?;
            let seconds: f64 = parts[1].parse().map_err(|_| invalid())?;
            Ok(minutes as f64 * 60.0 + seconds)
        }
        1 => parts[0].parse().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s-]").unwrap();
    static ref DASH_RUN: Regex = Regex::new(r"[-\s]+").unwrap();
}

/// Reduce a video title to a filesystem-safe stem.
pub fn safe_title(title: &str) -> String {
    let cleaned = NON_WORD.replace_all(title, "");
    let stem = DASH_RUN.replace_all(cleaned.trim(), "-").to_string();
    if stem.is_empty() {
        "video".to_string()
    } else {
        stem
    }
}

/// File size in megabytes, rounded to two decimals.
pub fn size_mb(bytes: u64) -> f64 {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    (mb * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("00:01:30").unwrap(), 90.0);
        assert_eq!(parse_timestamp("01:30").unwrap(), 90.0);
        assert_eq!(parse_timestamp("90").unwrap(), 90.0);
        assert_eq!(parse_timestamp("90.5").unwrap(), 90.5);
        assert_eq!(parse_timestamp("02:10:05").unwrap(), 7805.0);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("abc").is_err());
        assert!(parse_timestamp("1:2:3:4").is_err());
        assert!(parse_timestamp("one:30").is_err());
    }

    #[test]
    fn test_safe_title() {
        assert_eq!(safe_title("Rust: The Book (2024)!"), "Rust-The-Book-2024");
        assert_eq!(safe_title("  spaced   out  "), "spaced-out");
        assert_eq!(safe_title("???"), "video");
    }

    #[test]
    fn test_size_mb_rounding() {
        assert_eq!(size_mb(1024 * 1024), 1.0);
        assert_eq!(size_mb(1_572_864), 1.5);
        assert_eq!(size_mb(0), 0.0);
    }
}
