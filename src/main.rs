// vidsnatch CLI: download YouTube videos, audio, transcripts, and clips.
// Also hosts the web server and the stdio agent-tool server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::Value;

use vidsnatch::config::AppConfig;
use vidsnatch::downloader::models::{ProgressEvent, QualityRequest, SegmentRequest};
use vidsnatch::downloader::tools::{probe, ToolKind};
use vidsnatch::downloader::utils::parse_timestamp;
use vidsnatch::downloader::{DownloaderService, TimedTextProvider, YtdlpCatalog};
use vidsnatch::retry::RetryPolicy;
use vidsnatch::server::{web, AgentServer};
use vidsnatch::skills;

#[derive(Parser)]
#[command(
    name = "vidsnatch",
    version,
    about = "Download YouTube videos, audio, transcripts, and clips"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search YouTube by keyword and list matching videos
    Search {
        query: String,
        /// Sort order for results
        #[arg(long, default_value = "relevance", value_parser = ["relevance", "date", "views"])]
        sort: String,
        /// Output structured JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// Show title, duration, views, and available video/audio streams
    Info {
        url: String,
        #[arg(long)]
        json: bool,
    },

    /// Download video, audio, or transcript from a YouTube URL
    Download {
        #[command(subcommand)]
        target: DownloadTarget,
    },

    /// Download a precise time segment (clip) of a video
    Trim {
        url: String,
        /// Start time as HH:MM:SS, MM:SS, or raw seconds
        #[arg(long)]
        start: String,
        /// End time as HH:MM:SS, MM:SS, or raw seconds
        #[arg(long)]
        end: String,
        #[arg(long, default_value = "highest")]
        quality: String,
        /// Directory to save the clip (overrides the configured default)
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// List files already saved to the download directory
    List {
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// Install the skill file into AI coding tool directories
    Install {
        /// Copy SKILL.md into detected AI tool skill directories
        #[arg(long)]
        skills: bool,
    },

    /// Remove the skill file from AI coding tool directories
    Uninstall {
        /// Remove SKILL.md from detected AI tool skill directories
        #[arg(long)]
        skills: bool,
    },

    /// Run the web UI/API server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run the agent-tool server on stdio
    Agent,
}

#[derive(Subcommand)]
enum DownloadTarget {
    /// Download the video file (mp4)
    Video {
        url: String,
        #[arg(long, default_value = "highest")]
        quality: String,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Extract the audio track (mp3 / m4a / wav)
    Audio {
        url: String,
        #[arg(long, default_value = "mp3", value_parser = ["mp3", "m4a", "wav"])]
        format: String,
        #[arg(long, default_value = "highest")]
        quality: String,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Download a timestamped transcript as a text file
    Transcript {
        url: String,
        /// Language code (e.g. en, es, fr) or 'auto'
        #[arg(long, default_value = "en")]
        language: String,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
}

fn build_service(output: Option<PathBuf>) -> Result<DownloaderService> {
    let mut config = AppConfig::load();
    if let Some(dir) = output {
        config.download_directory = dir;
    }
    warn_on_missing_tools();
    let catalog = Arc::new(YtdlpCatalog::new(RetryPolicy::default()));
    let transcripts = Arc::new(TimedTextProvider::new(&config.transport)?);
    let service = DownloaderService::new(config, catalog, transcripts).with_progress(Arc::new(
        |event: ProgressEvent| {
            tracing::debug!("{} ({}%): {}", event.status, event.progress, event.message)
        },
    ));
    Ok(service)
}

fn warn_on_missing_tools() {
    for kind in [ToolKind::YtDlp, ToolKind::Ffmpeg] {
        let status = probe(kind);
        if status.is_available {
            tracing::debug!(
                "{} available: {}",
                status.name,
                status.version.as_deref().unwrap_or("?")
            );
        } else {
            tracing::warn!("{}", kind.install_hint());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Search { query, sort, json } => {
            let service = build_service(None)?;
            let envelope = service.search_videos(&query, &sort).await;
            report(&envelope, json);
        }
        Command::Info { url, json } => {
            let service = build_service(None)?;
            let envelope = service.video_info(&url).await;
            report(&envelope, json);
        }
        Command::Download { target } => match target {
            DownloadTarget::Video {
                url,
                quality,
                output,
                json,
            } => {
                let service = build_service(output)?;
                let envelope = service.download_video(&url, &quality).await;
                report(&envelope, json);
            }
            DownloadTarget::Audio {
                url,
                format,
                quality,
                output,
                json,
            } => {
                let service = build_service(output)?;
                let envelope = service.download_audio(&url, &quality, &format).await;
                report(&envelope, json);
            }
            DownloadTarget::Transcript {
                url,
                language,
                output,
                json,
            } => {
                let service = build_service(output)?;
                let mut envelope = service.download_transcript(&url, &language).await;
                // Keep human output readable; the full text stays in --json mode.
                if !json {
                    if let Some(obj) = envelope.as_object_mut() {
                        obj.remove("transcript_content");
                    }
                }
                report(&envelope, json);
            }
        },
        Command::Trim {
            url,
            start,
            end,
            quality,
            output,
            json,
        } => {
            let request = match (parse_timestamp(&start), parse_timestamp(&end)) {
                (Ok(start_time), Ok(end_time)) => SegmentRequest {
                    start_time,
                    end_time,
                    quality: QualityRequest::parse(&quality),
                },
                _ => {
                    eprintln!("Error: Invalid timestamp format. Use HH:MM:SS or seconds.");
                    std::process::exit(1);
                }
            };
            let service = build_service(output)?;
            let envelope = service.download_segment(&url, &request).await;
            report(&envelope, json);
        }
        Command::List { output, json } => {
            let service = build_service(output)?;
            let envelope = service.list_downloads().await;
            report(&envelope, json);
        }
        Command::Install { skills } => {
            require_skills_flag(skills);
            let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("no home directory"))?;
            let report = skills::install_skills(&home, &std::env::current_dir()?)?;
            print_skill_report(&report, "installed");
        }
        Command::Uninstall { skills } => {
            require_skills_flag(skills);
            let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("no home directory"))?;
            let report = skills::uninstall_skills(&home, &std::env::current_dir()?)?;
            print_skill_report(&report, "removed");
        }
        Command::Serve { host, port } => {
            let mut config = AppConfig::load();
            if let Some(host) = host {
                config.http.host = host;
            }
            if let Some(port) = port {
                config.http.port = port;
            }
            warn_on_missing_tools();
            let catalog = Arc::new(YtdlpCatalog::new(RetryPolicy::default()));
            let transcripts = Arc::new(TimedTextProvider::new(&config.transport)?);
            let service = Arc::new(DownloaderService::new(config, catalog, transcripts));
            web::serve(service).await?;
        }
        Command::Agent => {
            let service = Arc::new(build_service(None)?);
            AgentServer::new(service).run_stdio().await?;
        }
    }

    Ok(())
}

fn require_skills_flag(skills: bool) {
    if !skills {
        eprintln!("Error: pass --skills to manage the skill file.");
        std::process::exit(1);
    }
}

/// Print the envelope and exit nonzero when it carries an error.
fn report(envelope: &Value, as_json: bool) {
    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(envelope).unwrap_or_else(|_| envelope.to_string())
        );
    } else {
        print_human(envelope);
    }
    if envelope["status"] == "error" || envelope.get("error").is_some() {
        std::process::exit(1);
    }
}

fn print_skill_report(report: &skills::SkillReport, verb: &str) {
    println!("\nVidSnatch skills {}:", verb);
    for line in &report.installed {
        println!("  ✓  {}", line);
    }
    if !report.skipped.is_empty() {
        println!("\nSkipped (target not detected):");
        for line in &report.skipped {
            println!("  -  {}", line);
        }
    }
    if report.installed.is_empty() {
        println!("Nothing was {}.", verb);
    }
}

fn print_human(data: &Value) {
    if data["status"] == "error" || data.get("error").is_some() {
        let message = data["error"].as_str().unwrap_or("unknown error");
        eprintln!("Error: {}", message);
        return;
    }

    // info
    if data.get("title").is_some() && data.get("duration").is_some() {
        println!("Title:    {}", data["title"].as_str().unwrap_or("?"));
        println!("Author:   {}", data["author"].as_str().unwrap_or("?"));
        println!("Duration: {} seconds", data["duration"]);
        println!("Views:    {}", data["views"]);
        if let Some(streams) = data["video_streams"].as_array() {
            println!("\nVideo streams:");
            for s in streams.iter().take(5) {
                let mb = s["file_size"].as_u64().unwrap_or(0) as f64 / (1024.0 * 1024.0);
                println!(
                    "  {} @ {}fps  ({:.1} MB)",
                    s["resolution"].as_str().unwrap_or("?"),
                    s["fps"].as_f64().unwrap_or(0.0),
                    mb
                );
            }
        }
        if let Some(streams) = data["audio_streams"].as_array() {
            println!("\nAudio streams:");
            for s in streams.iter().take(3) {
                let mb = s["file_size"].as_u64().unwrap_or(0) as f64 / (1024.0 * 1024.0);
                println!("  {}  ({:.1} MB)", s["abr"].as_str().unwrap_or("?"), mb);
            }
        }
        return;
    }

    // list
    if let Some(files) = data["files"].as_array() {
        let directory = data["directory"].as_str().unwrap_or("downloads");
        if files.is_empty() {
            println!("No files in {}", directory);
            return;
        }
        println!("Files in {}  ({} total):", directory, data["total_count"]);
        for f in files {
            println!(
                "  {}  ({} MB)",
                f["filename"].as_str().unwrap_or("?"),
                f["size_mb"]
            );
        }
        return;
    }

    // download / trim / transcript
    if let Some(file_path) = data["file_path"].as_str() {
        let filename = std::path::Path::new(file_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_path.to_string());
        println!("Downloaded: {}  ({} MB)", filename, data["file_size_mb"]);
        println!("Path: {}", file_path);
        if data.get("start_time").is_some() {
            println!(
                "Segment: {}s – {}s  ({}s)",
                data["start_time"], data["end_time"], data["duration"]
            );
        }
        if let Some(language) = data["language"].as_str() {
            println!("Language: {}", language);
        }
        return;
    }

    // search
    if data.get("results").is_some() && data.get("query").is_some() {
        println!(
            "Search: \"{}\"  ({} results, sorted by {})\n",
            data["query"].as_str().unwrap_or(""),
            data["count"],
            data["sort_by"].as_str().unwrap_or("relevance")
        );
        if let Some(results) = data["results"].as_array() {
            for (i, r) in results.iter().enumerate() {
                let duration = r["duration"].as_u64().unwrap_or(0);
                println!("  {:2}. {}", i + 1, r["title"].as_str().unwrap_or("?"));
                println!(
                    "      {}  ({}:{:02})  by {}",
                    r["url"].as_str().unwrap_or("?"),
                    duration / 60,
                    duration % 60,
                    r["author"].as_str().unwrap_or("Unknown")
                );
            }
        }
        return;
    }

    // config or anything else
    println!(
        "{}",
        serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())
    );
}
