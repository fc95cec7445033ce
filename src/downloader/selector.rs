// Stream selection: quality request -> download plan
//
// Candidate strategies are evaluated in order:
// 1. Progressive stream at the exact requested resolution (low/medium tiers
//    only), which avoids the merge step entirely.
// 2. Adaptive mp4 video (top resolution for "highest", exact match for an
//    explicit resolution), paired with the best audio-only track.
// 3. Best available progressive stream, with a logged downgrade.
// 4. No video streams at all -> error.

use tracing::{info, warn};

use super::errors::DownloadError;
use super::models::{DownloadPlan, QualityRequest, StreamCatalog, StreamDescriptor};

/// Container extension used for adaptive video selection.
const ADAPTIVE_EXT: &str = "mp4";

/// Resolution tiers that always take the adaptive path: progressive variants
/// do not exist above 720p.
const HIGH_TIERS: [&str; 4] = ["1080p", "1440p", "2160p", "4320p"];

/// Resolve a named tier to a concrete resolution label. `Highest` and
/// bitrate tokens have no target resolution and select adaptively.
fn target_resolution(quality: &QualityRequest, catalog: &StreamCatalog) -> Option<String> {
    match quality {
        QualityRequest::Highest | QualityRequest::Bitrate(_) => None,
        QualityRequest::High => Some("720p".to_string()),
        QualityRequest::Medium => Some("480p".to_string()),
        QualityRequest::Low => catalog.lowest_resolution(),
        QualityRequest::Resolution(r) => Some(r.clone()),
    }
}

fn is_high_tier(quality: &QualityRequest, resolution: Option<&str>) -> bool {
    if matches!(quality, QualityRequest::Highest) {
        return true;
    }
    resolution.map_or(false, |r| HIGH_TIERS.contains(&r))
}

/// Pick the stream(s) satisfying a video quality request.
pub fn select_video(
    catalog: &StreamCatalog,
    quality: &QualityRequest,
) -> Result<DownloadPlan, DownloadError> {
    if catalog.is_empty() {
        return Err(DownloadError::NoVideoStreams);
    }

    let resolution = target_resolution(quality, catalog);
    let high_tier = is_high_tier(quality, resolution.as_deref());

    // Progressive first at low/medium tiers: a muxed track needs no merge.
    if !high_tier {
        if let Some(res) = resolution.as_deref() {
            if let Some(stream) = catalog.progressive_at(res) {
                info!("Selected progressive {} stream (no merge needed)", res);
                return Ok(DownloadPlan::Direct(stream.clone()));
            }
        }
    }

    let adaptive: Option<&StreamDescriptor> = match resolution.as_deref() {
        None => catalog.adaptive_videos(ADAPTIVE_EXT).into_iter().next(),
        Some(res) => catalog.adaptive_video_at(res, ADAPTIVE_EXT),
    };

    match adaptive {
        Some(video) => {
            // Representation overlap: a provider may report a muxed track in
            // the adaptive listing. Use it directly and skip the merge.
            if video.progressive {
                info!(
                    "Selected {} stream is self-contained, skipping merge",
                    video.resolution.as_deref().unwrap_or("unknown")
                );
                return Ok(DownloadPlan::Direct(video.clone()));
            }

            let audio = catalog
                .best_audio_only()
                .ok_or(DownloadError::NoAudioStream)?;
            Ok(DownloadPlan::Merge {
                video: video.clone(),
                audio: audio.clone(),
            })
        }
        None => {
            let best = catalog
                .best_progressive()
                .ok_or(DownloadError::NoVideoStreams)?;
            warn!(
                "No adaptive stream for '{}', falling back to {} progressive",
                quality.as_str(),
                best.resolution.as_deref().unwrap_or("unknown")
            );
            Ok(DownloadPlan::Direct(best.clone()))
        }
    }
}

/// Pick an audio-only stream. "highest" (and the named tiers) take the
/// catalog's best pick; an explicit bitrate is matched exactly with a
/// logged downgrade to best-available when missing.
pub fn select_audio<'a>(
    catalog: &'a StreamCatalog,
    quality: &QualityRequest,
) -> Result<&'a StreamDescriptor, DownloadError> {
    if let QualityRequest::Bitrate(label) = quality {
        let wanted = label.trim_end_matches("kbps");
        if let Some(stream) = catalog.audio_at(wanted) {
            return Ok(stream);
        }
        let best = catalog
            .best_audio_only()
            .ok_or(DownloadError::NoAudioStream)?;
        warn!(
            "Quality '{}' not found, falling back to highest available: {}",
            label,
            best.abr.as_deref().unwrap_or("unknown")
        );
        return Ok(best);
    }

    catalog
        .best_audio_only()
        .ok_or(DownloadError::NoAudioStream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::StreamKind;

    fn video(id: &str, res: &str, progressive: bool, ext: &str) -> StreamDescriptor {
        StreamDescriptor {
            id: id.to_string(),
            kind: StreamKind::Video,
            resolution: Some(res.to_string()),
            abr: None,
            ext: ext.to_string(),
            progressive,
            filesize: Some(10_000_000),
            fps: Some(30.0),
        }
    }

    fn audio(id: &str, abr: &str) -> StreamDescriptor {
        StreamDescriptor {
            id: id.to_string(),
            kind: StreamKind::Audio,
            resolution: None,
            abr: Some(abr.to_string()),
            ext: "m4a".to_string(),
            progressive: false,
            filesize: Some(1_000_000),
            fps: None,
        }
    }

    fn full_catalog() -> StreamCatalog {
        StreamCatalog::new(vec![
            video("22", "720p", true, "mp4"),
            video("18", "360p", true, "mp4"),
            video("137", "1080p", false, "mp4"),
            video("136", "720p", false, "mp4"),
            video("135", "480p", false, "mp4"),
            audio("140", "128kbps"),
            audio("139", "48kbps"),
        ])
    }

    #[test]
    fn test_highest_takes_top_adaptive_with_merge() {
        let plan = select_video(&full_catalog(), &QualityRequest::Highest).unwrap();
        match plan {
            DownloadPlan::Merge { video, audio } => {
                assert_eq!(video.id, "137");
                assert_eq!(audio.id, "140");
            }
            DownloadPlan::Direct(_) => panic!("expected merge plan for highest"),
        }
    }

    #[test]
    fn test_named_tiers_always_produce_a_plan() {
        let catalog = full_catalog();
        for quality in [
            QualityRequest::Highest,
            QualityRequest::High,
            QualityRequest::Medium,
            QualityRequest::Low,
        ] {
            // Termination with exactly one plan kind per request.
            let plan = select_video(&catalog, &quality).unwrap();
            match plan {
                DownloadPlan::Direct(s) => assert_eq!(s.kind, StreamKind::Video),
                DownloadPlan::Merge { video, audio } => {
                    assert_eq!(video.kind, StreamKind::Video);
                    assert_eq!(audio.kind, StreamKind::Audio);
                }
            }
        }
    }

    #[test]
    fn test_medium_prefers_progressive_when_available() {
        let catalog = StreamCatalog::new(vec![
            video("p480", "480p", true, "mp4"),
            video("a480", "480p", false, "mp4"),
            audio("140", "128kbps"),
        ]);
        let plan = select_video(&catalog, &QualityRequest::Medium).unwrap();
        match plan {
            DownloadPlan::Direct(s) => assert_eq!(s.id, "p480"),
            DownloadPlan::Merge { .. } => panic!("progressive match must skip merge"),
        }
    }

    #[test]
    fn test_high_resolution_tier_skips_progressive() {
        // A (hypothetical) progressive 1080p must not shortcut the
        // adaptive path: high tiers always search adaptive first.
        let catalog = StreamCatalog::new(vec![
            video("p1080", "1080p", true, "mp4"),
            video("a1080", "1080p", false, "mp4"),
            audio("140", "128kbps"),
        ]);
        let plan = select_video(
            &catalog,
            &QualityRequest::Resolution("1080p".to_string()),
        )
        .unwrap();
        match plan {
            DownloadPlan::Merge { video, .. } => assert_eq!(video.id, "a1080"),
            DownloadPlan::Direct(s) => panic!("expected adaptive 1080p, got {}", s.id),
        }
    }

    #[test]
    fn test_no_adaptive_match_falls_back_to_best_progressive() {
        let catalog = StreamCatalog::new(vec![
            video("22", "720p", true, "mp4"),
            video("18", "360p", true, "mp4"),
        ]);
        let plan = select_video(&catalog, &QualityRequest::Highest).unwrap();
        match plan {
            DownloadPlan::Direct(s) => assert_eq!(s.id, "22"),
            DownloadPlan::Merge { .. } => panic!("no adaptive streams to merge"),
        }
    }

    #[test]
    fn test_adaptive_without_audio_is_fatal() {
        let catalog = StreamCatalog::new(vec![video("137", "1080p", false, "mp4")]);
        let err = select_video(&catalog, &QualityRequest::Highest).unwrap_err();
        assert!(matches!(err, DownloadError::NoAudioStream));
    }

    #[test]
    fn test_empty_catalog_is_fatal() {
        let err = select_video(&StreamCatalog::default(), &QualityRequest::Highest).unwrap_err();
        assert!(matches!(err, DownloadError::NoVideoStreams));
    }

    #[test]
    fn test_audio_exact_bitrate_match() {
        let catalog = full_catalog();
        let stream =
            select_audio(&catalog, &QualityRequest::Bitrate("48kbps".to_string())).unwrap();
        assert_eq!(stream.id, "139");
    }

    #[test]
    fn test_audio_missing_bitrate_downgrades_to_best() {
        let catalog = full_catalog();
        let stream =
            select_audio(&catalog, &QualityRequest::Bitrate("320kbps".to_string())).unwrap();
        assert_eq!(stream.id, "140");
    }

    #[test]
    fn test_audio_highest() {
        let catalog = full_catalog();
        let stream = select_audio(&catalog, &QualityRequest::Highest).unwrap();
        assert_eq!(stream.id, "140");
    }

    #[test]
    fn test_audio_none_available_is_fatal() {
        let catalog = StreamCatalog::new(vec![video("22", "720p", true, "mp4")]);
        let err = select_audio(&catalog, &QualityRequest::Highest).unwrap_err();
        assert!(matches!(err, DownloadError::NoAudioStream));
    }
}
