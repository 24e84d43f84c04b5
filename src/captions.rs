// captions.rs - Caption Resolver
// Picks a caption track from the video metadata, downloads its json3 rendition and
// flattens the timed events into "MM:SS text" lines for the summary prompt.
//
// Track selection:
// - any manual subtitle tracks -> first track in metadata order, never automatic ones
// - otherwise -> first automatic track whose language key ends in "-orig"
// The chosen track must offer a json3 rendition, otherwise there is no transcript.

use crate::error::CaptionError;
use crate::video::{CaptionFormat, VideoInfo};
use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use std::time::Duration;

pub const CAPTION_FORMAT: &str = "json3";
pub const ORIGINAL_LANGUAGE_SUFFIX: &str = "-orig";

#[derive(Debug, Default, Deserialize)]
pub struct CaptionPayload {
    #[serde(default)]
    pub events: Vec<CaptionEvent>,
}

#[derive(Debug, Deserialize)]
pub struct CaptionEvent {
    #[serde(rename = "tStartMs", default)]
    pub start_ms: u64,
    /// Absent on position/window-only cues.
    #[serde(default)]
    pub segs: Option<Vec<CaptionSegment>>,
}

#[derive(Debug, Deserialize)]
pub struct CaptionSegment {
    #[serde(default)]
    pub utf8: Option<String>,
}

#[async_trait]
pub trait CaptionFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<CaptionPayload, CaptionError>;
}

pub struct HttpCaptionFetcher {
    http: reqwest::Client,
}

impl HttpCaptionFetcher {
    pub fn new() -> Result<Self, CaptionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl CaptionFetcher for HttpCaptionFetcher {
    async fn fetch(&self, url: &str) -> Result<CaptionPayload, CaptionError> {
        let body = self.http.get(url).send().await?.error_for_status()?.text().await?;
        debug!("[CAPTIONS] Downloaded {} bytes of caption json", body.len());
        Ok(serde_json::from_str(&body)?)
    }
}

/// Choose the caption rendition to download, if any.
pub fn select_caption_format(info: &VideoInfo) -> Option<&CaptionFormat> {
    let track = match info.subtitles.first() {
        Some(track) => track,
        None => info
            .automatic_captions
            .iter()
            .find(|track| track.language.ends_with(ORIGINAL_LANGUAGE_SUFFIX))?,
    };

    let format = track.formats.iter().find(|format| format.ext == CAPTION_FORMAT);
    if format.is_none() {
        info!(
            "[CAPTIONS] Track '{}' of '{}' has no {} rendition",
            track.language, info.title, CAPTION_FORMAT
        );
    }
    format
}

/// Resolve the transcript for a video. `Ok(None)` means no usable captions.
pub async fn resolve_transcript(
    info: &VideoInfo,
    fetcher: &dyn CaptionFetcher,
) -> Result<Option<String>, CaptionError> {
    let format = match select_caption_format(info) {
        Some(format) => format,
        None => {
            info!("[CAPTIONS] No usable caption track for '{}'", info.title);
            return Ok(None);
        }
    };

    let payload = fetcher.fetch(&format.url).await?;
    let transcript = flatten_events(&payload.events);
    debug!(
        "[CAPTIONS] {} events flattened into {} lines",
        payload.events.len(),
        transcript.lines().count()
    );
    Ok(Some(transcript))
}

/// One "MM:SS text" line per event with non-blank text, in event order.
///
/// Segments are joined with a space and whitespace runs collapse to one space.
/// Manual tracks split a cue into bare words while automatic tracks carry their own
/// leading spaces; both come out as single-spaced words on one line.
pub fn flatten_events(events: &[CaptionEvent]) -> String {
    events
        .iter()
        .filter_map(|event| {
            let segments = event.segs.as_ref()?;
            let text = segments
                .iter()
                .filter_map(|seg| seg.utf8.as_deref())
                .flat_map(str::split_whitespace)
                .collect::<Vec<_>>()
                .join(" ");
            if text.is_empty() {
                None
            } else {
                Some(format!("{} {}", format_timestamp(event.start_ms), text))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Minutes and seconds only; anything past 59:59 wraps around.
pub fn format_timestamp(milliseconds: u64) -> String {
    let total_seconds = milliseconds / 1000;
    let minutes = (total_seconds / 60) % 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}", minutes, seconds)
}
