// video.rs - Video metadata provider
// Runs yt-dlp in metadata-only mode and keeps the fields the caption resolver needs:
// the title plus the manual and automatic caption track maps, in the order yt-dlp
// lists them.

use crate::error::VideoError;
use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Deserializer};
use tokio::process::Command;

/// One downloadable rendition of a caption track.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaptionFormat {
    pub ext: String,
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// All renditions for one language key (e.g. `en`, `nl-orig`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    pub language: String,
    pub formats: Vec<CaptionFormat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfo {
    pub title: String,
    #[serde(default, deserialize_with = "ordered_tracks")]
    pub subtitles: Vec<CaptionTrack>,
    #[serde(default, deserialize_with = "ordered_tracks")]
    pub automatic_captions: Vec<CaptionTrack>,
}

/// yt-dlp emits track maps as JSON objects; read them into a list so the original
/// key order survives. Relies on serde_json's `preserve_order` map.
fn ordered_tracks<'de, D>(deserializer: D) -> Result<Vec<CaptionTrack>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = Option::<serde_json::Map<String, serde_json::Value>>::deserialize(deserializer)?;

    map.unwrap_or_default()
        .into_iter()
        .map(|(language, formats)| {
            let formats = Vec::<CaptionFormat>::deserialize(formats)
                .map_err(<D::Error as serde::de::Error>::custom)?;
            Ok(CaptionTrack { language, formats })
        })
        .collect()
}

#[async_trait]
pub trait VideoMetadataProvider: Send + Sync {
    /// Look up a video by URL or bare id.
    async fn fetch(&self, reference: &str) -> Result<VideoInfo, VideoError>;
}

pub struct YtDlp {
    program: String,
}

impl YtDlp {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

#[async_trait]
impl VideoMetadataProvider for YtDlp {
    async fn fetch(&self, reference: &str) -> Result<VideoInfo, VideoError> {
        debug!("[VIDEO] Running {} for '{}'", self.program, reference);

        let output = Command::new(&self.program)
            .args(["--dump-single-json", "--skip-download", "--no-playlist", "--no-warnings", "--"])
            .arg(reference)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(VideoError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let info: VideoInfo = serde_json::from_slice(&output.stdout)?;
        info!(
            "[VIDEO] '{}': {} subtitle tracks, {} automatic caption tracks",
            info.title,
            info.subtitles.len(),
            info.automatic_captions.len()
        );
        Ok(info)
    }
}
