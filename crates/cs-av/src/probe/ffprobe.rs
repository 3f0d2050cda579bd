//! FFprobe-based [`cs_probe::Prober`] implementation.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format -show_streams`
//! and maps the JSON output into [`cs_probe::ProbeResult`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cs_probe::types::{AudioTrack, ProbeResult, SubtitleTrack};
use cs_probe::Prober;
use serde::Deserialize;

use crate::command::ToolCommand;

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self { ffprobe_path }
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path) -> cs_core::Result<ProbeResult> {
        let mut cmd = ToolCommand::new(self.ffprobe_path.clone());
        cmd.args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ]);
        cmd.path_arg(path);

        let output = cmd.execute().await.map_err(|e| {
            cs_core::Error::ProbeFailed(format!("{}: {e}", path.display()))
        })?;

        parse_ffprobe_output(&output.stdout)
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    channels: Option<u32>,
    #[serde(default)]
    disposition: FfprobeDisposition,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    forced: u8,
    #[serde(default)]
    attached_pic: u8,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    language: Option<String>,
    title: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Map raw ffprobe JSON into a [`ProbeResult`].
///
/// The primary video stream is the first one that is not cover art
/// (`attached_pic`), falling back to the first video stream of any kind.
pub fn parse_ffprobe_output(json: &str) -> cs_core::Result<ProbeResult> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| cs_core::Error::ProbeFailed(format!("ffprobe JSON parse error: {e}")))?;

    let of_type = |ty: &'static str| {
        output
            .streams
            .iter()
            .filter(move |s| s.codec_type.as_deref() == Some(ty))
    };

    let video = of_type("video")
        .find(|s| s.disposition.attached_pic != 1)
        .or_else(|| of_type("video").next());

    let audio_tracks: Vec<AudioTrack> = of_type("audio")
        .map(|s| AudioTrack {
            stream_index: s.index,
            codec: codec_or_unknown(s),
            language: s.tags.language.clone(),
            channels: s.channels.unwrap_or(2),
            title: s.tags.title.clone(),
        })
        .collect();

    let subtitle_tracks: Vec<SubtitleTrack> = of_type("subtitle")
        .map(|s| SubtitleTrack {
            stream_index: s.index,
            codec: codec_or_unknown(s),
            language: s.tags.language.clone(),
            title: s.tags.title.clone(),
            forced: s.disposition.forced == 1,
        })
        .collect();

    let audio_codec = of_type("audio").next().and_then(|s| s.codec_name.clone());

    let duration_seconds = output
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(|d| d.round() as u64);

    Ok(ProbeResult {
        video_codec: video.and_then(|s| s.codec_name.clone()),
        video_stream_index: video.map(|s| s.index),
        audio_codec,
        audio_tracks,
        subtitle_tracks,
        container: output.format.format_name.clone(),
        width: video.and_then(|s| s.width),
        height: video.and_then(|s| s.height),
        duration_seconds,
    })
}

fn codec_or_unknown(stream: &FfprobeStream) -> String {
    stream
        .codec_name
        .clone()
        .unwrap_or_else(|| "unknown".to_string())
}
