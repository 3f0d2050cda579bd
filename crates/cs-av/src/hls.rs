//! Live HLS transcode launch.
//!
//! [`FfmpegHlsEncoder`] starts one ffmpeg process per session that re-encodes
//! the source to H.264/AAC and writes an event playlist plus MPEG-TS segments
//! into the session directory while the player is already reading them.

use std::path::{Path, PathBuf};

use tokio::process::Child;

use crate::command::ToolCommand;

/// Manifest file name inside every session directory.
pub const PLAYLIST_NAME: &str = "stream.m3u8";

/// Segment file name template handed to ffmpeg.
pub const SEGMENT_PATTERN: &str = "seg_%05d.ts";

/// Encoder quality and packaging settings shared by every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSettings {
    pub segment_duration_secs: u32,
    pub video_preset: String,
    pub video_crf: u32,
    pub audio_bitrate: String,
    pub audio_channels: u32,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self::from(&cs_core::config::TranscodeConfig::default())
    }
}

impl From<&cs_core::config::TranscodeConfig> for EncodeSettings {
    fn from(cfg: &cs_core::config::TranscodeConfig) -> Self {
        Self {
            segment_duration_secs: cfg.segment_duration_secs,
            video_preset: cfg.video_preset.clone(),
            video_crf: cfg.video_crf,
            audio_bitrate: cfg.audio_bitrate.clone(),
            audio_channels: cfg.audio_channels,
        }
    }
}

/// One encoder launch.
#[derive(Debug, Clone)]
pub struct HlsJob {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Playback offset the output is anchored to.
    pub start_seconds: f64,
    /// Absolute stream index of the video stream; `None` picks the first.
    pub video_stream_index: Option<u32>,
    /// Ordinal among audio streams; `None` picks the first.
    pub audio_track: Option<u32>,
    /// Prefix written in front of every segment name in the manifest.
    pub base_url: String,
}

impl HlsJob {
    pub fn playlist_path(&self) -> PathBuf {
        self.output_dir.join(PLAYLIST_NAME)
    }
}

/// Launches the process that produces a session's playlist and segments.
///
/// `spawn` must not block: the session manager calls it while holding the
/// per-item map entry.
pub trait HlsEncoder: Send + Sync {
    fn spawn(&self, job: &HlsJob) -> cs_core::Result<Child>;
}

/// The production encoder.
#[derive(Debug, Clone)]
pub struct FfmpegHlsEncoder {
    ffmpeg: PathBuf,
    settings: EncodeSettings,
}

impl FfmpegHlsEncoder {
    pub fn new(ffmpeg: PathBuf, settings: EncodeSettings) -> Self {
        Self { ffmpeg, settings }
    }

    /// Build the full ffmpeg invocation for `job`.
    pub fn command(&self, job: &HlsJob) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.ffmpeg.clone());
        cmd.args(build_args(&self.settings, job));
        cmd
    }
}

impl HlsEncoder for FfmpegHlsEncoder {
    fn spawn(&self, job: &HlsJob) -> cs_core::Result<Child> {
        let cmd = self.command(job);
        tracing::debug!(
            input = %job.input.display(),
            output = %job.output_dir.display(),
            "ffmpeg {}",
            cmd.get_args().join(" ")
        );
        cmd.spawn()
    }
}

/// ffmpeg arguments for a live HLS transcode.
///
/// `-ss` precedes `-i` for a fast input seek. The audio map carries a
/// trailing `?` so sources without audio still encode.
pub fn build_args(settings: &EncodeSettings, job: &HlsJob) -> Vec<String> {
    let video_map = match job.video_stream_index {
        Some(idx) => format!("0:{idx}"),
        None => "0:v:0".to_string(),
    };
    let audio_map = format!("0:a:{}?", job.audio_track.unwrap_or(0));

    let start = format_seconds(job.start_seconds);
    let input = job.input.to_string_lossy().into_owned();
    let crf = settings.video_crf.to_string();
    let channels = settings.audio_channels.to_string();
    let hls_time = settings.segment_duration_secs.to_string();
    let segments = segment_template(&job.output_dir);
    let playlist = job.playlist_path().to_string_lossy().into_owned();

    [
        "-hide_banner",
        "-loglevel",
        "error",
        "-y",
        "-ss",
        start.as_str(),
        "-i",
        input.as_str(),
        "-map",
        video_map.as_str(),
        "-map",
        audio_map.as_str(),
        "-c:v",
        "libx264",
        "-profile:v",
        "high",
        "-pix_fmt",
        "yuv420p",
        "-preset",
        settings.video_preset.as_str(),
        "-crf",
        crf.as_str(),
        "-c:a",
        "aac",
        "-b:a",
        settings.audio_bitrate.as_str(),
        "-ac",
        channels.as_str(),
        "-f",
        "hls",
        "-hls_time",
        hls_time.as_str(),
        "-hls_list_size",
        "0",
        "-hls_playlist_type",
        "event",
        "-hls_base_url",
        job.base_url.as_str(),
        "-hls_segment_filename",
        segments.as_str(),
        "-start_number",
        "0",
        playlist.as_str(),
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn segment_template(dir: &Path) -> String {
    dir.join(SEGMENT_PATTERN).to_string_lossy().into_owned()
}

/// Render seconds without a trailing `.0` for whole values.
fn format_seconds(secs: f64) -> String {
    if secs.fract() == 0.0 {
        format!("{}", secs as i64)
    } else {
        format!("{secs:.3}")
    }
}
