//! # cs-av
//!
//! External tool plumbing for the streaming engine.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find ffmpeg and ffprobe from
//!   config overrides or `PATH`.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for one-shot processes, plus detached spawning for long-running
//!   encoders.
//! - **Probing** ([`FfprobeProber`]) -- implements [`cs_probe::Prober`] by
//!   shelling out to ffprobe.
//! - **HLS encoding** ([`FfmpegHlsEncoder`]) -- launches the live transcode
//!   that writes `stream.m3u8` and `seg_%05d.ts` into a session directory.
//! - **Caption conversion** ([`CaptionExtractor`]) -- text subtitles to
//!   WebVTT.

pub mod command;
pub mod hls;
pub mod probe;
pub mod subtitles;
pub mod tools;

pub use command::{ToolCommand, ToolOutput};
pub use hls::{EncodeSettings, FfmpegHlsEncoder, HlsEncoder, HlsJob, PLAYLIST_NAME, SEGMENT_PATTERN};
pub use probe::FfprobeProber;
pub use subtitles::{CaptionExtractor, SubtitleSource};
pub use tools::{ToolInfo, ToolRegistry};
