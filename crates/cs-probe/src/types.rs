//! Core types for media probe results.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Snapshot of a file's media structure, computed once at scan time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Codec of the primary video stream.
    pub video_codec: Option<String>,
    /// Absolute stream index of the primary video stream.
    pub video_stream_index: Option<u32>,
    /// Codec of the first audio stream.
    pub audio_codec: Option<String>,
    pub audio_tracks: Vec<AudioTrack>,
    pub subtitle_tracks: Vec<SubtitleTrack>,
    /// Raw format name, possibly multi-valued (`"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub container: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Duration rounded to whole seconds.
    pub duration_seconds: Option<u64>,
}

impl ProbeResult {
    /// Serialize into the opaque blob stored on the catalog record.
    pub fn to_blob(&self) -> cs_core::Result<String> {
        serde_json::to_string(self)
            .map_err(|e| cs_core::Error::Internal(format!("probe blob encode: {e}")))
    }

    /// Decode a blob previously produced by [`ProbeResult::to_blob`].
    pub fn from_blob(blob: &str) -> cs_core::Result<Self> {
        serde_json::from_str(blob)
            .map_err(|e| cs_core::Error::ProbeFailed(format!("stored probe blob is corrupt: {e}")))
    }

    /// Look up an embedded subtitle track by absolute stream index.
    pub fn subtitle_track(&self, stream_index: u32) -> Option<&SubtitleTrack> {
        self.subtitle_tracks
            .iter()
            .find(|t| t.stream_index == stream_index)
    }
}

/// An audio stream within a media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    /// Absolute stream index within the container.
    pub stream_index: u32,
    pub codec: String,
    pub language: Option<String>,
    pub channels: u32,
    pub title: Option<String>,
}

/// An embedded subtitle stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    /// Absolute stream index within the container.
    pub stream_index: u32,
    pub codec: String,
    pub language: Option<String>,
    pub title: Option<String>,
    pub forced: bool,
}

/// Codecs that can be converted to WebVTT as text.
const TEXT_SUBTITLE_CODECS: &[&str] = &[
    "subrip",
    "srt",
    "ass",
    "ssa",
    "webvtt",
    "mov_text",
    "text",
    "subviewer",
    "microdvd",
];

/// Whether a subtitle codec is text based (as opposed to a bitmap format
/// such as PGS or VobSub).
pub fn is_text_subtitle_codec(codec: &str) -> bool {
    let codec = codec.to_ascii_lowercase();
    TEXT_SUBTITLE_CODECS.contains(&codec.as_str())
}

impl SubtitleTrack {
    pub fn is_text_based(&self) -> bool {
        is_text_subtitle_codec(&self.codec)
    }
}

/// On-disk format of a sidecar subtitle file, taken from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    Srt,
    Vtt,
    Ass,
    Ssa,
    Sub,
}

impl SubtitleFormat {
    /// Map a file extension (without the dot, any case) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "srt" => Some(Self::Srt),
            "vtt" => Some(Self::Vtt),
            "ass" => Some(Self::Ass),
            "ssa" => Some(Self::Ssa),
            "sub" => Some(Self::Sub),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
            Self::Ass => "ass",
            Self::Ssa => "ssa",
            Self::Sub => "sub",
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subtitle file sitting next to the video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSubtitle {
    pub file_path: PathBuf,
    pub language: Option<String>,
    pub forced: bool,
    pub format: SubtitleFormat,
}

impl ExternalSubtitle {
    pub fn path(&self) -> &Path {
        &self.file_path
    }
}
