//! On-demand caption conversion to WebVTT.
//!
//! Browsers only render WebVTT, so every other text format is converted by
//! a one-shot ffmpeg run into a throwaway file. The file is held as a
//! [`tempfile::TempPath`] and removed on every exit path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cs_probe::types::{is_text_subtitle_codec, ExternalSubtitle, SubtitleFormat};

use crate::command::ToolCommand;

/// Where a caption track comes from.
#[derive(Debug, Clone, Copy)]
pub enum SubtitleSource<'a> {
    /// A sidecar file next to the video.
    External(&'a ExternalSubtitle),
    /// A subtitle stream inside the video container.
    Embedded {
        file: &'a Path,
        stream_index: u32,
        codec: &'a str,
    },
}

/// Converts subtitle tracks to WebVTT text.
#[derive(Debug, Clone)]
pub struct CaptionExtractor {
    ffmpeg: PathBuf,
    temp_dir: PathBuf,
    timeout: Duration,
}

impl CaptionExtractor {
    pub fn new(ffmpeg: PathBuf, temp_dir: PathBuf, timeout: Duration) -> Self {
        Self {
            ffmpeg,
            temp_dir,
            timeout,
        }
    }

    pub fn from_config(ffmpeg: PathBuf, cfg: &cs_core::config::SubtitleConfig) -> Self {
        Self::new(ffmpeg, cfg.temp_dir(), Duration::from_secs(cfg.timeout_secs))
    }

    /// Produce WebVTT text for `source`.
    ///
    /// # Errors
    ///
    /// - [`cs_core::Error::UnsupportedSubtitleFormat`] for bitmap codecs
    ///   and VobSub sidecars, reported without launching ffmpeg.
    /// - [`cs_core::Error::NotFound`] if a sidecar file has disappeared.
    /// - [`cs_core::Error::Tool`] if the conversion fails or times out.
    pub async fn to_webvtt(&self, source: SubtitleSource<'_>) -> cs_core::Result<String> {
        match source {
            SubtitleSource::External(sub) if sub.format == SubtitleFormat::Vtt => {
                read_sidecar(&sub.file_path).await
            }
            SubtitleSource::External(sub) => {
                if !sub.file_path.exists() {
                    return Err(cs_core::Error::not_found(
                        "subtitle_file",
                        sub.file_path.display(),
                    ));
                }
                if is_vobsub(sub) {
                    return Err(cs_core::Error::UnsupportedSubtitleFormat {
                        codec: "dvd_subtitle".to_string(),
                    });
                }
                self.convert(&sub.file_path, None).await
            }
            SubtitleSource::Embedded {
                file,
                stream_index,
                codec,
            } => {
                if !is_text_subtitle_codec(codec) {
                    return Err(cs_core::Error::UnsupportedSubtitleFormat {
                        codec: codec.to_string(),
                    });
                }
                self.convert(file, Some(stream_index)).await
            }
        }
    }

    async fn convert(&self, input: &Path, stream_index: Option<u32>) -> cs_core::Result<String> {
        // Dropping the TempPath deletes the file, including on the error paths below.
        let output = tempfile::Builder::new()
            .prefix("captions-")
            .suffix(".vtt")
            .tempfile_in(&self.temp_dir)?
            .into_temp_path();

        let mut cmd = ToolCommand::new(self.ffmpeg.clone());
        cmd.args(["-hide_banner", "-loglevel", "error", "-y", "-i"]);
        cmd.path_arg(input);
        if let Some(idx) = stream_index {
            cmd.args(["-map".to_string(), format!("0:{idx}")]);
        }
        cmd.args(["-f", "webvtt"]);
        cmd.path_arg(&output);
        cmd.timeout(self.timeout);

        tracing::debug!(
            input = %input.display(),
            stream_index = ?stream_index,
            "Converting subtitles to WebVTT"
        );
        cmd.execute().await?;

        let text = tokio::fs::read_to_string(&output).await?;
        Ok(text)
    }
}

/// A `.sub` with a sibling `.idx` is VobSub bitmap data, not MicroDVD text.
fn is_vobsub(sub: &ExternalSubtitle) -> bool {
    sub.format == SubtitleFormat::Sub && sub.file_path.with_extension("idx").is_file()
}

async fn read_sidecar(path: &Path) -> cs_core::Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(cs_core::Error::not_found("subtitle_file", path.display()))
        }
        Err(e) => Err(e.into()),
    }
}
