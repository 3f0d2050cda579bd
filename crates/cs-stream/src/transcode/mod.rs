//! Live HLS transcode sessions.
//!
//! One session per media item. A session owns an encoder process writing
//! into `<cache_root>/<session_id>/`, becomes ready once the manifest lists
//! enough segments, and is torn down by an explicit stop, the idle reaper,
//! an encoder failure or shutdown.

mod manager;
mod session;

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

pub use manager::{SegmentFile, TranscodeManager};
pub use session::{SessionState, SessionStatus, TranscodeSession};

/// Parameters of a transcode start. Ignored when joining a live session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TranscodeRequest {
    /// Playback offset in seconds.
    #[serde(alias = "start")]
    pub start_seconds: f64,
    /// Ordinal among the source's audio streams.
    #[serde(alias = "audio")]
    pub audio_track: Option<u32>,
    /// Absolute stream index of the video stream.
    #[serde(alias = "video")]
    pub video_stream: Option<u32>,
}

/// Session manager tunables.
#[derive(Debug, Clone)]
pub struct TranscodeSettings {
    pub cache_root: PathBuf,
    pub min_ready_segments: usize,
    pub ready_poll_interval: Duration,
    pub ready_timeout: Duration,
    pub idle_timeout: Duration,
    pub reap_interval: Duration,
    /// Prefix of the per-item segment URL written into manifests.
    pub hls_base_path: String,
    /// How long teardown waits for a killed encoder to be reaped.
    pub kill_wait: Duration,
}

impl From<&cs_core::config::TranscodeConfig> for TranscodeSettings {
    fn from(cfg: &cs_core::config::TranscodeConfig) -> Self {
        Self {
            cache_root: cfg.cache_root(),
            min_ready_segments: cfg.min_ready_segments,
            ready_poll_interval: cfg.ready_poll_interval(),
            ready_timeout: cfg.ready_timeout(),
            idle_timeout: cfg.idle_timeout(),
            reap_interval: cfg.reap_interval(),
            hls_base_path: cfg.hls_base_path.clone(),
            kill_wait: Duration::from_secs(5),
        }
    }
}

impl TranscodeSettings {
    /// Defaults rooted at a specific cache directory.
    pub fn with_cache_root(cache_root: PathBuf) -> Self {
        Self {
            cache_root,
            ..Self::from(&cs_core::config::TranscodeConfig::default())
        }
    }
}
