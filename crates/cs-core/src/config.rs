//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the server, library roots, external tools, transcoding and
//! subtitle conversion. Every section defaults sensibly so a completely empty
//! `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub library: LibraryConfig,
    pub tools: ToolsConfig,
    pub transcode: TranscodeConfig,
    pub subtitles: SubtitleConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    ///
    /// This is intentionally string-based so the caller can read the file
    /// however it sees fit (async, embedded, etc.).
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        for (i, root) in self.library.roots.iter().enumerate() {
            if !root.is_dir() {
                warnings.push(format!(
                    "library.roots[{i}] ({}) is not a directory",
                    root.display()
                ));
            }
        }

        let t = &self.transcode;
        if t.segment_duration_secs == 0 {
            warnings.push("transcode.segment_duration_secs is 0; ffmpeg will pick its own".into());
        }
        if t.min_ready_segments == 0 {
            warnings.push(
                "transcode.min_ready_segments is 0; sessions report ready before any segment exists"
                    .into(),
            );
        }
        if t.reap_interval_secs <= u64::from(t.segment_duration_secs) {
            warnings.push(format!(
                "transcode.reap_interval_secs ({}) should be well above the segment duration ({})",
                t.reap_interval_secs, t.segment_duration_secs
            ));
        }
        if t.idle_timeout_secs < t.reap_interval_secs {
            warnings.push(format!(
                "transcode.idle_timeout_secs ({}) is shorter than reap_interval_secs ({})",
                t.idle_timeout_secs, t.reap_interval_secs
            ));
        }
        if !t.hls_base_path.starts_with('/') {
            warnings.push(format!(
                "transcode.hls_base_path '{}' should start with '/'",
                t.hls_base_path
            ));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8096,
        }
    }
}

/// Library roots walked at startup to populate the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub roots: Vec<PathBuf>,
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Live HLS transcoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    /// Process-wide scratch root; each session gets a subdirectory.
    /// A leading `~` is expanded to the home directory.
    pub cache_dir: String,
    pub segment_duration_secs: u32,
    /// Segments the manifest must list before a session counts as ready.
    pub min_ready_segments: usize,
    pub ready_poll_interval_ms: u64,
    pub ready_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub reap_interval_secs: u64,
    pub video_preset: String,
    pub video_crf: u32,
    pub audio_bitrate: String,
    pub audio_channels: u32,
    /// URL prefix written into manifests; segments resolve to
    /// `<hls_base_path>/<item>/hls/<segment>`.
    pub hls_base_path: String,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            cache_dir: "~/.cozystream/transcode-cache".into(),
            segment_duration_secs: 6,
            min_ready_segments: 3,
            ready_poll_interval_ms: 300,
            ready_timeout_secs: 60,
            idle_timeout_secs: 30 * 60,
            reap_interval_secs: 5 * 60,
            video_preset: "veryfast".into(),
            video_crf: 23,
            audio_bitrate: "192k".into(),
            audio_channels: 2,
            hls_base_path: "/api/stream".into(),
        }
    }
}

impl TranscodeConfig {
    /// The cache root with `~` expanded.
    pub fn cache_root(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.cache_dir).into_owned())
    }

    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }
}

/// Caption conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    /// Where throwaway conversion output is written (system temp dir if unset).
    pub temp_dir: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            timeout_secs: 60,
        }
    }
}

impl SubtitleConfig {
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 8096);
        assert!(cfg.library.roots.is_empty());
        assert_eq!(cfg.transcode.segment_duration_secs, 6);
        assert_eq!(cfg.transcode.min_ready_segments, 3);
        assert_eq!(cfg.transcode.ready_timeout(), Duration::from_secs(60));
        assert_eq!(cfg.transcode.idle_timeout(), Duration::from_secs(1800));
        assert_eq!(cfg.transcode.reap_interval(), Duration::from_secs(300));
        assert_eq!(cfg.subtitles.timeout_secs, 60);
    }

    #[test]
    fn default_config_no_warnings() {
        let cfg = Config::default();
        let warnings = cfg.validate();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn cache_root_expands_tilde() {
        let cfg = TranscodeConfig::default();
        let root = cfg.cache_root();
        assert!(!root.to_string_lossy().starts_with('~'));
        assert!(root.ends_with(".cozystream/transcode-cache"));
    }

    #[test]
    fn missing_library_root_warns() {
        let mut cfg = Config::default();
        cfg.library.roots.push(PathBuf::from("/nonexistent/library/root"));
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("library.roots[0]")));
    }

    #[test]
    fn short_idle_timeout_warns() {
        let mut cfg = Config::default();
        cfg.transcode.idle_timeout_secs = 10;
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("idle_timeout_secs")));
    }

    #[test]
    fn parse_json_config() {
        let json = r#"{"server": {"port": 9090}, "transcode": {"video_crf": 20}}"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.transcode.video_crf, 20);
        assert_eq!(cfg.transcode.video_preset, "veryfast");
    }

    #[test]
    fn parse_empty_json_uses_defaults() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 8096);
    }

    #[test]
    fn parse_invalid_json_is_validation_error() {
        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn load_or_default_with_none() {
        let cfg = Config::load_or_default(None);
        assert_eq!(cfg.server.port, 8096);
    }

    #[test]
    fn load_or_default_with_missing_file() {
        let cfg = Config::load_or_default(Some(Path::new("/nonexistent/config.json")));
        assert_eq!(cfg.server.port, 8096);
    }

    #[test]
    fn load_or_default_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"library": {"roots": ["/media/movies"]}}"#).unwrap();

        let cfg = Config::load_or_default(Some(&path));
        assert_eq!(cfg.library.roots, vec![PathBuf::from("/media/movies")]);
    }
}
