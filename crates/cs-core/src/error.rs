//! Unified error type for cozystream.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`].

use std::fmt;

use crate::ids::MediaItemId;

/// Unified error type covering all failure modes of the streaming engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "media_item", "segment").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// ffprobe failed or produced output we could not parse.
    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    /// The encoder never produced a manifest within the readiness window.
    #[error("Transcode session {session_id} timed out waiting for its playlist")]
    StartupTimeout {
        /// Session that failed to start.
        session_id: String,
    },

    /// The encoder exited with an error after it had been launched.
    #[error("Encoder failed in session {session_id}: {message}")]
    EncoderFatal {
        /// Session whose encoder died.
        session_id: String,
        /// Exit status and the tail of the encoder's stderr.
        message: String,
    },

    /// A bitmap subtitle codec was requested for caption conversion.
    #[error("Unsupported subtitle format: {codec}")]
    UnsupportedSubtitleFormat {
        /// Codec name as reported by the prober.
        codec: String,
    },

    /// A segment filename was malformed or attempted path traversal.
    #[error("Invalid segment request: {0}")]
    InvalidSegmentRequest(String),

    /// No live transcode session exists for the item.
    #[error("No active transcode session for item {0}")]
    NoActiveSession(MediaItemId),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg, ffprobe) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::ProbeFailed(_) => 422,
            Error::StartupTimeout { .. } => 504,
            Error::EncoderFatal { .. } => 502,
            Error::UnsupportedSubtitleFormat { .. } => 415,
            Error::InvalidSegmentRequest(_) => 400,
            Error::NoActiveSession(_) => 404,
            Error::Io { .. } => 500,
            Error::Tool { .. } => 502,
            Error::Internal(_) => 500,
        }
    }

    /// Stable machine-readable code for API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not_found",
            Error::Validation(_) => "validation_error",
            Error::ProbeFailed(_) => "probe_failed",
            Error::StartupTimeout { .. } => "startup_timeout",
            Error::EncoderFatal { .. } => "encoder_fatal",
            Error::UnsupportedSubtitleFormat { .. } => "unsupported_subtitle_format",
            Error::InvalidSegmentRequest(_) => "invalid_segment_request",
            Error::NoActiveSession(_) => "no_active_session",
            Error::Io { .. } => "io_error",
            Error::Tool { .. } => "tool_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("media_item", 42);
        assert_eq!(err.to_string(), "media_item not found: 42");
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn no_active_session_is_distinct_404() {
        let err = Error::NoActiveSession(MediaItemId::from(7));
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.code(), "no_active_session");
        assert_eq!(err.to_string(), "No active transcode session for item 7");
    }

    #[test]
    fn probe_failed_display() {
        let err = Error::ProbeFailed("corrupt header".into());
        assert_eq!(err.to_string(), "Probe failed: corrupt header");
        assert_eq!(err.http_status(), 422);
    }

    #[test]
    fn startup_timeout_and_encoder_fatal_differ() {
        let timeout = Error::StartupTimeout {
            session_id: "42-1".into(),
        };
        let fatal = Error::EncoderFatal {
            session_id: "42-1".into(),
            message: "exit status: 1".into(),
        };
        assert_eq!(timeout.http_status(), 504);
        assert_eq!(fatal.http_status(), 502);
        assert_ne!(timeout.code(), fatal.code());
        assert!(fatal.to_string().contains("exit status: 1"));
    }

    #[test]
    fn subtitle_and_segment_errors() {
        let err = Error::UnsupportedSubtitleFormat {
            codec: "hdmv_pgs_subtitle".into(),
        };
        assert_eq!(err.http_status(), 415);

        let err = Error::InvalidSegmentRequest("../etc/passwd".into());
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "exit code 1");
        assert_eq!(err.to_string(), "Tool error [ffmpeg]: exit code 1");
        assert_eq!(err.http_status(), 502);
    }
}
