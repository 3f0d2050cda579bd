//! # cs-stream
//!
//! The transcoding and streaming session engine.
//!
//! - [`direct`] serves raw files over HTTP byte ranges
//! - [`transcode`] owns live HLS sessions: one encoder per media item,
//!   readiness tracking, segment access and idle reaping
//! - [`service`] is the operation surface the HTTP layer calls
//! - [`catalog`] is the seam to the media catalog

pub mod catalog;
pub mod direct;
pub mod playlist;
pub mod service;
pub mod transcode;

pub use catalog::{Catalog, CatalogItem, InMemoryCatalog};
pub use direct::{DirectPlay, RangePlan};
pub use service::{ExternalTrack, StreamInfo, StreamingService, SubtitleRef, SubtitleTracks};
pub use transcode::{
    SegmentFile, SessionState, SessionStatus, TranscodeManager, TranscodeRequest,
    TranscodeSession, TranscodeSettings,
};
