//! # cs-probe
//!
//! Media probe data model and the pure decisions made on top of it.
//!
//! - [`ProbeResult`]: the immutable snapshot of a file's streams, stored on
//!   the catalog record as an opaque JSON blob
//! - [`can_direct_play`]: whether a browser can play the raw file over HTTP
//!   range requests
//! - [`find_external_subtitles`]: sidecar subtitle discovery by filename
//! - [`Prober`]: the async seam implemented by the ffprobe adapter in `cs-av`

pub mod compat;
pub mod prober;
pub mod sidecar;
pub mod types;

pub use compat::can_direct_play;
pub use prober::Prober;
pub use sidecar::find_external_subtitles;
pub use types::{
    is_text_subtitle_codec, AudioTrack, ExternalSubtitle, ProbeResult, SubtitleFormat,
    SubtitleTrack,
};
