//! Direct-play compatibility.
//!
//! A file is sent to the browser untouched only when its video, audio and
//! container are all in the set every mainstream browser decodes natively.

use crate::types::ProbeResult;

const DIRECT_VIDEO_CODECS: &[&str] = &["h264", "avc", "avc1"];
const DIRECT_AUDIO_CODECS: &[&str] = &["aac", "mp3"];
const DIRECT_CONTAINER_TOKENS: &[&str] = &["mp4", "m4v"];

/// Decide whether the raw file can be played over HTTP range requests.
///
/// An unprobed item (`None`) is optimistically direct-playable; the client
/// falls back to HLS when playback fails.
pub fn can_direct_play(probe: Option<&ProbeResult>) -> bool {
    let Some(probe) = probe else {
        return true;
    };

    let video_ok = probe
        .video_codec
        .as_deref()
        .is_some_and(|c| DIRECT_VIDEO_CODECS.contains(&c.to_ascii_lowercase().as_str()));

    let audio_ok = probe
        .audio_codec
        .as_deref()
        .is_some_and(|c| DIRECT_AUDIO_CODECS.contains(&c.to_ascii_lowercase().as_str()));

    let container_ok = probe.container.as_deref().is_some_and(|c| {
        let c = c.to_ascii_lowercase();
        DIRECT_CONTAINER_TOKENS.iter().any(|t| c.contains(t))
    });

    video_ok && audio_ok && container_ok
}
