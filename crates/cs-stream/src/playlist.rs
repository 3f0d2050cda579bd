//! Inspection of the live HLS manifest written by the encoder.

/// What a manifest currently advertises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaylistStatus {
    /// Number of `.ts` segment entries.
    pub segments: usize,
    /// Whether `#EXT-X-ENDLIST` is present (the encoder finished the file).
    pub ended: bool,
}

impl PlaylistStatus {
    /// A session is playable once enough segments are buffered, or the
    /// whole (short) file has been encoded.
    pub fn is_ready(&self, min_segments: usize) -> bool {
        self.segments >= min_segments || self.ended
    }
}

/// Count segment entries and detect the end marker.
pub fn inspect_playlist(text: &str) -> PlaylistStatus {
    let mut status = PlaylistStatus::default();
    for line in text.lines().map(str::trim) {
        if line == "#EXT-X-ENDLIST" {
            status.ended = true;
        } else if !line.starts_with('#') && line.ends_with(".ts") {
            status.segments += 1;
        }
    }
    status
}

/// Whether `segment` is listed in the manifest.
///
/// Entries carry the base URL prefix, so only the final path component is
/// compared.
pub fn lists_segment(text: &str, segment: &str) -> bool {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .any(|line| line.rsplit('/').next() == Some(segment))
}
