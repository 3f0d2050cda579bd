//! Sidecar subtitle discovery.
//!
//! For `Movie.mkv`, files such as `Movie.srt`, `Movie.en.srt` and
//! `Movie.en.forced.srt` in the same directory are picked up. The dotted
//! parts between the base name and the extension carry the language (first
//! part) and the `forced` marker.

use std::path::Path;

use crate::types::{ExternalSubtitle, SubtitleFormat};

/// Find sidecar subtitles for `video_path`, sorted by path.
///
/// An unreadable directory yields an empty list.
pub fn find_external_subtitles(video_path: &Path) -> Vec<ExternalSubtitle> {
    let Some(dir) = video_path.parent() else {
        return Vec::new();
    };
    let Some(base) = video_path.file_stem().and_then(|s| s.to_str()) else {
        return Vec::new();
    };

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), "Cannot read directory for sidecars: {e}");
            return Vec::new();
        }
    };

    let mut results: Vec<ExternalSubtitle> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            parse_sidecar_name(base, &name).map(|(language, forced, format)| ExternalSubtitle {
                file_path: entry.path(),
                language,
                forced,
                format,
            })
        })
        .collect();

    results.sort_by(|a, b| a.file_path.cmp(&b.file_path));
    results
}

fn parse_sidecar_name(base: &str, name: &str) -> Option<(Option<String>, bool, SubtitleFormat)> {
    let (stem, ext) = name.rsplit_once('.')?;
    let format = SubtitleFormat::from_extension(ext)?;
    let middle = stem.strip_prefix(base)?;

    let parts: Vec<&str> = middle.split('.').filter(|p| !p.is_empty()).collect();
    let language = parts.first().map(|p| p.to_string());
    let forced = parts.contains(&"forced");

    Some((language, forced, format))
}
