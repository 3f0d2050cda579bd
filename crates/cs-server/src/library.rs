//! Startup library walk.
//!
//! Walks each configured root, probes every video file and registers it in
//! an [`InMemoryCatalog`]. A file that fails to probe is still registered,
//! without a probe result.

use std::path::{Path, PathBuf};

use cs_probe::{find_external_subtitles, Prober};
use cs_stream::InMemoryCatalog;

/// Extensions recognised as video files.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "m4v", "wmv", "flv", "webm", "ts", "m2ts",
];

pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Collect video files under `roots` in walk order, sorted per root.
pub fn collect_video_files(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for root in roots {
        if !root.is_dir() {
            tracing::warn!(path = %root.display(), "Library root does not exist, skipping");
            continue;
        }

        let mut found: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!(error = %err, "Error walking directory");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && is_video_file(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        found.sort();
        files.extend(found);
    }

    files
}

/// Probe every video file under `roots` and build the catalog.
pub async fn scan_library(
    roots: &[PathBuf],
    prober: &dyn Prober,
) -> cs_core::Result<InMemoryCatalog> {
    let catalog = InMemoryCatalog::new();
    let files = collect_video_files(roots);
    tracing::info!(files = files.len(), roots = ?roots, "Starting library scan");

    let mut probe_failures = 0usize;
    for path in files {
        let probe = match prober.probe(&path).await {
            Ok(probe) => Some(probe),
            Err(e) => {
                probe_failures += 1;
                tracing::warn!(path = %path.display(), prober = prober.name(), "Probe failed: {e}");
                None
            }
        };
        let subtitles = find_external_subtitles(&path);
        let id = catalog.add(path.clone(), probe.as_ref(), subtitles)?;
        tracing::debug!(item_id = %id, path = %path.display(), "Registered media item");
    }

    tracing::info!(
        items = catalog.len(),
        probe_failures,
        "Library scan complete"
    );
    Ok(catalog)
}
