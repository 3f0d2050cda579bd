//! Direct play: serving the raw file over HTTP byte ranges.
//!
//! The HTTP layer turns a [`DirectPlay`] into a response; this module owns
//! the range arithmetic and the file handle positioned at the right offset.

use std::io::SeekFrom;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};

/// Headers attached to every streaming response.
pub const NO_CACHE: &str = "no-cache, no-store";

/// How a request maps onto a file of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePlan {
    /// No usable range: send the whole file with 200.
    Full,
    /// Send the inclusive span `start..=end` with 206.
    Partial { start: u64, end: u64 },
    /// 416 with `Content-Range: bytes */<size>`.
    NotSatisfiable,
}

/// Resolve a `Range` header value against a file size.
///
/// - a header not starting with `bytes=` is ignored
/// - an empty or unparseable start is 0; an absent end is the last byte
/// - the end is clamped to the last byte
/// - `bytes=-N` selects the last `N` bytes
/// - only the first range of a multi-range request is honored
pub fn plan_range(header: Option<&str>, size: u64) -> RangePlan {
    let Some(byte_range) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangePlan::Full;
    };
    let byte_range = byte_range.split(',').next().unwrap_or("").trim();
    let (start_str, end_str) = byte_range.split_once('-').unwrap_or((byte_range, ""));
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    if size == 0 {
        return RangePlan::NotSatisfiable;
    }
    let last = size - 1;

    if start_str.is_empty() && !end_str.is_empty() {
        return match end_str.parse::<u64>() {
            Ok(0) => RangePlan::NotSatisfiable,
            Ok(n) => RangePlan::Partial {
                start: size.saturating_sub(n),
                end: last,
            },
            Err(_) => RangePlan::Partial { start: 0, end: last },
        };
    }

    let start = start_str.parse::<u64>().unwrap_or(0);
    let end = end_str.parse::<u64>().unwrap_or(last).min(last);

    if start > end {
        RangePlan::NotSatisfiable
    } else {
        RangePlan::Partial { start, end }
    }
}

/// MIME type by file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "wmv" => "video/x-ms-wmv",
        "webm" => "video/webm",
        "ts" | "m2ts" => "video/mp2t",
        "flv" => "video/x-flv",
        _ => "application/octet-stream",
    }
}

/// A resolved direct-play response: status, headers and a bounded reader.
#[derive(Debug)]
pub struct DirectPlay {
    pub plan: RangePlan,
    pub size: u64,
    pub content_type: &'static str,
    /// Positioned at the range start and limited to the range length.
    /// `None` for 416.
    pub body: Option<Take<File>>,
}

impl DirectPlay {
    /// Open `path` and prepare the response for `range`.
    pub async fn open(path: &Path, range: Option<&str>) -> cs_core::Result<Self> {
        let not_found = || cs_core::Error::not_found("file", path.display());

        let metadata = tokio::fs::metadata(path).await.map_err(|_| not_found())?;
        if !metadata.is_file() {
            return Err(not_found());
        }
        let size = metadata.len();
        let plan = plan_range(range, size);
        let content_type = content_type_for(path);

        let body = match plan {
            RangePlan::NotSatisfiable => None,
            RangePlan::Full => {
                let file = File::open(path).await.map_err(|_| not_found())?;
                Some(file.take(size))
            }
            RangePlan::Partial { start, end } => {
                let mut file = File::open(path).await.map_err(|_| not_found())?;
                file.seek(SeekFrom::Start(start)).await?;
                Some(file.take(end - start + 1))
            }
        };

        Ok(Self {
            plan,
            size,
            content_type,
            body,
        })
    }

    pub fn status(&self) -> u16 {
        match self.plan {
            RangePlan::Full => 200,
            RangePlan::Partial { .. } => 206,
            RangePlan::NotSatisfiable => 416,
        }
    }

    pub fn content_length(&self) -> u64 {
        match self.plan {
            RangePlan::Full => self.size,
            RangePlan::Partial { start, end } => end - start + 1,
            RangePlan::NotSatisfiable => 0,
        }
    }

    pub fn content_range(&self) -> Option<String> {
        match self.plan {
            RangePlan::Full => None,
            RangePlan::Partial { start, end } => Some(format!("bytes {start}-{end}/{}", self.size)),
            RangePlan::NotSatisfiable => Some(format!("bytes */{}", self.size)),
        }
    }

    /// Response headers, excluding the body stream.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![("cache-control", NO_CACHE.to_string())];
        if self.plan != RangePlan::NotSatisfiable {
            headers.push(("content-type", self.content_type.to_string()));
            headers.push(("content-length", self.content_length().to_string()));
            headers.push(("accept-ranges", "bytes".to_string()));
        }
        if let Some(range) = self.content_range() {
            headers.push(("content-range", range));
        }
        headers
    }
}
