//! Route handlers for the HTTP API.

pub mod hls;
pub mod library;
pub mod stream;
pub mod subtitles;
pub mod system;

use cs_core::MediaItemId;

use crate::error::AppError;

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// Parse a path segment as a media item id.
pub(crate) fn parse_item_id(raw: &str) -> Result<MediaItemId, AppError> {
    raw.parse()
        .map_err(|_| cs_core::Error::Validation(format!("Invalid media item id: {raw}")).into())
}
