//! Catalog listing.

use std::path::PathBuf;

use axum::extract::State;
use axum::Json;
use cs_core::MediaItemId;
use cs_stream::Catalog;
use serde::Serialize;

use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct LibraryItemResponse {
    pub id: MediaItemId,
    pub file_path: PathBuf,
    pub direct_play: bool,
    pub duration_seconds: Option<u64>,
    pub external_subtitles: usize,
}

/// GET /api/library
pub async fn list_items(
    State(ctx): State<AppContext>,
) -> Result<Json<Vec<LibraryItemResponse>>, AppError> {
    let items = ctx.service.catalog().list_items().await?;

    let response = items
        .into_iter()
        .map(|item| {
            let probe = item.probe();
            LibraryItemResponse {
                id: item.id,
                direct_play: cs_probe::can_direct_play(probe.as_ref()),
                duration_seconds: probe.and_then(|p| p.duration_seconds),
                external_subtitles: item.external_subtitles.len(),
                file_path: item.file_path,
            }
        })
        .collect();

    Ok(Json(response))
}
