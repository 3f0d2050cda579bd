//! Subtitle track listing and WebVTT conversion routes.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use cs_stream::{SubtitleRef, SubtitleTracks};

use super::parse_item_id;
use crate::context::AppContext;
use crate::error::AppError;

/// GET /api/stream/{id}/subtitles
pub async fn list_subtitles(
    State(ctx): State<AppContext>,
    Path(item_id): Path<String>,
) -> Result<Json<SubtitleTracks>, AppError> {
    let id = parse_item_id(&item_id)?;
    Ok(Json(ctx.service.subtitle_tracks(id).await?))
}

/// GET /api/stream/{id}/subtitles/embedded/{stream_index}
pub async fn embedded(
    State(ctx): State<AppContext>,
    Path((item_id, stream_index)): Path<(String, u32)>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_item_id(&item_id)?;
    webvtt(&ctx, id, SubtitleRef::Embedded(stream_index)).await
}

/// GET /api/stream/{id}/subtitles/external/{n}
pub async fn external(
    State(ctx): State<AppContext>,
    Path((item_id, n)): Path<(String, usize)>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_item_id(&item_id)?;
    webvtt(&ctx, id, SubtitleRef::External(n)).await
}

async fn webvtt(
    ctx: &AppContext,
    id: cs_core::MediaItemId,
    track: SubtitleRef,
) -> Result<impl IntoResponse, AppError> {
    let vtt = ctx.service.captions(id, track).await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/vtt; charset=utf-8")],
        vtt,
    ))
}
