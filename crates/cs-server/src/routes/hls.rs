//! HLS transcode routes: manifest (starting or joining a session), status,
//! segments and stop.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cs_stream::direct::NO_CACHE;
use cs_stream::{SessionStatus, TranscodeRequest};
use serde_json::json;
use tokio_util::io::ReaderStream;

use super::parse_item_id;
use super::stream::STREAM_CHUNK;
use crate::context::AppContext;
use crate::error::AppError;

const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
const SEGMENT_CONTENT_TYPE: &str = "video/mp2t";

/// GET /api/stream/{id}/hls/stream.m3u8?start=&audio=&video=
///
/// Joins the item's live session or starts one, waiting until it is
/// playable.
pub async fn manifest(
    State(ctx): State<AppContext>,
    Path(item_id): Path<String>,
    Query(request): Query<TranscodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_item_id(&item_id)?;
    if !request.start_seconds.is_finite() || request.start_seconds < 0.0 {
        return Err(cs_core::Error::Validation(format!(
            "Invalid start offset: {}",
            request.start_seconds
        ))
        .into());
    }

    let session = ctx.service.start_transcode(id, &request).await?;
    let playlist = ctx.service.read_playlist(id).await?;
    tracing::debug!(item_id = %id, session_id = %session.id(), "Serving HLS manifest");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, MANIFEST_CONTENT_TYPE),
            (header::CACHE_CONTROL, NO_CACHE),
        ],
        playlist,
    ))
}

/// GET /api/stream/{id}/hls/status
pub async fn status(
    State(ctx): State<AppContext>,
    Path(item_id): Path<String>,
) -> Result<Json<SessionStatus>, AppError> {
    let id = parse_item_id(&item_id)?;
    ctx.service
        .transcode_status(id)
        .map(Json)
        .ok_or_else(|| cs_core::Error::NoActiveSession(id).into())
}

/// GET /api/stream/{id}/hls/{segment}
pub async fn segment(
    State(ctx): State<AppContext>,
    Path((item_id, segment)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let id = parse_item_id(&item_id)?;
    let seg = ctx.service.open_segment(id, &segment).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, SEGMENT_CONTENT_TYPE.to_string()),
            (header::CONTENT_LENGTH, seg.len.to_string()),
            (header::CACHE_CONTROL, NO_CACHE.to_string()),
        ],
        Body::from_stream(ReaderStream::with_capacity(seg.file, STREAM_CHUNK)),
    )
        .into_response())
}

/// DELETE /api/stream/{id}/hls
///
/// Always succeeds, whether or not a session was running.
pub async fn stop(
    State(ctx): State<AppContext>,
    Path(item_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = parse_item_id(&item_id)?;
    ctx.service.stop_transcode(id).await;
    Ok(Json(json!({ "ok": true })))
}
