//! Direct-play routes: raw file bytes with HTTP range support.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use cs_stream::StreamInfo;
use tokio_util::io::ReaderStream;

use super::parse_item_id;
use crate::context::AppContext;
use crate::error::AppError;

/// Read size for streamed file bodies.
pub(crate) const STREAM_CHUNK: usize = 64 * 1024;

/// GET /api/stream/{id}
pub async fn direct_stream(
    State(ctx): State<AppContext>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let id = parse_item_id(&item_id)?;
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok());

    let direct = ctx.service.serve_direct(id, range).await?;
    let status = StatusCode::from_u16(direct.status()).unwrap_or(StatusCode::OK);
    tracing::debug!(item_id = %id, status = %status, range = ?range, "Direct play");

    let mut builder = Response::builder().status(status);
    for (name, value) in direct.headers() {
        builder = builder.header(name, value);
    }

    let body = match direct.body {
        Some(reader) => Body::from_stream(ReaderStream::with_capacity(reader, STREAM_CHUNK)),
        None => Body::empty(),
    };

    builder
        .body(body)
        .map_err(|e| cs_core::Error::Internal(format!("Failed to build response: {e}")).into())
}

/// GET /api/stream/{id}/info
pub async fn stream_info(
    State(ctx): State<AppContext>,
    Path(item_id): Path<String>,
) -> Result<Json<StreamInfo>, AppError> {
    let id = parse_item_id(&item_id)?;
    Ok(Json(ctx.service.stream_info(id).await?))
}
