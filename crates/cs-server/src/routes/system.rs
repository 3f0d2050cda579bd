//! Server status: tool availability, live transcodes and key settings.

use std::path::PathBuf;

use axum::extract::State;
use axum::Json;
use cs_av::ToolInfo;
use cs_stream::SessionStatus;
use serde::Serialize;

use crate::context::AppContext;

#[derive(Debug, Serialize)]
pub struct SystemResponse {
    pub version: &'static str,
    pub tools: Vec<ToolInfo>,
    pub sessions: Vec<SessionStatus>,
    pub library_roots: Vec<PathBuf>,
    pub cache_root: PathBuf,
    pub segment_duration_secs: u32,
}

/// GET /api/system
pub async fn system(State(ctx): State<AppContext>) -> Json<SystemResponse> {
    Json(SystemResponse {
        version: env!("CARGO_PKG_VERSION"),
        tools: ctx.tools.check_all().await,
        sessions: ctx.service.transcoder().list_sessions(),
        library_roots: ctx.config.library.roots.clone(),
        cache_root: ctx.service.transcoder().settings().cache_root.clone(),
        segment_duration_secs: ctx.config.transcode.segment_duration_secs,
    })
}
