//! Axum router construction.

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::routes;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let stream_routes = Router::new()
        .route("/{id}", get(routes::stream::direct_stream))
        .route("/{id}/info", get(routes::stream::stream_info))
        // HLS
        .route("/{id}/hls", axum::routing::delete(routes::hls::stop))
        .route("/{id}/hls/stream.m3u8", get(routes::hls::manifest))
        .route("/{id}/hls/status", get(routes::hls::status))
        .route("/{id}/hls/{segment}", get(routes::hls::segment))
        // Subtitles
        .route("/{id}/subtitles", get(routes::subtitles::list_subtitles))
        .route(
            "/{id}/subtitles/embedded/{stream_index}",
            get(routes::subtitles::embedded),
        )
        .route(
            "/{id}/subtitles/external/{n}",
            get(routes::subtitles::external),
        );

    let api_routes = Router::new()
        .route("/library", get(routes::library::list_items))
        .route("/system", get(routes::system::system))
        .nest("/stream", stream_routes);

    Router::new()
        .route("/health", get(routes::health))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}
