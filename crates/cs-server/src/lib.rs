//! cs-server: HTTP API server for the streaming engine.
//!
//! Ties the cs-* crates into a running server:
//!
//! - Library walk at startup into an in-memory catalog
//! - Axum routes for direct play, HLS transcoding and captions
//! - Background idle-session reaper
//! - Graceful shutdown that kills every encoder and wipes the cache

pub mod context;
pub mod error;
pub mod library;
pub mod router;
pub mod routes;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cs_av::{CaptionExtractor, EncodeSettings, FfmpegHlsEncoder, FfprobeProber, ToolRegistry};
use cs_core::config::Config;
use cs_stream::{Catalog, StreamingService, TranscodeManager, TranscodeSettings};
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;

/// Resolved path of `name`, or the bare name to let the OS search `PATH`.
fn tool_path(tools: &ToolRegistry, name: &str) -> PathBuf {
    tools
        .require(name)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| PathBuf::from(name))
}

/// Wire the streaming engine from configuration.
pub fn build_service(
    config: &Config,
    tools: &ToolRegistry,
    catalog: Arc<dyn Catalog>,
) -> StreamingService {
    let ffmpeg = tool_path(tools, "ffmpeg");
    let encoder = FfmpegHlsEncoder::new(ffmpeg.clone(), EncodeSettings::from(&config.transcode));
    let manager = TranscodeManager::new(
        Arc::new(encoder),
        TranscodeSettings::from(&config.transcode),
    );
    let captions = CaptionExtractor::from_config(ffmpeg, &config.subtitles);
    StreamingService::new(catalog, manager, captions)
}

/// Start the cozystream server.
///
/// Scans the library, serves HTTP until a shutdown signal arrives, then
/// tears down every transcode session.
pub async fn start(config: Config) -> cs_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    // Discover external tools.
    let tools = ToolRegistry::discover(&config.tools);
    for info in tools.check_all().await {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::warn!("Tool not found: {}", info.name);
        }
    }

    let prober = FfprobeProber::new(tool_path(&tools, "ffprobe"));
    let catalog = library::scan_library(&config.library.roots, &prober).await?;

    let service = build_service(&config, &tools, Arc::new(catalog));
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| cs_core::Error::Internal(format!("Invalid server address: {e}")))?;
    let ctx = AppContext::new(service.clone(), config, tools);

    // Cancellation token for graceful shutdown.
    let cancel = CancellationToken::new();
    let reaper_handle = service.transcoder().spawn_reaper(cancel.clone());

    let app = router::build_router(ctx);

    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| cs_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await;

    // Stop background tasks, then kill encoders and wipe the cache.
    cancel.cancel();
    let _ = reaper_handle.await;
    service.shutdown().await;

    served.map_err(|e| cs_core::Error::Internal(format!("Server error: {e}")))?;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM) or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
