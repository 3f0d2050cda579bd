//! Application context shared by route handlers.

use std::sync::Arc;

use cs_av::ToolRegistry;
use cs_core::config::Config;
use cs_stream::StreamingService;

/// State handed to every handler via Axum state.
///
/// Cheap to clone: the service and everything else is shared.
#[derive(Clone)]
pub struct AppContext {
    /// Streaming engine front door.
    pub service: StreamingService,
    /// Immutable configuration snapshot.
    pub config: Arc<Config>,
    /// External tool registry.
    pub tools: Arc<ToolRegistry>,
}

impl AppContext {
    pub fn new(service: StreamingService, config: Config, tools: ToolRegistry) -> Self {
        Self {
            service,
            config: Arc::new(config),
            tools: Arc::new(tools),
        }
    }
}
