//! The [`Prober`] trait defining the interface for media file probing.

use std::path::Path;

use async_trait::async_trait;

use crate::types::ProbeResult;

/// A media file prober.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
#[async_trait]
pub trait Prober: Send + Sync {
    /// Human-readable name identifying this prober implementation.
    fn name(&self) -> &'static str;

    /// Probe the file at `path`.
    ///
    /// Any failure (missing tool, non-zero exit, unparseable output) is
    /// reported as [`cs_core::Error::ProbeFailed`]; callers decide whether
    /// to retry.
    async fn probe(&self, path: &Path) -> cs_core::Result<ProbeResult>;
}
