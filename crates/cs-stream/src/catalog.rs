//! The media catalog as seen by the streaming engine.

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use cs_core::MediaItemId;
use cs_probe::{ExternalSubtitle, ProbeResult};
use dashmap::DashMap;
use serde::Serialize;

/// The catalog fields the engine needs for one item.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogItem {
    pub id: MediaItemId,
    pub file_path: PathBuf,
    /// Serialized [`ProbeResult`], absent if probing failed at scan time.
    pub probe_blob: Option<String>,
    pub external_subtitles: Vec<ExternalSubtitle>,
}

impl CatalogItem {
    /// Decode the stored probe result.
    ///
    /// A corrupt blob is logged and treated like a missing one.
    pub fn probe(&self) -> Option<ProbeResult> {
        let blob = self.probe_blob.as_deref()?;
        match ProbeResult::from_blob(blob) {
            Ok(probe) => Some(probe),
            Err(e) => {
                tracing::warn!(item_id = %self.id, "Ignoring stored probe result: {e}");
                None
            }
        }
    }
}

/// Read access to the media catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn media_item(&self, id: MediaItemId) -> cs_core::Result<Option<CatalogItem>>;

    async fn list_items(&self) -> cs_core::Result<Vec<CatalogItem>>;
}

/// A catalog held in memory, populated at startup.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    items: DashMap<MediaItemId, CatalogItem>,
    next_id: AtomicI64,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file under the next sequential id (starting at 1).
    pub fn add(
        &self,
        file_path: PathBuf,
        probe: Option<&ProbeResult>,
        external_subtitles: Vec<ExternalSubtitle>,
    ) -> cs_core::Result<MediaItemId> {
        let probe_blob = probe.map(ProbeResult::to_blob).transpose()?;
        let id = MediaItemId::from(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.items.insert(
            id,
            CatalogItem {
                id,
                file_path,
                probe_blob,
                external_subtitles,
            },
        );
        Ok(id)
    }

    /// Insert or replace an item under its own id.
    pub fn insert(&self, item: CatalogItem) {
        self.next_id.fetch_max(item.id.get(), Ordering::Relaxed);
        self.items.insert(item.id, item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn media_item(&self, id: MediaItemId) -> cs_core::Result<Option<CatalogItem>> {
        Ok(self.items.get(&id).map(|e| e.value().clone()))
    }

    async fn list_items(&self) -> cs_core::Result<Vec<CatalogItem>> {
        let mut items: Vec<CatalogItem> = self.items.iter().map(|e| e.value().clone()).collect();
        items.sort_by_key(|i| i.id);
        Ok(items)
    }
}
