//! The streaming operations exposed to the HTTP layer.

use std::sync::Arc;

use cs_av::{CaptionExtractor, SubtitleSource};
use cs_core::MediaItemId;
use cs_probe::{can_direct_play, ProbeResult, SubtitleFormat, SubtitleTrack};
use serde::Serialize;

use crate::catalog::{Catalog, CatalogItem};
use crate::direct::DirectPlay;
use crate::transcode::{
    SegmentFile, SessionStatus, TranscodeManager, TranscodeRequest, TranscodeSession,
};

/// Which caption track to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleRef {
    /// Embedded stream, by absolute stream index.
    Embedded(u32),
    /// Sidecar file, by position in the item's sidecar list.
    External(usize),
}

/// A sidecar subtitle as listed to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ExternalTrack {
    pub index: usize,
    pub language: Option<String>,
    pub forced: bool,
    pub format: SubtitleFormat,
}

/// All caption tracks of an item.
#[derive(Debug, Clone, Serialize)]
pub struct SubtitleTracks {
    pub embedded: Vec<SubtitleTrack>,
    pub external: Vec<ExternalTrack>,
}

/// Playback decision for an item.
#[derive(Debug, Clone, Serialize)]
pub struct StreamInfo {
    pub direct_play: bool,
    pub probe: Option<ProbeResult>,
}

/// Front door of the engine: resolves catalog items and delegates to the
/// direct-play server, the transcode manager and the caption extractor.
#[derive(Clone)]
pub struct StreamingService {
    catalog: Arc<dyn Catalog>,
    transcoder: TranscodeManager,
    captions: CaptionExtractor,
}

impl StreamingService {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        transcoder: TranscodeManager,
        captions: CaptionExtractor,
    ) -> Self {
        Self {
            catalog,
            transcoder,
            captions,
        }
    }

    pub fn transcoder(&self) -> &TranscodeManager {
        &self.transcoder
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    async fn item(&self, id: MediaItemId) -> cs_core::Result<CatalogItem> {
        self.catalog
            .media_item(id)
            .await?
            .ok_or_else(|| cs_core::Error::not_found("media_item", id))
    }

    pub async fn can_direct_play(&self, id: MediaItemId) -> cs_core::Result<bool> {
        let item = self.item(id).await?;
        Ok(can_direct_play(item.probe().as_ref()))
    }

    pub async fn stream_info(&self, id: MediaItemId) -> cs_core::Result<StreamInfo> {
        let probe = self.item(id).await?.probe();
        Ok(StreamInfo {
            direct_play: can_direct_play(probe.as_ref()),
            probe,
        })
    }

    /// Open the raw file for a (possibly ranged) read.
    pub async fn serve_direct(
        &self,
        id: MediaItemId,
        range: Option<&str>,
    ) -> cs_core::Result<DirectPlay> {
        let item = self.item(id).await?;
        DirectPlay::open(&item.file_path, range).await
    }

    /// Join or start the item's transcode and wait until it is playable.
    pub async fn start_transcode(
        &self,
        id: MediaItemId,
        request: &TranscodeRequest,
    ) -> cs_core::Result<Arc<TranscodeSession>> {
        let item = self.item(id).await?;
        self.transcoder
            .get_or_create_session(id, &item.file_path, request)
            .await
    }

    pub fn transcode_status(&self, id: MediaItemId) -> Option<SessionStatus> {
        self.transcoder.session_status(id)
    }

    pub async fn read_playlist(&self, id: MediaItemId) -> cs_core::Result<String> {
        self.transcoder.read_playlist(id).await
    }

    pub async fn open_segment(&self, id: MediaItemId, name: &str) -> cs_core::Result<SegmentFile> {
        self.transcoder.open_segment(id, name).await
    }

    /// Stop the item's transcode if one is running.
    pub async fn stop_transcode(&self, id: MediaItemId) {
        if !self.transcoder.kill_session(id).await {
            tracing::debug!(item_id = %id, "No transcode session to stop");
        }
    }

    pub async fn subtitle_tracks(&self, id: MediaItemId) -> cs_core::Result<SubtitleTracks> {
        let item = self.item(id).await?;
        let embedded = item
            .probe()
            .map(|p| p.subtitle_tracks)
            .unwrap_or_default();
        let external = item
            .external_subtitles
            .iter()
            .enumerate()
            .map(|(index, sub)| ExternalTrack {
                index,
                language: sub.language.clone(),
                forced: sub.forced,
                format: sub.format,
            })
            .collect();
        Ok(SubtitleTracks { embedded, external })
    }

    /// WebVTT text for one caption track of the item.
    pub async fn captions(&self, id: MediaItemId, track: SubtitleRef) -> cs_core::Result<String> {
        let item = self.item(id).await?;
        match track {
            SubtitleRef::External(n) => {
                let sub = item
                    .external_subtitles
                    .get(n)
                    .ok_or_else(|| cs_core::Error::not_found("subtitle_file", format!("{id}:{n}")))?;
                self.captions.to_webvtt(SubtitleSource::External(sub)).await
            }
            SubtitleRef::Embedded(stream_index) => {
                let probe = item.probe();
                let sub = probe
                    .as_ref()
                    .and_then(|p| p.subtitle_track(stream_index))
                    .ok_or_else(|| {
                        cs_core::Error::not_found("subtitle_track", format!("{id}:{stream_index}"))
                    })?;
                self.captions
                    .to_webvtt(SubtitleSource::Embedded {
                        file: &item.file_path,
                        stream_index,
                        codec: &sub.codec,
                    })
                    .await
            }
        }
    }

    /// Tear down every transcode and wipe the cache.
    pub async fn shutdown(&self) {
        self.transcoder.cleanup_all_sessions().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::transcode::TranscodeSettings;
    use assert_matches::assert_matches;
    use cs_av::{HlsEncoder, HlsJob};
    use cs_probe::{ExternalSubtitle, SubtitleTrack};
    use std::path::PathBuf;
    use std::time::Duration;

    struct NoEncoder;

    impl HlsEncoder for NoEncoder {
        fn spawn(&self, _job: &HlsJob) -> cs_core::Result<tokio::process::Child> {
            Err(cs_core::Error::tool("ffmpeg", "not available in tests"))
        }
    }

    fn service(catalog: InMemoryCatalog, root: &std::path::Path) -> StreamingService {
        let manager = TranscodeManager::new(
            Arc::new(NoEncoder),
            TranscodeSettings::with_cache_root(root.to_path_buf()),
        );
        let captions = CaptionExtractor::new(
            PathBuf::from("/nonexistent/ffmpeg"),
            root.to_path_buf(),
            Duration::from_secs(5),
        );
        StreamingService::new(Arc::new(catalog), manager, captions)
    }

    fn hevc_probe() -> ProbeResult {
        ProbeResult {
            video_codec: Some("hevc".into()),
            audio_codec: Some("aac".into()),
            container: Some("matroska,webm".into()),
            subtitle_tracks: vec![SubtitleTrack {
                stream_index: 3,
                codec: "hdmv_pgs_subtitle".into(),
                language: Some("eng".into()),
                title: None,
                forced: false,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn unknown_item_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let svc = service(InMemoryCatalog::new(), root.path());
        assert_matches!(
            svc.can_direct_play(MediaItemId::from(1)).await,
            Err(cs_core::Error::NotFound { .. })
        );
        assert_matches!(
            svc.start_transcode(MediaItemId::from(1), &TranscodeRequest::default())
                .await,
            Err(cs_core::Error::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn direct_play_follows_probe() {
        let root = tempfile::tempdir().unwrap();
        let catalog = InMemoryCatalog::new();
        let unprobed = catalog.add("/m/a.avi".into(), None, vec![]).unwrap();
        let hevc = catalog
            .add("/m/b.mkv".into(), Some(&hevc_probe()), vec![])
            .unwrap();
        let svc = service(catalog, root.path());

        assert!(svc.can_direct_play(unprobed).await.unwrap());
        assert!(!svc.can_direct_play(hevc).await.unwrap());
        let info = svc.stream_info(hevc).await.unwrap();
        assert!(!info.direct_play);
        assert_eq!(info.probe.unwrap().video_codec.as_deref(), Some("hevc"));
    }

    #[tokio::test]
    async fn subtitle_listing_and_bitmap_rejection() {
        let root = tempfile::tempdir().unwrap();
        let catalog = InMemoryCatalog::new();
        let id = catalog
            .add(
                "/m/b.mkv".into(),
                Some(&hevc_probe()),
                vec![ExternalSubtitle {
                    file_path: "/m/b.en.srt".into(),
                    language: Some("en".into()),
                    forced: false,
                    format: SubtitleFormat::Srt,
                }],
            )
            .unwrap();
        let svc = service(catalog, root.path());

        let tracks = svc.subtitle_tracks(id).await.unwrap();
        assert_eq!(tracks.embedded.len(), 1);
        assert_eq!(tracks.external.len(), 1);
        assert_eq!(tracks.external[0].index, 0);

        assert_matches!(
            svc.captions(id, SubtitleRef::Embedded(3)).await,
            Err(cs_core::Error::UnsupportedSubtitleFormat { .. })
        );
        assert_matches!(
            svc.captions(id, SubtitleRef::Embedded(7)).await,
            Err(cs_core::Error::NotFound { .. })
        );
        assert_matches!(
            svc.captions(id, SubtitleRef::External(4)).await,
            Err(cs_core::Error::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn stop_without_session_succeeds() {
        let root = tempfile::tempdir().unwrap();
        let svc = service(InMemoryCatalog::new(), root.path());
        svc.stop_transcode(MediaItemId::from(5)).await;
        assert!(svc.transcode_status(MediaItemId::from(5)).is_none());
    }

    #[tokio::test]
    async fn encoder_spawn_failure_leaves_no_session() {
        let root = tempfile::tempdir().unwrap();
        let catalog = InMemoryCatalog::new();
        let id = catalog.add("/m/b.mkv".into(), None, vec![]).unwrap();
        let svc = service(catalog, root.path());

        assert_matches!(
            svc.start_transcode(id, &TranscodeRequest::default()).await,
            Err(cs_core::Error::Tool { .. })
        );
        assert!(svc.transcoder().is_empty());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
