//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which wires an [`InMemoryCatalog`], a scripted
//! stand-in encoder and the full router. No ffmpeg is required.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use cs_av::{CaptionExtractor, HlsEncoder, HlsJob, ToolRegistry};
use cs_core::config::Config;
use cs_core::MediaItemId;
use cs_probe::{ExternalSubtitle, ProbeResult};
use cs_server::context::AppContext;
use cs_server::router::build_router;
use cs_stream::{CatalogItem, InMemoryCatalog, StreamingService, TranscodeManager, TranscodeSettings};

/// Stands in for ffmpeg: writes `segments` segments and a manifest into the
/// job's output directory, then idles until killed.
pub struct ScriptEncoder {
    segments: usize,
    launches: AtomicUsize,
    jobs: Mutex<Vec<HlsJob>>,
}

impl ScriptEncoder {
    pub fn new(segments: usize) -> Self {
        Self {
            segments,
            launches: AtomicUsize::new(0),
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn last_job(&self) -> Option<HlsJob> {
        self.jobs.lock().unwrap().last().cloned()
    }

    fn script(&self) -> String {
        format!(
            r#"i=0
printf '#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:6\n' > "$OUT/stream.m3u8.tmp"
while [ $i -lt {n} ]; do
  seg=$(printf 'seg_%05d.ts' $i)
  printf 'segment-%d' $i > "$OUT/$seg"
  printf '#EXTINF:6.0,\n%s%s\n' "$BASE" "$seg" >> "$OUT/stream.m3u8.tmp"
  i=$((i+1))
done
mv "$OUT/stream.m3u8.tmp" "$OUT/stream.m3u8"
exec sleep 30"#,
            n = self.segments
        )
    }
}

impl HlsEncoder for ScriptEncoder {
    fn spawn(&self, job: &HlsJob) -> cs_core::Result<tokio::process::Child> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.jobs.lock().unwrap().push(job.clone());
        let mut cmd = tokio::process::Command::new("sh");
        cmd.args(["-c", &self.script()])
            .env("OUT", &job.output_dir)
            .env("BASE", &job.base_url)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);
        Ok(cmd.spawn()?)
    }
}

/// A fully wired server over temporary directories.
pub struct TestHarness {
    pub app: Router,
    pub ctx: AppContext,
    pub catalog: Arc<InMemoryCatalog>,
    pub encoder: Arc<ScriptEncoder>,
    pub cache: TempDir,
    pub media: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_segments(3)
    }

    /// Harness whose encoder produces `segments` segments per session.
    pub fn with_segments(segments: usize) -> Self {
        let cache = tempfile::tempdir().expect("cache dir");
        let media = tempfile::tempdir().expect("media dir");
        let catalog = Arc::new(InMemoryCatalog::new());
        let encoder = Arc::new(ScriptEncoder::new(segments));

        let settings = TranscodeSettings {
            cache_root: cache.path().to_path_buf(),
            min_ready_segments: 3,
            ready_poll_interval: Duration::from_millis(20),
            ready_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            reap_interval: Duration::from_secs(60),
            hls_base_path: "/api/stream".into(),
            kill_wait: Duration::from_secs(2),
        };
        let manager = TranscodeManager::new(encoder.clone(), settings);
        let captions = CaptionExtractor::new(
            PathBuf::from("/nonexistent/ffmpeg"),
            media.path().to_path_buf(),
            Duration::from_secs(5),
        );
        let service = StreamingService::new(catalog.clone(), manager, captions);
        let ctx = AppContext::new(service, Config::default(), ToolRegistry::default());
        let app = build_router(ctx.clone());

        Self {
            app,
            ctx,
            catalog,
            encoder,
            cache,
            media,
        }
    }

    /// Write a media file and register it under `id`.
    pub fn add_item(
        &self,
        id: i64,
        name: &str,
        contents: &[u8],
        probe: Option<&ProbeResult>,
        external_subtitles: Vec<ExternalSubtitle>,
    ) -> PathBuf {
        let path = self.media.path().join(name);
        std::fs::write(&path, contents).expect("write media file");
        self.catalog.insert(CatalogItem {
            id: MediaItemId::from(id),
            file_path: path.clone(),
            probe_blob: probe.map(|p| p.to_blob().expect("probe blob")),
            external_subtitles,
        });
        path
    }

    pub fn cache_entries(&self) -> usize {
        std::fs::read_dir(self.cache.path())
            .map(|d| d.count())
            .unwrap_or(0)
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }
}

/// A source that cannot be direct-played.
pub fn hevc_mkv_probe() -> ProbeResult {
    ProbeResult {
        video_codec: Some("hevc".into()),
        video_stream_index: Some(0),
        audio_codec: Some("eac3".into()),
        container: Some("matroska,webm".into()),
        duration_seconds: Some(5400),
        ..Default::default()
    }
}

pub async fn body_bytes(body: Body) -> Vec<u8> {
    body.collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_string(body: Body) -> String {
    String::from_utf8(body_bytes(body).await).unwrap()
}

pub async fn body_json(body: Body) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(body).await).unwrap()
}

pub fn header<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}
