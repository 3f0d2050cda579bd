//! The session map and every task that acts on it.

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use chrono::Utc;
use cs_av::{HlsEncoder, HlsJob};
use cs_core::MediaItemId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use regex::Regex;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::session::{Readiness, SessionStatus, StartFailure, TranscodeSession};
use super::{TranscodeRequest, TranscodeSettings};
use crate::playlist::{inspect_playlist, lists_segment};

static SEGMENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^seg_\d{5}\.ts$").expect("segment name pattern is valid"));

/// How long a failed encoder's stderr reader may drain before the report is built.
const STDERR_DRAIN: Duration = Duration::from_millis(500);

/// An open segment ready to be streamed.
#[derive(Debug)]
pub struct SegmentFile {
    pub file: File,
    pub len: u64,
}

/// Owns all live transcode sessions, keyed by media item.
///
/// Cheap to clone; clones share the same map.
#[derive(Clone)]
pub struct TranscodeManager {
    inner: Arc<Inner>,
}

struct Inner {
    sessions: DashMap<MediaItemId, Arc<TranscodeSession>>,
    encoder: Arc<dyn HlsEncoder>,
    settings: TranscodeSettings,
    last_stamp: AtomicI64,
}

impl TranscodeManager {
    pub fn new(encoder: Arc<dyn HlsEncoder>, settings: TranscodeSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: DashMap::new(),
                encoder,
                settings,
                last_stamp: AtomicI64::new(0),
            }),
        }
    }

    pub fn settings(&self) -> &TranscodeSettings {
        &self.inner.settings
    }

    /// Join the live session for `item`, or start one, then wait for it to
    /// become playable.
    ///
    /// When a session is already live its access time is refreshed and the
    /// request parameters are ignored.
    pub async fn get_or_create_session(
        &self,
        item: MediaItemId,
        file: &Path,
        request: &TranscodeRequest,
    ) -> cs_core::Result<Arc<TranscodeSession>> {
        let session = self.join_or_launch(item, file, request)?;
        session.wait_ready().await?;
        Ok(session)
    }

    /// Find or register the session without waiting for readiness.
    ///
    /// Directory creation, spawn and insert all happen under the map entry
    /// lock with no await in between, so concurrent callers for one item
    /// observe a single launch.
    pub fn join_or_launch(
        &self,
        item: MediaItemId,
        file: &Path,
        request: &TranscodeRequest,
    ) -> cs_core::Result<Arc<TranscodeSession>> {
        let (session, child) = match self.inner.sessions.entry(item) {
            Entry::Occupied(entry) if !entry.get().is_ending() => {
                let session = entry.get().clone();
                session.touch();
                tracing::debug!(
                    session_id = %session.id(),
                    item_id = %item,
                    "Joining live transcode session"
                );
                return Ok(session);
            }
            Entry::Occupied(mut entry) => {
                let (session, child) = self.launch(item, file, request)?;
                entry.insert(session.clone());
                (session, child)
            }
            Entry::Vacant(entry) => {
                let (session, child) = self.launch(item, file, request)?;
                entry.insert(session.clone());
                (session, child)
            }
        };

        self.spawn_supervisor(session.clone(), child);
        self.spawn_readiness_poller(session.clone());
        Ok(session)
    }

    fn launch(
        &self,
        item: MediaItemId,
        file: &Path,
        request: &TranscodeRequest,
    ) -> cs_core::Result<(Arc<TranscodeSession>, Child)> {
        let settings = &self.inner.settings;
        let session_id = format!("{item}-{}", self.next_stamp());
        let output_dir = settings.cache_root.join(&session_id);
        std::fs::create_dir_all(&output_dir)?;

        let job = HlsJob {
            input: file.to_path_buf(),
            output_dir: output_dir.clone(),
            start_seconds: request.start_seconds,
            video_stream_index: request.video_stream,
            audio_track: request.audio_track,
            base_url: format!(
                "{}/{item}/hls/",
                settings.hls_base_path.trim_end_matches('/')
            ),
        };

        let child = match self.inner.encoder.spawn(&job) {
            Ok(child) => child,
            Err(e) => {
                if let Err(rm) = std::fs::remove_dir_all(&output_dir) {
                    tracing::warn!(
                        session_id = %session_id,
                        "Failed to remove directory of unstarted session: {rm}"
                    );
                }
                return Err(e);
            }
        };

        tracing::info!(
            session_id = %session_id,
            item_id = %item,
            start_seconds = request.start_seconds,
            pid = ?child.id(),
            "Started transcode session"
        );

        let session = Arc::new(TranscodeSession::new(
            session_id,
            item,
            output_dir,
            job.playlist_path(),
            request.start_seconds,
        ));
        Ok((session, child))
    }

    /// Unix millis, strictly increasing across the process.
    fn next_stamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let prev = self
            .inner
            .last_stamp
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(prev + 1)
    }

    /// Owns the child: waits for it to exit or kills it on request.
    fn spawn_supervisor(&self, session: Arc<TranscodeSession>, mut child: Child) {
        let manager = self.clone();
        tokio::spawn(async move {
            let stderr_reader = child.stderr.take().map(|stderr| {
                let session = session.clone();
                tokio::spawn(async move {
                    let mut lines = BufReader::new(stderr).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        session.push_stderr(line);
                    }
                })
            });

            let exited = tokio::select! {
                status = child.wait() => Some(status),
                _ = session.kill_requested() => None,
            };

            let failure = match exited {
                None => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!(session_id = %session.id(), "Failed to kill encoder: {e}");
                    }
                    tracing::debug!(session_id = %session.id(), "Encoder killed");
                    None
                }
                Some(Ok(status)) if status.success() => {
                    tracing::info!(session_id = %session.id(), "Encoder finished the whole file");
                    None
                }
                Some(_) if session.is_kill_requested() || session.is_ending() => {
                    tracing::debug!(session_id = %session.id(), "Encoder exited during teardown");
                    None
                }
                Some(Ok(status)) => Some(status.to_string()),
                Some(Err(e)) => Some(format!("wait failed: {e}")),
            };

            // Hide the dead session from joiners before waiting on stderr.
            let claimed = failure.is_some() && session.begin_teardown();
            session.mark_reaped();

            if let Some(reason) = failure {
                if let Some(reader) = stderr_reader {
                    let _ = tokio::time::timeout(STDERR_DRAIN, reader).await;
                }
                let tail = session.stderr_tail();
                tracing::error!(
                    session_id = %session.id(),
                    item_id = %session.media_item_id(),
                    stderr = %tail,
                    "Encoder exited unexpectedly ({reason})"
                );
                let message = if tail.is_empty() {
                    reason
                } else {
                    format!("{reason}: {tail}")
                };
                session.resolve(Readiness::Failed(StartFailure::EncoderExited(message)));
                if claimed {
                    manager.finish_teardown(&session).await;
                }
            }
        });
    }

    /// Polls the manifest until it is playable or the wait times out.
    fn spawn_readiness_poller(&self, session: Arc<TranscodeSession>) {
        let manager = self.clone();
        tokio::spawn(async move {
            let settings = &manager.inner.settings;
            let deadline = Instant::now() + settings.ready_timeout;
            let mut interval = tokio::time::interval(settings.ready_poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = session.kill_requested() => return,
                }
                if !session.is_pending() {
                    return;
                }

                if let Ok(text) = tokio::fs::read_to_string(session.playlist_path()).await {
                    let status = inspect_playlist(&text);
                    if status.is_ready(settings.min_ready_segments) {
                        if session.resolve(Readiness::Ready) {
                            tracing::info!(
                                session_id = %session.id(),
                                segments = status.segments,
                                ended = status.ended,
                                "Transcode session ready"
                            );
                        }
                        return;
                    }
                }

                if Instant::now() >= deadline {
                    let manifest_exists = tokio::fs::try_exists(session.playlist_path())
                        .await
                        .unwrap_or(false);
                    if manifest_exists {
                        tracing::warn!(
                            session_id = %session.id(),
                            "Readiness wait timed out; serving the partial playlist"
                        );
                        session.resolve(Readiness::Ready);
                    } else {
                        tracing::warn!(
                            session_id = %session.id(),
                            timeout = ?settings.ready_timeout,
                            "No playlist produced before timeout"
                        );
                        session.resolve(Readiness::Failed(StartFailure::StartupTimeout));
                        manager.teardown(&session).await;
                    }
                    return;
                }
            }
        });
    }

    /// Tear a session down once: kill, wait for the reap, delete the
    /// directory, then drop the map entry. Each step is best-effort.
    ///
    /// Returns `false` if another path already owns the teardown.
    async fn teardown(&self, session: &Arc<TranscodeSession>) -> bool {
        if !session.begin_teardown() {
            return false;
        }
        self.finish_teardown(session).await;
        true
    }

    /// The teardown steps after the guard has been claimed.
    async fn finish_teardown(&self, session: &Arc<TranscodeSession>) {
        session.resolve(Readiness::Aborted);
        session.request_kill();

        let kill_wait = self.inner.settings.kill_wait;
        if tokio::time::timeout(kill_wait, session.reaped()).await.is_err() {
            tracing::warn!(
                session_id = %session.id(),
                "Encoder not reaped within {kill_wait:?}; removing files anyway"
            );
        }

        match tokio::fs::remove_dir_all(session.output_dir()).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                session_id = %session.id(),
                dir = %session.output_dir().display(),
                "Failed to remove session directory: {e}"
            ),
        }

        self.inner
            .sessions
            .remove_if(&session.media_item_id(), |_, live| Arc::ptr_eq(live, session));

        tracing::info!(
            session_id = %session.id(),
            item_id = %session.media_item_id(),
            lifetime_secs = (Utc::now() - session.started_at()).num_seconds(),
            "Ended transcode session"
        );
    }

    /// Live session for `item`; refreshes its access time.
    pub fn get_session(&self, item: MediaItemId) -> Option<Arc<TranscodeSession>> {
        let session = self.inner.sessions.get(&item)?.value().clone();
        if session.is_ending() {
            return None;
        }
        session.touch();
        Some(session)
    }

    /// Status of the session for `item` without touching it.
    pub fn session_status(&self, item: MediaItemId) -> Option<SessionStatus> {
        self.inner
            .sessions
            .get(&item)
            .filter(|e| !e.value().is_ending())
            .map(|e| e.value().status())
    }

    pub fn list_sessions(&self) -> Vec<SessionStatus> {
        let mut sessions: Vec<SessionStatus> = self
            .inner
            .sessions
            .iter()
            .filter(|e| !e.value().is_ending())
            .map(|e| e.value().status())
            .collect();
        sessions.sort_by_key(|s| s.media_item_id);
        sessions
    }

    pub fn len(&self) -> usize {
        self.inner.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.sessions.is_empty()
    }

    /// Stop the session for `item`. A no-op when there is none.
    ///
    /// Returns whether this call performed the teardown.
    pub async fn kill_session(&self, item: MediaItemId) -> bool {
        let Some(session) = self.inner.sessions.get(&item).map(|e| e.value().clone()) else {
            return false;
        };
        self.teardown(&session).await
    }

    /// Tear down every session idle for longer than the idle timeout.
    pub async fn reap_idle(&self) -> usize {
        let idle_timeout = self.inner.settings.idle_timeout;
        let idle: Vec<Arc<TranscodeSession>> = self
            .inner
            .sessions
            .iter()
            .filter(|e| !e.value().is_ending() && e.value().idle_for() > idle_timeout)
            .map(|e| e.value().clone())
            .collect();

        let mut reaped = 0;
        for session in idle {
            tracing::info!(
                session_id = %session.id(),
                idle_secs = session.idle_for().as_secs(),
                "Reaping idle transcode session"
            );
            if self.teardown(&session).await {
                reaped += 1;
            }
        }
        reaped
    }

    /// Run [`TranscodeManager::reap_idle`] every reap interval until `cancel`
    /// fires.
    pub fn spawn_reaper(&self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let manager = self.clone();
        let period = self.inner.settings.reap_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Idle reaper stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        let reaped = manager.reap_idle().await;
                        if reaped > 0 {
                            tracing::info!(reaped, "Reaped idle transcode sessions");
                        }
                    }
                }
            }
        })
    }

    /// Kill every session, then remove the whole cache root.
    pub async fn cleanup_all_sessions(&self) {
        let sessions: Vec<Arc<TranscodeSession>> = self
            .inner
            .sessions
            .iter()
            .map(|e| e.value().clone())
            .collect();
        let count = sessions.len();

        futures::future::join_all(sessions.iter().map(|s| self.teardown(s))).await;

        let root = &self.inner.settings.cache_root;
        match tokio::fs::remove_dir_all(root).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                root = %root.display(),
                "Failed to remove transcode cache: {e}"
            ),
        }
        tracing::info!(sessions = count, "Transcode sessions cleaned up");
    }

    /// Current manifest text of the live session.
    pub async fn read_playlist(&self, item: MediaItemId) -> cs_core::Result<String> {
        let session = self
            .get_session(item)
            .ok_or(cs_core::Error::NoActiveSession(item))?;
        match tokio::fs::read_to_string(session.playlist_path()).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(cs_core::Error::not_found("playlist", session.id()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Open a segment of the live session for streaming.
    ///
    /// The name is validated before any filesystem access. A segment must
    /// already be listed in the manifest to be served.
    pub async fn open_segment(&self, item: MediaItemId, name: &str) -> cs_core::Result<SegmentFile> {
        validate_segment_name(name)?;

        let session = self
            .get_session(item)
            .ok_or(cs_core::Error::NoActiveSession(item))?;
        let not_found = || cs_core::Error::not_found("segment", name);

        let manifest = tokio::fs::read_to_string(session.playlist_path())
            .await
            .map_err(|_| not_found())?;
        if !lists_segment(&manifest, name) {
            return Err(not_found());
        }

        let file = File::open(session.output_dir().join(name))
            .await
            .map_err(|_| not_found())?;
        let len = file.metadata().await?.len();
        Ok(SegmentFile { file, len })
    }
}

/// Reject anything that is not a plain `seg_NNNNN.ts` name.
pub fn validate_segment_name(name: &str) -> cs_core::Result<()> {
    let traversal = name.contains('/') || name.contains('\\') || name.contains("..");
    if traversal || !SEGMENT_NAME.is_match(name) {
        return Err(cs_core::Error::InvalidSegmentRequest(name.to_string()));
    }
    Ok(())
}
