//! A single live transcode session.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use cs_core::MediaItemId;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Encoder stderr lines kept for failure reports.
const STDERR_TAIL_LINES: usize = 20;

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Encoder running, manifest not yet playable.
    Starting,
    Ready,
    /// Being torn down; invisible to lookups.
    Ending,
}

/// Snapshot of a session for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub media_item_id: MediaItemId,
    pub state: SessionState,
    pub start_seconds: f64,
    pub started_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StartFailure {
    StartupTimeout,
    EncoderExited(String),
}

/// One-shot readiness outcome broadcast to every waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Readiness {
    Pending,
    Ready,
    Failed(StartFailure),
    /// Torn down before readiness resolved.
    Aborted,
}

/// A live transcode for one media item.
///
/// Shared as `Arc<TranscodeSession>` between the manager map, the encoder
/// supervisor, the readiness poller and request handlers. The encoder child
/// itself is owned by the supervisor task; everyone else signals it through
/// the kill token.
#[derive(Debug)]
pub struct TranscodeSession {
    id: String,
    media_item_id: MediaItemId,
    output_dir: PathBuf,
    playlist_path: PathBuf,
    start_seconds: f64,
    started_at: DateTime<Utc>,
    last_accessed_ms: AtomicI64,
    readiness: watch::Sender<Readiness>,
    ending: AtomicBool,
    kill: CancellationToken,
    reaped: CancellationToken,
    stderr_tail: Mutex<VecDeque<String>>,
}

impl TranscodeSession {
    pub(crate) fn new(
        id: String,
        media_item_id: MediaItemId,
        output_dir: PathBuf,
        playlist_path: PathBuf,
        start_seconds: f64,
    ) -> Self {
        let started_at = Utc::now();
        let (readiness, _) = watch::channel(Readiness::Pending);
        Self {
            id,
            media_item_id,
            output_dir,
            playlist_path,
            start_seconds,
            started_at,
            last_accessed_ms: AtomicI64::new(started_at.timestamp_millis()),
            readiness,
            ending: AtomicBool::new(false),
            kill: CancellationToken::new(),
            reaped: CancellationToken::new(),
            stderr_tail: Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn media_item_id(&self) -> MediaItemId {
        self.media_item_id
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn playlist_path(&self) -> &Path {
        &self.playlist_path
    }

    pub fn start_seconds(&self) -> f64 {
        self.start_seconds
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        let ms = self.last_accessed_ms.load(Ordering::Relaxed);
        Utc.timestamp_millis_opt(ms).single().unwrap_or(self.started_at)
    }

    /// Refresh the idle clock.
    pub fn touch(&self) {
        self.last_accessed_ms
            .fetch_max(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Time since the last join or segment fetch.
    pub fn idle_for(&self) -> Duration {
        let last = self.last_accessed_ms.load(Ordering::Relaxed);
        let idle_ms = Utc::now().timestamp_millis().saturating_sub(last).max(0);
        Duration::from_millis(idle_ms as u64)
    }

    pub fn is_ending(&self) -> bool {
        self.ending.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SessionState {
        if self.is_ending() {
            return SessionState::Ending;
        }
        match *self.readiness.borrow() {
            Readiness::Ready => SessionState::Ready,
            Readiness::Pending => SessionState::Starting,
            Readiness::Failed(_) | Readiness::Aborted => SessionState::Ending,
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.id.clone(),
            media_item_id: self.media_item_id,
            state: self.state(),
            start_seconds: self.start_seconds,
            started_at: self.started_at,
            last_accessed_at: self.last_accessed_at(),
        }
    }

    /// Wait until the session is playable.
    ///
    /// Any number of callers may wait; all observe the same outcome.
    pub async fn wait_ready(&self) -> cs_core::Result<()> {
        let mut rx = self.readiness.subscribe();
        let outcome = rx
            .wait_for(|r| *r != Readiness::Pending)
            .await
            .map(|r| r.clone())
            .unwrap_or(Readiness::Aborted);

        match outcome {
            Readiness::Ready => Ok(()),
            Readiness::Failed(StartFailure::StartupTimeout) => Err(cs_core::Error::StartupTimeout {
                session_id: self.id.clone(),
            }),
            Readiness::Failed(StartFailure::EncoderExited(message)) => {
                Err(cs_core::Error::EncoderFatal {
                    session_id: self.id.clone(),
                    message,
                })
            }
            Readiness::Pending | Readiness::Aborted => {
                Err(cs_core::Error::NoActiveSession(self.media_item_id))
            }
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        *self.readiness.borrow() == Readiness::Pending
    }

    /// Resolve readiness once; later calls are ignored.
    pub(crate) fn resolve(&self, outcome: Readiness) -> bool {
        self.readiness.send_if_modified(|current| {
            if *current == Readiness::Pending {
                *current = outcome;
                true
            } else {
                false
            }
        })
    }

    /// Claim the teardown. Returns `false` if another path already did.
    pub(crate) fn begin_teardown(&self) -> bool {
        !self.ending.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn request_kill(&self) {
        self.kill.cancel();
    }

    pub(crate) fn kill_requested(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.kill.cancelled()
    }

    pub(crate) fn is_kill_requested(&self) -> bool {
        self.kill.is_cancelled()
    }

    pub(crate) fn mark_reaped(&self) {
        self.reaped.cancel();
    }

    pub(crate) fn reaped(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.reaped.cancelled()
    }

    pub(crate) fn push_stderr(&self, line: String) {
        let mut tail = self.stderr_tail.lock();
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    pub(crate) fn stderr_tail(&self) -> String {
        let tail = self.stderr_tail.lock();
        tail.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}
