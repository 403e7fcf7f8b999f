//! Registry of active monitoring sessions.
//!
//! All session state lives in one map behind a single mutex. The lock is only
//! held for map and tracker bookkeeping, never across an `.await`, so request
//! handlers and monitoring loops contend only for short critical sections.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::fetch::{HttpFetcher, ManifestLoader, SegmentProbe};
use crate::manifest::{ManifestResolver, SegmentCandidate};
use crate::monitor;
use crate::resolve::validate_manifest_url;
use crate::tracker::{SegmentStatus, SegmentTracker};

struct Session {
    manifest_url: String,
    /// Distinguishes this session from earlier ones started under the same id.
    generation: u64,
    cancel: CancellationToken,
    tracker: SegmentTracker,
    task: JoinHandle<()>,
}

impl Session {
    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && !self.cancel.is_cancelled()
    }
}

/// State shared between the store handle and every monitoring loop.
pub(crate) struct SessionShared {
    sessions: Mutex<HashMap<String, Session>>,
    next_generation: AtomicU64,
    shutdown: CancellationToken,
    pub(crate) resolver: ManifestResolver,
    pub(crate) prober: Arc<dyn SegmentProbe>,
    pub(crate) config: MonitorConfig,
}

impl SessionShared {
    /// Filter `candidates` against the session's seen-set.
    ///
    /// Returns `None` when the session was stopped or replaced.
    pub(crate) fn unseen_candidates(
        &self,
        session_id: &str,
        generation: u64,
        candidates: Vec<SegmentCandidate>,
    ) -> Option<Vec<SegmentCandidate>> {
        let sessions = self.sessions.lock();
        let session = sessions.get(session_id).filter(|s| s.is_current(generation))?;
        Some(session.tracker.unseen(candidates))
    }

    /// Merge one tick's statuses into the session's history.
    ///
    /// Returns `None` when the session was stopped or replaced while the tick
    /// was probing; the statuses are dropped in that case.
    pub(crate) fn merge_statuses(
        &self,
        session_id: &str,
        generation: u64,
        staged: Vec<SegmentStatus>,
    ) -> Option<usize> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(session_id)
            .filter(|s| s.is_current(generation))?;
        Some(session.tracker.merge(staged))
    }
}

/// Concurrency-safe handle to the session registry. Cheap to clone.
#[derive(Clone)]
pub struct SessionStore {
    shared: Arc<SessionShared>,
}

impl SessionStore {
    pub fn new(
        loader: Arc<dyn ManifestLoader>,
        prober: Arc<dyn SegmentProbe>,
        config: MonitorConfig,
    ) -> Self {
        let config = config.normalized();
        Self {
            shared: Arc::new(SessionShared {
                sessions: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
                shutdown: CancellationToken::new(),
                resolver: ManifestResolver::new(loader, &config),
                prober,
                config,
            }),
        }
    }

    /// Store that fetches manifests and probes segments over HTTP.
    pub fn with_http(fetcher: HttpFetcher, config: MonitorConfig) -> Self {
        let fetcher = Arc::new(fetcher);
        Self::new(fetcher.clone(), fetcher, config)
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.shared.config
    }

    /// Start monitoring `manifest_url` under `session_id`.
    ///
    /// An existing session with the same id is cancelled and replaced by a
    /// fresh one with empty history. Fails with [`MonitorError::ShutDown`]
    /// once [`shutdown`](Self::shutdown) has run. Must be called from within
    /// a Tokio runtime.
    pub fn start(&self, session_id: &str, manifest_url: &str) -> Result<()> {
        validate_manifest_url(manifest_url)?;
        if self.shared.shutdown.is_cancelled() {
            warn!(session_id = %session_id, "Rejecting start after shutdown");
            return Err(MonitorError::ShutDown);
        }

        let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = self.shared.shutdown.child_token();

        let mut sessions = self.shared.sessions.lock();
        if let Some(previous) = sessions.remove(session_id) {
            previous.cancel.cancel();
            info!(
                session_id = %session_id,
                previous_url = %previous.manifest_url,
                "Replacing existing monitoring session"
            );
        }

        let task = tokio::spawn(monitor::run(
            Arc::clone(&self.shared),
            session_id.to_string(),
            generation,
            manifest_url.to_string(),
            cancel.clone(),
        ));

        sessions.insert(
            session_id.to_string(),
            Session {
                manifest_url: manifest_url.to_string(),
                generation,
                cancel,
                tracker: SegmentTracker::new(self.shared.config.history_capacity),
                task,
            },
        );
        drop(sessions);

        info!(session_id = %session_id, url = %manifest_url, "Monitoring started");
        Ok(())
    }

    /// Stop and forget a session. Unknown ids are ignored.
    ///
    /// Returns whether a session was removed.
    pub fn stop(&self, session_id: &str) -> bool {
        let removed = self.shared.sessions.lock().remove(session_id);
        match removed {
            Some(session) => {
                session.cancel.cancel();
                info!(
                    session_id = %session_id,
                    url = %session.manifest_url,
                    "Monitoring stopped"
                );
                true
            }
            None => {
                debug!(session_id = %session_id, "Stop requested for unknown session");
                false
            }
        }
    }

    /// Copy of the session's current history, oldest first.
    pub fn snapshot(&self, session_id: &str) -> Result<Vec<SegmentStatus>> {
        self.shared
            .sessions
            .lock()
            .get(session_id)
            .map(|session| session.tracker.snapshot())
            .ok_or_else(|| MonitorError::not_found(session_id))
    }

    /// Manifest URL a session is monitoring.
    pub fn manifest_url(&self, session_id: &str) -> Option<String> {
        self.shared
            .sessions
            .lock()
            .get(session_id)
            .map(|session| session.manifest_url.clone())
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.shared.sessions.lock().contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.shared.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.shared.sessions.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Cancel every session and wait for their loops to exit.
    pub async fn shutdown(&self) {
        self.shared.shutdown.cancel();
        let drained: Vec<(String, Session)> = self.shared.sessions.lock().drain().collect();
        let count = drained.len();

        for (session_id, session) in drained {
            session.cancel.cancel();
            if let Err(e) = session.task.await {
                debug!(session_id = %session_id, error = %e, "Monitoring task ended abnormally");
            }
        }

        info!(sessions = count, "All monitoring sessions shut down");
    }
}
