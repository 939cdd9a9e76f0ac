//! Concurrent connection table and the coordinated-shutdown path.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::session::{Session, SessionState};

/// Live sessions keyed by session id.
///
/// A session id is present exactly while its session has not completed the
/// close transition; sessions deregister themselves as the final step of
/// teardown. Snapshots are point-in-time copies and never block writers for
/// longer than the clone.
pub struct ConnectionTable {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

/// Outcome of a coordinated shutdown pass.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Sessions that completed their own teardown within the deadline.
    pub drained: usize,
    /// Ids of sessions that had to be force-released.
    pub forced: Vec<String>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) async fn insert(&self, session: Arc<Session>) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id().to_owned(), session);
    }

    pub(crate) async fn remove(&self, id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id);
    }

    /// Point-in-time copy of the live sessions.
    pub async fn snapshot(&self) -> Vec<Arc<Session>> {
        let sessions = self.sessions.read().await;
        sessions.values().cloned().collect()
    }

    /// Look up one live session by id.
    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        let sessions = self.sessions.read().await;
        sessions.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        let sessions = self.sessions.read().await;
        sessions.is_empty()
    }

    /// Interrupt every live session and wait up to `deadline` for each to
    /// finish its own teardown; stragglers are force-released so the table
    /// is empty when this returns. Sessions arriving after the snapshot are
    /// left to a later pass, which makes repeated calls safe.
    pub async fn shutdown(&self, deadline: Duration) -> ShutdownReport {
        let sessions = self.snapshot().await;
        if sessions.is_empty() {
            return ShutdownReport::default();
        }
        info!(sessions = sessions.len(), "draining live sessions");

        let mut handles = Vec::with_capacity(sessions.len());
        for session in sessions {
            handles.push(tokio::spawn(async move {
                let mut state = session.watch_state();
                // The interrupt itself is raced against the deadline: a
                // teardown stuck in a callback would otherwise block this
                // task before the wait below ever starts.
                let interrupted = tokio::time::timeout(deadline, session.interrupt(None))
                    .await
                    .is_ok();
                let drained = interrupted
                    && tokio::time::timeout(
                        deadline,
                        state.wait_for(|state| *state == SessionState::Closed),
                    )
                    .await
                    .is_ok();
                if !drained {
                    warn!(session_id = %session.id(), "session missed the shutdown deadline");
                    session.force_release().await;
                }
                (session.id().to_owned(), drained)
            }));
        }

        let mut report = ShutdownReport::default();
        for handle in handles {
            match handle.await {
                Ok((_, true)) => report.drained += 1,
                Ok((id, false)) => report.forced.push(id),
                Err(err) => warn!(error = %err, "shutdown worker panicked"),
            }
        }
        info!(
            drained = report.drained,
            forced = report.forced.len(),
            "shutdown pass complete"
        );
        report
    }
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self::new()
    }
}
