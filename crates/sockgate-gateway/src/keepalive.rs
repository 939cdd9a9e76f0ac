//! Keepalive supervisor: one task per session emitting periodic pings.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use sockgate_core::GatewayError;

use crate::session::{Session, SessionState};
use crate::transport::ControlFrame;

/// Spawn the keepalive task for `session`.
///
/// Every `interval` the task sends a ping bounded by `deadline`. A failed or
/// timed-out ping is a liveness verdict: the session is interrupted with the
/// failure and the task ends. The task also ends on its own as soon as the
/// session starts closing, so it never outlives the connection.
pub(crate) fn spawn(
    session: Arc<Session>,
    interval: Duration,
    deadline: Duration,
) -> JoinHandle<()> {
    let mut state = session.watch_state();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately; the ping cadence starts one
        // interval after the session is established.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = session
                        .write_control(ControlFrame::Ping(Vec::new()), deadline)
                        .await
                    {
                        warn!(session_id = %session.id(), error = %err, "keepalive ping failed");
                        session.interrupt(Some(GatewayError::Session(err))).await;
                        return;
                    }
                    debug!(session_id = %session.id(), "keepalive ping sent");
                }
                changed = state.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let current = *state.borrow_and_update();
                    if matches!(current, SessionState::Closing | SessionState::Closed) {
                        return;
                    }
                }
            }
        }
    })
}
