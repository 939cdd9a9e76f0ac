//! Per-connection session: owns the transport, drives the
//! open → active → closing → closed lifecycle, and exposes the write surface
//! to endpoint callbacks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use sockgate_core::{
    CloseReason, GatewayError, SessionError, TransportError, UpgradeContext, session_id,
};

use crate::connections::ConnectionTable;
use crate::endpoint::{EndpointTemplate, SocketEndpoint};
use crate::transport::{ControlFrame, Frame, FrameSink, FrameStream, PayloadKind};

/// Lifecycle states of a session. `Closed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport accepted, open-callback not yet returned.
    Open,
    /// Open succeeded; read loop and keepalive are running.
    Active,
    /// A close has been initiated by exactly one trigger.
    Closing,
    /// Transport released, session deregistered, keepalive stopped.
    Closed,
}

/// One accepted, upgraded, bidirectional streaming connection.
///
/// The session exclusively owns its transport: every write is funneled
/// through the per-session sink lock, and the close transition is guarded by
/// a compare-and-set so that exactly one of the read loop, the keepalive
/// supervisor, an application error, and an external interrupt performs the
/// actual release. Every public operation on a closing or closed session is
/// a no-op returning success.
pub struct Session {
    id: String,
    context: UpgradeContext,
    endpoint: Mutex<Box<dyn SocketEndpoint>>,
    sink: Mutex<Box<dyn FrameSink>>,
    closing: AtomicBool,
    state: watch::Sender<SessionState>,
    table: Weak<ConnectionTable>,
    control_deadline: Duration,
}

impl Session {
    /// Opaque session identifier, stable for the session's lifetime.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The execution context bound at upgrade time.
    pub fn context(&self) -> &UpgradeContext {
        &self.context
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Subscribe to lifecycle transitions.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Whether the close transition has begun. Public operations no-op from
    /// that point on.
    pub fn is_closed(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Write one data frame. No-op success once the session is closing.
    pub async fn write_message(
        &self,
        kind: PayloadKind,
        payload: Vec<u8>,
    ) -> Result<(), SessionError> {
        if self.is_closed() {
            return Ok(());
        }
        let frame = match kind {
            PayloadKind::Text => Frame::Text(String::from_utf8_lossy(&payload).into_owned()),
            PayloadKind::Binary => Frame::Binary(payload),
        };
        self.send_frame(frame).await
    }

    /// Write a text frame.
    pub async fn write_text(&self, text: impl Into<String>) -> Result<(), SessionError> {
        if self.is_closed() {
            return Ok(());
        }
        self.send_frame(Frame::Text(text.into())).await
    }

    /// Serialize `value` as JSON and write it as a text frame.
    pub async fn write_json<T: Serialize>(&self, value: &T) -> Result<(), SessionError> {
        if self.is_closed() {
            return Ok(());
        }
        let text = serde_json::to_string(value)
            .map_err(|err| SessionError::Serialization(err.to_string()))?;
        self.send_frame(Frame::Text(text)).await
    }

    /// Write a control frame with a bounded send deadline. A timed-out send
    /// reports [`TransportError::SendTimeout`]; a closing session no-ops.
    pub async fn write_control(
        &self,
        frame: ControlFrame,
        deadline: Duration,
    ) -> Result<(), SessionError> {
        if self.is_closed() {
            return Ok(());
        }
        let mut sink = self.sink.lock().await;
        match tokio::time::timeout(deadline, sink.send(frame.into())).await {
            Ok(result) => result.map_err(SessionError::from),
            Err(_) => Err(SessionError::Transport(TransportError::SendTimeout(
                deadline,
            ))),
        }
    }

    /// Externally interrupt the session (shutdown coordinator, keepalive
    /// failure). With an error: report it, close with `internal-server-error`
    /// carrying the error text. Without: close with `normal-closure`.
    /// Meaningful at most once; later calls no-op.
    pub async fn interrupt(&self, error: Option<GatewayError>) {
        if !self.try_begin_close() {
            return;
        }
        match error {
            Some(err) => {
                let text = err.to_string();
                self.finish_close(CloseReason::InternalError, &text, Some(err))
                    .await;
            }
            None => self.finish_close(CloseReason::Normal, "", None).await,
        }
    }

    /// Run the open-callback. On failure the session closes with
    /// `unsupported-data` and the caller must not start the read loop.
    pub(crate) async fn open(&self) -> bool {
        let result = { self.endpoint.lock().await.on_open(self).await };
        match result {
            Ok(()) => {
                self.state.send_replace(SessionState::Active);
                true
            }
            Err(err) => {
                if self.try_begin_close() {
                    let text = err.to_string();
                    self.finish_close(
                        CloseReason::UnsupportedData,
                        &text,
                        Some(GatewayError::Endpoint(err)),
                    )
                    .await;
                }
                false
            }
        }
    }

    /// Drive the session until the transport finishes or a close trigger
    /// wins. Owns the read half; the session keeps the write half.
    pub(crate) async fn read_loop(&self, mut stream: Box<dyn FrameStream>) {
        loop {
            match stream.next_frame().await {
                Some(Ok(Frame::Text(text))) => {
                    if !self.dispatch_message(&text).await {
                        return;
                    }
                }
                Some(Ok(Frame::Binary(payload))) => {
                    let text = String::from_utf8_lossy(&payload).into_owned();
                    if !self.dispatch_message(&text).await {
                        return;
                    }
                }
                Some(Ok(Frame::Ping(payload))) => {
                    let payload = String::from_utf8_lossy(&payload).into_owned();
                    let result = { self.endpoint.lock().await.on_ping(&payload).await };
                    if let Err(err) = result {
                        self.fail_with_endpoint_error(err).await;
                        return;
                    }
                }
                Some(Ok(Frame::Pong(payload))) => {
                    let payload = String::from_utf8_lossy(&payload).into_owned();
                    let result = { self.endpoint.lock().await.on_pong(&payload).await };
                    if let Err(err) = result {
                        self.fail_with_endpoint_error(err).await;
                        return;
                    }
                }
                Some(Ok(Frame::Close { .. })) | None => {
                    // Remote closed, or the transport finished after another
                    // trigger released it.
                    if self.try_begin_close() {
                        self.finish_close(CloseReason::Normal, "", None).await;
                    }
                    return;
                }
                Some(Err(err)) => {
                    if self.try_begin_close() {
                        let text = err.to_string();
                        self.finish_close(
                            CloseReason::UnsupportedData,
                            &text,
                            Some(GatewayError::Transport(err)),
                        )
                        .await;
                    }
                    return;
                }
            }
            if self.is_closed() {
                return;
            }
        }
    }

    /// Force-release a session that missed the shutdown deadline. If no
    /// other trigger ever won the close race the session is torn down with
    /// `abnormal-closure`; if a teardown won the race but stalled, the
    /// transport is reclaimed with a bounded release, the table entry is
    /// dropped, and the terminal state is published anyway so waiters are
    /// not left hanging.
    pub(crate) async fn force_release(&self) {
        if self.try_begin_close() {
            self.state.send_replace(SessionState::Closing);
            match self.endpoint.try_lock() {
                Ok(mut endpoint) => {
                    let _ = endpoint
                        .on_close(CloseReason::AbnormalClosure, "forced shutdown")
                        .await;
                }
                Err(_) => {
                    // A callback still holds the endpoint lock; waiting on it
                    // could block shutdown indefinitely.
                    warn!(
                        session_id = %self.id,
                        "endpoint busy during forced shutdown, skipping close callback"
                    );
                }
            }
            self.reclaim_transport().await;
            self.deregister().await;
            self.state.send_replace(SessionState::Closed);
        } else {
            warn!(session_id = %self.id, "teardown stalled, releasing session forcibly");
            self.reclaim_transport().await;
            self.deregister().await;
            self.state.send_replace(SessionState::Closed);
        }
    }

    /// Bounded transport release for the forced path; a stuck writer may
    /// hold the sink lock forever.
    async fn reclaim_transport(&self) {
        if tokio::time::timeout(self.control_deadline, self.release_transport())
            .await
            .is_err()
        {
            warn!(session_id = %self.id, "transport release timed out during forced shutdown");
        }
    }

    async fn dispatch_message(&self, text: &str) -> bool {
        let result = { self.endpoint.lock().await.on_message(self, text).await };
        if let Err(err) = result {
            self.fail_with_endpoint_error(err).await;
            return false;
        }
        true
    }

    async fn fail_with_endpoint_error(&self, err: sockgate_core::EndpointError) {
        if self.try_begin_close() {
            let text = err.to_string();
            self.finish_close(
                CloseReason::UnsupportedData,
                &text,
                Some(GatewayError::Endpoint(err)),
            )
            .await;
        }
    }

    /// Compare-and-set on the closing flag; exactly one caller wins.
    fn try_begin_close(&self) -> bool {
        self.closing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Teardown performed by the single close winner: report the error (if
    /// any), send the close frame, fire the close-callback, release the
    /// transport, deregister, and publish `Closed`.
    async fn finish_close(&self, reason: CloseReason, text: &str, error: Option<GatewayError>) {
        self.state.send_replace(SessionState::Closing);
        if let Some(err) = &error {
            let mut endpoint = self.endpoint.lock().await;
            endpoint.on_error(self, err).await;
        }
        self.send_close_frame(reason, text).await;
        {
            let mut endpoint = self.endpoint.lock().await;
            let _ = endpoint.on_close(reason, text).await;
        }
        self.release_transport().await;
        self.deregister().await;
        self.state.send_replace(SessionState::Closed);
        info!(session_id = %self.id, reason = %reason, "session closed");
    }

    async fn send_frame(&self, frame: Frame) -> Result<(), SessionError> {
        let mut sink = self.sink.lock().await;
        sink.send(frame).await.map_err(SessionError::from)
    }

    /// Best-effort close frame; the peer may already be gone.
    async fn send_close_frame(&self, reason: CloseReason, text: &str) {
        let frame = Frame::Close {
            reason,
            text: text.to_owned(),
        };
        let mut sink = self.sink.lock().await;
        if tokio::time::timeout(self.control_deadline, sink.send(frame))
            .await
            .is_err()
        {
            debug!(session_id = %self.id, "close frame send timed out");
        }
    }

    async fn release_transport(&self) {
        let mut sink = self.sink.lock().await;
        sink.close().await;
    }

    async fn deregister(&self) {
        if let Some(table) = self.table.upgrade() {
            table.remove(&self.id).await;
        }
    }
}

/// Produces one [`Session`] per accepted, upgraded transport.
pub(crate) struct SessionFactory;

impl SessionFactory {
    /// Instantiate the endpoint's per-connection callback set, generate the
    /// session id, bind the upgrade context, and insert the session into the
    /// connection table.
    pub(crate) async fn create(
        sink: Box<dyn FrameSink>,
        template: &dyn EndpointTemplate,
        context: Option<UpgradeContext>,
        table: &Arc<ConnectionTable>,
        control_deadline: Duration,
    ) -> Result<Arc<Session>, SessionError> {
        let context = context.ok_or(SessionError::ContextMissing)?;
        let id = session_id::generate(&context);
        let endpoint = template.connect();
        let (state, _) = watch::channel(SessionState::Open);
        let session = Arc::new(Session {
            id,
            context,
            endpoint: Mutex::new(endpoint),
            sink: Mutex::new(sink),
            closing: AtomicBool::new(false),
            state,
            table: Arc::downgrade(table),
            control_deadline,
        });
        table.insert(session.clone()).await;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{RecordingTemplate, test_context};
    use crate::transport::mock::{MockSink, MockStream};

    const DEADLINE: Duration = Duration::from_secs(3);

    async fn make_session(
        template: &RecordingTemplate,
    ) -> (
        Arc<Session>,
        Arc<ConnectionTable>,
        Arc<std::sync::Mutex<Vec<Frame>>>,
    ) {
        let (sink, frames, _) = MockSink::new();
        let table = Arc::new(ConnectionTable::new());
        let session = SessionFactory::create(
            Box::new(sink),
            template,
            Some(test_context()),
            &table,
            DEADLINE,
        )
        .await
        .unwrap();
        (session, table, frames)
    }

    #[tokio::test]
    async fn missing_context_fails_session_creation() {
        let template = RecordingTemplate::new("/echo");
        let (sink, _, _) = MockSink::new();
        let table = Arc::new(ConnectionTable::new());
        let result =
            SessionFactory::create(Box::new(sink), &template, None, &table, DEADLINE).await;
        assert!(matches!(result, Err(SessionError::ContextMissing)));
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn creation_registers_the_session() {
        let template = RecordingTemplate::new("/echo");
        let (session, table, _) = make_session(&template).await;
        assert_eq!(table.len().await, 1);
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(session.id().len(), 64);
    }

    #[tokio::test]
    async fn data_writes_reach_the_sink() {
        let template = RecordingTemplate::new("/echo");
        let (session, _table, frames) = make_session(&template).await;
        assert!(session.open().await);

        session
            .write_message(PayloadKind::Text, b"alpha".to_vec())
            .await
            .unwrap();
        session
            .write_message(PayloadKind::Binary, b"beta".to_vec())
            .await
            .unwrap();
        session.write_text("gamma").await.unwrap();
        session
            .write_json(&serde_json::json!({"seq": 1}))
            .await
            .unwrap();

        let frames = frames.lock().unwrap();
        assert_eq!(frames[0], Frame::Text("alpha".to_string()));
        assert_eq!(frames[1], Frame::Binary(b"beta".to_vec()));
        assert_eq!(frames[2], Frame::Text("gamma".to_string()));
        assert_eq!(frames[3], Frame::Text("{\"seq\":1}".to_string()));
    }

    #[tokio::test]
    async fn open_failure_rejects_the_connection() {
        let template = RecordingTemplate::new("/echo").with_open_error("bad-auth");
        let (session, table, frames) = make_session(&template).await;

        assert!(!session.open().await);

        assert_eq!(session.state(), SessionState::Closed);
        assert!(table.is_empty().await);
        let frames = frames.lock().unwrap();
        assert!(frames.contains(&Frame::Close {
            reason: CloseReason::UnsupportedData,
            text: "bad-auth".to_string(),
        }));
        let events = template.events();
        assert!(events.iter().any(|e| e == "error:bad-auth"));
        assert!(events.contains(&"close:unsupported-data:bad-auth".to_string()));
    }

    #[tokio::test]
    async fn writes_after_close_are_noops() {
        let template = RecordingTemplate::new("/echo");
        let (sink, frames, released) = MockSink::new();
        let table = Arc::new(ConnectionTable::new());
        let session = SessionFactory::create(
            Box::new(sink),
            &template,
            Some(test_context()),
            &table,
            DEADLINE,
        )
        .await
        .unwrap();
        assert!(session.open().await);

        session.interrupt(None).await;
        assert_eq!(session.state(), SessionState::Closed);
        assert!(released.load(std::sync::atomic::Ordering::SeqCst));
        let frames_before = frames.lock().unwrap().len();

        session
            .write_message(PayloadKind::Text, b"late".to_vec())
            .await
            .unwrap();
        session.write_text("late").await.unwrap();
        session
            .write_control(ControlFrame::Ping(Vec::new()), DEADLINE)
            .await
            .unwrap();
        session.write_json(&serde_json::json!({"late": true})).await.unwrap();
        session.interrupt(None).await;

        assert_eq!(frames.lock().unwrap().len(), frames_before);
    }

    #[tokio::test]
    async fn close_callback_fires_exactly_once_under_interrupt_storm() {
        let template = RecordingTemplate::new("/echo");
        let (session, table, _) = make_session(&template).await;
        assert!(session.open().await);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let session = session.clone();
            handles.push(tokio::spawn(async move {
                session.interrupt(None).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let events = template.events();
        let closes = events.iter().filter(|e| e.starts_with("close:")).count();
        assert_eq!(closes, 1);
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn remote_close_reports_normal_closure() {
        let template = RecordingTemplate::new("/echo");
        let (session, table, frames) = make_session(&template).await;
        assert!(session.open().await);

        let (tx, stream) = MockStream::new();
        tx.send(Ok(Frame::Close {
            reason: CloseReason::Normal,
            text: String::new(),
        }))
        .unwrap();
        session.read_loop(Box::new(stream)).await;

        assert_eq!(session.state(), SessionState::Closed);
        assert!(table.is_empty().await);
        assert!(template.events().contains(&"close:normal-closure:".to_string()));
        assert!(frames.lock().unwrap().iter().any(|f| matches!(
            f,
            Frame::Close {
                reason: CloseReason::Normal,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn message_error_closes_with_unsupported_data() {
        let template = RecordingTemplate::new("/echo").with_message_error("cannot-handle");
        let (session, table, frames) = make_session(&template).await;
        assert!(session.open().await);

        let (tx, stream) = MockStream::new();
        tx.send(Ok(Frame::Text("hello".to_string()))).unwrap();
        session.read_loop(Box::new(stream)).await;

        assert!(table.is_empty().await);
        let events = template.events();
        assert!(events.contains(&"message:hello".to_string()));
        assert!(events.iter().any(|e| e == "error:cannot-handle"));
        assert!(events.contains(&"close:unsupported-data:cannot-handle".to_string()));
        assert!(frames.lock().unwrap().contains(&Frame::Close {
            reason: CloseReason::UnsupportedData,
            text: "cannot-handle".to_string(),
        }));
    }

    #[tokio::test]
    async fn read_error_closes_with_unsupported_data_and_error_text() {
        let template = RecordingTemplate::new("/echo");
        let (session, table, _) = make_session(&template).await;
        assert!(session.open().await);

        let (tx, stream) = MockStream::new();
        tx.send(Err(TransportError::Io("connection reset".to_string())))
            .unwrap();
        session.read_loop(Box::new(stream)).await;

        assert!(table.is_empty().await);
        let events = template.events();
        assert!(
            events
                .iter()
                .any(|e| e.starts_with("close:unsupported-data:") && e.contains("connection reset"))
        );
    }

    #[tokio::test]
    async fn echo_endpoint_writes_before_close() {
        let template = RecordingTemplate::new("/echo").echoing();
        let (session, _table, frames) = make_session(&template).await;
        assert!(session.open().await);

        let (tx, stream) = MockStream::new();
        tx.send(Ok(Frame::Text("ping".to_string()))).unwrap();
        drop(tx);
        session.read_loop(Box::new(stream)).await;

        let frames = frames.lock().unwrap();
        assert_eq!(frames.first(), Some(&Frame::Text("ping".to_string())));
        assert!(matches!(frames.last(), Some(Frame::Close { .. })));
    }

    #[tokio::test]
    async fn binary_frames_reach_the_message_callback() {
        let template = RecordingTemplate::new("/echo");
        let (session, _table, _) = make_session(&template).await;
        assert!(session.open().await);

        let (tx, stream) = MockStream::new();
        tx.send(Ok(Frame::Binary(b"blob".to_vec()))).unwrap();
        drop(tx);
        session.read_loop(Box::new(stream)).await;

        assert!(template.events().contains(&"message:blob".to_string()));
    }

    #[tokio::test]
    async fn interrupt_with_error_uses_internal_error_reason() {
        let template = RecordingTemplate::new("/echo");
        let (session, table, frames) = make_session(&template).await;
        assert!(session.open().await);

        session
            .interrupt(Some(GatewayError::Transport(TransportError::Io(
                "keepalive failed".to_string(),
            ))))
            .await;

        assert!(table.is_empty().await);
        let events = template.events();
        assert!(events.iter().any(|e| e.starts_with("error:")));
        assert!(
            events
                .iter()
                .any(|e| e.starts_with("close:internal-server-error:"))
        );
        assert!(frames.lock().unwrap().iter().any(|f| matches!(
            f,
            Frame::Close {
                reason: CloseReason::InternalError,
                ..
            }
        )));
    }
}
