//! Frame-level transport seam.
//!
//! The session state machine talks to [`FrameSink`]/[`FrameStream`] rather
//! than to a concrete socket so the lifecycle can be exercised without a
//! network. The axum implementation lives here too.

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};

use sockgate_core::{CloseReason, TransportError};

/// One WebSocket frame as the session sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close { reason: CloseReason, text: String },
}

/// Payload kind for the data-frame write surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Text,
    Binary,
}

/// Out-of-band control frames accepted by the control write surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlFrame {
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close { reason: CloseReason, text: String },
}

impl From<ControlFrame> for Frame {
    fn from(frame: ControlFrame) -> Self {
        match frame {
            ControlFrame::Ping(payload) => Frame::Ping(payload),
            ControlFrame::Pong(payload) => Frame::Pong(payload),
            ControlFrame::Close { reason, text } => Frame::Close { reason, text },
        }
    }
}

/// Write half of a session transport. Callers must serialize access; the
/// session guards its sink with a per-session lock.
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Release the transport. Idempotent; errors are swallowed because the
    /// peer may already be gone.
    async fn close(&mut self);
}

/// Read half of a session transport.
#[async_trait]
pub trait FrameStream: Send {
    /// Next inbound frame; `None` once the transport is finished.
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>>;
}

/// Split an upgraded axum socket into the gateway's transport halves.
pub(crate) fn split_socket(socket: WebSocket) -> (WsSink, WsStream) {
    let (sink, stream) = socket.split();
    (WsSink { sink }, WsStream { stream })
}

pub(crate) struct WsSink {
    sink: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let message = match frame {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(payload) => Message::Binary(payload.into()),
            Frame::Ping(payload) => Message::Ping(payload.into()),
            Frame::Pong(payload) => Message::Pong(payload.into()),
            Frame::Close { reason, text } => Message::Close(Some(CloseFrame {
                code: reason.code(),
                reason: text.into(),
            })),
        };
        self.sink
            .send(message)
            .await
            .map_err(|err| TransportError::Io(err.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.sink.close().await;
    }
}

pub(crate) struct WsStream {
    stream: SplitStream<WebSocket>,
}

#[async_trait]
impl FrameStream for WsStream {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        let message = self.stream.next().await?;
        let frame = match message {
            Ok(Message::Text(text)) => Frame::Text(text.as_str().to_owned()),
            Ok(Message::Binary(payload)) => Frame::Binary(payload.to_vec()),
            Ok(Message::Ping(payload)) => Frame::Ping(payload.to_vec()),
            Ok(Message::Pong(payload)) => Frame::Pong(payload.to_vec()),
            Ok(Message::Close(frame)) => {
                let (reason, text) = frame
                    .map(|f| (CloseReason::from_code(f.code), f.reason.as_str().to_owned()))
                    .unwrap_or((CloseReason::Normal, String::new()));
                Frame::Close { reason, text }
            }
            Err(err) => return Some(Err(TransportError::Io(err.to_string()))),
        };
        Some(Ok(frame))
    }
}
