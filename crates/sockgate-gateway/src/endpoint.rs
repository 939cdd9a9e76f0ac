//! The endpoint capability surface implemented by applications.

use async_trait::async_trait;
use tracing::error;

use sockgate_core::{CloseReason, EndpointError, GatewayError};

use crate::session::Session;

/// Per-connection callback set for one endpoint.
///
/// One instance exists per connection, produced by
/// [`EndpointTemplate::connect`], so handler state never leaks across
/// connections sharing a template. Callbacks that return an error close the
/// connection with `unsupported-data` carrying the error text; they never
/// affect other connections.
#[async_trait]
pub trait SocketEndpoint: Send {
    /// Invoked once the transport is accepted, before the read loop starts.
    /// An error rejects the connection.
    async fn on_open(&mut self, session: &Session) -> Result<(), EndpointError> {
        let _ = session;
        Ok(())
    }

    /// Invoked for every inbound data frame.
    async fn on_message(&mut self, session: &Session, text: &str) -> Result<(), EndpointError>;

    /// Invoked exactly once when the session closes, with the close reason
    /// and its text. The returned error is logged and otherwise ignored.
    async fn on_close(&mut self, reason: CloseReason, text: &str) -> Result<(), EndpointError> {
        let _ = (reason, text);
        Ok(())
    }

    /// Invoked when an error is attributed to this connection, before the
    /// close-callback fires.
    async fn on_error(&mut self, session: &Session, error: &GatewayError) {
        error!(session_id = %session.id(), error = %error, "endpoint error");
    }

    /// Invoked for inbound ping control frames.
    async fn on_ping(&mut self, payload: &str) -> Result<(), EndpointError> {
        let _ = payload;
        Ok(())
    }

    /// Invoked for inbound pong control frames.
    async fn on_pong(&mut self, payload: &str) -> Result<(), EndpointError> {
        let _ = payload;
        Ok(())
    }
}

/// The registered, shared blueprint for one endpoint path.
///
/// `connect` is the per-connection isolation contract: it must return an
/// instance whose state is independent of the template and of every other
/// instance. Registration rejects templates it cannot mount, but isolation
/// itself cannot be checked at runtime; it is this trait's obligation.
pub trait EndpointTemplate: Send + Sync {
    /// Endpoint path, unique across the registry. Must start with `/`.
    fn path(&self) -> &str;

    /// Produce the callback set for one new connection.
    fn connect(&self) -> Box<dyn SocketEndpoint>;
}
