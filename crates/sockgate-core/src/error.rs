//! Error taxonomy for gateway operations.
//!
//! Each failure domain gets its own enum; [`GatewayError`] is the umbrella
//! type handed to endpoint error-callbacks so one callback signature covers
//! registration, session, transport, and application failures.

use std::time::Duration;

/// Top-level error for gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Endpoint registration failed at startup.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A per-connection session operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The underlying transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An application callback reported an error.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

/// Errors raised while registering endpoint templates.
///
/// These are fatal at startup: the host should refuse to serve rather than
/// run with a partial registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A template for this path is already registered; the registry keeps
    /// the first one.
    #[error("endpoint path already registered: {path}")]
    DuplicatePath { path: String },

    /// The supplied template cannot be mounted as-is.
    #[error("invalid endpoint template: {reason}")]
    InvalidEndpoint { reason: String },
}

/// Errors raised by per-connection session operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// No upgrade context was attached upstream of session creation. This is
    /// a programming-contract violation, fatal to the connection only.
    #[error("no upgrade context attached to the connection")]
    ContextMissing,

    /// A payload could not be serialized for the structured write surface.
    #[error("payload serialization failed: {0}")]
    Serialization(String),

    /// The transport rejected a read or write.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Transport-level failures. Unrecoverable for the affected connection.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// A control-frame send did not complete within its deadline.
    #[error("control-frame send timed out after {0:?}")]
    SendTimeout(Duration),

    /// Any other transport failure, carrying the underlying error text.
    #[error("transport failure: {0}")]
    Io(String),
}

/// An error reported by an application endpoint callback.
///
/// The text travels into the close control frame and the close-callback, so
/// it should be short and peer-safe.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct EndpointError {
    message: String,
}

impl EndpointError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for EndpointError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for EndpointError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
