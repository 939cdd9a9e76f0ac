//! # Sockgate Gateway
//!
//! WebSocket gateway runtime on axum and tokio: register endpoint templates,
//! mount the resulting router, and the gateway runs the full connection
//! lifecycle for you — upgrade filtering, session creation, keepalive pings,
//! exactly-once teardown, and coordinated shutdown.
//!
//! The moving parts:
//!
//! - [`SocketGateway`]: registration facade and router builder.
//! - [`SocketEndpoint`] / [`EndpointTemplate`]: the application surface; one
//!   endpoint instance per connection.
//! - [`Session`]: per-connection state machine with a close-safe write
//!   surface for callbacks.
//! - [`ConnectionTable`]: concurrent registry of live sessions, also the
//!   shutdown coordinator.
//! - [`UpgradeFilter`]: pre-upgrade request filtering and context
//!   enrichment.

pub mod connections;
pub mod endpoint;
pub mod endpoints;
pub mod gateway;
mod keepalive;
pub mod session;
pub mod shutdown;
pub mod transport;
mod upgrade;

#[cfg(test)]
pub(crate) mod testutil;

pub use connections::{ConnectionTable, ShutdownReport};
pub use endpoint::{EndpointTemplate, SocketEndpoint};
pub use endpoints::{FilterRejection, UpgradeFilter};
pub use gateway::SocketGateway;
pub use session::{Session, SessionState};
pub use shutdown::{shutdown_signal, shutdown_with_cleanup};
pub use transport::{ControlFrame, Frame, PayloadKind};

pub use sockgate_core::{
    CloseReason, EndpointError, GatewayConfig, GatewayError, SessionError, UpgradeContext,
};
