//! # Sockgate Core
//!
//! Core types for the sockgate WebSocket gateway: the close-reason codes
//! spoken on the wire, the upgrade context carried by every session, the
//! validated gateway configuration, session identifier generation, and the
//! error taxonomy shared by the runtime and by application endpoints.
//!
//! This crate is transport-free; the gateway runtime lives in
//! `sockgate-gateway`.

pub mod config;
pub mod context;
pub mod error;
pub mod reason;
pub mod session_id;

pub use config::{ConfigError, GatewayConfig, GatewayConfigBuilder};
pub use context::UpgradeContext;
pub use error::{EndpointError, GatewayError, RegistryError, SessionError, TransportError};
pub use reason::CloseReason;
