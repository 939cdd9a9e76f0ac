//! The gateway facade: endpoint registration, router construction, shutdown.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tracing::info;

use sockgate_core::{GatewayConfig, RegistryError};

use crate::connections::{ConnectionTable, ShutdownReport};
use crate::endpoint::EndpointTemplate;
use crate::endpoints::{EndpointRegistry, UpgradeFilter};
use crate::upgrade::{EndpointState, upgrade_handler};

/// The WebSocket gateway.
///
/// Endpoints are registered up front, then [`SocketGateway::router`] produces
/// the axum router that serves them; the connection table tracks every live
/// session for the gateway's lifetime.
///
/// ```no_run
/// # use sockgate_gateway::{SocketGateway, SocketEndpoint, EndpointTemplate, Session};
/// # use sockgate_core::{EndpointError, GatewayConfig};
/// # use async_trait::async_trait;
/// struct Echo;
///
/// #[async_trait]
/// impl SocketEndpoint for Echo {
///     async fn on_message(&mut self, session: &Session, text: &str) -> Result<(), EndpointError> {
///         session.write_text(text).await.map_err(|e| EndpointError::new(e.to_string()))
///     }
/// }
///
/// struct EchoTemplate;
///
/// impl EndpointTemplate for EchoTemplate {
///     fn path(&self) -> &str { "/echo" }
///     fn connect(&self) -> Box<dyn SocketEndpoint> { Box::new(Echo) }
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut gateway = SocketGateway::new(GatewayConfig::default());
/// gateway.register(std::sync::Arc::new(EchoTemplate), Vec::new())?;
/// let router = gateway.router();
/// # Ok(())
/// # }
/// ```
pub struct SocketGateway {
    config: Arc<GatewayConfig>,
    endpoints: EndpointRegistry,
    connections: Arc<ConnectionTable>,
}

impl SocketGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config: Arc::new(config),
            endpoints: EndpointRegistry::new(),
            connections: Arc::new(ConnectionTable::new()),
        }
    }

    /// Register an endpoint template with its pre-upgrade filter chain.
    /// Registration happens before serving; a duplicate path or a template
    /// that cannot be mounted is rejected and the registry is unchanged.
    pub fn register(
        &mut self,
        template: Arc<dyn EndpointTemplate>,
        filters: Vec<Arc<dyn UpgradeFilter>>,
    ) -> Result<(), RegistryError> {
        self.endpoints.register(template, filters)
    }

    /// Number of registered endpoints.
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Build the axum router serving every registered endpoint under the
    /// configured route prefix.
    pub fn router(&self) -> Router {
        let prefix = self.config.route_prefix();
        let mut router = Router::new();
        for entry in self.endpoints.iter() {
            let route = format!("{prefix}{}", entry.template.path());
            info!(path = %route, "registering websocket endpoint");
            let state = EndpointState {
                entry: entry.clone(),
                table: self.connections.clone(),
                config: self.config.clone(),
            };
            router = router.route(&route, get(upgrade_handler).with_state(state));
        }
        router
    }

    /// The live connection table.
    pub fn connections(&self) -> Arc<ConnectionTable> {
        self.connections.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Drain every live session within the configured shutdown timeout.
    pub async fn shutdown(&self) -> ShutdownReport {
        self.shutdown_with_deadline(self.config.shutdown_timeout)
            .await
    }

    /// Drain every live session within an explicit deadline.
    pub async fn shutdown_with_deadline(&self, deadline: Duration) -> ShutdownReport {
        self.connections.shutdown(deadline).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::RecordingTemplate;

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut gateway = SocketGateway::new(GatewayConfig::default());
        gateway
            .register(Arc::new(RecordingTemplate::new("/echo")), Vec::new())
            .unwrap();
        let err = gateway
            .register(Arc::new(RecordingTemplate::new("/echo")), Vec::new())
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicatePath { .. }));
        assert_eq!(gateway.endpoint_count(), 1);
    }

    #[test]
    fn router_mounts_under_the_configured_prefix() {
        let config = GatewayConfig::builder()
            .base_path("/api")
            .unwrap()
            .context_path("/ws")
            .unwrap()
            .build();
        let mut gateway = SocketGateway::new(config);
        gateway
            .register(Arc::new(RecordingTemplate::new("/echo")), Vec::new())
            .unwrap();
        // Route construction panics on a malformed path, so building the
        // router is itself the assertion.
        let _router = gateway.router();
    }
}
