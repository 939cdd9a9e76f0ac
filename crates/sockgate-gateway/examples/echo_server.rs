//! Minimal echo gateway.
//!
//! Run with `cargo run --example echo_server`, then connect a client to
//! `ws://127.0.0.1:3000/ws/echo`.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use sockgate_gateway::{
    EndpointError, EndpointTemplate, GatewayConfig, Session, SocketEndpoint, SocketGateway,
    shutdown_with_cleanup,
};

struct EchoTemplate;

impl EndpointTemplate for EchoTemplate {
    fn path(&self) -> &str {
        "/echo"
    }

    fn connect(&self) -> Box<dyn SocketEndpoint> {
        Box::new(EchoEndpoint)
    }
}

struct EchoEndpoint;

#[async_trait]
impl SocketEndpoint for EchoEndpoint {
    async fn on_message(&mut self, session: &Session, text: &str) -> Result<(), EndpointError> {
        info!(session_id = %session.id(), "echoing {} bytes", text.len());
        session
            .write_text(text)
            .await
            .map_err(|err| EndpointError::new(err.to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = GatewayConfig::builder()
        .base_path("/ws")?
        .ping_interval_secs(30)?
        .build();
    let mut gateway = SocketGateway::new(config);
    gateway.register(Arc::new(EchoTemplate), Vec::new())?;
    let gateway = Arc::new(gateway);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    info!("listening on {}", listener.local_addr()?);

    let drain = gateway.clone();
    axum::serve(
        listener,
        gateway
            .router()
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_with_cleanup(move || async move {
        let report = drain.shutdown().await;
        info!(
            drained = report.drained,
            forced = report.forced.len(),
            "sessions drained"
        );
    }))
    .await?;

    Ok(())
}
