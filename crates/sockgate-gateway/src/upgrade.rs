//! HTTP-to-WebSocket upgrade handler and the per-connection run loop.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use tracing::{error, info};

use sockgate_core::{GatewayConfig, UpgradeContext};

use crate::connections::ConnectionTable;
use crate::endpoints::EndpointEntry;
use crate::keepalive;
use crate::session::SessionFactory;
use crate::transport::split_socket;

/// Per-route state handed to the upgrade handler.
#[derive(Clone)]
pub(crate) struct EndpointState {
    pub(crate) entry: Arc<EndpointEntry>,
    pub(crate) table: Arc<ConnectionTable>,
    pub(crate) config: Arc<GatewayConfig>,
}

/// Handle one upgrade request: bind the context, run the filter chain, then
/// hand the upgraded socket to [`run_session`].
pub(crate) async fn upgrade_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<EndpointState>,
    headers: HeaderMap,
) -> Response {
    let mut context = UpgradeContext::new(addr, state.entry.template.path());
    for (name, value) in &headers {
        context.insert_header(name.as_str(), value.to_str().unwrap_or_default());
    }
    for filter in &state.entry.filters {
        if let Err(rejection) = filter.apply(&mut context).await {
            info!(
                path = context.path(),
                remote = %addr,
                status = %rejection.status,
                "upgrade rejected by filter"
            );
            return rejection.into_response();
        }
    }
    ws.on_upgrade(move |socket| run_session(socket, state, context))
}

/// Drive one accepted connection from session creation to teardown.
async fn run_session(socket: WebSocket, state: EndpointState, context: UpgradeContext) {
    let (sink, stream) = split_socket(socket);
    let session = match SessionFactory::create(
        Box::new(sink),
        state.entry.template.as_ref(),
        Some(context),
        &state.table,
        state.config.control_deadline,
    )
    .await
    {
        Ok(session) => session,
        Err(err) => {
            error!(error = %err, "session creation failed");
            return;
        }
    };
    info!(
        session_id = %session.id(),
        path = session.context().path(),
        remote = %session.context().remote_addr(),
        "session established"
    );

    if !session.open().await {
        return;
    }

    let keepalive = keepalive::spawn(
        session.clone(),
        state.config.ping_interval,
        state.config.control_deadline,
    );
    session.read_loop(Box::new(stream)).await;
    let _ = keepalive.await;
}
