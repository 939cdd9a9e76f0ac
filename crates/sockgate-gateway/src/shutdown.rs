//! Process signal handling for graceful shutdown.

use std::future::Future;

use tracing::info;

/// Resolves when the process receives Ctrl+C or, on unix, SIGTERM. Intended
/// for `axum::serve(...).with_graceful_shutdown(shutdown_signal())`.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

/// Like [`shutdown_signal`], but runs `cleanup` (typically the gateway's
/// session drain) after the signal arrives and before resolving.
pub async fn shutdown_with_cleanup<F, Fut>(cleanup: F)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    shutdown_signal().await;
    cleanup().await;
    info!("cleanup complete");
}
