//! Shutdown signal handling.

use tokio_util::sync::CancellationToken;

/// Wait for SIGINT or SIGTERM (Ctrl-C elsewhere).
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (Ok(mut sigint), Ok(mut sigterm)) = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) else {
        tracing::warn!("Failed to install Unix signal handlers, falling back to Ctrl-C");
        let _ = tokio::signal::ctrl_c().await;
        return;
    };

    tokio::select! {
        _ = sigint.recv() => tracing::info!(signal = "SIGINT", "Signal received"),
        _ = sigterm.recv() => tracing::info!(signal = "SIGTERM", "Signal received"),
    }
}

#[cfg(not(unix))]
pub async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!(signal = "ctrl-c", "Signal received");
    }
}

/// Cancel `token` when a shutdown signal arrives.
///
/// The spawned task ends on its own once the token is cancelled by anyone.
pub fn cancel_on_shutdown(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown_signal() => {
                tracing::info!("Cancelling pipeline run");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}
