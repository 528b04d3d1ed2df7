use tokio::signal;
use tracing::{info, warn};

/// Resolve once the process is asked to stop.
///
/// Consuming transactions in flight are dropped with the runtime and roll
/// back, so nothing needs flushing here.
pub async fn listen_for_shutdown() {
    #[cfg(unix)]
    {
        use signal::unix::{SignalKind, signal as unix_signal};

        match unix_signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    res = signal::ctrl_c() => log_ctrl_c(res),
                    _ = term.recv() => info!("SIGTERM received, shutting down..."),
                }
                return;
            }
            Err(e) => warn!("Failed to listen for SIGTERM: {}", e),
        }
    }

    log_ctrl_c(signal::ctrl_c().await);
}

fn log_ctrl_c(res: std::io::Result<()>) {
    match res {
        Ok(()) => info!("Shutdown signal received, shutting down..."),
        Err(e) => warn!(
            "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
            e
        ),
    }
}
