use tokio::signal;

use super::KIND;

/// Resolves on the first Ctrl+C or SIGTERM.
pub async fn termination_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("[{} / signal] - failed to listen for Ctrl+C: {}", KIND, err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                log::error!("[{} / signal] - failed to listen for SIGTERM: {}", KIND, err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("[{} / signal] - Received Ctrl+C, shutting down...", KIND);
        },
        _ = terminate => {
            log::info!("[{} / signal] - Received SIGTERM, shutting down...", KIND);
        },
    }
}
