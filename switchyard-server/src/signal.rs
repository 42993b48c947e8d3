use std::error::Error;

use tokio::signal;

/// Completes when the process receives `SIGINT` or `SIGTERM`.
///
/// If a signal handler cannot be installed, the error is logged and that signal is never awaited.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(error) = signal::ctrl_c().await {
            switchyard_log::error!(
                error = &error as &dyn Error,
                "failed to listen for SIGINT"
            );
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                switchyard_log::error!(
                    error = &error as &dyn Error,
                    "failed to listen for SIGTERM"
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => switchyard_log::info!("received SIGINT"),
        () = terminate => switchyard_log::info!("received SIGTERM"),
    }
}
