use std::io;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancel `shutdown` on Ctrl-C, or on SIGTERM where the platform has it.
///
/// SIGTERM is registered before this returns, so a `kill` or `docker stop`
/// that arrives afterwards reaches the token instead of ending the process.
/// The task exits by itself once `shutdown` is cancelled elsewhere.
pub fn spawn_signal_listener(shutdown: CancellationToken) -> io::Result<JoinHandle<()>> {
    #[cfg(unix)]
    let mut sigterm =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        #[cfg(unix)]
        let terminated = async {
            sigterm.recv().await;
        };
        #[cfg(not(unix))]
        let terminated = std::future::pending::<()>();

        let interrupted = async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %err, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = interrupted => tracing::info!("Interrupt received; finishing current step"),
            _ = terminated => tracing::info!("SIGTERM received; finishing current step"),
        }
        shutdown.cancel();
    }))
}
