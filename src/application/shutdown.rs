//! Process shutdown signals.

use std::future::Future;
use std::io;

/// Resolves on SIGINT or, on unix, SIGTERM.
///
/// A handler that cannot be installed is logged and never fires, so a
/// registration error does not read as a shutdown request.
pub async fn shutdown_signal() {
    let interrupt = until_signal(tokio::signal::ctrl_c(), "SIGINT");

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let terminate = until_signal(
            async {
                signal(SignalKind::terminate())?.recv().await;
                Ok(())
            },
            "SIGTERM",
        );

        tokio::select! {
            () = interrupt => {}
            () = terminate => {}
        }
    }

    #[cfg(not(unix))]
    {
        interrupt.await;
    }
}

/// Wait for `signal`; on error log it and wait forever.
pub async fn until_signal<F>(signal: F, name: &str)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(err) = signal.await {
        tracing::error!(signal = name, error = %err, "Failed to install signal handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_received_signal_resolves() {
        let result = tokio::time::timeout(
            Duration::from_secs(1),
            until_signal(async { Ok(()) }, "SIGINT"),
        )
        .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_registration_error_never_resolves() {
        let result = tokio::time::timeout(
            Duration::from_millis(50),
            until_signal(
                async { Err(io::Error::other("no signal driver")) },
                "SIGINT",
            ),
        )
        .await;

        assert!(result.is_err(), "a failed handler must not request shutdown");
    }
}
