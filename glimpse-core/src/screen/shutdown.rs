//! Process termination handling.
//!
//! Turns SIGINT / SIGTERM into the same cancellation a stop request
//! produces, then waits (bounded) for the capture loops to drain
//! before letting the process exit.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::screen::session::SessionController;

/// Listens for termination and shuts the sharer down in order.
pub struct ShutdownCoordinator {
    controller: Arc<SessionController>,
    grace: Duration,
}

impl ShutdownCoordinator {
    /// `grace` bounds how long to wait for draining loops.
    pub fn new(controller: Arc<SessionController>, grace: Duration) -> Self {
        Self { controller, grace }
    }

    /// Wait for an OS termination signal, then shut down.
    ///
    /// Returns `true` if every capture loop acknowledged in time.
    pub async fn run(self) -> bool {
        self.run_until(termination_signal()).await
    }

    /// Like [`run`](Self::run) with a caller-provided trigger.
    ///
    /// Also returns early if the shutdown token is cancelled elsewhere.
    pub async fn run_until<F>(self, signal: F) -> bool
    where
        F: Future<Output = ()>,
    {
        let token = self.controller.shutdown_token();
        tokio::select! {
            _ = signal => info!("termination requested"),
            _ = token.cancelled() => info!("shutdown already in progress"),
        }

        let acknowledged = self.controller.shutdown(self.grace).await;
        if acknowledged {
            info!("capture stopped; exiting");
        } else {
            warn!("exiting without drain acknowledgement");
        }
        acknowledged
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
///
/// If the signal handlers cannot be installed this never resolves; the
/// process is then only stopped by the OS.
pub async fn termination_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
