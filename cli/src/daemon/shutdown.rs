use std::future::Future;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Owns the token every shutdown trigger cancels.
#[derive(Debug)]
pub struct ShutdownGuard {
    token: CancellationToken,
}

impl ShutdownGuard {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancels the token on SIGTERM or Ctrl-C.
    pub fn spawn_signal_listener(&self) {
        let token = self.token.clone();
        tokio::spawn(async move {
            listen(token, terminate(), interrupt()).await;
        });
    }
}

/// Cancels `token` when either signal future resolves.
///
/// A signal whose handler could not be registered never resolves, so the
/// other one keeps working.
async fn listen<T, I>(token: CancellationToken, terminate: T, interrupt: I)
where
    T: Future<Output = ()>,
    I: Future<Output = ()>,
{
    tokio::select! {
        _ = token.cancelled() => return,
        _ = terminate => info!("Received SIGTERM, shutting down"),
        _ = interrupt => info!("Received Ctrl-C, shutting down"),
    }
    token.cancel();
}

impl Default for ShutdownGuard {
    fn default() -> Self {
        Self::new()
    }
}

async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "Failed to register SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

async fn interrupt() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
