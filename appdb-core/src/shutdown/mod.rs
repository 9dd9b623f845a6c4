//! Graceful shutdown coordinator

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, warn};

/// Shutdown state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    Draining,
}

/// Broadcasts a single shutdown request to every subscriber.
///
/// After `trigger`, the server stops accepting connections and gives
/// in-flight requests `grace_period` to finish.
pub struct ShutdownCoordinator {
    state: RwLock<ShutdownState>,
    shutdown_tx: broadcast::Sender<()>,
    grace_period: Duration,
}

impl ShutdownCoordinator {
    pub fn new(grace_period: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(4);

        Self {
            state: RwLock::new(ShutdownState::Running),
            shutdown_tx,
            grace_period,
        }
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Request shutdown. Later calls are no-ops.
    pub async fn trigger(&self) {
        let mut state = self.state.write().await;
        if *state != ShutdownState::Running {
            warn!("Shutdown already in progress");
            return;
        }
        *state = ShutdownState::Draining;
        drop(state);

        info!(grace_period = ?self.grace_period, "Initiating graceful shutdown");
        // No receivers just means nobody is waiting yet; `wait` re-checks state.
        let _ = self.shutdown_tx.send(());
    }

    pub async fn state(&self) -> ShutdownState {
        *self.state.read().await
    }

    pub async fn is_shutting_down(&self) -> bool {
        self.state().await == ShutdownState::Draining
    }

    /// Resolves once shutdown has been triggered, including when that
    /// happened before this call
    pub async fn wait(&self) {
        let mut rx = self.shutdown_tx.subscribe();
        if self.is_shutting_down().await {
            return;
        }
        if let Err(e) = rx.recv().await {
            error!("Shutdown channel error: {}", e);
        }
    }
}

/// Trigger `coordinator` on SIGINT or SIGTERM
#[cfg(unix)]
pub fn install_signal_handlers(coordinator: Arc<ShutdownCoordinator>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    error!("Failed to install signal handlers: {}", e);
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }
        coordinator.trigger().await;
    });
}

/// Trigger `coordinator` on Ctrl+C
#[cfg(windows)]
pub fn install_signal_handlers(coordinator: Arc<ShutdownCoordinator>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            return;
        }
        info!("Received Ctrl+C");
        coordinator.trigger().await;
    });
}
