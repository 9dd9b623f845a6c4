//! HTTP server for the worker endpoint

use anyhow::{Context, Result};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::api::build_router;
use super::state::AppState;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::metrics;
use crate::shutdown::ShutdownCoordinator;
use crate::store::SqlRecordStore;

pub struct AppDbServer {
    state: Arc<AppState>,
    shutdown: Arc<ShutdownCoordinator>,
}

impl AppDbServer {
    pub fn new(state: AppState, shutdown: Arc<ShutdownCoordinator>) -> Self {
        Self {
            state: Arc::new(state),
            shutdown,
        }
    }

    /// Open the configured database and, if enabled, install the Prometheus
    /// recorder. Only call once per process when metrics are enabled.
    pub fn from_config(config: &Config, shutdown: Arc<ShutdownCoordinator>) -> Result<Self> {
        let backend = Arc::new(SqlRecordStore::open(&config.storage).with_context(|| {
            format!(
                "opening record store at {}",
                config.storage.database_path.display()
            )
        })?);
        let dispatcher = Arc::new(Dispatcher::new(backend, &config.storage)?);

        let mut state = AppState::new(dispatcher);
        if config.metrics.enabled {
            state = state.with_metrics(metrics::install_prometheus()?);
        }

        Ok(Self::new(state, shutdown))
    }

    /// Bind `addr` and serve until shutdown
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding {addr}"))?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener. Returns once shutdown has been
    /// triggered and in-flight requests have drained, or the grace period
    /// ran out.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        info!(addr = %listener.local_addr()?, "worker endpoint listening");

        let router = build_router(self.state);
        let signal = {
            let shutdown = self.shutdown.clone();
            async move { shutdown.wait().await }
        };
        let server = axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .into_future();

        let grace = self.shutdown.grace_period();
        let deadline = async {
            self.shutdown.wait().await;
            tokio::time::sleep(grace).await;
        };

        tokio::select! {
            result = server => result?,
            _ = deadline => warn!(?grace, "grace period elapsed with requests in flight"),
        }

        info!("worker endpoint stopped");
        Ok(())
    }
}
