//! Shared state for the HTTP endpoint

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::dispatch::Dispatcher;
use crate::health::HealthChecker;

/// Server state shared across requests
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,

    pub health: Arc<HealthChecker>,

    /// Present when the Prometheus recorder was installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            health: Arc::new(HealthChecker::new()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
