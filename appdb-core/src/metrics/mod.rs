//! Metrics collection and export for observability

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;
use tracing::info;

/// Requests handled, labelled by action and status code
pub const REQUESTS_TOTAL: &str = "appdb.requests.total";

/// Dispatch latency in milliseconds, labelled by action
pub const REQUEST_DURATION: &str = "appdb.request.duration_ms";

/// Namespaces present in the store
pub const NAMESPACES: &str = "appdb.namespaces";

/// Latency buckets in milliseconds
const DURATION_BUCKETS_MS: [f64; 10] = [0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 1000.0];

/// Initialize metrics with descriptions
pub fn init_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Worker endpoint requests by action and status");
    describe_histogram!(REQUEST_DURATION, "Dispatch duration in milliseconds");
    describe_gauge!(NAMESPACES, "Namespaces known to the record store");
}

/// Install the global Prometheus recorder and return the handle used to
/// render scrapes. Fails if a recorder is already installed.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets(&DURATION_BUCKETS_MS)?
        .install_recorder()?;

    init_metrics();
    info!("Prometheus recorder installed");
    Ok(handle)
}

pub fn record_request(action: &'static str, status: u16) {
    counter!(REQUESTS_TOTAL, "action" => action, "status" => status.to_string()).increment(1);
}

pub fn record_namespaces(count: usize) {
    gauge!(NAMESPACES).set(count as f64);
}

/// Timer for measuring operation duration
pub struct Timer {
    name: &'static str,
    action: &'static str,
    start: Instant,
}

impl Timer {
    pub fn new(name: &'static str, action: &'static str) -> Self {
        Self {
            name,
            action,
            start: Instant::now(),
        }
    }

    /// Stop the timer and record the duration
    pub fn stop(self) {
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        histogram!(self.name, "action" => self.action).record(elapsed_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_counter_is_rendered() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_request("GET", 200);
            record_request("GET", 200);
            record_request("SET", 400);
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"appdb_requests_total{action="GET",status="200"} 2"#));
        assert!(rendered.contains(r#"appdb_requests_total{action="SET",status="400"} 1"#));
    }

    #[test]
    fn test_timer_records_without_recorder() {
        let timer = Timer::new(REQUEST_DURATION, "GET");
        std::thread::sleep(std::time::Duration::from_millis(1));
        timer.stop();
    }
}
