//! Health checks backing the `/health` probe

use serde::Serialize;
use std::time::Instant;

use crate::metrics;
use crate::store::SqlRecordStore;

/// Health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    #[serde(rename = "ok")]
    Healthy,
    #[serde(rename = "unavailable")]
    Unhealthy,
}

impl HealthStatus {
    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> u16 {
        match self {
            HealthStatus::Healthy => 200,
            HealthStatus::Unhealthy => 503,
        }
    }
}

/// Component health status
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: &'static str,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentHealth {
    pub fn healthy(name: &'static str) -> Self {
        Self {
            name,
            status: HealthStatus::Healthy,
            message: None,
        }
    }

    pub fn unhealthy(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<i32>,
    pub components: Vec<ComponentHealth>,
}

/// Runs the store check and folds component results into a report
pub struct HealthChecker {
    started: Instant,
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthChecker {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Blocking: checks out a pooled connection
    pub fn check(&self, store: &SqlRecordStore) -> HealthReport {
        let components = vec![check_store(store)];
        let status = if components.iter().all(|c| c.status == HealthStatus::Healthy) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport {
            status,
            version: env!("CARGO_PKG_VERSION"),
            uptime_seconds: self.started.elapsed().as_secs(),
            schema_version: store.schema_version().ok(),
            components,
        }
    }
}

/// The store is healthy if the pool hands out a working connection
pub fn check_store(store: &SqlRecordStore) -> ComponentHealth {
    if let Err(e) = store.health_check() {
        return ComponentHealth::unhealthy("store", e.to_string());
    }
    if let Ok(namespaces) = store.list_namespaces() {
        metrics::record_namespaces(namespaces.len());
    }
    ComponentHealth::healthy("store")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::storage::CURRENT_SCHEMA_VERSION;

    #[test]
    fn test_memory_store_is_healthy() {
        let store = SqlRecordStore::memory().unwrap();
        let report = HealthChecker::new().check(&store);

        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.status.to_http_status(), 200);
        assert_eq!(report.components.len(), 1);
    }

    #[test]
    fn test_report_serializes_status_as_ok() {
        let store = SqlRecordStore::memory().unwrap();
        let json = serde_json::to_value(HealthChecker::new().check(&store)).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["components"][0]["name"], "store");
        assert_eq!(json["schema_version"], CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_unhealthy_component_maps_to_503() {
        let component = ComponentHealth::unhealthy("store", "pool exhausted");
        assert_eq!(component.status.to_http_status(), 503);
        assert_eq!(component.message.as_deref(), Some("pool exhausted"));
    }
}
