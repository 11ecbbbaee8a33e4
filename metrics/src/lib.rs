//! Metrics collection for Taskboard.
//!
//! # Architecture
//!
//! One [`Metrics`] value is built at process start and handed to every component
//! that records or reads metrics as an `Arc<Metrics>`. There is no global registry.
//!
//! | Family | Type | Labels |
//! |--------|------|--------|
//! | `http_requests_total` | counter | `method`, `route`, `status_code` |
//! | `http_request_duration_seconds` | histogram | `method`, `route`, `status_code` |
//! | `store_operations_total` | counter | `kind`, `name`, `success` |
//! | `store_operation_duration_seconds` | histogram | `kind`, `name` |
//! | any name passed to [`Metrics::set_gauge`] | gauge | caller-defined |
//!
//! Route labels must already be cardinality-bounded when they reach the collector;
//! callers run request paths through [`normalize_route`] first.
//!
//! # Failure Handling
//!
//! Recording never returns an error. A poisoned series lock is logged and the
//! sample dropped, so instrumentation cannot fail the request that triggered it.

mod exposition;
mod family;
mod route;

pub use exposition::CONTENT_TYPE;
pub use route::normalize_route;

use std::collections::BTreeMap;
use std::sync::Mutex;

use family::{CounterFamily, GaugeSeries, HistogramFamily};

/// HTTP latency buckets: sub-millisecond up to multi-second.
pub const HTTP_DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Store latency buckets. Tighter than HTTP: most queries finish well under 10ms.
pub const STORE_DURATION_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Category label for a store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Read,
    Create,
    Update,
    Delete,
}

impl OperationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            OperationKind::Read => "read",
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

/// Process-wide metrics registry.
pub struct Metrics {
    http_requests: CounterFamily,
    http_duration: HistogramFamily,
    store_operations: CounterFamily,
    store_duration: HistogramFamily,
    gauges: Mutex<BTreeMap<String, GaugeSeries>>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            http_requests: CounterFamily::new(
                "http_requests_total",
                "Total HTTP requests handled",
                &["method", "route", "status_code"],
            ),
            http_duration: HistogramFamily::new(
                "http_request_duration_seconds",
                "HTTP request latency in seconds",
                &["method", "route", "status_code"],
                HTTP_DURATION_BUCKETS,
            ),
            store_operations: CounterFamily::new(
                "store_operations_total",
                "Total store operations by kind, name and outcome",
                &["kind", "name", "success"],
            ),
            store_duration: HistogramFamily::new(
                "store_operation_duration_seconds",
                "Store operation latency in seconds",
                &["kind", "name"],
                STORE_DURATION_BUCKETS,
            ),
            gauges: Mutex::new(BTreeMap::new()),
        }
    }

    /// Record one served HTTP request. `route` must already be normalized.
    pub fn record_http_request(
        &self,
        method: &str,
        route: &str,
        status_code: u16,
        duration_seconds: f64,
    ) {
        let status = status_code.to_string();
        let labels = [method, route, status.as_str()];
        self.http_requests.inc(&labels);
        self.http_duration.observe(&labels, duration_seconds);
    }

    /// Record one store call and its outcome.
    pub fn record_store_operation(
        &self,
        kind: OperationKind,
        name: &str,
        duration_seconds: f64,
        success: bool,
    ) {
        let outcome = if success { "true" } else { "false" };
        self.store_operations
            .inc(&[kind.as_str(), name, outcome]);
        self.store_duration
            .observe(&[kind.as_str(), name], duration_seconds);
    }

    /// Set a gauge sample, creating the family on first use.
    pub fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        let mut gauges = match self.gauges.lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!(gauge = name, "Gauge registry lock poisoned; dropping sample");
                return;
            }
        };
        gauges
            .entry(name.to_string())
            .or_default()
            .set(labels, value);
    }

    /// Current value of a counter series, if it has been recorded.
    ///
    /// `labels` must list every label of the family, in any order.
    #[must_use]
    pub fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        [&self.http_requests, &self.store_operations]
            .into_iter()
            .find(|family| family.name() == name)
            .and_then(|family| family.value(labels))
    }

    /// Sum of every series in a counter family.
    #[must_use]
    pub fn counter_total(&self, name: &str) -> u64 {
        [&self.http_requests, &self.store_operations]
            .into_iter()
            .find(|family| family.name() == name)
            .map_or(0, CounterFamily::total)
    }

    /// Current value of a gauge series, if set.
    #[must_use]
    pub fn gauge_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        let gauges = self.gauges.lock().ok()?;
        gauges.get(name)?.get(labels)
    }

    /// Render every family in the text exposition format.
    #[must_use]
    pub fn snapshot(&self) -> String {
        let mut out = String::with_capacity(4096);
        self.http_requests.render(&mut out);
        self.http_duration.render(&mut out);
        self.store_operations.render(&mut out);
        self.store_duration.render(&mut out);
        match self.gauges.lock() {
            Ok(gauges) => {
                for (name, series) in gauges.iter() {
                    series.render(name, &mut out);
                }
            }
            Err(_) => tracing::warn!("Gauge registry lock poisoned; omitting gauges from snapshot"),
        }
        out
    }
}
