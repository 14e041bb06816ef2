use metrics::{describe_counter, describe_gauge, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Thin handle around the global metrics recorder.
///
/// After `Metrics::install()` the `metrics` crate macros (`counter!`, `gauge!`)
/// can be used anywhere in the codebase. The `PrometheusHandle` is retained
/// solely for rendering the `/metrics` endpoint.
#[derive(Clone)]
pub struct Metrics {
    handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and register metric descriptions.
    /// Must be called **once** at startup before any `counter!` / `gauge!` calls.
    pub fn install() -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install metrics recorder");

        describe_counter!(
            "distributor_analyzer_success_total",
            Unit::Count,
            "Total packets successfully accepted by an analyzer"
        );
        describe_counter!(
            "distributor_analyzer_failure_total",
            Unit::Count,
            "Total analyzer calls that failed (timeout, transport error, non-OK status)"
        );
        describe_gauge!(
            "distributor_breaker_state",
            Unit::Count,
            "Per-analyzer breaker state: 0=CLOSED 1=OPEN 2=HALF_OPEN"
        );
        describe_counter!(
            "distributor_weight_reload_total",
            Unit::Count,
            "Config watcher poll outcomes"
        );
        describe_gauge!(
            "distributor_connections_active",
            Unit::Count,
            "Number of active downstream HTTP connections"
        );
        describe_counter!(
            "analyzer_messages_total",
            Unit::Count,
            "Total log messages processed by this analyzer"
        );
        describe_counter!(
            "analyzer_admission_rejected_total",
            Unit::Count,
            "Total Analyze calls rejected because the analyzer is inactive"
        );

        Self { handle }
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
