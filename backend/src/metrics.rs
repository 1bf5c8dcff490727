use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramOpts, HistogramVec, IntCounterVec,
    IntGauge, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;

static REGISTRY: once_cell::sync::Lazy<Arc<Registry>> =
    once_cell::sync::Lazy::new(|| Arc::new(Registry::new()));

static METRICS: std::sync::Mutex<Option<Arc<Metrics>>> = std::sync::Mutex::new(None);

/// Application metrics, namespaced `trackline`. HTTP series are labelled by
/// route pattern, leaderboard series by metric and period kind.
pub struct Metrics {
    http_duration: HistogramVec,
    http_total: IntCounterVec,
    http_in_flight: IntGauge,
    regeneration_duration: HistogramVec,
    regenerations_total: IntCounterVec,
    snapshot_reuse_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let http_duration = register_histogram_vec!(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds"
            )
            .namespace("trackline")
            .subsystem("http"),
            &["method", "endpoint", "status_code"]
        )?;

        let http_total = register_int_counter_vec!(
            Opts::new("http_requests_total", "Total number of HTTP requests")
                .namespace("trackline")
                .subsystem("http"),
            &["method", "endpoint", "status_code"]
        )?;

        let http_in_flight = IntGauge::with_opts(
            Opts::new("http_requests_in_flight", "HTTP requests currently in flight")
                .namespace("trackline")
                .subsystem("http"),
        )?;
        REGISTRY.register(Box::new(http_in_flight.clone()))?;

        let regeneration_duration = register_histogram_vec!(
            HistogramOpts::new(
                "regeneration_duration_seconds",
                "Snapshot regeneration duration in seconds"
            )
            .namespace("trackline")
            .subsystem("leaderboard"),
            &["metric", "period_kind"]
        )?;

        let regenerations_total = register_int_counter_vec!(
            Opts::new(
                "regenerations_total",
                "Snapshot regeneration attempts by outcome"
            )
            .namespace("trackline")
            .subsystem("leaderboard"),
            &["metric", "period_kind", "outcome"]
        )?;

        let snapshot_reuse_total = register_int_counter_vec!(
            Opts::new(
                "snapshot_reuse_total",
                "Reads served from an existing valid snapshot"
            )
            .namespace("trackline")
            .subsystem("leaderboard"),
            &["metric", "period_kind"]
        )?;

        Ok(Metrics {
            http_duration,
            http_total,
            http_in_flight,
            regeneration_duration,
            regenerations_total,
            snapshot_reuse_total,
        })
    }

    pub fn registry() -> Arc<Registry> {
        REGISTRY.clone()
    }

    /// The process-wide instance, if `set_global` has run. try_lock keeps
    /// this non-blocking on contended test runs.
    pub fn global() -> Option<Arc<Metrics>> {
        METRICS.try_lock().ok().and_then(|m| m.clone())
    }

    pub fn set_global(metrics: Arc<Metrics>) {
        *METRICS.lock().unwrap() = Some(metrics);
    }

    pub fn http_started(&self) {
        self.http_in_flight.inc();
    }

    pub fn observe_http(&self, method: &str, endpoint: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();
        self.http_duration
            .with_label_values(&[method, endpoint, &status])
            .observe(elapsed.as_secs_f64());
        self.http_total
            .with_label_values(&[method, endpoint, &status])
            .inc();
        self.http_in_flight.dec();
    }

    pub fn observe_regeneration(
        &self,
        metric: &str,
        period_kind: &str,
        outcome: &str,
        elapsed: Duration,
    ) {
        self.regeneration_duration
            .with_label_values(&[metric, period_kind])
            .observe(elapsed.as_secs_f64());
        self.regenerations_total
            .with_label_values(&[metric, period_kind, outcome])
            .inc();
    }

    pub fn observe_snapshot_reuse(&self, metric: &str, period_kind: &str) {
        self.snapshot_reuse_total
            .with_label_values(&[metric, period_kind])
            .inc();
    }
}

/// Prometheus scrape endpoint. The register_* macros write to the default
/// registry while the gauge lands in ours, so both are gathered.
#[actix_web::get("/metrics")]
pub async fn metrics_handler() -> actix_web::HttpResponse {
    use prometheus::{Encoder, TextEncoder};

    let mut families = prometheus::gather();
    families.extend(Metrics::registry().gather());

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        log::error!("Failed to encode metrics: {}", e);
        return actix_web::HttpResponse::InternalServerError().finish();
    }
    actix_web::HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_shared() {
        assert!(Arc::ptr_eq(&Metrics::registry(), &Metrics::registry()));
    }
}
