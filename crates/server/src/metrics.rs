//! Prometheus metrics

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Safe to call once per process;
/// returns false if installation failed (metrics become no-ops).
pub fn init_metrics() -> bool {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = PROMETHEUS_HANDLE.set(handle);
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Render the current metrics snapshot for `/metrics`
pub async fn metrics_handler() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

/// Record an admitted chat request and which generator served it
pub fn record_chat_request(route: &'static str) {
    metrics::counter!("chat_requests_total", "route" => route).increment(1);
}

/// Record a rate-limited rejection
pub fn record_rate_limited() {
    metrics::counter!("chat_rate_limited_total").increment(1);
}

/// Record a terminal generation failure (the caller saw the fallback)
pub fn record_generation_failure() {
    metrics::counter!("chat_generation_failures_total").increment(1);
}

/// Record end-to-end generation latency
pub fn record_generation_latency(seconds: f64) {
    metrics::histogram!("chat_generation_latency_seconds").record(seconds);
}

/// Record a speech synthesis request
pub fn record_speech_request() {
    metrics::counter!("speech_requests_total").increment(1);
}
