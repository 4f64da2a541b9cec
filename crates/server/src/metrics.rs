//! Observability Metrics
//!
//! Prometheus metrics endpoint for monitoring.

use std::sync::OnceLock;

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use voice_tts_pipeline::SynthesisOutcome;

use crate::ServerError;

/// Global Prometheus handle
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize metrics recorder
///
/// Must be called once at startup before recording any metrics.
pub fn init_metrics() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        ServerError::Internal(format!("Failed to install Prometheus recorder: {}", e))
    })?;

    register_default_metrics();

    METRICS_HANDLE.get_or_init(|| handle.clone());
    Ok(handle)
}

/// Get the global metrics handle
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

fn register_default_metrics() {
    for surface in ["http", "protocol"] {
        counter!("tts_synthesis_total", "surface" => surface).absolute(0);
        counter!("tts_synthesis_failures_total", "surface" => surface).absolute(0);
    }
    counter!("tts_connections_total").absolute(0);
}

/// Record a finished synthesis call
pub fn record_synthesis(surface: &'static str, duration_secs: f64) {
    counter!("tts_synthesis_total", "surface" => surface).increment(1);
    histogram!("tts_synthesis_seconds", "surface" => surface).record(duration_secs);
}

/// Record a failed engine call
pub fn record_synthesis_failure(surface: &'static str) {
    counter!("tts_synthesis_failures_total", "surface" => surface).increment(1);
}

/// Record whatever a session reported
pub fn record_outcome(surface: &'static str, outcome: &SynthesisOutcome) {
    match outcome {
        SynthesisOutcome::Synthesized { elapsed, .. } => {
            record_synthesis(surface, elapsed.as_secs_f64())
        }
        SynthesisOutcome::Failed { .. } => record_synthesis_failure(surface),
        SynthesisOutcome::Skipped | SynthesisOutcome::Rejected { .. } => {}
    }
}

/// Record an accepted protocol connection
pub fn record_connection() {
    counter!("tts_connections_total").increment(1);
}

/// Metrics endpoint handler
///
/// Returns Prometheus-formatted metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    match get_metrics_handle() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            handle.render(),
        ),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_metric_helpers() {
        // No recorder installed: these must be no-ops
        record_synthesis("http", 0.25);
        record_synthesis_failure("protocol");
        record_connection();
        record_outcome(
            "protocol",
            &SynthesisOutcome::Synthesized {
                bytes: 10,
                frames: 1,
                elapsed: Duration::from_millis(5),
            },
        );
        record_outcome("protocol", &SynthesisOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_handler_without_recorder() {
        if get_metrics_handle().is_none() {
            let response = metrics_handler().await.into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
