//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the bookhound server:
//! - HTTP request metrics (latency, counts, errors)
//! - Book request intake
//! - Indexer registry state (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    core::Collector, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    Opts, Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bookhound_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookhound_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "bookhound_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bookhound_auth_failures_total",
            "Total authentication failures",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Request Metrics
// =============================================================================

/// Book requests created, by requester trust level.
pub static BOOK_REQUESTS_CREATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bookhound_book_requests_created_total",
            "Total book requests created",
        ),
        &["trust"],
    )
    .unwrap()
});

/// Manual approvals and retries issued by admins.
pub static ADMIN_ACTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "bookhound_admin_actions_total",
        "Total manual approvals and retries",
    )
    .unwrap()
});

// =============================================================================
// Indexer Metrics (collected dynamically)
// =============================================================================

/// Indexer registry generation.
pub static REGISTRY_GENERATION: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "bookhound_indexer_registry_generation",
        "Number of indexer configuration changes applied since startup",
    )
    .unwrap()
});

/// Enabled indexers.
pub static INDEXERS_ENABLED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "bookhound_indexers_enabled",
        "Number of indexers included in searches",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    let server_metrics: Vec<Box<dyn Collector>> = vec![
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()),
        Box::new(AUTH_FAILURES_TOTAL.clone()),
        Box::new(BOOK_REQUESTS_CREATED.clone()),
        Box::new(ADMIN_ACTIONS_TOTAL.clone()),
        Box::new(REGISTRY_GENERATION.clone()),
        Box::new(INDEXERS_ENABLED.clone()),
    ];

    // Search, acquisition and dispatch metrics live in core
    for metric in server_metrics
        .into_iter()
        .chain(bookhound_core::metrics::all_metrics())
    {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// This is called before encoding metrics to update gauges with current values.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let registry = state.registry();
    REGISTRY_GENERATION.set(registry.generation() as i64);
    INDEXERS_ENABLED.set(registry.enabled_indexers().await.len() as i64);
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    // Replace UUIDs and hashes with placeholders
    let uuid_regex = regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap();
    let numeric_regex = regex_lite::Regex::new(r"/\d+(/|$)").unwrap();

    let result = uuid_regex.replace_all(path, "{id}");
    let result = numeric_regex.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/requests/550e8400-e29b-41d4-a716-446655440000/approve";
        assert_eq!(normalize_path(path), "/api/requests/{id}/approve");
    }

    #[test]
    fn test_normalize_path_numeric() {
        let path = "/api/requests/12345";
        assert_eq!(normalize_path(path), "/api/requests/{id}");
    }

    #[test]
    fn test_normalize_path_indexer_name_kept() {
        let path = "/api/indexers/MyAnonamouse";
        assert_eq!(normalize_path(path), "/api/indexers/MyAnonamouse");
    }

    #[test]
    fn test_encode_includes_core_metrics() {
        bookhound_core::metrics::SEARCHES_TOTAL
            .with_label_values(&["network"])
            .inc();
        let text = encode_metrics();
        assert!(text.contains("bookhound_searches_total"));
    }
}
