//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Search (Prowlarr fan-out, cache hits, indexer failures)
//! - Acquisition (auto-download decisions, dispatches)
//! - External services (book catalogs, indexer registry updates)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Search Metrics
// =============================================================================

/// Searches served, by source.
pub static SEARCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookhound_searches_total", "Total searches served"),
        &["source"], // "network", "cache"
    )
    .unwrap()
});

/// Duration of a full fan-out search.
pub static SEARCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bookhound_search_duration_seconds",
            "Duration of searches across all indexers",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &[],
    )
    .unwrap()
});

/// Per-indexer search failures.
pub static INDEXER_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bookhound_indexer_failures_total",
            "Total failed searches per indexer",
        ),
        &["indexer"],
    )
    .unwrap()
});

// =============================================================================
// Acquisition Metrics
// =============================================================================

/// Auto-download decisions by outcome.
pub static AUTO_DOWNLOAD_DECISIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bookhound_auto_download_decisions_total",
            "Auto-download decisions by outcome",
        ),
        &["outcome"], // "auto" or an approval reason kind
    )
    .unwrap()
});

/// Time from search start to the request's next resting state.
pub static ACQUISITION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bookhound_acquisition_duration_seconds",
            "Duration of request processing",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["state"],
    )
    .unwrap()
});

/// Links handed to a download client.
pub static DISPATCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookhound_dispatches_total", "Total download dispatches"),
        &["client", "result"], // result: "ok", "malformed", "client_error"
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// Book catalog lookups.
pub static CATALOG_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookhound_catalog_lookups_total", "Total book catalog lookups"),
        &["source", "result"], // result: "found", "not_found", "error"
    )
    .unwrap()
});

/// Indexer registry updates.
pub static REGISTRY_PATCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bookhound_indexer_patches_total",
            "Indexer configuration updates",
        ),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Search
        Box::new(SEARCHES_TOTAL.clone()),
        Box::new(SEARCH_DURATION.clone()),
        Box::new(INDEXER_FAILURES.clone()),
        // Acquisition
        Box::new(AUTO_DOWNLOAD_DECISIONS.clone()),
        Box::new(ACQUISITION_DURATION.clone()),
        Box::new(DISPATCHES.clone()),
        // External services
        Box::new(CATALOG_LOOKUPS.clone()),
        Box::new(REGISTRY_PATCHES.clone()),
    ]
}
