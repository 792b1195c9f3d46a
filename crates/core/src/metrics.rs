//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Orchestrator (smart searches, routing decisions)
//! - Providers (indexer searches, hash lookups)
//! - Metadata lookups
//! - Cache hit rates per namespace

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

// =============================================================================
// Orchestrator
// =============================================================================

/// Smart searches by routing path.
pub static SMART_SEARCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("magnetar_smart_searches_total", "Total smart searches"),
        &["route"], // "english", "localized", "fallback", "failed"
    )
    .unwrap()
});

/// Smart search duration in seconds.
pub static SMART_SEARCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "magnetar_smart_search_duration_seconds",
            "Duration of a full smart search including metadata lookup",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["route"],
    )
    .unwrap()
});

// =============================================================================
// Providers
// =============================================================================

/// Provider searches by provider and outcome.
pub static PROVIDER_SEARCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "magnetar_provider_searches_total",
            "Total provider searches",
        ),
        &["provider", "result"], // result: "success", "cached", "error", "panicked"
    )
    .unwrap()
});

/// Provider network call duration, by operation.
pub static PROVIDER_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "magnetar_provider_request_duration_seconds",
            "Duration of provider network requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["provider", "operation"], // "search", "content_hash"
    )
    .unwrap()
});

/// Candidates returned per provider search.
pub static PROVIDER_CANDIDATES: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "magnetar_provider_candidates",
            "Number of candidates returned per provider search",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
        &["provider"],
    )
    .unwrap()
});

// =============================================================================
// Metadata & cache
// =============================================================================

/// Metadata lookups by outcome.
pub static METADATA_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("magnetar_metadata_lookups_total", "Total metadata lookups"),
        &["source", "result"], // source: "text", "external_id"; result: "success", "cached", "not_found", "error"
    )
    .unwrap()
});

/// Cache lookups by namespace and outcome.
pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("magnetar_cache_lookups_total", "Total cache lookups"),
        &["namespace", "outcome"], // outcome: "hit", "miss"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

pub(crate) fn record_cache_lookup(namespace: &str, hit: bool) {
    CACHE_LOOKUPS
        .with_label_values(&[namespace, if hit { "hit" } else { "miss" }])
        .inc();
}

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(SMART_SEARCHES.clone()),
        Box::new(SMART_SEARCH_DURATION.clone()),
        Box::new(PROVIDER_SEARCHES.clone()),
        Box::new(PROVIDER_REQUEST_DURATION.clone()),
        Box::new(PROVIDER_CANDIDATES.clone()),
        Box::new(METADATA_LOOKUPS.clone()),
        Box::new(CACHE_LOOKUPS.clone()),
    ]
}

/// Register every core metric in `registry`.
pub fn register_metrics(registry: &Registry) -> prometheus::Result<()> {
    for collector in all_metrics() {
        registry.register(collector)?;
    }
    Ok(())
}
