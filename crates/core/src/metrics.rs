//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Admission (accepted and refused input files)
//! - Conversions (outcomes, durations, output sizes)
//! - Engine (load attempts)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Admission Metrics
// =============================================================================

/// Input files offered to the session, by outcome.
pub static ADMISSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ffmfy_admissions_total", "Total input files offered"),
        // "accepted", "no_file_selected", "unsupported_file_type",
        // "file_too_small", "file_too_large", "unsupported_media"
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Conversions total by outcome and output media type.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ffmfy_conversions_total", "Total conversions"),
        &["outcome", "media_type"], // outcome: "success", "failed", "superseded"
    )
    .unwrap()
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "ffmfy_conversion_duration_seconds",
            "Duration of conversions",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["outcome"],
    )
    .unwrap()
});

/// Size of converted output files.
pub static OUTPUT_BYTES: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("ffmfy_output_bytes", "Size of conversion outputs")
            .buckets(prometheus::exponential_buckets(64.0 * 1024.0, 4.0, 8).unwrap_or_default()),
        &["media_type"],
    )
    .unwrap()
});

// =============================================================================
// Engine Metrics
// =============================================================================

/// Engine load attempts by result.
pub static ENGINE_LOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ffmfy_engine_loads_total", "Total engine load attempts"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(ADMISSIONS_TOTAL.clone()),
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(OUTPUT_BYTES.clone()),
        Box::new(ENGINE_LOADS.clone()),
    ]
}
