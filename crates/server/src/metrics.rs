//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the ffmfy server:
//! - HTTP request metrics (latency, counts, errors)
//! - WebSocket connection metrics
//! - Session and engine status (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};
use tracing::error;

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
            "ffmfy_http_request_duration_seconds",
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
        Opts::new("ffmfy_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "ffmfy_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Uploaded input bytes.
pub static UPLOAD_BYTES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("ffmfy_upload_bytes_total", "Total bytes of uploaded inputs").unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "ffmfy_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "ffmfy_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// WebSocket messages sent by type.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ffmfy_ws_messages_sent_total", "WebSocket messages sent"),
        &["type"],
    )
    .unwrap()
});

/// WebSocket lag events (when client falls behind).
pub static WS_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "ffmfy_ws_lag_events_total",
        "WebSocket lag events (client fell behind)",
    )
    .unwrap()
});

// =============================================================================
// Session Metrics (collected dynamically)
// =============================================================================

/// Current session state (1 for the active state, 0 otherwise).
pub static SESSION_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("ffmfy_session_state", "Current session state"),
        &["state"],
    )
    .unwrap()
});

/// Engine readiness (1 = ready, 0 = not ready).
pub static ENGINE_READY: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "ffmfy_engine_ready",
        "Whether the conversion engine is loaded (1) or not (0)",
    )
    .unwrap()
});

const SESSION_STATES: [&str; 6] = [
    "idle",
    "loaded",
    "format_selected",
    "converting",
    "completed",
    "failed",
];

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // HTTP
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()),
        Box::new(UPLOAD_BYTES_TOTAL.clone()),
        // WebSocket
        Box::new(WS_CONNECTIONS_ACTIVE.clone()),
        Box::new(WS_CONNECTIONS_TOTAL.clone()),
        Box::new(WS_MESSAGES_SENT.clone()),
        Box::new(WS_LAG_EVENTS.clone()),
        // Session
        Box::new(SESSION_STATE.clone()),
        Box::new(ENGINE_READY.clone()),
    ];

    // Core metrics (admission, conversions, engine loads)
    for metric in collectors
        .into_iter()
        .chain(ffmfy_core::metrics::all_metrics())
    {
        if let Err(e) = registry.register(metric) {
            error!("Failed to register metric: {}", e);
        }
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Collect dynamic metrics from current application state.
///
/// This is called before encoding metrics to update gauges with the current
/// session state and engine status.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let snapshot = state.orchestrator().snapshot().await;

    for state_type in SESSION_STATES {
        SESSION_STATE
            .with_label_values(&[state_type])
            .set(i64::from(snapshot.state == state_type));
    }

    ENGINE_READY.set(i64::from(snapshot.engine.is_ready()));
}

/// Label for the route that served a request.
///
/// Matched routes are labelled with their template. Unmatched API paths share
/// one label, and everything else is static UI content.
pub fn route_label(matched: Option<&str>, path: &str) -> String {
    match matched {
        Some(route) => route.to_string(),
        None if path.starts_with("/api/") => "/{unmatched}".to_string(),
        None => "/{static}".to_string(),
    }
}
