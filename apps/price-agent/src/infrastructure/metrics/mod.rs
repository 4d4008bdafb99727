//! Prometheus Metrics Module
//!
//! Exposes application metrics in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Requests**: HTTP query counts by endpoint and outcome
//! - **Cache**: Polling cache update outcomes and cycle durations
//!
//! # Integration
//!
//! Metrics are scraped from the exporter's own listener, started by
//! [`init_metrics`] when a port is configured. Without a recorder the
//! recording functions are no-ops.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

// =============================================================================
// Exporter
// =============================================================================

/// Install the Prometheus recorder and its HTTP listener on `port`.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns `BuildError` if the recorder or listener cannot be installed.
pub fn init_metrics(port: u16) -> Result<(), BuildError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    register_metrics();
    tracing::info!(port, "Metrics exporter listening");
    Ok(())
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "price_agent_http_requests_total",
        "Total price queries served over HTTP by endpoint and outcome"
    );
    describe_counter!(
        "price_agent_cache_updates_total",
        "Total polling cache price updates by outcome"
    );
    describe_histogram!(
        "price_agent_cache_cycle_seconds",
        "Time to refresh every configured pair once"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Metric labels for HTTP query endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Single-pair query.
    Price,
    /// Multi-pair query.
    Prices,
}

impl Endpoint {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Prices => "prices",
        }
    }
}

/// Metric labels for how a query ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Prices were written.
    Served,
    /// Nothing was requested.
    Empty,
    /// Requested pair missing from the provider result.
    NotFound,
    /// Wrong `Content-Type`.
    UnsupportedMediaType,
    /// Body could not be decoded.
    BadRequest,
    /// Provider call failed.
    ProviderFailed,
    /// Price hook rejected the prices.
    HookFailed,
    /// Response could not be marshalled.
    MarshalFailed,
}

impl RequestOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Served => "served",
            Self::Empty => "empty",
            Self::NotFound => "not_found",
            Self::UnsupportedMediaType => "unsupported_media_type",
            Self::BadRequest => "bad_request",
            Self::ProviderFailed => "provider_failed",
            Self::HookFailed => "hook_failed",
            Self::MarshalFailed => "marshal_failed",
        }
    }
}

/// Record a finished HTTP query.
pub fn record_request(endpoint: Endpoint, outcome: RequestOutcome) {
    counter!(
        "price_agent_http_requests_total",
        "endpoint" => endpoint.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Record a single cache update attempt.
pub fn record_cache_update(success: bool) {
    counter!(
        "price_agent_cache_updates_total",
        "outcome" => if success { "updated" } else { "skipped" }
    )
    .increment(1);
}

/// Record how long a full refresh cycle took.
pub fn record_cache_cycle(duration: Duration) {
    histogram!("price_agent_cache_cycle_seconds").record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================
