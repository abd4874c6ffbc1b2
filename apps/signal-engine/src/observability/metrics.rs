//! Prometheus metrics for the signal engine.
//!
//! Recording functions are safe to call without an installed recorder;
//! the `metrics` facade drops the samples.
//!
//! # Example
//!
//! ```ignore
//! use signal_engine::observability::{init_metrics, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::default())?;
//! record_order_submission("equities", "accepted", 1);
//! ```

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for durations (in seconds).
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 9090)),
            // 10ms to 60s; ticks include settle delays and fill polling
            latency_buckets: vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0],
        }
    }
}

impl MetricsConfig {
    /// Create a metrics configuration with a custom address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// Starts an HTTP listener that serves `/metrics`.
///
/// # Errors
///
/// Returns an error if the exporter fails to start (e.g. port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Order Metrics
// ============================================================================

/// Record a submission loop outcome.
///
/// # Arguments
///
/// * `product` - Product line (`equities`, `options`, `short_equities`)
/// * `status` - `accepted`, `rejected`, `exhausted`, or `deadline`
/// * `attempts` - Attempts the retry loop made
pub fn record_order_submission(product: &str, status: &str, attempts: u32) {
    counter!(
        "order_submissions_total",
        "product" => product.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!("order_submit_attempts").record(f64::from(attempts));
}

/// Record how a fill resolved and how many polls it took.
pub fn record_fill_resolution(outcome: &str, polls: u32) {
    counter!("fill_resolutions_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("fill_poll_count").record(f64::from(polls));
}

// ============================================================================
// Protective Order Metrics
// ============================================================================

/// Record a protective re-arm (`armed`, `unchanged`, `failed`).
pub fn record_protective_rearm(result: &str) {
    counter!("protective_rearms_total", "result" => result.to_string()).increment(1);
}

/// Record a forced liquidation.
pub fn record_forced_liquidation(product: &str) {
    counter!("forced_liquidations_total", "product" => product.to_string()).increment(1);
}

// ============================================================================
// Sentinel Metrics
// ============================================================================

/// Record a sentinel tick.
///
/// # Arguments
///
/// * `market_open` - Whether the regular session was open
/// * `errors` - Per-position errors collected during the tick
/// * `duration_seconds` - Wall-clock tick duration
pub fn record_sentinel_tick(market_open: bool, errors: usize, duration_seconds: f64) {
    let market = if market_open { "open" } else { "closed" };
    counter!("sentinel_ticks_total", "market" => market).increment(1);
    if errors > 0 {
        counter!("sentinel_tick_errors_total").increment(errors as u64);
    }
    histogram!("sentinel_tick_duration_seconds").record(duration_seconds);
}

/// Update the open positions gauge.
pub fn update_open_positions(mode: &str, count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("open_positions", "mode" => mode.to_string()).set(count as f64);
}
