//! Observability: structured logging and Prometheus metrics.

mod metrics;
mod tracing;

pub use metrics::{
    MetricsConfig, MetricsError, init_metrics, record_fill_resolution, record_forced_liquidation,
    record_order_submission, record_protective_rearm, record_sentinel_tick,
    update_open_positions,
};
pub use tracing::{DEFAULT_DIRECTIVE, build_filter, init_tracing};
