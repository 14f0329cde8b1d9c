//! # Gateway Telemetry
//!
//! Logging and metrics for the module gateway.
//!
//! ## Components
//!
//! - **Logs**: `tracing` events rendered by `tracing-subscriber`, human
//!   readable in development and JSON in containers
//! - **Metrics**: Prometheus counters, gauges and histograms for the bus
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(&config).expect("Failed to init telemetry");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_SERVICE_NAME` | `module-gateway` | Service name attached to startup logs |
//! | `GATEWAY_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `GATEWAY_JSON_LOGS` | `false` (`true` in containers) | Emit JSON log lines |
//! | `GATEWAY_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

mod config;
mod logging;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, BUS_DELIVERIES_QUEUED,
    BUS_MESSAGES_DELIVERED, BUS_MESSAGES_DROPPED, BUS_MESSAGES_PUBLISHED, ENVELOPE_ERRORS,
    MODULES_ACTIVE, MODULE_ERRORS, MODULE_RECEIVE_DURATION,
};
pub use tracing_setup::{init_tracing, TracingGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first so early bus activity is counted
    let metrics_handle = register_metrics()?;

    let tracing_guard = init_tracing(config)?;

    Ok(TelemetryGuard {
        _tracing: tracing_guard,
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

/// Convenience macro for recording a metric with a value.
#[macro_export]
macro_rules! metric_observe {
    ($metric:expr, $value:expr) => {
        $metric.observe($value)
    };
    ($metric:expr, $labels:expr, $value:expr) => {
        $metric.with_label_values($labels).observe($value)
    };
}
