//! Prometheus metrics for the module gateway.
//!
//! All metrics follow the naming convention: `gateway_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., messages_published_total)
//! - **Gauge**: Value that can go up or down (e.g., modules_active)
//! - **Histogram**: Distribution of values (e.g., receive_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // BUS METRICS
    // =========================================================================

    /// Messages accepted by `publish`
    pub static ref BUS_MESSAGES_PUBLISHED: Counter = Counter::new(
        "gateway_bus_messages_published_total",
        "Total number of messages published on the bus"
    ).expect("metric creation failed");

    /// Per-module queue insertions (one publish fans out to many)
    pub static ref BUS_DELIVERIES_QUEUED: Counter = Counter::new(
        "gateway_bus_deliveries_queued_total",
        "Total number of messages queued for a module"
    ).expect("metric creation failed");

    /// Messages handed to a module's receive hook
    pub static ref BUS_MESSAGES_DELIVERED: Counter = Counter::new(
        "gateway_bus_messages_delivered_total",
        "Total number of messages delivered to module receive hooks"
    ).expect("metric creation failed");

    /// Messages that never reached a receive hook
    pub static ref BUS_MESSAGES_DROPPED: CounterVec = CounterVec::new(
        Opts::new("gateway_bus_messages_dropped_total", "Messages dropped before delivery"),
        &["reason"]  // reason: overflow/closed/removed
    ).expect("metric creation failed");

    /// Modules currently attached to a bus
    pub static ref MODULES_ACTIVE: Gauge = Gauge::new(
        "gateway_modules_active",
        "Number of modules currently attached to a bus"
    ).expect("metric creation failed");

    /// Time spent inside module receive hooks
    pub static ref MODULE_RECEIVE_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "gateway_module_receive_duration_seconds",
            "Time spent in module receive hooks"
        ).buckets(exponential_buckets(0.00001, 2.0, 18).unwrap())
    ).expect("metric creation failed");

    // =========================================================================
    // ERROR METRICS
    // =========================================================================

    /// Module lifecycle failures by kind and stage
    pub static ref MODULE_ERRORS: CounterVec = CounterVec::new(
        Opts::new("gateway_module_errors_total", "Module errors by kind and stage"),
        &["kind", "stage"]  // stage: create/attach
    ).expect("metric creation failed");

    /// Envelopes that failed to decode
    pub static ref ENVELOPE_ERRORS: Counter = Counter::new(
        "gateway_envelope_errors_total",
        "Total number of envelopes rejected by the decoder"
    ).expect("metric creation failed");
}

/// Handle to the registered metrics
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Bus
        Box::new(BUS_MESSAGES_PUBLISHED.clone()),
        Box::new(BUS_DELIVERIES_QUEUED.clone()),
        Box::new(BUS_MESSAGES_DELIVERED.clone()),
        Box::new(BUS_MESSAGES_DROPPED.clone()),
        Box::new(MODULES_ACTIVE.clone()),
        Box::new(MODULE_RECEIVE_DURATION.clone()),
        // Errors
        Box::new(MODULE_ERRORS.clone()),
        Box::new(ENVELOPE_ERRORS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
