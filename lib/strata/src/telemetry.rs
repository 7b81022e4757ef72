//! Counter and histogram collaborators for the instrumentation middleware.
//!
//! The middleware only needs [`Counter::add`] and [`Histogram::observe`]; how
//! values are aggregated or exported is up to the implementation.
//!
//! - [`MetricsCounter`] and [`MetricsHistogram`] report through the `metrics`
//!   crate facade, so any installed recorder (Prometheus, `StatsD`, ...) sees them.
//! - [`AtomicCounter`] and [`RecordingHistogram`] keep values in process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Deserialize;

/// A monotonically increasing count.
pub trait Counter: Send + Sync {
    /// Increment by `delta`.
    fn add(&self, delta: u64);
}

/// A distribution of latencies.
pub trait Histogram: Send + Sync {
    /// Record one observation.
    fn observe(&self, elapsed: Duration);
}

impl<C: Counter + ?Sized> Counter for Arc<C> {
    fn add(&self, delta: u64) {
        (**self).add(delta);
    }
}

impl<H: Histogram + ?Sized> Histogram for Arc<H> {
    fn observe(&self, elapsed: Duration) {
        (**self).observe(elapsed);
    }
}

// ============================================================================
// metrics facade
// ============================================================================

/// Histogram construction parameters.
///
/// Only `name` is used when recording through the `metrics` facade; bounds,
/// precision and quantiles are carried for recorders that want them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HistogramConfig {
    /// Metric name.
    pub name: String,
    /// Lowest trackable value, in nanoseconds.
    pub min: u64,
    /// Highest trackable value, in nanoseconds.
    pub max: u64,
    /// Number of significant decimal digits.
    pub significant_figures: u8,
    /// Quantiles of interest, in percent.
    pub quantiles: Vec<f64>,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            name: "client.latency".to_string(),
            min: 0,
            max: 10_000_000_000,
            significant_figures: 3,
            quantiles: vec![50.0, 90.0, 95.0, 99.0],
        }
    }
}

impl HistogramConfig {
    /// Default configuration under another name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// [`Counter`] backed by `metrics::counter!`.
#[derive(Debug, Clone)]
pub struct MetricsCounter {
    name: String,
}

impl MetricsCounter {
    /// Create a counter reporting under `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Metric name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Counter for MetricsCounter {
    fn add(&self, delta: u64) {
        metrics::counter!(self.name.clone()).increment(delta);
    }
}

/// [`Histogram`] backed by `metrics::histogram!`, recording seconds.
#[derive(Debug, Clone)]
pub struct MetricsHistogram {
    config: HistogramConfig,
}

impl MetricsHistogram {
    /// Create a histogram from its configuration.
    #[must_use]
    pub fn new(config: HistogramConfig) -> Self {
        Self { config }
    }

    /// The configuration this histogram was created with.
    #[must_use]
    pub const fn config(&self) -> &HistogramConfig {
        &self.config
    }
}

impl Histogram for MetricsHistogram {
    fn observe(&self, elapsed: Duration) {
        metrics::histogram!(self.config.name.clone()).record(elapsed.as_secs_f64());
    }
}

// ============================================================================
// in-process
// ============================================================================

/// [`Counter`] kept in an atomic.
#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicU64,
}

impl AtomicCounter {
    /// Create a counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}

impl Counter for AtomicCounter {
    fn add(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::SeqCst);
    }
}

/// [`Histogram`] keeping every observation.
#[derive(Debug, Default)]
pub struct RecordingHistogram {
    observations: Mutex<Vec<Duration>>,
}

impl RecordingHistogram {
    /// Create an empty histogram.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All observations so far, in recording order.
    #[must_use]
    pub fn observations(&self) -> Vec<Duration> {
        self.observations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of observations so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.observations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Histogram for RecordingHistogram {
    fn observe(&self, elapsed: Duration) {
        self.observations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(elapsed);
    }
}
