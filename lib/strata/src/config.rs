//! Pipeline configuration types.
//!
//! A [`PipelineConfig`] describes the canonical pipeline: authorization, extra
//! headers, load balancing, logging, instrumentation and fault tolerance, from
//! innermost to outermost. It can be built in code or loaded from JSON:
//!
//! ```json
//! {
//!   "authorization": "Bearer token",
//!   "backends": ["web01", "web02", "web03:8080"],
//!   "balancing": { "strategy": "random", "seed": 42 },
//!   "logging": { "level": "debug" },
//!   "metrics": null,
//!   "fault_tolerance": { "max_attempts": 3, "backoff_ms": 250 }
//! }
//! ```
//!
//! Missing fields take their default value; `null` disables an optional layer.

use std::time::Duration;

use serde::Deserialize;

use crate::director::{Random, RoundRobin};
use crate::middleware::{
    FaultToleranceLayer, HeaderLayer, InstrumentationLayer, LoadBalancingLayer, LogLevel,
    LoggingLayer, TracingSink,
};
use crate::telemetry::{HistogramConfig, MetricsCounter, MetricsHistogram};
use crate::{Backend, Error, Result, Transform};

/// Configuration of a pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Value of the `Authorization` header added to every request.
    pub authorization: Option<String>,
    /// Extra headers added to every request.
    pub headers: Vec<HeaderConfig>,
    /// Backends as `host[:port]`; load balancing is skipped when empty.
    pub backends: Vec<String>,
    /// How backends are picked.
    pub balancing: Balancing,
    /// Request logging, disabled when `None`.
    pub logging: Option<LoggingConfig>,
    /// Request count and latency, disabled when `None`.
    pub metrics: Option<MetricsConfig>,
    /// Retries, disabled when `None`.
    pub fault_tolerance: Option<FaultToleranceConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            authorization: None,
            headers: Vec::new(),
            backends: Vec::new(),
            balancing: Balancing::default(),
            logging: Some(LoggingConfig::default()),
            metrics: Some(MetricsConfig::default()),
            fault_tolerance: Some(FaultToleranceConfig::default()),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Parse a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| Error::invalid_config(err.to_string()))
    }

    /// Validate the configuration and turn it into transforms.
    ///
    /// The list is ordered innermost first: authorization, extra headers,
    /// load balancing, logging, instrumentation, fault tolerance. Everything
    /// but fault tolerance therefore runs again on each retry.
    ///
    /// # Errors
    ///
    /// Fails on an invalid header or backend.
    pub fn transforms(&self) -> Result<Vec<Transform>> {
        let mut transforms = Vec::new();

        if let Some(token) = &self.authorization {
            transforms.push(Transform::layer(HeaderLayer::authorization(token)?));
        }

        for header in &self.headers {
            transforms.push(Transform::layer(HeaderLayer::new(
                &header.name,
                &header.value,
            )?));
        }

        if !self.backends.is_empty() {
            let backends = self
                .backends
                .iter()
                .map(|host| Backend::parse(host))
                .collect::<Result<Vec<_>>>()?;
            let layer = match self.balancing {
                Balancing::RoundRobin { start } => {
                    LoadBalancingLayer::new(RoundRobin::new(start, backends))
                }
                Balancing::Random { seed } => LoadBalancingLayer::new(Random::new(seed, backends)),
            };
            transforms.push(Transform::layer(layer));
        }

        if let Some(logging) = &self.logging {
            transforms.push(Transform::layer(LoggingLayer::with_sink(logging.sink())));
        }

        if let Some(metrics) = &self.metrics {
            transforms.push(Transform::layer(InstrumentationLayer::new(
                MetricsCounter::new(metrics.counter.clone()),
                MetricsHistogram::new(metrics.histogram.clone()),
            )));
        }

        if let Some(fault_tolerance) = &self.fault_tolerance {
            transforms.push(Transform::layer(FaultToleranceLayer::new(
                fault_tolerance.max_attempts,
                fault_tolerance.backoff(),
            )));
        }

        Ok(transforms)
    }
}

/// A header added to every request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeaderConfig {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

/// Backend selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Balancing {
    /// Cycle through backends, see [`RoundRobin`].
    RoundRobin {
        /// Initial counter value.
        #[serde(default)]
        start: u64,
    },
    /// Pick backends at random, see [`Random`].
    Random {
        /// Generator seed.
        #[serde(default)]
        seed: u64,
    },
}

impl Default for Balancing {
    fn default() -> Self {
        Self::RoundRobin { start: 0 }
    }
}

/// Request logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level of the emitted events.
    pub level: LogLevel,
    /// Text prepended to every line.
    pub prefix: Option<String>,
}

impl LoggingConfig {
    fn sink(&self) -> TracingSink {
        let sink = TracingSink::new(self.level);
        match &self.prefix {
            Some(prefix) => sink.with_prefix(prefix.clone()),
            None => sink,
        }
    }
}

/// Instrumentation settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Name of the request counter.
    pub counter: String,
    /// Latency histogram.
    pub histogram: HistogramConfig,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            counter: "client.requests".to_string(),
            histogram: HistogramConfig::default(),
        }
    }
}

/// Retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FaultToleranceConfig {
    /// Retries after the first attempt.
    pub max_attempts: u32,
    /// Backoff unit in milliseconds.
    pub backoff_ms: u64,
}

impl Default for FaultToleranceConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_ms: 1_000,
        }
    }
}

impl FaultToleranceConfig {
    /// Backoff unit.
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    authorization: Option<String>,
    headers: Vec<HeaderConfig>,
    backends: Option<Vec<String>>,
    balancing: Option<Balancing>,
    logging: Option<Option<LoggingConfig>>,
    metrics: Option<Option<MetricsConfig>>,
    fault_tolerance: Option<Option<FaultToleranceConfig>>,
}

impl PipelineConfigBuilder {
    /// Set the `Authorization` header value.
    #[must_use]
    pub fn authorization(mut self, token: impl Into<String>) -> Self {
        self.authorization = Some(token.into());
        self
    }

    /// Add an extra header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(HeaderConfig {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Set the backends.
    #[must_use]
    pub fn backends<I>(mut self, backends: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.backends = Some(backends.into_iter().map(Into::into).collect());
        self
    }

    /// Set the balancing strategy.
    #[must_use]
    pub const fn balancing(mut self, balancing: Balancing) -> Self {
        self.balancing = Some(balancing);
        self
    }

    /// Set the logging settings.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(Some(logging));
        self
    }

    /// Disable request logging.
    #[must_use]
    pub fn without_logging(mut self) -> Self {
        self.logging = Some(None);
        self
    }

    /// Set the instrumentation settings.
    #[must_use]
    pub fn metrics(mut self, metrics: MetricsConfig) -> Self {
        self.metrics = Some(Some(metrics));
        self
    }

    /// Disable instrumentation.
    #[must_use]
    pub fn without_metrics(mut self) -> Self {
        self.metrics = Some(None);
        self
    }

    /// Set the retry settings.
    #[must_use]
    pub fn fault_tolerance(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.fault_tolerance = Some(Some(FaultToleranceConfig {
            max_attempts,
            backoff_ms: u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
        }));
        self
    }

    /// Disable retries.
    #[must_use]
    pub fn without_fault_tolerance(mut self) -> Self {
        self.fault_tolerance = Some(None);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            authorization: self.authorization.or(defaults.authorization),
            headers: self.headers,
            backends: self.backends.unwrap_or(defaults.backends),
            balancing: self.balancing.unwrap_or(defaults.balancing),
            logging: self.logging.unwrap_or(defaults.logging),
            metrics: self.metrics.unwrap_or(defaults.metrics),
            fault_tolerance: self.fault_tolerance.unwrap_or(defaults.fault_tolerance),
        }
    }
}
