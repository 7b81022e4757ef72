//! Assembled pipelines.

use std::fmt;
use std::time::Duration;

use tower::Layer;

use crate::config::PipelineConfig;
use crate::director::Director;
use crate::middleware::{
    FaultToleranceLayer, HeaderLayer, InstrumentationLayer, LoadBalancingLayer, LogSink,
    LoggingLayer,
};
use crate::telemetry::{Counter, Histogram};
use crate::{BoxSender, Request, Result, SendFuture, Sender, Transform, compose_boxed};

/// A base sender wrapped in an ordered stack of transforms.
///
/// A pipeline is itself a [`Sender`]; it is immutable once built and can be
/// shared (e.g. in an `Arc`) by any number of concurrent callers.
pub struct Pipeline {
    sender: BoxSender,
    depth: usize,
}

impl Pipeline {
    /// Start building a pipeline around `base`.
    pub fn builder<S>(base: S) -> PipelineBuilder
    where
        S: Sender + 'static,
    {
        PipelineBuilder {
            base: Box::new(base),
            transforms: Vec::new(),
        }
    }

    /// Build the pipeline described by `config` around `base`.
    ///
    /// See [`PipelineConfig::transforms`] for the resulting layer order.
    pub fn from_config<S>(base: S, config: &PipelineConfig) -> Result<Self>
    where
        S: Sender + 'static,
    {
        let pipeline = config
            .transforms()?
            .into_iter()
            .fold(Self::builder(base), PipelineBuilder::transform)
            .build();
        Ok(pipeline)
    }

    /// Number of transforms wrapped around the base sender.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Unwrap into the assembled sender.
    #[must_use]
    pub fn into_sender(self) -> BoxSender {
        self.sender
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl Sender for Pipeline {
    fn send<'a>(&'a self, request: &'a mut Request) -> SendFuture<'a> {
        self.sender.send(request)
    }
}

/// Builder for [`Pipeline`].
///
/// Transforms are applied in the order they are added: the first one wraps
/// the base sender, the last one is outermost and sees each request first.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use strata::{Pipeline, RoundRobin};
/// use strata::telemetry::{HistogramConfig, MetricsCounter, MetricsHistogram};
///
/// let pipeline = Pipeline::builder(transport)
///     .with_authorization("token")?
///     .with_load_balancing(RoundRobin::from_hosts(0, ["web01", "web02", "web03"])?)
///     .with_logging()
///     .with_instrumentation(
///         MetricsCounter::new("client.requests"),
///         MetricsHistogram::new(HistogramConfig::named("client.latency")),
///     )
///     .with_fault_tolerance(5, Duration::from_secs(1))
///     .build();
/// ```
pub struct PipelineBuilder {
    base: BoxSender,
    transforms: Vec<Transform>,
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("transforms_count", &self.transforms.len())
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    // ========================================================================
    // Generic API
    // ========================================================================

    /// Add a transform.
    #[must_use]
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Add a tower layer whose service is a [`Sender`].
    #[must_use]
    pub fn layer<L>(self, layer: L) -> Self
    where
        L: Layer<BoxSender> + Send + Sync + 'static,
        L::Service: Sender + 'static,
    {
        self.transform(Transform::layer(layer))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Log every request through `tracing`.
    #[must_use]
    pub fn with_logging(self) -> Self {
        self.layer(LoggingLayer::new())
    }

    /// Log every request to the given sink.
    #[must_use]
    pub fn with_log_sink(self, sink: impl LogSink + 'static) -> Self {
        self.layer(LoggingLayer::with_sink(sink))
    }

    /// Append `name: value` to every request.
    pub fn with_header(self, name: &str, value: &str) -> Result<Self> {
        Ok(self.layer(HeaderLayer::new(name, value)?))
    }

    /// Append `Authorization: <token>` to every request.
    pub fn with_authorization(self, token: &str) -> Result<Self> {
        Ok(self.layer(HeaderLayer::authorization(token)?))
    }

    /// Spread requests across backends chosen by `director`.
    #[must_use]
    pub fn with_load_balancing(self, director: impl Director + 'static) -> Self {
        self.layer(LoadBalancingLayer::new(director))
    }

    /// Count requests and observe their latency.
    #[must_use]
    pub fn with_instrumentation(
        self,
        counter: impl Counter + 'static,
        histogram: impl Histogram + 'static,
    ) -> Self {
        self.layer(InstrumentationLayer::new(counter, histogram))
    }

    /// Retry failures up to `max_attempts` times with linear backoff.
    #[must_use]
    pub fn with_fault_tolerance(self, max_attempts: u32, backoff: Duration) -> Self {
        self.layer(FaultToleranceLayer::new(max_attempts, backoff))
    }

    /// Assemble the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        let depth = self.transforms.len();
        Pipeline {
            sender: compose_boxed(self.base, self.transforms),
            depth,
        }
    }
}
