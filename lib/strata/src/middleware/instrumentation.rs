//! Request instrumentation middleware.
//!
//! Counts requests and observes how long each delegated call took, whatever
//! its outcome.

use std::fmt;
use std::sync::Arc;

use tokio::time::Instant;
use tower::Layer;

use crate::telemetry::{Counter, Histogram};
use crate::{Request, SendFuture, Sender};

/// Layer that records a count and a latency for each request.
///
/// # Example
///
/// ```ignore
/// use strata::middleware::InstrumentationLayer;
/// use strata::telemetry::{HistogramConfig, MetricsCounter, MetricsHistogram};
///
/// let layer = InstrumentationLayer::new(
///     MetricsCounter::new("client.requests"),
///     MetricsHistogram::new(HistogramConfig::named("client.latency")),
/// );
/// ```
#[derive(Clone)]
pub struct InstrumentationLayer {
    counter: Arc<dyn Counter>,
    histogram: Arc<dyn Histogram>,
}

impl InstrumentationLayer {
    /// Create a layer recording into the given collaborators.
    pub fn new(counter: impl Counter + 'static, histogram: impl Histogram + 'static) -> Self {
        Self {
            counter: Arc::new(counter),
            histogram: Arc::new(histogram),
        }
    }
}

impl fmt::Debug for InstrumentationLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentationLayer").finish_non_exhaustive()
    }
}

impl<S> Layer<S> for InstrumentationLayer {
    type Service = Instrumentation<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Instrumentation {
            inner,
            counter: Arc::clone(&self.counter),
            histogram: Arc::clone(&self.histogram),
        }
    }
}

/// Sender that records a count and a latency for each request.
#[derive(Clone)]
pub struct Instrumentation<S> {
    inner: S,
    counter: Arc<dyn Counter>,
    histogram: Arc<dyn Histogram>,
}

impl<S: fmt::Debug> fmt::Debug for Instrumentation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrumentation")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<S: Sender> Sender for Instrumentation<S> {
    fn send<'a>(&'a self, request: &'a mut Request) -> SendFuture<'a> {
        Box::pin(async move {
            let _observation = Observation::start(&*self.counter, &*self.histogram);
            self.inner.send(request).await
        })
    }
}

/// Records on drop, so every way out of the delegated call is measured once.
struct Observation<'a> {
    start: Instant,
    counter: &'a dyn Counter,
    histogram: &'a dyn Histogram,
}

impl<'a> Observation<'a> {
    fn start(counter: &'a dyn Counter, histogram: &'a dyn Histogram) -> Self {
        Self {
            start: Instant::now(),
            counter,
            histogram,
        }
    }
}

impl Drop for Observation<'_> {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed());
        self.counter.add(1);
    }
}
