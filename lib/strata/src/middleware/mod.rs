//! Tower middleware layers for strata senders.
//!
//! Each layer adds one orthogonal behavior to a [`Sender`](crate::Sender)
//! and knows nothing about the others. Turn a layer into a
//! [`Transform`](crate::Transform) with [`Transform::layer`](crate::Transform::layer),
//! or hand it to [`PipelineBuilder::layer`](crate::PipelineBuilder::layer).
//!
//! # Available Layers
//!
//! - [`LoggingLayer`] - Emits one line per request (user agent, method, URL)
//! - [`InstrumentationLayer`] - Counts requests and observes their latency
//! - [`HeaderLayer`] - Appends a fixed header, e.g. `Authorization`
//! - [`FaultToleranceLayer`] - Retries failures with linear backoff
//! - [`LoadBalancingLayer`] - Moves each request onto a backend picked by a [`Director`](crate::Director)
//!
//! # Ordering
//!
//! The layer applied last is outermost and sees the request first. A layer
//! applied before [`FaultToleranceLayer`] runs again on every attempt; one
//! applied after it runs once per call.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use strata::{Pipeline, RoundRobin};
//!
//! let pipeline = Pipeline::builder(transport)
//!     .with_authorization("token")?
//!     .with_load_balancing(RoundRobin::from_hosts(0, ["web01", "web02", "web03"])?)
//!     .with_logging()
//!     .with_fault_tolerance(5, Duration::from_secs(1))
//!     .build();
//! ```

mod fault_tolerance;
mod header;
mod instrumentation;
mod load_balancing;
mod logging;

pub use fault_tolerance::{FaultTolerance, FaultToleranceLayer, RetryPredicate};
pub use header::{HeaderInjection, HeaderLayer};
pub use instrumentation::{Instrumentation, InstrumentationLayer};
pub use load_balancing::{LoadBalancing, LoadBalancingLayer};
pub use logging::{LogLevel, LogSink, Logging, LoggingLayer, TracingSink};

// Re-export tower types for convenience
pub use tower::Layer;

#[cfg(test)]
pub(crate) mod testing {
    //! Mock senders shared by the middleware tests.

    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::{Error, Method, Request, Response, SendFuture, Sender};

    /// Mock sender failing a fixed number of times before succeeding.
    #[derive(Clone, Default)]
    pub(crate) struct MockSender {
        failures: u32,
        calls: Arc<AtomicU32>,
    }

    impl MockSender {
        pub(crate) fn succeeding() -> Self {
            Self::default()
        }

        pub(crate) fn failing_times(failures: u32) -> Self {
            Self {
                failures,
                calls: Arc::default(),
            }
        }

        pub(crate) fn always_failing() -> Self {
            Self::failing_times(u32::MAX)
        }

        pub(crate) fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Sender for MockSender {
        fn send<'a>(&'a self, _request: &'a mut Request) -> SendFuture<'a> {
            let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Box::pin(async move {
                if attempt <= self.failures {
                    Err(Error::connection(format!("attempt {attempt} failed")))
                } else {
                    Ok(Response::with_status(200))
                }
            })
        }
    }

    pub(crate) fn create_request() -> Request {
        Request::try_builder(Method::Get, "https://example.com/test")
            .and_then(|builder| builder.user_agent("strata-test").build())
            .expect("valid request")
    }
}
