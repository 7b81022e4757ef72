//! Load balancing middleware.
//!
//! Hands every request to a [`Director`] which moves it onto a backend, then
//! delegates. The selection policy lives entirely in the director.

use std::fmt;
use std::sync::Arc;

use tower::Layer;

use crate::director::Director;
use crate::{Request, SendFuture, Sender};

/// Layer that spreads requests across backends.
///
/// # Example
///
/// ```ignore
/// use strata::middleware::LoadBalancingLayer;
/// use strata::RoundRobin;
///
/// let layer = LoadBalancingLayer::new(RoundRobin::from_hosts(0, ["web01", "web02"])?);
/// ```
#[derive(Clone)]
pub struct LoadBalancingLayer {
    director: Arc<dyn Director>,
}

impl LoadBalancingLayer {
    /// Create a layer using the given director.
    pub fn new(director: impl Director + 'static) -> Self {
        Self {
            director: Arc::new(director),
        }
    }
}

impl fmt::Debug for LoadBalancingLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadBalancingLayer").finish_non_exhaustive()
    }
}

impl<S> Layer<S> for LoadBalancingLayer {
    type Service = LoadBalancing<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoadBalancing {
            inner,
            director: Arc::clone(&self.director),
        }
    }
}

/// Sender that directs each request to a backend before delegating.
#[derive(Clone)]
pub struct LoadBalancing<S> {
    inner: S,
    director: Arc<dyn Director>,
}

impl<S: fmt::Debug> fmt::Debug for LoadBalancing<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadBalancing")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<S: Sender> Sender for LoadBalancing<S> {
    fn send<'a>(&'a self, request: &'a mut Request) -> SendFuture<'a> {
        Box::pin(async move {
            self.director.direct(request)?;
            self.inner.send(request).await
        })
    }
}
