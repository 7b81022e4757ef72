//! Retry middleware with linear backoff.
//!
//! A failed call is retried up to `max_attempts` more times. Before retry
//! number `n` (starting at 1) the task sleeps for `backoff * n`. The same
//! request is handed to every attempt, so changes made to it by inner layers
//! carry over.
//!
//! The request's [`CancellationToken`](crate::CancellationToken) is checked
//! before every attempt and raced against every backoff sleep.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tower::Layer;
use tracing::warn;

use crate::{Error, Request, SendFuture, Sender};

/// Decides whether a failure is worth another attempt.
pub type RetryPredicate = Arc<dyn Fn(&Error) -> bool + Send + Sync>;

/// Layer that retries failed requests.
///
/// By default every failure is retried.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use strata::middleware::FaultToleranceLayer;
///
/// // 1 + 5 attempts, sleeping 1s, 2s, 3s, 4s, 5s in between
/// let layer = FaultToleranceLayer::new(5, Duration::from_secs(1))
///     .retry_if(|err| err.is_connection() || err.is_timeout());
/// ```
#[derive(Clone)]
pub struct FaultToleranceLayer {
    max_attempts: u32,
    backoff: Duration,
    retryable: RetryPredicate,
}

impl FaultToleranceLayer {
    /// Create a retry layer.
    ///
    /// `max_attempts` counts retries, not including the first attempt.
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
            retryable: Arc::new(|_| true),
        }
    }

    /// Only retry failures matching `predicate`.
    #[must_use]
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        self.retryable = Arc::new(predicate);
        self
    }

    /// Maximum number of retries.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff unit.
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        self.backoff
    }
}

impl fmt::Debug for FaultToleranceLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultToleranceLayer")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl<S> Layer<S> for FaultToleranceLayer {
    type Service = FaultTolerance<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FaultTolerance {
            inner,
            max_attempts: self.max_attempts,
            backoff: self.backoff,
            retryable: Arc::clone(&self.retryable),
        }
    }
}

/// Sender that retries failed requests.
#[derive(Clone)]
pub struct FaultTolerance<S> {
    inner: S,
    max_attempts: u32,
    backoff: Duration,
    retryable: RetryPredicate,
}

impl<S: fmt::Debug> fmt::Debug for FaultTolerance<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultTolerance")
            .field("inner", &self.inner)
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl<S: Sender> Sender for FaultTolerance<S> {
    fn send<'a>(&'a self, request: &'a mut Request) -> SendFuture<'a> {
        Box::pin(async move {
            let cancellation = request.cancellation().clone();
            let mut retry = 0;

            loop {
                if cancellation.is_cancelled() {
                    return Err(Error::Cancelled);
                }

                let error = match self.inner.send(request).await {
                    Ok(response) => return Ok(response),
                    Err(error) => error,
                };

                if retry >= self.max_attempts || !(self.retryable)(&error) {
                    return Err(error);
                }

                retry += 1;
                let delay = self.backoff.saturating_mul(retry);
                warn!(
                    retry,
                    max_attempts = self.max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %error,
                    "request failed, retrying"
                );

                tokio::select! {
                    () = cancellation.cancelled() => return Err(Error::Cancelled),
                    () = tokio::time::sleep(delay) => {}
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use tokio::time::Instant;

    use super::*;
    use crate::CancellationToken;
    use crate::middleware::testing::{MockSender, create_request};

    const BACKOFF: Duration = Duration::from_millis(100);

    #[test]
    fn layer_accessors() {
        let layer = FaultToleranceLayer::new(5, Duration::from_secs(1));
        check!(layer.max_attempts() == 5);
        check!(layer.backoff() == Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn success_does_not_retry() {
        let mock = MockSender::succeeding();
        let service = FaultToleranceLayer::new(3, BACKOFF).layer(mock.clone());

        let start = Instant::now();
        let mut request = create_request();
        let_assert!(Ok(_) = service.send(&mut request).await);

        check!(mock.calls() == 1);
        check!(start.elapsed() == Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_within_budget() {
        let mock = MockSender::failing_times(3);
        let service = FaultToleranceLayer::new(3, BACKOFF).layer(mock.clone());

        let start = Instant::now();
        let mut request = create_request();
        let_assert!(Ok(response) = service.send(&mut request).await);

        check!(response.status() == 200);
        check!(mock.calls() == 4);
        // 100ms + 200ms + 300ms
        check!(start.elapsed() >= Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_with_last_failure() {
        let mock = MockSender::failing_times(5);
        let service = FaultToleranceLayer::new(2, BACKOFF).layer(mock.clone());

        let start = Instant::now();
        let mut request = create_request();
        let_assert!(Err(Error::Connection(message)) = service.send(&mut request).await);

        check!(message == "attempt 3 failed");
        check!(mock.calls() == 3);
        // 100ms + 200ms, no sleep after the last attempt
        check!(start.elapsed() >= Duration::from_millis(300));
        check!(start.elapsed() < Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_means_single_call() {
        let mock = MockSender::always_failing();
        let service = FaultToleranceLayer::new(0, BACKOFF).layer(mock.clone());

        let mut request = create_request();
        let_assert!(Err(_) = service.send(&mut request).await);
        check!(mock.calls() == 1);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_failure_returns_immediately() {
        let mock = MockSender::always_failing();
        let service = FaultToleranceLayer::new(5, BACKOFF)
            .retry_if(Error::is_timeout)
            .layer(mock.clone());

        let mut request = create_request();
        let_assert!(Err(Error::Connection(_)) = service.send(&mut request).await);
        check!(mock.calls() == 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_first_attempt() {
        let mock = MockSender::succeeding();
        let service = FaultToleranceLayer::new(3, BACKOFF).layer(mock.clone());

        let token = CancellationToken::new();
        token.cancel();
        let mut request = Request::try_builder(crate::Method::Get, "https://example.com/")
            .and_then(|builder| builder.cancellation(token).build())
            .expect("valid request");

        let_assert!(Err(Error::Cancelled) = service.send(&mut request).await);
        check!(mock.calls() == 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_during_backoff() {
        let mock = MockSender::always_failing();
        let service = FaultToleranceLayer::new(5, Duration::from_secs(10)).layer(mock.clone());

        let token = CancellationToken::new();
        let mut request = Request::try_builder(crate::Method::Get, "https://example.com/")
            .and_then(|builder| builder.cancellation(token.clone()).build())
            .expect("valid request");

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        });

        let start = Instant::now();
        let_assert!(Err(Error::Cancelled) = service.send(&mut request).await);
        check!(mock.calls() == 1);
        check!(start.elapsed() < Duration::from_secs(10));
        canceller.await.expect("canceller");
    }
}
