//! Request logging middleware.
//!
//! Before each request is delegated, one line `"{user_agent}: {method} {url}"`
//! is written to a [`LogSink`]. The default sink forwards it to `tracing`.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use tower::Layer;
use tracing::{Instrument, debug, info, info_span};

use crate::{Request, SendFuture, Sender};

/// Destination of the lines written by [`Logging`].
pub trait LogSink: Send + Sync {
    /// Write one formatted line.
    fn log(&self, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, line: &str) {
        self(line);
    }
}

/// Log level for the [`TracingSink`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Log at debug level.
    Debug,
    /// Log at info level.
    #[default]
    Info,
}

/// [`LogSink`] emitting `tracing` events.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    level: LogLevel,
    prefix: Option<Arc<str>>,
}

impl TracingSink {
    /// Create a sink logging at the given level.
    #[must_use]
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            prefix: None,
        }
    }

    /// Prepend `prefix` to every line.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(Arc::from(prefix.into()));
        self
    }
}

impl LogSink for TracingSink {
    fn log(&self, line: &str) {
        let prefix = self.prefix.as_deref().unwrap_or_default();
        match self.level {
            LogLevel::Debug => debug!("{prefix}{line}"),
            LogLevel::Info => info!("{prefix}{line}"),
        }
    }
}

/// Layer that logs every request.
///
/// # Example
///
/// ```ignore
/// use strata::middleware::{LoggingLayer, TracingSink, LogLevel};
/// use strata::Transform;
///
/// let logging = Transform::layer(LoggingLayer::with_sink(
///     TracingSink::new(LogLevel::Info).with_prefix("client: "),
/// ));
/// ```
#[derive(Clone)]
pub struct LoggingLayer {
    sink: Arc<dyn LogSink>,
}

impl LoggingLayer {
    /// Create a logging layer writing to `tracing` at info level.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sink(TracingSink::default())
    }

    /// Create a logging layer writing to `tracing` at debug level.
    #[must_use]
    pub fn debug() -> Self {
        Self::with_sink(TracingSink::new(LogLevel::Debug))
    }

    /// Create a logging layer writing to the given sink.
    #[must_use]
    pub fn with_sink(sink: impl LogSink + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }
}

impl Default for LoggingLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LoggingLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingLayer").finish_non_exhaustive()
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = Logging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Logging {
            inner,
            sink: Arc::clone(&self.sink),
        }
    }
}

/// Sender that logs requests before delegating them.
#[derive(Clone)]
pub struct Logging<S> {
    inner: S,
    sink: Arc<dyn LogSink>,
}

impl<S> Logging<S> {
    /// Create a new logging sender wrapping the given sender.
    pub fn new(inner: S) -> Self {
        LoggingLayer::new().layer(inner)
    }
}

impl<S: fmt::Debug> fmt::Debug for Logging<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logging")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<S: Sender> Sender for Logging<S> {
    fn send<'a>(&'a self, request: &'a mut Request) -> SendFuture<'a> {
        let method = request.method();
        let url = request.url().to_string();
        let span = info_span!("http_request", %method, %url);

        Box::pin(
            async move {
                self.sink
                    .log(&format!("{}: {method} {url}", request.user_agent()));
                self.inner.send(request).await
            }
            .instrument(span),
        )
    }
}
