//! Composable middleware pipelines for outbound HTTP requests.
//!
//! A [`Sender`] performs a request. Orthogonal behaviors (logging,
//! instrumentation, header injection, retries, load balancing) are tower
//! [`Layer`](tower::Layer)s that wrap a sender into another sender, and a
//! [`Pipeline`] stacks them around a transport in a fixed, caller-chosen order.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use strata::prelude::*;
//!
//! let transport = sender_fn(|request| Box::pin(async move {
//!     // perform the actual I/O here
//!     Ok(Response::with_status(200))
//! }));
//!
//! let pipeline = Pipeline::builder(transport)
//!     .with_authorization("Bearer token")?
//!     .with_load_balancing(RoundRobin::from_hosts(0, ["web01", "web02", "web03"])?)
//!     .with_logging()
//!     .with_fault_tolerance(5, Duration::from_secs(1))
//!     .build();
//!
//! let mut request = Request::try_builder(Method::Get, "https://api.example.com/users")?
//!     .user_agent("strata")
//!     .build()?;
//! let response = pipeline.send(&mut request).await?;
//! ```
//!
//! The same pipeline can be described by a [`PipelineConfig`] and assembled
//! with [`Pipeline::from_config`].

mod config;
pub mod director;
pub mod middleware;
mod pipeline;
pub mod prelude;
pub mod telemetry;

// Re-export pipeline types
pub use config::{
    Balancing, FaultToleranceConfig, HeaderConfig, LoggingConfig, MetricsConfig, PipelineConfig,
    PipelineConfigBuilder,
};
pub use director::{Director, DirectorFn, Random, RoundRobin, director_fn};
pub use pipeline::{Pipeline, PipelineBuilder};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use strata_core::{
    Backend, BoxSender, CancellationToken, Error, Method, Request, RequestBuilder, Response,
    Result, SendFuture, Sender, SenderFn, Transform, compose, compose_boxed, sender_fn,
};

// Re-export http types for status codes and headers
pub use strata_core::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
