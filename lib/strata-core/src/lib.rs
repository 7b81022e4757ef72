//! Core types and traits for the strata request pipeline.
//!
//! This crate provides the foundational types used by strata:
//! - [`Method`] - HTTP method enum
//! - [`Request`] and [`RequestBuilder`] - outbound request description
//! - [`Backend`] - validated `host[:port]` target for load balancing
//! - [`Response`] - response description
//! - [`Error`] and [`Result`] - Error handling
//! - [`Sender`] - the "send a request, get a response or a failure" contract
//! - [`Transform`] and [`compose`] - wrapping senders with extra behavior
//! - [`CancellationToken`] - per-call cancellation signal carried by a request

mod backend;
mod error;
mod method;
pub mod prelude;
mod request;
mod response;
mod sender;
mod transform;

pub use backend::Backend;
pub use error::{Error, Result};
pub use method::Method;
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use sender::{BoxSender, SendFuture, Sender, SenderFn, sender_fn};
pub use transform::{Transform, compose, compose_boxed};

// Re-export http crate types for status codes and headers
pub use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};

pub use tokio_util::sync::CancellationToken;
