//! The request sender contract.
//!
//! Every stage of a pipeline, from the transport at the bottom to each
//! middleware wrapped around it, is a [`Sender`]: it takes a request and
//! produces either a [`Response`] or an [`Error`](crate::Error), never both.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{Request, Response, Result};

/// Future returned by [`Sender::send`].
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>>;

/// Type-erased sender, as produced by [`compose`](crate::compose).
pub type BoxSender = Box<dyn Sender>;

/// Something able to send a request.
///
/// The request is lent mutably for the duration of the call, so a sender may
/// adjust it (host, headers) before handing it further down; those changes
/// stay on the caller's request.
///
/// Senders are shared between concurrent calls through `&self`; any state
/// they keep must be synchronized internally.
///
/// # Example
///
/// ```
/// use strata_core::{Request, Response, SendFuture, Sender};
///
/// struct Ok200;
///
/// impl Sender for Ok200 {
///     fn send<'a>(&'a self, _request: &'a mut Request) -> SendFuture<'a> {
///         Box::pin(async { Ok(Response::with_status(200)) })
///     }
/// }
/// ```
pub trait Sender: Send + Sync {
    /// Send the request, returning the response or the failure.
    fn send<'a>(&'a self, request: &'a mut Request) -> SendFuture<'a>;
}

impl<S: Sender + ?Sized> Sender for Box<S> {
    fn send<'a>(&'a self, request: &'a mut Request) -> SendFuture<'a> {
        (**self).send(request)
    }
}

impl<S: Sender + ?Sized> Sender for Arc<S> {
    fn send<'a>(&'a self, request: &'a mut Request) -> SendFuture<'a> {
        (**self).send(request)
    }
}

impl<S: Sender + ?Sized> Sender for &S {
    fn send<'a>(&'a self, request: &'a mut Request) -> SendFuture<'a> {
        (**self).send(request)
    }
}

/// Sender backed by a closure, see [`sender_fn`].
#[derive(Clone)]
pub struct SenderFn<F> {
    f: F,
}

/// Turn a closure into a [`Sender`].
///
/// ```
/// use strata_core::{Response, sender_fn};
///
/// let sender = sender_fn(|request| {
///     Box::pin(async move {
///         let status = if request.host() == Some("web01") { 200 } else { 404 };
///         Ok(Response::with_status(status))
///     })
/// });
/// # let _ = sender;
/// ```
pub fn sender_fn<F>(f: F) -> SenderFn<F>
where
    F: for<'a> Fn(&'a mut Request) -> SendFuture<'a> + Send + Sync,
{
    SenderFn { f }
}

impl<F> Sender for SenderFn<F>
where
    F: for<'a> Fn(&'a mut Request) -> SendFuture<'a> + Send + Sync,
{
    fn send<'a>(&'a self, request: &'a mut Request) -> SendFuture<'a> {
        (self.f)(request)
    }
}

impl<F> fmt::Debug for SenderFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderFn").finish_non_exhaustive()
    }
}
