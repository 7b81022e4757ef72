//! Wrapping senders with extra behavior.
//!
//! A [`Transform`] turns one sender into another, adding a single orthogonal
//! behavior (logging, retries, ...). [`compose`] folds an ordered list of
//! transforms over a base sender.

use std::fmt;

use tower::Layer;

use crate::{BoxSender, Sender};

/// A `Sender -> Sender` function.
///
/// Build one from a closure with [`Transform::new`] or from any tower
/// [`Layer`] producing a [`Sender`] with [`Transform::layer`].
pub struct Transform {
    wrap: Box<dyn Fn(BoxSender) -> BoxSender + Send + Sync>,
}

impl Transform {
    /// Create a transform from a wrapping function.
    pub fn new<F>(wrap: F) -> Self
    where
        F: Fn(BoxSender) -> BoxSender + Send + Sync + 'static,
    {
        Self {
            wrap: Box::new(wrap),
        }
    }

    /// Create a transform from a tower layer.
    pub fn layer<L>(layer: L) -> Self
    where
        L: Layer<BoxSender> + Send + Sync + 'static,
        L::Service: Sender + 'static,
    {
        Self::new(move |sender| Box::new(layer.layer(sender)))
    }

    /// Wrap the given sender.
    #[must_use]
    pub fn apply(&self, sender: BoxSender) -> BoxSender {
        (self.wrap)(sender)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform").finish_non_exhaustive()
    }
}

/// Wrap `base` with every transform, in order.
///
/// The first transform wraps `base` directly and each following one wraps the
/// result, so the *last* transform is outermost: on a call, the layers run from
/// the last transform down to the first, then `base`, and unwind in reverse.
///
/// Order is significant and is never rearranged. In particular, everything
/// listed *before* a retrying transform sits inside its loop and runs again on
/// every attempt (a load balancer there picks a new backend per attempt, a
/// header injector appends its header once more), while everything listed
/// *after* it runs once per call. Request mutations made during a failed
/// attempt are carried into the next one.
///
/// ```
/// use strata_core::{Response, Transform, compose, sender_fn};
///
/// let base = sender_fn(|_request| Box::pin(async { Ok(Response::with_status(200)) }));
/// let pipeline = compose(base, [Transform::new(|inner| inner)]);
/// # let _ = pipeline;
/// ```
pub fn compose<S>(base: S, transforms: impl IntoIterator<Item = Transform>) -> BoxSender
where
    S: Sender + 'static,
{
    compose_boxed(Box::new(base), transforms)
}

/// Same as [`compose`], for a base sender that is already boxed.
pub fn compose_boxed(
    base: BoxSender,
    transforms: impl IntoIterator<Item = Transform>,
) -> BoxSender {
    transforms
        .into_iter()
        .fold(base, |sender, transform| transform.apply(sender))
}
