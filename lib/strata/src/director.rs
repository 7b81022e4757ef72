//! Backend selection strategies.
//!
//! A [`Director`] moves a request onto one of its backends. Directors own
//! their selection state and synchronize it themselves, so a single director
//! can serve every concurrent call of a pipeline.
//!
//! With no backends configured, every director leaves the request untouched.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::{Backend, Request, Result};

/// Strategy choosing the backend of a request.
pub trait Director: Send + Sync {
    /// Point the request at the chosen backend.
    ///
    /// # Errors
    ///
    /// Fails only if the request URL cannot carry a host.
    fn direct(&self, request: &mut Request) -> Result<()>;
}

impl<D: Director + ?Sized> Director for Arc<D> {
    fn direct(&self, request: &mut Request) -> Result<()> {
        (**self).direct(request)
    }
}

/// Director backed by a closure, see [`director_fn`].
#[derive(Clone)]
pub struct DirectorFn<F> {
    f: F,
}

/// Turn a closure into a [`Director`].
pub fn director_fn<F>(f: F) -> DirectorFn<F>
where
    F: Fn(&mut Request) -> Result<()> + Send + Sync,
{
    DirectorFn { f }
}

impl<F> Director for DirectorFn<F>
where
    F: Fn(&mut Request) -> Result<()> + Send + Sync,
{
    fn direct(&self, request: &mut Request) -> Result<()> {
        (self.f)(request)
    }
}

impl<F> fmt::Debug for DirectorFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectorFn").finish_non_exhaustive()
    }
}

fn parse_hosts<I>(hosts: I) -> Result<Vec<Backend>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    hosts
        .into_iter()
        .map(|host| Backend::parse(host.as_ref()))
        .collect()
}

// ============================================================================
// Round robin
// ============================================================================

/// Cycles through the backends in order.
///
/// The counter is shared by all callers: over any `n` consecutive selections
/// across the whole process, each of the `n` backends is picked once.
#[derive(Debug)]
pub struct RoundRobin {
    counter: AtomicU64,
    backends: Vec<Backend>,
}

impl RoundRobin {
    /// Create a round robin director.
    ///
    /// The counter is incremented before each selection, so starting from
    /// `start` the first pick is `backends[(start + 1) % len]`.
    pub fn new(start: u64, backends: impl IntoIterator<Item = Backend>) -> Self {
        Self {
            counter: AtomicU64::new(start),
            backends: backends.into_iter().collect(),
        }
    }

    /// Create a round robin director from `host[:port]` strings.
    pub fn from_hosts<I>(start: u64, hosts: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Ok(Self::new(start, parse_hosts(hosts)?))
    }

    /// Configured backends.
    #[must_use]
    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    /// Pick the next backend, or `None` without backends.
    #[must_use]
    pub fn select(&self) -> Option<&Backend> {
        let len = u64::try_from(self.backends.len())
            .ok()
            .filter(|len| *len > 0)?;
        let ticket = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let index = usize::try_from(ticket % len).ok()?;
        self.backends.get(index)
    }
}

impl Director for RoundRobin {
    fn direct(&self, request: &mut Request) -> Result<()> {
        let Some(backend) = self.select() else {
            return Ok(());
        };
        debug!(%backend, "round robin selected backend");
        request.set_host(backend)
    }
}

// ============================================================================
// Random
// ============================================================================

/// Picks a backend uniformly at random.
///
/// The generator is seeded, so two directors built with the same seed and
/// backends make the same picks. Draws are serialized through a mutex.
#[derive(Debug)]
pub struct Random {
    rng: Mutex<StdRng>,
    backends: Vec<Backend>,
}

impl Random {
    /// Create a random director.
    pub fn new(seed: u64, backends: impl IntoIterator<Item = Backend>) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            backends: backends.into_iter().collect(),
        }
    }

    /// Create a random director from `host[:port]` strings.
    pub fn from_hosts<I>(seed: u64, hosts: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Ok(Self::new(seed, parse_hosts(hosts)?))
    }

    /// Configured backends.
    #[must_use]
    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    /// Pick a backend, or `None` without backends.
    #[must_use]
    pub fn select(&self) -> Option<&Backend> {
        if self.backends.is_empty() {
            return None;
        }
        let index = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0..self.backends.len());
        self.backends.get(index)
    }
}

impl Director for Random {
    fn direct(&self, request: &mut Request) -> Result<()> {
        let Some(backend) = self.select() else {
            return Ok(());
        };
        debug!(%backend, "random selected backend");
        request.set_host(backend)
    }
}
