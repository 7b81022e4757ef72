//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! for easy glob importing:
//!
//! ```ignore
//! use strata_core::prelude::*;
//! ```

pub use crate::{
    Backend, BoxSender, CancellationToken, Error, Method, Request, RequestBuilder, Response,
    Result, SendFuture, Sender, Transform, compose, sender_fn,
};
