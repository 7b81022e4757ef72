//! Prelude module for convenient imports.
//!
//! ```ignore
//! use strata::prelude::*;
//! ```

pub use crate::{
    Backend, CancellationToken, Director, Error, Method, Pipeline, PipelineConfig, Random, Request,
    RequestBuilder, Response, Result, RoundRobin, Sender, Transform, compose, sender_fn,
};
