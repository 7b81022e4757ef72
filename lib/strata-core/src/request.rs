//! Outbound request description.
//!
//! Use [`Request::builder`] to construct requests with headers, query parameters, and bodies.
//! A request is owned by the caller and lent to the pipeline as `&mut Request`: stages may
//! move it to another host or append headers, and those changes remain visible to inner
//! stages and to the caller once the call returns.
//!
//! # Example
//!
//! ```
//! use strata_core::{Request, Method};
//!
//! let request = Request::builder(Method::Get, "https://api.example.com".parse().unwrap())
//!     .header("Accept", "application/json")
//!     .user_agent("strata/0.1")
//!     .query("page", "1")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(request.user_agent(), "strata/0.1");
//! ```

use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;

use crate::{Backend, Error, Method, Result};

/// An outbound request with method, URL, headers, optional body and cancellation signal.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: url::Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    cancellation: CancellationToken,
}

impl Request {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// Creates a new [`RequestBuilder`] from a URL string.
    pub fn try_builder(method: Method, url: &str) -> Result<RequestBuilder> {
        let url = url::Url::parse(url)?;
        Ok(RequestBuilder::new(method, url))
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Target host, if the URL has one.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// Move the request onto the given backend.
    ///
    /// Both host and port are replaced: a backend without an explicit port
    /// resets the URL to the scheme's default port. On failure the request is
    /// left unchanged.
    pub fn set_host(&mut self, backend: &Backend) -> Result<()> {
        let mut url = self.url.clone();
        url.set_host(Some(backend.host())).map_err(|err| {
            Error::invalid_request(format!("cannot set host on {}: {err}", self.url))
        })?;
        url.set_port(backend.port())
            .map_err(|()| Error::invalid_request(format!("cannot set port on {}", self.url)))?;
        self.url = url;
        Ok(())
    }

    /// The `User-Agent` header, or an empty string when none is set.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        self.headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// First header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Cancellation signal for this call.
    ///
    /// Unless one was supplied with [`RequestBuilder::cancellation`], this token
    /// is never cancelled.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, url::Url, HeaderMap, Option<Bytes>) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// Builder for constructing [`Request`] instances.
///
/// Header validation errors are deferred until [`RequestBuilder::build`].
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    url: url::Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    cancellation: Option<CancellationToken>,
    error: Option<Error>,
}

impl RequestBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            cancellation: None,
            error: None,
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        match parse_header(name, value) {
            Ok((name, value)) => {
                self.headers.append(name, value);
            }
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Sets the `User-Agent` header.
    #[must_use]
    pub fn user_agent(self, user_agent: &str) -> Self {
        self.header(header::USER_AGENT.as_str(), user_agent)
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach a cancellation token observed by the pipeline.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Builds the [`Request`].
    pub fn build(self) -> Result<Request> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            cancellation: self.cancellation.unwrap_or_default(),
        })
    }
}

/// Validate a header name/value pair.
fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|err| Error::invalid_header(format!("{name}: {err}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|err| Error::invalid_header(format!("{name}: {err}")))?;
    Ok((name, value))
}
