//! Header injection middleware.
//!
//! This middleware appends a fixed header to all outgoing requests. Headers
//! are only ever appended: values set by the caller or by other layers are
//! kept, duplicates included.

use http::header::{AUTHORIZATION, HeaderName, HeaderValue};
use tower::Layer;

use crate::{Error, Request, Result, SendFuture, Sender};

/// Layer that appends a header to requests.
///
/// # Example
///
/// ```ignore
/// use strata::middleware::HeaderLayer;
/// use strata::Transform;
///
/// let auth = Transform::layer(HeaderLayer::authorization("my-secret-token")?);
/// let tracing = Transform::layer(HeaderLayer::new("X-Client", "strata")?);
/// ```
#[derive(Debug, Clone)]
pub struct HeaderLayer {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderLayer {
    /// Create a layer appending `name: value`.
    pub fn new(name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| Error::invalid_header(format!("{name}: {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| Error::invalid_header(format!("{name}: {err}")))?;
        Ok(Self { name, value })
    }

    /// Create a layer appending `Authorization: <token>`.
    ///
    /// The value is marked sensitive so that it is not printed by `Debug`.
    pub fn authorization(token: &str) -> Result<Self> {
        let mut value = HeaderValue::from_str(token)
            .map_err(|err| Error::invalid_header(format!("{AUTHORIZATION}: {err}")))?;
        value.set_sensitive(true);
        Ok(Self {
            name: AUTHORIZATION,
            value,
        })
    }

    /// Header name.
    #[must_use]
    pub fn name(&self) -> &HeaderName {
        &self.name
    }
}

impl<S> Layer<S> for HeaderLayer {
    type Service = HeaderInjection<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HeaderInjection {
            inner,
            name: self.name.clone(),
            value: self.value.clone(),
        }
    }
}

/// Sender that appends a header to requests.
#[derive(Debug, Clone)]
pub struct HeaderInjection<S> {
    inner: S,
    name: HeaderName,
    value: HeaderValue,
}

impl<S: Sender> Sender for HeaderInjection<S> {
    fn send<'a>(&'a self, request: &'a mut Request) -> SendFuture<'a> {
        Box::pin(async move {
            request
                .headers_mut()
                .append(self.name.clone(), self.value.clone());
            self.inner.send(request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;
    use crate::middleware::testing::{MockSender, create_request};

    fn values<'r>(request: &'r Request, name: &str) -> Vec<&'r str> {
        request
            .headers()
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect()
    }

    #[test]
    fn reject_invalid_header() {
        let_assert!(Err(Error::InvalidHeader(_)) = HeaderLayer::new("bad name", "value"));
        let_assert!(Err(Error::InvalidHeader(_)) = HeaderLayer::new("X-Ok", "bad\nvalue"));
        let_assert!(Err(Error::InvalidHeader(_)) = HeaderLayer::authorization("a\rb"));
    }

    #[test]
    fn authorization_is_sensitive() {
        let_assert!(Ok(layer) = HeaderLayer::authorization("secret"));
        check!(*layer.name() == AUTHORIZATION);
        check!(layer.value.is_sensitive());
        check!(!format!("{layer:?}").contains("secret"));
    }

    #[tokio::test]
    async fn appends_header() {
        let_assert!(Ok(layer) = HeaderLayer::authorization("token-123"));
        let mock = MockSender::succeeding();
        let service = layer.layer(mock.clone());

        let mut request = create_request();
        let_assert!(Ok(_) = service.send(&mut request).await);

        check!(values(&request, "authorization") == ["token-123"]);
        check!(mock.calls() == 1);
    }

    #[tokio::test]
    async fn headers_accumulate() {
        let_assert!(Ok(first) = HeaderLayer::new("X-Tag", "inner"));
        let_assert!(Ok(second) = HeaderLayer::new("x-tag", "outer"));
        let service = second.layer(first.layer(MockSender::succeeding()));

        let mut request = create_request();
        request
            .headers_mut()
            .append("x-tag", HeaderValue::from_static("caller"));
        let_assert!(Ok(_) = service.send(&mut request).await);

        check!(values(&request, "x-tag") == ["caller", "outer", "inner"]);
        check!(request.user_agent() == "strata-test");
    }
}
