//! HTTP method types.

use derive_more::Display;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Method {
    /// GET method - retrieve a resource.
    #[display("GET")]
    Get,
    /// POST method - create a resource.
    #[display("POST")]
    Post,
    /// PUT method - replace a resource.
    #[display("PUT")]
    Put,
    /// DELETE method - remove a resource.
    #[display("DELETE")]
    Delete,
    /// PATCH method - partially update a resource.
    #[display("PATCH")]
    Patch,
    /// HEAD method - retrieve headers only.
    #[display("HEAD")]
    Head,
    /// OPTIONS method - retrieve allowed methods.
    #[display("OPTIONS")]
    Options,
}

impl Method {
    /// Returns `true` if the method is idempotent.
    ///
    /// Useful in a retry predicate: replaying a non-idempotent request on a
    /// new backend may duplicate its side effects.
    #[must_use]
    pub const fn is_idempotent(&self) -> bool {
        matches!(
            self,
            Self::Get | Self::Head | Self::Options | Self::Put | Self::Delete
        )
    }
}

impl std::str::FromStr for Method {
    type Err = crate::Error;

    fn from_str(method: &str) -> Result<Self, Self::Err> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(crate::Error::invalid_request(format!(
                "unsupported HTTP method: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn method_display() {
        check!(Method::Get.to_string() == "GET");
        check!(Method::Options.to_string() == "OPTIONS");
    }

    #[test]
    fn method_idempotency() {
        check!(Method::Get.is_idempotent());
        check!(Method::Delete.is_idempotent());
        check!(!Method::Post.is_idempotent());
        check!(!Method::Patch.is_idempotent());
    }

    #[test]
    fn method_from_str() {
        let_assert!(Ok(method) = "patch".parse::<Method>());
        check!(method == Method::Patch);

        let_assert!(Err(err) = "BREW".parse::<Method>());
        check!(err.to_string() == "invalid request: unsupported HTTP method: BREW");
    }
}
