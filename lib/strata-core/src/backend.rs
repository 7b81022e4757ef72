//! Load-balancing targets.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A `host[:port]` target that a request can be redirected to.
///
/// Backends are validated once, when parsed, so that moving a request onto
/// one of them cannot fail because of the backend itself.
///
/// ```
/// use strata_core::Backend;
///
/// let backend: Backend = "web01:8080".parse().unwrap();
/// assert_eq!(backend.host(), "web01");
/// assert_eq!(backend.port(), Some(8080));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Backend {
    host: String,
    port: Option<u16>,
}

impl Backend {
    /// Parse a backend from `host`, `host:port`, `[ipv6]` or `[ipv6]:port`.
    ///
    /// Domain names are lower-cased. IPv4 addresses must be written in
    /// dotted-quad form: shorthands such as `123` or `0x7f.1` would silently
    /// name another address and are rejected.
    pub fn parse(input: &str) -> Result<Self> {
        let (host, port) = match input.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') || host.ends_with(']') => {
                let port = port
                    .parse::<u16>()
                    .map_err(|err| Error::invalid_backend(input, format!("invalid port: {err}")))?;
                (host, Some(port))
            }
            _ => (input, None),
        };

        let parsed = url::Host::parse(host)
            .map_err(|err| Error::invalid_backend(input, err.to_string()))?;
        if let url::Host::Ipv4(addr) = &parsed
            && addr.to_string() != host
        {
            return Err(Error::invalid_backend(
                input,
                format!("ambiguous IPv4 address, expected {addr}"),
            ));
        }

        Ok(Self {
            host: parsed.to_string(),
            port,
        })
    }

    /// Host name or address (IPv6 addresses keep their brackets).
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, if any.
    #[must_use]
    pub const fn port(&self) -> Option<u16> {
        self.port
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        Self::parse(input)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{port}", self.host),
            None => f.write_str(&self.host),
        }
    }
}
