//! Listen address parsing.
//!
//! The listen address is configured as a URL (`http://host:port`). Only the
//! host and port are used for binding; an `https` scheme is accepted but the
//! caller is expected to warn about it.

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use url::{Host, Url};

/// Error type for listen address parsing.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("invalid listen address {input:?}: {source}")]
    Malformed {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported scheme {0:?} in listen address, expected http or https")]
    Scheme(String),

    #[error("listen address {0:?} has no host")]
    MissingHost(String),

    #[error("listen address {0:?} has no port")]
    MissingPort(String),

    #[error("could not resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// URL scheme of the listen address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

/// A parsed listen address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddress {
    scheme: Scheme,
    host: String,
    port: u16,
}

impl ListenAddress {
    /// Parse a listen URL such as `http://0.0.0.0:6058`.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let url = Url::parse(input.trim()).map_err(|source| AddressError::Malformed {
            input: input.to_string(),
            source,
        })?;

        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => return Err(AddressError::Scheme(other.to_string())),
        };

        let host = match url.host() {
            Some(Host::Domain(d)) if !d.is_empty() => d.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            _ => return Err(AddressError::MissingHost(input.to_string())),
        };

        // `port()` is None when the port equals the scheme default.
        let port = url
            .port_or_known_default()
            .ok_or_else(|| AddressError::MissingPort(input.to_string()))?;

        Ok(Self { scheme, host, port })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// True when the configured scheme is `https`.
    pub fn is_https(&self) -> bool {
        self.scheme == Scheme::Https
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolve to the first socket address for the host.
    pub fn resolve(&self) -> Result<SocketAddr, AddressError> {
        let resolve_err = |source| AddressError::Resolve {
            host: self.host.clone(),
            port: self.port,
            source,
        };

        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(resolve_err)?
            .next()
            .ok_or_else(|| {
                resolve_err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no addresses returned",
                ))
            })
    }
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.scheme {
            Scheme::Http => "http",
            Scheme::Https => "https",
        };
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", scheme, self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", scheme, self.host, self.port)
        }
    }
}
