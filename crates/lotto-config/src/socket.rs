use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// TCP endpoint the ticket service listens on.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ListenEndpoint {
    /// Host name or literal address.
    pub host: String,
    /// TCP port; `0` asks the OS for an ephemeral port.
    pub port: u16,
}

impl ListenEndpoint {
    /// Builds a TCP endpoint.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Resolves the endpoint to the first IPv4 or IPv6 socket address.
    pub fn resolve(&self) -> io::Result<SocketAddr> {
        let host = self.host.trim_start_matches('[').trim_end_matches(']');
        let mut addrs = (host, self.port).to_socket_addrs()?;
        addrs
            .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
            .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
    }
}

impl fmt::Display for ListenEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') && !self.host.starts_with('[') {
            write!(formatter, "tcp://[{}]:{}", self.host, self.port)
        } else {
            write!(formatter, "tcp://{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for ListenEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input)?;
        if url.scheme() != "tcp" {
            return Err(EndpointParseError::UnsupportedScheme(
                url.scheme().to_owned(),
            ));
        }
        let host = url
            .host_str()
            .ok_or_else(|| EndpointParseError::MissingHost(input.to_owned()))?;
        let port = url
            .port()
            .ok_or_else(|| EndpointParseError::MissingPort(input.to_owned()))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        Ok(Self::new(host, port))
    }
}

/// Errors encountered while parsing a [`ListenEndpoint`] from text.
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// Scheme was not `tcp`.
    #[error("unsupported endpoint scheme '{0}'")]
    UnsupportedScheme(String),
    /// Host name was missing.
    #[error("missing TCP host in '{0}'")]
    MissingHost(String),
    /// Port was missing from the address.
    #[error("missing TCP port in '{0}'")]
    MissingPort(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ListenEndpoint::new("127.0.0.1", 8888), "tcp://127.0.0.1:8888")]
    #[case(ListenEndpoint::new("::1", 8888), "tcp://[::1]:8888")]
    fn display_brackets_ipv6_hosts(#[case] endpoint: ListenEndpoint, #[case] expected: &str) {
        assert_eq!(endpoint.to_string(), expected);
    }

    #[test]
    fn parses_ipv6_endpoint() {
        let endpoint: ListenEndpoint = "tcp://[::1]:9000".parse().expect("parse endpoint");
        assert_eq!(endpoint, ListenEndpoint::new("::1", 9000));
    }

    #[test]
    fn rejects_unknown_scheme() {
        let error = "unix:///tmp/lottod.sock"
            .parse::<ListenEndpoint>()
            .expect_err("unix scheme should be rejected");
        assert!(matches!(error, EndpointParseError::UnsupportedScheme(_)));
    }

    #[test]
    fn resolves_loopback() {
        let endpoint = ListenEndpoint::new("127.0.0.1", 0);
        let addr = endpoint.resolve().expect("resolve loopback");
        assert!(addr.ip().is_loopback());
    }
}
