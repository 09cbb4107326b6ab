//! Engine endpoint parsing.
//!
//! The engine base URL is parsed once into an [`EngineEndpoint`] whose scheme
//! is a closed [`EndpointScheme`] enumeration, so callers can match on it
//! exhaustively instead of probing the raw string.

use crate::error::{BerthError, ConfigError};

/// Transport family of an engine endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointScheme {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    Https,
    /// Docker-style `tcp://` endpoint.
    Tcp,
    /// Unix domain socket.
    UnixSocket,
    /// Windows named pipe.
    NamedPipe,
    /// Any scheme berth does not know how to reach.
    Unknown,
}

impl EndpointScheme {
    fn from_scheme(scheme: &str) -> Self {
        match scheme.to_ascii_lowercase().as_str() {
            "http" => Self::Http,
            "https" => Self::Https,
            "tcp" => Self::Tcp,
            "unix" | "http+unix" | "http+docker" => Self::UnixSocket,
            "npipe" => Self::NamedPipe,
            _ => Self::Unknown,
        }
    }

    const fn is_network(self) -> bool {
        matches!(self, Self::Http | Self::Https | Self::Tcp)
    }
}

/// Scheme and host of the engine's API endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEndpoint {
    scheme: EndpointScheme,
    hostname: Option<String>,
}

impl EngineEndpoint {
    /// Parse an engine base URL.
    ///
    /// Bare `/path` values are read as Unix sockets and `//`- or
    /// `\\`-prefixed values as named pipes, mirroring how the connector
    /// treats them. Hostnames are lower-cased and stripped of userinfo and
    /// IPv6 brackets.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEndpoint` when the URL is empty, lacks a
    /// scheme, has a network scheme without a host, has unbalanced IPv6
    /// brackets, or carries a port outside `0..=65535`.
    pub fn parse(url: &str) -> Result<Self, BerthError> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(invalid(url, "endpoint is empty"));
        }

        let Some((scheme_text, rest)) = trimmed.split_once("://") else {
            return parse_bare_path(url, trimmed);
        };

        if scheme_text.is_empty()
            || !scheme_text
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return Err(invalid(url, "malformed scheme"));
        }

        let scheme = EndpointScheme::from_scheme(scheme_text);
        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        let hostname = parse_authority(url, authority)?;

        if scheme.is_network() && hostname.is_none() {
            return Err(invalid(url, "missing host"));
        }

        Ok(Self { scheme, hostname })
    }

    /// Return the transport family.
    #[must_use]
    pub const fn scheme(&self) -> EndpointScheme {
        self.scheme
    }

    /// Return the lower-cased hostname, if the URL carries one.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }
}

fn parse_bare_path(url: &str, path: &str) -> Result<EngineEndpoint, BerthError> {
    let scheme = if path.starts_with("\\\\") || path.starts_with("//") {
        EndpointScheme::NamedPipe
    } else if path.starts_with('/') {
        EndpointScheme::UnixSocket
    } else {
        return Err(invalid(url, "missing scheme"));
    };

    Ok(EngineEndpoint { scheme, hostname: None })
}

/// Extract the lower-cased host from a URL authority, rejecting a malformed
/// port.
fn parse_authority(url: &str, authority: &str) -> Result<Option<String>, BerthError> {
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host_port)| host_port);

    let (host, port_text) = if let Some(bracketed) = host_port.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or_else(|| invalid(url, "unbalanced '[' in host"))?;
        let port_text = if after.is_empty() {
            None
        } else {
            Some(
                after
                    .strip_prefix(':')
                    .ok_or_else(|| invalid(url, "unexpected text after ']'"))?,
            )
        };
        (host, port_text)
    } else if host_port.contains(']') {
        return Err(invalid(url, "unbalanced ']' in host"));
    } else {
        match host_port.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (host_port, None),
        }
    };

    if let Some(text) = port_text.filter(|text| !text.is_empty()) {
        text.parse::<u16>()
            .map_err(|_| invalid(url, "port must be a number between 0 and 65535"))?;
    }

    Ok((!host.is_empty()).then(|| host.to_ascii_lowercase()))
}

fn invalid(url: &str, reason: &str) -> BerthError {
    BerthError::from(ConfigError::InvalidEndpoint {
        endpoint: String::from(url),
        reason: String::from(reason),
    })
}
