//! Peer endpoint parsing
//!
//! An endpoint is written as `host:port` or `[ipv6]:port`. The host may be
//! a literal address or a hostname that has to be resolved.

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;

use crate::common::{Error, Result};

/// A parsed `host:port` endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: String,
    is_hostname: bool,
}

impl Endpoint {
    /// Parse endpoint text
    ///
    /// # Arguments
    ///
    /// * `text` - `host:port` or `[v6host]:port`
    ///
    /// # Errors
    ///
    /// [`Error::MalformedEndpoint`] if a bracketed host is not closed or is
    /// followed by anything but `:`, [`Error::MissingPort`] if the port is
    /// empty.
    pub fn parse(text: &str) -> Result<Self> {
        let (host, port) = if let Some(rest) = text.strip_prefix('[') {
            let close = rest
                .find(']')
                .ok_or_else(|| Error::MalformedEndpoint(text.to_string()))?;
            let after = &rest[close + 1..];
            let port = match after.strip_prefix(':') {
                Some(port) => port,
                None if after.is_empty() => "",
                None => return Err(Error::MalformedEndpoint(text.to_string())),
            };
            (&rest[..close], port)
        } else {
            match text.rsplit_once(':') {
                Some((host, port)) => (host, port),
                None => (text, ""),
            }
        };

        if port.is_empty() {
            return Err(Error::MissingPort(text.to_string()));
        }

        Ok(Self::new(host, port))
    }

    /// Build an endpoint from an already separated host and a non-empty port
    pub(crate) fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        let host = host.into();
        let is_hostname = literal_address(&host).is_none();
        Self {
            host,
            port: port.into(),
            is_hostname,
        }
    }

    /// Host part, without brackets
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port part
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Whether the host is a name rather than a literal address
    pub fn is_hostname(&self) -> bool {
        self.is_hostname
    }

    /// The host as a literal address, if it is one
    ///
    /// The zone of a scoped IPv6 host (`fe80::1%eth0`) is not part of the
    /// returned address.
    pub fn ip(&self) -> Option<IpAddr> {
        literal_address(&self.host)
    }

    /// Same port, different address
    pub fn with_address(&self, addr: IpAddr) -> Self {
        Self::new(addr.to_string(), self.port.clone())
    }
}

/// Parse a literal host, accepting an IPv6 address with a non-empty zone
fn literal_address(host: &str) -> Option<IpAddr> {
    if let Ok(addr) = host.parse::<IpAddr>() {
        return Some(addr);
    }

    let (addr, zone) = host.split_once('%')?;
    if zone.is_empty() {
        return None;
    }
    addr.parse::<Ipv6Addr>().ok().map(IpAddr::V6)
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip() {
            Some(IpAddr::V6(_)) => write!(f, "[{}]:{}", self.host, self.port),
            _ => write!(f, "{}:{}", self.host, self.port),
        }
    }
}
