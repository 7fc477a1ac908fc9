use crate::config::DEFAULT_PORT;
use crate::TransportError;

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;

/// Prefix that marks a destination string as a group name.
pub const GROUP_PREFIX: &str = "group:";

/// A peer's network location: host (IP or resolvable name) plus port.
///
/// Displayed and parsed as `host`, `host:port` or `[v6]:port`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PeerAddress {
    host: String,
    port: u16,
}

impl PeerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse an address, falling back to `default_port` when none is given.
    pub fn parse(input: &str, default_port: u16) -> Result<Self, TransportError> {
        let s = input.trim();
        let invalid = || TransportError::InvalidAddress(input.to_string());

        if s.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(invalid());
        }

        // [v6] or [v6]:port
        if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            host.parse::<Ipv6Addr>().map_err(|_| invalid())?;
            let port = match tail {
                "" => default_port,
                t => t
                    .strip_prefix(':')
                    .and_then(|p| p.parse().ok())
                    .ok_or_else(invalid)?,
            };
            return Ok(Self::new(host, port));
        }

        // Bare v6 literal has no room for a port.
        if s.parse::<Ipv6Addr>().is_ok() {
            return Ok(Self::new(s, default_port));
        }

        match s.rsplit_once(':') {
            Some((host, port)) => {
                if host.is_empty() || host.contains(':') {
                    return Err(invalid());
                }
                let port = port.parse().map_err(|_| invalid())?;
                Ok(Self::new(host, port))
            }
            None => Ok(Self::new(s, default_port)),
        }
    }

    /// Address of the remote end of an accepted connection, on `port`.
    pub fn from_ip(ip: IpAddr, port: u16) -> Self {
        Self::new(ip.to_string(), port)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Target usable with `TcpStream::connect` (resolves names).
    pub fn connect_target(&self) -> (&str, u16) {
        (&self.host, self.port)
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Debug for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerAddress({self})")
    }
}

impl FromStr for PeerAddress {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, DEFAULT_PORT)
    }
}

impl serde::Serialize for PeerAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for PeerAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Where an outbound message goes: one peer, or every member of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Direct(PeerAddress),
    Group(String),
}

impl Destination {
    /// Parse user input: `group:<name>` selects a group, anything else is
    /// a peer address.
    pub fn parse(input: &str, default_port: u16) -> Result<Self, TransportError> {
        let s = input.trim();
        match s.strip_prefix(GROUP_PREFIX) {
            Some(name) => Ok(Destination::Group(name.to_string())),
            None => PeerAddress::parse(s, default_port).map(Destination::Direct),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Direct(peer) => write!(f, "{peer}"),
            Destination::Group(name) => write!(f, "{GROUP_PREFIX}{name}"),
        }
    }
}

impl FromStr for Destination {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, DEFAULT_PORT)
    }
}
