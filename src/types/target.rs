//! Target enumeration from a CIDR range and a port specification.
//!
//! `Targets` is a lazy, restartable sequence of `scheme://host:port` URLs.
//! Its length is derived arithmetically, so a large range can size a
//! progress bar without materializing every URL.

use super::port::{PortEntry, PortSpec, Scheme};
use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Error type for range parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("invalid CIDR notation: '{0}'")]
    InvalidCidr(String),
    #[error("range {range} has {hosts} usable hosts (max: {max})")]
    RangeTooLarge { range: String, hosts: u128, max: u128 },
}

/// A validated network range to sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkRange {
    network: IpNetwork,
}

impl NetworkRange {
    /// Largest number of usable hosts accepted in one range (an IPv4 /8).
    pub const MAX_HOSTS: u128 = 1 << 24;

    /// Parse a CIDR block such as `192.168.0.0/24`.
    ///
    /// A bare address is taken as a single-host range. Host bits set in the
    /// address are cleared, so `10.0.0.7/30` is the same range as `10.0.0.4/30`.
    pub fn parse(s: &str) -> Result<Self, TargetError> {
        let s = s.trim();
        let parsed: IpNetwork = s
            .parse()
            .map_err(|_| TargetError::InvalidCidr(s.to_string()))?;

        let network = match parsed {
            IpNetwork::V4(net) => IpNetwork::V4(
                Ipv4Network::new(net.network(), net.prefix())
                    .map_err(|_| TargetError::InvalidCidr(s.to_string()))?,
            ),
            IpNetwork::V6(net) => IpNetwork::V6(
                Ipv6Network::new(net.network(), net.prefix())
                    .map_err(|_| TargetError::InvalidCidr(s.to_string()))?,
            ),
        };

        let range = Self { network };
        let hosts = range.host_bounds().map_or(0, |(first, last)| last - first + 1);
        if hosts > Self::MAX_HOSTS {
            return Err(TargetError::RangeTooLarge {
                range: network.to_string(),
                hosts,
                max: Self::MAX_HOSTS,
            });
        }

        Ok(range)
    }

    /// Number of usable host addresses in the range.
    pub fn host_count(&self) -> u64 {
        // Bounded by MAX_HOSTS at parse time.
        self.host_bounds()
            .map_or(0, |(first, last)| (last - first + 1) as u64)
    }

    /// Iterate usable host addresses in ascending order.
    pub fn hosts(&self) -> Hosts {
        let (next, last) = match self.host_bounds() {
            Some((first, last)) => (Some(first), last),
            None => (None, 0),
        };
        Hosts {
            v6: self.network.is_ipv6(),
            next,
            last,
        }
    }

    /// First and last usable address as integers.
    ///
    /// IPv4 drops the network and broadcast addresses except for /31 and /32.
    /// IPv6 drops the subnet-router anycast address except for /128.
    fn host_bounds(&self) -> Option<(u128, u128)> {
        match self.network {
            IpNetwork::V4(net) => {
                let first = u32::from(net.network()) as u128;
                let last = u32::from(net.broadcast()) as u128;
                if net.prefix() >= 31 {
                    Some((first, last))
                } else {
                    Some((first + 1, last - 1))
                }
            }
            IpNetwork::V6(net) => {
                let first = u128::from(net.network());
                let span = if net.prefix() == 0 {
                    u128::MAX
                } else {
                    (1u128 << (128 - net.prefix() as u32)) - 1
                };
                let last = first | span;
                if net.prefix() == 128 {
                    Some((first, last))
                } else {
                    Some((first + 1, last))
                }
            }
        }
    }
}

impl FromStr for NetworkRange {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NetworkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.network)
    }
}

/// Iterator over the usable hosts of a `NetworkRange`.
#[derive(Debug, Clone)]
pub struct Hosts {
    v6: bool,
    next: Option<u128>,
    last: u128,
}

impl Iterator for Hosts {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        let current = self.next?;
        self.next = if current < self.last {
            Some(current + 1)
        } else {
            None
        };

        Some(if self.v6 {
            IpAddr::V6(Ipv6Addr::from(current))
        } else {
            IpAddr::V4(Ipv4Addr::from(current as u32))
        })
    }
}

/// One unit of dispatch: a host and port rendered as an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub url: String,
    pub host: IpAddr,
    pub port: u16,
    pub scheme: Scheme,
}

impl Target {
    pub fn new(host: IpAddr, entry: PortEntry) -> Self {
        let scheme = entry.scheme();
        let port = entry.port.as_u16();
        let url = match host {
            IpAddr::V4(v4) => format!("{}://{}:{}", scheme, v4, port),
            IpAddr::V6(v6) => format!("{}://[{}]:{}", scheme, v6, port),
        };
        Self {
            url,
            host,
            port,
            scheme,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Every (host, port) pair of a range, hosts outermost.
#[derive(Debug, Clone)]
pub struct Targets {
    range: NetworkRange,
    ports: PortSpec,
}

impl Targets {
    pub fn new(range: NetworkRange, ports: PortSpec) -> Self {
        Self { range, ports }
    }

    /// Total number of targets, without enumerating them.
    pub fn len(&self) -> u64 {
        self.range.host_count() * self.ports.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a fresh pass over the targets.
    pub fn iter(&self) -> TargetIter {
        TargetIter {
            hosts: self.range.hosts(),
            ports: self.ports.entries().to_vec(),
            current: None,
            port_idx: 0,
        }
    }
}

impl IntoIterator for &Targets {
    type Item = Target;
    type IntoIter = TargetIter;

    fn into_iter(self) -> TargetIter {
        self.iter()
    }
}

/// Lazy iterator produced by [`Targets::iter`].
#[derive(Debug, Clone)]
pub struct TargetIter {
    hosts: Hosts,
    ports: Vec<PortEntry>,
    current: Option<IpAddr>,
    port_idx: usize,
}

impl Iterator for TargetIter {
    type Item = Target;

    fn next(&mut self) -> Option<Target> {
        if self.ports.is_empty() {
            return None;
        }

        if self.current.is_none() || self.port_idx == self.ports.len() {
            self.current = Some(self.hosts.next()?);
            self.port_idx = 0;
        }

        let host = self.current?;
        let entry = self.ports[self.port_idx];
        self.port_idx += 1;
        Some(Target::new(host, entry))
    }
}
