//! Port types with validation and parsing.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortEntry` pairs a port with its scheme, and `PortSpec` is the ordered
//! list given on the command line, e.g. `80,443s,8443s`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Suffix marking a port as HTTPS.
pub const TLS_MARKER: char = 's';

/// Ports probed when the caller gives none.
pub const DEFAULT_PORT_SPEC: &str = "80,443s";

/// A validated network port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Port(u16);

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Create a new Port from a u16, returning None if invalid.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(PortError::OutOfRange(value.into()))
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// Error type for port parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("port {0} is out of valid range (1-65535)")]
    OutOfRange(u64),
    #[error("invalid port token: '{0}'")]
    InvalidFormat(String),
    #[error("empty port token")]
    EmptyToken,
    #[error("empty port specification")]
    Empty,
}

/// Which scheme a target port is probed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a port specification: a port and whether it speaks TLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortEntry {
    pub port: Port,
    pub tls: bool,
}

impl PortEntry {
    pub const fn new(port: Port, tls: bool) -> Self {
        Self { port, tls }
    }

    /// Parse a single token such as `80` or `443s`.
    pub fn parse(token: &str) -> Result<Self, PortError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(PortError::EmptyToken);
        }

        let (digits, tls) = match token.strip_suffix(|c: char| c.eq_ignore_ascii_case(&TLS_MARKER)) {
            Some(rest) => (rest, true),
            None => (token, false),
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PortError::InvalidFormat(token.to_string()));
        }

        let value: u64 = digits
            .parse()
            .map_err(|_| PortError::InvalidFormat(token.to_string()))?;
        let port = u16::try_from(value)
            .ok()
            .and_then(Port::new)
            .ok_or(PortError::OutOfRange(value))?;

        Ok(Self { port, tls })
    }

    pub fn scheme(&self) -> Scheme {
        if self.tls {
            Scheme::Https
        } else {
            Scheme::Http
        }
    }
}

impl fmt::Display for PortEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tls {
            write!(f, "{}{}", self.port, TLS_MARKER)
        } else {
            write!(f, "{}", self.port)
        }
    }
}

impl FromStr for PortEntry {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// An ordered list of port entries.
///
/// Order is preserved because it is the inner loop of target enumeration.
/// Repeated identical entries are collapsed to their first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    entries: Vec<PortEntry>,
}

impl PortSpec {
    /// Create an empty port specification.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry unless it is already present.
    pub fn push(&mut self, entry: PortEntry) {
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }

    /// Parse a comma separated list. Empty tokens (`80,,443s`, a trailing
    /// comma) are skipped; an empty result is an error.
    pub fn parse(s: &str) -> Result<Self, PortError> {
        let spec = Self::parse_lenient(s)?;
        if spec.is_empty() {
            return Err(PortError::Empty);
        }
        Ok(spec)
    }

    /// Parse a list, falling back to `default` when no tokens remain.
    pub fn parse_or_default(s: &str, default: &str) -> Result<Self, PortError> {
        let spec = Self::parse_lenient(s)?;
        if spec.is_empty() {
            return Self::parse(default);
        }
        Ok(spec)
    }

    fn parse_lenient(s: &str) -> Result<Self, PortError> {
        let mut spec = Self::new();
        for token in s.split(',').filter(|t| !t.trim().is_empty()) {
            spec.push(PortEntry::parse(token)?);
        }
        Ok(spec)
    }

    pub fn entries(&self) -> &[PortEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.entries.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_validation() {
        assert!(Port::new(0).is_none());
        assert!(Port::new(1).is_some());
        assert!(Port::new(65535).is_some());
    }

    #[test]
    fn test_entry_plain_and_tls() {
        let plain = PortEntry::parse("80").unwrap();
        assert_eq!(plain.port.as_u16(), 80);
        assert!(!plain.tls);
        assert_eq!(plain.scheme(), Scheme::Http);

        let tls = PortEntry::parse("8443s").unwrap();
        assert_eq!(tls.port.as_u16(), 8443);
        assert!(tls.tls);
        assert_eq!(tls.to_string(), "8443s");

        assert!(PortEntry::parse("443S").unwrap().tls);
    }

    #[test]
    fn test_entry_rejects_malformed() {
        assert_eq!(PortEntry::parse(""), Err(PortError::EmptyToken));
        assert!(matches!(PortEntry::parse("s"), Err(PortError::InvalidFormat(_))));
        assert!(matches!(PortEntry::parse("http"), Err(PortError::InvalidFormat(_))));
        assert!(matches!(PortEntry::parse("80ss"), Err(PortError::InvalidFormat(_))));
        assert!(matches!(PortEntry::parse("-1"), Err(PortError::InvalidFormat(_))));
        assert_eq!(PortEntry::parse("0"), Err(PortError::OutOfRange(0)));
        assert_eq!(PortEntry::parse("70000"), Err(PortError::OutOfRange(70000)));
    }

    #[test]
    fn test_spec_keeps_order() {
        let spec: PortSpec = "8080,443s,80".parse().unwrap();
        let ports: Vec<String> = spec.entries().iter().map(|e| e.to_string()).collect();
        assert_eq!(ports, vec!["8080", "443s", "80"]);
        assert_eq!(spec.to_string(), "8080,443s,80");
    }

    #[test]
    fn test_spec_skips_empty_tokens_and_dedups() {
        let spec: PortSpec = "80,,443s,80,".parse().unwrap();
        assert_eq!(spec.to_string(), "80,443s");

        let mixed: PortSpec = "80,80s".parse().unwrap();
        assert_eq!(mixed.len(), 2);
    }

    #[test]
    fn test_spec_empty_falls_back_to_default() {
        assert_eq!(PortSpec::parse(",,"), Err(PortError::Empty));

        let spec = PortSpec::parse_or_default(",", DEFAULT_PORT_SPEC).unwrap();
        assert_eq!(spec.to_string(), "80,443s");

        let given = PortSpec::parse_or_default("8000", DEFAULT_PORT_SPEC).unwrap();
        assert_eq!(given.to_string(), "8000");
    }

    #[test]
    fn test_spec_malformed_token_fails() {
        assert!("80,abc".parse::<PortSpec>().is_err());
        assert!(PortSpec::parse_or_default("80,abc", DEFAULT_PORT_SPEC).is_err());
    }
}
