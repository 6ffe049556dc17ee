//! Server address parsing and name validation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Default port used when an address string omits one.
pub const DEFAULT_PORT: u16 = 25565;

/// Error returned for malformed `host[:port]` strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid server address '{input}': {reason}")]
pub struct AddressFormatError {
    pub input: String,
    pub reason: &'static str,
}

impl AddressFormatError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// A validated game server address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse a `host[:port]` string, applying [`DEFAULT_PORT`] when the port
    /// is omitted.
    pub fn parse(input: &str) -> Result<Self, AddressFormatError> {
        input.parse()
    }
}

impl FromStr for ServerAddress {
    type Err = AddressFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Split on the last colon so a stray one in the host still yields a
        // port parse error rather than silently becoming part of the host.
        let (host, port) = match s.rsplit_once(':') {
            Some((host, port_str)) => {
                let port = port_str
                    .parse::<u16>()
                    .map_err(|_| AddressFormatError::new(s, "port must be a number in 1-65535"))?;
                (host, port)
            }
            None => (s, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(AddressFormatError::new(s, "host must not be empty"));
        }
        if port == 0 {
            return Err(AddressFormatError::new(s, "port must be a number in 1-65535"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// True iff `name` is a safe server name: letters, digits, underscores and
/// hyphens only, non-empty.
pub fn validate_name(name: &str) -> bool {
    static NAME_RE: OnceLock<Regex> = OnceLock::new();
    NAME_RE
        .get_or_init(|| Regex::new("^[A-Za-z0-9_-]+$").unwrap())
        .is_match(name)
}
