//! Listen addresses

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::TransportError;

/// Where the protocol server listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenUri {
    /// `tcp://host:port`
    Tcp(String),
    /// `unix:///path/to/socket`
    Unix(PathBuf),
}

impl FromStr for ListenUri {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(addr) = s.strip_prefix("tcp://") {
            let valid = addr
                .rsplit_once(':')
                .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
            if !valid {
                return Err(TransportError::UnsupportedUri(format!(
                    "expected tcp://host:port, got '{}'",
                    s
                )));
            }
            return Ok(Self::Tcp(addr.to_string()));
        }
        if let Some(path) = s.strip_prefix("unix://") {
            if path.is_empty() {
                let reason = format!("missing socket path in '{}'", s);
                return Err(TransportError::UnsupportedUri(reason));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }
        Err(TransportError::UnsupportedUri(s.to_string()))
    }
}

impl fmt::Display for ListenUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "tcp://{}", addr),
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}
