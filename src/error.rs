//! Error types
//!
//! Errors here end a single connection at most. Routing misses and
//! per-recipient delivery failures are not errors at this level; see
//! [`crate::router::DropReason`] and [`crate::registry::DeliveryError`].

use tokio_tungstenite::tungstenite;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for server and connection operations
#[derive(Debug)]
pub enum Error {
    /// Socket or listener I/O failure
    Io(std::io::Error),
    /// WebSocket protocol failure (handshake, framing, oversized message)
    WebSocket(Box<tungstenite::Error>),
    /// JSON encoding or decoding failure
    Codec(serde_json::Error),
    /// The WebSocket upgrade did not complete in time
    HandshakeTimeout,
    /// Nothing was received from the peer within the idle timeout
    IdleTimeout,
    /// The peer fell behind and its outbound queue overflowed
    Evicted,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::WebSocket(e) => write!(f, "WebSocket error: {}", e),
            Error::Codec(e) => write!(f, "Codec error: {}", e),
            Error::HandshakeTimeout => write!(f, "WebSocket handshake timed out"),
            Error::IdleTimeout => write!(f, "Connection idle timeout"),
            Error::Evicted => write!(f, "Evicted: outbound queue full"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::WebSocket(e) => Some(e.as_ref()),
            Error::Codec(e) => Some(e),
            Error::HandshakeTimeout | Error::IdleTimeout | Error::Evicted => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<tungstenite::Error> for Error {
    fn from(e: tungstenite::Error) -> Self {
        Error::WebSocket(Box::new(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Codec(e)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            Error::HandshakeTimeout.to_string(),
            "WebSocket handshake timed out"
        );
        assert_eq!(Error::IdleTimeout.to_string(), "Connection idle timeout");
        assert_eq!(Error::Evicted.to_string(), "Evicted: outbound queue full");

        let io = Error::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert_eq!(io.to_string(), "I/O error: reset");
    }

    #[test]
    fn test_source() {
        let codec = Error::from(serde_json::from_str::<u32>("nope").unwrap_err());
        assert!(codec.source().is_some());
        assert!(Error::IdleTimeout.source().is_none());
    }
}
