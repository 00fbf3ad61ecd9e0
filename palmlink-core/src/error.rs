//! Domain-specific error types for the palmlink protocol.
//!
//! All fallible operations return `Result<T, PalmError>`.
//! No panics on wire input — every error is typed and recoverable.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the palmlink client core.
#[derive(Debug, Error)]
pub enum PalmError {
    // ── Pairing / Protocol Errors ────────────────────────────────
    /// A pairing code could not be parsed into connection info.
    #[error("invalid pairing code: {0}")]
    InvalidPairingCode(String),

    /// A control message violated protocol rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// The server rejected our credentials, or the channel closed
    /// before `auth_response` arrived.
    #[error("authentication failed")]
    AuthenticationFailed,

    // ── Frame Errors ─────────────────────────────────────────────
    /// A fragment payload would exceed the channel message-size limit.
    #[error("fragment too large: {size} bytes (max {max})")]
    FragmentTooLarge { size: usize, max: usize },

    // ── Decode Errors ────────────────────────────────────────────
    /// The decoder could not be configured from the held SPS/PPS pair.
    #[error("decoder configuration failed: {0}")]
    DecoderConfig(String),

    /// The platform decoder rejected a submitted sample.
    #[error("decode failed: {0}")]
    Decode(String),

    /// A decode-session operation was attempted in the wrong state.
    #[error("invalid decode state: {0}")]
    InvalidDecodeState(&'static str),

    // ── Connection Errors ────────────────────────────────────────
    /// The WebSocket/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The control channel transport failed.
    #[error("channel error: {0}")]
    Channel(String),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// A lifecycle transition was attempted from the wrong phase.
    #[error("invalid connection phase: {0}")]
    InvalidPhase(&'static str),

    // ── Serialization Errors ─────────────────────────────────────
    /// Encoding or decoding of a control message failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// UTF-8 conversion failed.
    #[error("invalid utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for PalmError {
    fn from(s: String) -> Self {
        PalmError::Other(s)
    }
}

impl From<&str> for PalmError {
    fn from(s: &str) -> Self {
        PalmError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for PalmError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        PalmError::ChannelClosed
    }
}

impl From<serde_json::Error> for PalmError {
    fn from(e: serde_json::Error) -> Self {
        PalmError::Encoding(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for PalmError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        PalmError::Channel(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = PalmError::AuthenticationFailed;
        assert!(e.to_string().contains("authentication"));

        let e = PalmError::FragmentTooLarge { size: 9000, max: 4096 };
        assert!(e.to_string().contains("9000"));
        assert!(e.to_string().contains("4096"));
    }

    #[test]
    fn from_string() {
        let e: PalmError = "something broke".into();
        assert!(matches!(e, PalmError::Other(_)));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: PalmError = io_err.into();
        assert!(matches!(e, PalmError::Connection(_)));
    }

    #[test]
    fn from_serde_json() {
        let bad = serde_json::from_str::<serde_json::Value>("{nope");
        let e: PalmError = bad.unwrap_err().into();
        assert!(matches!(e, PalmError::Encoding(_)));
    }
}
