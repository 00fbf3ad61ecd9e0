//! Pairing-code parsing.
//!
//! The host shows one opaque code and the handheld consumes it whole.
//! Two shapes exist on the wire:
//!
//! ```text
//! 192.168.1.20:8080:s3cr3t      direct connection on the local network
//! wss://relay.example.com:s3cr3t  via the external relay
//! ```

use crate::error::PalmError;

const RELAY_SCHEME: &str = "wss://";

/// How the control channel reaches the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Direct WebSocket to a host on the local network.
    Local,
    /// TLS WebSocket through the external relay.
    Relayed,
}

/// Everything needed to open the control channel.
///
/// Immutable once parsed; a new connection means a new pairing code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    host: String,
    port: u16,
    token: String,
    transport: TransportMode,
}

impl ConnectionInfo {
    /// Parse a pairing code.
    pub fn parse(code: &str) -> Result<Self, PalmError> {
        let code = code.trim();
        if let Some(rest) = code.strip_prefix(RELAY_SCHEME) {
            return Self::parse_relayed(code, rest);
        }

        let mut parts = code.split(':');
        let (host, port, token) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(host), Some(port), Some(token), None) => (host, port, token),
            _ => {
                return Err(PalmError::InvalidPairingCode(format!(
                    "expected host:port:token, got {code:?}"
                )))
            }
        };
        if host.is_empty() || token.is_empty() {
            return Err(PalmError::InvalidPairingCode(format!(
                "empty host or token in {code:?}"
            )));
        }
        let port = port.parse::<u16>().map_err(|_| {
            PalmError::InvalidPairingCode(format!("invalid port {port:?} in {code:?}"))
        })?;

        Ok(Self {
            host: host.to_string(),
            port,
            token: token.to_string(),
            transport: TransportMode::Local,
        })
    }

    fn parse_relayed(code: &str, rest: &str) -> Result<Self, PalmError> {
        // The token follows the last colon; relay hosts carry no
        // explicit port.
        let (host, token) = rest.rsplit_once(':').ok_or_else(|| {
            PalmError::InvalidPairingCode(format!("missing token in {code:?}"))
        })?;
        if host.is_empty() || token.is_empty() {
            return Err(PalmError::InvalidPairingCode(format!(
                "empty host or token in {code:?}"
            )));
        }
        Ok(Self {
            host: host.to_string(),
            port: 443,
            token: token.to_string(),
            transport: TransportMode::Relayed,
        })
    }

    /// The WebSocket URL for the control channel.
    pub fn url(&self) -> String {
        match self.transport {
            TransportMode::Local => format!("ws://{}:{}", self.host, self.port),
            TransportMode::Relayed => format!("wss://{}", self.host),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn transport(&self) -> TransportMode {
        self.transport
    }

    /// Whether this connection crosses the external relay. Reported to
    /// the host in the `auth` handshake.
    pub fn is_external(&self) -> bool {
        self.transport == TransportMode::Relayed
    }
}
