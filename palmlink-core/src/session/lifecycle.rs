//! Connection lifecycle state machine.
//!
//! ```text
//!  Disconnected ──► Connecting ──► Connected ──► Disconnected
//!       ▲               │
//!       │               ▼
//!       └─────────── Error
//! ```
//!
//! The asymmetry is deliberate: a channel failure during `Connecting`
//! lands in `Error` (the user never got in, and a closure before
//! `auth_response` is reported as an authentication failure), while a
//! failure after `Connected` is an ordinary `Disconnected` (the session
//! existed and ended). Reconnecting is always a fresh `begin_connect`
//! with all per-connection state discarded first.

use std::time::Instant;

use crate::error::PalmError;

/// The current phase of a palmlink session.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionPhase {
    /// No active connection. Initial / terminal state.
    #[default]
    Disconnected,

    /// Channel opening and authentication handshake in flight.
    Connecting,

    /// `auth_response{success:true}` received; frames and commands flow.
    Connected {
        /// When the session entered the `Connected` state.
        since: Instant,
    },

    /// Connection attempt failed. Terminal until the next connect.
    Error {
        /// Human-readable failure description.
        reason: String,
    },
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected { .. } => write!(f, "Connected"),
            Self::Error { reason } => write!(f, "Error({reason})"),
        }
    }
}

impl SessionPhase {
    /// Whether the session is established and ready for traffic.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The failure description, when in `Error`.
    pub fn error_reason(&self) -> Option<&str> {
        match self {
            Self::Error { reason } => Some(reason),
            _ => None,
        }
    }

    /// How long the session has been `Connected`, if it is.
    pub fn connected_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Connected { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connecting`.
    ///
    /// Valid from: `Disconnected`, `Error` (retry).
    pub fn begin_connect(&mut self) -> Result<(), PalmError> {
        match self {
            Self::Disconnected | Self::Error { .. } => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(PalmError::InvalidPhase(
                "cannot connect: a session is already active",
            )),
        }
    }

    /// Transition to `Connected`.
    ///
    /// Valid from: `Connecting`.
    pub fn complete_auth(&mut self) -> Result<(), PalmError> {
        match self {
            Self::Connecting => {
                *self = Self::Connected {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(PalmError::InvalidPhase(
                "cannot complete auth: not in Connecting state",
            )),
        }
    }

    /// Record a failure during connection establishment.
    ///
    /// Valid from: `Connecting`.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), PalmError> {
        match self {
            Self::Connecting => {
                *self = Self::Error {
                    reason: reason.into(),
                };
                Ok(())
            }
            _ => Err(PalmError::InvalidPhase(
                "cannot fail: not in Connecting state",
            )),
        }
    }

    /// Transition to `Disconnected`.
    ///
    /// Valid from: `Connected` (user disconnect or channel loss).
    pub fn finish_disconnect(&mut self) -> Result<(), PalmError> {
        match self {
            Self::Connected { .. } => {
                *self = Self::Disconnected;
                Ok(())
            }
            _ => Err(PalmError::InvalidPhase(
                "cannot disconnect: not in Connected state",
            )),
        }
    }

    /// Force-reset to `Disconnected` regardless of current state.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}
