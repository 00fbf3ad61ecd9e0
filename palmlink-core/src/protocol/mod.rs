//! Session control protocol.
//!
//! JSON `{type, ...}` envelopes over the control channel; binary
//! messages are exclusively video frames (see [`crate::frame`]) and
//! never appear here.
//!
//! # Wire Protocol
//!
//! ```text
//! Client ──[auth{token, deviceName, isExternal}]──────► Host
//! Host   ──[auth_response{success, screenInfo?}]──────► Client
//!
//! Client ──[list_windows{app}]────────────────────────► Host
//! Host   ──[window_list{windows}]─────────────────────► Client
//!     (correlation is by message type; the wire carries no request id)
//!
//! Client ──[pty_start]────────────────────────────────► Host
//! Host   ──[pty_history{history}]─────────────────────► Client   (once)
//! Host   ──[pty_output{output}]───────────────────────► Client   (repeated)
//! Client ──[pty_input{input}]─────────────────────────► Host
//! ```

pub mod message;
pub mod pending;
pub mod pty;

pub use message::{ControlMessage, DirEntry, InputAction, MouseButton};
pub use pending::{PendingRequests, ResponseKind};
pub use pty::{strip_control_sequences, PtySession};
