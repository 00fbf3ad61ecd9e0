//! # palmlink-core
//!
//! Client core for streaming a remote desktop to a handheld device and
//! mapping on-device gestures back to remote pixel coordinates.
//!
//! This crate contains:
//! - **Frame**: dual-codec binary frame envelope with fragmentation
//!   and reassembly (`FrameMessage`, `FragmentAssembler`)
//! - **Video**: H.264 decode-session state machine over a platform
//!   decoder seam (`H264DecodeSession`, `VideoDecoder`)
//! - **Map**: viewport ↔ remote coordinate mapping under full-screen
//!   and focused-window capture modes (`CoordinateMapper`)
//! - **Protocol**: the JSON control-message taxonomy, type-correlated
//!   request tracking, and PTY stream handling (`ControlMessage`)
//! - **Session**: pairing, WebSocket channel, lifecycle state machine,
//!   and the owning session client (`SessionClient`)
//! - **Error**: `PalmError` — typed, `thiserror`-based error hierarchy

pub mod error;
pub mod frame;
pub mod map;
pub mod protocol;
pub mod session;
pub mod video;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use error::PalmError;
pub use frame::{Fragment, FragmentAssembler, FrameMessage, MAX_PENDING_SEQUENCES};
pub use map::{
    CoordinateMapper, FocusedWindow, Point, ScreenInfo, ViewTransform, ViewportSize,
    FULL_SCREEN_CAPTURE_SCALE, INITIAL_FOCUS_ZOOM,
};
pub use protocol::{ControlMessage, InputAction, MouseButton, PendingRequests, PtySession};
pub use session::{
    ChannelMessage, ConnectionInfo, ControlChannel, FrameStats, SessionClient, SessionPhase,
    TransportMode, VideoFrame,
};
pub use video::{DisplayImage, H264DecodeSession, StubDecoder, VideoDecoder};
