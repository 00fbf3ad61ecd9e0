//! Connection establishment, lifecycle, and inbound routing.
//!
//! ```text
//! pairing code ──► ConnectionInfo ──► ControlChannel ──► SessionClient
//!                                                             │
//!                       frame / map / protocol / video  ◄─────┘
//!                              (routing task)
//! ```
//!
//! | Module      | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `pairing`   | Pairing-code parsing into connection info        |
//! | `lifecycle` | Validated connection phase transitions           |
//! | `channel`   | WebSocket transport behind reader/writer tasks   |
//! | `client`    | The owning session object and command surface    |

pub mod channel;
pub mod client;
pub mod lifecycle;
pub mod pairing;

pub use channel::{ChannelMessage, ControlChannel};
pub use client::{FrameStats, SessionClient, VideoFrame, AUTH_TIMEOUT, RESPONSE_TIMEOUT};
pub use lifecycle::SessionPhase;
pub use pairing::{ConnectionInfo, TransportMode};
