//! Binary frame envelope for the video channel.
//!
//! Every binary message on the control channel is a video/image frame.
//! A leading codec tag selects the payload interpretation; oversized
//! H.264 frames are split into bounded fragments so they survive the
//! channel's message-size limit.
//!
//! ## Wire format
//!
//! **JPEG frame** (tag `0x00`):
//! ```text
//! tag:       u8   (1)  = 0x00
//! payload:   [u8] (variable, complete JPEG image)
//! ```
//!
//! **H.264 single packet** (tag `0x01`):
//! ```text
//! tag:       u8   (1)  = 0x01
//! payload:   [u8] (variable, one complete encoded frame, Annex-B)
//! ```
//!
//! **H.264 fragment** (tag `0x02`):
//! ```text
//! tag:       u8   (1)  = 0x02
//! index:     u8   (1)
//! count:     u8   (1)
//! sequence:  u16  (2, big-endian)
//! payload:   [u8] (variable)
//! ```
//!
//! Untagged messages beginning with the JPEG start marker `FF D8` are
//! accepted as complete JPEG payloads for backward compatibility.

pub mod assembler;
pub mod codec;

pub use assembler::{FragmentAssembler, MAX_PENDING_SEQUENCES};
pub use codec::{
    Fragment, FrameMessage, FRAGMENT_HEADER_SIZE, TAG_H264, TAG_H264_FRAGMENT, TAG_JPEG,
};
