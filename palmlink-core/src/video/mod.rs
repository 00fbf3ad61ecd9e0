//! H.264 decode pipeline.
//!
//! Raw Annex-B byte streams arrive from the frame layer; this module
//! parses them into NAL units, drives a platform decoder session, and
//! hands display-ready images to the rest of the client.
//!
//! ```text
//! frame bytes ──► NAL parser ──► H264DecodeSession ──► VideoDecoder
//!   (Annex-B)      (nal.rs)        (session.rs)         (decoder.rs)
//!                                                            │
//!                                   display image ◄──────────┘
//!                                 (bounded mpsc channel)
//! ```
//!
//! | Module    | Purpose                                             |
//! |-----------|-----------------------------------------------------|
//! | `nal`     | Annex-B start-code scanning and NAL classification  |
//! | `session` | SPS/PPS tracking, decoder (re)configuration, AVCC re-framing |
//! | `decoder` | Platform decoder seam + display-image delivery      |

pub mod decoder;
pub mod nal;
pub mod session;

pub use decoder::{DecoderConfig, DisplayImage, StubDecoder, VideoDecoder};
pub use nal::{split_annex_b, NalUnit, NalUnitType};
pub use session::{DecodeState, H264DecodeSession, DECODED_IMAGE_QUEUE};
