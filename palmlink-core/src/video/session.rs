//! H.264 decode-session state machine.
//!
//! ```text
//!  Uninitialized ──► AwaitingParameterSets ──► Configured ──► Decoding
//!                            ▲                     │  ▲          │
//!                            │   (decode error)    │  └──────────┘
//!                            └─────────────────────┴── (reconfigure)
//! ```
//!
//! SPS and PPS are held until both are present, then a decoder session
//! is opened; a differing pair later tears the session down and
//! reopens it. Slices are re-framed from Annex-B to AVCC (4-byte
//! big-endian length prefix) before submission, since platform decoders
//! expect length-prefixed samples. Everything here is loss-tolerant:
//! decode failures log and fall back to awaiting fresh parameter sets,
//! never up the call stack.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::PalmError;
use crate::video::decoder::{DecoderConfig, DisplayImage, VideoDecoder};
use crate::video::nal::{split_annex_b, NalUnit, NalUnitType};

/// Capacity of the decoded-image channel. A slow display drops frames
/// rather than backing up the decode worker.
pub const DECODED_IMAGE_QUEUE: usize = 8;

// ── DecodeState ──────────────────────────────────────────────────

/// The current phase of an H.264 decode session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeState {
    /// No stream data seen yet. Initial / post-teardown state.
    #[default]
    Uninitialized,

    /// Stream started; waiting for a complete SPS/PPS pair.
    AwaitingParameterSets,

    /// Decoder session open; no slice decoded yet.
    Configured,

    /// At least one slice submitted successfully.
    Decoding,
}

impl std::fmt::Display for DecodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::AwaitingParameterSets => write!(f, "AwaitingParameterSets"),
            Self::Configured => write!(f, "Configured"),
            Self::Decoding => write!(f, "Decoding"),
        }
    }
}

impl DecodeState {
    /// Whether slices may be submitted to the decoder.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Configured | Self::Decoding)
    }

    // ── Transitions ──────────────────────────────────────────────

    /// First stream data seen.
    ///
    /// Valid from: `Uninitialized` (no-op elsewhere — parameter sets
    /// repeat throughout a healthy stream).
    pub fn begin_awaiting(&mut self) {
        if matches!(self, Self::Uninitialized) {
            *self = Self::AwaitingParameterSets;
        }
    }

    /// Decoder session (re)opened.
    ///
    /// Valid from: `AwaitingParameterSets`, `Configured`, `Decoding`.
    pub fn complete_configuration(&mut self) -> Result<(), PalmError> {
        match self {
            Self::AwaitingParameterSets | Self::Configured | Self::Decoding => {
                *self = Self::Configured;
                Ok(())
            }
            Self::Uninitialized => Err(PalmError::InvalidDecodeState(
                "cannot configure: no stream data seen",
            )),
        }
    }

    /// First slice decoded.
    ///
    /// Valid from: `Configured` (no-op from `Decoding`).
    pub fn begin_decoding(&mut self) -> Result<(), PalmError> {
        match self {
            Self::Configured | Self::Decoding => {
                *self = Self::Decoding;
                Ok(())
            }
            _ => Err(PalmError::InvalidDecodeState(
                "cannot decode: session not configured",
            )),
        }
    }

    /// Recoverable failure: discard the session, await fresh SPS/PPS.
    pub fn reset_to_awaiting(&mut self) {
        *self = Self::AwaitingParameterSets;
    }

    /// Full teardown.
    pub fn reset(&mut self) {
        *self = Self::Uninitialized;
    }
}

// ── AVCC framing ─────────────────────────────────────────────────

/// Re-frame one NAL unit from Annex-B to AVCC: a 4-byte big-endian
/// length prefix instead of a start code.
pub fn to_avcc(nal_data: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(4 + nal_data.len());
    buf.put_u32(nal_data.len() as u32);
    buf.extend_from_slice(nal_data);
    buf.freeze()
}

// ── H264DecodeSession ────────────────────────────────────────────

/// Stateful NAL consumer driving one platform decoder.
///
/// Owned by the connection's session client; torn down with it.
pub struct H264DecodeSession<D: VideoDecoder> {
    state: DecodeState,
    sps: Option<Bytes>,
    pps: Option<Bytes>,
    /// Config of the currently open decoder session, if any.
    active: Option<DecoderConfig>,
    decoder: D,
    output_tx: mpsc::Sender<DisplayImage>,
}

impl<D: VideoDecoder> H264DecodeSession<D> {
    /// Create a session around `decoder`.
    ///
    /// Returns the receiver of decoded display images; drop it on
    /// teardown and any late decoder output is discarded.
    pub fn new(decoder: D) -> (Self, mpsc::Receiver<DisplayImage>) {
        let (output_tx, output_rx) = mpsc::channel(DECODED_IMAGE_QUEUE);
        (
            Self {
                state: DecodeState::default(),
                sps: None,
                pps: None,
                active: None,
                decoder,
                output_tx,
            },
            output_rx,
        )
    }

    /// Current session state.
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// The decoder behind the session (used by stats and tests).
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Feed a raw Annex-B byte stream (one frame's worth or more).
    ///
    /// Never fails: malformed data and decode errors degrade to
    /// dropped frames on this path.
    pub fn feed(&mut self, stream: &Bytes) {
        for nal in split_annex_b(stream) {
            match nal.unit_type {
                NalUnitType::Sps => {
                    self.state.begin_awaiting();
                    self.sps = Some(nal.data);
                    self.try_configure();
                }
                NalUnitType::Pps => {
                    self.state.begin_awaiting();
                    self.pps = Some(nal.data);
                    self.try_configure();
                }
                NalUnitType::Idr | NalUnitType::NonIdr => self.submit_slice(&nal),
                NalUnitType::Other(t) => {
                    debug!(nal_type = t, "skipping uninterpreted NAL unit");
                }
            }
        }
    }

    /// Tear the session down: close the platform decoder and forget
    /// all stream state. The session may be fed again afterwards and
    /// will behave like a fresh one.
    pub fn teardown(&mut self) {
        self.decoder.teardown();
        self.sps = None;
        self.pps = None;
        self.active = None;
        self.state.reset();
    }

    // ── Internal ─────────────────────────────────────────────────

    fn try_configure(&mut self) {
        let (Some(sps), Some(pps)) = (&self.sps, &self.pps) else {
            return;
        };
        let config = DecoderConfig {
            sps: sps.clone(),
            pps: pps.clone(),
        };
        if self.active.as_ref() == Some(&config) {
            return; // repeated in-band parameter sets, nothing changed
        }

        if self.active.is_some() {
            debug!("parameter sets changed, reconfiguring decoder session");
            self.decoder.teardown();
            self.active = None;
        }

        match self.decoder.configure(&config, self.output_tx.clone()) {
            Ok(()) => {
                self.active = Some(config);
                if let Err(e) = self.state.complete_configuration() {
                    warn!(error = %e, "decode state out of step after configure");
                }
            }
            Err(e) => {
                warn!(error = %e, "decoder configuration failed, awaiting fresh parameter sets");
                self.recover();
            }
        }
    }

    fn submit_slice(&mut self, nal: &NalUnit) {
        if !self.state.is_ready() {
            debug!(state = %self.state, "dropping slice before decoder configuration");
            return;
        }
        let sample = to_avcc(&nal.data);
        let is_keyframe = nal.unit_type == NalUnitType::Idr;
        match self.decoder.submit(sample, is_keyframe) {
            Ok(()) => {
                if self.state == DecodeState::Configured {
                    let _ = self.state.begin_decoding();
                }
            }
            Err(e) => {
                warn!(error = %e, "decode failed, awaiting fresh parameter sets");
                self.recover();
            }
        }
    }

    fn recover(&mut self) {
        self.decoder.teardown();
        self.sps = None;
        self.pps = None;
        self.active = None;
        self.state.reset_to_awaiting();
    }
}

// ── Tests ────────────────────────────────────────────────────────
