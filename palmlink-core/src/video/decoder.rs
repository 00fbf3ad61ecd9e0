//! Platform decoder seam.
//!
//! Real decoders (VideoToolbox, MediaCodec, ...) run their own worker
//! and deliver raster output asynchronously. This module pins that
//! integration down to a trait plus a bounded channel of display-ready
//! images: the owning session hands the sender to the decoder at
//! configuration time and drops the receiver on teardown, so output
//! arriving after teardown has nowhere to go and is discarded.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::PalmError;

// ── DecoderConfig ────────────────────────────────────────────────

/// Decoder configuration built from one SPS/PPS pair.
///
/// Compared for equality to decide whether an incoming pair requires a
/// session reconfigure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Sequence Parameter Set, without start code.
    pub sps: Bytes,
    /// Picture Parameter Set, without start code.
    pub pps: Bytes,
}

// ── DisplayImage ─────────────────────────────────────────────────

/// A display-ready encoded image.
///
/// The display layer consumes compressed images uniformly, whatever the
/// source codec, so decoders re-compress their raster output before
/// emitting it here. JPEG frames from the wire bypass decode and become
/// a `DisplayImage` directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayImage {
    /// Image width in pixels (0 when the decoder does not report it).
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Compressed image bytes.
    pub data: Bytes,
}

// ── VideoDecoder ─────────────────────────────────────────────────

/// Seam for a platform H.264 decoder.
///
/// Implementations own whatever worker thread or platform session they
/// need. Decoded output goes into the `output` sender supplied at
/// [`configure`](VideoDecoder::configure); a full queue means the
/// consumer is behind and the frame is dropped (`try_send`), never
/// blocked on.
pub trait VideoDecoder: Send {
    /// (Re)open the underlying decode session for `config`.
    ///
    /// Called again with a new sender whenever the parameter sets
    /// change; the previous session is torn down first.
    fn configure(
        &mut self,
        config: &DecoderConfig,
        output: mpsc::Sender<DisplayImage>,
    ) -> Result<(), PalmError>;

    /// Submit one AVCC-framed (length-prefixed) sample for decode.
    fn submit(&mut self, sample: Bytes, is_keyframe: bool) -> Result<(), PalmError>;

    /// Tear down the platform session. Idempotent.
    fn teardown(&mut self);
}

// ── StubDecoder ──────────────────────────────────────────────────

/// In-process decoder used by tests and the reference client.
///
/// Echoes each submitted sample back as a `DisplayImage` so the
/// pipeline can be exercised end to end without platform codecs.
#[derive(Debug, Default)]
pub struct StubDecoder {
    output: Option<mpsc::Sender<DisplayImage>>,
    configured: Option<DecoderConfig>,
    submitted: u64,
}

impl StubDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The config most recently applied, if any.
    pub fn configured(&self) -> Option<&DecoderConfig> {
        self.configured.as_ref()
    }

    /// Total samples submitted since construction.
    pub fn submitted(&self) -> u64 {
        self.submitted
    }
}

impl VideoDecoder for StubDecoder {
    fn configure(
        &mut self,
        config: &DecoderConfig,
        output: mpsc::Sender<DisplayImage>,
    ) -> Result<(), PalmError> {
        if config.sps.is_empty() || config.pps.is_empty() {
            return Err(PalmError::DecoderConfig("empty parameter set".into()));
        }
        self.configured = Some(config.clone());
        self.output = Some(output);
        Ok(())
    }

    fn submit(&mut self, sample: Bytes, _is_keyframe: bool) -> Result<(), PalmError> {
        let output = self
            .output
            .as_ref()
            .ok_or(PalmError::Decode("decoder not configured".into()))?;
        self.submitted += 1;
        // Queue full or receiver gone: drop the frame, as a platform
        // decoder callback would after teardown.
        let _ = output.try_send(DisplayImage {
            width: 0,
            height: 0,
            data: sample,
        });
        Ok(())
    }

    fn teardown(&mut self) {
        self.output = None;
        self.configured = None;
    }
}

// ── Tests ────────────────────────────────────────────────────────
