//! Codec-tag classification and fragment framing.
//!
//! Classification never fails loudly: a malformed message on this path
//! is a lost video frame, so [`FrameMessage::classify`] returns `None`
//! and the caller drops it. The pipeline must never stall on bad input.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::PalmError;

// ── Codec tags ───────────────────────────────────────────────────

/// Payload is a complete JPEG image.
pub const TAG_JPEG: u8 = 0x00;
/// Payload is one complete H.264 encoded frame (Annex-B).
pub const TAG_H264: u8 = 0x01;
/// Payload is one fragment of an oversized H.264 frame.
pub const TAG_H264_FRAGMENT: u8 = 0x02;

/// JPEG start-of-image marker, accepted without a codec tag.
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Fragment header: tag + index + count + sequence (u16 BE).
pub const FRAGMENT_HEADER_SIZE: usize = 5;

// ── Fragment ─────────────────────────────────────────────────────

/// One fragment of an H.264 frame that exceeded the message-size limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Frame sequence id shared by all fragments of one frame.
    pub sequence: u16,
    /// 0-based position of this fragment within the frame.
    pub index: u8,
    /// Total number of fragments in the frame.
    pub count: u8,
    /// Fragment payload bytes.
    pub payload: Bytes,
}

impl Fragment {
    /// Serialize to a tagged wire message.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAGMENT_HEADER_SIZE + self.payload.len());
        buf.put_u8(TAG_H264_FRAGMENT);
        buf.put_u8(self.index);
        buf.put_u8(self.count);
        buf.put_u16(self.sequence);
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }
}

// ── FrameMessage ─────────────────────────────────────────────────

/// A classified inbound binary message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameMessage {
    /// A self-contained JPEG image, ready for display.
    Jpeg(Bytes),
    /// One complete H.264 encoded frame.
    H264(Bytes),
    /// One fragment of a larger H.264 frame.
    H264Fragment(Fragment),
}

impl FrameMessage {
    /// Classify a binary channel message by its leading codec tag.
    ///
    /// Returns `None` for empty, truncated, or unrecognized messages;
    /// those are dropped by the caller, never surfaced as errors.
    pub fn classify(message: Bytes) -> Option<Self> {
        let first = *message.first()?;
        match first {
            TAG_JPEG => Some(FrameMessage::Jpeg(message.slice(1..))),
            TAG_H264 => Some(FrameMessage::H264(message.slice(1..))),
            TAG_H264_FRAGMENT => {
                if message.len() < FRAGMENT_HEADER_SIZE {
                    return None;
                }
                let index = message[1];
                let count = message[2];
                if count == 0 || index >= count {
                    return None;
                }
                let sequence = u16::from_be_bytes([message[3], message[4]]);
                Some(FrameMessage::H264Fragment(Fragment {
                    sequence,
                    index,
                    count,
                    payload: message.slice(FRAGMENT_HEADER_SIZE..),
                }))
            }
            // Legacy senders ship bare JPEG payloads without a tag.
            _ if message.len() >= 2 && message[..2] == JPEG_SOI => {
                Some(FrameMessage::Jpeg(message))
            }
            _ => None,
        }
    }
}

// ── Sender-side framing ──────────────────────────────────────────

/// Encode a JPEG payload as a tagged channel message.
pub fn encode_jpeg(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + payload.len());
    buf.put_u8(TAG_JPEG);
    buf.extend_from_slice(payload);
    buf.freeze()
}

/// Encode an H.264 frame, fragmenting it when it exceeds `max_message`.
///
/// Frames that fit in a single message get the `0x01` tag. Larger frames
/// are split into up to 255 fragments tagged `0x02` under `sequence`.
pub fn encode_h264(
    payload: &[u8],
    sequence: u16,
    max_message: usize,
) -> Result<Vec<Bytes>, PalmError> {
    if max_message <= FRAGMENT_HEADER_SIZE {
        return Err(PalmError::FragmentTooLarge {
            size: payload.len(),
            max: max_message,
        });
    }

    if payload.len() + 1 <= max_message {
        let mut buf = BytesMut::with_capacity(1 + payload.len());
        buf.put_u8(TAG_H264);
        buf.extend_from_slice(payload);
        return Ok(vec![buf.freeze()]);
    }

    let chunk_size = max_message - FRAGMENT_HEADER_SIZE;
    let count = payload.len().div_ceil(chunk_size);
    if count > u8::MAX as usize {
        return Err(PalmError::FragmentTooLarge {
            size: payload.len(),
            max: chunk_size * u8::MAX as usize,
        });
    }

    let mut messages = Vec::with_capacity(count);
    for (index, chunk) in payload.chunks(chunk_size).enumerate() {
        let frag = Fragment {
            sequence,
            index: index as u8,
            count: count as u8,
            payload: Bytes::copy_from_slice(chunk),
        };
        messages.push(frag.encode());
    }
    Ok(messages)
}

// ── Tests ────────────────────────────────────────────────────────
