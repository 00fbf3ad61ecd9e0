//! Fragment reassembly with bounded buffering.
//!
//! Fragments of a frame arrive in any order. The assembler buffers them
//! per sequence id and emits the reconstructed payload exactly when all
//! declared fragments are present. Loss degrades to a dropped frame:
//! when more than [`MAX_PENDING_SEQUENCES`] sequences are buffered, the
//! numerically smallest id is evicted so memory stays bounded.

use std::collections::BTreeMap;

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::frame::codec::Fragment;

/// Maximum number of concurrently buffered sequence ids.
pub const MAX_PENDING_SEQUENCES: usize = 3;

// ── FragmentAssembler ────────────────────────────────────────────

/// Reassembles fragmented H.264 frames keyed by sequence id.
#[derive(Debug, Default)]
pub struct FragmentAssembler {
    /// sequence id → (declared count, index → payload).
    pending: BTreeMap<u16, PendingFrame>,
}

#[derive(Debug)]
struct PendingFrame {
    count: u8,
    parts: BTreeMap<u8, Bytes>,
}

impl FragmentAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fragment; returns the complete payload once every
    /// fragment of its sequence has arrived.
    ///
    /// Duplicates keep the first copy. A fragment whose declared count
    /// disagrees with the buffered one restarts that sequence (the
    /// sender re-keyed it; stale parts would corrupt the frame).
    pub fn insert(&mut self, fragment: Fragment) -> Option<Bytes> {
        let entry = self
            .pending
            .entry(fragment.sequence)
            .or_insert_with(|| PendingFrame {
                count: fragment.count,
                parts: BTreeMap::new(),
            });

        if entry.count != fragment.count {
            debug!(
                sequence = fragment.sequence,
                old = entry.count,
                new = fragment.count,
                "fragment count changed mid-sequence, restarting"
            );
            entry.count = fragment.count;
            entry.parts.clear();
        }

        entry.parts.entry(fragment.index).or_insert(fragment.payload);

        if entry.parts.len() == entry.count as usize {
            let frame = self
                .pending
                .remove(&fragment.sequence)
                .map(|p| concat_parts(p.parts));
            return frame;
        }

        self.evict_excess();
        None
    }

    /// Number of sequences currently buffered.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether fragments for `sequence` are buffered.
    pub fn is_pending(&self, sequence: u16) -> bool {
        self.pending.contains_key(&sequence)
    }

    /// Drop all buffered state (connection teardown).
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    fn evict_excess(&mut self) {
        while self.pending.len() > MAX_PENDING_SEQUENCES {
            if let Some((sequence, stale)) = self.pending.pop_first() {
                debug!(
                    sequence,
                    parts = stale.parts.len(),
                    of = stale.count,
                    "evicting stale fragment buffer"
                );
            }
        }
    }
}

fn concat_parts(parts: BTreeMap<u8, Bytes>) -> Bytes {
    let total: usize = parts.values().map(Bytes::len).sum();
    let mut buf = BytesMut::with_capacity(total);
    for (_, part) in parts {
        buf.extend_from_slice(&part);
    }
    buf.freeze()
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(sequence: u16, index: u8, count: u8, payload: &'static [u8]) -> Fragment {
        Fragment {
            sequence,
            index,
            count,
            payload: Bytes::from_static(payload),
        }
    }

    #[test]
    fn in_order_reassembly() {
        let mut asm = FragmentAssembler::new();
        assert!(asm.insert(frag(1, 0, 3, b"aa")).is_none());
        assert!(asm.insert(frag(1, 1, 3, b"bb")).is_none());
        let frame = asm.insert(frag(1, 2, 3, b"cc")).unwrap();
        assert_eq!(&frame[..], b"aabbcc");
        assert_eq!(asm.pending_count(), 0);
    }

    #[test]
    fn out_of_order_reassembly() {
        let mut asm = FragmentAssembler::new();
        assert!(asm.insert(frag(9, 2, 3, b"cc")).is_none());
        assert!(asm.insert(frag(9, 0, 3, b"aa")).is_none());
        let frame = asm.insert(frag(9, 1, 3, b"bb")).unwrap();
        // payload order follows fragment index, not arrival order
        assert_eq!(&frame[..], b"aabbcc");
    }

    #[test]
    fn single_fragment_frame() {
        let mut asm = FragmentAssembler::new();
        let frame = asm.insert(frag(4, 0, 1, b"whole")).unwrap();
        assert_eq!(&frame[..], b"whole");
    }

    #[test]
    fn duplicate_fragment_keeps_first() {
        let mut asm = FragmentAssembler::new();
        assert!(asm.insert(frag(2, 0, 2, b"first")).is_none());
        assert!(asm.insert(frag(2, 0, 2, b"dupe!")).is_none());
        let frame = asm.insert(frag(2, 1, 2, b"-end")).unwrap();
        assert_eq!(&frame[..], b"first-end");
    }

    #[test]
    fn interleaved_sequences() {
        let mut asm = FragmentAssembler::new();
        assert!(asm.insert(frag(1, 0, 2, b"a1")).is_none());
        assert!(asm.insert(frag(2, 0, 2, b"b1")).is_none());
        let f2 = asm.insert(frag(2, 1, 2, b"b2")).unwrap();
        assert_eq!(&f2[..], b"b1b2");
        let f1 = asm.insert(frag(1, 1, 2, b"a2")).unwrap();
        assert_eq!(&f1[..], b"a1a2");
    }

    #[test]
    fn stale_sequence_evicted_after_newer_arrivals() {
        let mut asm = FragmentAssembler::new();
        // Sequence 10 never completes.
        assert!(asm.insert(frag(10, 0, 2, b"lost")).is_none());

        // Four newer incomplete sequences push it out.
        for seq in 11..=14 {
            assert!(asm.insert(frag(seq, 0, 2, b"x")).is_none());
        }

        assert!(!asm.is_pending(10));
        assert!(asm.pending_count() <= MAX_PENDING_SEQUENCES);

        // The late mate of sequence 10 starts a fresh buffer, never a
        // corrupted emit.
        assert!(asm.insert(frag(10, 1, 2, b"late")).is_none());
    }

    #[test]
    fn memory_stays_bounded_under_loss() {
        let mut asm = FragmentAssembler::new();
        for seq in 0..1000u16 {
            // Every frame is missing its second fragment.
            assert!(asm.insert(frag(seq, 0, 2, b"partial")).is_none());
            assert!(asm.pending_count() <= MAX_PENDING_SEQUENCES + 1);
        }
        assert!(asm.pending_count() <= MAX_PENDING_SEQUENCES);
    }

    #[test]
    fn count_change_restarts_sequence() {
        let mut asm = FragmentAssembler::new();
        assert!(asm.insert(frag(5, 0, 3, b"old")).is_none());
        assert!(asm.insert(frag(5, 0, 2, b"new")).is_none());
        let frame = asm.insert(frag(5, 1, 2, b"-tail")).unwrap();
        assert_eq!(&frame[..], b"new-tail");
    }

    #[test]
    fn clear_drops_everything() {
        let mut asm = FragmentAssembler::new();
        asm.insert(frag(1, 0, 2, b"a"));
        asm.insert(frag(2, 0, 2, b"b"));
        asm.clear();
        assert_eq!(asm.pending_count(), 0);
    }
}
