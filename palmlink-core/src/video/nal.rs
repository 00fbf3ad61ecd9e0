//! Annex-B NAL unit parsing.
//!
//! An H.264 byte stream delimits NAL units with 3- or 4-byte start
//! codes (`00 00 01` / `00 00 00 01`). The unit type lives in the low
//! 5 bits of the first byte after the start code.

use bytes::Bytes;

// ── NalUnitType ──────────────────────────────────────────────────

/// Classification of a NAL unit, as far as this pipeline cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NalUnitType {
    /// Sequence Parameter Set (type 7).
    Sps,
    /// Picture Parameter Set (type 8).
    Pps,
    /// Instantaneous Decoder Refresh slice — a keyframe (type 5).
    Idr,
    /// Non-IDR slice (type 1).
    NonIdr,
    /// Any other unit type, carried but not interpreted.
    Other(u8),
}

impl NalUnitType {
    /// Extract the type from a NAL header byte (low 5 bits).
    pub fn from_header(header: u8) -> Self {
        match header & 0x1F {
            1 => NalUnitType::NonIdr,
            5 => NalUnitType::Idr,
            7 => NalUnitType::Sps,
            8 => NalUnitType::Pps,
            t => NalUnitType::Other(t),
        }
    }

    /// Whether this unit carries picture data to submit for decode.
    pub fn is_slice(&self) -> bool {
        matches!(self, NalUnitType::Idr | NalUnitType::NonIdr)
    }
}

// ── NalUnit ──────────────────────────────────────────────────────

/// One NAL unit with its start code stripped.
///
/// `data` begins at the NAL header byte and is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NalUnit {
    pub unit_type: NalUnitType,
    pub data: Bytes,
}

/// Split an Annex-B byte stream into NAL units.
///
/// Bytes before the first start code are ignored (mid-stream joins are
/// routine on a lossy channel). Empty units are skipped.
pub fn split_annex_b(stream: &Bytes) -> Vec<NalUnit> {
    let data = stream.as_ref();
    let mut payload_starts: Vec<usize> = Vec::new();

    let mut i = 0;
    while i + 3 <= data.len() {
        if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
            payload_starts.push(i + 3);
            i += 3;
        } else {
            i += 1;
        }
    }

    let mut units = Vec::with_capacity(payload_starts.len());
    for (k, &start) in payload_starts.iter().enumerate() {
        // The unit ends where the next start code begins; trailing
        // zeros belong to a 4-byte start code, not to this unit.
        let mut end = match payload_starts.get(k + 1) {
            Some(&next) => next - 3,
            None => data.len(),
        };
        while end > start && data[end - 1] == 0 {
            end -= 1;
        }
        if end <= start {
            continue;
        }
        units.push(NalUnit {
            unit_type: NalUnitType::from_header(data[start]),
            data: stream.slice(start..end),
        });
    }
    units
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(parts: &[&[u8]]) -> Bytes {
        let mut v = Vec::new();
        for p in parts {
            v.extend_from_slice(p);
        }
        Bytes::from(v)
    }

    #[test]
    fn type_extraction_masks_low_bits() {
        assert_eq!(NalUnitType::from_header(0x67), NalUnitType::Sps);
        assert_eq!(NalUnitType::from_header(0x68), NalUnitType::Pps);
        assert_eq!(NalUnitType::from_header(0x65), NalUnitType::Idr);
        assert_eq!(NalUnitType::from_header(0x41), NalUnitType::NonIdr);
        assert_eq!(NalUnitType::from_header(0x06), NalUnitType::Other(6));
    }

    #[test]
    fn splits_three_byte_start_codes() {
        let s = stream(&[&[0, 0, 1, 0x67, 0xAA], &[0, 0, 1, 0x68, 0xBB]]);
        let units = split_annex_b(&s);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].unit_type, NalUnitType::Sps);
        assert_eq!(&units[0].data[..], &[0x67, 0xAA]);
        assert_eq!(units[1].unit_type, NalUnitType::Pps);
        assert_eq!(&units[1].data[..], &[0x68, 0xBB]);
    }

    #[test]
    fn splits_four_byte_start_codes() {
        let s = stream(&[&[0, 0, 0, 1, 0x67, 0x01], &[0, 0, 0, 1, 0x65, 0x02, 0x03]]);
        let units = split_annex_b(&s);
        assert_eq!(units.len(), 2);
        // the leading zero of the second start code is not part of unit 0
        assert_eq!(&units[0].data[..], &[0x67, 0x01]);
        assert_eq!(units[1].unit_type, NalUnitType::Idr);
        assert_eq!(&units[1].data[..], &[0x65, 0x02, 0x03]);
    }

    #[test]
    fn mixed_start_code_lengths() {
        let s = stream(&[&[0, 0, 0, 1, 0x67, 0x01], &[0, 0, 1, 0x68, 0x02]]);
        let units = split_annex_b(&s);
        assert_eq!(units.len(), 2);
        assert_eq!(&units[0].data[..], &[0x67, 0x01]);
        assert_eq!(&units[1].data[..], &[0x68, 0x02]);
    }

    #[test]
    fn leading_garbage_ignored() {
        let s = stream(&[&[0xDE, 0xAD], &[0, 0, 1, 0x65, 0x01]]);
        let units = split_annex_b(&s);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].unit_type, NalUnitType::Idr);
    }

    #[test]
    fn no_start_code_yields_nothing() {
        assert!(split_annex_b(&Bytes::from_static(&[1, 2, 3])).is_empty());
        assert!(split_annex_b(&Bytes::new()).is_empty());
    }

    #[test]
    fn empty_unit_skipped() {
        // two adjacent start codes produce no unit for the first
        let s = stream(&[&[0, 0, 1], &[0, 0, 1, 0x65, 0x01]]);
        let units = split_annex_b(&s);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].unit_type, NalUnitType::Idr);
    }
}
