//! Property tests for the wire primitives and stream reassembly.

use lmwire_core::codec::{decode_float, decode_uint, encode_float, encode_uint, guid_to_xy, X_MAX, Y_MAX};
use lmwire_core::{Coord, FlowBuffer, Frame, Opcode};
use proptest::prelude::*;

const RESYNC: Opcode = Opcode::new([0x37, 0x0b, 0x00]);

fn frames() -> impl Strategy<Value = Vec<(u8, Vec<u8>)>> {
    prop::collection::vec((any::<u8>(), prop::collection::vec(any::<u8>(), 0..64)), 1..8)
}

fn encode_all(frames: &[(u8, Vec<u8>)]) -> Vec<Frame> {
    frames
        .iter()
        .map(|(code, payload)| Frame::encode(Opcode::new([0x31, 0x0b, *code]), payload).unwrap())
        .collect()
}

fn drain(buffer: &mut FlowBuffer) -> Vec<Vec<u8>> {
    std::iter::from_fn(|| buffer.next_frame())
        .map(|f| f.as_bytes().to_vec())
        .collect()
}

proptest! {
    #[test]
    fn uint_roundtrip(n in any::<u64>(), width in 1usize..=8) {
        let n = if width == 8 { n } else { n & ((1u64 << (width * 8)) - 1) };
        let bytes = encode_uint(n, width).unwrap();
        prop_assert_eq!(bytes.len(), width);
        prop_assert_eq!(decode_uint(&bytes).unwrap(), n);
    }

    #[test]
    fn uint_rejects_values_that_do_not_fit(width in 1usize..8, extra in 1u64..256) {
        let n = extra << (width * 8);
        prop_assert!(encode_uint(n, width).is_err());
    }

    #[test]
    fn float_roundtrip_preserves_bits(bits in any::<u32>()) {
        let f = f32::from_bits(bits);
        prop_assert_eq!(decode_float(&encode_float(f)).unwrap().to_bits(), bits);
    }

    #[test]
    fn coord_axes_are_in_range_or_invalid(b0 in any::<u8>(), b1 in any::<u8>(), b2 in any::<u8>()) {
        let (x, y) = guid_to_xy(b0, b1, b2);
        prop_assert!(y == -1 || (0..=Y_MAX).contains(&y));
        // x never exceeds 1 + 2 * 0xff
        prop_assert!((0..=X_MAX).contains(&x));

        let coord = Coord::from_guid(b0, b1, b2);
        prop_assert_eq!(coord.is_valid(), y != -1);
        prop_assert_eq!(coord.is_valid(), b1 & 0x0c == 0);
    }

    #[test]
    fn chunking_does_not_change_frames(frames in frames(), cuts in prop::collection::vec(1usize..16, 0..64)) {
        let frames = encode_all(&frames);
        let bytes: Vec<u8> = frames.iter().flat_map(|f| f.as_bytes().to_vec()).collect();

        let mut buffer = FlowBuffer::default();
        let mut rest = bytes.as_slice();
        let mut got = Vec::new();
        for cut in cuts {
            let (chunk, tail) = rest.split_at(cut.min(rest.len()));
            buffer.feed(chunk);
            got.extend(drain(&mut buffer));
            rest = tail;
        }
        buffer.feed(rest);
        got.extend(drain(&mut buffer));

        let expected: Vec<Vec<u8>> = frames.iter().map(|f| f.as_bytes().to_vec()).collect();
        prop_assert_eq!(got, expected);
        prop_assert!(buffer.is_empty());
    }

    #[test]
    fn trailing_partial_frame_is_kept(frames in frames(), keep in 1usize..5) {
        let frames = encode_all(&frames);
        let mut bytes: Vec<u8> = frames.iter().flat_map(|f| f.as_bytes().to_vec()).collect();
        let last = frames[frames.len() - 1].as_bytes();
        bytes.extend_from_slice(&last[..keep.min(last.len() - 1)]);

        let mut buffer = FlowBuffer::default();
        buffer.feed(&bytes);
        prop_assert_eq!(drain(&mut buffer).len(), frames.len());
        prop_assert_eq!(buffer.len(), keep.min(last.len() - 1));
    }

    #[test]
    fn resync_recovers_the_next_known_frame(garbage in prop::collection::vec(any::<u8>(), 0..32), payload in prop::collection::vec(any::<u8>(), 0..32)) {
        prop_assume!(!garbage.windows(2).any(|w| w == [0x37, 0x0b]));
        prop_assume!(garbage.last() != Some(&0x37));
        let good = Frame::encode(RESYNC, &payload).unwrap();
        let mut bytes = vec![0x00, 0x00];
        bytes.extend_from_slice(&garbage);
        bytes.extend_from_slice(good.as_bytes());

        let mut buffer = FlowBuffer::new([RESYNC]);
        buffer.feed(&bytes);
        let first = buffer.next_frame().unwrap();
        prop_assert_eq!(first.as_bytes(), good.as_bytes());
        prop_assert_eq!(buffer.stats().resyncs, 1);
        prop_assert_eq!(buffer.stats().bytes_dropped, 2 + garbage.len() as u64);
    }
}
