//! Per-flow stream reassembly.
//!
//! Payload chunks of one half-connection are appended to a [`FlowBuffer`],
//! which cuts complete frames off its head.
//!
//! ## Resynchronization
//!
//! A declared length of zero (or one too small to hold the header) means the
//! read position is no longer on a frame boundary. The buffer is searched for
//! the earliest occurrence of any opcode in the resync set; the frame is
//! assumed to start one length field before it. If nothing matches, the
//! whole buffer is dropped and reading resumes with the next chunk.

mod frame;

use bytes::{Buf, BytesMut};
use tracing::{debug, trace, warn};

pub use frame::{Frame, Opcode, OpcodePrefix, HEADER_LEN, LENGTH_FIELD_LEN};

/// Counters kept by a [`FlowBuffer`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    /// Frames handed out
    pub frames: u64,
    /// Successful relocations after a corrupt header
    pub resyncs: u64,
    /// Corrupt headers with no opcode to relocate to
    pub resync_failures: u64,
    /// Bytes discarded by resynchronization
    pub bytes_dropped: u64,
}

/// Byte accumulator for one logical half-connection
#[derive(Debug, Clone)]
pub struct FlowBuffer {
    buffer: BytesMut,
    resync_codes: Vec<Opcode>,
    stats: FramerStats,
}

impl Default for FlowBuffer {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FlowBuffer {
    /// Creates an empty buffer that resynchronizes on `resync_codes`
    pub fn new(resync_codes: impl IntoIterator<Item = Opcode>) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            resync_codes: resync_codes.into_iter().collect(),
            stats: FramerStats::default(),
        }
    }

    /// Appends a payload chunk to the tail
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Cuts the next complete frame off the head.
    ///
    /// Returns `None` when more input is needed.
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            if self.buffer.len() < LENGTH_FIELD_LEN {
                return None;
            }

            let declared = usize::from(u16::from_le_bytes([self.buffer[0], self.buffer[1]]));
            if declared < HEADER_LEN {
                // Judge the header once the opcode slot is buffered too
                if self.buffer.len() < HEADER_LEN {
                    return None;
                }
                if !self.resync() {
                    return None;
                }
                continue;
            }

            if self.buffer.len() < declared {
                trace!(
                    "Waiting for {} more bytes of a {} byte frame",
                    declared - self.buffer.len(),
                    declared
                );
                return None;
            }

            let frame = Frame::from_checked(self.buffer.split_to(declared).freeze());
            self.stats.frames += 1;
            return Some(frame);
        }
    }

    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Counters since creation
    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    /// Relocates the head after a corrupt header. Returns false if the
    /// buffer had to be dropped.
    fn resync(&mut self) -> bool {
        match self.find_frame_start() {
            Some(start) => {
                debug!("Corrupt header, skipping {} bytes to the next known opcode", start);
                self.buffer.advance(start);
                self.stats.resyncs += 1;
                self.stats.bytes_dropped += start as u64;
                true
            }
            None => {
                let dropped = self.buffer.len();
                warn!(
                    "Corrupt header and no known opcode in buffer, dropping {} bytes (head: {})",
                    dropped,
                    hex::encode(&self.buffer[..HEADER_LEN.min(dropped)])
                );
                self.buffer.clear();
                self.stats.resync_failures += 1;
                self.stats.bytes_dropped += dropped as u64;
                false
            }
        }
    }

    /// Earliest frame start implied by a resync opcode.
    ///
    /// The search begins at index `HEADER_LEN - LENGTH_FIELD_LEN`, so a match
    /// always moves the head forward.
    fn find_frame_start(&self) -> Option<usize> {
        let from = HEADER_LEN - LENGTH_FIELD_LEN;
        if self.buffer.len() <= from {
            return None;
        }

        self.resync_codes
            .iter()
            .filter_map(|code| find_subsequence(&self.buffer[from..], code.as_bytes()))
            .min()
            .map(|pos| pos + from - LENGTH_FIELD_LEN)
    }
}

/// Find a subsequence within a byte slice
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIFT_BATCH: Opcode = Opcode::new([0x37, 0x0b, 0x00]);

    fn frame_bytes(opcode: Opcode, payload: &[u8]) -> Vec<u8> {
        Frame::encode(opcode, payload).unwrap().as_bytes().to_vec()
    }

    #[test]
    fn test_find_subsequence() {
        let data = [0x01, 0x02, 0x37, 0x0b, 0x00, 0x37];
        assert_eq!(find_subsequence(&data, GIFT_BATCH.as_bytes()), Some(2));
        assert_eq!(find_subsequence(&data, &[0x0b, 0x37]), None);
    }

    #[test]
    fn test_need_more_data() {
        let mut buffer = FlowBuffer::default();
        assert!(buffer.next_frame().is_none());

        let bytes = frame_bytes(GIFT_BATCH, &[1, 2, 3, 4]);
        buffer.feed(&bytes[..1]);
        assert!(buffer.next_frame().is_none());
        buffer.feed(&bytes[1..6]);
        assert!(buffer.next_frame().is_none());
        buffer.feed(&bytes[6..]);
        let frame = buffer.next_frame().unwrap();
        assert_eq!(frame.as_bytes(), bytes.as_slice());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_trailing_bytes_stay_buffered() {
        let mut buffer = FlowBuffer::default();
        let mut bytes = frame_bytes(GIFT_BATCH, &[9; 10]);
        bytes.extend_from_slice(&[0x40, 0x00, 0x37]);
        buffer.feed(&bytes);

        let frame = buffer.next_frame().unwrap();
        assert_eq!(frame.len(), 15);
        assert_eq!(buffer.len(), 3);
        assert!(buffer.next_frame().is_none());
        assert_eq!(buffer.stats().frames, 1);
    }

    #[test]
    fn test_zero_header_resyncs_to_known_opcode() {
        let mut buffer = FlowBuffer::new([GIFT_BATCH]);
        let good = frame_bytes(GIFT_BATCH, &[7; 6]);
        let mut data = vec![0x00, 0x00, 0xde, 0xad, 0xbe, 0xef];
        data.extend_from_slice(&good);
        buffer.feed(&data);

        let frame = buffer.next_frame().unwrap();
        assert_eq!(frame.as_bytes(), good.as_slice());
        let stats = buffer.stats();
        assert_eq!(stats.resyncs, 1);
        assert_eq!(stats.bytes_dropped, 6);
    }

    #[test]
    fn test_zero_header_without_opcode_drops_buffer() {
        let mut buffer = FlowBuffer::new([GIFT_BATCH]);
        buffer.feed(&[0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05]);
        assert!(buffer.next_frame().is_none());
        assert!(buffer.is_empty());
        assert_eq!(buffer.stats().resync_failures, 1);
        assert_eq!(buffer.stats().bytes_dropped, 7);

        // the next chunk is read normally
        let good = frame_bytes(GIFT_BATCH, &[]);
        buffer.feed(&good);
        assert_eq!(buffer.next_frame().unwrap().as_bytes(), good.as_slice());
    }

    #[test]
    fn test_resync_always_advances() {
        // the opcode sits right where a real header would put it, but the
        // declared length is zero; the search must skip it
        let mut buffer = FlowBuffer::new([GIFT_BATCH]);
        buffer.feed(&[0x00, 0x00, 0x37, 0x0b, 0x00]);
        assert!(buffer.next_frame().is_none());
        assert!(buffer.is_empty());
    }
}
