//! One half-connection from raw chunks to decoded records.

use super::{Dispatch, Dispatcher, Interest};
use crate::decode::{DecodeContext, ValidationMode};
use crate::error::Result;
use crate::stream::{FlowBuffer, FramerStats, Opcode};
use tracing::{debug, trace};

/// Configuration for a [`Flow`]
#[derive(Debug, Clone, Default)]
pub struct DecoderConfig {
    /// Opcodes to decode
    pub interest: Interest,
    /// Opcodes to relocate to after a corrupt header
    /// (`None` = the exact opcodes of `interest`)
    pub resync_codes: Option<Vec<Opcode>>,
    /// Frames shorter than this are skipped without decoding
    pub min_frame_len: usize,
    /// Enforcement of soft checks
    pub mode: ValidationMode,
}

impl DecoderConfig {
    /// Creates a config that decodes every known opcode
    pub fn new() -> Self {
        Self {
            interest: Interest::all_known(),
            ..Self::default()
        }
    }

    /// Sets the opcodes to decode
    pub fn interest(mut self, interest: Interest) -> Self {
        self.interest = interest;
        self
    }

    /// Sets the resync opcodes explicitly
    pub fn resync_codes(mut self, codes: impl IntoIterator<Item = Opcode>) -> Self {
        self.resync_codes = Some(codes.into_iter().collect());
        self
    }

    /// Sets the minimum frame length
    pub fn min_frame_len(mut self, len: usize) -> Self {
        self.min_frame_len = len;
        self
    }

    /// Sets the validation mode
    pub fn mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    /// The resync set that will be used
    pub fn effective_resync_codes(&self) -> Vec<Opcode> {
        self.resync_codes
            .clone()
            .unwrap_or_else(|| self.interest.exact_codes())
    }
}

/// Counters kept by a [`Flow`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowStats {
    /// Frames that decoded successfully
    pub decoded: u64,
    /// Frames whose decoder failed
    pub failed: u64,
    /// Frames of interest without a decoder
    pub unhandled: u64,
    /// Frames outside the interest set
    pub filtered: u64,
    /// Frames below the minimum length
    pub skipped: u64,
    /// Records produced
    pub records: u64,
    /// Framing counters
    pub framer: FramerStats,
}

/// Result of one complete frame, handed to the sink
#[derive(Debug)]
pub struct FrameOutcome {
    /// Opcode of the frame
    pub opcode: Opcode,
    /// Capture time of the chunk that completed it
    pub timestamp: u64,
    /// What the dispatcher made of it
    pub result: Result<Dispatch>,
}

/// Framer and dispatcher for one logical half-connection
#[derive(Debug, Clone)]
pub struct Flow {
    buffer: FlowBuffer,
    dispatcher: Dispatcher,
    min_frame_len: usize,
    mode: ValidationMode,
    stats: FlowStats,
}

impl Default for Flow {
    fn default() -> Self {
        Self::new(DecoderConfig::new())
    }
}

impl Flow {
    /// Creates a flow from a config
    pub fn new(config: DecoderConfig) -> Self {
        let buffer = FlowBuffer::new(config.effective_resync_codes());
        Self {
            buffer,
            dispatcher: Dispatcher::new(config.interest),
            min_frame_len: config.min_frame_len,
            mode: config.mode,
            stats: FlowStats::default(),
        }
    }

    /// Appends a chunk and hands every frame it completes to `sink`.
    ///
    /// A failing frame is reported through the sink and does not stop the
    /// frames after it.
    pub fn feed(&mut self, chunk: &[u8], timestamp: u64, mut sink: impl FnMut(FrameOutcome)) {
        self.buffer.feed(chunk);
        let ctx = DecodeContext::new(timestamp, self.mode);

        while let Some(frame) = self.buffer.next_frame() {
            let opcode = frame.opcode();
            if frame.len() < self.min_frame_len {
                trace!("Skipping short frame {} ({} bytes)", opcode, frame.len());
                self.stats.skipped += 1;
                continue;
            }

            let result = self.dispatcher.dispatch(&frame, &ctx);
            match &result {
                Ok(Dispatch::Records(records)) => {
                    self.stats.decoded += 1;
                    self.stats.records += records.len() as u64;
                }
                Ok(Dispatch::Unhandled(_)) => self.stats.unhandled += 1,
                Ok(Dispatch::Filtered(_)) => {
                    self.stats.filtered += 1;
                    continue;
                }
                Err(err) => {
                    debug!("Failed to decode {}: {}", opcode, err);
                    self.stats.failed += 1;
                }
            }
            sink(FrameOutcome {
                opcode,
                timestamp,
                result,
            });
        }
    }

    /// Bytes waiting for the rest of their frame
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Current counters
    pub fn stats(&self) -> FlowStats {
        FlowStats {
            framer: self.buffer.stats(),
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{CHAT, SINGLE_GIFT, SKILL_ACTIVATED};
    use crate::model::Record;
    use crate::stream::Frame;

    fn skill_frame(code: u8) -> Frame {
        let mut payload = [0u8; 16];
        payload[0] = code;
        Frame::encode(SKILL_ACTIVATED, &payload).unwrap()
    }

    #[test]
    fn test_feed_delivers_each_frame() {
        let mut flow = Flow::default();
        let mut bytes = skill_frame(1).as_bytes().to_vec();
        bytes.extend_from_slice(skill_frame(2).as_bytes());

        let mut outcomes = Vec::new();
        flow.feed(&bytes[..30], 10, |o| outcomes.push(o));
        assert_eq!(outcomes.len(), 1);
        assert_eq!(flow.pending(), 9);

        flow.feed(&bytes[30..], 11, |o| outcomes.push(o));
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[1].timestamp, 11);
        let Ok(Dispatch::Records(records)) = &outcomes[1].result else {
            panic!("expected records");
        };
        assert!(matches!(&records[..], [Record::SkillActivated(s)] if s.skill_code.0[0] == 2));
        assert_eq!(flow.stats().decoded, 2);
        assert_eq!(flow.stats().framer.frames, 2);
    }

    #[test]
    fn test_failure_does_not_stop_later_frames() {
        let mut flow = Flow::default();
        let bad = Frame::encode(SINGLE_GIFT, &[0; 3]).unwrap();
        let mut bytes = bad.as_bytes().to_vec();
        bytes.extend_from_slice(skill_frame(1).as_bytes());

        let mut outcomes = Vec::new();
        flow.feed(&bytes, 0, |o| outcomes.push(o));
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].result.is_err());
        assert!(outcomes[1].result.is_ok());
        assert_eq!(flow.stats().failed, 1);
        assert_eq!(flow.stats().decoded, 1);
    }

    #[test]
    fn test_filtered_and_short_frames_are_counted_not_delivered() {
        let config = DecoderConfig::new()
            .interest(Interest::new().code(CHAT))
            .min_frame_len(10);
        let mut flow = Flow::new(config);
        let mut bytes = skill_frame(1).as_bytes().to_vec();
        bytes.extend_from_slice(Frame::encode(CHAT, &[]).unwrap().as_bytes());

        let mut delivered = 0;
        flow.feed(&bytes, 0, |_| delivered += 1);
        assert_eq!(delivered, 0);
        assert_eq!(flow.stats().filtered, 1);
        assert_eq!(flow.stats().skipped, 1);
    }

    #[test]
    fn test_resync_codes_default_to_interest() {
        let config = DecoderConfig::new().interest(Interest::new().code(CHAT).code(SINGLE_GIFT));
        assert_eq!(config.effective_resync_codes(), vec![SINGLE_GIFT, CHAT]);

        let config = config.resync_codes([SKILL_ACTIVATED]);
        assert_eq!(config.effective_resync_codes(), vec![SKILL_ACTIVATED]);
    }
}
