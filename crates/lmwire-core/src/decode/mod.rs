//! Record decoders, one per opcode family.
//!
//! Every decoder takes one complete [`Frame`] and returns the records it
//! holds, or an error that invalidates only that frame. Field offsets are
//! relative to the frame payload (the bytes after the opcode).
//!
//! Regions whose meaning is unconfirmed are still checked, so protocol drift
//! surfaces as a loud failure instead of a silent misparse. Checks come in
//! three strengths:
//!
//! - hard: lengths, identifiers, names and variant tags. Always fatal.
//! - soft: regions expected to be zero. Fatal in [`ValidationMode::Strict`],
//!   a warning in [`ValidationMode::Lenient`].
//! - advisory: observed-value allowlists. Only ever a warning.

mod chat;
mod gift;
mod guild;
mod map;
mod report;
mod roster;

use crate::codec::FieldReader;
use crate::error::{Error, Result};
use crate::model::Record;
use crate::stream::Frame;
use std::fmt::Debug;
use std::ops::Range;
use tracing::warn;

pub use chat::decode_chat;
pub use gift::{decode_gift_batch, decode_gift_popup, decode_gift_table_insert, decode_single_gift};
pub use guild::{decode_inner_guild_board, decode_outer_guild_board};
pub use map::{decode_map_object, decode_map_objects, is_valid_player_name, MAP_OBJECT_LEN};
pub use report::{decode_chest_results, decode_hunt_report, decode_skill_activated};
pub use roster::{decode_castle, decode_guild_roster};

/// Signature shared by all record decoders
pub type DecodeFn = fn(&Frame, &DecodeContext) -> Result<Vec<Record>>;

/// Kingdom numbers at or above this are implausible
pub const KINGDOM_MAX: u16 = 1200;

/// How soft checks are enforced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// A failed soft check rejects the frame
    #[default]
    Strict,
    /// A failed soft check is logged and decoding continues
    Lenient,
}

/// Per-frame decoding inputs besides the frame itself
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeContext {
    /// Capture time of the chunk that completed the frame, in seconds
    pub timestamp: u64,
    /// Enforcement of soft checks
    pub mode: ValidationMode,
}

impl DecodeContext {
    /// Creates a context
    pub fn new(timestamp: u64, mode: ValidationMode) -> Self {
        Self { timestamp, mode }
    }

    /// Applies a soft check
    pub(crate) fn soft(&self, ok: bool, err: impl FnOnce() -> Error) -> Result<()> {
        if ok {
            return Ok(());
        }
        let err = err();
        match self.mode {
            ValidationMode::Strict => Err(err),
            ValidationMode::Lenient => {
                warn!("Ignoring soft check: {}", err);
                Ok(())
            }
        }
    }

    /// Soft check that a region is all zero
    pub(crate) fn soft_zero(
        &self,
        reader: &FieldReader<'_>,
        field: &'static str,
        range: Range<usize>,
    ) -> Result<()> {
        let start = range.start;
        let bytes = reader.range(range)?;
        self.soft(bytes.iter().all(|&b| b == 0), || {
            Error::unexpected(field, start, format!("expected zeros, found {}", hex::encode(bytes)))
        })
    }
}

/// Hard check of the declared frame length
pub(crate) fn expect_len(frame: &Frame, expected: usize) -> Result<()> {
    if frame.declared_len() != expected {
        return Err(Error::length_mismatch(frame.opcode(), expected, frame.declared_len()));
    }
    Ok(())
}

/// Hard check that a value is one of `allowed`
pub(crate) fn expect_in<T: PartialEq + Debug>(
    field: &'static str,
    offset: usize,
    value: T,
    allowed: &[T],
) -> Result<T> {
    if allowed.contains(&value) {
        Ok(value)
    } else {
        Err(Error::unexpected(field, offset, format!("{:?} not in {:?}", value, allowed)))
    }
}

/// Advisory check that a value is one of `allowed`
pub(crate) fn advise_in<T: PartialEq + Debug>(field: &'static str, offset: usize, value: &T, allowed: &[T]) {
    if !allowed.contains(value) {
        warn!("Unexpected {} at offset {}: {:?}", field, offset, value);
    }
}

/// Advisory check that a region equals `expected`
pub(crate) fn advise_bytes(
    reader: &FieldReader<'_>,
    field: &'static str,
    range: Range<usize>,
    expected: &[&[u8]],
) -> Result<()> {
    let start = range.start;
    let bytes = reader.range(range)?;
    if !expected.contains(&bytes) {
        warn!("Unexpected {} at offset {}: {}", field, start, hex::encode(bytes));
    }
    Ok(())
}

/// Advisory check that a region is all zero
pub(crate) fn advise_zero(reader: &FieldReader<'_>, field: &'static str, range: Range<usize>) -> Result<()> {
    let start = range.start;
    let bytes = reader.range(range)?;
    if bytes.iter().any(|&b| b != 0) {
        warn!("Unexpected {} at offset {}: {}", field, start, hex::encode(bytes));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Payload builders shared by the decoder tests.

    use crate::stream::{Frame, Opcode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Runs `f` and counts the warnings it logs on this thread
    pub(crate) fn count_warnings<T>(f: impl FnOnce() -> T) -> (T, usize) {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&count)));
        let result = tracing::subscriber::with_default(subscriber, f);
        (result, count.load(Ordering::SeqCst))
    }

    /// Zeroed payload with helpers to place fields
    pub(crate) struct PayloadBuilder {
        bytes: Vec<u8>,
    }

    impl PayloadBuilder {
        pub(crate) fn new(len: usize) -> Self {
            Self { bytes: vec![0; len] }
        }

        pub(crate) fn put(mut self, offset: usize, data: &[u8]) -> Self {
            self.bytes[offset..offset + data.len()].copy_from_slice(data);
            self
        }

        pub(crate) fn text(self, offset: usize, text: &str) -> Self {
            self.put(offset, text.as_bytes())
        }

        pub(crate) fn frame(self, opcode: &str) -> Frame {
            let opcode: Opcode = opcode.parse().unwrap();
            Frame::encode(opcode, &self.bytes).unwrap()
        }

        pub(crate) fn into_bytes(self) -> Vec<u8> {
            self.bytes
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_check_follows_mode() {
        let data = [0u8, 1, 0];
        let reader = FieldReader::new(&data);

        let strict = DecodeContext::new(0, ValidationMode::Strict);
        assert!(strict.soft_zero(&reader, "pad", 0..1).is_ok());
        assert!(strict.soft_zero(&reader, "pad", 0..3).is_err());

        let lenient = DecodeContext::new(0, ValidationMode::Lenient);
        assert!(lenient.soft_zero(&reader, "pad", 0..3).is_ok());
        // a truncated region is a hard failure in every mode
        assert!(lenient.soft_zero(&reader, "pad", 0..4).is_err());
    }

    #[test]
    fn test_expect_in() {
        assert_eq!(expect_in("killed", 17, 1u8, &[0, 1]).unwrap(), 1);
        assert!(expect_in("killed", 17, 2u8, &[0, 1]).is_err());
    }
}
