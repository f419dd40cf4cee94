//! Gift list decoders.
//!
//! A gift entry is 33 bytes:
//!
//! ```text
//! 0   u32   sort index
//! 4   u8    unconfirmed, always 1 so far
//! 5   u64   time received
//! 13  [2]   gift id
//! 15  [2]   item id
//! 17  u8    item count
//! 18  u8    unconfirmed, always 0 so far
//! 19  u8    material quality
//! 20  [13]  player name
//! ```

use super::{advise_in, expect_len, DecodeContext};
use crate::codec::FieldReader;
use crate::error::Result;
use crate::model::{Gift, GiftPopup, RawId, Record};
use crate::stream::{Frame, HEADER_LEN};
use tracing::debug;

/// Size of one gift entry
const GIFT_ENTRY_LEN: usize = 33;

const GIFT_BATCH_BASE: usize = HEADER_LEN + 10;

fn read_gift(reader: &FieldReader<'_>, at: usize, opened_at: u64) -> Result<Gift> {
    advise_in("gift marker", at + 4, &reader.u8(at + 4)?, &[1]);
    advise_in("gift padding", at + 18, &reader.u8(at + 18)?, &[0]);

    Ok(Gift {
        sort_index: reader.u32(at)?,
        time: reader.u64(at + 5)?,
        gift_id: RawId(reader.raw(at + 13)?),
        item_id: RawId(reader.raw(at + 15)?),
        number_of_item: reader.u8(at + 17)?,
        material_quality: reader.u8(at + 19)?,
        player: reader.text("player", at + 20, 13)?,
        opened_at,
    })
}

/// `310b00`: a single gift opened
pub fn decode_single_gift(frame: &Frame, ctx: &DecodeContext) -> Result<Vec<Record>> {
    expect_len(frame, 46)?;
    let reader = FieldReader::new(frame.payload());
    Ok(vec![read_gift(&reader, 0, ctx.timestamp)?.into()])
}

/// `370b00`: several gifts opened at once
pub fn decode_gift_batch(frame: &Frame, ctx: &DecodeContext) -> Result<Vec<Record>> {
    let reader = FieldReader::new(frame.payload());
    let count = usize::from(reader.u8(9)?);
    expect_len(frame, GIFT_BATCH_BASE + GIFT_ENTRY_LEN * count)?;

    let gifts = (0..count)
        .map(|i| read_gift(&reader, 10 + i * GIFT_ENTRY_LEN, ctx.timestamp).map(Record::from))
        .collect::<Result<Vec<_>>>()?;
    debug!("Decoded {} gifts", gifts.len());
    Ok(gifts)
}

/// `2b0b12`: popup when a gift arrives
pub fn decode_gift_popup(frame: &Frame, ctx: &DecodeContext) -> Result<Vec<Record>> {
    expect_len(frame, 22)?;
    let reader = FieldReader::new(frame.payload());

    Ok(vec![GiftPopup {
        counter: u64::from(reader.u16(0)?),
        gift_id: RawId(reader.raw(2)?),
        player: reader.text("player", 4, 13)?,
        unixtime: ctx.timestamp,
        counter2: None,
    }
    .into()])
}

/// `2b0b13`: a gift inserted into the gift table
pub fn decode_gift_table_insert(frame: &Frame, _ctx: &DecodeContext) -> Result<Vec<Record>> {
    expect_len(frame, 42)?;
    let reader = FieldReader::new(frame.payload());
    advise_in("gift table padding", 15, &reader.uint(15, 5)?, &[0]);

    Ok(vec![GiftPopup {
        counter: reader.uint(0, 5)?,
        gift_id: RawId(reader.raw(13)?),
        player: reader.text("player", 20, 13)?,
        unixtime: reader.u64(5)?,
        counter2: Some(reader.u32(33)?),
    }
    .into()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::testutil::PayloadBuilder;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    fn gift_entry(sort_index: u32, player: &str) -> Vec<u8> {
        PayloadBuilder::new(GIFT_ENTRY_LEN)
            .put(0, &sort_index.to_le_bytes())
            .put(4, &[1])
            .put(5, &1_650_000_000u64.to_le_bytes())
            .put(13, &[0xa1, 0x0b])
            .put(15, &[0x3c, 0x0c])
            .put(17, &[3])
            .put(19, &[2])
            .text(20, player)
            .into_bytes()
    }

    #[test]
    fn test_gift_batch_yields_one_gift_per_entry() {
        let mut payload = PayloadBuilder::new(10).put(9, &[2]).into_bytes();
        payload.extend(gift_entry(7, "Alice"));
        payload.extend(gift_entry(8, "Bob Smith"));
        let frame = PayloadBuilder::new(payload.len()).put(0, &payload).frame("370b00");
        assert_eq!(frame.declared_len(), 15 + 33 * 2);

        let records = decode_gift_batch(&frame, &DecodeContext::new(42, Default::default())).unwrap();
        assert_eq!(records.len(), 2);
        let Record::Gift(second) = &records[1] else {
            panic!("expected a gift");
        };
        assert_eq!(second.sort_index, 8);
        assert_eq!(second.player, "Bob Smith");
        assert_eq!(second.gift_id.to_hex(), "a10b");
        assert_eq!(second.item_id.to_hex(), "3c0c");
        assert_eq!(second.number_of_item, 3);
        assert_eq!(second.material_quality, 2);
        assert_eq!(second.time, 1_650_000_000);
        assert_eq!(second.opened_at, 42);
    }

    #[test]
    fn test_gift_batch_length_must_match_count() {
        let mut payload = PayloadBuilder::new(10).put(9, &[3]).into_bytes();
        payload.extend(gift_entry(1, "Alice"));
        let frame = PayloadBuilder::new(payload.len()).put(0, &payload).frame("370b00");

        let err = decode_gift_batch(&frame, &DecodeContext::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 114,
                actual: 48,
                ..
            }
        ));
    }

    #[test]
    fn test_single_gift() {
        let mut payload = gift_entry(5, "Carol");
        payload.extend([0u8; 8]);
        let frame = PayloadBuilder::new(payload.len()).put(0, &payload).frame("310b00");

        let records = decode_single_gift(&frame, &DecodeContext::default()).unwrap();
        assert!(matches!(&records[..], [Record::Gift(g)] if g.player == "Carol"));
    }

    #[test]
    fn test_gift_popup_uses_capture_time() {
        let frame = PayloadBuilder::new(17)
            .put(0, &[0x05, 0x00])
            .put(2, &[0xa1, 0x0b])
            .text(4, "Dave")
            .frame("2b0b12");

        let records = decode_gift_popup(&frame, &DecodeContext::new(1_700_000_000, Default::default())).unwrap();
        let Record::GiftPopup(popup) = &records[0] else {
            panic!("expected a popup");
        };
        assert_eq!(popup.counter, 5);
        assert_eq!(popup.unixtime, 1_700_000_000);
        assert_eq!(popup.counter2, None);
    }

    #[test]
    fn test_gift_table_insert() {
        let frame = PayloadBuilder::new(37)
            .put(0, &[0x86, 0x05, 0x00, 0x00, 0x00])
            .put(5, &1_646_792_894u64.to_le_bytes())
            .put(13, &[0xe3, 0x07])
            .text(20, "NEO ZEON")
            .put(33, &[0x20, 0x75, 0x00, 0x00])
            .frame("2b0b13");

        let records = decode_gift_table_insert(&frame, &DecodeContext::default()).unwrap();
        let Record::GiftPopup(popup) = &records[0] else {
            panic!("expected a popup");
        };
        assert_eq!(popup.counter, 0x0586);
        assert_eq!(popup.unixtime, 1_646_792_894);
        assert_eq!(popup.player, "NEO ZEON");
        assert_eq!(popup.counter2, Some(0x7520));
    }
}
