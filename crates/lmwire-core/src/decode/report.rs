//! Mail reports and consumable results.

use super::{expect_in, expect_len, DecodeContext};
use crate::codec::FieldReader;
use crate::error::{Error, Result};
use crate::model::{ChestResult, HuntReport, LmItem, RawId, Record, ResultOpenChests, SkillActivated};
use crate::stream::Frame;
use tracing::debug;

const HUNT_FIXED_LEN: usize = 142;
const HUNT_MARKER: [u8; 8] = [0x11, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00];
const REWARD_LEN: usize = 5;

const CHEST_ITEMS_AT: usize = 23;
const CHEST_ITEM_LEN: usize = 5;

/// `5e0d..`: monster hunt report.
///
/// Layout:
///
/// ```text
/// 4    u32      time
/// 8    [4]      zero
/// 12   u16      kingdom
/// 14   [3]      coordinate
/// 17   u8       killed, 0 or 1
/// 20   [2]      monster id
/// 22   u8       monster level
/// 23   u32 x4   hp start, hp remaining, hp maximum, experience
/// 39   [2] x5   hero ids
/// 69   [8] x5   hero state
/// 109  u8       hunts in a row
/// 110  u8       energy used
/// 111  u8       energy dealt
/// 133  [8]      marker 11 00 00 00 01 00 00 00
/// 141  u8       reward kinds
/// 142  [5] ..   rewards
/// ```
pub fn decode_hunt_report(frame: &Frame, ctx: &DecodeContext) -> Result<Vec<Record>> {
    let payload = frame.payload();
    if payload.len() < HUNT_FIXED_LEN {
        return Err(Error::truncated(0, HUNT_FIXED_LEN, payload.len()));
    }
    let reader = FieldReader::new(payload);

    ctx.soft_zero(&reader, "hunt padding", 8..12)?;
    let marker = reader.range(133..141)?;
    ctx.soft(marker == HUNT_MARKER, || {
        Error::unexpected("hunt marker", 133, hex::encode(marker))
    })?;
    let killed = expect_in("killed", 17, reader.u8(17)?, &[0, 1])? == 1;

    let mut hero_ids = [RawId([0; 2]); 5];
    for (i, id) in hero_ids.iter_mut().enumerate() {
        *id = RawId(reader.raw(39 + i * 2)?);
    }
    let mut hero_infos = [RawId([0; 8]); 5];
    for (i, info) in hero_infos.iter_mut().enumerate() {
        *info = RawId(reader.raw(69 + i * 8)?);
    }

    let tail = &payload[HUNT_FIXED_LEN..];
    let rewards = tail
        .chunks_exact(REWARD_LEN)
        .map(|chunk| {
            let entry = FieldReader::new(chunk);
            Ok(LmItem {
                item_id: RawId(entry.raw(0)?),
                number_of_item: entry.u16(2)?,
                material_quality: entry.u8(4)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let leftover = tail.len() % REWARD_LEN;
    if leftover != 0 {
        debug!("Ignoring {} trailing bytes after hunt rewards", leftover);
    }

    Ok(vec![HuntReport {
        time: reader.u32(4)?,
        kingdom: reader.u16(12)?,
        coord: reader.coord(14)?,
        killed,
        monster_id: RawId(reader.raw(20)?),
        monster_lv: reader.u8(22)?,
        hp_start: reader.u32(23)?,
        hp_remain: reader.u32(27)?,
        hp_maximum: reader.u32(31)?,
        player_exp: reader.u32(35)?,
        hero_ids,
        hero_infos,
        hunt_in_a_row: reader.u8(109)?,
        energy_used: reader.u8(110)?,
        energy_dealt: reader.u8(111)?,
        num_kinds: reader.u8(141)?,
        rewards,
    }
    .into()])
}

/// `7f0500`: contents of an opened chest
pub fn decode_chest_results(frame: &Frame, _ctx: &DecodeContext) -> Result<Vec<Record>> {
    let payload = frame.payload();
    if payload.len() < CHEST_ITEMS_AT {
        return Err(Error::truncated(0, CHEST_ITEMS_AT, payload.len()));
    }
    let items_len = payload.len() - CHEST_ITEMS_AT;
    if items_len % CHEST_ITEM_LEN != 0 {
        return Err(Error::unexpected(
            "chest items",
            CHEST_ITEMS_AT,
            format!("{} bytes is not a multiple of {}", items_len, CHEST_ITEM_LEN),
        ));
    }
    let reader = FieldReader::new(payload);

    let items = (CHEST_ITEMS_AT..payload.len())
        .step_by(CHEST_ITEM_LEN)
        .map(|at| {
            Ok(ChestResult {
                item_id: RawId(reader.raw(at)?),
                number_of_items: reader.u16(at + 2)?,
                rarity: reader.u8(at + 4)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(vec![ResultOpenChests {
        chest_id: RawId(reader.raw(0)?),
        items,
    }
    .into()])
}

/// `232000`: a guild skill was activated
pub fn decode_skill_activated(frame: &Frame, ctx: &DecodeContext) -> Result<Vec<Record>> {
    expect_len(frame, 21)?;
    let reader = FieldReader::new(frame.payload());
    ctx.soft_zero(&reader, "skill padding", 8..16)?;

    Ok(vec![SkillActivated {
        skill_code: RawId(reader.raw(0)?),
        last_activated: reader.u32(4)?,
    }
    .into()])
}
