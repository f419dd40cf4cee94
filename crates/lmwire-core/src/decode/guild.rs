//! Guild information pages.
//!
//! The page seen from outside a guild (`2a0b00`) and the one seen by its
//! members (`f20a..`) share most fields but not their layout.

use super::{advise_bytes, advise_in, advise_zero, expect_len, DecodeContext};
use crate::codec::{decode_text, FieldReader};
use crate::error::Result;
use crate::model::{InnerGuildBoard, OuterGuildBoard, RawId, Record};
use crate::stream::Frame;
use tracing::warn;

const OUTER_BOARD_LEN: usize = 1300;
const INNER_BOARD_LEN: usize = 900;

/// Years seen in the inner board's dated field
const BOARD_YEARS: [u16; 3] = [2018, 2019, 2020];

/// `2a0b00`: guild page seen from outside
pub fn decode_outer_guild_board(frame: &Frame, ctx: &DecodeContext) -> Result<Vec<Record>> {
    expect_len(frame, 1390)?;
    let reader = FieldReader::new(frame.payload());

    // some guild names carry bytes that are not valid UTF-8
    let raw_name = reader.bytes(21, 20)?;
    let long_guild_name = decode_text(raw_name, true).unwrap_or_else(|_| {
        warn!("Guild name is not valid UTF-8, keeping hex: {}", hex::encode(raw_name));
        hex::encode(raw_name)
    });

    ctx.soft_zero(&reader, "outer board padding", 1371..1374)?;
    ctx.soft_zero(&reader, "outer board padding", 1380..1381)?;
    let unknown2 = reader.u8(1377)?;
    advise_in("outer board flag", 1377, &unknown2, &[0, 1]);
    advise_bytes(&reader, "outer board trailer", 1384..1385, &[&[0x01]])?;

    Ok(vec![OuterGuildBoard {
        guild_id: RawId(reader.raw(0)?),
        guild_leader: reader.text("guild leader", 5, 13)?,
        guild_tag: reader.text("guild tag", 18, 3)?,
        long_guild_name,
        board: frame.payload_slice(41, OUTER_BOARD_LEN)?,
        guild_slogan: reader.text("guild slogan", 1341, 20)?,
        unknown1: RawId(reader.raw(1361)?),
        gift_level: reader.u8(1374)?,
        kingdom: reader.u16(1375)?,
        unknown2,
        guild_fest_rank: reader.u8(1378)?,
        guild_showdown_rank: reader.u8(1379)?,
        da_cups: reader.u16(1381)?,
        guild_bash_rank: reader.u8(1383)?,
    }
    .into()])
}

/// `f20a..`: guild page seen by a member.
///
/// ```text
/// 0     [4]    guild id
/// 4     [13]   leader
/// 17    [4]    unknown
/// 21    u8     unknown
/// 22    [3]    zero
/// 25    [3]    tag
/// 28    [20]   long name
/// 48    [20]   slogan
/// 68    [900]  board
/// 968   [5]    unknown
/// 973   [6]    unknown, starts with a year
/// 979   [6]    unknown
/// 985   [6]    zero
/// 991   u16    kingdom
/// 993   [8]    zero
/// 1001  [4]    unknown
/// 1005  [2]    unknown
/// 1007  [25]   zero
/// 1032  [2]    unknown
/// 1034  [3]    unknown
/// 1037  [5]    62 00 00 00 00 or zero
/// 1042  u8     guild fest rank
/// 1043  u16    showdown rank
/// 1045  u16    darknest arena cups
/// 1047  u8     guild bash rank
/// 1048  u8     unknown
/// 1049  [2]    00 01
/// ```
pub fn decode_inner_guild_board(frame: &Frame, ctx: &DecodeContext) -> Result<Vec<Record>> {
    expect_len(frame, 1056)?;
    let reader = FieldReader::new(frame.payload());

    ctx.soft_zero(&reader, "inner board padding", 22..25)?;
    ctx.soft_zero(&reader, "inner board padding", 985..991)?;
    advise_in("board year", 973, &reader.u16(973)?, &BOARD_YEARS);
    advise_zero(&reader, "inner board padding", 993..1001)?;
    advise_zero(&reader, "inner board padding", 1007..1032)?;
    advise_bytes(
        &reader,
        "inner board marker",
        1037..1042,
        &[&[0x62, 0, 0, 0, 0], &[0; 5]],
    )?;
    advise_bytes(&reader, "inner board trailer", 1049..1051, &[&[0x00, 0x01]])?;

    Ok(vec![InnerGuildBoard {
        guild_id: RawId(reader.raw(0)?),
        guild_leader: reader.text("guild leader", 4, 13)?,
        unknown1: RawId(reader.raw(17)?),
        unknown2: reader.u8(21)?,
        guild_tag: reader.text("guild tag", 25, 3)?,
        long_guild_name: reader.text("long guild name", 28, 20)?,
        guild_slogan: reader.text("guild slogan", 48, 20)?,
        board: frame.payload_slice(68, INNER_BOARD_LEN)?,
        unknown3: RawId(reader.raw(968)?),
        unknown4: RawId(reader.raw(973)?),
        unknown5: RawId(reader.raw(979)?),
        kingdom: reader.u16(991)?,
        unknown6: RawId(reader.raw(1001)?),
        unknown7: RawId(reader.raw(1005)?),
        unknown8: RawId(reader.raw(1032)?),
        unknown9: RawId(reader.raw(1034)?),
        guild_fest_rank: reader.u8(1042)?,
        guild_showdown_rank: reader.u16(1043)?,
        da_cups: reader.u16(1045)?,
        guild_bash_rank: reader.u8(1047)?,
        unknown_a: reader.u8(1048)?,
    }
    .into()])
}
