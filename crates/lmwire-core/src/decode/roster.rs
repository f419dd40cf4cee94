//! Guild roster and castle details.

use super::{expect_len, DecodeContext};
use crate::codec::FieldReader;
use crate::error::Result;
use crate::model::{Castle, Player, RawId, Record};
use crate::stream::{Frame, HEADER_LEN};

/// Size of one roster entry
const PLAYER_ENTRY_LEN: usize = 48;

fn read_player(reader: &FieldReader<'_>, at: usize) -> Result<Player> {
    Ok(Player {
        iggid: reader.u64(at)?,
        avatar_id: reader.u16(at + 8)?,
        name: reader.text("name", at + 10, 13)?,
        guild_rank: reader.u8(at + 23)?,
        might: reader.u64(at + 24)?,
        kills: reader.u64(at + 32)?,
        lastseen: reader.u64(at + 40)?,
    })
}

/// `060b00`: might ranking of the own guild.
///
/// The same player shows up in every roster frame; de-duplication is left
/// to the caller.
pub fn decode_guild_roster(frame: &Frame, _ctx: &DecodeContext) -> Result<Vec<Record>> {
    let reader = FieldReader::new(frame.payload());
    let count = usize::from(reader.u8(1)?);
    expect_len(frame, HEADER_LEN + 2 + PLAYER_ENTRY_LEN * count)?;

    (0..count)
        .map(|i| read_player(&reader, 2 + i * PLAYER_ENTRY_LEN).map(Record::from))
        .collect()
}

/// `ac080c`: details of a tapped castle
pub fn decode_castle(frame: &Frame, _ctx: &DecodeContext) -> Result<Vec<Record>> {
    expect_len(frame, 62)?;
    let reader = FieldReader::new(frame.payload());

    Ok(vec![Castle {
        tile_id: reader.u64(0)?,
        unknown_flag: reader.u8(8)?,
        guid: RawId(reader.raw(9)?),
        long_guild_name: reader.text("long_guild_name", 13, 20)?,
        vip_level: reader.u8(33)?,
        guild_rank: reader.u8(34)?,
        unknown: reader.uint(35, 6)?,
        might: reader.u64(41)?,
        troops_killed: reader.u64(49)?,
    }
    .into()])
}
