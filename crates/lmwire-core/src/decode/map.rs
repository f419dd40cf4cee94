//! World map objects.
//!
//! A map frame carries a run of 49-byte object records, but the records do
//! not always sit on the 49-byte grid. The scanner tries a record at the
//! cursor; if any check fails it slides one byte and tries again, so a stray
//! byte costs at most the record it displaced.
//!
//! Record layout (record offsets):
//!
//! ```text
//! 0  [3]  packed coordinate
//! 3  u8   variant tag
//! 4  ..   variant layout, see the readers below
//! ```
//!
//! Every check in this module is hard: a failed check is what moves the
//! scanner forward.

use super::{DecodeContext, KINGDOM_MAX};
use crate::codec::FieldReader;
use crate::error::{Error, Result};
use crate::model::{
    Camp, CastleOrDarknest, Fort, MapObject, MapPayload, MapTag, Monster, MovingUnit, Occupant,
    RawId, Record, ResourceTile,
};
use crate::stream::Frame;
use tracing::{debug, trace, warn};

/// Nominal size of one map object record
pub const MAP_OBJECT_LEN: usize = 49;

/// Extra bytes that follow every moving-unit record
const MOVING_UNIT_PADDING: usize = 3;

/// Departure times before this are not plausible
const MIN_DEPARTURE: u32 = 1_640_000_000;

const DARKNEST_NAME: &str = "Dark.nest";

/// Player names are longer than three characters and made of ASCII letters,
/// digits and spaces. Darknests carry a fixed name.
pub fn is_valid_player_name(name: &str) -> bool {
    if name.chars().count() <= 3 {
        return false;
    }
    name == DARKNEST_NAME || name.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ')
}

fn ensure(ok: bool, field: &'static str, offset: usize, details: impl FnOnce() -> String) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::unexpected(field, offset, details()))
    }
}

fn player_name(reader: &FieldReader<'_>, offset: usize) -> Result<String> {
    let name = reader.text("player", offset, 13)?;
    ensure(is_valid_player_name(&name), "player", offset, || format!("invalid name {:?}", name))?;
    Ok(name)
}

fn kingdom(reader: &FieldReader<'_>, field: &'static str, offset: usize) -> Result<u16> {
    let kingdom = reader.u16(offset)?;
    ensure(kingdom < KINGDOM_MAX, field, offset, || format!("kingdom {} out of range", kingdom))?;
    Ok(kingdom)
}

fn level(reader: &FieldReader<'_>, offset: usize, max: u8) -> Result<u8> {
    let level = reader.u8(offset)?;
    ensure((1..=max).contains(&level), "level", offset, || {
        format!("level {} outside 1..={}", level, max)
    })?;
    Ok(level)
}

fn zero(reader: &FieldReader<'_>, field: &'static str, range: std::ops::Range<usize>) -> Result<()> {
    let start = range.start;
    let bytes = reader.range(range)?;
    ensure(bytes.iter().all(|&b| b == 0), field, start, || {
        format!("expected zeros, found {}", hex::encode(bytes))
    })
}

fn read_monster(reader: &FieldReader<'_>) -> Result<Monster> {
    let monster_id: [u8; 2] = reader.raw(5)?;
    ensure(monster_id[1] == 0 && monster_id[0] != 0, "monster id", 5, || {
        hex::encode(monster_id)
    })?;
    zero(reader, "monster padding", 15..49)?;

    Ok(Monster {
        level: level(reader, 4, 5)?,
        monster_id: RawId(monster_id),
        time_remain: reader.u32(7)?,
        hp_percentage: reader.f32(11)?,
    })
}

fn read_castle(reader: &FieldReader<'_>) -> Result<CastleOrDarknest> {
    let castle = CastleOrDarknest {
        player: player_name(reader, 4)?,
        guild_tag: reader.text("guild tag", 17, 3)?,
        kingdom_player: kingdom(reader, "kingdom", 20)?,
        level: level(reader, 22, 25)?,
        status_flag: reader.u8(23)?,
        title: reader.u16(24)?,
        kingdom_guild: reader.u16(26)?,
        skin_id: RawId(reader.raw(28)?),
        skin_level: reader.u8(30)?,
    };

    // warn only once the record has passed the hard checks
    if castle.kingdom_guild >= KINGDOM_MAX {
        warn!("Castle guild kingdom out of range: {}", castle.kingdom_guild);
    }
    Ok(castle)
}

fn read_resource_tile(reader: &FieldReader<'_>, kind: u8) -> Result<ResourceTile> {
    let occupant = if reader.is_zero(4..22)? {
        None
    } else {
        Some(Occupant {
            player: player_name(reader, 4)?,
            guild_tag: reader.text("guild tag", 17, 3)?,
            kingdom: kingdom(reader, "kingdom", 20)?,
        })
    };
    zero(reader, "resource padding", 35..49)?;

    Ok(ResourceTile {
        kind,
        level: level(reader, 22, 5)?,
        occupant,
        maximum_resource: reader.u32(23)?,
        remaining_percentage: reader.f32(27)?,
        timestamp: reader.u32(31)?,
    })
}

fn read_camp(reader: &FieldReader<'_>) -> Result<Camp> {
    zero(reader, "camp padding", 33..49)?;

    Ok(Camp {
        player: player_name(reader, 4)?,
        guild_tag: reader.text("guild tag", 17, 3)?,
        kingdom_player: kingdom(reader, "kingdom", 20)?,
        level: level(reader, 22, 25)?,
        status_flag: reader.u8(23)?,
        title: reader.u16(24)?,
        kingdom_guild: kingdom(reader, "guild kingdom", 26)?,
    })
}

fn read_fort(reader: &FieldReader<'_>) -> Result<Fort> {
    Ok(Fort {
        fort_id: RawId(reader.raw(4)?),
        timestamp: reader.u32(6)?,
        player_name: player_name(reader, 20)?,
        guild_tag: reader.text("guild tag", 33, 3)?,
        kingdom_player: kingdom(reader, "kingdom", 36)?,
        kingdom_guild: kingdom(reader, "guild kingdom", 39)?,
        kingdom_fort: kingdom(reader, "fort kingdom", 41)?,
    })
}

fn read_moving_unit(reader: &FieldReader<'_>) -> Result<MovingUnit> {
    let from = reader.coord(22)?;
    let to = reader.coord(25)?;
    ensure(from.is_valid(), "departure", 22, || format!("invalid coordinate {}", from))?;
    ensure(to.is_valid(), "destination", 25, || format!("invalid coordinate {}", to))?;
    let departed_at = reader.u32(28)?;
    ensure(departed_at > MIN_DEPARTURE, "departure time", 28, || {
        format!("implausible time {}", departed_at)
    })?;
    zero(reader, "moving padding", 32..36)?;
    zero(reader, "moving padding", 38..40)?;
    zero(reader, "moving padding", 41..44)?;
    zero(reader, "moving padding", 45..48)?;

    Ok(MovingUnit {
        player: player_name(reader, 4)?,
        guild_tag: reader.text("guild tag", 17, 3)?,
        kingdom: kingdom(reader, "kingdom", 20)?,
        from,
        to,
        departed_at,
        total_secs: reader.u16(36)?,
        mode: reader.u8(48)?,
    })
}

/// Decode a single 49-byte map object record.
///
/// Only units in transit may carry an invalid tile coordinate.
pub fn decode_map_object(record: &[u8]) -> Result<MapObject> {
    if record.len() != MAP_OBJECT_LEN {
        return Err(Error::truncated(0, MAP_OBJECT_LEN, record.len()));
    }
    let reader = FieldReader::new(record);
    let coord = reader.coord(0)?;
    let tag_byte = reader.u8(3)?;
    let tag = MapTag::try_from(tag_byte).map_err(|_| Error::UnknownVariant {
        tag: tag_byte,
        offset: 3,
    })?;

    if tag != MapTag::MovingUnit {
        ensure(coord.is_valid(), "coordinate", 0, || format!("invalid coordinate {}", coord))?;
    }

    let payload = match tag {
        MapTag::Monster => MapPayload::Monster(read_monster(&reader)?),
        MapTag::CastleOrDarknest => MapPayload::CastleOrDarknest(read_castle(&reader)?),
        MapTag::ResourceTile(kind) => MapPayload::ResourceTile(read_resource_tile(&reader, kind)?),
        MapTag::Camp => MapPayload::Camp(read_camp(&reader)?),
        MapTag::Fort => MapPayload::Fort(read_fort(&reader)?),
        MapTag::MovingUnit => MapPayload::MovingUnit(read_moving_unit(&reader)?),
    };

    Ok(MapObject {
        coord,
        tag: tag_byte,
        payload,
    })
}

/// `ac08..` and `ba08..`: every map object found in the frame.
///
/// A frame without any object is not an error; some map frames carry none.
pub fn decode_map_objects(frame: &Frame, _ctx: &DecodeContext) -> Result<Vec<Record>> {
    let payload = frame.payload();
    let mut objects = Vec::new();
    let mut skipped = 0usize;
    let mut at = 0;

    while at + MAP_OBJECT_LEN <= payload.len() {
        match decode_map_object(&payload[at..at + MAP_OBJECT_LEN]) {
            Ok(object) => {
                if object.payload.tag() == MapTag::MovingUnit {
                    at += MOVING_UNIT_PADDING;
                }
                at += MAP_OBJECT_LEN;
                objects.push(Record::from(object));
            }
            Err(err) => {
                trace!("No map object at offset {}: {}", at, err);
                skipped += 1;
                at += 1;
            }
        }
    }

    if objects.is_empty() && frame.declared_len() > MAP_OBJECT_LEN {
        warn!(
            "No map object found in {} ({} bytes)",
            frame.opcode(),
            frame.declared_len()
        );
    } else {
        debug!(
            "Decoded {} map objects from {}, skipped {} bytes",
            objects.len(),
            frame.opcode(),
            skipped
        );
    }
    Ok(objects)
}
