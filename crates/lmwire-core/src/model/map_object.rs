//! Map tile contents.
//!
//! Each object in a map frame starts with a packed coordinate and a one-byte
//! variant tag. The tag selects the layout of the remaining bytes.

use super::{ItemId, MonsterId, RawId};
use crate::codec::Coord;
use crate::error::{Error, Result};
use serde::Serialize;

/// Map object variant tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapTag {
    /// Marching troops, scouts and other units in transit
    MovingUnit,
    /// Resource field; the value (1..=6) is the resource kind
    ResourceTile(u8),
    /// Player castle or darknest
    CastleOrDarknest,
    /// Camp
    Camp,
    /// Wandering monster
    Monster,
    /// Fort or base
    Fort,
}

impl MapTag {
    /// The wire byte
    pub fn to_byte(self) -> u8 {
        match self {
            MapTag::MovingUnit => 0x00,
            MapTag::ResourceTile(kind) => kind,
            MapTag::CastleOrDarknest => 0x08,
            MapTag::Camp => 0x09,
            MapTag::Monster => 0x0a,
            MapTag::Fort => 0x0b,
        }
    }
}

impl TryFrom<u8> for MapTag {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(MapTag::MovingUnit),
            0x01..=0x06 => Ok(MapTag::ResourceTile(value)),
            0x08 => Ok(MapTag::CastleOrDarknest),
            0x09 => Ok(MapTag::Camp),
            0x0a => Ok(MapTag::Monster),
            0x0b => Ok(MapTag::Fort),
            _ => Err(Error::UnknownVariant {
                tag: value,
                offset: 0,
            }),
        }
    }
}

/// Wandering monster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Monster {
    /// Level, 1..=5
    pub level: u8,
    /// Monster id
    pub monster_id: MonsterId,
    /// Seconds until it despawns
    pub time_remain: u32,
    /// Remaining HP in percent
    pub hp_percentage: f32,
}

/// Player castle or darknest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CastleOrDarknest {
    /// Owner name
    pub player: String,
    /// Owner guild tag
    pub guild_tag: String,
    /// Owner kingdom
    pub kingdom_player: u16,
    /// Castle level, 1..=25
    pub level: u8,
    /// Shield and burning flags
    pub status_flag: u8,
    /// Title id
    pub title: u16,
    /// Guild kingdom
    pub kingdom_guild: u16,
    /// Castle skin
    pub skin_id: ItemId,
    /// Castle skin level
    pub skin_level: u8,
}

/// Player gathering on a tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occupant {
    /// Player name
    pub player: String,
    /// Guild tag
    pub guild_tag: String,
    /// Player kingdom
    pub kingdom: u16,
}

/// Resource field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceTile {
    /// Resource kind, 1..=6
    pub kind: u8,
    /// Tile level, 1..=5
    pub level: u8,
    /// Gathering player, if any
    pub occupant: Option<Occupant>,
    /// Resource amount when full
    pub maximum_resource: u32,
    /// Remaining share in percent
    pub remaining_percentage: f32,
    /// Unix time
    pub timestamp: u32,
}

/// Camp
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Camp {
    /// Owner name
    pub player: String,
    /// Owner guild tag
    pub guild_tag: String,
    /// Owner kingdom
    pub kingdom_player: u16,
    /// Level, 1..=25
    pub level: u8,
    /// Status flags
    pub status_flag: u8,
    /// Title id
    pub title: u16,
    /// Guild kingdom
    pub kingdom_guild: u16,
}

/// Fort or base
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fort {
    /// Fort id
    pub fort_id: RawId<2>,
    /// Unix time
    pub timestamp: u32,
    /// Holder name
    pub player_name: String,
    /// Holder guild tag
    pub guild_tag: String,
    /// Holder kingdom
    pub kingdom_player: u16,
    /// Holder guild kingdom
    pub kingdom_guild: u16,
    /// Kingdom the fort stands in
    pub kingdom_fort: u16,
}

/// Units in transit between two tiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovingUnit {
    /// Owner name
    pub player: String,
    /// Owner guild tag
    pub guild_tag: String,
    /// Owner kingdom
    pub kingdom: u16,
    /// Departure tile
    pub from: Coord,
    /// Destination tile
    pub to: Coord,
    /// Unix time of departure
    pub departed_at: u32,
    /// Travel time in seconds
    pub total_secs: u16,
    /// Movement mode (gather, attack, scout ...)
    pub mode: u8,
}

/// Variant-specific contents of a map object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum MapPayload {
    /// Wandering monster
    Monster(Monster),
    /// Castle or darknest
    CastleOrDarknest(CastleOrDarknest),
    /// Resource field
    ResourceTile(ResourceTile),
    /// Camp
    Camp(Camp),
    /// Fort or base
    Fort(Fort),
    /// Units in transit
    MovingUnit(MovingUnit),
}

impl MapPayload {
    /// The tag this payload is encoded with
    pub fn tag(&self) -> MapTag {
        match self {
            MapPayload::Monster(_) => MapTag::Monster,
            MapPayload::CastleOrDarknest(_) => MapTag::CastleOrDarknest,
            MapPayload::ResourceTile(tile) => MapTag::ResourceTile(tile.kind),
            MapPayload::Camp(_) => MapTag::Camp,
            MapPayload::Fort(_) => MapTag::Fort,
            MapPayload::MovingUnit(_) => MapTag::MovingUnit,
        }
    }
}

/// One object found on the world map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapObject {
    /// Tile position; invalid for units in transit
    pub coord: Coord,
    /// Raw variant tag byte
    pub tag: u8,
    /// Variant contents
    pub payload: MapPayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_tag_conversion() {
        assert_eq!(MapTag::try_from(0x00).unwrap(), MapTag::MovingUnit);
        assert_eq!(MapTag::try_from(0x03).unwrap(), MapTag::ResourceTile(3));
        assert_eq!(MapTag::try_from(0x08).unwrap(), MapTag::CastleOrDarknest);
        assert_eq!(MapTag::try_from(0x0b).unwrap(), MapTag::Fort);
        assert!(MapTag::try_from(0x07).is_err());
        assert!(MapTag::try_from(0x0c).is_err());
    }

    #[test]
    fn test_map_tag_round_trips_through_byte() {
        for byte in [0x00, 0x01, 0x06, 0x08, 0x09, 0x0a, 0x0b] {
            assert_eq!(MapTag::try_from(byte).unwrap().to_byte(), byte);
        }
    }
}
