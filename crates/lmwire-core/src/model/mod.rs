//! Decoded record types.
//!
//! Every record is built by a single decode call and never mutated after.
//! Display text looked up from a catalog is not stored here; see
//! [`crate::catalog`] for the decoration step.

mod map_object;

use crate::codec::Coord;
use bytes::Bytes;
use serde::{Serialize, Serializer};
use std::fmt;

pub use map_object::{
    Camp, CastleOrDarknest, Fort, MapObject, MapPayload, MapTag, Monster, MovingUnit, Occupant,
    ResourceTile,
};

/// Fixed-width identifier kept as its wire bytes
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawId<const N: usize>(pub [u8; N]);

impl<const N: usize> RawId<N> {
    /// Lowercase hex form, also used as the catalog key
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns true if every byte is zero
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl<const N: usize> fmt::Display for RawId<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl<const N: usize> fmt::Debug for RawId<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawId({})", self.to_hex())
    }
}

impl<const N: usize> Serialize for RawId<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Item, gift and chest identifier
pub type ItemId = RawId<2>;

/// Monster identifier
pub type MonsterId = RawId<2>;

fn as_hex<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

/// A gift opened from the guild gift list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gift {
    /// Position in the gift list
    pub sort_index: u32,
    /// Unix time the gift was received
    pub time: u64,
    /// The gift (chest) item
    pub gift_id: ItemId,
    /// The item inside
    pub item_id: ItemId,
    /// How many of the item
    pub number_of_item: u8,
    /// Quality tier of material rewards
    pub material_quality: u8,
    /// Player whose action produced the gift
    pub player: String,
    /// Capture time of the frame that opened it
    pub opened_at: u64,
}

/// Notification that a gift arrived
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GiftPopup {
    /// Running counter
    pub counter: u64,
    /// The gift item
    pub gift_id: ItemId,
    /// Player whose action produced the gift
    pub player: String,
    /// Unix time of the popup
    pub unixtime: u64,
    /// Second counter, only present in gift-table inserts
    pub counter2: Option<u32>,
}

/// Guild roster entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    /// Account id
    pub iggid: u64,
    /// Avatar id
    pub avatar_id: u16,
    /// Player name
    pub name: String,
    /// Rank inside the guild (R1..R5)
    pub guild_rank: u8,
    /// Might
    pub might: u64,
    /// Troops killed
    pub kills: u64,
    /// Unix time last seen
    pub lastseen: u64,
}

/// Details shown when a castle is tapped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Castle {
    /// Tile identifier
    pub tile_id: u64,
    /// Unconfirmed flag byte
    pub unknown_flag: u8,
    /// Owner identifier
    pub guid: RawId<4>,
    /// Full guild name
    pub long_guild_name: String,
    /// VIP level
    pub vip_level: u8,
    /// Rank inside the guild
    pub guild_rank: u8,
    /// Unconfirmed 6-byte field
    pub unknown: u64,
    /// Might
    pub might: u64,
    /// Troops killed
    pub troops_killed: u64,
}

/// Message body of a chat line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ChatBody {
    /// Free text typed by the player
    Text(String),
    /// Emoticon code, hex encoded
    Emoticon(String),
    /// Canned system phrase, optionally naming who triggered it
    Notice {
        /// The acting player for kick/execute notices
        actor: Option<String>,
    },
}

/// A chat line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    /// Channel identifier (guild, world)
    pub chat_place: RawId<3>,
    /// Unix time
    pub time: u32,
    /// Sender account id
    pub iggid: u32,
    /// Per-channel message counter
    pub comment_count: u32,
    /// Message type byte
    pub chat_type: u8,
    /// Sender name
    pub player: String,
    /// Unconfirmed byte
    pub unk1: u8,
    /// Sender guild tag
    pub guild_tag: String,
    /// Name color
    pub color: u8,
    /// Title id
    pub title: u8,
    /// Unconfirmed byte
    pub unk2: u8,
    /// Message body
    pub body: ChatBody,
}

/// Reward line of a hunt report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LmItem {
    /// Item id
    pub item_id: ItemId,
    /// Count
    pub number_of_item: u16,
    /// Quality tier of material rewards
    pub material_quality: u8,
}

/// Monster hunt mail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HuntReport {
    /// Unix time of the hunt
    pub time: u32,
    /// Kingdom of the monster
    pub kingdom: u16,
    /// Monster position
    pub coord: Coord,
    /// Whether this attack killed the monster
    pub killed: bool,
    /// Monster id
    pub monster_id: MonsterId,
    /// Monster level
    pub monster_lv: u8,
    /// Monster HP before the attack
    pub hp_start: u32,
    /// Monster HP after the attack
    pub hp_remain: u32,
    /// Monster maximum HP
    pub hp_maximum: u32,
    /// Experience gained
    pub player_exp: u32,
    /// Heroes sent
    pub hero_ids: [RawId<2>; 5],
    /// Per-hero state, not interpreted
    pub hero_infos: [RawId<8>; 5],
    /// Consecutive hunts on this monster
    pub hunt_in_a_row: u8,
    /// Energy spent
    pub energy_used: u8,
    /// Energy that turned into damage
    pub energy_dealt: u8,
    /// Number of reward kinds announced
    pub num_kinds: u8,
    /// Rewards
    pub rewards: Vec<LmItem>,
}

impl HuntReport {
    /// Damage dealt as a percentage of maximum HP
    pub fn damage_percent(&self) -> Option<f64> {
        if self.hp_maximum == 0 {
            return None;
        }
        let dealt = f64::from(self.hp_start) - f64::from(self.hp_remain);
        Some(dealt / f64::from(self.hp_maximum) * 100.0)
    }
}

/// One item from an opened chest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChestResult {
    /// Item id
    pub item_id: ItemId,
    /// Count
    pub number_of_items: u16,
    /// Rarity tier
    pub rarity: u8,
}

/// Items received from using a chest or consumable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultOpenChests {
    /// The chest item
    pub chest_id: ItemId,
    /// Contents
    pub items: Vec<ChestResult>,
}

/// Guild page as seen from outside the guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OuterGuildBoard {
    /// Guild id
    pub guild_id: RawId<5>,
    /// Leader name
    pub guild_leader: String,
    /// Guild tag
    pub guild_tag: String,
    /// Full guild name
    pub long_guild_name: String,
    /// Board text, passed through as-is
    #[serde(serialize_with = "as_hex")]
    pub board: Bytes,
    /// Slogan
    pub guild_slogan: String,
    /// Unconfirmed region
    pub unknown1: RawId<10>,
    /// Gift level
    pub gift_level: u8,
    /// Kingdom
    pub kingdom: u16,
    /// Unconfirmed byte
    pub unknown2: u8,
    /// Guild fest rank
    pub guild_fest_rank: u8,
    /// Guild showdown rank
    pub guild_showdown_rank: u8,
    /// Darknest arena cups
    pub da_cups: u16,
    /// Guild bash rank
    pub guild_bash_rank: u8,
}

/// Guild page as seen by a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InnerGuildBoard {
    /// Guild id
    pub guild_id: RawId<4>,
    /// Leader name
    pub guild_leader: String,
    /// Unconfirmed region, changes between captures
    pub unknown1: RawId<4>,
    /// Unconfirmed byte
    pub unknown2: u8,
    /// Guild tag
    pub guild_tag: String,
    /// Full guild name
    pub long_guild_name: String,
    /// Slogan
    pub guild_slogan: String,
    /// Board text, passed through as-is
    #[serde(serialize_with = "as_hex")]
    pub board: Bytes,
    /// Unconfirmed region
    pub unknown3: RawId<5>,
    /// Unconfirmed region, starts with a year
    pub unknown4: RawId<6>,
    /// Unconfirmed region
    pub unknown5: RawId<6>,
    /// Kingdom
    pub kingdom: u16,
    /// Unconfirmed region
    pub unknown6: RawId<4>,
    /// Unconfirmed region
    pub unknown7: RawId<2>,
    /// Unconfirmed region
    pub unknown8: RawId<2>,
    /// Unconfirmed region
    pub unknown9: RawId<3>,
    /// Guild fest rank
    pub guild_fest_rank: u8,
    /// Guild showdown rank
    pub guild_showdown_rank: u16,
    /// Darknest arena cups
    pub da_cups: u16,
    /// Guild bash rank
    pub guild_bash_rank: u8,
    /// Unconfirmed byte, 01 or 05 observed
    pub unknown_a: u8,
}

/// A guild skill was used
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillActivated {
    /// Skill identifier
    pub skill_code: RawId<4>,
    /// Unix time of the last activation
    pub last_activated: u32,
}

/// Any decoded record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    /// Opened gift
    Gift(Gift),
    /// Gift notification
    GiftPopup(GiftPopup),
    /// Roster entry
    Player(Player),
    /// Castle details
    Castle(Castle),
    /// Chat line
    Comment(Comment),
    /// Hunt mail
    HuntReport(HuntReport),
    /// Chest contents
    ResultOpenChests(ResultOpenChests),
    /// Outside guild page
    OuterGuildBoard(OuterGuildBoard),
    /// Inside guild page
    InnerGuildBoard(InnerGuildBoard),
    /// Skill use
    SkillActivated(SkillActivated),
    /// Map tile content
    MapObject(MapObject),
}

impl Record {
    /// Short lowercase name of the record family
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Gift(_) => "gift",
            Record::GiftPopup(_) => "gift_popup",
            Record::Player(_) => "player",
            Record::Castle(_) => "castle",
            Record::Comment(_) => "comment",
            Record::HuntReport(_) => "hunt_report",
            Record::ResultOpenChests(_) => "result_open_chests",
            Record::OuterGuildBoard(_) => "outer_guild_board",
            Record::InnerGuildBoard(_) => "inner_guild_board",
            Record::SkillActivated(_) => "skill_activated",
            Record::MapObject(_) => "map_object",
        }
    }
}

macro_rules! impl_from_record {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Record {
                fn from(value: $variant) -> Self {
                    Record::$variant(value)
                }
            }
        )*
    };
}

impl_from_record!(
    Gift,
    GiftPopup,
    Player,
    Castle,
    Comment,
    HuntReport,
    ResultOpenChests,
    OuterGuildBoard,
    InnerGuildBoard,
    SkillActivated,
    MapObject,
);
