//! Attaching catalog labels to records.

use super::{Catalog, CatalogKind, Entry};
use crate::model::{
    Castle, ChatBody, Comment, Gift, GiftPopup, HuntReport, InnerGuildBoard, MapObject, MapPayload,
    OuterGuildBoard, Player, Record, ResultOpenChests, SkillActivated,
};
use serde::Serialize;
use std::fmt::{self, Debug, Display};
use tracing::warn;

fn lookup<'c>(catalog: &'c dyn Catalog, kind: CatalogKind, key: &str) -> Option<&'c Entry> {
    let entry = catalog.lookup(kind, key);
    if entry.is_none() && !catalog.is_empty() {
        warn!("No {} named {} in catalog", kind, key);
    }
    entry
}

fn name(catalog: &dyn Catalog, kind: CatalogKind, key: &str) -> Option<String> {
    lookup(catalog, kind, key).map(|entry| entry.name.clone())
}

/// Optional entry fields are stored as empty strings
fn present(field: &str) -> Option<String> {
    (!field.is_empty()).then(|| field.to_owned())
}

/// Records that can carry catalog labels
pub trait Decorate: Sized {
    /// Labels looked up for this record
    type Labels: Debug + Clone + Default + Serialize;

    /// Looks up the labels. A miss leaves a label empty.
    fn labels(&self, catalog: &dyn Catalog) -> Self::Labels;

    /// Pairs the record with its labels
    fn decorate(self, catalog: &dyn Catalog) -> Decorated<Self> {
        let labels = self.labels(catalog);
        Decorated {
            record: self,
            labels,
        }
    }
}

/// A record and the labels found for it
#[derive(Debug, Clone, Serialize)]
#[serde(bound(serialize = "R: Serialize"))]
pub struct Decorated<R: Decorate> {
    /// The decoded record
    #[serde(flatten)]
    pub record: R,
    /// Catalog labels
    pub labels: R::Labels,
}

/// Labels of an opened gift
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GiftLabels {
    /// Gift name
    pub gift_name: Option<String>,
    /// Gift rank
    pub gift_rank: Option<i32>,
    /// Gift source
    pub gift_source: Option<i32>,
    /// Monster that dropped the gift
    pub monster: Option<String>,
    /// Item name
    pub item_name: Option<String>,
    /// Item category
    pub item_category: Option<String>,
}

impl Decorate for Gift {
    type Labels = GiftLabels;

    fn labels(&self, catalog: &dyn Catalog) -> GiftLabels {
        let gift = lookup(catalog, CatalogKind::Items, &self.gift_id.to_hex());
        let item = lookup(catalog, CatalogKind::Items, &self.item_id.to_hex());
        GiftLabels {
            gift_name: gift.map(|e| e.name.clone()),
            gift_rank: gift.and_then(|e| e.gift_rank),
            gift_source: gift.and_then(|e| e.source),
            monster: gift.and_then(|e| present(&e.monster)),
            item_name: item.map(|e| e.name.clone()),
            item_category: item.and_then(|e| present(&e.category)),
        }
    }
}

/// Labels of a gift popup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopupLabels {
    /// Gift name
    pub gift_name: Option<String>,
    /// Rank as shown in the popup
    pub gift_rank: Option<i32>,
    /// Monster that dropped the gift
    pub monster: Option<String>,
}

impl Decorate for GiftPopup {
    type Labels = PopupLabels;

    fn labels(&self, catalog: &dyn Catalog) -> PopupLabels {
        let gift = lookup(catalog, CatalogKind::Items, &self.gift_id.to_hex());
        PopupLabels {
            gift_name: gift.map(|e| e.name.clone()),
            gift_rank: gift.and_then(|e| e.popup_rank),
            monster: gift.and_then(|e| present(&e.monster)),
        }
    }
}

impl Decorate for Player {
    type Labels = ();

    fn labels(&self, _catalog: &dyn Catalog) {}
}

impl Decorate for Castle {
    type Labels = ();

    fn labels(&self, _catalog: &dyn Catalog) {}
}

/// Labels of a chat line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommentLabels {
    /// Channel name
    pub place: Option<String>,
    /// Message type name
    pub chat_type: Option<String>,
    /// Sender title
    pub title: Option<String>,
}

impl Decorate for Comment {
    type Labels = CommentLabels;

    fn labels(&self, catalog: &dyn Catalog) -> CommentLabels {
        let chat_type = match self.body {
            ChatBody::Notice { .. } => name(catalog, CatalogKind::ChatTypes, &hex::encode([self.chat_type])),
            _ => None,
        };
        let title = match self.title {
            0 => None,
            t => name(catalog, CatalogKind::Titles, &hex::encode([t])),
        };
        CommentLabels {
            place: name(catalog, CatalogKind::ChatPlaces, &self.chat_place.to_hex()),
            chat_type,
            title,
        }
    }
}

/// Labels of a hunt report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HuntLabels {
    /// Monster name
    pub monster_name: Option<String>,
    /// Reward names, in reward order
    pub rewards: Vec<Option<String>>,
}

impl Decorate for HuntReport {
    type Labels = HuntLabels;

    fn labels(&self, catalog: &dyn Catalog) -> HuntLabels {
        HuntLabels {
            monster_name: name(catalog, CatalogKind::Monsters, &self.monster_id.to_hex()),
            rewards: self
                .rewards
                .iter()
                .map(|item| name(catalog, CatalogKind::Items, &item.item_id.to_hex()))
                .collect(),
        }
    }
}

/// Labels of chest results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChestLabels {
    /// Chest name
    pub chest_name: Option<String>,
    /// Item names, in item order
    pub items: Vec<Option<String>>,
    /// Item categories, in item order
    pub item_categories: Vec<Option<String>>,
}

impl Decorate for ResultOpenChests {
    type Labels = ChestLabels;

    fn labels(&self, catalog: &dyn Catalog) -> ChestLabels {
        let (items, item_categories) = self
            .items
            .iter()
            .map(|item| {
                let entry = lookup(catalog, CatalogKind::Items, &item.item_id.to_hex());
                (
                    entry.map(|e| e.name.clone()),
                    entry.and_then(|e| present(&e.category)),
                )
            })
            .unzip();

        ChestLabels {
            chest_name: name(catalog, CatalogKind::Items, &self.chest_id.to_hex()),
            items,
            item_categories,
        }
    }
}

/// Labels of a guild page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GuildLabels {
    /// Guild fest rank name
    pub guild_fest_rank: Option<String>,
    /// Guild bash rank name
    pub guild_bash_rank: Option<String>,
}

fn guild_labels(catalog: &dyn Catalog, fest: u8, bash: u8) -> GuildLabels {
    GuildLabels {
        guild_fest_rank: name(catalog, CatalogKind::GuildFestRanks, &hex::encode([fest])),
        guild_bash_rank: name(catalog, CatalogKind::GuildBashRanks, &hex::encode([bash])),
    }
}

impl Decorate for OuterGuildBoard {
    type Labels = GuildLabels;

    fn labels(&self, catalog: &dyn Catalog) -> GuildLabels {
        guild_labels(catalog, self.guild_fest_rank, self.guild_bash_rank)
    }
}

impl Decorate for InnerGuildBoard {
    type Labels = GuildLabels;

    fn labels(&self, catalog: &dyn Catalog) -> GuildLabels {
        guild_labels(catalog, self.guild_fest_rank, self.guild_bash_rank)
    }
}

/// Labels of a skill activation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkillLabels {
    /// Skill name
    pub skill_name: Option<String>,
}

impl Decorate for SkillActivated {
    type Labels = SkillLabels;

    fn labels(&self, catalog: &dyn Catalog) -> SkillLabels {
        SkillLabels {
            skill_name: name(catalog, CatalogKind::Skills, &self.skill_code.to_hex()),
        }
    }
}

/// Labels of a map object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MapLabels {
    /// Monster, castle skin, fort or movement mode name, by variant
    pub name: Option<String>,
}

impl Decorate for MapObject {
    type Labels = MapLabels;

    fn labels(&self, catalog: &dyn Catalog) -> MapLabels {
        let name = match &self.payload {
            MapPayload::Monster(m) => name(catalog, CatalogKind::Monsters, &m.monster_id.to_hex()),
            MapPayload::CastleOrDarknest(c) => {
                name(catalog, CatalogKind::CastleSkins, &c.skin_id.to_hex())
            }
            MapPayload::Fort(f) => name(catalog, CatalogKind::Forts, &f.fort_id.to_hex()),
            MapPayload::MovingUnit(u) => {
                name(catalog, CatalogKind::MovementModes, &hex::encode([u.mode]))
            }
            MapPayload::ResourceTile(_) | MapPayload::Camp(_) => None,
        };
        MapLabels { name }
    }
}

/// A [`Record`] with its labels
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecoratedRecord {
    /// Opened gift
    Gift(Decorated<Gift>),
    /// Gift notification
    GiftPopup(Decorated<GiftPopup>),
    /// Roster entry
    Player(Decorated<Player>),
    /// Castle details
    Castle(Decorated<Castle>),
    /// Chat line
    Comment(Decorated<Comment>),
    /// Hunt mail
    HuntReport(Decorated<HuntReport>),
    /// Chest contents
    ResultOpenChests(Decorated<ResultOpenChests>),
    /// Outside guild page
    OuterGuildBoard(Decorated<OuterGuildBoard>),
    /// Inside guild page
    InnerGuildBoard(Decorated<InnerGuildBoard>),
    /// Skill use
    SkillActivated(Decorated<SkillActivated>),
    /// Map tile content
    MapObject(Decorated<MapObject>),
}

impl Record {
    /// Looks up catalog labels for this record. Never fails.
    pub fn decorate(self, catalog: &dyn Catalog) -> DecoratedRecord {
        match self {
            Record::Gift(r) => DecoratedRecord::Gift(r.decorate(catalog)),
            Record::GiftPopup(r) => DecoratedRecord::GiftPopup(r.decorate(catalog)),
            Record::Player(r) => DecoratedRecord::Player(r.decorate(catalog)),
            Record::Castle(r) => DecoratedRecord::Castle(r.decorate(catalog)),
            Record::Comment(r) => DecoratedRecord::Comment(r.decorate(catalog)),
            Record::HuntReport(r) => DecoratedRecord::HuntReport(r.decorate(catalog)),
            Record::ResultOpenChests(r) => DecoratedRecord::ResultOpenChests(r.decorate(catalog)),
            Record::OuterGuildBoard(r) => DecoratedRecord::OuterGuildBoard(r.decorate(catalog)),
            Record::InnerGuildBoard(r) => DecoratedRecord::InnerGuildBoard(r.decorate(catalog)),
            Record::SkillActivated(r) => DecoratedRecord::SkillActivated(r.decorate(catalog)),
            Record::MapObject(r) => DecoratedRecord::MapObject(r.decorate(catalog)),
        }
    }
}

struct Label<'a>(&'a Option<String>, &'a dyn Display);

impl Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(name) => f.write_str(name),
            None => Display::fmt(self.1, f),
        }
    }
}

struct Rank(Option<i32>);

impl Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(rank) => write!(f, "{}", rank),
            None => f.write_str("-"),
        }
    }
}

impl Display for Decorated<Gift> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = Label(&self.labels.gift_name, &self.record.gift_id);
        write!(
            f,
            "Gift {:13} {:20} {}",
            self.record.player,
            name.to_string(),
            Rank(self.labels.gift_rank)
        )
    }
}

impl Display for Decorated<GiftPopup> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = Label(&self.labels.gift_name, &self.record.gift_id);
        write!(
            f,
            "GiftPopup {} {} {}",
            self.record.player,
            name,
            Rank(self.labels.gift_rank)
        )?;
        if let Some(monster) = self.labels.monster.as_deref().filter(|m| !m.is_empty()) {
            write!(f, " ({})", monster)?;
        }
        Ok(())
    }
}

impl Display for Decorated<Player> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player {} {}", self.record.name, self.record.might)
    }
}

impl Display for Decorated<Castle> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.record;
        write!(
            f,
            "Castle {} VIP{} might {} kills {}",
            r.long_guild_name, r.vip_level, r.might, r.troops_killed
        )
    }
}

impl Display for Decorated<Comment> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.record;
        write!(f, "Comment: [{}]{:13} @{}: ", r.guild_tag, r.player, r.time)?;
        match &r.body {
            ChatBody::Text(text) => f.write_str(text),
            ChatBody::Emoticon(code) => write!(f, "<emoticon {}>", code),
            ChatBody::Notice { actor } => {
                let kind = hex::encode([r.chat_type]);
                write!(f, "<{}>", Label(&self.labels.chat_type, &kind))?;
                match actor {
                    Some(actor) => write!(f, " by {}", actor),
                    None => Ok(()),
                }
            }
        }
    }
}

impl Display for Decorated<HuntReport> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.record;
        write!(
            f,
            "{} Lv.{}@k{} x:{} y:{} used/dealt={}/{} {}++",
            Label(&self.labels.monster_name, &r.monster_id),
            r.monster_lv,
            r.kingdom,
            r.coord.x,
            r.coord.y,
            r.energy_used,
            r.energy_dealt,
            r.hunt_in_a_row
        )?;
        if let Some(damage) = r.damage_percent() {
            write!(f, " {:.1}%", damage)?;
        }
        for (item, label) in r.rewards.iter().zip(&self.labels.rewards) {
            write!(f, "; {} x {}", item.number_of_item, Label(label, &item.item_id))?;
        }
        Ok(())
    }
}

impl Display for Decorated<ResultOpenChests> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.record;
        write!(f, "{}({})", Label(&self.labels.chest_name, &r.chest_id), r.chest_id)?;
        for (item, label) in r.items.iter().zip(&self.labels.items) {
            write!(
                f,
                "; {}[{}] x {}",
                Label(label, &item.item_id),
                item.rarity,
                item.number_of_items
            )?;
        }
        Ok(())
    }
}

impl Display for Decorated<OuterGuildBoard> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.record;
        write!(
            f,
            "Guild [{}] {} k{} leader {} cups {}",
            r.guild_tag, r.long_guild_name, r.kingdom, r.guild_leader, r.da_cups
        )
    }
}

impl Display for Decorated<InnerGuildBoard> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.record;
        write!(
            f,
            "Guild [{}] {} k{} leader {} cups {}",
            r.guild_tag, r.long_guild_name, r.kingdom, r.guild_leader, r.da_cups
        )
    }
}

impl Display for Decorated<SkillActivated> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Skill {} last activated @{}",
            Label(&self.labels.skill_name, &self.record.skill_code),
            self.record.last_activated
        )
    }
}

impl Display for Decorated<MapObject> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.record;
        if !matches!(r.payload, MapPayload::MovingUnit(_)) {
            write!(f, "X:{:3} Y:{:3} ", r.coord.x, r.coord.y)?;
        }
        let name = &self.labels.name;
        match &r.payload {
            MapPayload::Monster(m) => write!(f, "{} lv{}", Label(name, &m.monster_id), m.level),
            MapPayload::CastleOrDarknest(c) => write!(f, "[{}]{} Lv.{}", c.guild_tag, c.player, c.level),
            MapPayload::ResourceTile(t) => {
                write!(f, "tile{} lv{} {:6.2}%", t.kind, t.level, t.remaining_percentage)?;
                match &t.occupant {
                    Some(o) => write!(f, " [{:3}]{}", o.guild_tag, o.player),
                    None => Ok(()),
                }
            }
            MapPayload::Camp(c) => write!(f, "camp of [{:3}]{:13}", c.guild_tag, c.player),
            MapPayload::Fort(fort) => write!(
                f,
                "{} [{:3}]{:13}",
                Label(name, &fort.fort_id),
                fort.guild_tag,
                fort.player_name
            ),
            MapPayload::MovingUnit(u) => {
                let mode = hex::encode([u.mode]);
                write!(
                    f,
                    "[{:3}]{:13} {}->{} left@{} {}",
                    u.guild_tag,
                    u.player,
                    u.from,
                    u.to,
                    u.departed_at,
                    Label(name, &mode)
                )
            }
        }
    }
}

impl Display for DecoratedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoratedRecord::Gift(d) => Display::fmt(d, f),
            DecoratedRecord::GiftPopup(d) => Display::fmt(d, f),
            DecoratedRecord::Player(d) => Display::fmt(d, f),
            DecoratedRecord::Castle(d) => Display::fmt(d, f),
            DecoratedRecord::Comment(d) => Display::fmt(d, f),
            DecoratedRecord::HuntReport(d) => Display::fmt(d, f),
            DecoratedRecord::ResultOpenChests(d) => Display::fmt(d, f),
            DecoratedRecord::OuterGuildBoard(d) => Display::fmt(d, f),
            DecoratedRecord::InnerGuildBoard(d) => Display::fmt(d, f),
            DecoratedRecord::SkillActivated(d) => Display::fmt(d, f),
            DecoratedRecord::MapObject(d) => Display::fmt(d, f),
        }
    }
}
