//! Display-name lookup.
//!
//! Decoders only keep raw identifiers. A [`Catalog`] maps those identifiers
//! to names and metadata, and [`Decorate`] attaches them to records as a
//! separate step. Catalog data is user supplied, usually a JSON document:
//!
//! ```json
//! {
//!   "items": { "a10b": { "name": "Gold Chest", "gift_rank": 3, "monster": "Hellity" } },
//!   "monsters": { "2c00": { "name": "Hellity" } },
//!   "movement_modes": { "02": { "name": "attack" } }
//! }
//! ```
//!
//! Keys are lowercase hex of the wire bytes.

mod decorate;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

pub use decorate::{
    ChestLabels, CommentLabels, Decorate, Decorated, DecoratedRecord, GiftLabels, GuildLabels,
    HuntLabels, MapLabels, PopupLabels, SkillLabels,
};

/// Lookup tables a catalog can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    /// Items, gifts and chests
    Items,
    /// Monsters
    Monsters,
    /// Forts and bases
    Forts,
    /// Castle skins
    CastleSkins,
    /// Movement modes of units in transit
    MovementModes,
    /// Guild fest ranks
    GuildFestRanks,
    /// Guild bash ranks
    GuildBashRanks,
    /// Chat channels
    ChatPlaces,
    /// Chat message types
    ChatTypes,
    /// Player titles
    Titles,
    /// Guild skills
    Skills,
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CatalogKind::Items => "item",
            CatalogKind::Monsters => "monster",
            CatalogKind::Forts => "fort",
            CatalogKind::CastleSkins => "castle skin",
            CatalogKind::MovementModes => "movement mode",
            CatalogKind::GuildFestRanks => "guild fest rank",
            CatalogKind::GuildBashRanks => "guild bash rank",
            CatalogKind::ChatPlaces => "chat place",
            CatalogKind::ChatTypes => "chat type",
            CatalogKind::Titles => "title",
            CatalogKind::Skills => "skill",
        };
        f.write_str(name)
    }
}

/// One catalog entry. Only `name` is used by every table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entry {
    /// Display name
    pub name: String,
    /// Item category
    pub category: String,
    /// Rank shown when a gift is opened
    pub gift_rank: Option<i32>,
    /// Rank shown in the gift popup
    pub popup_rank: Option<i32>,
    /// Where a gift comes from
    pub source: Option<i32>,
    /// Monster that drops a gift
    pub monster: String,
}

impl Entry {
    /// Entry with only a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Source of display names
pub trait Catalog: Send + Sync {
    /// Finds the entry for a lowercase hex key
    fn lookup(&self, kind: CatalogKind, key: &str) -> Option<&Entry>;

    /// Returns true if the catalog holds nothing, so misses are expected
    fn is_empty(&self) -> bool {
        false
    }
}

/// Catalog that knows nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCatalog;

impl Catalog for NullCatalog {
    fn lookup(&self, _kind: CatalogKind, _key: &str) -> Option<&Entry> {
        None
    }

    fn is_empty(&self) -> bool {
        true
    }
}

/// Catalog held in memory
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct MemoryCatalog {
    tables: HashMap<CatalogKind, HashMap<String, Entry>>,
}

impl MemoryCatalog {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a catalog document
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: Self = serde_json::from_str(json)?;
        // keys are matched against lowercase hex
        let tables = parsed
            .tables
            .into_iter()
            .map(|(kind, table)| {
                let table = table
                    .into_iter()
                    .map(|(key, entry)| (key.to_ascii_lowercase(), entry))
                    .collect();
                (kind, table)
            })
            .collect();
        Ok(Self { tables })
    }

    /// Reads and parses a catalog file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Self::from_json(&json)
    }

    /// Adds or replaces an entry
    pub fn insert(&mut self, kind: CatalogKind, key: impl Into<String>, entry: Entry) {
        self.tables
            .entry(kind)
            .or_default()
            .insert(key.into().to_ascii_lowercase(), entry);
    }

    /// Number of entries across all tables
    pub fn len(&self) -> usize {
        self.tables.values().map(HashMap::len).sum()
    }

    /// Returns true if no table holds an entry
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Catalog for MemoryCatalog {
    fn lookup(&self, kind: CatalogKind, key: &str) -> Option<&Entry> {
        self.tables.get(&kind)?.get(key)
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let catalog = MemoryCatalog::from_json(
            r#"{
                "items": { "A10B": { "name": "Gold Chest", "gift_rank": 3, "monster": "Hellity" } },
                "monsters": { "2c00": { "name": "Hellity" } }
            }"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        let chest = catalog.lookup(CatalogKind::Items, "a10b").unwrap();
        assert_eq!(chest.name, "Gold Chest");
        assert_eq!(chest.gift_rank, Some(3));
        assert_eq!(chest.source, None);
        assert_eq!(catalog.lookup(CatalogKind::Monsters, "2c00").unwrap().name, "Hellity");
        assert!(catalog.lookup(CatalogKind::Forts, "2c00").is_none());
    }

    #[test]
    fn test_bad_json_is_a_catalog_error() {
        let err = MemoryCatalog::from_json(r#"{ "weapons": {} }"#).unwrap_err();
        assert!(matches!(err, Error::CatalogParse(_)));
    }

    #[test]
    fn test_null_catalog() {
        assert!(NullCatalog.lookup(CatalogKind::Items, "a10b").is_none());
        assert!(NullCatalog.is_empty());
        assert!(MemoryCatalog::new().is_empty());
    }

    #[test]
    fn test_insert_normalizes_keys() {
        let mut catalog = MemoryCatalog::new();
        catalog.insert(CatalogKind::Skills, "1D004700", Entry::named("Refreshed"));
        assert_eq!(catalog.lookup(CatalogKind::Skills, "1d004700").unwrap().name, "Refreshed");
    }
}
