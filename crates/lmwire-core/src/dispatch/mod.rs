//! Opcode routing.
//!
//! A [`Dispatcher`] first checks a frame's opcode against the caller's
//! [`Interest`], then hands it to the first matching decoder in a fixed
//! routing table. Exact opcodes are listed before families, so `ac080c`
//! reaches the castle decoder and not the map scanner.

mod flow;

use crate::decode::{self, DecodeContext, DecodeFn};
use crate::error::Result;
use crate::model::Record;
use crate::stream::{Frame, Opcode, OpcodePrefix};
use std::collections::HashSet;
use tracing::trace;

pub use flow::{DecoderConfig, Flow, FlowStats, FrameOutcome};

/// `310b00`: single gift opened
pub const SINGLE_GIFT: Opcode = Opcode::new([0x31, 0x0b, 0x00]);
/// `370b00`: gifts opened at once
pub const GIFT_BATCH: Opcode = Opcode::new([0x37, 0x0b, 0x00]);
/// `2b0b12`: gift popup
pub const GIFT_POPUP: Opcode = Opcode::new([0x2b, 0x0b, 0x12]);
/// `2b0b13`: gift table insert
pub const GIFT_TABLE_INSERT: Opcode = Opcode::new([0x2b, 0x0b, 0x13]);
/// `2b0b14`: gift table companion message, not decoded
pub const GIFT_TABLE_NOTICE: Opcode = Opcode::new([0x2b, 0x0b, 0x14]);
/// `060b00`: guild might ranking
pub const GUILD_ROSTER: Opcode = Opcode::new([0x06, 0x0b, 0x00]);
/// `ac080c`: castle tap
pub const CASTLE: Opcode = Opcode::new([0xac, 0x08, 0x0c]);
/// `7f0500`: chest results
pub const CHEST_RESULTS: Opcode = Opcode::new([0x7f, 0x05, 0x00]);
/// `bb0b00`: chat line
pub const CHAT: Opcode = Opcode::new([0xbb, 0x0b, 0x00]);
/// `2a0b00`: outer guild board
pub const OUTER_GUILD_BOARD: Opcode = Opcode::new([0x2a, 0x0b, 0x00]);
/// `232000`: skill activated
pub const SKILL_ACTIVATED: Opcode = Opcode::new([0x23, 0x20, 0x00]);

/// `5e0d`: hunt reports
pub const HUNT_REPORT: OpcodePrefix = OpcodePrefix::new([0x5e, 0x0d]);
/// `f20a`: inner guild board
pub const INNER_GUILD_BOARD: OpcodePrefix = OpcodePrefix::new([0xf2, 0x0a]);
/// `ac08`: world map
pub const MAP: OpcodePrefix = OpcodePrefix::new([0xac, 0x08]);
/// `ba08`: arena map
pub const ARENA_MAP: OpcodePrefix = OpcodePrefix::new([0xba, 0x08]);
/// `8305`: skill family, not decoded
pub const SKILL_FAMILY: OpcodePrefix = OpcodePrefix::new([0x83, 0x05]);

/// How a routing row selects opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// One opcode
    Exact(Opcode),
    /// Every opcode of a family
    Prefix(OpcodePrefix),
}

impl Matcher {
    /// Returns true if the row applies to `opcode`
    pub fn matches(&self, opcode: Opcode) -> bool {
        match self {
            Matcher::Exact(code) => *code == opcode,
            Matcher::Prefix(prefix) => prefix.matches(opcode),
        }
    }
}

struct Route {
    matcher: Matcher,
    name: &'static str,
    decode: DecodeFn,
}

const fn exact(code: Opcode, name: &'static str, decode: DecodeFn) -> Route {
    Route {
        matcher: Matcher::Exact(code),
        name,
        decode,
    }
}

const fn family(prefix: OpcodePrefix, name: &'static str, decode: DecodeFn) -> Route {
    Route {
        matcher: Matcher::Prefix(prefix),
        name,
        decode,
    }
}

// exact rows first
static ROUTES: [Route; 14] = [
    exact(SINGLE_GIFT, "single gift", decode::decode_single_gift),
    exact(GIFT_BATCH, "gift batch", decode::decode_gift_batch),
    exact(GIFT_POPUP, "gift popup", decode::decode_gift_popup),
    exact(GIFT_TABLE_INSERT, "gift table insert", decode::decode_gift_table_insert),
    exact(GUILD_ROSTER, "guild roster", decode::decode_guild_roster),
    exact(CASTLE, "castle", decode::decode_castle),
    exact(CHEST_RESULTS, "chest results", decode::decode_chest_results),
    exact(CHAT, "chat", decode::decode_chat),
    exact(OUTER_GUILD_BOARD, "outer guild board", decode::decode_outer_guild_board),
    exact(SKILL_ACTIVATED, "skill activated", decode::decode_skill_activated),
    family(HUNT_REPORT, "hunt report", decode::decode_hunt_report),
    family(INNER_GUILD_BOARD, "inner guild board", decode::decode_inner_guild_board),
    family(MAP, "map objects", decode::decode_map_objects),
    family(ARENA_MAP, "arena map objects", decode::decode_map_objects),
];

fn route(opcode: Opcode) -> Option<&'static Route> {
    ROUTES.iter().find(|route| route.matcher.matches(opcode))
}

/// Opcodes the caller wants decoded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interest {
    exact: HashSet<Opcode>,
    prefixes: Vec<OpcodePrefix>,
}

impl Interest {
    /// An empty interest set; nothing passes
    pub fn new() -> Self {
        Self::default()
    }

    /// Every opcode with a registered decoder
    pub fn all_known() -> Self {
        ROUTES.iter().fold(Self::new(), |interest, route| match route.matcher {
            Matcher::Exact(code) => interest.code(code),
            Matcher::Prefix(prefix) => interest.prefix(prefix),
        })
    }

    /// Adds one opcode
    pub fn code(mut self, opcode: Opcode) -> Self {
        self.exact.insert(opcode);
        self
    }

    /// Adds an opcode family
    pub fn prefix(mut self, prefix: OpcodePrefix) -> Self {
        if !self.prefixes.contains(&prefix) {
            self.prefixes.push(prefix);
        }
        self
    }

    /// Returns true if `opcode` is selected exactly or by family
    pub fn contains(&self, opcode: Opcode) -> bool {
        self.exact.contains(&opcode) || self.prefixes.iter().any(|p| p.matches(opcode))
    }

    /// The exactly selected opcodes, in a stable order
    pub fn exact_codes(&self) -> Vec<Opcode> {
        let mut codes: Vec<_> = self.exact.iter().copied().collect();
        codes.sort();
        codes
    }

    /// The selected families
    pub fn prefixes(&self) -> &[OpcodePrefix] {
        &self.prefixes
    }

    /// Returns true if nothing is selected
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefixes.is_empty()
    }
}

/// What happened to one frame
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The frame was decoded; it may hold no records
    Records(Vec<Record>),
    /// The opcode is of interest but has no decoder
    Unhandled(Opcode),
    /// The opcode is outside the interest set
    Filtered(Opcode),
}

/// Routes frames to record decoders
#[derive(Debug, Clone)]
pub struct Dispatcher {
    interest: Interest,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Interest::all_known())
    }
}

impl Dispatcher {
    /// Creates a dispatcher for the given interest set
    pub fn new(interest: Interest) -> Self {
        Self { interest }
    }

    /// The interest set in use
    pub fn interest(&self) -> &Interest {
        &self.interest
    }

    /// Decodes one frame.
    ///
    /// A decode failure is returned as `Err` and concerns this frame only.
    pub fn dispatch(&self, frame: &Frame, ctx: &DecodeContext) -> Result<Dispatch> {
        let opcode = frame.opcode();
        if !self.interest.contains(opcode) {
            return Ok(Dispatch::Filtered(opcode));
        }

        match route(opcode) {
            Some(route) => {
                trace!("Decoding {} as {}", opcode, route.name);
                (route.decode)(frame, ctx).map(Dispatch::Records)
            }
            None => Ok(Dispatch::Unhandled(opcode)),
        }
    }
}
