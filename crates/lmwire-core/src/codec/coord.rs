//! Packed world-coordinate identifiers.
//!
//! A tile is addressed on the wire by three bytes. The bits map to a
//! `(x, y)` grid position as follows, with `b0 b1 b2` in wire order:
//!
//! ```text
//! y = b2[7:4] | b0[7:4] << 4 | b1[3:0] << 8
//! x = (y & 1) + 2 * (b2[3:0] | b0[3:0] << 4)
//! ```
//!
//! Only the forward direction is implemented.

use serde::Serialize;
use std::fmt;

/// Largest valid x coordinate
pub const X_MAX: i32 = 511;

/// Largest valid y coordinate
pub const Y_MAX: i32 = 1023;

/// Decode a packed coordinate. Each axis is `-1` when out of range.
pub fn guid_to_xy(b0: u8, b1: u8, b2: u8) -> (i32, i32) {
    let y = i32::from((b2 >> 4) & 0x0f)
        | (i32::from((b0 >> 4) & 0x0f) << 4)
        | (i32::from(b1 & 0x0f) << 8);
    let x = (y & 1) + 2 * (i32::from(b2 & 0x0f) | (i32::from(b0 & 0x0f) << 4));

    let x = if (0..=X_MAX).contains(&x) { x } else { -1 };
    let y = if (0..=Y_MAX).contains(&y) { y } else { -1 };
    (x, y)
}

/// A world tile position; `-1` on an axis marks it invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Coord {
    /// Column, 0..=511 or -1
    pub x: i32,
    /// Row, 0..=1023 or -1
    pub y: i32,
}

impl Coord {
    /// The invalid coordinate
    pub const INVALID: Coord = Coord { x: -1, y: -1 };

    /// Decode from the three wire bytes
    pub fn from_guid(b0: u8, b1: u8, b2: u8) -> Self {
        let (x, y) = guid_to_xy(b0, b1, b2);
        Self { x, y }
    }

    /// Returns true if both axes are in range
    pub fn is_valid(&self) -> bool {
        self.x != -1 && self.y != -1
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:3},{:3})", self.x, self.y)
    }
}
