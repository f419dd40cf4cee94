//! Primitive value codecs.
//!
//! All multi-byte integers on the wire are little-endian, floats are
//! little-endian IEEE-754 singles, and text fields are fixed-width UTF-8
//! right-padded with NUL bytes.
//!
//! [`FieldReader`] wraps one frame payload and reads fields at absolute
//! offsets, turning out-of-range reads into [`Error::Truncated`].

mod coord;

use crate::error::{Error, Result};
use std::ops::Range;
use std::string::FromUtf8Error;

pub use coord::{guid_to_xy, Coord, X_MAX, Y_MAX};

/// Decode an unsigned little-endian integer of 1 to 8 bytes.
pub fn decode_uint(bytes: &[u8]) -> Result<u64> {
    if bytes.is_empty() || bytes.len() > 8 {
        return Err(Error::invalid_primitive(format!(
            "cannot decode {} bytes as an unsigned integer",
            bytes.len()
        )));
    }

    Ok(bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

/// Encode `n` as `width` little-endian bytes.
///
/// Fails when `width` is outside 1..=8 or `n` does not fit.
pub fn encode_uint(n: u64, width: usize) -> Result<Vec<u8>> {
    if width == 0 || width > 8 {
        return Err(Error::invalid_primitive(format!(
            "unsupported integer width {}",
            width
        )));
    }
    if width < 8 && n >> (width * 8) != 0 {
        return Err(Error::invalid_primitive(format!(
            "{} does not fit in {} bytes",
            n, width
        )));
    }

    Ok(n.to_le_bytes()[..width].to_vec())
}

/// Decode a little-endian IEEE-754 single.
pub fn decode_float(bytes: &[u8]) -> Result<f32> {
    let raw: [u8; 4] = bytes.try_into().map_err(|_| {
        Error::invalid_primitive(format!("float needs 4 bytes, got {}", bytes.len()))
    })?;
    Ok(f32::from_le_bytes(raw))
}

/// Encode a float in wire order; the exact inverse of [`decode_float`].
pub fn encode_float(f: f32) -> [u8; 4] {
    f.to_le_bytes()
}

/// Decode a fixed-width text field.
///
/// With `trim_trailing_nul` the NUL padding on the right is removed first.
/// Invalid UTF-8 is reported, never replaced.
pub fn decode_text(bytes: &[u8], trim_trailing_nul: bool) -> std::result::Result<String, FromUtf8Error> {
    let end = if trim_trailing_nul {
        bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1)
    } else {
        bytes.len()
    };
    String::from_utf8(bytes[..end].to_vec())
}

/// Bounds-checked reader over a single frame payload.
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    data: &'a [u8],
}

impl<'a> FieldReader<'a> {
    /// Wrap a payload slice
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow `len` bytes starting at `offset`
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        let available = self.data.len().saturating_sub(offset);
        if available < len {
            return Err(Error::truncated(offset, len, available));
        }
        Ok(&self.data[offset..offset + len])
    }

    /// Borrow a byte range
    pub fn range(&self, range: Range<usize>) -> Result<&'a [u8]> {
        self.bytes(range.start, range.len())
    }

    /// Copy `N` bytes starting at `offset`
    pub fn raw<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(offset, N)?);
        Ok(out)
    }

    /// Read a single byte
    pub fn u8(&self, offset: usize) -> Result<u8> {
        Ok(self.bytes(offset, 1)?[0])
    }

    /// Read a little-endian u16
    pub fn u16(&self, offset: usize) -> Result<u16> {
        Ok(u16::from_le_bytes(self.raw(offset)?))
    }

    /// Read a little-endian u32
    pub fn u32(&self, offset: usize) -> Result<u32> {
        Ok(u32::from_le_bytes(self.raw(offset)?))
    }

    /// Read a little-endian u64
    pub fn u64(&self, offset: usize) -> Result<u64> {
        Ok(u64::from_le_bytes(self.raw(offset)?))
    }

    /// Read an unsigned integer of odd width (3, 5, 6 bytes)
    pub fn uint(&self, offset: usize, width: usize) -> Result<u64> {
        decode_uint(self.bytes(offset, width)?)
    }

    /// Read a little-endian f32
    pub fn f32(&self, offset: usize) -> Result<f32> {
        decode_float(self.bytes(offset, 4)?)
    }

    /// Read a NUL-padded text field
    pub fn text(&self, field: &'static str, offset: usize, len: usize) -> Result<String> {
        decode_text(self.bytes(offset, len)?, true).map_err(|source| Error::InvalidText {
            field,
            offset,
            source,
        })
    }

    /// Read a packed 3-byte world coordinate
    pub fn coord(&self, offset: usize) -> Result<Coord> {
        let [b0, b1, b2] = self.raw::<3>(offset)?;
        Ok(Coord::from_guid(b0, b1, b2))
    }

    /// Returns true if every byte in the range is zero
    pub fn is_zero(&self, range: Range<usize>) -> Result<bool> {
        Ok(self.range(range)?.iter().all(|&b| b == 0))
    }
}
