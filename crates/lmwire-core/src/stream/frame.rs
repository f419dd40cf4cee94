//! Frames and opcodes.
//!
//! ```text
//! [len: u16 LE][opcode: 3 bytes][payload ...]
//! ```
//!
//! The length counts the whole frame, its own two bytes included.

use crate::error::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Size of the length field
pub const LENGTH_FIELD_LEN: usize = 2;

/// Size of the length field plus the opcode
pub const HEADER_LEN: usize = 5;

/// Three-byte message type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Opcode([u8; 3]);

impl Opcode {
    /// Creates an opcode from its wire bytes
    pub const fn new(bytes: [u8; 3]) -> Self {
        Self(bytes)
    }

    /// The wire bytes
    pub fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }

    /// The family prefix shared by related opcodes
    pub fn prefix(&self) -> OpcodePrefix {
        OpcodePrefix([self.0[0], self.0[1]])
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Opcode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut bytes = [0u8; 3];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| Error::InvalidOpcode(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Opcode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// First two bytes of an opcode, naming an opcode family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpcodePrefix([u8; 2]);

impl OpcodePrefix {
    /// Creates a prefix from its wire bytes
    pub const fn new(bytes: [u8; 2]) -> Self {
        Self(bytes)
    }

    /// Returns true if `opcode` belongs to this family
    pub fn matches(&self, opcode: Opcode) -> bool {
        opcode.prefix() == *self
    }
}

impl fmt::Display for OpcodePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for OpcodePrefix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut bytes = [0u8; 2];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| Error::InvalidOpcode(s.to_string()))?;
        Ok(Self(bytes))
    }
}

/// One complete length-delimited message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    /// Wraps raw frame bytes, checking the header against the byte count
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() < HEADER_LEN {
            return Err(Error::truncated(0, HEADER_LEN, bytes.len()));
        }
        let declared = usize::from(u16::from_le_bytes([bytes[0], bytes[1]]));
        if declared != bytes.len() {
            return Err(Error::invalid_primitive(format!(
                "frame declares {} bytes but holds {}",
                declared,
                bytes.len()
            )));
        }
        Ok(Self { bytes })
    }

    /// Builds a frame from an opcode and payload, filling in the length
    pub fn encode(opcode: Opcode, payload: &[u8]) -> Result<Self> {
        let total = HEADER_LEN + payload.len();
        let declared = u16::try_from(total).map_err(|_| {
            Error::invalid_primitive(format!("frame of {} bytes exceeds the length field", total))
        })?;

        let mut buf = BytesMut::with_capacity(total);
        buf.put_u16_le(declared);
        buf.put_slice(opcode.as_bytes());
        buf.put_slice(payload);
        Ok(Self {
            bytes: buf.freeze(),
        })
    }

    /// Frames are only built by the framer after the header check
    pub(crate) fn from_checked(bytes: Bytes) -> Self {
        Self { bytes }
    }

    /// Total length from the header
    pub fn declared_len(&self) -> usize {
        usize::from(u16::from_le_bytes([self.bytes[0], self.bytes[1]]))
    }

    /// The message type
    pub fn opcode(&self) -> Opcode {
        Opcode([self.bytes[2], self.bytes[3], self.bytes[4]])
    }

    /// Everything after the length field
    pub fn body(&self) -> &[u8] {
        &self.bytes[LENGTH_FIELD_LEN..]
    }

    /// Everything after the opcode
    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_LEN..]
    }

    /// Shares a payload region without copying
    pub fn payload_slice(&self, offset: usize, len: usize) -> Result<Bytes> {
        let available = self.bytes.len() - HEADER_LEN;
        if offset.checked_add(len).map_or(true, |end| end > available) {
            return Err(Error::truncated(offset, len, available.saturating_sub(offset)));
        }
        let start = HEADER_LEN + offset;
        Ok(self.bytes.slice(start..start + len))
    }

    /// The complete frame bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Frame length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a frame holds at least its header
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
