//! Error types for the lmwire-core library.
//!
//! This module provides error handling using the `thiserror` crate. Every
//! decode failure is local to one frame: callers receive it as the result of
//! that frame and keep feeding the stream.

use crate::stream::Opcode;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for lmwire operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all lmwire operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read an input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Catalog document could not be parsed
    #[error("failed to parse catalog: {0}")]
    CatalogParse(#[from] serde_json::Error),

    /// A primitive value could not be converted
    #[error("invalid primitive: {details}")]
    InvalidPrimitive {
        /// Detailed description of the issue
        details: String,
    },

    /// A field lies beyond the end of the payload
    #[error("truncated payload: need {needed} bytes at offset {offset}, have {available}")]
    Truncated {
        /// Payload offset of the field
        offset: usize,
        /// Bytes the field needs
        needed: usize,
        /// Bytes available from the offset
        available: usize,
    },

    /// Declared frame length does not fit the opcode's layout
    #[error("length mismatch for {opcode}: expected {expected} bytes, frame declares {actual}")]
    LengthMismatch {
        /// Opcode of the rejected frame
        opcode: Opcode,
        /// Length implied by the layout
        expected: usize,
        /// Length the frame declared
        actual: usize,
    },

    /// A checked field holds a value outside its expected set
    #[error("unexpected value in '{field}' at offset {offset}: {details}")]
    UnexpectedValue {
        /// Name of the checked field
        field: &'static str,
        /// Payload offset of the field
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// Map object variant tag is not known
    #[error("unknown map object tag 0x{tag:02x} at offset {offset}")]
    UnknownVariant {
        /// The raw tag byte
        tag: u8,
        /// Offset of the tag byte
        offset: usize,
    },

    /// Fixed-width text field is not valid UTF-8
    #[error("invalid text in '{field}' at offset {offset}: {source}")]
    InvalidText {
        /// Name of the text field
        field: &'static str,
        /// Payload offset of the field
        offset: usize,
        /// Underlying UTF-8 error
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// Opcode string is not three hex bytes
    #[error("invalid opcode '{0}'")]
    InvalidOpcode(String),
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new primitive conversion error
    pub fn invalid_primitive(details: impl Into<String>) -> Self {
        Self::InvalidPrimitive {
            details: details.into(),
        }
    }

    /// Creates a new truncation error
    pub fn truncated(offset: usize, needed: usize, available: usize) -> Self {
        Self::Truncated {
            offset,
            needed,
            available,
        }
    }

    /// Creates a new length mismatch error
    pub fn length_mismatch(opcode: Opcode, expected: usize, actual: usize) -> Self {
        Self::LengthMismatch {
            opcode,
            expected,
            actual,
        }
    }

    /// Creates a new unexpected value error
    pub fn unexpected(field: &'static str, offset: usize, details: impl Into<String>) -> Self {
        Self::UnexpectedValue {
            field,
            offset,
            details: details.into(),
        }
    }

    /// Returns true if this error only invalidates the frame it came from
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::FileRead { .. } | Self::CatalogParse(_) | Self::InvalidOpcode(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::length_mismatch(Opcode::new([0x31, 0x0b, 0x00]), 46, 40);
        let text = err.to_string();
        assert!(text.contains("310b00"));
        assert!(text.contains("expected 46"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::truncated(4, 2, 1).is_recoverable());
        assert!(Error::unexpected("zero", 0, "not zero").is_recoverable());
        assert!(!Error::InvalidOpcode("zz".into()).is_recoverable());
    }
}
