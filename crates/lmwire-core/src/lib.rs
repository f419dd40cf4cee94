//! # lmwire-core
//!
//! A library for decoding the binary game-server stream of Lords Mobile.
//!
//! This crate provides the core functionality for:
//! - Reassembling length-prefixed frames from captured payload chunks
//! - Routing frames by opcode to record decoders
//! - Decoding gifts, chat, guild pages, hunt reports and world-map objects
//! - Attaching display names from a user-supplied catalog
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`codec`]: Little-endian primitives and packed map coordinates
//! - [`stream`]: Frames, opcodes and per-flow reassembly
//! - [`decode`]: One decoder per opcode family
//! - [`dispatch`]: Opcode routing and the per-flow pipeline
//! - [`model`]: Decoded record types
//! - [`catalog`]: Name lookup and record decoration
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use lmwire_core::{DecoderConfig, Dispatch, Flow, NullCatalog};
//!
//! let mut flow = Flow::new(DecoderConfig::new());
//!
//! // one skill activation frame
//! let chunk = hex::decode("15002320001d004700521b89620000000000000000")?;
//!
//! flow.feed(&chunk, 1_651_000_000, |outcome| {
//!     if let Ok(Dispatch::Records(records)) = outcome.result {
//!         for record in records {
//!             println!("{}", record.decorate(&NullCatalog));
//!         }
//!     }
//! });
//! assert_eq!(flow.stats().decoded, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`Catalog`]: Supply display names from any source
//! - [`Decorate`]: Labels attached to each record type

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod catalog;
pub mod codec;
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod stream;

// Re-export primary types for convenience
pub use catalog::{Catalog, CatalogKind, Decorate, Decorated, DecoratedRecord, MemoryCatalog, NullCatalog};
pub use codec::{Coord, FieldReader};
pub use decode::{DecodeContext, ValidationMode};
pub use dispatch::{DecoderConfig, Dispatch, Dispatcher, Flow, FlowStats, FrameOutcome, Interest};
pub use error::{Error, Result};
pub use model::{MapObject, MapPayload, Record};
pub use stream::{FlowBuffer, Frame, Opcode, OpcodePrefix};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
