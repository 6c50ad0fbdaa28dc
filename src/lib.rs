//! # Cardano CBOR Library
//!
//! A streaming CBOR (Concise Binary Object Representation) encoder/decoder
//! implementing RFC 8949 semantics.
//!
//! ## Features
//! - Full support for CBOR major types 0-7
//! - Definite- and indefinite-length arrays, maps, byte strings and text strings
//! - Tagged values (major type 6) with a curated set of well-known tags
//! - Bignum support (tags 2/3) for integers beyond the 64-bit range
//! - Half-, single- and double-precision float decoding
//! - A peekable reader state machine for shape-directed decoding
//!
//! ## Encoding policy
//! The writer always emits the shortest length-header form for integers and
//! lengths. Floats encode as 8-byte doubles unless the `compact_floats`
//! feature is enabled, in which case the shortest lossless of the f16/f32/f64
//! encodings is chosen. The reader accepts all header forms, canonical or not.
//!
//! ## Example
//! ```rust
//! use cardano_cbor::{CborReader, CborReaderState, CborWriter};
//!
//! let mut writer = CborWriter::new();
//! writer
//!     .start_array(Some(2))?
//!     .write_unsigned_int(1)?
//!     .write_text_string("hello")?
//!     .end_array()?;
//! let bytes = writer.encode()?;
//!
//! let mut reader = CborReader::new(bytes);
//! reader.read_start_array()?;
//! assert_eq!(reader.read_unsigned_int()?, 1);
//! assert_eq!(reader.read_text_string()?, "hello");
//! reader.read_end_array()?;
//! assert_eq!(reader.peek_state()?, CborReaderState::Finished);
//! # Ok::<(), cardano_cbor::CborError>(())
//! ```

use std::fmt;

pub mod bignum;
pub mod tags;
pub mod types;

mod reader;
mod writer;

pub use bignum::CborBigNum;
pub use reader::CborReader;
pub use tags::CborTag;
pub use types::{CborMajorType, CborReaderState, CborSimpleValue};
pub use writer::CborWriter;

// CBOR major types
pub(crate) const MAJOR_UNSIGNED: u8 = 0;
pub(crate) const MAJOR_NEGATIVE: u8 = 1;
pub(crate) const MAJOR_BYTES: u8 = 2;
pub(crate) const MAJOR_TEXT: u8 = 3;
pub(crate) const MAJOR_ARRAY: u8 = 4;
pub(crate) const MAJOR_MAP: u8 = 5;
pub(crate) const MAJOR_TAG: u8 = 6;
pub(crate) const MAJOR_SIMPLE: u8 = 7;

// Additional info values
pub(crate) const FALSE: u8 = 20;
pub(crate) const TRUE: u8 = 21;
pub(crate) const NULL: u8 = 22;
pub(crate) const UNDEFINED: u8 = 23;
pub(crate) const INDEFINITE: u8 = 31;

// The break byte terminating indefinite-length containers
pub(crate) const BREAK: u8 = 0xff;

/// Errors produced by [`CborReader`] and [`CborWriter`] operations.
///
/// The taxonomy distinguishes recoverable shape mismatches (the caller asked
/// for a type the cursor does not hold) from malformed input, container
/// bookkeeping violations and numeric range violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CborError {
    /// The input ended before a complete data item could be decoded.
    UnexpectedEof,
    /// A text string payload was not valid UTF-8.
    InvalidUtf8,
    /// The item at the cursor does not have the requested shape.
    TypeMismatch(String),
    /// The byte layout does not form a well-formed CBOR item.
    Malformed(String),
    /// Container open/close bookkeeping does not reconcile.
    ContainerMismatch(String),
    /// A numeric value does not fit the requested encoding width.
    OutOfRange(String),
}

impl fmt::Display for CborError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CborError::UnexpectedEof => write!(f, "Unexpected EOF"),
            CborError::InvalidUtf8 => write!(f, "Invalid UTF-8"),
            CborError::TypeMismatch(s) => write!(f, "Type mismatch: {}", s),
            CborError::Malformed(s) => write!(f, "Malformed CBOR: {}", s),
            CborError::ContainerMismatch(s) => write!(f, "Container mismatch: {}", s),
            CborError::OutOfRange(s) => write!(f, "Value out of range: {}", s),
        }
    }
}

impl std::error::Error for CborError {}

pub(crate) type Result<T> = std::result::Result<T, CborError>;
