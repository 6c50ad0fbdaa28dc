//! Core CBOR type enumerations shared by the reader and writer.

use std::fmt;

use crate::{FALSE, NULL, TRUE, UNDEFINED};

/// A CBOR major type, the highest 3 bits of a data item's initial byte
/// (RFC 8949 §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum CborMajorType {
    UnsignedInteger = 0,
    NegativeInteger = 1,
    ByteString = 2,
    Utf8String = 3,
    Array = 4,
    Map = 5,
    Tag = 6,
    Simple = 7,
}

impl CborMajorType {
    /// Extract the major type from a data item's initial byte.
    pub fn from_initial_byte(byte: u8) -> Self {
        match byte >> 5 {
            0 => CborMajorType::UnsignedInteger,
            1 => CborMajorType::NegativeInteger,
            2 => CborMajorType::ByteString,
            3 => CborMajorType::Utf8String,
            4 => CborMajorType::Array,
            5 => CborMajorType::Map,
            6 => CborMajorType::Tag,
            _ => CborMajorType::Simple,
        }
    }
}

impl fmt::Display for CborMajorType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CborMajorType::UnsignedInteger => f.write_str("unsigned integer"),
            CborMajorType::NegativeInteger => f.write_str("negative integer"),
            CborMajorType::ByteString => f.write_str("byte string"),
            CborMajorType::Utf8String => f.write_str("text string"),
            CborMajorType::Array => f.write_str("array"),
            CborMajorType::Map => f.write_str("map"),
            CborMajorType::Tag => f.write_str("tag"),
            CborMajorType::Simple => f.write_str("simple value"),
        }
    }
}

/// A CBOR simple value (major type 7).
///
/// The four well-known members get their own variants; every other code
/// round-trips through [`CborSimpleValue::Unassigned`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CborSimpleValue {
    False,
    True,
    Null,
    Undefined,
    /// A simple value outside the well-known set.
    Unassigned(u8),
}

impl From<u8> for CborSimpleValue {
    fn from(code: u8) -> Self {
        match code {
            FALSE => CborSimpleValue::False,
            TRUE => CborSimpleValue::True,
            NULL => CborSimpleValue::Null,
            UNDEFINED => CborSimpleValue::Undefined,
            other => CborSimpleValue::Unassigned(other),
        }
    }
}

impl From<CborSimpleValue> for u8 {
    fn from(value: CborSimpleValue) -> Self {
        match value {
            CborSimpleValue::False => FALSE,
            CborSimpleValue::True => TRUE,
            CborSimpleValue::Null => NULL,
            CborSimpleValue::Undefined => UNDEFINED,
            CborSimpleValue::Unassigned(code) => code,
        }
    }
}

/// The shape of the next data item a [`CborReader`](crate::CborReader) would
/// decode, as reported by [`peek_state`](crate::CborReader::peek_state).
///
/// Every typed `read_*` call validates against this state first, so the
/// accessor matching the peeked state never fails on well-formed input, and
/// any other accessor fails with a type mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CborReaderState {
    /// No data available (a reader over an empty buffer).
    Undefined,
    UnsignedInteger,
    NegativeInteger,
    ByteString,
    StartIndefiniteLengthByteString,
    EndIndefiniteLengthByteString,
    TextString,
    StartIndefiniteLengthTextString,
    EndIndefiniteLengthTextString,
    StartArray,
    /// The innermost array scope is ready to close: its declared count is
    /// exhausted, or the break byte is next.
    EndArray,
    StartMap,
    /// The innermost map scope is ready to close.
    EndMap,
    Tag,
    SimpleValue,
    HalfPrecisionFloat,
    SinglePrecisionFloat,
    DoublePrecisionFloat,
    Null,
    Boolean,
    /// The top-level document and all container scopes are closed and no
    /// bytes remain.
    Finished,
}

impl fmt::Display for CborReaderState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CborReaderState::Undefined => f.write_str("undefined"),
            CborReaderState::UnsignedInteger => f.write_str("unsigned integer"),
            CborReaderState::NegativeInteger => f.write_str("negative integer"),
            CborReaderState::ByteString => f.write_str("byte string"),
            CborReaderState::StartIndefiniteLengthByteString => {
                f.write_str("start of indefinite-length byte string")
            }
            CborReaderState::EndIndefiniteLengthByteString => {
                f.write_str("end of indefinite-length byte string")
            }
            CborReaderState::TextString => f.write_str("text string"),
            CborReaderState::StartIndefiniteLengthTextString => {
                f.write_str("start of indefinite-length text string")
            }
            CborReaderState::EndIndefiniteLengthTextString => {
                f.write_str("end of indefinite-length text string")
            }
            CborReaderState::StartArray => f.write_str("start of array"),
            CborReaderState::EndArray => f.write_str("end of array"),
            CborReaderState::StartMap => f.write_str("start of map"),
            CborReaderState::EndMap => f.write_str("end of map"),
            CborReaderState::Tag => f.write_str("tag"),
            CborReaderState::SimpleValue => f.write_str("simple value"),
            CborReaderState::HalfPrecisionFloat => f.write_str("half-precision float"),
            CborReaderState::SinglePrecisionFloat => f.write_str("single-precision float"),
            CborReaderState::DoublePrecisionFloat => f.write_str("double-precision float"),
            CborReaderState::Null => f.write_str("null"),
            CborReaderState::Boolean => f.write_str("boolean"),
            CborReaderState::Finished => f.write_str("finished"),
        }
    }
}
