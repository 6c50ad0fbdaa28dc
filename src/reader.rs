//! Streaming CBOR decoder.

use crate::{
    BREAK, CborBigNum, CborError, CborMajorType, CborReaderState, CborSimpleValue, CborTag, FALSE,
    INDEFINITE, NULL, Result, TRUE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Array,
    Map,
}

impl ScopeKind {
    fn name(self) -> &'static str {
        match self {
            ScopeKind::Array => "array",
            ScopeKind::Map => "map",
        }
    }
}

/// Bookkeeping for one open array or map being read.
#[derive(Debug, Clone)]
struct Scope {
    kind: ScopeKind,
    /// Data items left to read (map keys and values count individually), or
    /// `None` inside an indefinite-length container.
    remaining: Option<u64>,
    /// Data items read so far inside this scope.
    consumed: u64,
}

/// Streaming CBOR decoder over a fixed byte buffer.
///
/// [`CborReader::peek_state`] reports the shape of the next data item without
/// advancing the cursor, so callers branch on shape before committing to one
/// of the typed `read_*` calls. A shape mismatch fails without moving the
/// cursor, leaving the reader usable for the correct accessor; malformed
/// input fails cleanly but leaves the position unspecified.
///
/// Cloning yields a fully independent reader at the same position, usable for
/// speculative decoding. A reader is a single-owner value; concurrent use
/// from multiple threads requires external synchronization.
///
/// # Example
/// ```
/// use cardano_cbor::{CborReader, CborReaderState};
///
/// let mut reader = CborReader::from_hex("a10102")?;
/// assert_eq!(reader.peek_state()?, CborReaderState::StartMap);
/// assert_eq!(reader.read_start_map()?, Some(1));
/// assert_eq!(reader.read_unsigned_int()?, 1);
/// assert_eq!(reader.read_unsigned_int()?, 2);
/// reader.read_end_map()?;
/// # Ok::<(), cardano_cbor::CborError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CborReader {
    buffer: Vec<u8>,
    offset: usize,
    scopes: Vec<Scope>,
    last_error: Option<String>,
}

impl CborReader {
    /// Create a reader over a CBOR byte buffer.
    pub fn new(buffer: impl Into<Vec<u8>>) -> Self {
        CborReader {
            buffer: buffer.into(),
            offset: 0,
            scopes: Vec::new(),
            last_error: None,
        }
    }

    /// Create a reader from the hex form of a CBOR byte buffer.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let buffer = hex::decode(hex)
            .map_err(|e| CborError::Malformed(format!("invalid hex input: {e}")))?;
        Ok(CborReader::new(buffer))
    }

    /// Human-readable description of the most recent failure, for
    /// diagnostics.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Number of bytes not yet consumed.
    pub fn bytes_remaining(&self) -> usize {
        self.buffer.len() - self.offset
    }

    /// The unconsumed tail of the buffer.
    pub fn remainder_bytes(&self) -> &[u8] {
        &self.buffer[self.offset..]
    }

    fn fail(&mut self, err: CborError) -> CborError {
        self.last_error = Some(err.to_string());
        err
    }

    fn peek_byte(&self) -> Result<u8> {
        self.buffer
            .get(self.offset)
            .copied()
            .ok_or(CborError::UnexpectedEof)
    }

    /// Consume and return `n` bytes starting at the cursor.
    fn read_slice(&mut self, n: usize) -> Result<&[u8]> {
        let start = self.offset;
        let end = start.checked_add(n).ok_or(CborError::UnexpectedEof)?;
        if end > self.buffer.len() {
            return Err(CborError::UnexpectedEof);
        }
        self.offset = end;
        Ok(&self.buffer[start..end])
    }

    fn read_exact<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }

    /// Decode the argument following an initial byte, advancing the cursor.
    fn read_argument(&mut self, info: u8) -> Result<u64> {
        match info {
            0..=23 => Ok(u64::from(info)),
            24 => self.read_exact::<1>().map(|b| u64::from(b[0])),
            25 => self
                .read_exact::<2>()
                .map(u16::from_be_bytes)
                .map(u64::from),
            26 => self
                .read_exact::<4>()
                .map(u32::from_be_bytes)
                .map(u64::from),
            27 => self.read_exact::<8>().map(u64::from_be_bytes),
            _ => Err(CborError::Malformed(format!(
                "reserved additional info {info}"
            ))),
        }
    }

    /// Consume an initial byte and its argument.
    fn take_header(&mut self) -> Result<(u8, u64)> {
        let initial = self.read_exact::<1>()?[0];
        let argument = self.read_argument(initial & 0x1f)?;
        Ok((initial, argument))
    }

    fn decode_length(&mut self, info: u8) -> Result<usize> {
        let length = self.read_argument(info)?;
        usize::try_from(length).map_err(|_| {
            CborError::Malformed(format!("length {length} exceeds addressable memory"))
        })
    }

    /// Account for one complete data item consumed from the innermost scope.
    fn item_read(&mut self) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.consumed += 1;
            if let Some(remaining) = scope.remaining.as_mut() {
                *remaining -= 1;
            }
        }
    }

    /// Inspect the shape of the next data item without advancing the cursor.
    ///
    /// Safe to call repeatedly; the returned state is exactly what the next
    /// `read_*` call would attempt to decode, including the end-of-scope
    /// states for exhausted definite-length containers.
    pub fn peek_state(&mut self) -> Result<CborReaderState> {
        self.peek_state_inner().map_err(|e| self.fail(e))
    }

    fn peek_state_inner(&self) -> Result<CborReaderState> {
        // Exhausted definite-length scopes surface their end state before any
        // byte is examined.
        if let Some(scope) = self.scopes.last() {
            if scope.remaining == Some(0) {
                return Ok(match scope.kind {
                    ScopeKind::Array => CborReaderState::EndArray,
                    ScopeKind::Map => CborReaderState::EndMap,
                });
            }
        }
        if self.offset >= self.buffer.len() {
            if self.buffer.is_empty() {
                return Ok(CborReaderState::Undefined);
            }
            if self.scopes.is_empty() {
                return Ok(CborReaderState::Finished);
            }
            return Err(CborError::UnexpectedEof);
        }
        let initial = self.buffer[self.offset];
        if initial == BREAK {
            return match self.scopes.last() {
                Some(scope) if scope.remaining.is_none() => Ok(match scope.kind {
                    ScopeKind::Array => CborReaderState::EndArray,
                    ScopeKind::Map => CborReaderState::EndMap,
                }),
                _ => Err(CborError::Malformed(
                    "break byte outside an indefinite-length container".into(),
                )),
            };
        }
        let info = initial & 0x1f;
        Ok(match CborMajorType::from_initial_byte(initial) {
            CborMajorType::UnsignedInteger => CborReaderState::UnsignedInteger,
            CborMajorType::NegativeInteger => CborReaderState::NegativeInteger,
            CborMajorType::ByteString => {
                if info == INDEFINITE {
                    CborReaderState::StartIndefiniteLengthByteString
                } else {
                    CborReaderState::ByteString
                }
            }
            CborMajorType::Utf8String => {
                if info == INDEFINITE {
                    CborReaderState::StartIndefiniteLengthTextString
                } else {
                    CborReaderState::TextString
                }
            }
            CborMajorType::Array => CborReaderState::StartArray,
            CborMajorType::Map => CborReaderState::StartMap,
            CborMajorType::Tag => CborReaderState::Tag,
            CborMajorType::Simple => match info {
                FALSE | TRUE => CborReaderState::Boolean,
                NULL => CborReaderState::Null,
                25 => CborReaderState::HalfPrecisionFloat,
                26 => CborReaderState::SinglePrecisionFloat,
                27 => CborReaderState::DoublePrecisionFloat,
                28..=30 => {
                    return Err(CborError::Malformed(format!(
                        "reserved additional info {info}"
                    )));
                }
                _ => CborReaderState::SimpleValue,
            },
        })
    }

    /// Validate that the next item has one of the wanted shapes.
    fn expect_state(
        &mut self,
        wanted: &[CborReaderState],
        op: &'static str,
    ) -> Result<CborReaderState> {
        let state = self.peek_state_inner().map_err(|e| self.fail(e))?;
        if wanted.contains(&state) {
            Ok(state)
        } else {
            let err = CborError::TypeMismatch(format!(
                "{op}: unexpected {state} at offset {}",
                self.offset
            ));
            Err(self.fail(err))
        }
    }

    /// Decode a major type 0 unsigned integer.
    pub fn read_unsigned_int(&mut self) -> Result<u64> {
        self.expect_state(&[CborReaderState::UnsignedInteger], "read_unsigned_int")?;
        let (_, value) = self.take_header().map_err(|e| self.fail(e))?;
        self.item_read();
        Ok(value)
    }

    /// Decode a major type 0 or 1 integer into `i64`.
    ///
    /// Fails with an out-of-range error when the encoded value does not fit
    /// a 64-bit signed integer.
    pub fn read_signed_int(&mut self) -> Result<i64> {
        let state = self.expect_state(
            &[
                CborReaderState::UnsignedInteger,
                CborReaderState::NegativeInteger,
            ],
            "read_signed_int",
        )?;
        let probe_offset = self.offset;
        let (_, bits) = self.take_header().map_err(|e| self.fail(e))?;
        if bits > i64::MAX as u64 {
            self.offset = probe_offset;
            let err = CborError::OutOfRange(format!(
                "read_signed_int: encoded magnitude {bits} does not fit i64"
            ));
            return Err(self.fail(err));
        }
        self.item_read();
        Ok(match state {
            CborReaderState::UnsignedInteger => bits as i64,
            _ => -1 - bits as i64,
        })
    }

    /// Decode a major type 0 or 1 integer covering the full CBOR range
    /// [-2^64, 2^64 - 1].
    pub fn read_int(&mut self) -> Result<i128> {
        let state = self.expect_state(
            &[
                CborReaderState::UnsignedInteger,
                CborReaderState::NegativeInteger,
            ],
            "read_int",
        )?;
        let (_, bits) = self.take_header().map_err(|e| self.fail(e))?;
        self.item_read();
        Ok(match state {
            CborReaderState::UnsignedInteger => i128::from(bits),
            _ => -1 - i128::from(bits),
        })
    }

    /// Decode a bignum: tag 2 or 3 wrapping a big-endian magnitude byte
    /// string.
    pub fn read_big_int(&mut self) -> Result<CborBigNum> {
        self.expect_state(&[CborReaderState::Tag], "read_big_int")?;
        // Decode through a probe so a non-bignum tag leaves the cursor in
        // place for an alternate read.
        let mut probe = self.clone();
        let (_, tag) = probe.take_header().map_err(|e| self.fail(e))?;
        let negative = match tag {
            2 => false,
            3 => true,
            other => {
                let err = CborError::TypeMismatch(format!(
                    "read_big_int: tag {other} is not a bignum tag"
                ));
                return Err(self.fail(err));
            }
        };
        let state = probe.peek_state_inner().map_err(|e| self.fail(e))?;
        if !matches!(
            state,
            CborReaderState::ByteString | CborReaderState::StartIndefiniteLengthByteString
        ) {
            let err = CborError::TypeMismatch(format!(
                "read_big_int: bignum payload must be a byte string, found {state}"
            ));
            return Err(self.fail(err));
        }
        let magnitude = probe
            .read_string_payload(CborMajorType::ByteString)
            .map_err(|e| self.fail(e))?;
        self.offset = probe.offset;
        self.item_read();
        Ok(CborBigNum::from_magnitude(negative, magnitude))
    }

    /// Decode a float (half, single, or double encoding) as `f64`.
    pub fn read_double(&mut self) -> Result<f64> {
        let state = self.expect_state(
            &[
                CborReaderState::HalfPrecisionFloat,
                CborReaderState::SinglePrecisionFloat,
                CborReaderState::DoublePrecisionFloat,
            ],
            "read_double",
        )?;
        self.read_exact::<1>().map_err(|e| self.fail(e))?;
        let value = match state {
            CborReaderState::HalfPrecisionFloat => {
                let bits = self
                    .read_exact::<2>()
                    .map(u16::from_be_bytes)
                    .map_err(|e| self.fail(e))?;
                f64::from(f32::from(half::f16::from_bits(bits)))
            }
            CborReaderState::SinglePrecisionFloat => {
                let bytes = self.read_exact::<4>().map_err(|e| self.fail(e))?;
                f64::from(f32::from_be_bytes(bytes))
            }
            _ => {
                let bytes = self.read_exact::<8>().map_err(|e| self.fail(e))?;
                f64::from_be_bytes(bytes)
            }
        };
        self.item_read();
        Ok(value)
    }

    /// Decode a major type 7 simple value, including booleans, null and
    /// undefined.
    pub fn read_simple_value(&mut self) -> Result<CborSimpleValue> {
        self.expect_state(
            &[
                CborReaderState::SimpleValue,
                CborReaderState::Boolean,
                CborReaderState::Null,
            ],
            "read_simple_value",
        )?;
        let initial = self.read_exact::<1>().map_err(|e| self.fail(e))?[0];
        let info = initial & 0x1f;
        let code = if info == 24 {
            let code = self.read_exact::<1>().map_err(|e| self.fail(e))?[0];
            if code < 32 {
                let err = CborError::Malformed(format!(
                    "read_simple_value: two-byte form used for code {code}"
                ));
                return Err(self.fail(err));
            }
            code
        } else {
            info
        };
        self.item_read();
        Ok(CborSimpleValue::from(code))
    }

    /// Decode a boolean; fails unless the next item is exactly true or false.
    pub fn read_boolean(&mut self) -> Result<bool> {
        self.expect_state(&[CborReaderState::Boolean], "read_boolean")?;
        let initial = self.read_exact::<1>().map_err(|e| self.fail(e))?[0];
        self.item_read();
        Ok(initial & 0x1f == TRUE)
    }

    /// Consume a null; fails unless the next item is exactly null.
    pub fn read_null(&mut self) -> Result<()> {
        self.expect_state(&[CborReaderState::Null], "read_null")?;
        self.read_exact::<1>().map_err(|e| self.fail(e))?;
        self.item_read();
        Ok(())
    }

    /// Decode a byte string, transparently reassembling indefinite-length
    /// chunks into one contiguous buffer.
    pub fn read_byte_string(&mut self) -> Result<Vec<u8>> {
        self.expect_state(
            &[
                CborReaderState::ByteString,
                CborReaderState::StartIndefiniteLengthByteString,
            ],
            "read_byte_string",
        )?;
        let bytes = self
            .read_string_payload(CborMajorType::ByteString)
            .map_err(|e| self.fail(e))?;
        self.item_read();
        Ok(bytes)
    }

    /// Decode a text string, transparently reassembling indefinite-length
    /// chunks into one contiguous string.
    pub fn read_text_string(&mut self) -> Result<String> {
        self.expect_state(
            &[
                CborReaderState::TextString,
                CborReaderState::StartIndefiniteLengthTextString,
            ],
            "read_text_string",
        )?;
        let bytes = self
            .read_string_payload(CborMajorType::Utf8String)
            .map_err(|e| self.fail(e))?;
        let text = String::from_utf8(bytes).map_err(|_| self.fail(CborError::InvalidUtf8))?;
        self.item_read();
        Ok(text)
    }

    fn read_string_payload(&mut self, major: CborMajorType) -> Result<Vec<u8>> {
        let initial = self.read_exact::<1>()?[0];
        if initial & 0x1f != INDEFINITE {
            let length = self.decode_length(initial & 0x1f)?;
            return self.read_slice(length).map(<[u8]>::to_vec);
        }
        // Chunks must themselves be definite-length strings of the same major
        // type (RFC 8949 §3.2.3).
        let mut out = Vec::new();
        loop {
            let next = self.peek_byte()?;
            if next == BREAK {
                self.read_exact::<1>()?;
                return Ok(out);
            }
            if CborMajorType::from_initial_byte(next) != major || next & 0x1f == INDEFINITE {
                return Err(CborError::Malformed(format!(
                    "indefinite-length {major} chunk must be a definite-length {major}"
                )));
            }
            let chunk_initial = self.read_exact::<1>()?[0];
            let length = self.decode_length(chunk_initial & 0x1f)?;
            let chunk = self.read_slice(length)?;
            out.extend_from_slice(chunk);
        }
    }

    /// Enter an array scope. Returns the declared element count, or `None`
    /// for an indefinite-length array.
    pub fn read_start_array(&mut self) -> Result<Option<u64>> {
        self.expect_state(&[CborReaderState::StartArray], "read_start_array")?;
        let initial = self.read_exact::<1>().map_err(|e| self.fail(e))?[0];
        let size = if initial & 0x1f == INDEFINITE {
            None
        } else {
            Some(
                self.read_argument(initial & 0x1f)
                    .map_err(|e| self.fail(e))?,
            )
        };
        self.item_read();
        self.scopes.push(Scope {
            kind: ScopeKind::Array,
            remaining: size,
            consumed: 0,
        });
        Ok(size)
    }

    /// Exit the innermost array scope.
    ///
    /// For a definite-length array this validates that the declared count was
    /// read; for an indefinite-length array it consumes the break byte.
    pub fn read_end_array(&mut self) -> Result<()> {
        self.read_end_scope(ScopeKind::Array, "read_end_array")
    }

    /// Enter a map scope. Returns the declared pair count, or `None` for an
    /// indefinite-length map. Keys and values are read alternately with the
    /// ordinary `read_*` calls.
    pub fn read_start_map(&mut self) -> Result<Option<u64>> {
        self.expect_state(&[CborReaderState::StartMap], "read_start_map")?;
        let initial = self.read_exact::<1>().map_err(|e| self.fail(e))?[0];
        let pairs = if initial & 0x1f == INDEFINITE {
            None
        } else {
            Some(
                self.read_argument(initial & 0x1f)
                    .map_err(|e| self.fail(e))?,
            )
        };
        let remaining = match pairs {
            Some(count) => Some(count.checked_mul(2).ok_or_else(|| {
                self.fail(CborError::Malformed(format!(
                    "map pair count {count} overflows"
                )))
            })?),
            None => None,
        };
        self.item_read();
        self.scopes.push(Scope {
            kind: ScopeKind::Map,
            remaining,
            consumed: 0,
        });
        Ok(pairs)
    }

    /// Exit the innermost map scope.
    pub fn read_end_map(&mut self) -> Result<()> {
        self.read_end_scope(ScopeKind::Map, "read_end_map")
    }

    fn read_end_scope(&mut self, kind: ScopeKind, op: &'static str) -> Result<()> {
        let innermost = self
            .scopes
            .last()
            .map(|scope| (scope.kind, scope.remaining, scope.consumed));
        let (found, remaining, consumed) = match innermost {
            Some(scope) => scope,
            None => {
                let err = CborError::ContainerMismatch(format!("{op}: no open container"));
                return Err(self.fail(err));
            }
        };
        if found != kind {
            let err = CborError::ContainerMismatch(format!(
                "{op}: innermost open container is a {}",
                found.name()
            ));
            return Err(self.fail(err));
        }
        match remaining {
            Some(0) => {}
            Some(left) => {
                let err = CborError::ContainerMismatch(format!(
                    "{op}: {left} declared items have not been read"
                ));
                return Err(self.fail(err));
            }
            None => {
                if kind == ScopeKind::Map && consumed % 2 != 0 {
                    let err =
                        CborError::Malformed(format!("{op}: map has a key without a value"));
                    return Err(self.fail(err));
                }
                let byte = self.peek_byte().map_err(|e| self.fail(e))?;
                if byte != BREAK {
                    let err = CborError::ContainerMismatch(format!(
                        "{op}: expected break byte, found 0x{byte:02x}"
                    ));
                    return Err(self.fail(err));
                }
                self.read_exact::<1>().map_err(|e| self.fail(e))?;
            }
        }
        self.scopes.pop();
        Ok(())
    }

    /// Consume a semantic tag header. The tagged data item follows and must
    /// be read separately.
    pub fn read_tag(&mut self) -> Result<CborTag> {
        self.expect_state(&[CborReaderState::Tag], "read_tag")?;
        let (_, value) = self.take_header().map_err(|e| self.fail(e))?;
        Ok(CborTag::from(value))
    }

    /// Look ahead at a semantic tag without consuming it.
    pub fn peek_tag(&mut self) -> Result<CborTag> {
        let mut probe = self.clone();
        match probe.read_tag() {
            Ok(tag) => Ok(tag),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Consume exactly one data item, including all nested contents, and
    /// return its raw encoded bytes.
    pub fn read_encoded_value(&mut self) -> Result<Vec<u8>> {
        let start = self.offset;
        self.skip_value()?;
        Ok(self.buffer[start..self.offset].to_vec())
    }

    /// Consume and discard exactly one data item, including all nested
    /// contents, without materializing it.
    pub fn skip_value(&mut self) -> Result<()> {
        let state = self.peek_state()?;
        if matches!(
            state,
            CborReaderState::Undefined
                | CborReaderState::Finished
                | CborReaderState::EndArray
                | CborReaderState::EndMap
                | CborReaderState::EndIndefiniteLengthByteString
                | CborReaderState::EndIndefiniteLengthTextString
        ) {
            let err =
                CborError::TypeMismatch(format!("skip_value: no data item to skip at {state}"));
            return Err(self.fail(err));
        }
        self.skip_one().map_err(|e| self.fail(e))?;
        self.item_read();
        Ok(())
    }

    /// Advance past one data item without interpreting it. Iterative frame
    /// counting keeps arbitrarily nested input from recursing.
    fn skip_one(&mut self) -> Result<()> {
        enum Frame {
            /// Remaining data items in a definite-length container.
            Count(u64),
            /// An indefinite-length container awaiting its break byte.
            Indefinite,
        }

        let mut stack = vec![Frame::Count(1)];
        while let Some(frame) = stack.last_mut() {
            match frame {
                Frame::Count(0) => {
                    stack.pop();
                    continue;
                }
                Frame::Count(count) => *count -= 1,
                Frame::Indefinite => {
                    if self.peek_byte()? == BREAK {
                        self.read_exact::<1>()?;
                        stack.pop();
                        continue;
                    }
                }
            }
            let initial = self.read_exact::<1>()?[0];
            if initial == BREAK {
                return Err(CborError::Malformed(
                    "break byte inside a definite-length container".into(),
                ));
            }
            let info = initial & 0x1f;
            match CborMajorType::from_initial_byte(initial) {
                CborMajorType::UnsignedInteger | CborMajorType::NegativeInteger => {
                    self.read_argument(info)?;
                }
                CborMajorType::ByteString | CborMajorType::Utf8String => {
                    if info == INDEFINITE {
                        stack.push(Frame::Indefinite);
                    } else {
                        let length = self.decode_length(info)?;
                        self.read_slice(length)?;
                    }
                }
                CborMajorType::Array => {
                    if info == INDEFINITE {
                        stack.push(Frame::Indefinite);
                    } else {
                        stack.push(Frame::Count(self.read_argument(info)?));
                    }
                }
                CborMajorType::Map => {
                    if info == INDEFINITE {
                        stack.push(Frame::Indefinite);
                    } else {
                        let pairs = self.read_argument(info)?;
                        let items = pairs.checked_mul(2).ok_or_else(|| {
                            CborError::Malformed(format!("map pair count {pairs} overflows"))
                        })?;
                        stack.push(Frame::Count(items));
                    }
                }
                CborMajorType::Tag => {
                    // The tag and its following item form a single data item.
                    self.read_argument(info)?;
                    stack.push(Frame::Count(1));
                }
                CborMajorType::Simple => match info {
                    0..=23 => {}
                    24 => {
                        self.read_exact::<1>()?;
                    }
                    25 => {
                        self.read_exact::<2>()?;
                    }
                    26 => {
                        self.read_exact::<4>()?;
                    }
                    27 => {
                        self.read_exact::<8>()?;
                    }
                    _ => {
                        return Err(CborError::Malformed(format!(
                            "reserved additional info {info}"
                        )));
                    }
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_matches_read() {
        let mut reader = CborReader::from_hex("05").unwrap();
        assert_eq!(
            reader.peek_state().unwrap(),
            CborReaderState::UnsignedInteger
        );
        assert_eq!(reader.read_unsigned_int().unwrap(), 5);
        assert_eq!(reader.peek_state().unwrap(), CborReaderState::Finished);
    }

    #[test]
    fn test_type_mismatch_leaves_reader_usable() {
        let mut reader = CborReader::from_hex("05").unwrap();
        assert!(matches!(
            reader.read_text_string(),
            Err(CborError::TypeMismatch(_))
        ));
        assert!(reader.last_error().is_some());
        assert_eq!(reader.read_unsigned_int().unwrap(), 5);
    }

    #[test]
    fn test_empty_buffer_is_undefined() {
        let mut reader = CborReader::new(Vec::new());
        assert_eq!(reader.peek_state().unwrap(), CborReaderState::Undefined);
    }

    #[test]
    fn test_signed_int_accepts_both_majors() {
        let mut reader = CborReader::from_hex("0a29").unwrap();
        assert_eq!(reader.read_signed_int().unwrap(), 10);
        assert_eq!(reader.read_signed_int().unwrap(), -10);
    }

    #[test]
    fn test_signed_int_out_of_range() {
        // 2^63 fits major type 0 but not i64.
        let mut reader = CborReader::from_hex("1b8000000000000000").unwrap();
        assert!(matches!(
            reader.read_signed_int(),
            Err(CborError::OutOfRange(_))
        ));
        // The full-range accessor still decodes it.
        assert_eq!(reader.read_int().unwrap(), 1i128 << 63);
    }

    #[test]
    fn test_truncated_byte_string() {
        // Header claims 10 bytes, buffer holds 3.
        let mut reader = CborReader::new(vec![0x4a, 0x01, 0x02, 0x03]);
        assert!(matches!(
            reader.read_byte_string(),
            Err(CborError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_indefinite_text_reassembly() {
        // (_ "strea", "ming") from RFC 8949 Appendix A.
        let mut reader = CborReader::from_hex("7f657374726561646d696e67ff").unwrap();
        assert_eq!(
            reader.peek_state().unwrap(),
            CborReaderState::StartIndefiniteLengthTextString
        );
        assert_eq!(reader.read_text_string().unwrap(), "streaming");
        assert_eq!(reader.peek_state().unwrap(), CborReaderState::Finished);
    }

    #[test]
    fn test_indefinite_chunks_must_be_definite() {
        let mut reader = CborReader::from_hex("7f7f6161ffff").unwrap();
        assert!(matches!(
            reader.read_text_string(),
            Err(CborError::Malformed(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut reader = CborReader::new(vec![0x62, 0xff, 0xfe]);
        assert_eq!(reader.peek_state().unwrap(), CborReaderState::TextString);
        assert_eq!(reader.read_text_string(), Err(CborError::InvalidUtf8));
    }

    #[test]
    fn test_break_outside_scope_is_malformed() {
        let mut reader = CborReader::new(vec![0xff]);
        assert!(matches!(
            reader.peek_state(),
            Err(CborError::Malformed(_))
        ));
    }

    #[test]
    fn test_unterminated_indefinite_array() {
        let mut reader = CborReader::from_hex("9f01").unwrap();
        assert_eq!(reader.read_start_array().unwrap(), None);
        assert_eq!(reader.read_unsigned_int().unwrap(), 1);
        assert_eq!(reader.peek_state(), Err(CborError::UnexpectedEof));
    }

    #[test]
    fn test_definite_array_end_state() {
        let mut reader = CborReader::from_hex("820102").unwrap();
        assert_eq!(reader.read_start_array().unwrap(), Some(2));
        assert_eq!(reader.read_unsigned_int().unwrap(), 1);
        assert_eq!(reader.read_unsigned_int().unwrap(), 2);
        assert_eq!(reader.peek_state().unwrap(), CborReaderState::EndArray);
        assert!(matches!(
            reader.read_unsigned_int(),
            Err(CborError::TypeMismatch(_))
        ));
        reader.read_end_array().unwrap();
        assert_eq!(reader.peek_state().unwrap(), CborReaderState::Finished);
    }

    #[test]
    fn test_end_scope_kind_mismatch() {
        let mut reader = CborReader::from_hex("80").unwrap();
        reader.read_start_array().unwrap();
        assert!(matches!(
            reader.read_end_map(),
            Err(CborError::ContainerMismatch(_))
        ));
        reader.read_end_array().unwrap();
    }

    #[test]
    fn test_end_scope_with_items_left() {
        let mut reader = CborReader::from_hex("820102").unwrap();
        reader.read_start_array().unwrap();
        assert!(matches!(
            reader.read_end_array(),
            Err(CborError::ContainerMismatch(_))
        ));
    }

    #[test]
    fn test_indefinite_map_key_without_value() {
        let mut reader = CborReader::from_hex("bf01ff").unwrap();
        reader.read_start_map().unwrap();
        reader.read_unsigned_int().unwrap();
        assert!(matches!(
            reader.read_end_map(),
            Err(CborError::Malformed(_))
        ));
    }

    #[test]
    fn test_peek_tag_does_not_consume() {
        let mut reader = CborReader::from_hex("c074323031332d30332d32315432303a30343a30305a")
            .unwrap();
        assert_eq!(reader.peek_tag().unwrap(), CborTag::DateTimeString);
        assert_eq!(reader.read_tag().unwrap(), CborTag::DateTimeString);
        assert_eq!(reader.read_text_string().unwrap(), "2013-03-21T20:04:00Z");
    }

    #[test]
    fn test_read_big_int_wrong_tag_recoverable() {
        let mut reader = CborReader::from_hex("c101").unwrap();
        assert!(matches!(
            reader.read_big_int(),
            Err(CborError::TypeMismatch(_))
        ));
        // The cursor did not move; the tag is still readable.
        assert_eq!(reader.read_tag().unwrap(), CborTag::UnixTimeSeconds);
        assert_eq!(reader.read_unsigned_int().unwrap(), 1);
    }

    #[test]
    fn test_read_double_all_widths() {
        let mut reader = CborReader::from_hex("f93c00fa3f800000fb3ff0000000000000").unwrap();
        assert_eq!(
            reader.peek_state().unwrap(),
            CborReaderState::HalfPrecisionFloat
        );
        assert_eq!(reader.read_double().unwrap(), 1.0);
        assert_eq!(
            reader.peek_state().unwrap(),
            CborReaderState::SinglePrecisionFloat
        );
        assert_eq!(reader.read_double().unwrap(), 1.0);
        assert_eq!(
            reader.peek_state().unwrap(),
            CborReaderState::DoublePrecisionFloat
        );
        assert_eq!(reader.read_double().unwrap(), 1.0);
    }

    #[test]
    fn test_simple_values() {
        let mut reader = CborReader::from_hex("f4f5f6f7f820").unwrap();
        assert_eq!(reader.read_simple_value().unwrap(), CborSimpleValue::False);
        assert_eq!(reader.read_simple_value().unwrap(), CborSimpleValue::True);
        assert_eq!(reader.read_simple_value().unwrap(), CborSimpleValue::Null);
        assert_eq!(
            reader.read_simple_value().unwrap(),
            CborSimpleValue::Undefined
        );
        assert_eq!(
            reader.read_simple_value().unwrap(),
            CborSimpleValue::Unassigned(32)
        );
    }

    #[test]
    fn test_narrow_boolean_and_null_accessors() {
        let mut reader = CborReader::from_hex("f5f6").unwrap();
        assert_eq!(reader.peek_state().unwrap(), CborReaderState::Boolean);
        assert!(reader.read_boolean().unwrap());
        assert_eq!(reader.peek_state().unwrap(), CborReaderState::Null);
        assert!(matches!(
            reader.read_boolean(),
            Err(CborError::TypeMismatch(_))
        ));
        reader.read_null().unwrap();
    }

    #[test]
    fn test_clone_is_independent() {
        let mut reader = CborReader::from_hex("820102").unwrap();
        reader.read_start_array().unwrap();
        let mut speculative = reader.clone();
        assert_eq!(speculative.read_unsigned_int().unwrap(), 1);
        assert_eq!(speculative.read_unsigned_int().unwrap(), 2);
        // The original cursor is untouched.
        assert_eq!(reader.read_unsigned_int().unwrap(), 1);
    }

    #[test]
    fn test_skip_value_nested() {
        // Skipping the first element of [[1, [2, 3]], "x"] lands on "x".
        let mut reader = CborReader::from_hex("8282018202036178").unwrap();
        reader.read_start_array().unwrap();
        reader.skip_value().unwrap();
        assert_eq!(reader.read_text_string().unwrap(), "x");
        reader.read_end_array().unwrap();
    }

    #[test]
    fn test_skip_tagged_value() {
        let mut reader = CborReader::from_hex("c24901000000000000000005").unwrap();
        reader.skip_value().unwrap();
        assert_eq!(reader.read_unsigned_int().unwrap(), 5);
    }

    #[test]
    fn test_read_encoded_value_passthrough() {
        let mut reader = CborReader::from_hex("a1016161").unwrap();
        let raw = reader.read_encoded_value().unwrap();
        assert_eq!(hex::encode(&raw), "a1016161");
        assert_eq!(reader.peek_state().unwrap(), CborReaderState::Finished);

        // The extracted bytes decode on their own.
        let mut inner = CborReader::new(raw);
        assert_eq!(inner.read_start_map().unwrap(), Some(1));
        assert_eq!(inner.read_unsigned_int().unwrap(), 1);
        assert_eq!(inner.read_text_string().unwrap(), "a");
        inner.read_end_map().unwrap();
    }

    #[test]
    fn test_remainder_bytes() {
        let mut reader = CborReader::from_hex("01616102").unwrap();
        reader.read_unsigned_int().unwrap();
        reader.read_text_string().unwrap();
        assert_eq!(reader.bytes_remaining(), 1);
        assert_eq!(reader.remainder_bytes(), [0x02]);
    }

    #[test]
    fn test_from_hex_rejects_invalid_input() {
        assert!(matches!(
            CborReader::from_hex("zz"),
            Err(CborError::Malformed(_))
        ));
    }
}
