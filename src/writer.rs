//! Streaming CBOR encoder.

use crate::{
    BREAK, CborBigNum, CborError, CborSimpleValue, CborTag, FALSE, INDEFINITE, MAJOR_ARRAY,
    MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE, MAJOR_SIMPLE, MAJOR_TAG, MAJOR_TEXT, MAJOR_UNSIGNED,
    NULL, Result, TRUE, UNDEFINED,
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

/// Bookkeeping for one open array or map.
#[derive(Debug, Clone)]
struct Scope {
    kind: ScopeKind,
    /// Declared element count (arrays) or pair count (maps); `None` when
    /// indefinite-length.
    declared: Option<u64>,
    /// Data items written so far inside this scope. Map keys and values
    /// count individually.
    written: u64,
}

impl Scope {
    /// Maximum number of items this scope accepts, if declared.
    fn capacity(&self) -> Option<u64> {
        self.declared.map(|n| match self.kind {
            ScopeKind::Array => n,
            ScopeKind::Map => n.saturating_mul(2),
        })
    }
}

/// Streaming CBOR encoder producing a single linear byte buffer.
///
/// Write operations return the writer itself so calls chain with `?`. The
/// writer validates container arity as the document is built: definite-length
/// scopes reject writes past their declared count, and `end_array`/`end_map`
/// verify that the declared count was met. [`CborWriter::encode`] is
/// idempotent and leaves the writer state untouched.
///
/// A writer is a single-owner value; concurrent use from multiple threads
/// requires external synchronization.
///
/// # Example
/// ```
/// use cardano_cbor::CborWriter;
///
/// let mut writer = CborWriter::new();
/// writer
///     .start_map(Some(1))?
///     .write_unsigned_int(1)?
///     .write_unsigned_int(2)?
///     .end_map()?;
/// assert_eq!(writer.encode_hex()?, "a10102");
/// # Ok::<(), cardano_cbor::CborError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct CborWriter {
    output: Vec<u8>,
    scopes: Vec<Scope>,
    /// Tags emitted since the last complete data item.
    pending_tags: u64,
    last_error: Option<String>,
}

impl CborWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        CborWriter::default()
    }

    /// Human-readable description of the most recent failure, for
    /// diagnostics.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn fail(&mut self, err: CborError) -> CborError {
        self.last_error = Some(err.to_string());
        err
    }

    /// Emit a major type header with its argument in shortest form.
    fn write_type_value(&mut self, major: u8, value: u64) {
        if value < 24 {
            self.output.push((major << 5) | value as u8);
        } else if value < 256 {
            self.output.push((major << 5) | 24);
            self.output.push(value as u8);
        } else if value < 65536 {
            self.output.push((major << 5) | 25);
            self.output.extend_from_slice(&(value as u16).to_be_bytes());
        } else if value < 4294967296 {
            self.output.push((major << 5) | 26);
            self.output.extend_from_slice(&(value as u32).to_be_bytes());
        } else {
            self.output.push((major << 5) | 27);
            self.output.extend_from_slice(&value.to_be_bytes());
        }
    }

    /// Reject the write if the innermost definite-length scope is full.
    fn begin_item(&mut self, op: &'static str) -> Result<()> {
        let violation = self.scopes.last().and_then(|scope| {
            scope
                .capacity()
                .filter(|capacity| scope.written >= *capacity)
                .map(|capacity| {
                    CborError::ContainerMismatch(format!(
                        "{op}: definite-length {} already holds its declared {} items",
                        scope.kind.name(),
                        capacity,
                    ))
                })
        });
        match violation {
            Some(err) => Err(self.fail(err)),
            None => Ok(()),
        }
    }

    /// Account for one complete data item written into the innermost scope.
    fn finish_item(&mut self) {
        self.pending_tags = 0;
        if let Some(scope) = self.scopes.last_mut() {
            scope.written += 1;
        }
    }

    /// Encode a 64-bit unsigned integer (major type 0).
    pub fn write_unsigned_int(&mut self, value: u64) -> Result<&mut Self> {
        self.begin_item("write_unsigned_int")?;
        self.write_type_value(MAJOR_UNSIGNED, value);
        self.finish_item();
        Ok(self)
    }

    /// Encode a 64-bit signed integer (major type 0 or 1 depending on sign).
    pub fn write_signed_int(&mut self, value: i64) -> Result<&mut Self> {
        self.begin_item("write_signed_int")?;
        if value >= 0 {
            self.write_type_value(MAJOR_UNSIGNED, value as u64);
        } else {
            self.write_type_value(MAJOR_NEGATIVE, (-1 - value) as u64);
        }
        self.finish_item();
        Ok(self)
    }

    /// Encode an integer anywhere in the full CBOR range [-2^64, 2^64 - 1].
    ///
    /// Values outside that range must go through
    /// [`CborWriter::write_big_int`].
    pub fn write_int(&mut self, value: i128) -> Result<&mut Self> {
        self.begin_item("write_int")?;
        if value >= 0 {
            let bits = u64::try_from(value).map_err(|_| {
                self.fail(CborError::OutOfRange(format!(
                    "write_int: {value} exceeds 2^64 - 1; use write_big_int"
                )))
            })?;
            self.write_type_value(MAJOR_UNSIGNED, bits);
        } else {
            let bits = u64::try_from(-1 - value).map_err(|_| {
                self.fail(CborError::OutOfRange(format!(
                    "write_int: {value} is below -2^64; use write_big_int"
                )))
            })?;
            self.write_type_value(MAJOR_NEGATIVE, bits);
        }
        self.finish_item();
        Ok(self)
    }

    /// Encode an arbitrary-precision integer using the bignum convention:
    /// tag 2 (non-negative) or tag 3 (negative) wrapping the big-endian
    /// magnitude byte string.
    pub fn write_big_int(&mut self, value: &CborBigNum) -> Result<&mut Self> {
        self.begin_item("write_big_int")?;
        let tag = if value.is_negative() {
            CborTag::NegativeBigNum
        } else {
            CborTag::UnsignedBigNum
        };
        self.write_type_value(MAJOR_TAG, tag.value());
        self.write_type_value(MAJOR_BYTES, value.magnitude().len() as u64);
        self.output.extend_from_slice(value.magnitude());
        self.finish_item();
        Ok(self)
    }

    /// Encode a byte string (major type 2).
    pub fn write_byte_string(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        self.begin_item("write_byte_string")?;
        self.write_type_value(MAJOR_BYTES, bytes.len() as u64);
        self.output.extend_from_slice(bytes);
        self.finish_item();
        Ok(self)
    }

    /// Encode a text string (major type 3). The length header carries the
    /// UTF-8 byte count, not the character count.
    pub fn write_text_string(&mut self, text: &str) -> Result<&mut Self> {
        self.begin_item("write_text_string")?;
        self.write_type_value(MAJOR_TEXT, text.len() as u64);
        self.output.extend_from_slice(text.as_bytes());
        self.finish_item();
        Ok(self)
    }

    /// Encode a boolean.
    pub fn write_boolean(&mut self, value: bool) -> Result<&mut Self> {
        self.begin_item("write_boolean")?;
        self.output
            .push((MAJOR_SIMPLE << 5) | if value { TRUE } else { FALSE });
        self.finish_item();
        Ok(self)
    }

    /// Encode the null simple value.
    pub fn write_null(&mut self) -> Result<&mut Self> {
        self.begin_item("write_null")?;
        self.output.push((MAJOR_SIMPLE << 5) | NULL);
        self.finish_item();
        Ok(self)
    }

    /// Encode the undefined simple value.
    pub fn write_undefined(&mut self) -> Result<&mut Self> {
        self.begin_item("write_undefined")?;
        self.output.push((MAJOR_SIMPLE << 5) | UNDEFINED);
        self.finish_item();
        Ok(self)
    }

    /// Encode a major type 7 simple value.
    ///
    /// Codes 24..32 are reserved by RFC 8949 §3.3 and rejected.
    pub fn write_simple_value(&mut self, value: CborSimpleValue) -> Result<&mut Self> {
        let code = u8::from(value);
        if (24..32).contains(&code) {
            let err =
                CborError::Malformed(format!("write_simple_value: code {code} is reserved"));
            return Err(self.fail(err));
        }
        self.begin_item("write_simple_value")?;
        if code < 24 {
            self.output.push((MAJOR_SIMPLE << 5) | code);
        } else {
            self.output.push((MAJOR_SIMPLE << 5) | 24);
            self.output.push(code);
        }
        self.finish_item();
        Ok(self)
    }

    /// Encode an IEEE 754 double-precision float.
    ///
    /// Emits the 8-byte double encoding, or the shortest lossless of the
    /// f16/f32/f64 encodings when the `compact_floats` feature is enabled.
    pub fn write_double(&mut self, value: f64) -> Result<&mut Self> {
        self.begin_item("write_double")?;
        self.push_double(value);
        self.finish_item();
        Ok(self)
    }

    #[cfg(not(feature = "compact_floats"))]
    fn push_double(&mut self, value: f64) {
        self.output.push((MAJOR_SIMPLE << 5) | 27);
        self.output.extend_from_slice(&value.to_be_bytes());
    }

    #[cfg(feature = "compact_floats")]
    fn push_double(&mut self, value: f64) {
        if value.is_nan() {
            self.output.push((MAJOR_SIMPLE << 5) | 25);
            self.output.extend_from_slice(&0x7e00u16.to_be_bytes());
            return;
        }
        let single = value as f32;
        if f64::from(single) != value {
            self.output.push((MAJOR_SIMPLE << 5) | 27);
            self.output.extend_from_slice(&value.to_be_bytes());
            return;
        }
        let half = half::f16::from_f32(single);
        if f32::from(half) == single {
            self.output.push((MAJOR_SIMPLE << 5) | 25);
            self.output.extend_from_slice(&half.to_bits().to_be_bytes());
        } else {
            self.output.push((MAJOR_SIMPLE << 5) | 26);
            self.output.extend_from_slice(&single.to_be_bytes());
        }
    }

    /// Open an array scope. `size` is the declared element count, or `None`
    /// for an indefinite-length array closed by the break byte on
    /// [`CborWriter::end_array`].
    pub fn start_array(&mut self, size: Option<u64>) -> Result<&mut Self> {
        self.begin_item("start_array")?;
        match size {
            Some(count) => self.write_type_value(MAJOR_ARRAY, count),
            None => self.output.push((MAJOR_ARRAY << 5) | INDEFINITE),
        }
        self.finish_item();
        self.scopes.push(Scope {
            kind: ScopeKind::Array,
            declared: size,
            written: 0,
        });
        Ok(self)
    }

    /// Close the innermost array scope.
    pub fn end_array(&mut self) -> Result<&mut Self> {
        self.end_scope(ScopeKind::Array, "end_array")
    }

    /// Open a map scope. `size` is the declared pair count, or `None` for an
    /// indefinite-length map. Keys and values are written alternately with
    /// the ordinary `write_*` calls.
    pub fn start_map(&mut self, size: Option<u64>) -> Result<&mut Self> {
        self.begin_item("start_map")?;
        match size {
            Some(count) => self.write_type_value(MAJOR_MAP, count),
            None => self.output.push((MAJOR_MAP << 5) | INDEFINITE),
        }
        self.finish_item();
        self.scopes.push(Scope {
            kind: ScopeKind::Map,
            declared: size,
            written: 0,
        });
        Ok(self)
    }

    /// Close the innermost map scope.
    pub fn end_map(&mut self) -> Result<&mut Self> {
        self.end_scope(ScopeKind::Map, "end_map")
    }

    fn end_scope(&mut self, kind: ScopeKind, op: &'static str) -> Result<&mut Self> {
        if self.pending_tags > 0 {
            let err = CborError::ContainerMismatch(format!(
                "{op}: a tag is still waiting for its data item"
            ));
            return Err(self.fail(err));
        }
        let innermost = self.scopes.last().map(|s| (s.kind, s.declared, s.written));
        let (found, declared, written) = match innermost {
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
        if kind == ScopeKind::Map && written % 2 != 0 {
            let err =
                CborError::ContainerMismatch(format!("{op}: map has a key without a value"));
            return Err(self.fail(err));
        }
        match declared {
            Some(count) => {
                let expected = match kind {
                    ScopeKind::Array => count,
                    ScopeKind::Map => count.saturating_mul(2),
                };
                if written != expected {
                    let err = CborError::ContainerMismatch(format!(
                        "{op}: declared size {count} does not reconcile with {written} written items"
                    ));
                    return Err(self.fail(err));
                }
            }
            None => self.output.push(BREAK),
        }
        self.scopes.pop();
        Ok(self)
    }

    /// Emit a semantic tag header (major type 6). The tagged data item itself
    /// must be written by a subsequent call.
    pub fn write_tag(&mut self, tag: CborTag) -> Result<&mut Self> {
        self.begin_item("write_tag")?;
        self.write_type_value(MAJOR_TAG, tag.value());
        self.pending_tags += 1;
        Ok(self)
    }

    /// Splice a pre-encoded CBOR data item into the stream verbatim.
    ///
    /// The bytes are not re-parsed; the caller asserts they form exactly one
    /// well-formed data item.
    pub fn write_encoded(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        if bytes.is_empty() {
            let err = CborError::Malformed("write_encoded: empty buffer".into());
            return Err(self.fail(err));
        }
        self.begin_item("write_encoded")?;
        self.output.extend_from_slice(bytes);
        self.finish_item();
        Ok(self)
    }

    /// Return the accumulated document.
    ///
    /// Idempotent: the writer state is left untouched and `encode` may be
    /// called again. Fails while any container scope is still open.
    pub fn encode(&mut self) -> Result<Vec<u8>> {
        if let Some(scope) = self.scopes.last() {
            let err =
                CborError::ContainerMismatch(format!("encode: unclosed {}", scope.kind.name()));
            return Err(self.fail(err));
        }
        if self.pending_tags > 0 {
            let err = CborError::ContainerMismatch(
                "encode: a tag is still waiting for its data item".into(),
            );
            return Err(self.fail(err));
        }
        Ok(self.output.clone())
    }

    /// Like [`CborWriter::encode`], returning the document as lowercase hex.
    pub fn encode_hex(&mut self) -> Result<String> {
        self.encode().map(hex::encode)
    }

    /// Clear all written bytes and container bookkeeping, returning the
    /// writer to its just-constructed state.
    pub fn reset(&mut self) -> &mut Self {
        self.output.clear();
        self.scopes.clear();
        self.pending_tags = 0;
        self.last_error = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortest_form_headers() {
        let mut writer = CborWriter::new();
        writer.write_unsigned_int(0).unwrap();
        writer.write_unsigned_int(23).unwrap();
        writer.write_unsigned_int(24).unwrap();
        writer.write_unsigned_int(255).unwrap();
        writer.write_unsigned_int(256).unwrap();
        writer.write_unsigned_int(65535).unwrap();
        writer.write_unsigned_int(65536).unwrap();
        writer.write_unsigned_int(u64::MAX).unwrap();
        assert_eq!(
            writer.encode_hex().unwrap(),
            "0017181818ff19010019ffff1a000100001bffffffffffffffff"
        );
    }

    #[test]
    fn test_write_int_dispatches_on_sign() {
        let mut writer = CborWriter::new();
        writer.write_int(5).unwrap().write_int(-5).unwrap();
        assert_eq!(writer.encode_hex().unwrap(), "0524");
    }

    #[test]
    fn test_write_int_full_range() {
        let mut writer = CborWriter::new();
        writer
            .write_int((1i128 << 64) - 1)
            .unwrap()
            .write_int(-(1i128 << 64))
            .unwrap();
        assert_eq!(
            writer.encode_hex().unwrap(),
            "1bffffffffffffffff3bffffffffffffffff"
        );
    }

    #[test]
    fn test_write_int_out_of_range() {
        let mut writer = CborWriter::new();
        assert!(matches!(
            writer.write_int(1i128 << 64),
            Err(CborError::OutOfRange(_))
        ));
        assert!(matches!(
            writer.write_int(-(1i128 << 64) - 1),
            Err(CborError::OutOfRange(_))
        ));
        assert!(writer.last_error().is_some());
    }

    #[test]
    fn test_definite_array_count_enforced() {
        let mut writer = CborWriter::new();
        writer.start_array(Some(2)).unwrap();
        writer.write_unsigned_int(1).unwrap();
        // Ending early does not reconcile with the declared size.
        assert!(matches!(
            writer.end_array(),
            Err(CborError::ContainerMismatch(_))
        ));
        writer.write_unsigned_int(2).unwrap();
        // A third element would exceed the declared size.
        assert!(matches!(
            writer.write_unsigned_int(3),
            Err(CborError::ContainerMismatch(_))
        ));
        writer.end_array().unwrap();
        assert_eq!(writer.encode_hex().unwrap(), "820102");
    }

    #[test]
    fn test_end_without_start() {
        let mut writer = CborWriter::new();
        assert!(matches!(
            writer.end_array(),
            Err(CborError::ContainerMismatch(_))
        ));
    }

    #[test]
    fn test_mismatched_scope_kinds() {
        let mut writer = CborWriter::new();
        writer.start_array(None).unwrap();
        assert!(matches!(
            writer.end_map(),
            Err(CborError::ContainerMismatch(_))
        ));
        writer.end_array().unwrap();
        assert_eq!(writer.encode_hex().unwrap(), "9fff");
    }

    #[test]
    fn test_map_key_without_value() {
        let mut writer = CborWriter::new();
        writer.start_map(None).unwrap();
        writer.write_unsigned_int(1).unwrap();
        assert!(matches!(
            writer.end_map(),
            Err(CborError::ContainerMismatch(_))
        ));
        writer.write_unsigned_int(2).unwrap();
        writer.end_map().unwrap();
        assert_eq!(writer.encode_hex().unwrap(), "bf0102ff");
    }

    #[test]
    fn test_dangling_tag_rejected() {
        let mut writer = CborWriter::new();
        writer.write_tag(CborTag::Uri).unwrap();
        assert!(matches!(
            writer.encode(),
            Err(CborError::ContainerMismatch(_))
        ));
        writer.write_text_string("https://example.com").unwrap();
        assert!(writer.encode().is_ok());
    }

    #[test]
    fn test_tag_satisfied_by_container() {
        let mut writer = CborWriter::new();
        writer.write_tag(CborTag::Set).unwrap();
        writer.start_array(Some(1)).unwrap();
        writer.write_unsigned_int(7).unwrap();
        writer.end_array().unwrap();
        assert_eq!(writer.encode_hex().unwrap(), "d901028107");
    }

    #[test]
    fn test_reserved_simple_values_rejected() {
        let mut writer = CborWriter::new();
        for code in 24u8..32 {
            assert!(matches!(
                writer.write_simple_value(CborSimpleValue::Unassigned(code)),
                Err(CborError::Malformed(_))
            ));
        }
        writer
            .write_simple_value(CborSimpleValue::Unassigned(32))
            .unwrap();
        assert_eq!(writer.encode_hex().unwrap(), "f820");
    }

    #[test]
    fn test_encode_is_idempotent() {
        let mut writer = CborWriter::new();
        writer.write_text_string("IETF").unwrap();
        let first = writer.encode().unwrap();
        let second = writer.encode().unwrap();
        assert_eq!(first, second);
        // The writer remains usable after encode.
        writer.write_unsigned_int(1).unwrap();
        assert_eq!(writer.encode_hex().unwrap(), "644945544601");
    }

    #[test]
    fn test_reset_matches_fresh_writer() {
        let mut writer = CborWriter::new();
        writer.start_array(None).unwrap();
        writer.write_unsigned_int(1).unwrap();
        writer.reset();
        assert_eq!(writer.encode().unwrap(), CborWriter::new().encode().unwrap());
        assert!(writer.last_error().is_none());
    }

    #[test]
    fn test_write_encoded_splices_verbatim() {
        let mut inner = CborWriter::new();
        inner.write_text_string("sub").unwrap();
        let encoded = inner.encode().unwrap();

        let mut writer = CborWriter::new();
        writer.start_array(Some(2)).unwrap();
        writer.write_encoded(&encoded).unwrap();
        writer.write_unsigned_int(0).unwrap();
        writer.end_array().unwrap();
        assert_eq!(writer.encode_hex().unwrap(), "826373756200");
    }

    #[cfg(not(feature = "compact_floats"))]
    #[test]
    fn test_double_always_eight_bytes() {
        let mut writer = CborWriter::new();
        writer.write_double(1.0).unwrap();
        assert_eq!(writer.encode_hex().unwrap(), "fb3ff0000000000000");
    }

    #[cfg(feature = "compact_floats")]
    #[test]
    fn test_double_shortest_lossless() {
        let mut writer = CborWriter::new();
        writer.write_double(1.0).unwrap();
        writer.write_double(100000.0).unwrap();
        writer.write_double(1.1).unwrap();
        writer.write_double(f64::INFINITY).unwrap();
        assert_eq!(
            writer.encode_hex().unwrap(),
            "f93c00fa47c35000fb3ff199999999999af97c00"
        );
    }
}
