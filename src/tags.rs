//! Well-known CBOR semantic tags.

/// A CBOR semantic tag (major type 6) qualifying the interpretation of the
/// data item that follows it.
///
/// The variants cover the well-known tags this library names; any other tag
/// number round-trips through [`CborTag::Custom`]. Construct tags with
/// `CborTag::from(n)` so well-known numbers normalize to their named variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CborTag {
    /// Standard date/time string (RFC 3339), tag 0
    DateTimeString,
    /// Epoch-based date/time, tag 1
    UnixTimeSeconds,
    /// Positive bignum, tag 2
    UnsignedBigNum,
    /// Negative bignum, tag 3
    NegativeBigNum,
    /// Decimal fraction, tag 4
    DecimalFraction,
    /// Bigfloat, tag 5
    BigFloat,
    /// Expected conversion to base64url, tag 21
    ToBase64Url,
    /// Expected conversion to base64, tag 22
    ToBase64,
    /// Expected conversion to base16, tag 23
    ToBase16,
    /// Embedded CBOR data item, tag 24
    EncodedCborDataItem,
    /// Rational number, tag 30
    RationalNumber,
    /// URI (RFC 3986), tag 32
    Uri,
    /// Base64url-encoded text, tag 33
    Base64Url,
    /// Base64-encoded text, tag 34
    Base64,
    /// Regular expression, tag 35
    Regex,
    /// MIME message, tag 36
    MimeMessage,
    /// Mathematical finite set, tag 258
    Set,
    /// Map with key uniqueness, tag 259
    Map,
    /// Self-described CBOR, tag 55799
    SelfDescribeCbor,
    /// A tag outside the well-known set.
    Custom(u64),
}

impl CborTag {
    /// The raw tag number.
    pub fn value(self) -> u64 {
        u64::from(self)
    }
}

impl From<u64> for CborTag {
    fn from(value: u64) -> Self {
        match value {
            0 => CborTag::DateTimeString,
            1 => CborTag::UnixTimeSeconds,
            2 => CborTag::UnsignedBigNum,
            3 => CborTag::NegativeBigNum,
            4 => CborTag::DecimalFraction,
            5 => CborTag::BigFloat,
            21 => CborTag::ToBase64Url,
            22 => CborTag::ToBase64,
            23 => CborTag::ToBase16,
            24 => CborTag::EncodedCborDataItem,
            30 => CborTag::RationalNumber,
            32 => CborTag::Uri,
            33 => CborTag::Base64Url,
            34 => CborTag::Base64,
            35 => CborTag::Regex,
            36 => CborTag::MimeMessage,
            258 => CborTag::Set,
            259 => CborTag::Map,
            55799 => CborTag::SelfDescribeCbor,
            other => CborTag::Custom(other),
        }
    }
}

impl From<CborTag> for u64 {
    fn from(tag: CborTag) -> Self {
        match tag {
            CborTag::DateTimeString => 0,
            CborTag::UnixTimeSeconds => 1,
            CborTag::UnsignedBigNum => 2,
            CborTag::NegativeBigNum => 3,
            CborTag::DecimalFraction => 4,
            CborTag::BigFloat => 5,
            CborTag::ToBase64Url => 21,
            CborTag::ToBase64 => 22,
            CborTag::ToBase16 => 23,
            CborTag::EncodedCborDataItem => 24,
            CborTag::RationalNumber => 30,
            CborTag::Uri => 32,
            CborTag::Base64Url => 33,
            CborTag::Base64 => 34,
            CborTag::Regex => 35,
            CborTag::MimeMessage => 36,
            CborTag::Set => 258,
            CborTag::Map => 259,
            CborTag::SelfDescribeCbor => 55799,
            CborTag::Custom(value) => value,
        }
    }
}
