use std::fmt;
use std::sync::Arc;

use half::f16;
use num_bigint::BigInt;
use time::OffsetDateTime;
use url::Url;

use crate::encode::Encoder;
use crate::CborError;

/// A decoded or to-be-encoded CBOR item.
///
/// The first group of variants mirrors the wire-level data model; the second
/// group holds the values produced by the built-in tag interpreters, each of
/// which the encoder maps back to its tagged wire form.
#[derive(Debug, Clone)]
pub enum Value {
    /// Major type 0/1 integer. Invariant: `-(2^64) <= v < 2^64`; values the
    /// encoder receives outside that range are routed through the bignum
    /// path.
    Integer(i128),
    /// Byte string (major type 2), with an optional JSON-view hint set by
    /// tags 21/22/23.
    Bytes(Bytes),
    /// UTF-8 text string (major type 3).
    Text(String),
    /// Array (major type 4).
    Array(Vec<Value>),
    /// Map (major type 5). Insertion order is preserved and duplicate keys
    /// are kept as decoded.
    Map(Vec<(Value, Value)>),
    /// A tag the registry left uninterpreted, or whose interpreter failed
    /// (see [`Tagged::err`]).
    Tag(Box<Tagged>),
    /// Simple values 20 and 21.
    Bool(bool),
    /// Simple value 22.
    Null,
    /// Simple value 23.
    Undefined,
    /// An opaque simple value in 0..=19 or 32..=255.
    Simple(u8),
    /// Half, single or double precision float, widened to `f64`.
    Float(f64),

    /// Tag 2/3 product: an arbitrary-precision integer.
    BigNum(BigInt),
    /// Tag 4 product: `mantissa * 10^exponent`.
    Decimal(Decimal),
    /// Tag 5 product: `mantissa * 2^exponent`.
    BigFloat(BigFloat),
    /// Tag 0/1 product: a calendar timestamp.
    DateTime(OffsetDateTime),
    /// Tag 32 product: a parsed URI.
    Uri(Url),
    /// Tag 35 product: a compiled regular expression.
    Regexp(Regexp),
    /// Tag 258 product: a set of elements. Order preserved, no
    /// deduplication (matching the map policy).
    Set(Vec<Value>),
    /// Tag 64..=87 product: a typed numeric array (RFC 8746).
    TypedArray(TypedArray),

    /// A user value carrying its own encoder callback. Compared by identity.
    Extension(Arc<dyn Extension>),
}

impl Value {
    /// Wrap `value` under `tag` without interpretation.
    #[must_use]
    pub fn tagged(tag: u64, value: Value) -> Self {
        Self::Tag(Box::new(Tagged {
            tag,
            value,
            err: None,
        }))
    }

    /// The integer value, if this is an [`Value::Integer`].
    #[must_use]
    pub const fn as_integer(&self) -> Option<i128> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// The text, if this is a [`Value::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The byte-string payload, if this is a [`Value::Bytes`].
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    /// The elements, if this is a [`Value::Array`].
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The entries, if this is a [`Value::Map`].
    #[must_use]
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// The float value, if this is a [`Value::Float`].
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// The boolean, if this is a [`Value::Bool`].
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for [`Value::Undefined`].
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Tag(a), Self::Tag(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Null, Self::Null) | (Self::Undefined, Self::Undefined) => true,
            (Self::Simple(a), Self::Simple(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::BigNum(a), Self::BigNum(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::BigFloat(a), Self::BigFloat(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::Uri(a), Self::Uri(b)) => a == b,
            (Self::Regexp(a), Self::Regexp(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => a == b,
            (Self::TypedArray(a), Self::TypedArray(b)) => a == b,
            (Self::Extension(a), Self::Extension(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i128::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(i128::from(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Integer(i128::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Bytes::new(value))
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::Array(value)
    }
}

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Self {
        Self::BigNum(value)
    }
}

/// How a byte string renders when serialized to a text-only format.
///
/// Set by the expected-conversion tags 21, 22 and 23; never affects the CBOR
/// wire form or value equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteView {
    /// Tag 21: base64url without padding.
    Base64Url,
    /// Tag 22: base64.
    Base64,
    /// Tag 23: base16 (lowercase hex).
    Base16,
}

/// A byte-string payload with an optional [`ByteView`] hint.
#[derive(Debug, Clone, Default)]
pub struct Bytes {
    data: Vec<u8>,
    view: Option<ByteView>,
}

impl Bytes {
    /// Wrap raw bytes with no view hint.
    #[must_use]
    pub const fn new(data: Vec<u8>) -> Self {
        Self { data, view: None }
    }

    /// Wrap raw bytes with an explicit view hint.
    #[must_use]
    pub const fn with_view(data: Vec<u8>, view: ByteView) -> Self {
        Self {
            data,
            view: Some(view),
        }
    }

    /// The payload.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// The view hint, if one was set.
    #[must_use]
    pub const fn view(&self) -> Option<ByteView> {
        self.view
    }

    /// Consume the wrapper, returning the payload.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Number of payload bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn set_view_if_unset(&mut self, view: ByteView) {
        if self.view.is_none() {
            self.view = Some(view);
        }
    }
}

impl PartialEq for Bytes {
    fn eq(&self, other: &Self) -> bool {
        // The view hint is presentation metadata, not part of the value.
        self.data == other.data
    }
}

impl Eq for Bytes {}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// A tag number wrapping an inner item.
///
/// Produced for tags without a registered interpreter, for tags whose
/// built-in policy is to stay tagged (33/34), and for interpreter failures in
/// lenient mode, where `err` carries the failure and `value` the raw payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged {
    /// The tag number.
    pub tag: u64,
    /// The inner item.
    pub value: Value,
    /// Interpreter failure attached in lenient mode.
    pub err: Option<Box<str>>,
}

/// A decimal fraction: `mantissa * 10^exponent` (tag 4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    /// Base-10 exponent.
    pub exponent: i64,
    /// Arbitrary-precision mantissa.
    pub mantissa: BigInt,
}

/// A binary-scaled value: `mantissa * 2^exponent` (tag 5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigFloat {
    /// Base-2 exponent.
    pub exponent: i64,
    /// Arbitrary-precision mantissa.
    pub mantissa: BigInt,
}

/// A compiled regular expression that remembers its source pattern.
///
/// Equality and the encoded form use the pattern; the compiled matcher is
/// available through [`Regexp::regex`].
#[derive(Debug, Clone)]
pub struct Regexp {
    pattern: Box<str>,
    inner: regex::Regex,
}

impl Regexp {
    /// Compile `pattern`.
    ///
    /// # Errors
    ///
    /// Returns the underlying compile error when the pattern is invalid.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: pattern.into(),
            inner: regex::Regex::new(pattern)?,
        })
    }

    /// The source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The compiled matcher.
    #[must_use]
    pub const fn regex(&self) -> &regex::Regex {
        &self.inner
    }
}

impl PartialEq for Regexp {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for Regexp {}

/// A homogeneous numeric array (RFC 8746, tags 64..=87).
///
/// Stored in native element types; the encoder always emits the
/// little-endian tag of each element kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedArray {
    /// Unsigned 8-bit elements (tags 64 and 68).
    U8(Vec<u8>),
    /// Unsigned 16-bit elements (tags 65/69).
    U16(Vec<u16>),
    /// Unsigned 32-bit elements (tags 66/70).
    U32(Vec<u32>),
    /// Unsigned 64-bit elements (tags 67/71).
    U64(Vec<u64>),
    /// Signed 8-bit elements (tag 72).
    I8(Vec<i8>),
    /// Signed 16-bit elements (tags 73/77).
    I16(Vec<i16>),
    /// Signed 32-bit elements (tags 74/78).
    I32(Vec<i32>),
    /// Signed 64-bit elements (tags 75/79).
    I64(Vec<i64>),
    /// Half-precision float elements (tags 80/84).
    F16(Vec<f16>),
    /// Single-precision float elements (tags 81/85).
    F32(Vec<f32>),
    /// Double-precision float elements (tags 82/86).
    F64(Vec<f64>),
}

impl TypedArray {
    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::U64(v) => v.len(),
            Self::I8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::F16(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
        }
    }

    /// Returns `true` if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The little-endian RFC 8746 tag for this element kind.
    pub(crate) const fn tag(&self) -> u64 {
        match self {
            Self::U8(_) => 64,
            Self::U16(_) => 69,
            Self::U32(_) => 70,
            Self::U64(_) => 71,
            Self::I8(_) => 72,
            Self::I16(_) => 77,
            Self::I32(_) => 78,
            Self::I64(_) => 79,
            Self::F16(_) => 84,
            Self::F32(_) => 85,
            Self::F64(_) => 86,
        }
    }

    /// The raw little-endian byte-string payload.
    pub(crate) fn to_le_bytes(&self) -> Vec<u8> {
        fn flat<T: Copy, const W: usize>(items: &[T], f: fn(T) -> [u8; W]) -> Vec<u8> {
            let mut out = Vec::with_capacity(items.len() * W);
            for item in items {
                out.extend_from_slice(&f(*item));
            }
            out
        }

        match self {
            Self::U8(v) => v.clone(),
            Self::I8(v) => v.iter().map(|b| *b as u8).collect(),
            Self::U16(v) => flat(v, u16::to_le_bytes),
            Self::U32(v) => flat(v, u32::to_le_bytes),
            Self::U64(v) => flat(v, u64::to_le_bytes),
            Self::I16(v) => flat(v, i16::to_le_bytes),
            Self::I32(v) => flat(v, i32::to_le_bytes),
            Self::I64(v) => flat(v, i64::to_le_bytes),
            Self::F16(v) => flat(v, f16::to_le_bytes),
            Self::F32(v) => flat(v, f32::to_le_bytes),
            Self::F64(v) => flat(v, f64::to_le_bytes),
        }
    }
}

/// A user value that encodes itself.
///
/// The callback receives the live [`Encoder`] and may push any sequence of
/// items through it, including values that recurse back into the dispatch.
/// The cycle detector tracks extension identities across such re-entry.
pub trait Extension: fmt::Debug + Send + Sync {
    /// Short name used in diagnostics (`Unknown type: <name>`).
    fn type_name(&self) -> &'static str;

    /// Emit this value's CBOR form.
    ///
    /// # Errors
    ///
    /// Propagates encoder failures; return
    /// [`ErrorCode::UnknownType`](crate::ErrorCode) to signal an
    /// unsupported payload.
    fn encode_cbor(&self, encoder: &mut Encoder) -> Result<(), CborError>;
}

/// Recursively apply a [`ByteView`] to every byte string in `value`.
///
/// Already-marked byte strings keep their view, so the innermost of nested
/// expected-conversion tags wins.
pub(crate) fn mark_views(value: &mut Value, view: ByteView) {
    match value {
        Value::Bytes(b) => b.set_view_if_unset(view),
        Value::Array(items) | Value::Set(items) => {
            for item in items {
                mark_views(item, view);
            }
        }
        Value::Map(entries) => {
            for (k, v) in entries {
                mark_views(k, view);
                mark_views(v, view);
            }
        }
        Value::Tag(t) => mark_views(&mut t.value, view),
        _ => {}
    }
}
