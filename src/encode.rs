//! Encoding: dispatch from [`Value`] variants to CBOR items.

use std::fmt;
use std::sync::Arc;

use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::float::write_float;
use crate::head::{
    self, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE, MAJOR_SIMPLE, MAJOR_TAG,
    MAJOR_TEXT, MAJOR_UNSIGNED,
};
use crate::loops::LoopDetector;
use crate::tags::{
    TAG_BIGFLOAT, TAG_DATETIME_STRING, TAG_DECIMAL_FRACTION, TAG_EPOCH_DATETIME,
    TAG_NEGATIVE_BIGNUM, TAG_POSITIVE_BIGNUM, TAG_REGEXP, TAG_SET, TAG_URI,
};
use crate::value::Value;
use crate::{CborError, ErrorCode};

/// Default maximum chunk payload for [`encode_indefinite`], in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// What the encoder emits for [`Value::Undefined`].
#[derive(Clone, Default)]
pub enum UndefinedPolicy {
    /// Emit the `undefined` simple value (`0xf7`).
    #[default]
    Emit,
    /// Splice the given bytes verbatim. The caller vouches that they form
    /// one well-formed item.
    Raw(Vec<u8>),
    /// Encode the given value in its place.
    Replace(Value),
    /// Call the function and encode its result in its place.
    With(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl fmt::Debug for UndefinedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Emit => f.write_str("Emit"),
            Self::Raw(bytes) => f.debug_tuple("Raw").field(bytes).finish(),
            Self::Replace(value) => f.debug_tuple("Replace").field(value).finish(),
            Self::With(_) => f.write_str("With(..)"),
        }
    }
}

/// Wire form for [`Value::DateTime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFormat {
    /// Tag 1 with integer epoch seconds when whole, float otherwise.
    #[default]
    Number,
    /// Tag 1, always float epoch seconds.
    Float,
    /// Tag 1, epoch seconds rounded to an integer.
    Int,
    /// Tag 0 with an RFC 3339 string.
    String,
}

/// Options recognized by [`encode_one`] and [`encode_indefinite`].
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Policy for [`Value::Undefined`] inputs.
    pub undefined: UndefinedPolicy,
    /// Fail with `UndefinedMapKey` when a map key is `undefined`.
    pub disallow_undefined_keys: bool,
    /// Wire form for dates.
    pub date_format: DateFormat,
    /// Emit bignums that fit 64 bits as plain major type 0/1 integers.
    pub collapse_big_integers: bool,
    /// Drop map entries whose value is `undefined`.
    pub omit_undefined_entries: bool,
    /// Track live containers and fail on re-entry.
    pub detect_loops: bool,
    /// Maximum chunk payload for indefinite-length strings, in bytes.
    pub chunk_size: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            undefined: UndefinedPolicy::Emit,
            disallow_undefined_keys: false,
            date_format: DateFormat::Number,
            collapse_big_integers: false,
            omit_undefined_entries: false,
            detect_loops: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Streaming encoder writing CBOR into an owned buffer.
///
/// Emitted bytes strictly follow the order of `push*` calls. A failed push
/// truncates back to the item boundary, so the buffer never holds a partial
/// item.
#[derive(Debug, Default)]
pub struct Encoder {
    out: Vec<u8>,
    options: EncodeOptions,
    detector: Option<LoopDetector>,
}

impl Encoder {
    /// Construct an encoder with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct an encoder with the given options.
    #[must_use]
    pub fn with_options(options: EncodeOptions) -> Self {
        let detector = options.detect_loops.then(LoopDetector::new);
        Self {
            out: Vec::new(),
            options,
            detector,
        }
    }

    /// Construct an encoder that uses a caller-supplied loop detector.
    #[must_use]
    pub fn with_detector(options: EncodeOptions, detector: LoopDetector) -> Self {
        Self {
            out: Vec::new(),
            options,
            detector: Some(detector),
        }
    }

    /// Bytes emitted so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.out
    }

    /// Number of bytes emitted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.out.len()
    }

    /// Returns `true` if nothing has been emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    /// Consume the encoder, returning the emitted bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    /// Forget the live-container path of the loop detector, if one is
    /// attached.
    pub fn reset_detector(&mut self) {
        if let Some(detector) = self.detector.as_mut() {
            detector.reset();
        }
    }

    /// Encode one value in definite-length form.
    ///
    /// # Errors
    ///
    /// Fails on policy violations (undefined map key, cycle, reserved simple
    /// value); the buffer is rolled back to the previous item boundary.
    pub fn push(&mut self, value: &Value) -> Result<(), CborError> {
        let start = self.out.len();
        let result = self.push_value(value);
        if result.is_err() {
            self.out.truncate(start);
        }
        result
    }

    /// Encode one value, using indefinite-length heads for its outermost
    /// string or container form.
    ///
    /// # Errors
    ///
    /// As [`Encoder::push`], plus `InvalidChunkSize` for a zero chunk size.
    pub fn push_indefinite(&mut self, value: &Value) -> Result<(), CborError> {
        let start = self.out.len();
        let result = self.push_indefinite_value(value);
        if result.is_err() {
            self.out.truncate(start);
        }
        result
    }

    /// Encode `value` wrapped under `tag`.
    ///
    /// # Errors
    ///
    /// As [`Encoder::push`].
    pub fn push_tagged(&mut self, tag: u64, value: &Value) -> Result<(), CborError> {
        let start = self.out.len();
        head::write_head(&mut self.out, MAJOR_TAG, tag);
        let result = self.push_value(value);
        if result.is_err() {
            self.out.truncate(start);
        }
        result
    }

    fn push_value(&mut self, value: &Value) -> Result<(), CborError> {
        let token = self.enter(value)?;
        let result = self.push_value_inner(value);
        self.leave(token);
        result
    }

    fn push_value_inner(&mut self, value: &Value) -> Result<(), CborError> {
        match value {
            Value::Integer(v) => self.push_integer(*v),
            Value::Float(x) => {
                write_float(&mut self.out, *x);
                Ok(())
            }
            Value::BigNum(b) => self.push_bignum(b),
            Value::Bytes(b) => {
                self.push_bytes(b.as_slice());
                Ok(())
            }
            Value::Text(s) => {
                self.push_text(s);
                Ok(())
            }
            Value::Array(items) => {
                head::write_head(&mut self.out, MAJOR_ARRAY, items.len() as u64);
                for item in items {
                    self.push_value(item)?;
                }
                Ok(())
            }
            Value::Map(entries) => self.push_map(entries),
            Value::Tag(t) => {
                head::write_head(&mut self.out, MAJOR_TAG, t.tag);
                self.push_value(&t.value)
            }
            Value::Bool(v) => {
                self.out.push(if *v { 0xf5 } else { 0xf4 });
                Ok(())
            }
            Value::Null => {
                self.out.push(0xf6);
                Ok(())
            }
            Value::Undefined => self.push_undefined(),
            Value::Simple(n) => self.push_simple(*n),
            Value::DateTime(dt) => self.push_datetime(*dt),
            Value::Decimal(d) => self.push_fraction(TAG_DECIMAL_FRACTION, d.exponent, &d.mantissa),
            Value::BigFloat(b) => self.push_fraction(TAG_BIGFLOAT, b.exponent, &b.mantissa),
            Value::Uri(u) => {
                head::write_head(&mut self.out, MAJOR_TAG, TAG_URI);
                self.push_text(u.as_str());
                Ok(())
            }
            Value::Regexp(r) => {
                head::write_head(&mut self.out, MAJOR_TAG, TAG_REGEXP);
                self.push_text(r.pattern());
                Ok(())
            }
            Value::Set(items) => {
                head::write_head(&mut self.out, MAJOR_TAG, TAG_SET);
                head::write_head(&mut self.out, MAJOR_ARRAY, items.len() as u64);
                for item in items {
                    self.push_value(item)?;
                }
                Ok(())
            }
            Value::TypedArray(arr) => {
                head::write_head(&mut self.out, MAJOR_TAG, arr.tag());
                let payload = arr.to_le_bytes();
                self.push_bytes(&payload);
                Ok(())
            }
            Value::Extension(ext) => ext.encode_cbor(self),
        }
    }

    fn push_integer(&mut self, v: i128) -> Result<(), CborError> {
        if let Ok(u) = u64::try_from(v) {
            head::write_head(&mut self.out, MAJOR_UNSIGNED, u);
            return Ok(());
        }
        if v < 0 {
            if let Ok(n) = u64::try_from(-1 - v) {
                head::write_head(&mut self.out, MAJOR_NEGATIVE, n);
                return Ok(());
            }
        }
        // Outside the 64-bit wire range: route through the bignum path.
        self.push_bignum(&BigInt::from(v))
    }

    fn push_bignum(&mut self, value: &BigInt) -> Result<(), CborError> {
        let negative = value.sign() == Sign::Minus;
        let (tag, major, magnitude) = if negative {
            (TAG_NEGATIVE_BIGNUM, MAJOR_NEGATIVE, -(value.clone() + 1u32))
        } else {
            (TAG_POSITIVE_BIGNUM, MAJOR_UNSIGNED, value.clone())
        };
        if self.options.collapse_big_integers {
            if let Some(small) = magnitude.to_u64() {
                if small <= u64::from(u32::MAX) {
                    head::write_head(&mut self.out, major, small);
                } else {
                    head::write_head_u64(&mut self.out, major, small);
                }
                return Ok(());
            }
        }
        head::write_head(&mut self.out, MAJOR_TAG, tag);
        let (_, bytes) = magnitude.to_bytes_be();
        self.push_bytes(&bytes);
        Ok(())
    }

    fn push_int_or_bignum(&mut self, value: &BigInt) -> Result<(), CborError> {
        match value.to_i128() {
            Some(v) if v >= -(1i128 << 64) && v < (1i128 << 64) => self.push_integer(v),
            _ => self.push_bignum(value),
        }
    }

    fn push_fraction(
        &mut self,
        tag: u64,
        exponent: i64,
        mantissa: &BigInt,
    ) -> Result<(), CborError> {
        head::write_head(&mut self.out, MAJOR_TAG, tag);
        head::write_head(&mut self.out, MAJOR_ARRAY, 2);
        self.push_integer(i128::from(exponent))?;
        self.push_int_or_bignum(mantissa)
    }

    fn push_bytes(&mut self, data: &[u8]) {
        head::write_head(&mut self.out, MAJOR_BYTES, data.len() as u64);
        self.out.extend_from_slice(data);
    }

    fn push_text(&mut self, s: &str) {
        head::write_head(&mut self.out, MAJOR_TEXT, s.len() as u64);
        self.out.extend_from_slice(s.as_bytes());
    }

    fn push_map(&mut self, entries: &[(Value, Value)]) -> Result<(), CborError> {
        let count = if self.options.omit_undefined_entries {
            entries.iter().filter(|(_, v)| !v.is_undefined()).count()
        } else {
            entries.len()
        };
        head::write_head(&mut self.out, MAJOR_MAP, count as u64);
        self.push_map_entries(entries)
    }

    fn push_map_entries(&mut self, entries: &[(Value, Value)]) -> Result<(), CborError> {
        for (key, value) in entries {
            if self.options.omit_undefined_entries && value.is_undefined() {
                continue;
            }
            if key.is_undefined() && self.options.disallow_undefined_keys {
                return Err(CborError::new(ErrorCode::UndefinedMapKey, self.out.len()));
            }
            self.push_value(key)?;
            self.push_value(value)?;
        }
        Ok(())
    }

    fn push_undefined(&mut self) -> Result<(), CborError> {
        let policy = self.options.undefined.clone();
        match policy {
            UndefinedPolicy::Emit => {
                self.out.push(0xf7);
                Ok(())
            }
            UndefinedPolicy::Raw(bytes) => {
                self.out.extend_from_slice(&bytes);
                Ok(())
            }
            UndefinedPolicy::Replace(replacement) => self.push_value(&replacement),
            UndefinedPolicy::With(produce) => {
                let replacement = produce();
                self.push_value(&replacement)
            }
        }
    }

    fn push_simple(&mut self, v: u8) -> Result<(), CborError> {
        if (24..=31).contains(&v) {
            return Err(CborError::new(
                ErrorCode::InvalidSimpleEncoding(v),
                self.out.len(),
            ));
        }
        head::write_head(&mut self.out, MAJOR_SIMPLE, u64::from(v));
        Ok(())
    }

    fn push_datetime(&mut self, dt: OffsetDateTime) -> Result<(), CborError> {
        match self.options.date_format {
            DateFormat::String => {
                head::write_head(&mut self.out, MAJOR_TAG, TAG_DATETIME_STRING);
                let text = dt
                    .format(&Rfc3339)
                    .map_err(|_| CborError::new(ErrorCode::TimestampRange, self.out.len()))?;
                self.push_text(&text);
                Ok(())
            }
            DateFormat::Number => {
                head::write_head(&mut self.out, MAJOR_TAG, TAG_EPOCH_DATETIME);
                let nanos = dt.unix_timestamp_nanos();
                if nanos % 1_000_000_000 == 0 {
                    self.push_integer(nanos / 1_000_000_000)
                } else {
                    write_float(&mut self.out, nanos as f64 / 1e9);
                    Ok(())
                }
            }
            DateFormat::Int => {
                head::write_head(&mut self.out, MAJOR_TAG, TAG_EPOCH_DATETIME);
                let secs = (dt.unix_timestamp_nanos() as f64 / 1e9).round();
                self.push_integer(secs as i128)
            }
            DateFormat::Float => {
                head::write_head(&mut self.out, MAJOR_TAG, TAG_EPOCH_DATETIME);
                write_float(&mut self.out, dt.unix_timestamp_nanos() as f64 / 1e9);
                Ok(())
            }
        }
    }

    fn push_indefinite_value(&mut self, value: &Value) -> Result<(), CborError> {
        if self.options.chunk_size == 0 {
            return Err(CborError::new(ErrorCode::InvalidChunkSize, self.out.len()));
        }
        match value {
            Value::Text(s) => {
                self.push_text_chunked(s);
                Ok(())
            }
            Value::Bytes(b) => {
                self.push_bytes_chunked(b.as_slice());
                Ok(())
            }
            Value::Array(items) => {
                head::write_indefinite(&mut self.out, MAJOR_ARRAY);
                for item in items {
                    self.push_value(item)?;
                }
                self.out.push(head::BREAK);
                Ok(())
            }
            Value::Map(entries) => {
                head::write_indefinite(&mut self.out, MAJOR_MAP);
                self.push_map_entries(entries)?;
                self.out.push(head::BREAK);
                Ok(())
            }
            other => self.push_value(other),
        }
    }

    fn push_text_chunked(&mut self, s: &str) {
        head::write_indefinite(&mut self.out, MAJOR_TEXT);
        let chunk = self.options.chunk_size;
        let mut start = 0;
        while start < s.len() {
            let mut end = (start + chunk).min(s.len());
            // Chunk boundaries must not split a scalar value; slide back to
            // a char boundary, or forward when the scalar is wider than the
            // chunk size.
            while end > start && !s.is_char_boundary(end) {
                end -= 1;
            }
            if end == start {
                end = (start + 1).min(s.len());
                while end < s.len() && !s.is_char_boundary(end) {
                    end += 1;
                }
            }
            let piece = &s[start..end];
            head::write_head(&mut self.out, MAJOR_TEXT, piece.len() as u64);
            self.out.extend_from_slice(piece.as_bytes());
            start = end;
        }
        self.out.push(head::BREAK);
    }

    fn push_bytes_chunked(&mut self, data: &[u8]) {
        head::write_indefinite(&mut self.out, MAJOR_BYTES);
        for piece in data.chunks(self.options.chunk_size) {
            head::write_head(&mut self.out, MAJOR_BYTES, piece.len() as u64);
            self.out.extend_from_slice(piece);
        }
        self.out.push(head::BREAK);
    }

    fn enter(&mut self, value: &Value) -> Result<Option<usize>, CborError> {
        let Some(detector) = self.detector.as_mut() else {
            return Ok(None);
        };
        let Some(addr) = container_addr(value) else {
            return Ok(None);
        };
        detector.enter(addr, self.out.len())?;
        Ok(Some(addr))
    }

    fn leave(&mut self, token: Option<usize>) {
        if let (Some(detector), Some(addr)) = (self.detector.as_mut(), token) {
            detector.leave(addr);
        }
    }
}

fn container_addr(value: &Value) -> Option<usize> {
    match value {
        // Empty Vecs share the dangling sentinel pointer, and a cycle always
        // passes through a non-empty container, so empties are not tracked.
        Value::Array(items) | Value::Set(items) if !items.is_empty() => {
            Some(items.as_ptr() as usize)
        }
        Value::Map(entries) if !entries.is_empty() => Some(entries.as_ptr() as usize),
        Value::Extension(ext) => Some(Arc::as_ptr(ext) as *const () as usize),
        _ => None,
    }
}

/// Encode one value with default options.
///
/// # Errors
///
/// Fails on encoder policy violations; no bytes are returned.
pub fn encode(value: &Value) -> Result<Vec<u8>, CborError> {
    let mut encoder = Encoder::new();
    encoder.push(value)?;
    Ok(encoder.into_bytes())
}

/// Encode each value in turn and return the concatenated stream.
///
/// # Errors
///
/// Fails on encoder policy violations; no bytes are returned.
pub fn encode_all<'a, I>(values: I) -> Result<Vec<u8>, CborError>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut encoder = Encoder::new();
    for value in values {
        encoder.push(value)?;
    }
    Ok(encoder.into_bytes())
}

/// Encode one value with explicit options.
///
/// # Errors
///
/// Fails on encoder policy violations; no bytes are returned.
pub fn encode_one(value: &Value, options: &EncodeOptions) -> Result<Vec<u8>, CborError> {
    let mut encoder = Encoder::with_options(options.clone());
    encoder.push(value)?;
    Ok(encoder.into_bytes())
}

/// Deterministic encoding is declared but not implemented.
///
/// # Errors
///
/// Always fails with `CanonicalNotImplemented`.
pub fn encode_canonical<'a, I>(values: I) -> Result<Vec<u8>, CborError>
where
    I: IntoIterator<Item = &'a Value>,
{
    let _ = values;
    Err(CborError::new(ErrorCode::CanonicalNotImplemented, 0))
}

/// Encode one value using indefinite-length heads for its outermost string
/// or container form.
///
/// Strings are split into definite chunks of at most
/// [`EncodeOptions::chunk_size`] bytes, never splitting a scalar value;
/// container children use ordinary definite encoding.
///
/// # Errors
///
/// Fails on encoder policy violations or a zero chunk size.
pub fn encode_indefinite(value: &Value, options: &EncodeOptions) -> Result<Vec<u8>, CborError> {
    let mut encoder = Encoder::with_options(options.clone());
    encoder.push_indefinite(value)?;
    Ok(encoder.into_bytes())
}
