//! The tag registry: maps tag numbers to interpreters and applies the
//! lenient/strict failure policy.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use half::f16;
use num_bigint::{BigInt, Sign};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use url::Url;

use crate::value::{mark_views, BigFloat, ByteView, Decimal, Regexp, Tagged, TypedArray, Value};
use crate::{CborError, ErrorCode};

/// Tag 0: RFC 3339 date/time string.
pub const TAG_DATETIME_STRING: u64 = 0;
/// Tag 1: epoch-based date/time (integer or float seconds).
pub const TAG_EPOCH_DATETIME: u64 = 1;
/// Tag 2: unsigned bignum.
pub const TAG_POSITIVE_BIGNUM: u64 = 2;
/// Tag 3: negative bignum.
pub const TAG_NEGATIVE_BIGNUM: u64 = 3;
/// Tag 4: decimal fraction `[exponent, mantissa]`.
pub const TAG_DECIMAL_FRACTION: u64 = 4;
/// Tag 5: bigfloat `[exponent, mantissa]`.
pub const TAG_BIGFLOAT: u64 = 5;
/// Tag 21: contained byte strings expect base64url conversion.
pub const TAG_EXPECT_BASE64URL: u64 = 21;
/// Tag 22: contained byte strings expect base64 conversion.
pub const TAG_EXPECT_BASE64: u64 = 22;
/// Tag 23: contained byte strings expect base16 conversion.
pub const TAG_EXPECT_BASE16: u64 = 23;
/// Tag 32: URI text.
pub const TAG_URI: u64 = 32;
/// Tag 33: base64url-encoded text.
pub const TAG_BASE64URL_TEXT: u64 = 33;
/// Tag 34: base64-encoded text.
pub const TAG_BASE64_TEXT: u64 = 34;
/// Tag 35: regular expression text.
pub const TAG_REGEXP: u64 = 35;
/// Tag 258: mathematical set of elements.
pub const TAG_SET: u64 = 258;
/// First RFC 8746 typed-array tag.
pub const TAG_TYPED_ARRAY_FIRST: u64 = 64;
/// Last RFC 8746 typed-array tag.
pub const TAG_TYPED_ARRAY_LAST: u64 = 87;

/// An interpreter rejection that hands the raw payload back.
///
/// In lenient mode the payload and message are attached to the returned
/// [`Tagged`] wrapper; in strict mode the message propagates as
/// [`ErrorCode::TagFailed`].
#[derive(Debug)]
pub struct TagFailure {
    /// The uninterpreted inner item, returned to the caller.
    pub value: Value,
    /// Why interpretation failed.
    pub message: Box<str>,
}

impl TagFailure {
    /// Construct a failure carrying the raw payload back.
    pub fn new(value: Value, message: impl Into<Box<str>>) -> Self {
        Self {
            value,
            message: message.into(),
        }
    }
}

type TagFn = Arc<dyn Fn(u64, Value) -> Result<Value, TagFailure> + Send + Sync>;

/// Tag number to interpreter mapping with user overrides.
///
/// Built-ins cover the standard tags listed in this module. A registered
/// interpreter replaces the built-in for its tag; [`TagRegistry::unregister`]
/// removes the built-in so the tag passes through as a plain [`Tagged`]
/// wrapper.
#[derive(Clone, Default)]
pub struct TagRegistry {
    overrides: HashMap<u64, Option<TagFn>>,
    strict: bool,
}

impl TagRegistry {
    /// Construct a registry with only the built-in interpreters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the interpreter for `tag`.
    pub fn register<F>(&mut self, tag: u64, interpreter: F)
    where
        F: Fn(u64, Value) -> Result<Value, TagFailure> + Send + Sync + 'static,
    {
        self.overrides.insert(tag, Some(Arc::new(interpreter)));
    }

    /// Remove the built-in interpreter for `tag`; such tags decode to plain
    /// [`Tagged`] wrappers.
    pub fn unregister(&mut self, tag: u64) {
        self.overrides.insert(tag, None);
    }

    /// In strict mode interpreter failures abort the decode instead of being
    /// attached to the tag wrapper.
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Returns `true` when interpreter failures abort the decode.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    pub(crate) fn interpret(
        &self,
        tag: u64,
        value: Value,
        offset: usize,
    ) -> Result<Value, CborError> {
        let outcome = match self.overrides.get(&tag) {
            Some(None) => return Ok(Value::tagged(tag, value)),
            Some(Some(custom)) => custom(tag, value),
            None => builtin(tag, value),
        };
        match outcome {
            Ok(v) => Ok(v),
            Err(failure) if self.strict => {
                Err(CborError::new(ErrorCode::TagFailed(failure.message), offset))
            }
            Err(failure) => Ok(Value::Tag(Box::new(Tagged {
                tag,
                value: failure.value,
                err: Some(failure.message),
            }))),
        }
    }
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<u64> = self.overrides.keys().copied().collect();
        tags.sort_unstable();
        f.debug_struct("TagRegistry")
            .field("overridden", &tags)
            .field("strict", &self.strict)
            .finish()
    }
}

fn builtin(tag: u64, value: Value) -> Result<Value, TagFailure> {
    match tag {
        TAG_DATETIME_STRING => datetime_string(value),
        TAG_EPOCH_DATETIME => epoch_datetime(value),
        TAG_POSITIVE_BIGNUM => bignum(false, value),
        TAG_NEGATIVE_BIGNUM => bignum(true, value),
        TAG_DECIMAL_FRACTION => fraction(true, value),
        TAG_BIGFLOAT => fraction(false, value),
        TAG_EXPECT_BASE64URL => expect_view(ByteView::Base64Url, value),
        TAG_EXPECT_BASE64 => expect_view(ByteView::Base64, value),
        TAG_EXPECT_BASE16 => expect_view(ByteView::Base16, value),
        TAG_URI => uri(value),
        TAG_BASE64URL_TEXT => encoded_text(TAG_BASE64URL_TEXT, value),
        TAG_BASE64_TEXT => encoded_text(TAG_BASE64_TEXT, value),
        TAG_REGEXP => regexp(value),
        TAG_SET => set(value),
        TAG_TYPED_ARRAY_FIRST..=TAG_TYPED_ARRAY_LAST => typed_array(tag, value),
        _ => Ok(Value::tagged(tag, value)),
    }
}

fn datetime_string(value: Value) -> Result<Value, TagFailure> {
    let text = match value {
        Value::Text(text) => text,
        other => {
            return Err(TagFailure::new(
                other,
                "tag 0 requires an RFC 3339 text string",
            ))
        }
    };
    match OffsetDateTime::parse(&text, &Rfc3339) {
        Ok(dt) => Ok(Value::DateTime(dt)),
        Err(err) => Err(TagFailure::new(
            Value::Text(text),
            format!("invalid RFC 3339 timestamp: {err}"),
        )),
    }
}

fn epoch_datetime(value: Value) -> Result<Value, TagFailure> {
    let parsed = match &value {
        Value::Integer(secs) => i64::try_from(*secs)
            .ok()
            .and_then(|s| OffsetDateTime::from_unix_timestamp(s).ok()),
        Value::Float(secs) if secs.is_finite() => {
            let nanos = (secs * 1e9).round();
            OffsetDateTime::from_unix_timestamp_nanos(nanos as i128).ok()
        }
        _ => None,
    };
    match parsed {
        Some(dt) => Ok(Value::DateTime(dt)),
        None => Err(TagFailure::new(
            value,
            "tag 1 requires epoch seconds within the representable range",
        )),
    }
}

fn bignum(negative: bool, value: Value) -> Result<Value, TagFailure> {
    let payload = match value {
        Value::Bytes(payload) => payload,
        other => return Err(TagFailure::new(other, "bignum tags require a byte string")),
    };
    let magnitude = BigInt::from_bytes_be(Sign::Plus, payload.as_slice());
    Ok(Value::BigNum(if negative {
        -(magnitude + 1u32)
    } else {
        magnitude
    }))
}

fn fraction(decimal: bool, value: Value) -> Result<Value, TagFailure> {
    const SHAPE: &str = "expected a two-element [exponent, mantissa] array";
    let items = match value {
        Value::Array(items) => items,
        other => return Err(TagFailure::new(other, SHAPE)),
    };
    let [e, m] = match <[Value; 2]>::try_from(items) {
        Ok(pair) => pair,
        Err(items) => return Err(TagFailure::new(Value::Array(items), SHAPE)),
    };
    let exponent = match &e {
        Value::Integer(v) => i64::try_from(*v).ok(),
        _ => None,
    };
    let Some(exponent) = exponent else {
        return Err(TagFailure::new(
            Value::Array(vec![e, m]),
            "exponent must be an integer in i64 range",
        ));
    };
    let mantissa = match m {
        Value::Integer(v) => BigInt::from(v),
        Value::BigNum(b) => b,
        other => {
            return Err(TagFailure::new(
                Value::Array(vec![e, other]),
                "mantissa must be an integer or bignum",
            ))
        }
    };
    Ok(if decimal {
        Value::Decimal(Decimal { exponent, mantissa })
    } else {
        Value::BigFloat(BigFloat { exponent, mantissa })
    })
}

#[allow(clippy::unnecessary_wraps)]
fn expect_view(view: ByteView, mut value: Value) -> Result<Value, TagFailure> {
    mark_views(&mut value, view);
    Ok(value)
}

fn uri(value: Value) -> Result<Value, TagFailure> {
    let text = match value {
        Value::Text(text) => text,
        other => return Err(TagFailure::new(other, "tag 32 requires a text string")),
    };
    match Url::parse(&text) {
        Ok(url) => Ok(Value::Uri(url)),
        Err(err) => Err(TagFailure::new(
            Value::Text(text),
            format!("invalid URI: {err}"),
        )),
    }
}

fn encoded_text(tag: u64, value: Value) -> Result<Value, TagFailure> {
    let text = match value {
        Value::Text(text) => text,
        other => {
            return Err(TagFailure::new(
                other,
                "encoded-text tags require a text string",
            ))
        }
    };
    // Tag 33 forbids padding entirely; tag 34 requires canonical padding.
    // Both reject characters outside their alphabet and nonzero tail bits.
    let checked = if tag == TAG_BASE64URL_TEXT {
        URL_SAFE_NO_PAD.decode(text.as_bytes())
    } else {
        STANDARD.decode(text.as_bytes())
    };
    match checked {
        Ok(_) => Ok(Value::tagged(tag, Value::Text(text))),
        Err(err) => Err(TagFailure::new(
            Value::Text(text),
            format!("invalid base64 text: {err}"),
        )),
    }
}

fn regexp(value: Value) -> Result<Value, TagFailure> {
    let text = match value {
        Value::Text(text) => text,
        other => return Err(TagFailure::new(other, "tag 35 requires a text string")),
    };
    match Regexp::new(&text) {
        Ok(re) => Ok(Value::Regexp(re)),
        Err(err) => Err(TagFailure::new(
            Value::Text(text),
            format!("invalid regular expression: {err}"),
        )),
    }
}

fn set(value: Value) -> Result<Value, TagFailure> {
    match value {
        Value::Array(items) => Ok(Value::Set(items)),
        other => Err(TagFailure::new(other, "tag 258 requires an array")),
    }
}

fn elems<T, const W: usize>(data: &[u8], f: fn([u8; W]) -> T) -> Option<Vec<T>> {
    if data.len() % W != 0 {
        return None;
    }
    Some(
        data.chunks_exact(W)
            .map(|chunk| {
                let mut buf = [0u8; W];
                buf.copy_from_slice(chunk);
                f(buf)
            })
            .collect(),
    )
}

fn build_typed_array(tag: u64, data: &[u8]) -> Result<TypedArray, &'static str> {
    const UNEVEN: &str = "typed array length is not a multiple of the element size";
    let built = match tag {
        64 | 68 => Some(TypedArray::U8(data.to_vec())),
        72 => Some(TypedArray::I8(data.iter().map(|b| *b as i8).collect())),
        65 => elems(data, u16::from_be_bytes).map(TypedArray::U16),
        69 => elems(data, u16::from_le_bytes).map(TypedArray::U16),
        66 => elems(data, u32::from_be_bytes).map(TypedArray::U32),
        70 => elems(data, u32::from_le_bytes).map(TypedArray::U32),
        67 => elems(data, u64::from_be_bytes).map(TypedArray::U64),
        71 => elems(data, u64::from_le_bytes).map(TypedArray::U64),
        73 => elems(data, i16::from_be_bytes).map(TypedArray::I16),
        77 => elems(data, i16::from_le_bytes).map(TypedArray::I16),
        74 => elems(data, i32::from_be_bytes).map(TypedArray::I32),
        78 => elems(data, i32::from_le_bytes).map(TypedArray::I32),
        75 => elems(data, i64::from_be_bytes).map(TypedArray::I64),
        79 => elems(data, i64::from_le_bytes).map(TypedArray::I64),
        80 => elems(data, f16::from_be_bytes).map(TypedArray::F16),
        84 => elems(data, f16::from_le_bytes).map(TypedArray::F16),
        81 => elems(data, f32::from_be_bytes).map(TypedArray::F32),
        85 => elems(data, f32::from_le_bytes).map(TypedArray::F32),
        82 => elems(data, f64::from_be_bytes).map(TypedArray::F64),
        86 => elems(data, f64::from_le_bytes).map(TypedArray::F64),
        // 76 is unassigned; 83/87 are float128, which has no native type.
        _ => return Err("unsupported typed array tag"),
    };
    built.ok_or(UNEVEN)
}

fn typed_array(tag: u64, value: Value) -> Result<Value, TagFailure> {
    let payload = match value {
        Value::Bytes(payload) => payload,
        other => {
            return Err(TagFailure::new(
                other,
                "typed array tags require a byte string",
            ))
        }
    };
    match build_typed_array(tag, payload.as_slice()) {
        Ok(arr) => Ok(Value::TypedArray(arr)),
        Err(msg) => Err(TagFailure::new(Value::Bytes(payload), msg)),
    }
}
