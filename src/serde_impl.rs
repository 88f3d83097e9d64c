//! `serde::Serialize` for [`Value`].
//!
//! This is the rendering side of the expected-conversion tags: byte strings
//! marked by tags 21/22/23 serialize as base64url/base64/base16 text instead
//! of raw bytes. Everything else maps onto the closest serde primitive.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};
use time::format_description::well_known::Rfc3339;

use crate::value::{ByteView, TypedArray, Value};

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Integer(v) => serializer.serialize_i128(*v),
            Self::BigNum(b) => serializer.serialize_str(&b.to_string()),
            Self::Bytes(b) => match b.view() {
                Some(ByteView::Base64Url) => {
                    serializer.serialize_str(&URL_SAFE_NO_PAD.encode(b.as_slice()))
                }
                Some(ByteView::Base64) => serializer.serialize_str(&STANDARD.encode(b.as_slice())),
                Some(ByteView::Base16) => serializer.serialize_str(&hex::encode(b.as_slice())),
                None => serializer.serialize_bytes(b.as_slice()),
            },
            Self::Text(s) => serializer.serialize_str(s),
            Self::Array(items) | Self::Set(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Self::Tag(t) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("tag", &t.tag)?;
                map.serialize_entry("value", &t.value)?;
                map.end()
            }
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::Null | Self::Undefined => serializer.serialize_unit(),
            Self::Simple(n) => serializer.serialize_u8(*n),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Decimal(d) => {
                serializer.serialize_str(&format!("{}e{}", d.mantissa, d.exponent))
            }
            Self::BigFloat(b) => {
                serializer.serialize_str(&format!("{}p{}", b.mantissa, b.exponent))
            }
            Self::DateTime(dt) => {
                let text = dt.format(&Rfc3339).map_err(S::Error::custom)?;
                serializer.serialize_str(&text)
            }
            Self::Uri(u) => serializer.serialize_str(u.as_str()),
            Self::Regexp(r) => serializer.serialize_str(r.pattern()),
            Self::TypedArray(arr) => serialize_typed_array(arr, serializer),
            Self::Extension(ext) => Err(S::Error::custom(format!(
                "extension value has no serialized view: {}",
                ext.type_name()
            ))),
        }
    }
}

fn serialize_typed_array<S: Serializer>(arr: &TypedArray, serializer: S) -> Result<S::Ok, S::Error> {
    fn seq<S: Serializer, T: Serialize>(serializer: S, items: &[T]) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            out.serialize_element(item)?;
        }
        out.end()
    }

    match arr {
        TypedArray::U8(v) => seq(serializer, v),
        TypedArray::U16(v) => seq(serializer, v),
        TypedArray::U32(v) => seq(serializer, v),
        TypedArray::U64(v) => seq(serializer, v),
        TypedArray::I8(v) => seq(serializer, v),
        TypedArray::I16(v) => seq(serializer, v),
        TypedArray::I32(v) => seq(serializer, v),
        TypedArray::I64(v) => seq(serializer, v),
        TypedArray::F16(v) => {
            let widened: Vec<f32> = v.iter().map(|x| x.to_f32()).collect();
            seq(serializer, &widened)
        }
        TypedArray::F32(v) => seq(serializer, v),
        TypedArray::F64(v) => seq(serializer, v),
    }
}
