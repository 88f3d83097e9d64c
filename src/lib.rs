//! # vellum-cbor
//!
//! A general-purpose codec for the Concise Binary Object Representation
//! (CBOR, [RFC 8949]), converting between an owned [`Value`] tree and the
//! self-describing binary byte stream in both directions.
//!
//! ## Design principles
//!
//! - **The value tree is the interface.**
//!   Decoding produces a [`Value`]; encoding consumes one. Interpreted tag
//!   products (dates, bignums, typed arrays, sets, URIs, regular
//!   expressions) are first-class variants that round-trip through their
//!   tagged wire forms.
//! - **Tag policy is data, not control flow.**
//!   A [`TagRegistry`] maps tag numbers to interpreters. Failures attach to
//!   the returned [`Tagged`] wrapper in lenient mode, so callers always see
//!   the raw payload; strict mode aborts the decode instead.
//! - **Malformed input is fatal, precisely located.**
//!   Every decode error carries a structured [`ErrorCode`] and the byte
//!   offset where it was detected. No partial results are returned.
//!
//! ## Feature flags
//!
//! - `simdutf8` *(default)*: SIMD-accelerated UTF-8 validation of text
//!   strings.
//! - `serde`: `serde::Serialize` for [`Value`], rendering tag-21/22/23 byte
//!   views as base64url/base64/base16 text.
//!
//! ## Example
//!
//! ```
//! use vellum_cbor::{decode, encode, Value};
//!
//! let value = Value::Array(vec![Value::Integer(1), Value::Text("two".into())]);
//! let bytes = encode(&value)?;
//! assert_eq!(bytes, [0x82, 0x01, 0x63, b't', b'w', b'o']);
//! assert_eq!(decode(&bytes)?, value);
//! # Ok::<(), vellum_cbor::CborError>(())
//! ```
//!
//! ## Safety
//!
//! This crate forbids `unsafe` code.
//!
//! [RFC 8949]: https://www.rfc-editor.org/rfc/rfc8949

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

mod decode;
mod encode;
mod error;
mod float;
mod head;
mod limits;
mod loops;
#[cfg(feature = "serde")]
mod serde_impl;
mod stream;
mod tags;
mod utf8;
mod value;

pub use crate::decode::{decode, decode_all, decode_first, DecodeOptions};
pub use crate::encode::{
    encode, encode_all, encode_canonical, encode_indefinite, encode_one, DateFormat,
    EncodeOptions, Encoder, UndefinedPolicy, DEFAULT_CHUNK_SIZE,
};
pub use crate::error::{CborError, ErrorCode};
pub use crate::float::as_lossless_half;
pub use crate::limits::{DecodeLimits, DEFAULT_MAX_DEPTH};
pub use crate::loops::LoopDetector;
pub use crate::tags::{
    TagFailure, TagRegistry, TAG_BASE64URL_TEXT, TAG_BASE64_TEXT, TAG_BIGFLOAT,
    TAG_DATETIME_STRING, TAG_DECIMAL_FRACTION, TAG_EPOCH_DATETIME, TAG_EXPECT_BASE16,
    TAG_EXPECT_BASE64, TAG_EXPECT_BASE64URL, TAG_NEGATIVE_BIGNUM, TAG_POSITIVE_BIGNUM,
    TAG_REGEXP, TAG_SET, TAG_TYPED_ARRAY_FIRST, TAG_TYPED_ARRAY_LAST, TAG_URI,
};
pub use crate::value::{
    BigFloat, ByteView, Bytes, Decimal, Extension, Regexp, Tagged, TypedArray, Value,
};

pub use half::f16;
pub use num_bigint::BigInt;
pub use time::OffsetDateTime;
pub use url::Url;
