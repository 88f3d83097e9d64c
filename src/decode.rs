//! Decoding: reads items, recursively assembles containers, and applies tag
//! interpreters depth-first.

use crate::float::decode_half;
use crate::head::{self, Arg, Head, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE, MAJOR_TAG, MAJOR_TEXT, MAJOR_UNSIGNED};
use crate::limits::DecodeLimits;
use crate::stream::CborStream;
use crate::tags::TagRegistry;
use crate::utf8;
use crate::value::{Bytes, Value};
use crate::{CborError, ErrorCode};

/// Options recognized by [`decode_first`] and [`decode_all`].
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Tag interpreters; overrides and removals apply to this decode only.
    pub tags: TagRegistry,
    /// Resource limits.
    pub limits: DecodeLimits,
}

struct Decoder<'a, 'o> {
    stream: CborStream<'a>,
    options: &'o DecodeOptions,
}

impl<'a, 'o> Decoder<'a, 'o> {
    fn new(bytes: &'a [u8], options: &'o DecodeOptions) -> Result<Self, CborError> {
        if bytes.len() > options.limits.max_input_bytes {
            return Err(CborError::new(ErrorCode::InputLimitExceeded, 0));
        }
        Ok(Self {
            stream: CborStream::new(bytes),
            options,
        })
    }

    fn item(&mut self, depth: usize) -> Result<Value, CborError> {
        let off = self.stream.position();
        if depth > self.options.limits.max_depth {
            return Err(CborError::new(ErrorCode::DepthLimitExceeded, off));
        }
        let head = head::read_head(&mut self.stream)?;
        match head.major {
            MAJOR_UNSIGNED => Ok(Value::Integer(i128::from(head.require_value(off)?))),
            MAJOR_NEGATIVE => Ok(Value::Integer(-1 - i128::from(head.require_value(off)?))),
            MAJOR_BYTES => self.byte_string(head, off),
            MAJOR_TEXT => self.text_string(head, off),
            MAJOR_ARRAY => self.array(head, off, depth),
            MAJOR_MAP => self.map(head, off, depth),
            MAJOR_TAG => {
                let tag = head.require_value(off)?;
                let inner = self.item(depth + 1)?;
                self.options.tags.interpret(tag, inner, off)
            }
            _ => self.simple_or_float(&head, off),
        }
    }

    fn byte_string(&mut self, head: Head, off: usize) -> Result<Value, CborError> {
        match head.arg {
            Arg::Value(len) => {
                let n = to_len(len, off)?;
                let data = self.stream.read_exact(n)?;
                Ok(Value::Bytes(Bytes::new(data.to_vec())))
            }
            Arg::Indefinite => {
                let mut data = Vec::new();
                while !self.take_break()? {
                    let chunk_off = self.stream.position();
                    let chunk = head::read_head(&mut self.stream)?;
                    if chunk.major != MAJOR_BYTES {
                        return Err(CborError::new(
                            ErrorCode::InvalidIndefiniteMajor(chunk.major),
                            chunk_off,
                        ));
                    }
                    let n = to_len(chunk.require_value(chunk_off)?, chunk_off)?;
                    data.extend_from_slice(self.stream.read_exact(n)?);
                }
                Ok(Value::Bytes(Bytes::new(data)))
            }
        }
    }

    fn text_string(&mut self, head: Head, off: usize) -> Result<Value, CborError> {
        match head.arg {
            Arg::Value(len) => {
                let n = to_len(len, off)?;
                let payload_off = self.stream.position();
                let data = self.stream.read_exact(n)?;
                Ok(Value::Text(utf8::validate(data, payload_off)?.to_owned()))
            }
            Arg::Indefinite => {
                let mut text = String::new();
                while !self.take_break()? {
                    let chunk_off = self.stream.position();
                    let chunk = head::read_head(&mut self.stream)?;
                    if chunk.major != MAJOR_TEXT {
                        return Err(CborError::new(
                            ErrorCode::InvalidIndefiniteMajor(chunk.major),
                            chunk_off,
                        ));
                    }
                    let n = to_len(chunk.require_value(chunk_off)?, chunk_off)?;
                    let payload_off = self.stream.position();
                    let data = self.stream.read_exact(n)?;
                    text.push_str(utf8::validate(data, payload_off)?);
                }
                Ok(Value::Text(text))
            }
        }
    }

    fn array(&mut self, head: Head, off: usize, depth: usize) -> Result<Value, CborError> {
        let mut items = Vec::new();
        match head.arg {
            Arg::Value(len) => {
                let n = to_len(len, off)?;
                for _ in 0..n {
                    items.push(self.item(depth + 1)?);
                }
            }
            Arg::Indefinite => {
                while !self.take_break()? {
                    items.push(self.item(depth + 1)?);
                }
            }
        }
        Ok(Value::Array(items))
    }

    fn map(&mut self, head: Head, off: usize, depth: usize) -> Result<Value, CborError> {
        let mut entries = Vec::new();
        match head.arg {
            Arg::Value(len) => {
                let n = to_len(len, off)?;
                for _ in 0..n {
                    let key = self.item(depth + 1)?;
                    let value = self.item(depth + 1)?;
                    entries.push((key, value));
                }
            }
            Arg::Indefinite => {
                while !self.take_break()? {
                    let key = self.item(depth + 1)?;
                    let value_off = self.stream.position();
                    if self.peek_break()? {
                        return Err(CborError::new(ErrorCode::InvalidMapLength, value_off));
                    }
                    let value = self.item(depth + 1)?;
                    entries.push((key, value));
                }
            }
        }
        Ok(Value::Map(entries))
    }

    fn simple_or_float(&mut self, head: &Head, off: usize) -> Result<Value, CborError> {
        let raw = match head.arg {
            // A BREAK reached as an item is outside any open indefinite
            // container.
            Arg::Indefinite => return Err(CborError::new(ErrorCode::InvalidBreak, off)),
            Arg::Value(raw) => raw,
        };
        match head.ai {
            0..=23 => Ok(match raw as u8 {
                20 => Value::Bool(false),
                21 => Value::Bool(true),
                22 => Value::Null,
                23 => Value::Undefined,
                v => Value::Simple(v),
            }),
            24 => {
                let v = raw as u8;
                if v < 32 {
                    Err(CborError::new(ErrorCode::InvalidSimpleEncoding(v), off))
                } else {
                    Ok(Value::Simple(v))
                }
            }
            25 => Ok(Value::Float(decode_half(raw as u16))),
            26 => Ok(Value::Float(f64::from(f32::from_bits(raw as u32)))),
            27 => Ok(Value::Float(f64::from_bits(raw))),
            ai => Err(CborError::new(ErrorCode::AdditionalInfoReserved(ai), off)),
        }
    }

    /// Consume a BREAK byte if one is next; otherwise leave the cursor where
    /// it was.
    fn take_break(&mut self) -> Result<bool, CborError> {
        if self.stream.read_u8()? == head::BREAK {
            Ok(true)
        } else {
            self.stream.rewind(1);
            Ok(false)
        }
    }

    fn peek_break(&mut self) -> Result<bool, CborError> {
        let byte = self.stream.read_u8()?;
        self.stream.rewind(1);
        Ok(byte == head::BREAK)
    }
}

fn to_len(len: u64, off: usize) -> Result<usize, CborError> {
    usize::try_from(len).map_err(|_| CborError::new(ErrorCode::LengthOverflow, off))
}

/// Decode exactly one item with default options.
///
/// # Errors
///
/// Fails on malformed input, including trailing bytes after the item.
pub fn decode(bytes: &[u8]) -> Result<Value, CborError> {
    decode_first(bytes, &DecodeOptions::default())
}

/// Decode exactly one item.
///
/// # Errors
///
/// Fails on malformed input; trailing bytes raise `UnexpectedData`.
pub fn decode_first(bytes: &[u8], options: &DecodeOptions) -> Result<Value, CborError> {
    let mut decoder = Decoder::new(bytes, options)?;
    let value = decoder.item(0)?;
    if !decoder.stream.is_at_end() {
        return Err(CborError::new(
            ErrorCode::UnexpectedData,
            decoder.stream.position(),
        ));
    }
    Ok(value)
}

/// Decode items until the end of input.
///
/// # Errors
///
/// Fails on malformed input; no partial sequence is returned.
pub fn decode_all(bytes: &[u8], options: &DecodeOptions) -> Result<Vec<Value>, CborError> {
    let mut decoder = Decoder::new(bytes, options)?;
    let mut items = Vec::new();
    while !decoder.stream.is_at_end() {
        items.push(decoder.item(0)?);
    }
    Ok(items)
}
