//! The one-byte initial head and its 0/1/2/4/8-byte argument tail.

use crate::stream::CborStream;
use crate::{CborError, ErrorCode};

pub(crate) const MAJOR_UNSIGNED: u8 = 0;
pub(crate) const MAJOR_NEGATIVE: u8 = 1;
pub(crate) const MAJOR_BYTES: u8 = 2;
pub(crate) const MAJOR_TEXT: u8 = 3;
pub(crate) const MAJOR_ARRAY: u8 = 4;
pub(crate) const MAJOR_MAP: u8 = 5;
pub(crate) const MAJOR_TAG: u8 = 6;
pub(crate) const MAJOR_SIMPLE: u8 = 7;

/// BREAK terminates an open indefinite-length container.
pub(crate) const BREAK: u8 = 0xff;

/// Argument carried by a decoded head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arg {
    /// Inline or tail-encoded unsigned argument.
    Value(u64),
    /// Additional info 31 on major types 2..=5 (indefinite length) or 7
    /// (BREAK).
    Indefinite,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Head {
    pub major: u8,
    pub ai: u8,
    pub arg: Arg,
}

impl Head {
    /// The argument, or an error when the head was indefinite.
    pub(crate) fn require_value(&self, offset: usize) -> Result<u64, CborError> {
        match self.arg {
            Arg::Value(v) => Ok(v),
            Arg::Indefinite => Err(CborError::new(ErrorCode::InvalidIndefiniteEncoding, offset)),
        }
    }
}

/// Decode one head: major type, additional info, and the argument tail.
///
/// Additional info 28..=30 is reserved; 31 is only meaningful on major types
/// 2..=5 and 7.
pub(crate) fn read_head(s: &mut CborStream<'_>) -> Result<Head, CborError> {
    let off = s.position();
    let ib = s.read_u8()?;
    let major = ib >> 5;
    let ai = ib & 0x1f;
    let arg = match ai {
        0..=23 => Arg::Value(u64::from(ai)),
        // 24..=27 select a 1/2/4/8-byte big-endian tail.
        24..=27 => Arg::Value(s.read_be(1usize << (ai - 24))?),
        31 => {
            if matches!(major, MAJOR_BYTES..=MAJOR_MAP | MAJOR_SIMPLE) {
                Arg::Indefinite
            } else {
                return Err(CborError::new(ErrorCode::InvalidIndefiniteEncoding, off));
            }
        }
        _ => return Err(CborError::new(ErrorCode::AdditionalInfoReserved(ai), off)),
    };
    Ok(Head { major, ai, arg })
}

/// Emit a head with the smallest argument width that holds `value`.
pub(crate) fn write_head(out: &mut Vec<u8>, major: u8, value: u64) {
    debug_assert!(major <= 7);
    if value < 24 {
        out.push((major << 5) | value as u8);
    } else if value <= u64::from(u8::MAX) {
        out.push((major << 5) | 24);
        out.push(value as u8);
    } else if value <= u64::from(u16::MAX) {
        out.push((major << 5) | 25);
        out.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value <= u64::from(u32::MAX) {
        out.push((major << 5) | 26);
        out.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        out.push((major << 5) | 27);
        out.extend_from_slice(&value.to_be_bytes());
    }
}

/// Emit a head with a forced 8-byte argument tail.
///
/// Used by the big-integer collapse path, which keeps the 8-byte form for
/// magnitudes above `u32::MAX` regardless of minimal width.
pub(crate) fn write_head_u64(out: &mut Vec<u8>, major: u8, value: u64) {
    out.push((major << 5) | 27);
    out.extend_from_slice(&value.to_be_bytes());
}

/// Emit the indefinite-length head for `major`.
pub(crate) fn write_indefinite(out: &mut Vec<u8>, major: u8) {
    out.push((major << 5) | 31);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(major: u8, value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        write_head(&mut out, major, value);
        out
    }

    #[test]
    fn minimal_width_ladder() {
        assert_eq!(written(0, 0), vec![0x00]);
        assert_eq!(written(0, 23), vec![0x17]);
        assert_eq!(written(0, 24), vec![0x18, 0x18]);
        assert_eq!(written(0, 255), vec![0x18, 0xff]);
        assert_eq!(written(0, 256), vec![0x19, 0x01, 0x00]);
        assert_eq!(written(0, 65_535), vec![0x19, 0xff, 0xff]);
        assert_eq!(written(0, 65_536), vec![0x1a, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(written(0, u64::from(u32::MAX)), vec![0x1a, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(
            written(0, u64::from(u32::MAX) + 1),
            vec![0x1b, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn read_back_matches() {
        for value in [0u64, 23, 24, 255, 256, 65_535, 65_536, u64::MAX] {
            let bytes = written(0, value);
            let mut s = CborStream::new(&bytes);
            let head = read_head(&mut s).unwrap();
            assert_eq!(head.major, 0);
            assert_eq!(head.arg, Arg::Value(value));
        }
    }

    #[test]
    fn reserved_additional_info_rejected() {
        for ib in [0x1cu8, 0x1d, 0x1e] {
            let buf = [ib];
            let mut s = CborStream::new(&buf);
            let err = read_head(&mut s).unwrap_err();
            assert!(matches!(err.code, ErrorCode::AdditionalInfoReserved(_)));
        }
    }

    #[test]
    fn indefinite_rejected_on_integer_majors() {
        for ib in [0x1fu8, 0x3f, 0xdf] {
            let buf = [ib];
            let mut s = CborStream::new(&buf);
            let err = read_head(&mut s).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidIndefiniteEncoding);
        }
    }
}
