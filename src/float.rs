//! IEEE-754 half/single/double read and write, plus the lossless-narrowing
//! tests the encoder's width selection depends on.

use half::f16;
use num_traits::FromPrimitive;

/// Canonical half-precision NaN: `f9 7e 00`.
pub(crate) const HALF_NAN: [u8; 3] = [0xf9, 0x7e, 0x00];
/// Canonical half-precision +Infinity: `f9 7c 00`.
pub(crate) const HALF_POS_INFINITY: [u8; 3] = [0xf9, 0x7c, 0x00];
/// Canonical half-precision -Infinity: `f9 fc 00`.
pub(crate) const HALF_NEG_INFINITY: [u8; 3] = [0xf9, 0xfc, 0x00];
/// Canonical half-precision -0.0: `f9 80 00`.
pub(crate) const HALF_NEG_ZERO: [u8; 3] = [0xf9, 0x80, 0x00];

/// Widen a decoded half-precision bit pattern to `f64`.
#[inline]
pub(crate) fn decode_half(bits: u16) -> f64 {
    f64::from(f16::from_bits(bits))
}

fn lossless<T>(value: f64) -> Option<T>
where
    T: FromPrimitive + Into<f64> + Copy,
{
    match T::from_f64(value) {
        Some(narrow) if <T as Into<f64>>::into(narrow) == value => Some(narrow),
        _ => None,
    }
}

/// Narrow `value` to half precision if no mantissa or exponent bits are lost.
///
/// Finite values only; NaN and the infinities have dedicated canonical halves
/// and are handled before width selection. The general encoder never emits
/// halves (that is canonical-mode territory), but callers layering a
/// deterministic encoding on top need this test.
#[must_use]
pub fn as_lossless_half(value: f64) -> Option<u16> {
    if !value.is_finite() {
        return None;
    }
    lossless::<f16>(value).map(f16::to_bits)
}

/// Write the CBOR float encoding of `value`.
///
/// NaN, the infinities and negative zero take their canonical half forms;
/// other values take single precision when the narrowing is lossless and
/// double precision otherwise.
pub(crate) fn write_float(out: &mut Vec<u8>, value: f64) {
    if value.is_nan() {
        out.extend_from_slice(&HALF_NAN);
        return;
    }
    if value.is_infinite() {
        out.extend_from_slice(if value.is_sign_positive() {
            &HALF_POS_INFINITY
        } else {
            &HALF_NEG_INFINITY
        });
        return;
    }
    if value == 0.0 && value.is_sign_negative() {
        out.extend_from_slice(&HALF_NEG_ZERO);
        return;
    }
    if let Some(single) = lossless::<f32>(value) {
        out.push(0xfa);
        out.extend_from_slice(&single.to_be_bytes());
    } else {
        out.push(0xfb);
        out.extend_from_slice(&value.to_be_bytes());
    }
}
