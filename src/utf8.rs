use crate::{CborError, ErrorCode};

#[cfg(feature = "simdutf8")]
use simdutf8::basic as simd_utf8;

/// Validates UTF-8 bytes and returns a borrowed `&str` on success.
///
/// Invalid sequences are fatal to the decode call; `offset` locates the
/// string payload in the input.
#[inline]
pub(crate) fn validate(bytes: &[u8], offset: usize) -> Result<&str, CborError> {
    #[cfg(feature = "simdutf8")]
    {
        simd_utf8::from_utf8(bytes).map_err(|_| CborError::new(ErrorCode::InvalidUtf8, offset))
    }

    #[cfg(not(feature = "simdutf8"))]
    {
        core::str::from_utf8(bytes).map_err(|_| CborError::new(ErrorCode::InvalidUtf8, offset))
    }
}
