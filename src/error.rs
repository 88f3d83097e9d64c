use core::fmt;

/// A structured error code identifying why an encode or decode call failed.
///
/// Codes carry only the data needed to render a stable message; the byte
/// offset lives on [`CborError`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCode {
    /// Decoding ran past the end of the input.
    InsufficientData,
    /// A reserved additional-info value (28, 29 or 30) was used.
    AdditionalInfoReserved(u8),
    /// A BREAK byte (`0xff`) appeared outside an open indefinite-length
    /// container.
    InvalidBreak,
    /// An indefinite-length string contained a nested indefinite-length
    /// chunk, or an indefinite head was used on major type 0, 1 or 6.
    InvalidIndefiniteEncoding,
    /// A chunk inside an indefinite-length string had the wrong major type.
    InvalidIndefiniteMajor(u8),
    /// An indefinite-length map broke between a key and its value.
    InvalidMapLength,
    /// A two-byte simple value (`0xf8 nn`) carried a value below 32, or a
    /// simple value in the reserved range 24..=31 was encoded.
    InvalidSimpleEncoding(u8),
    /// Input remained after the single requested item was decoded.
    UnexpectedData,
    /// A text string payload was not valid UTF-8.
    InvalidUtf8,
    /// Arithmetic overflow while computing a length or offset.
    LengthOverflow,
    /// Nesting depth exceeded [`DecodeLimits::max_depth`](crate::DecodeLimits).
    DepthLimitExceeded,
    /// Input length exceeded
    /// [`DecodeLimits::max_input_bytes`](crate::DecodeLimits).
    InputLimitExceeded,
    /// A strict tag interpreter rejected the tagged content.
    TagFailed(Box<str>),

    /// `encode_canonical` was called; deterministic encoding is declared but
    /// not implemented.
    CanonicalNotImplemented,
    /// An `undefined` map key was encoded while
    /// [`disallow_undefined_keys`](crate::EncodeOptions) was set.
    UndefinedMapKey,
    /// The encoder re-entered a container it was already inside.
    LoopDetected,
    /// An extension value declined to encode its payload.
    UnknownType(&'static str),
    /// `encode_indefinite` was called with a zero chunk size.
    InvalidChunkSize,
    /// A timestamp fell outside the representable range of its wire form.
    TimestampRange,
}

/// A codec error with a structured code and the byte offset where it was
/// detected.
///
/// Decoder offsets refer to the input; encoder offsets refer to the number of
/// bytes emitted before the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CborError {
    /// The error code.
    pub code: ErrorCode,
    /// Byte offset at which the error was detected.
    pub offset: usize,
}

impl CborError {
    /// Construct an error at `offset`.
    #[inline]
    #[must_use]
    pub const fn new(code: ErrorCode, offset: usize) -> Self {
        Self { code, offset }
    }
}

impl fmt::Display for CborError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cbor error at {}: ", self.offset)?;
        match &self.code {
            ErrorCode::InsufficientData => f.write_str("Insufficient data"),
            ErrorCode::AdditionalInfoReserved(ai) => {
                write!(f, "Additional info not implemented ({ai})")
            }
            ErrorCode::InvalidBreak => f.write_str("Invalid BREAK"),
            ErrorCode::InvalidIndefiniteEncoding => f.write_str("Invalid indefinite encoding"),
            ErrorCode::InvalidIndefiniteMajor(mt) => {
                write!(f, "Invalid major type in indefinite encoding ({mt})")
            }
            ErrorCode::InvalidMapLength => f.write_str("Invalid map length"),
            ErrorCode::InvalidSimpleEncoding(v) => {
                write!(f, "Invalid two-byte encoding of simple value {v}")
            }
            ErrorCode::UnexpectedData => f.write_str("Unexpected data after decoded item"),
            ErrorCode::InvalidUtf8 => f.write_str("Invalid UTF-8 in text string"),
            ErrorCode::LengthOverflow => f.write_str("Length overflow"),
            ErrorCode::DepthLimitExceeded => f.write_str("Nesting depth limit exceeded"),
            ErrorCode::InputLimitExceeded => f.write_str("Input length exceeds decode limits"),
            ErrorCode::TagFailed(msg) => write!(f, "Invalid tag content: {msg}"),

            ErrorCode::CanonicalNotImplemented => f.write_str("canonical mode not implemented"),
            ErrorCode::UndefinedMapKey => f.write_str("Invalid Map key: undefined"),
            ErrorCode::LoopDetected => f.write_str("Loop detected while CBOR encoding"),
            ErrorCode::UnknownType(name) => write!(f, "Unknown type: {name}"),
            ErrorCode::InvalidChunkSize => f.write_str("Invalid chunk size"),
            ErrorCode::TimestampRange => f.write_str("Timestamp out of range"),
        }
    }
}

impl std::error::Error for CborError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_stable_substrings() {
        let cases = [
            (ErrorCode::InsufficientData, "Insufficient data"),
            (
                ErrorCode::AdditionalInfoReserved(28),
                "Additional info not implemented",
            ),
            (ErrorCode::InvalidBreak, "Invalid BREAK"),
            (
                ErrorCode::InvalidIndefiniteEncoding,
                "Invalid indefinite encoding",
            ),
            (
                ErrorCode::InvalidIndefiniteMajor(0),
                "Invalid major type in indefinite encoding",
            ),
            (ErrorCode::InvalidMapLength, "Invalid map length"),
            (
                ErrorCode::InvalidSimpleEncoding(24),
                "Invalid two-byte encoding of simple value",
            ),
            (ErrorCode::UnexpectedData, "Unexpected data"),
            (
                ErrorCode::CanonicalNotImplemented,
                "canonical mode not implemented",
            ),
            (ErrorCode::UndefinedMapKey, "Invalid Map key: undefined"),
            (
                ErrorCode::LoopDetected,
                "Loop detected while CBOR encoding",
            ),
            (ErrorCode::UnknownType("Duration"), "Unknown type: Duration"),
        ];
        for (code, needle) in cases {
            let msg = CborError::new(code, 7).to_string();
            assert!(msg.contains(needle), "{msg:?} missing {needle:?}");
        }
    }
}
