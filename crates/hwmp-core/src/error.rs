//! Error types for element decoding.

use crate::types::InvalidLength;

/// A wire element could not be decoded.
///
/// Decoding never partially applies: a frame that yields this error is
/// discarded as a whole.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ElementError {
    #[error("element too short: need at least {min} bytes, got {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("element length mismatch: declared {declared}, actual {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("information field of {0} bytes is not a whole number of units")]
    UnitSizeMismatch(usize),

    #[error("unknown element id: {0}")]
    UnknownElement(u8),

    #[error("too many units: max {max}, got {actual}")]
    TooManyUnits { max: usize, actual: usize },

    #[error("missing element: {0}")]
    MissingElement(&'static str),

    #[error("invalid address: {0}")]
    InvalidAddress(#[from] InvalidLength),
}
