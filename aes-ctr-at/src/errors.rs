//! Error types.
use core::{error, fmt};

/// Result type with the `aes-ctr-at` crate's [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

/// Precondition violations reported by [`AesCtrAt`][crate::AesCtrAt].
///
/// Every variant is detected before any output byte is written, so a failed
/// call leaves the destination buffer untouched.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Error {
    /// Key is not 16, 24 or 32 bytes long.
    InvalidKeyLength,
    /// IV is not exactly 16 bytes long.
    InvalidIvLength,
    /// Source and destination have different lengths.
    LengthMismatch,
    /// Source and destination partially overlap.
    InvalidOverlap,
    /// The requested backend is not supported by this CPU or target.
    BackendUnavailable,
}

impl Error {
    fn as_str(self) -> &'static str {
        match self {
            Error::InvalidKeyLength => "invalid key length: expected 16, 24 or 32 bytes",
            Error::InvalidIvLength => "invalid IV length: expected 16 bytes",
            Error::LengthMismatch => "source and destination lengths differ",
            Error::InvalidOverlap => "invalid buffer overlap",
            Error::BackendUnavailable => "requested AES backend is unavailable",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl error::Error for Error {}
