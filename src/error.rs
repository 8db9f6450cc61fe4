//! Crate-wide error type.
//!
//! The retrieved teacher crate grows one ad hoc variant per failure site
//! (`OffsetOutOfRange`, `BadOptionalHeader`, `MissingCoffHeader`, ...). This
//! crate buckets those into a fixed, small vocabulary of error *kinds*,
//! because the translator's callers (and its tests) care about which kind of
//! thing went wrong, not which parse site noticed it first.
use core::fmt;

/// Everything that can go wrong while reading, translating, or writing a PE
/// or XBE image.
#[derive(Debug)]
pub enum Error {
    /// A read ran past the end of the available bytes.
    Truncated(String),
    /// A magic number or signature did not match what was expected.
    BadMagic(String),
    /// The input is a recognizable but unsupported variant (e.g. PE32+).
    UnsupportedFormat(String),
    /// An internal pointer resolved outside the bounds of the image.
    AddressOutOfRange(String),
    /// A DXT precondition (`file_alignment == section_alignment`) failed.
    AlignmentMismatch(String),
    /// Packed section bytes would exceed their declared size.
    SectionOverflow(String),
    /// The underlying file access failed.
    Io(std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Truncated(msg) => write!(f, "truncated: {msg}"),
            Error::BadMagic(msg) => write!(f, "bad magic: {msg}"),
            Error::UnsupportedFormat(msg) => write!(f, "unsupported format: {msg}"),
            Error::AddressOutOfRange(msg) => write!(f, "address out of range: {msg}"),
            Error::AlignmentMismatch(msg) => write!(f, "alignment mismatch: {msg}"),
            Error::SectionOverflow(msg) => write!(f, "section overflow: {msg}"),
            Error::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
