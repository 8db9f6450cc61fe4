//! The RLE-compressed boot logo bitmap every XBE carries, and the default
//! OpenXDK logo the translators stamp onto freshly built images.
use crate::error::{Error, Result};
use core::fmt;

/// Size in bytes of the default logo bitmap this crate stamps onto images
/// built by the translator.
pub const DEFAULT_LOGO_SIZE: usize = 387;

/// The default OpenXDK boot logo: an RLE-compressed 100x17, 4bpp bitmap.
#[rustfmt::skip]
pub const DEFAULT_LOGO_BITMAP: [u8; DEFAULT_LOGO_SIZE] = [
    0x02, 0x0F, 0x06, 0x41, 0x01, 0x2F, 0x04, 0xF6, 0x03, 0x03, 0x02, 0x43, 0x01, 0x1B, 0x01, 0x9D,
    0x09, 0x42, 0x01, 0x73, 0x06, 0x4E, 0x03, 0x94, 0x04, 0xCB, 0x07, 0x1A, 0x04, 0xED, 0x09, 0x3C,
    0x02, 0x74, 0x07, 0x14, 0x06, 0x24, 0x07, 0x8D, 0x03, 0xCB, 0x09, 0x19, 0x05, 0x3C, 0x05, 0xD2,
    0x01, 0xFA, 0x09, 0x44, 0x05, 0x2A, 0x06, 0x8B, 0x06, 0xFA, 0x02, 0xEC, 0x02, 0xE1, 0x05, 0x8D,
    0x07, 0xF3, 0x06, 0xD0, 0x04, 0x3F, 0x02, 0x3E, 0x04, 0x39, 0x06, 0xFF, 0x01, 0x8C, 0x07, 0x43,
    0x08, 0x9A, 0x04, 0xB5, 0x06, 0x8D, 0x06, 0x54, 0x06, 0x73, 0x01, 0xAC, 0x01, 0x9A, 0x01, 0x9F,
    0x05, 0x28, 0x04, 0x3B, 0x01, 0xEF, 0x04, 0x24, 0x09, 0x98, 0x01, 0x28, 0x04, 0xA1, 0x05, 0x42,
    0x07, 0x06, 0x03, 0x89, 0x02, 0x14, 0x02, 0xC2, 0x04, 0x33, 0x03, 0x52, 0x01, 0x91, 0x07, 0x50,
    0x06, 0x1C, 0x06, 0x03, 0x08, 0x2D, 0x08, 0x74, 0x04, 0xBA, 0x02, 0xEA, 0x08, 0x86, 0x06, 0xB4,
    0x05, 0xAE, 0x09, 0x07, 0x02, 0xD6, 0x04, 0x59, 0x02, 0xFE, 0x03, 0x6C, 0x07, 0x9A, 0x07, 0x56,
    0x04, 0x4D, 0x05, 0xD2, 0x05, 0x1D, 0x03, 0x55, 0x05, 0x2E, 0x07, 0xB2, 0x01, 0xB5, 0x08, 0xFE,
    0x09, 0x93, 0x07, 0xD4, 0x06, 0xFE, 0x01, 0x3C, 0x08, 0xFB, 0x01, 0x0D, 0x03, 0x30, 0x04, 0x4F,
    0x02, 0x44, 0x06, 0xA6, 0x04, 0x47, 0x05, 0x0A, 0x07, 0xCF, 0x05, 0xD4, 0x03, 0x8D, 0x01, 0x1A,
    0x07, 0x74, 0x08, 0xB4, 0x06, 0x68, 0x05, 0x28, 0x07, 0x44, 0x01, 0x8C, 0x09, 0x89, 0x03, 0x6B,
    0x01, 0x11, 0x05, 0x07, 0x05, 0xF7, 0x06, 0x0C, 0x09, 0x2E, 0x05, 0x24, 0x07, 0x02, 0x08, 0xE0,
    0x06, 0xD6, 0x05, 0x6C, 0x02, 0x78, 0x01, 0x09, 0x02, 0xF5, 0x06, 0x86, 0x06, 0x01, 0x05, 0xB2,
    0x09, 0x90, 0x08, 0xFC, 0x07, 0x70, 0x09, 0x26, 0x03, 0xAD, 0x07, 0x00, 0x01, 0x99, 0x05, 0x94,
    0x05, 0x0D, 0x09, 0xF3, 0x05, 0x4D, 0x04, 0x8F, 0x08, 0x4F, 0x01, 0xA4, 0x02, 0x3C, 0x05, 0x8B,
    0x07, 0xBB, 0x01, 0x53, 0x08, 0x1C, 0x03, 0xA6, 0x02, 0xF8, 0x04, 0x98, 0x09, 0x90, 0x08, 0xE5,
    0x09, 0xB4, 0x06, 0xA4, 0x05, 0x98, 0x07, 0xF2, 0x04, 0x68, 0x08, 0x79, 0x08, 0x7F, 0x03, 0xB9,
    0x08, 0x50, 0x01, 0xF5, 0x01, 0x7F, 0x07, 0x14, 0x03, 0x50, 0x05, 0x13, 0x02, 0x69, 0x05, 0x69,
    0x07, 0xDB, 0x08, 0x9D, 0x06, 0xAE, 0x09, 0xAD, 0x03, 0xF3, 0x09, 0x2D, 0x06, 0x23, 0x04, 0x9E,
    0x06, 0x26, 0x01, 0xEE, 0x08, 0x5B, 0x03, 0xB9, 0x08, 0xB5, 0x02, 0x54, 0x05, 0xFD, 0x08, 0xD3,
    0x09, 0x3A, 0x08, 0x42, 0x09, 0x37, 0x02, 0xEC, 0x09, 0xCE, 0x06, 0x51, 0x09, 0x5C, 0x08, 0x87,
    0x03, 0x9A, 0x09,
];

/// A logo bitmap carried through a translation unmodified.
pub struct LogoBitmap<'a>(pub(crate) &'a [u8]);

impl<'a> LogoBitmap<'a> {
    /// Wrap a logo bitmap slice read from a source image.
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::Truncated("empty logo bitmap".into()));
        }
        Ok(Self(bytes))
    }

    /// The raw RLE-compressed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0
    }
}

impl fmt::Display for LogoBitmap<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Logo Bitmap ({} bytes)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_logo_has_declared_size() {
        assert_eq!(DEFAULT_LOGO_BITMAP.len(), DEFAULT_LOGO_SIZE);
    }

    #[test]
    fn new_rejects_empty_bitmap() {
        assert!(LogoBitmap::new(&[]).is_err());
    }
}
