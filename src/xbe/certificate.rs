//! XBE certificate: title identity, region/rating flags, and signing keys.
//!
//! Field layout grounded on `other_examples/BfBBModdingTools-xbld`'s
//! `raw::Certificate`, whose `SIZE`/`BYTES_READ` constants (0x1ec total,
//! 0x1d0 of which this crate models) match the sum of the fields below
//! exactly.
use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use core::{fmt, str};

/// Declared total size of a certificate, `0x1ec` bytes.
pub const CERTIFICATE_SIZE: u32 = 0x1ec;

/// Number of bytes of [`Certificate`] this crate models. Any remainder up to
/// `size` (`CERTIFICATE_SIZE` in a normally constructed image) is carried as
/// opaque trailing bytes for round-trip fidelity.
pub const MODELED_BYTES: u32 = 0x1d0;

/// Title ID used for translator-built XBEs when the caller doesn't supply
/// one.
pub const DEFAULT_TITLE_ID: u32 = 0xFFFF_0002;

/// Title name field length, in UTF-16 code units.
pub const TITLE_NAME_CHARS: usize = 40;

/// The fixed-size portion of the XBE certificate.
#[derive(Copy, Clone, Pod, Zeroable, Default)]
#[repr(C)]
pub struct Certificate {
    /// Total declared size of the certificate, including the trailing bytes
    /// this struct doesn't model.
    pub size: u32,
    /// Unix timestamp.
    pub time_date: u32,
    /// Unique title identifier.
    pub title_id: u32,
    /// Title name, UTF-16LE, NUL-padded to 40 code units (80 bytes).
    pub title_name: [u8; 0x50],
    /// Alternate title IDs (16 x u32, stored as raw bytes).
    pub alternate_title_ids: [u8; 0x40],
    /// Allowed media types bitflags.
    pub allowed_media: u32,
    /// Game region bitflags.
    pub game_region: u32,
    /// Game content ratings.
    pub game_ratings: u32,
    /// Disk number.
    pub disk_number: u32,
    /// Title version.
    pub version: u32,
    /// LAN encryption key.
    pub lan_key: [u8; 0x10],
    /// Signature key.
    pub signature_key: [u8; 0x10],
    /// Alternate signature keys.
    pub alternate_signature_keys: [u8; 0x100],
}

impl Certificate {
    /// Decode the title name, stopping at the first NUL code unit.
    pub fn title_name_string(&self) -> String {
        let units: Vec<u16> = self
            .title_name
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .take_while(|&u| u != 0)
            .collect();
        String::from_utf16_lossy(&units)
    }

    /// Encode `title` as UTF-16LE, NUL-padded/truncated to
    /// [`TITLE_NAME_CHARS`] code units, and write it into `title_name`.
    pub fn set_title_name(&mut self, title: &str) {
        self.title_name = [0u8; 0x50];
        for (i, unit) in title.encode_utf16().take(TITLE_NAME_CHARS).enumerate() {
            let bytes = unit.to_le_bytes();
            self.title_name[i * 2] = bytes[0];
            self.title_name[i * 2 + 1] = bytes[1];
        }
    }

    /// Returns the allowed-media bitflags, if all bits are recognized.
    pub fn get_allowed_media(&self) -> Option<AllowedMedia> {
        AllowedMedia::from_bits(self.allowed_media)
    }

    /// Returns the game-region bitflags, if all bits are recognized.
    pub fn get_game_region(&self) -> Option<GameRegion> {
        GameRegion::from_bits(self.game_region)
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Certificate")?;
        writeln!(f, "-----------")?;
        writeln!(f, "Title ID:      {:#010x}", self.title_id)?;
        writeln!(f, "Title Name:    {}", self.title_name_string())?;
        writeln!(f, "Allowed Media: {:?}", self.get_allowed_media())?;
        write!(f, "Game Region:   {:?}", self.get_game_region())
    }
}

bitflags! {
    /// Media types the title may be distributed or booted from.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct AllowedMedia: u32 {
        /// Hard disk.
        const HARD_DISK = 0x0000_0001;
        /// DVD/XGD.
        const DVD_X2 = 0x0000_0002;
        /// DVD/CD.
        const DVD_CD = 0x0000_0004;
        /// CD.
        const CD = 0x0000_0008;
        /// DVD 5 read-only.
        const DVD_5_RO = 0x0000_0010;
        /// DVD 9 read-only.
        const DVD_9_RO = 0x0000_0020;
        /// DVD 5 read-write.
        const DVD_5_RW = 0x0000_0040;
        /// DVD 9 read-write.
        const DVD_9_RW = 0x0000_0080;
        /// Dongle-secured media.
        const DONGLE = 0x0000_0100;
        /// Media board.
        const MEDIA_BOARD = 0x0000_0200;
        /// Non-secure hard disk.
        const NONSECURE_HARD_DISK = 0x4000_0000;
        /// Non-secure mode.
        const NONSECURE_MODE = 0x8000_0000;
    }
}

impl fmt::Debug for AllowedMedia {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for AllowedMedia {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl str::FromStr for AllowedMedia {
    type Err = bitflags::parser::ParseError;

    fn from_str(flags: &str) -> core::result::Result<Self, Self::Err> {
        Ok(Self(flags.parse()?))
    }
}

bitflags! {
    /// Geographic regions the title may boot in.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct GameRegion: u32 {
        /// North America.
        const NA = 0x0000_0001;
        /// Japan.
        const JAPAN = 0x0000_0002;
        /// Rest of world.
        const RESTOFWORLD = 0x0000_0004;
        /// Manufacturing/debug kits.
        const MANUFACTURING = 0x8000_0000;
    }
}

impl fmt::Debug for GameRegion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for GameRegion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl str::FromStr for GameRegion {
    type Err = bitflags::parser::ParseError;

    fn from_str(flags: &str) -> core::result::Result<Self, Self::Err> {
        Ok(Self(flags.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modeled_size_matches_fixed_fields() {
        assert_eq!(core::mem::size_of::<Certificate>() as u32, MODELED_BYTES);
    }

    #[test]
    fn title_name_round_trips() {
        let mut cert = Certificate::default();
        cert.set_title_name("Untitled");
        assert_eq!(cert.title_name_string(), "Untitled");
    }

    #[test]
    fn title_name_truncates_to_40_chars() {
        let mut cert = Certificate::default();
        let long = "x".repeat(60);
        cert.set_title_name(&long);
        assert_eq!(cert.title_name_string().len(), TITLE_NAME_CHARS);
    }
}
