//! Library version entries: one per statically-linked Xbox library an image
//! declares a dependency on, including the mandatory `XBOXKRNL` and
//! `XAPILIB` entries.
use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use core::{fmt, str};

/// One library-version table entry (0x10 bytes on disk).
#[derive(Copy, Clone, Pod, Zeroable, Default)]
#[repr(C)]
pub struct LibraryVersion {
    /// 8-byte, NUL-padded ASCII library name (e.g. `XBOXKRNL`, `XAPILIB`).
    pub name: [u8; 8],
    /// Major version.
    pub major_version: u16,
    /// Minor version.
    pub minor_version: u16,
    /// Build version.
    pub build_version: u16,
    /// Flags (QFE version + approved + debug-build bits).
    pub flags: u16,
}

impl LibraryVersion {
    /// The library name with trailing NUL bytes trimmed.
    pub fn name_str(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(8);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    /// Returns the flags as bitflags, if all bits are recognized.
    pub fn get_flags(&self) -> Option<LibraryFlags> {
        LibraryFlags::from_bits(self.flags)
    }
}

impl fmt::Display for LibraryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{}.{} ({:?})",
            self.name_str(),
            self.major_version,
            self.minor_version,
            self.build_version,
            self.get_flags()
        )
    }
}

bitflags! {
    /// Library version flags, packed as QFE version (low 13 bits) plus two
    /// single-bit flags.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct LibraryFlags: u16 {
        /// The library build has been approved by Microsoft for release.
        const APPROVED = 0x4000;
        /// The library was built in debug configuration.
        const DEBUG_BUILD = 0x8000;
    }
}

impl fmt::Debug for LibraryFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for LibraryFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl str::FromStr for LibraryFlags {
    type Err = bitflags::parser::ParseError;

    fn from_str(flags: &str) -> core::result::Result<Self, Self::Err> {
        Ok(Self(flags.parse()?))
    }
}

/// Pack an 8-byte, NUL-padded library name, truncating at 8 bytes.
pub fn pack_name(name: &str) -> [u8; 8] {
    let mut buf = [0u8; 8];
    let bytes = name.as_bytes();
    let len = bytes.len().min(8);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_version_is_0x10_bytes() {
        assert_eq!(core::mem::size_of::<LibraryVersion>(), 0x10);
    }

    #[test]
    fn name_round_trips() {
        let lv = LibraryVersion { name: pack_name("XBOXKRNL"), ..Default::default() };
        assert_eq!(lv.name_str(), "XBOXKRNL");
    }
}
