//! The fixed XBE header: the first 0x178 bytes of every `.xbe` file.
//!
//! Grounded on the field list and order used by `other_examples/
//! BfBBModdingTools-xbld`'s `raw::ImageHeader` (a complete, working Rust XBE
//! reader/writer) and cross-checked against `original_source/ReadXBE.cpp`'s
//! `ExtractXBEHeader`, which fixes the same field set and order for display.
use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use core::{fmt, str};

/// Magic value at the start of every XBE file: the four ASCII bytes `XBEH`.
pub const XBE_MAGIC: u32 = u32::from_le_bytes(*b"XBEH");

/// Minimal on-disk size of [`Header`]: 0x178 bytes.
/// This crate always emits exactly this size; anything read beyond it in a
/// source file is preserved verbatim as [`crate::xbe::Xbe::header_extra`]
/// for round-trip fidelity rather than being modeled.
pub const HEADER_SIZE: usize = 0x178;

/// Default image base address XBEs are loaded at.
pub const DEFAULT_BASE_ADDRESS: u32 = 0x0001_0000;

/// The fixed XBE header. All address fields are image-relative absolute
/// addresses (base + offset), never raw file offsets.
#[derive(Copy, Clone, Pod, Zeroable, Default)]
#[repr(C)]
pub struct Header {
    /// Must equal [`XBE_MAGIC`].
    pub magic: u32,
    /// 256-byte RSA digital signature. Unused by this crate beyond
    /// round-tripping; always zero-filled on freshly translated images.
    pub digital_signature: [u8; 256],
    /// Preferred load address of the whole image.
    pub base_address: u32,
    /// Size of all header structures, rounded up to the page size.
    pub size_of_headers: u32,
    /// Size of the image as loaded, including section padding.
    pub size_of_image: u32,
    /// Size of this header structure (0x178, 0x180, or larger).
    pub size_of_image_header: u32,
    /// Unix timestamp of image creation.
    pub time_date: u32,
    /// Address of the [`crate::xbe::certificate::Certificate`].
    pub certificate_address: u32,
    /// Number of sections (== length of the section header table).
    pub section_count: u32,
    /// Address of the first section header.
    pub section_headers_address: u32,
    /// Initialization flags bitfield.
    pub init_flags: u32,
    /// XOR-obfuscated entry point address.
    pub entry_address: u32,
    /// Address of the TLS directory, or zero if absent.
    pub tls_address: u32,
    /// PE stack commit size, copied from the source PE.
    pub pe_stack_commit: u32,
    /// PE heap reserve size, copied from the source PE.
    pub pe_heap_reserve: u32,
    /// PE heap commit size, copied from the source PE.
    pub pe_heap_commit: u32,
    /// The source PE's preferred image base.
    pub pe_base_address: u32,
    /// The source PE's size of image.
    pub pe_size_of_image: u32,
    /// The source PE's checksum.
    pub pe_checksum: u32,
    /// The source PE's timestamp.
    pub pe_time_date: u32,
    /// Address of the NUL-terminated ASCII debug path.
    pub debug_pathname_address: u32,
    /// Address of the NUL-terminated ASCII debug filename (a suffix of the
    /// pathname).
    pub debug_filename_address: u32,
    /// Address of the NUL-terminated UTF-16LE debug filename.
    pub debug_unicode_filename_address: u32,
    /// XOR-obfuscated address of the kernel thunk table.
    pub kernel_thunk_address: u32,
    /// Address of the non-kernel import directory, or zero if absent.
    pub non_kernel_import_directory_address: u32,
    /// Number of entries in the library-version table.
    pub library_versions_count: u32,
    /// Address of the library-version table.
    pub library_versions_address: u32,
    /// Address of the `XBOXKRNL` entry within the library-version table.
    pub kernel_library_version_address: u32,
    /// Address of the `XAPILIB` entry within the library-version table.
    pub xapi_library_version_address: u32,
    /// Address of the logo bitmap.
    pub logo_bitmap_address: u32,
    /// Size of the logo bitmap in bytes.
    pub logo_bitmap_size: u32,
}

bitflags! {
    /// Initialization flags bitfield.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct InitFlags: u32 {
        /// Mount the utility drive.
        const MOUNT_UTILITY_DRIVE = 0x1;
        /// Format the utility drive.
        const FORMAT_UTILITY_DRIVE = 0x2;
        /// Limit available memory to 64 MiB.
        const LIMIT_64MB = 0x4;
        /// Don't set up the hard disk.
        const DONT_SETUP_HARDDISK = 0x8;
    }
}

impl fmt::Debug for InitFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for InitFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl str::FromStr for InitFlags {
    type Err = bitflags::parser::ParseError;

    fn from_str(flags: &str) -> core::result::Result<Self, Self::Err> {
        Ok(Self(flags.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_matches_spec_minimum() {
        assert_eq!(core::mem::size_of::<Header>(), HEADER_SIZE);
    }

    #[test]
    fn magic_is_xbeh_ascii() {
        assert_eq!(&XBE_MAGIC.to_le_bytes(), b"XBEH");
    }
}
