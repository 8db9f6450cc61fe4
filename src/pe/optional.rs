//! PE32 optional header and data directories.
//!
//! Narrowed to PE32 only: producing or meaningfully consuming a PE32+ image
//! is out of scope here, so `OptionalHeader64` is dropped and `Magic::PE64`
//! becomes a parse-time `Error::UnsupportedFormat` rather than a second code
//! path.
use crate::error::{Error, Result};
use crate::prelude::*;
use bitflags::bitflags;
use bytemuck::{checked::try_from_bytes, Pod, Zeroable};
use core::{fmt, str};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// The PE subsystem value reserved for Xbox images.
pub const IMAGE_SUBSYSTEM_XBOX: u16 = 14;

/// Default file alignment used by this crate's PE emitter.
pub const DEFAULT_FILE_ALIGNMENT: u32 = 0x200;
/// Default section alignment used by this crate's PE emitter.
pub const DEFAULT_SECTION_ALIGNMENT: u32 = 0x1000;
/// Default `size_of_headers` used by this crate's PE emitter.
pub const DEFAULT_SIZE_OF_HEADERS: u32 = 0x400;

/// Magic values distinguishing PE32 from PE32+.
#[derive(FromPrimitive, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum Magic {
    /// 32-bit PE, the only variant this crate emits or fully supports.
    PE32 = 0x10b,
    /// 64-bit PE. Recognized only so the loader can reject it cleanly.
    PE64 = 0x20b,
}

/// The sixteen (RVA, size) data directory entries.
#[derive(Copy, Clone, Pod, Zeroable, Default)]
#[repr(C)]
pub struct DataDirectories {
    /// Export table (.edata).
    pub export_table: DataDirectory,
    /// Import table (.idata).
    pub import_table: DataDirectory,
    /// Resource table (.rsrc).
    pub resource_table: DataDirectory,
    /// Exception table (.pdata).
    pub exception_table: DataDirectory,
    /// Attribute certificate table.
    pub certificate_table: DataDirectory,
    /// Base relocation table (.reloc).
    pub base_relocation_table: DataDirectory,
    /// Debug data (.debug).
    pub debug: DataDirectory,
    /// Reserved, must be zero.
    pub architecture: DataDirectory,
    /// RVA of the global pointer register value; size must be zero.
    pub global_ptr: DataDirectory,
    /// Thread local storage table (.tls).
    pub tls_table: DataDirectory,
    /// Load configuration table.
    pub load_config_table: DataDirectory,
    /// Bound import table.
    pub bound_import: DataDirectory,
    /// Import address table.
    pub import_address_table: DataDirectory,
    /// Delay import descriptor.
    pub delay_import_descriptor: DataDirectory,
    /// CLR runtime header (.cormeta).
    pub clr_runtime_header: DataDirectory,
    /// Reserved, must be zero.
    pub reserved: DataDirectory,
}

/// Index of [`DataDirectories::tls_table`] within the flat 16-entry array.
pub const IMAGE_DIRECTORY_ENTRY_TLS: usize = 9;

/// One (RVA, size) data directory entry.
#[derive(Copy, Clone, Pod, Zeroable, Default)]
#[repr(C)]
pub struct DataDirectory {
    /// RVA of the table, relative to the image base.
    pub virtual_address: u32,
    /// Size of the table in bytes.
    pub size: u32,
}

/// PE32 Optional Header (image only).
#[derive(Copy, Clone, Pod, Zeroable, Default)]
#[repr(C)]
pub struct OptionalHeader32 {
    /// 0x10B for a normal PE32 executable.
    pub magic: u16,
    /// Linker major version.
    pub major_linker_version: u8,
    /// Linker minor version.
    pub minor_linker_version: u8,
    /// Sum of all code sections' raw size.
    pub size_of_code: u32,
    /// Sum of all initialized-data sections' raw size.
    pub size_of_initialized_data: u32,
    /// Sum of all uninitialized-data (BSS) sections' raw size.
    pub size_of_uninitialized_data: u32,
    /// Entry point RVA.
    pub address_of_entry_point: u32,
    /// RVA of the beginning of the code section.
    pub base_of_code: u32,
    /// RVA of the beginning of the data section (PE32 only).
    pub base_of_data: u32,
    /// Preferred load address of the image.
    pub image_base: u32,
    /// Alignment of sections once loaded into memory.
    pub section_alignment: u32,
    /// Alignment of section raw data on disk.
    pub file_alignment: u32,
    /// OS major version.
    pub major_operating_system_version: u16,
    /// OS minor version.
    pub minor_operating_system_version: u16,
    /// Image major version.
    pub major_image_version: u16,
    /// Image minor version.
    pub minor_image_version: u16,
    /// Subsystem major version.
    pub major_subsystem_version: u16,
    /// Subsystem minor version.
    pub minor_subsystem_version: u16,
    /// Reserved, must be zero.
    pub win32_version_value: u32,
    /// Size of the image as loaded, a multiple of `section_alignment`.
    pub size_of_image: u32,
    /// Combined size of DOS stub, PE header, and section headers, rounded up
    /// to `file_alignment`.
    pub size_of_headers: u32,
    /// Image checksum.
    pub check_sum: u32,
    /// Required subsystem (14 for Xbox).
    pub subsystem: u16,
    /// DLL characteristics bitflags.
    pub dll_characteristics: u16,
    /// Stack reserve size.
    pub size_of_stack_reserve: u32,
    /// Stack commit size.
    pub size_of_stack_commit: u32,
    /// Heap reserve size.
    pub size_of_heap_reserve: u32,
    /// Heap commit size.
    pub size_of_heap_commit: u32,
    /// Reserved, must be zero.
    pub loader_flags: u32,
    /// Number of data directory entries that follow (16).
    pub number_of_rva_and_sizes: u32,
    /// The sixteen data directories.
    pub data_directories: DataDirectories,
}

impl OptionalHeader32 {
    /// Returns the subsystem as an enum, if recognized.
    pub fn get_subsystem(&self) -> Option<Subsystem> {
        Subsystem::from_u16(self.subsystem)
    }

    /// Returns the DLL characteristics as bitflags, if all bits are
    /// recognized.
    pub fn get_dll_characteristics(&self) -> Option<DllCharacteristics> {
        DllCharacteristics::from_bits(self.dll_characteristics)
    }

    /// Parse a PE32 optional header at `*offset`, advancing `offset` past it.
    pub fn parse(binary: &[u8], offset: &mut usize) -> Result<Self> {
        let size = size_of::<Self>();
        let slice = binary
            .get(*offset..*offset + size)
            .ok_or_else(|| Error::Truncated("PE32 optional header".into()))?;
        let header = try_from_bytes::<Self>(slice)
            .map_err(|e| Error::BadMagic(format!("malformed PE32 optional header: {e}")))?;
        *offset += size;
        Ok(*header)
    }
}

impl fmt::Display for OptionalHeader32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optional Header")?;
        writeln!(f, "---------------")?;
        writeln!(f, "Magic:                      PE32")?;
        writeln!(f, "Linker Version:             {}.{}", self.major_linker_version, self.minor_linker_version)?;
        writeln!(f, "Address of Entry Point:     {:#010x}", self.address_of_entry_point)?;
        writeln!(f, "Image Base:                 {:#010x}", self.image_base)?;
        writeln!(f, "Section Alignment:          {:#x}", self.section_alignment)?;
        writeln!(f, "File Alignment:             {:#x}", self.file_alignment)?;
        writeln!(f, "Size of Image:              {}", self.size_of_image)?;
        writeln!(f, "Size of Headers:            {}", self.size_of_headers)?;
        writeln!(f, "Subsystem:                  {:?}", self.get_subsystem())?;
        write!(f, "DLL Characteristics:        {:?}", self.get_dll_characteristics())
    }
}

/// Windows subsystem required to run the image.
#[derive(FromPrimitive, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum Subsystem {
    /// Unknown subsystem.
    Unknown = 0,
    /// Native Windows process.
    Native = 1,
    /// Windows GUI.
    WindowsGui = 2,
    /// Windows console.
    WindowsCui = 3,
    /// Xbox. The only subsystem this crate's translator emits.
    Xbox = 14,
}

bitflags! {
    /// Flags describing how a DLL should be loaded.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct DllCharacteristics: u16 {
        /// Image can handle a high-entropy 64-bit address space.
        const IMAGE_DLLCHARACTERISTICS_HIGH_ENTROPY_VA = 0x0020;
        /// DLL can be relocated at load time.
        const IMAGE_DLLCHARACTERISTICS_DYNAMIC_BASE = 0x0040;
        /// Image is NX compatible.
        const IMAGE_DLLCHARACTERISTICS_NX_COMPAT = 0x0100;
        /// Does not use structured exception handling.
        const IMAGE_DLLCHARACTERISTICS_NO_SEH = 0x0400;
        /// Image supports Control Flow Guard.
        const IMAGE_DLLCHARACTERISTICS_GUARD_CF = 0x4000;
    }
}

impl fmt::Debug for DllCharacteristics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for DllCharacteristics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl str::FromStr for DllCharacteristics {
    type Err = bitflags::parser::ParseError;

    fn from_str(flags: &str) -> core::result::Result<Self, Self::Err> {
        Ok(Self(flags.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xbox_subsystem_constant_matches_enum() {
        assert_eq!(Subsystem::from_u16(IMAGE_SUBSYSTEM_XBOX), Some(Subsystem::Xbox));
    }

    #[test]
    fn parse_rejects_truncated_header() {
        let buf = [0u8; 10];
        let mut offset = 0;
        assert!(OptionalHeader32::parse(&buf, &mut offset).is_err());
    }
}
