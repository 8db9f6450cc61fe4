//! COFF file header, restricted in practice to the i386/image-only subset
//! the Xbox toolchain emits, but still able to recognize (and name) other
//! machine types and characteristics bits.
use crate::prelude::*;
use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use core::{fmt, str};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// COFF File Header (Object and Image).
#[derive(Copy, Clone, Pod, Zeroable, Default)]
#[repr(C)]
pub struct CoffHeader {
    /// The number that identifies the type of target machine.
    pub machine: u16,
    /// The number of sections; determines the size of the section table
    /// that immediately follows the headers.
    pub number_of_sections: u16,
    /// Seconds since the Unix epoch at which the file was created.
    pub time_date_stamp: u32,
    /// File offset of the COFF symbol table. Zero for an image.
    pub pointer_to_symbol_table: u32,
    /// Number of entries in the symbol table. Zero for an image.
    pub number_of_symbols: u32,
    /// Size of the optional header that follows.
    pub size_of_optional_header: u16,
    /// Flags describing the attributes of the file.
    pub characteristics: u16,
}

impl CoffHeader {
    /// A COFF header matching the Xbox toolchain's fixed expectations:
    /// i386, image, relocations stripped, 32-bit machine.
    pub fn for_xbox(number_of_sections: u16, size_of_optional_header: u16) -> Self {
        Self {
            machine: MachineType::I386 as u16,
            number_of_sections,
            time_date_stamp: 0,
            pointer_to_symbol_table: 0,
            number_of_symbols: 0,
            size_of_optional_header,
            characteristics: Characteristics::IMAGE_FILE_RELOCS_STRIPPED.bits()
                | Characteristics::IMAGE_FILE_EXECUTABLE_IMAGE.bits()
                | Characteristics::IMAGE_FILE_32BIT_MACHINE.bits(),
        }
    }

    /// Returns the machine type as an enum, if recognized.
    pub fn get_machine_type(&self) -> Option<MachineType> {
        MachineType::from_u16(self.machine)
    }

    /// Returns the characteristics as bitflags, if all bits are recognized.
    pub fn get_characteristics(&self) -> Option<Characteristics> {
        Characteristics::from_bits(self.characteristics)
    }
}

impl fmt::Display for CoffHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "COFF Header")?;
        writeln!(f, "-----------")?;
        writeln!(f, "Machine Type:            {:?}", self.get_machine_type())?;
        writeln!(f, "Number of Sections:      {}", self.number_of_sections)?;
        writeln!(f, "Time Date Stamp:         {:#010x}", self.time_date_stamp)?;
        writeln!(f, "Size of Optional Header: {}", self.size_of_optional_header)?;
        write!(f, "Characteristics:         {:?}", self.get_characteristics())
    }
}

/// CPU type a PE image targets. The Xbox toolchain only ever emits `I386`;
/// the rest are recognized so a loaded arbitrary PE can still be displayed.
#[derive(FromPrimitive, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u16)]
pub enum MachineType {
    /// Applicable to any machine type.
    Unknown = 0x0,
    /// Intel 386 or later, and compatible processors. The only value the
    /// Xbox subsystem uses.
    I386 = 0x14c,
    /// x64.
    Amd64 = 0x8664,
    /// ARM little endian.
    Arm = 0x1c0,
    /// ARM64 little endian.
    Arm64 = 0xaa64,
}

bitflags! {
    /// Attributes of the object or image file.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Characteristics: u16 {
        /// Image does not contain base relocations and must be loaded at its
        /// preferred base address.
        const IMAGE_FILE_RELOCS_STRIPPED = 0x0001;
        /// The image file is valid and can be run.
        const IMAGE_FILE_EXECUTABLE_IMAGE = 0x0002;
        /// COFF line numbers removed (deprecated, should be zero).
        const IMAGE_FILE_LINE_NUMS_STRIPPED = 0x0004;
        /// COFF local symbol table entries removed (deprecated, should be zero).
        const IMAGE_FILE_LOCAL_SYMS_STRIPPED = 0x0008;
        /// Application can handle addresses larger than 2 GiB.
        const IMAGE_FILE_LARGE_ADDRESS_AWARE = 0x0020;
        /// Machine is based on a 32-bit-word architecture.
        const IMAGE_FILE_32BIT_MACHINE = 0x0100;
        /// Debugging information is removed from the image file.
        const IMAGE_FILE_DEBUG_STRIPPED = 0x0200;
        /// The image file is a dynamic-link library.
        const IMAGE_FILE_DLL = 0x2000;
    }
}

impl fmt::Debug for Characteristics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Characteristics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl str::FromStr for Characteristics {
    type Err = bitflags::parser::ParseError;

    fn from_str(flags: &str) -> core::result::Result<Self, Self::Err> {
        Ok(Self(flags.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xbox_coff_header_is_i386_executable_image() {
        let header = CoffHeader::for_xbox(1, 224);
        assert_eq!(header.machine, 0x014C);
        assert_eq!(header.characteristics, 0x103);
        assert_eq!(header.get_machine_type(), Some(MachineType::I386));
    }
}
