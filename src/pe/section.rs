//! PE section headers and characteristics flags.
use crate::error::{Error, Result};
use crate::prelude::*;
use bitflags::bitflags;
use bytemuck::{checked::try_from_bytes, Pod, Zeroable};
use core::{fmt, str};

/// One PE section header (40 bytes on disk).
#[derive(Copy, Clone, Pod, Zeroable, Default)]
#[repr(C)]
pub struct SectionHeader {
    /// 8-byte, NUL-padded ASCII name. Executable images don't support names
    /// longer than 8 characters.
    pub name: [u8; 8],
    /// Section size once loaded; zero-padded if larger than `size_of_raw_data`.
    pub virtual_size: u32,
    /// RVA of the section once loaded.
    pub virtual_address: u32,
    /// Size of the initialized data on disk; must be a multiple of
    /// `file_alignment`.
    pub size_of_raw_data: u32,
    /// File offset of the section's first page.
    pub pointer_to_raw_data: u32,
    /// Zero for executable images.
    pub pointer_to_relocations: u32,
    /// Zero; COFF line numbers are deprecated.
    pub pointer_to_linenumbers: u32,
    /// Zero for executable images.
    pub number_of_relocations: u16,
    /// Zero for executable images.
    pub number_of_linenumbers: u16,
    /// Section characteristics bitflags.
    pub characteristics: u32,
}

impl SectionHeader {
    /// The section's name with trailing NUL bytes trimmed.
    pub fn name_str(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(8);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    /// Returns the characteristics as bitflags, if all bits are recognized.
    pub fn get_characteristics(&self) -> Option<SectionFlags> {
        SectionFlags::from_bits(self.characteristics)
    }
}

impl fmt::Display for SectionHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Section Header")?;
        writeln!(f, "--------------")?;
        writeln!(f, "Name:                    {}", self.name_str())?;
        writeln!(f, "Virtual Size:            {:#x}", self.virtual_size)?;
        writeln!(f, "Virtual Address:         {:#010x}", self.virtual_address)?;
        writeln!(f, "Size of Raw Data:        {:#x}", self.size_of_raw_data)?;
        writeln!(f, "Pointer to Raw Data:     {:#010x}", self.pointer_to_raw_data)?;
        write!(f, "Characteristics:         {:?}", self.get_characteristics())
    }
}

/// Parse `number_of_sections` section headers starting at `offset`.
pub fn parse_section_table(binary: &[u8], mut offset: usize, number_of_sections: u16) -> Result<Vec<SectionHeader>> {
    let header_size = size_of::<SectionHeader>();
    let mut headers = Vec::with_capacity(number_of_sections as usize);
    for _ in 0..number_of_sections {
        let slice = binary
            .get(offset..offset + header_size)
            .ok_or_else(|| Error::Truncated("PE section header".into()))?;
        let header = try_from_bytes::<SectionHeader>(slice)
            .map_err(|e| Error::BadMagic(format!("malformed PE section header: {e}")))?;
        headers.push(*header);
        offset += header_size;
    }
    Ok(headers)
}

bitflags! {
    /// Flags describing how a section should be loaded, limited here to the
    /// bits the XBE/PE translators set or read.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct SectionFlags: u32 {
        /// The section contains executable code.
        const IMAGE_SCN_CNT_CODE = 0x0000_0020;
        /// The section contains initialized data.
        const IMAGE_SCN_CNT_INITIALIZED_DATA = 0x0000_0040;
        /// The section contains uninitialized data.
        const IMAGE_SCN_CNT_UNINITIALIZED_DATA = 0x0000_0080;
        /// The section can be discarded as needed.
        const IMAGE_SCN_MEM_DISCARDABLE = 0x0200_0000;
        /// The section can be shared in memory.
        const IMAGE_SCN_MEM_SHARED = 0x1000_0000;
        /// The section can be executed as code.
        const IMAGE_SCN_MEM_EXECUTE = 0x2000_0000;
        /// The section can be read.
        const IMAGE_SCN_MEM_READ = 0x4000_0000;
        /// The section can be written to.
        const IMAGE_SCN_MEM_WRITE = 0x8000_0000;
    }
}

impl fmt::Debug for SectionFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for SectionFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl str::FromStr for SectionFlags {
    type Err = bitflags::parser::ParseError;

    fn from_str(flags: &str) -> core::result::Result<Self, Self::Err> {
        Ok(Self(flags.parse()?))
    }
}

/// Build an 8-byte, NUL-padded section name from a Rust string, truncating
/// at 8 bytes as executable images require.
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
    fn pack_name_pads_and_truncates() {
        assert_eq!(pack_name(".text"), *b".text\0\0\0");
        assert_eq!(pack_name(".verylongname"), *b".verylon");
    }

    #[test]
    fn name_str_trims_trailing_nuls() {
        let header = SectionHeader { name: *b".data\0\0\0", ..Default::default() };
        assert_eq!(header.name_str(), ".data");
    }
}
