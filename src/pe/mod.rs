//! In-memory representation of a 32-bit PE image targeting Xbox subsystem 14:
//! DOS stub, PE signature, COFF header, PE32 optional header, data
//! directories, section table, and per-section raw bytes.
pub mod coff;
pub mod dos;
pub mod optional;
pub mod section;

use crate::error::{Error, Result};
use crate::io::{align_up, read_bytes, read_u16, Cursor};
use crate::prelude::*;
use bytemuck::bytes_of;
use coff::CoffHeader;
use dos::{DOS_STUB, DOS_STUB_LEN, E_LFANEW_OFFSET, PE_SIGNATURE};
use optional::{Magic, OptionalHeader32};
use section::SectionHeader;
use core::fmt;
use num_traits::FromPrimitive;

/// A fully parsed (or translator-built) PE32 image.
pub struct PortableExecutable {
    /// COFF file header.
    pub coff: CoffHeader,
    /// PE32 optional header.
    pub optional: OptionalHeader32,
    /// Section headers, in file order.
    pub sections: Vec<SectionHeader>,
    /// Raw bytes for each section, indexed in parallel with `sections`.
    pub section_bytes: Vec<Vec<u8>>,
}

impl PortableExecutable {
    /// Parse a PE32 image from `binary`.
    pub fn load(binary: &[u8]) -> Result<Self> {
        let mut offset = read_u16(binary, E_LFANEW_OFFSET)? as usize;

        let sig = read_bytes(binary, offset, 4)?;
        if sig != PE_SIGNATURE {
            return Err(Error::BadMagic("missing PE\\0\\0 signature".into()));
        }
        offset += 4;

        let coff_size = size_of::<CoffHeader>();
        let coff_slice = read_bytes(binary, offset, coff_size)?;
        let coff = *bytemuck::checked::try_from_bytes::<CoffHeader>(coff_slice)
            .map_err(|e| Error::BadMagic(format!("malformed COFF header: {e}")))?;
        offset += coff_size;

        if coff.size_of_optional_header == 0 {
            return Err(Error::UnsupportedFormat("missing optional header".into()));
        }

        let magic = Magic::from_u16(read_u16(binary, offset)?)
            .ok_or_else(|| Error::UnsupportedFormat("unrecognized optional header magic".into()))?;
        let optional = match magic {
            Magic::PE32 => OptionalHeader32::parse(binary, &mut offset)?,
            Magic::PE64 => {
                return Err(Error::UnsupportedFormat("PE32+ images are not supported".into()));
            }
        };

        let sections = section::parse_section_table(binary, offset, coff.number_of_sections)?;

        let mut section_bytes = Vec::with_capacity(sections.len());
        for header in &sections {
            let start = header.pointer_to_raw_data as usize;
            let len = header.size_of_raw_data as usize;
            let bytes = if len == 0 {
                Vec::new()
            } else {
                read_bytes(binary, start, len)?.to_vec()
            };
            section_bytes.push(bytes);
        }

        Ok(Self { coff, optional, sections, section_bytes })
    }

    /// Emit this image back to bytes, in DOS stub / PE signature / COFF
    /// header / optional header / section headers / section bytes order.
    /// Callers are expected to have already assigned consistent
    /// `pointer_to_raw_data` values (the translators do this).
    pub fn emit(&self) -> Vec<u8> {
        let mut c = Cursor::new();
        c.write_bytes(&DOS_STUB);
        debug_assert_eq!(c.position(), DOS_STUB_LEN);
        c.write_bytes(&PE_SIGNATURE);
        c.write_bytes(bytes_of(&self.coff));
        c.write_bytes(bytes_of(&self.optional));
        for section in &self.sections {
            c.write_bytes(bytes_of(section));
        }
        c.align_to(self.optional.file_alignment.max(1));

        let mut sorted: Vec<usize> = (0..self.sections.len()).collect();
        sorted.sort_by_key(|&i| self.sections[i].pointer_to_raw_data);
        for i in sorted {
            let target = self.sections[i].pointer_to_raw_data as usize;
            if target > c.position() {
                c.write_zeros(target - c.position());
            }
            c.write_bytes(&self.section_bytes[i]);
            c.align_to(self.optional.file_alignment.max(1));
        }

        c.into_bytes()
    }

    /// Sum of `size_of_raw_data` across sections whose characteristics
    /// include `IMAGE_SCN_CNT_INITIALIZED_DATA`, recomputed at emit time
    /// rather than carried from a source image.
    pub fn sizeof_initialized_data(&self) -> u32 {
        self.sections
            .iter()
            .filter(|s| {
                s.get_characteristics()
                    .is_some_and(|f| f.contains(section::SectionFlags::IMAGE_SCN_CNT_INITIALIZED_DATA))
            })
            .map(|s| s.size_of_raw_data)
            .sum()
    }

    /// The section named `.text`, if any.
    pub fn text_section(&self) -> Option<&SectionHeader> {
        self.sections.iter().find(|s| s.name_str() == ".text")
    }

    /// The section named `.data`, if any.
    pub fn data_section(&self) -> Option<&SectionHeader> {
        self.sections.iter().find(|s| s.name_str() == ".data")
    }

    /// The section named `.tls`, if any.
    pub fn tls_section(&self) -> Option<&SectionHeader> {
        self.sections.iter().find(|s| s.name_str() == ".tls")
    }

    /// Resolve an RVA to a byte slice of `len` bytes within whichever
    /// section contains it, or `None` if no section covers the range.
    pub fn read_at_rva(&self, rva: u32, len: usize) -> Option<&[u8]> {
        for (i, section) in self.sections.iter().enumerate() {
            let extent = section.virtual_size.max(section.size_of_raw_data);
            if rva >= section.virtual_address && rva < section.virtual_address + extent {
                let start = (rva - section.virtual_address) as usize;
                return self.section_bytes[i].get(start..start + len);
            }
        }
        None
    }

    /// The image's TLS directory, read from data directory entry 9, if the
    /// PE declares one.
    pub fn tls_directory(&self) -> Option<crate::xbe::tls::TlsDirectory> {
        let dir = self.optional.data_directories.tls_table;
        if dir.virtual_address == 0 || dir.size == 0 {
            return None;
        }
        let bytes = self.read_at_rva(dir.virtual_address, size_of::<crate::xbe::tls::TlsDirectory>())?;
        bytemuck::checked::try_from_bytes::<crate::xbe::tls::TlsDirectory>(bytes).ok().copied()
    }

    /// Recompute `size_of_image` as the ceiling of the last section's extent
    /// to `section_alignment`, starting from `size_of_headers`.
    pub fn recompute_size_of_image(&mut self) {
        let mut end = align_up(self.optional.size_of_headers, self.optional.section_alignment);
        for s in &self.sections {
            let section_end = s.virtual_address + s.virtual_size.max(s.size_of_raw_data);
            end = end.max(align_up(section_end, self.optional.section_alignment));
        }
        self.optional.size_of_image = end;
    }
}

impl fmt::Display for PortableExecutable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.coff)?;
        writeln!(f, "{}", self.optional)?;
        for section in &self.sections {
            writeln!(f, "{}", section)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pe::coff::CoffHeader;
    use crate::pe::optional::{DEFAULT_FILE_ALIGNMENT, DEFAULT_SECTION_ALIGNMENT, IMAGE_SUBSYSTEM_XBOX};
    use crate::pe::section::{pack_name, SectionFlags};

    fn minimal_pe(entry_rva: u32, text: Vec<u8>) -> PortableExecutable {
        let mut optional = OptionalHeader32 {
            magic: Magic::PE32 as u16,
            address_of_entry_point: entry_rva,
            image_base: 0x0001_0000,
            section_alignment: DEFAULT_SECTION_ALIGNMENT,
            file_alignment: DEFAULT_FILE_ALIGNMENT,
            subsystem: IMAGE_SUBSYSTEM_XBOX,
            size_of_headers: align_up((DOS_STUB_LEN + 4 + size_of::<CoffHeader>() + size_of::<OptionalHeader32>() + size_of::<SectionHeader>()) as u32, DEFAULT_FILE_ALIGNMENT),
            number_of_rva_and_sizes: 16,
            ..Default::default()
        };
        let section = SectionHeader {
            name: pack_name(".text"),
            virtual_size: text.len() as u32,
            virtual_address: entry_rva,
            size_of_raw_data: align_up(text.len() as u32, optional.file_alignment),
            pointer_to_raw_data: optional.size_of_headers,
            characteristics: (SectionFlags::IMAGE_SCN_CNT_CODE | SectionFlags::IMAGE_SCN_MEM_EXECUTE | SectionFlags::IMAGE_SCN_MEM_READ).bits(),
            ..Default::default()
        };
        let mut padded = text;
        padded.resize(section.size_of_raw_data as usize, 0);
        let coff = CoffHeader::for_xbox(1, size_of::<OptionalHeader32>() as u16);
        optional.size_of_code = section.size_of_raw_data;
        PortableExecutable { coff, optional, sections: vec![section], section_bytes: vec![padded] }
    }

    #[test]
    fn round_trip_minimal_pe() {
        let pe = minimal_pe(0x1000, vec![0x90; 1024]);
        let bytes = pe.emit();
        let reloaded = PortableExecutable::load(&bytes).unwrap();
        assert_eq!(reloaded.optional.address_of_entry_point, 0x1000);
        assert_eq!(reloaded.sections.len(), 1);
        assert_eq!(reloaded.sections[0].name_str(), ".text");
        assert_eq!(reloaded.section_bytes[0].len(), 0x1000);
        assert!(reloaded.section_bytes[0][..1024].iter().all(|&b| b == 0x90));
    }

    #[test]
    fn load_rejects_bad_signature() {
        let mut bytes = vec![0u8; 256];
        bytes[E_LFANEW_OFFSET..E_LFANEW_OFFSET + 2].copy_from_slice(&64u16.to_le_bytes());
        match PortableExecutable::load(&bytes) {
            Err(Error::BadMagic(_)) => {}
            other => panic!("expected BadMagic, got {other:?}"),
        }
    }
}
