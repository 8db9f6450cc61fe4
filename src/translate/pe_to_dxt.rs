//! PE → DXT translation: a debug monitor loadable image is a PE whose
//! sections are identity-mapped, so the kernel can load it without
//! relocating raw data to a different address than it's executed from.
use crate::error::{Error, Result};
use crate::pe::optional::IMAGE_SUBSYSTEM_XBOX;
use crate::pe::PortableExecutable;

/// Rewrite `pe` in place into a DXT image: Xbox subsystem, toolchain
/// versions, and `raw_address == virtual_address` for every section.
pub fn translate(pe: &mut PortableExecutable) -> Result<()> {
    if pe.optional.file_alignment != pe.optional.section_alignment {
        return Err(Error::AlignmentMismatch(format!(
            "DXT requires file_alignment ({:#x}) == section_alignment ({:#x})",
            pe.optional.file_alignment, pe.optional.section_alignment
        )));
    }

    pe.optional.subsystem = IMAGE_SUBSYSTEM_XBOX;
    pe.optional.major_linker_version = 7;
    pe.optional.minor_linker_version = 10;
    pe.optional.major_operating_system_version = 5;
    pe.optional.minor_operating_system_version = 0;
    pe.optional.major_image_version = 5;
    pe.optional.minor_image_version = 0;
    pe.optional.dll_characteristics = 0;
    pe.optional.size_of_stack_commit = pe.optional.size_of_stack_reserve;

    for section in &mut pe.sections {
        section.pointer_to_raw_data = section.virtual_address;
    }

    if let Some(data) = pe.data_section() {
        pe.optional.base_of_data = data.pointer_to_raw_data;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pe::coff::CoffHeader;
    use crate::pe::optional::{Magic, OptionalHeader32, DEFAULT_FILE_ALIGNMENT, DEFAULT_SECTION_ALIGNMENT};
    use crate::pe::section::{pack_name, SectionFlags, SectionHeader};

    fn pe_with_alignment(file_alignment: u32) -> PortableExecutable {
        let optional = OptionalHeader32 {
            magic: Magic::PE32 as u16,
            section_alignment: DEFAULT_SECTION_ALIGNMENT,
            file_alignment,
            number_of_rva_and_sizes: 16,
            ..Default::default()
        };
        let section = SectionHeader {
            name: pack_name(".text"),
            virtual_address: 0x1000,
            virtual_size: 0x10,
            size_of_raw_data: 0x200,
            pointer_to_raw_data: 0x400,
            characteristics: SectionFlags::IMAGE_SCN_CNT_CODE.bits(),
            ..Default::default()
        };
        PortableExecutable {
            coff: CoffHeader::for_xbox(1, core::mem::size_of::<OptionalHeader32>() as u16),
            optional,
            sections: vec![section],
            section_bytes: vec![vec![0x90; 0x200]],
        }
    }

    #[test]
    fn identity_maps_every_section() {
        let mut pe = pe_with_alignment(DEFAULT_SECTION_ALIGNMENT);
        translate(&mut pe).unwrap();
        assert_eq!(pe.sections[0].pointer_to_raw_data, pe.sections[0].virtual_address);
        assert_eq!(pe.optional.subsystem, IMAGE_SUBSYSTEM_XBOX);
    }

    #[test]
    fn rejects_mismatched_alignment() {
        let mut pe = pe_with_alignment(DEFAULT_FILE_ALIGNMENT);
        match translate(&mut pe) {
            Err(Error::AlignmentMismatch(_)) => {}
            other => panic!("expected AlignmentMismatch, got {other:?}"),
        }
    }
}
