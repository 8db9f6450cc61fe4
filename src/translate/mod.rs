//! Bidirectional PE ⇄ XBE translation, plus the PE → DXT transform.
pub mod pe_to_dxt;
pub mod pe_to_xbe;
pub mod xbe_to_pe;

pub use pe_to_xbe::{translate as pe_to_xbe, Options as PeToXbeOptions};
pub use xbe_to_pe::translate as xbe_to_pe;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::align_up;
    use crate::pe::coff::CoffHeader;
    use crate::pe::optional::{Magic, OptionalHeader32, DEFAULT_FILE_ALIGNMENT, DEFAULT_SECTION_ALIGNMENT};
    use crate::pe::section::{pack_name, SectionFlags, SectionHeader};
    use crate::pe::PortableExecutable;
    use crate::warn::NullSink;
    use crate::xbe::xor::Mode;

    fn minimal_pe() -> PortableExecutable {
        let entry_rva = 0x1000;
        let mut optional = OptionalHeader32 {
            magic: Magic::PE32 as u16,
            address_of_entry_point: entry_rva,
            image_base: 0x0040_0000,
            section_alignment: DEFAULT_SECTION_ALIGNMENT,
            file_alignment: DEFAULT_FILE_ALIGNMENT,
            size_of_headers: 0x400,
            number_of_rva_and_sizes: 16,
            ..Default::default()
        };
        let text = SectionHeader {
            name: pack_name(".text"),
            virtual_size: 64,
            virtual_address: entry_rva,
            size_of_raw_data: align_up(64, optional.file_alignment),
            pointer_to_raw_data: optional.size_of_headers,
            characteristics: (SectionFlags::IMAGE_SCN_CNT_CODE | SectionFlags::IMAGE_SCN_MEM_EXECUTE | SectionFlags::IMAGE_SCN_MEM_READ).bits(),
            ..Default::default()
        };
        let mut text_bytes = vec![0x90u8; 64];
        text_bytes.resize(text.size_of_raw_data as usize, 0);
        optional.size_of_code = text.size_of_raw_data;
        let coff = CoffHeader::for_xbox(1, core::mem::size_of::<OptionalHeader32>() as u16);
        PortableExecutable { coff, optional, sections: vec![text], section_bytes: vec![text_bytes] }
    }

    #[test]
    fn pe_to_xbe_to_pe_round_trips_entry_point() {
        let pe = minimal_pe();
        let options = PeToXbeOptions::new("Round Trip", Mode::Retail);
        let mut sink = NullSink;
        let mut xbe = pe_to_xbe(&pe, options, &mut sink).unwrap();

        let bytes = xbe.emit();
        let reloaded = crate::xbe::Xbe::load(&bytes).unwrap();
        let (pe_back, mode) = xbe_to_pe(&reloaded).unwrap();

        assert_eq!(mode, Mode::Retail);
        assert_eq!(pe_back.optional.address_of_entry_point, pe.optional.address_of_entry_point);
        assert_eq!(pe_back.optional.image_base, pe.optional.image_base);
        assert_eq!(pe_back.sections[0].name_str(), ".text");
    }
}
