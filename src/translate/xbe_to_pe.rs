//! XBE → PE translation.
use crate::error::{Error, Result};
use crate::io::align_up;
use crate::pe::coff::CoffHeader;
use crate::pe::optional::{
    DataDirectories, OptionalHeader32, DEFAULT_FILE_ALIGNMENT, DEFAULT_SECTION_ALIGNMENT,
    DEFAULT_SIZE_OF_HEADERS, IMAGE_SUBSYSTEM_XBOX,
};
use crate::pe::section::{pack_name, SectionFlags};
use crate::pe::PortableExecutable;
use crate::xbe::section::SectionHeaderFlags;
use crate::xbe::xor::{Mode, XOR_EP_DEBUG, XOR_EP_RETAIL};
use crate::xbe::Xbe;

/// Translate a loaded XBE image into a PE image, along with the obfuscation
/// mode discovered while decoding the entry point.
pub fn translate(xbe: &Xbe) -> Result<(PortableExecutable, Mode)> {
    let pe_base_address = xbe.header.pe_base_address;

    // `xbe.header.entry_address` is already decoded to plain by `Xbe::load`
    // using its own retail-first loader heuristic; re-obfuscate it with the
    // mode `load` settled on to recover the raw on-disk bytes, then apply
    // this translation's own in-range detection rule to them.
    let raw_entry = xbe.mode.encode_entry(xbe.header.entry_address);
    let (entry_rva, mode) = decode_entry_for_pe(raw_entry, pe_base_address)?;

    let mut optional = OptionalHeader32 {
        magic: 0x010b,
        major_linker_version: 7,
        minor_linker_version: 10,
        major_operating_system_version: 5,
        major_image_version: 5,
        major_subsystem_version: 1,
        image_base: pe_base_address,
        section_alignment: DEFAULT_SECTION_ALIGNMENT,
        file_alignment: DEFAULT_FILE_ALIGNMENT,
        subsystem: IMAGE_SUBSYSTEM_XBOX,
        size_of_headers: DEFAULT_SIZE_OF_HEADERS,
        number_of_rva_and_sizes: 16,
        address_of_entry_point: entry_rva,
        size_of_stack_reserve: xbe.header.pe_stack_commit,
        size_of_stack_commit: xbe.header.pe_stack_commit,
        size_of_heap_reserve: xbe.header.pe_heap_reserve,
        size_of_heap_commit: xbe.header.pe_heap_commit,
        data_directories: DataDirectories::default(),
        ..Default::default()
    };

    let mut sections = Vec::with_capacity(xbe.sections.len());
    let mut section_bytes = Vec::with_capacity(xbe.sections.len());
    let mut raw_address = optional.size_of_headers;
    let mut text_virtual_address = None;
    let mut data_virtual_address = None;

    for (i, xbe_section) in xbe.sections.iter().enumerate() {
        let flags = xbe_section.get_flags().unwrap_or(SectionHeaderFlags::empty());
        let characteristics = if flags.contains(SectionHeaderFlags::EXECUTABLE) {
            SectionFlags::IMAGE_SCN_MEM_EXECUTE | SectionFlags::IMAGE_SCN_CNT_CODE
        } else if flags.contains(SectionHeaderFlags::WRITABLE) {
            SectionFlags::IMAGE_SCN_MEM_WRITE
        } else {
            SectionFlags::IMAGE_SCN_MEM_READ | SectionFlags::IMAGE_SCN_CNT_INITIALIZED_DATA
        };

        let virtual_address = xbe_section.virtual_address - pe_base_address;
        let raw_size = align_up(xbe_section.raw_size, optional.file_alignment);

        let mut bytes = xbe.section_bytes[i].as_slice().to_vec();
        bytes.resize(raw_size as usize, 0);

        let name = xbe.section_names.get(i).cloned().unwrap_or_default();
        match name.as_str() {
            ".text" => text_virtual_address = Some(virtual_address),
            ".data" => data_virtual_address = Some(virtual_address),
            _ => {}
        }

        sections.push(crate::pe::section::SectionHeader {
            name: pack_name(&name),
            virtual_size: xbe_section.virtual_size,
            virtual_address,
            size_of_raw_data: raw_size,
            pointer_to_raw_data: raw_address,
            characteristics: characteristics.bits(),
            ..Default::default()
        });
        section_bytes.push(bytes);
        raw_address += raw_size;
    }

    if let (Some(code_base), Some(data_base)) = (text_virtual_address, data_virtual_address) {
        optional.base_of_code = code_base;
        optional.base_of_data = data_base;
    }

    if let Some(tls) = &xbe.tls {
        if let Some((section, _)) = sections
            .iter()
            .zip(&xbe.sections)
            .find(|(_, xbe_s)| xbe_s.virtual_address == tls.raw_data_start)
        {
            optional.data_directories.tls_table.virtual_address = section.virtual_address;
            optional.data_directories.tls_table.size = section.virtual_size;
        }
    }

    let coff = CoffHeader::for_xbox(sections.len() as u16, core::mem::size_of::<OptionalHeader32>() as u16);

    let mut pe = PortableExecutable { coff, optional, sections, section_bytes };
    pe.recompute_size_of_image();
    pe.optional.size_of_code = pe.text_section().map(|s| s.size_of_raw_data).unwrap_or(0);
    pe.optional.size_of_initialized_data = pe.sizeof_initialized_data();
    Ok((pe, mode))
}

/// Decode `obfuscated` with both the retail and debug keys and keep whichever
/// result lies in `[base, base + 0x0FFFFFFF)`. Fails if neither does.
fn decode_entry_for_pe(obfuscated: u32, base: u32) -> Result<(u32, Mode)> {
    let retail = obfuscated ^ XOR_EP_RETAIL;
    let debug = obfuscated ^ XOR_EP_DEBUG;
    let in_range = |addr: u32| addr >= base && addr < base.wrapping_add(0x0FFF_FFFF);
    if in_range(retail) {
        Ok((retail - base, Mode::Retail))
    } else if in_range(debug) {
        Ok((debug - base, Mode::Debug))
    } else {
        Err(Error::AddressOutOfRange(format!(
            "entry address decodes out of range under both retail ({retail:#010x}) and debug ({debug:#010x}) keys"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_prefers_in_range_result() {
        let base = 0x0001_0000;
        let plain = 0x0001_2000;
        let obfuscated = plain ^ XOR_EP_DEBUG;
        let (rva, mode) = decode_entry_for_pe(obfuscated, base).unwrap();
        assert_eq!(mode, Mode::Debug);
        assert_eq!(rva, plain - base);
    }

    #[test]
    fn decode_fails_when_neither_key_is_in_range() {
        let base = 0x0001_0000;
        let obfuscated = 0u32;
        let err = decode_entry_for_pe(obfuscated, base).unwrap_err();
        assert!(matches!(err, Error::AddressOutOfRange(_)));
    }
}
