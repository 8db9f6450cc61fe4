//! PE → XBE translation.
use crate::error::Result;
use crate::io::align_up;
use crate::pe::section::SectionFlags as PeSectionFlags;
use crate::pe::PortableExecutable;
use crate::warn::WarningSink;
use crate::xbe::certificate::{Certificate, CERTIFICATE_SIZE, DEFAULT_TITLE_ID, MODELED_BYTES, TITLE_NAME_CHARS};
use crate::xbe::header::{Header, DEFAULT_BASE_ADDRESS, XBE_MAGIC};
use crate::xbe::library::{pack_name as pack_lib_name, LibraryVersion};
use crate::xbe::logo::DEFAULT_LOGO_BITMAP;
use crate::xbe::section::{SectionBytes, SectionHeader, SectionHeaderFlags};
use crate::xbe::xor::Mode;
use crate::xbe::{Xbe, PAGE_SIZE};

/// Inputs to a PE → XBE translation beyond the loaded PE model itself.
pub struct Options {
    /// Title string, UTF-16LE truncated to 40 characters (silently, with a
    /// warning).
    pub title: String,
    /// Retail or debug obfuscation to apply.
    pub mode: Mode,
    /// Overrides the built-in OpenXDK logo bitmap, if set.
    pub logo_bitmap: Option<Vec<u8>>,
}

impl Options {
    /// Build options with the built-in logo.
    pub fn new(title: impl Into<String>, mode: Mode) -> Self {
        Self { title: title.into(), mode, logo_bitmap: None }
    }
}

/// Size in bytes of one `IMAGE_IMPORT_DESCRIPTOR` entry: `OriginalFirstThunk`,
/// `TimeDateStamp`, `ForwarderChain`, `Name`, `FirstThunk`, each a `u32`.
const IMPORT_DESCRIPTOR_SIZE: usize = 20;
/// Set on a thunk entry to mark it as a by-ordinal import rather than an RVA
/// to a named import.
const IMAGE_ORDINAL_FLAG32: u32 = 0x8000_0000;

/// Walk the PE's import directory and collect the kernel's by-ordinal import
/// thunks, in thunk-array order, for use as the XBE kernel thunk table.
///
/// Imports from a library other than the Xbox kernel are ignored; a kernel
/// import that isn't by ordinal can't be represented as an XBE thunk entry
/// and is reported as a warning instead of silently dropped.
fn kernel_thunks(pe: &PortableExecutable, warnings: &mut dyn WarningSink) -> Vec<u32> {
    let dir = pe.optional.data_directories.import_table;
    if dir.virtual_address == 0 || dir.size == 0 {
        return Vec::new();
    }

    let mut thunks = Vec::new();
    let mut descriptor_rva = dir.virtual_address;
    loop {
        let Some(bytes) = pe.read_at_rva(descriptor_rva, IMPORT_DESCRIPTOR_SIZE) else { break };
        let original_first_thunk = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let name_rva = u32::from_le_bytes(bytes[12..16].try_into().unwrap());
        let first_thunk = u32::from_le_bytes(bytes[16..20].try_into().unwrap());
        if original_first_thunk == 0 && name_rva == 0 && first_thunk == 0 {
            break;
        }
        descriptor_rva += IMPORT_DESCRIPTOR_SIZE as u32;

        let name = read_rva_cstr(pe, name_rva, 64).unwrap_or_default();
        if !name.eq_ignore_ascii_case("xboxkrnl.exe") {
            continue;
        }

        let mut thunk_rva = if original_first_thunk != 0 { original_first_thunk } else { first_thunk };
        loop {
            let Some(entry) = pe.read_at_rva(thunk_rva, 4) else { break };
            let thunk = u32::from_le_bytes(entry.try_into().unwrap());
            if thunk == 0 {
                break;
            }
            if thunk & IMAGE_ORDINAL_FLAG32 != 0 {
                thunks.push(thunk);
            } else {
                warnings.warn(&format!("kernel import at {thunk_rva:#010x} is by name, not ordinal; dropping"));
            }
            thunk_rva += 4;
        }
    }

    thunks
}

/// Read a NUL-terminated ASCII string at an RVA, capped at `max_len` bytes.
fn read_rva_cstr(pe: &PortableExecutable, rva: u32, max_len: usize) -> Option<String> {
    let bytes = pe.read_at_rva(rva, max_len)?;
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

/// Translate a loaded PE image into an XBE image.
pub fn translate(pe: &PortableExecutable, options: Options, warnings: &mut dyn WarningSink) -> Result<Xbe> {
    let Options { mut title, mode, logo_bitmap } = options;

    if title.encode_utf16().count() > TITLE_NAME_CHARS {
        warnings.warn("WARNING: Title too long, trimming");
        let units: Vec<u16> = title.encode_utf16().take(TITLE_NAME_CHARS).collect();
        title = String::from_utf16_lossy(&units);
    }

    let base_address = DEFAULT_BASE_ADDRESS;
    // Stored plain here, matching `Xbe::load`'s in-memory convention; `Xbe::emit`
    // does the XOR obfuscation when writing the header to disk.
    let entry_address = pe.optional.address_of_entry_point.wrapping_add(pe.optional.image_base);

    let header = Header {
        magic: XBE_MAGIC,
        base_address,
        entry_address,
        pe_stack_commit: pe.optional.size_of_stack_commit,
        pe_heap_reserve: pe.optional.size_of_heap_reserve,
        pe_heap_commit: pe.optional.size_of_heap_commit,
        pe_base_address: pe.optional.image_base,
        pe_size_of_image: pe.optional.size_of_image,
        pe_checksum: pe.optional.check_sum,
        pe_time_date: pe.coff.time_date_stamp,
        ..Default::default()
    };

    let mut certificate = Certificate { size: CERTIFICATE_SIZE, ..Default::default() };
    certificate.time_date = unix_timestamp();
    certificate.title_id = DEFAULT_TITLE_ID;
    certificate.set_title_name(&title);
    certificate.allowed_media = u32::MAX;
    certificate.game_region = u32::MAX;
    let certificate_extra = vec![0u8; (CERTIFICATE_SIZE - MODELED_BYTES) as usize];

    let mut sections = Vec::with_capacity(pe.sections.len());
    let mut section_names = Vec::with_capacity(pe.sections.len());
    let mut section_bytes = Vec::with_capacity(pe.sections.len());
    for (i, pe_section) in pe.sections.iter().enumerate() {
        let name = pe_section.name_str();
        let pe_flags = pe_section.get_characteristics().unwrap_or(PeSectionFlags::empty());
        let mut flags = SectionHeaderFlags::empty();
        if pe_flags.contains(PeSectionFlags::IMAGE_SCN_MEM_EXECUTE) {
            flags |= SectionHeaderFlags::EXECUTABLE;
        }
        if pe_flags.contains(PeSectionFlags::IMAGE_SCN_MEM_WRITE) {
            flags |= SectionHeaderFlags::WRITABLE;
        }
        if matches!(name.as_str(), ".text" | ".data" | ".rdata" | ".tls") {
            flags |= SectionHeaderFlags::PRELOAD;
        }

        let mut bytes = pe.section_bytes[i].clone();
        let raw_size = align_up(bytes.len() as u32, PAGE_SIZE);
        bytes.resize(raw_size as usize, 0);

        sections.push(SectionHeader {
            flags: flags.bits(),
            virtual_address: pe_section.virtual_address + base_address,
            virtual_size: pe_section.virtual_size,
            raw_size,
            ..Default::default()
        });
        section_names.push(name);
        section_bytes.push(SectionBytes::Owned(bytes));
    }

    let library_versions = vec![
        LibraryVersion { name: pack_lib_name("XBOXKRNL"), major_version: 5, minor_version: 1, build_version: 1, flags: 0 },
        LibraryVersion { name: pack_lib_name("XAPILIB"), major_version: 5, minor_version: 1, build_version: 1, flags: 0 },
        LibraryVersion { name: pack_lib_name("OPENXDK"), major_version: 5, minor_version: 1, build_version: 1, flags: 0 },
    ];

    let tls = pe.tls_directory();
    let kernel_thunk_table = kernel_thunks(pe, warnings);

    let mut xbe = Xbe {
        header,
        header_extra: Vec::new(),
        certificate,
        certificate_extra,
        sections,
        section_names,
        section_bytes,
        library_versions,
        tls,
        logo_bitmap: logo_bitmap.unwrap_or_else(|| DEFAULT_LOGO_BITMAP.to_vec()),
        debug_pathname: String::new(),
        debug_filename: String::new(),
        kernel_thunk_table,
        mode,
    };
    xbe.recompute_digests();

    // First pass: lay out the header region with placeholder (zero) raw
    // section addresses, purely to learn the resulting `size_of_headers` —
    // the header's byte length never depends on those addresses' values.
    xbe.emit();
    let mut raw_address = align_up(xbe.header.size_of_headers.max(PAGE_SIZE), PAGE_SIZE);
    let mut image_end = align_up(xbe.header.base_address + xbe.header.size_of_headers, PAGE_SIZE);
    for (section, bytes) in xbe.sections.iter_mut().zip(&xbe.section_bytes) {
        section.raw_address = raw_address;
        raw_address += align_up(bytes.len() as u32, PAGE_SIZE);
        image_end = image_end.max(align_up(section.virtual_address + section.virtual_size, PAGE_SIZE));
    }
    xbe.header.size_of_image = image_end - xbe.header.base_address;

    Ok(xbe)
}

fn unix_timestamp() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as u32).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pe::coff::CoffHeader;
    use crate::pe::optional::{DataDirectory, Magic, OptionalHeader32};
    use crate::pe::section::{pack_name, SectionFlags};
    use crate::warn::NullSink;

    fn pe_with_kernel_imports() -> PortableExecutable {
        let virtual_address = 0x2000;
        let mut rdata = vec![0u8; 0x200];
        // Import descriptor: OriginalFirstThunk, TimeDateStamp, ForwarderChain, Name, FirstThunk.
        rdata[0..4].copy_from_slice(&0x2020u32.to_le_bytes());
        rdata[12..16].copy_from_slice(&0x2040u32.to_le_bytes());
        // Terminator descriptor at offset 20 is left zeroed.
        // Thunk array at offset 0x20: two ordinal imports, then a zero terminator.
        rdata[0x20..0x24].copy_from_slice(&(0x8000_0005u32).to_le_bytes());
        rdata[0x24..0x28].copy_from_slice(&(0x8000_0007u32).to_le_bytes());
        // DLL name at offset 0x40.
        rdata[0x40..0x4d].copy_from_slice(b"xboxkrnl.exe\0");

        let mut optional = OptionalHeader32 {
            magic: Magic::PE32 as u16,
            image_base: 0x0040_0000,
            number_of_rva_and_sizes: 16,
            ..Default::default()
        };
        optional.data_directories.import_table = DataDirectory { virtual_address, size: 40 };
        let section = crate::pe::section::SectionHeader {
            name: pack_name(".rdata"),
            virtual_size: rdata.len() as u32,
            virtual_address,
            size_of_raw_data: rdata.len() as u32,
            characteristics: SectionFlags::IMAGE_SCN_MEM_READ.bits(),
            ..Default::default()
        };
        let coff = CoffHeader::for_xbox(1, core::mem::size_of::<OptionalHeader32>() as u16);
        PortableExecutable { coff, optional, sections: vec![section], section_bytes: vec![rdata] }
    }

    #[test]
    fn kernel_thunks_collects_ordinal_imports_only() {
        let pe = pe_with_kernel_imports();
        let mut sink = NullSink;
        let thunks = kernel_thunks(&pe, &mut sink);
        assert_eq!(thunks, vec![0x8000_0005, 0x8000_0007]);
    }

    #[test]
    fn kernel_thunks_empty_without_import_directory() {
        let mut pe = pe_with_kernel_imports();
        pe.optional.data_directories.import_table = DataDirectory::default();
        let mut sink = NullSink;
        assert!(kernel_thunks(&pe, &mut sink).is_empty());
    }
}
