//! In-memory representation of a full Xbox Executable: fixed header,
//! certificate, section table and bytes, library versions, optional TLS
//! directory, debug strings, kernel thunk table, and logo bitmap.
pub mod certificate;
pub mod header;
pub mod library;
pub mod logo;
pub mod section;
pub mod tls;
pub mod xor;

use crate::error::{Error, Result};
use crate::io::{read_bytes, read_cstr, read_u32, Cursor};
use crate::prelude::*;
use bytemuck::bytes_of;
use certificate::Certificate;
use core::fmt;
use header::{Header, DEFAULT_BASE_ADDRESS, HEADER_SIZE, XBE_MAGIC};
use library::LibraryVersion;
use section::{SectionBytes, SectionHeader};
use tls::TlsDirectory;
use xor::Mode;

/// Page alignment the header region and, outside DXT images, each section's
/// virtual address are rounded to.
pub const PAGE_SIZE: u32 = 0x1000;

/// A fully parsed (or translator-built) XBE image.
pub struct Xbe {
    /// Fixed header.
    pub header: Header,
    /// Bytes of the header beyond [`HEADER_SIZE`], up to
    /// `header.size_of_image_header`. Always empty for images this crate
    /// builds; preserved for round-trip fidelity of images that carry extra
    /// header bytes this crate doesn't model.
    pub header_extra: Vec<u8>,
    /// The XBE certificate.
    pub certificate: Certificate,
    /// Certificate bytes beyond [`certificate::MODELED_BYTES`], up to
    /// `certificate.size`.
    pub certificate_extra: Vec<u8>,
    /// Section headers, in file order.
    pub sections: Vec<SectionHeader>,
    /// Section names, indexed in parallel with `sections`.
    pub section_names: Vec<String>,
    /// Section bytes, indexed in parallel with `sections`.
    pub section_bytes: Vec<SectionBytes>,
    /// Statically linked library versions (always includes `XBOXKRNL`).
    pub library_versions: Vec<LibraryVersion>,
    /// The thread-local storage directory, if the image declares one.
    pub tls: Option<TlsDirectory>,
    /// The RLE-compressed boot logo bitmap.
    pub logo_bitmap: Vec<u8>,
    /// Full debug path, e.g. `D:\dev\game\game.exe`.
    pub debug_pathname: String,
    /// Debug filename, a suffix of `debug_pathname`.
    pub debug_filename: String,
    /// Kernel import ordinals, zero-terminated in the on-disk table.
    pub kernel_thunk_table: Vec<u32>,
    /// Retail or debug obfuscation mode.
    pub mode: Mode,
}

impl Xbe {
    /// Parse an XBE image from `binary`.
    pub fn load(binary: &[u8]) -> Result<Self> {
        let header_slice = read_bytes(binary, 0, HEADER_SIZE)?;
        let header = *bytemuck::checked::try_from_bytes::<Header>(header_slice)
            .map_err(|e| Error::BadMagic(format!("malformed XBE header: {e}")))?;
        if header.magic != XBE_MAGIC {
            return Err(Error::BadMagic("missing XBEH magic".into()));
        }
        if (header.size_of_image_header as usize) < HEADER_SIZE {
            return Err(Error::UnsupportedFormat("size_of_image_header smaller than fixed header".into()));
        }

        let extra_len = header.size_of_image_header as usize - HEADER_SIZE;
        let header_extra = if extra_len == 0 { Vec::new() } else { read_bytes(binary, HEADER_SIZE, extra_len)?.to_vec() };

        let (entry_plain, mode) = Mode::decode_entry(header.entry_address, header.pe_base_address);

        let cert_off = header.certificate_address.checked_sub(header.base_address).ok_or_else(|| {
            Error::AddressOutOfRange("certificate address before base address".into())
        })? as usize;
        let cert_fixed = read_bytes(binary, cert_off, size_of::<Certificate>())?;
        let certificate = *bytemuck::checked::try_from_bytes::<Certificate>(cert_fixed)
            .map_err(|e| Error::BadMagic(format!("malformed certificate: {e}")))?;
        let cert_tail = (certificate.size as usize).saturating_sub(size_of::<Certificate>());
        let certificate_extra = if cert_tail == 0 {
            Vec::new()
        } else {
            read_bytes(binary, cert_off + size_of::<Certificate>(), cert_tail)?.to_vec()
        };

        let sections_off = header.section_headers_address.checked_sub(header.base_address).ok_or_else(|| {
            Error::AddressOutOfRange("section headers address before base address".into())
        })? as usize;
        let sections = section::parse_section_table(binary, sections_off, header.section_count)?;

        let mut section_names = Vec::with_capacity(sections.len());
        let mut section_bytes = Vec::with_capacity(sections.len());
        for s in &sections {
            let name_off = s.section_name_address.checked_sub(header.base_address).ok_or_else(|| {
                Error::AddressOutOfRange("section name address before base address".into())
            })? as usize;
            section_names.push(read_cstr(binary, name_off, 256)?);

            let len = s.raw_size as usize;
            let bytes = if len == 0 { Vec::new() } else { read_bytes(binary, s.raw_address as usize, len)?.to_vec() };
            section_bytes.push(SectionBytes::Owned(bytes));
        }

        let lib_off = header.library_versions_address.checked_sub(header.base_address).ok_or_else(|| {
            Error::AddressOutOfRange("library versions address before base address".into())
        })? as usize;
        let lib_size = size_of::<LibraryVersion>();
        let mut library_versions = Vec::with_capacity(header.library_versions_count as usize);
        let mut off = lib_off;
        for _ in 0..header.library_versions_count {
            let slice = read_bytes(binary, off, lib_size)?;
            let lv = *bytemuck::checked::try_from_bytes::<LibraryVersion>(slice)
                .map_err(|e| Error::BadMagic(format!("malformed library version: {e}")))?;
            library_versions.push(lv);
            off += lib_size;
        }

        let tls = if header.tls_address == 0 {
            None
        } else {
            let tls_off = header.tls_address.checked_sub(header.base_address).ok_or_else(|| {
                Error::AddressOutOfRange("TLS address before base address".into())
            })? as usize;
            let slice = read_bytes(binary, tls_off, size_of::<TlsDirectory>())?;
            Some(*bytemuck::checked::try_from_bytes::<TlsDirectory>(slice)
                .map_err(|e| Error::BadMagic(format!("malformed TLS directory: {e}")))?)
        };

        let logo_bitmap = if header.logo_bitmap_address == 0 || header.logo_bitmap_size == 0 {
            Vec::new()
        } else {
            let logo_off = header.logo_bitmap_address.checked_sub(header.base_address).ok_or_else(|| {
                Error::AddressOutOfRange("logo bitmap address before base address".into())
            })? as usize;
            read_bytes(binary, logo_off, header.logo_bitmap_size as usize)?.to_vec()
        };

        let debug_pathname = if header.debug_pathname_address == 0 {
            String::new()
        } else {
            let off = header.debug_pathname_address.checked_sub(header.base_address).ok_or_else(|| {
                Error::AddressOutOfRange("debug pathname address before base address".into())
            })? as usize;
            read_cstr(binary, off, 260)?
        };
        let debug_filename = if header.debug_filename_address == 0 {
            String::new()
        } else {
            let off = header.debug_filename_address.checked_sub(header.base_address).ok_or_else(|| {
                Error::AddressOutOfRange("debug filename address before base address".into())
            })? as usize;
            read_cstr(binary, off, 260)?
        };

        let thunk_addr = mode.decode_thunk(header.kernel_thunk_address);
        let thunk_off = thunk_addr.checked_sub(header.base_address).ok_or_else(|| {
            Error::AddressOutOfRange("kernel thunk table address before base address".into())
        })? as usize;
        let mut kernel_thunk_table = Vec::new();
        let mut off = thunk_off;
        loop {
            let ordinal = read_u32(binary, off)?;
            off += 4;
            if ordinal == 0 {
                break;
            }
            kernel_thunk_table.push(ordinal);
        }

        let mut header = header;
        header.entry_address = entry_plain;
        header.kernel_thunk_address = thunk_addr;

        Ok(Self {
            header,
            header_extra,
            certificate,
            certificate_extra,
            sections,
            section_names,
            section_bytes,
            library_versions,
            tls,
            logo_bitmap,
            debug_pathname,
            debug_filename,
            kernel_thunk_table,
            mode,
        })
    }

    /// Re-lay the header region (certificate, section headers, library
    /// versions, debug strings, kernel thunk table, logo bitmap) and fix up
    /// every address field in `self.header` to match, then serialize the
    /// whole image.
    ///
    /// Callers (the translators) are expected to have already assigned
    /// `sections[i].raw_address`/`raw_size` for the section *content*, which
    /// is laid out after the header region; `emit` only lays out the header
    /// region itself.
    pub fn emit(&mut self) -> Vec<u8> {
        let base = self.header.base_address;

        let mut meta = Cursor::new();
        meta.write_bytes(&[0u8; HEADER_SIZE]);
        meta.write_bytes(&self.header_extra);

        let certificate_address = base + meta.position() as u32;
        meta.write_bytes(bytes_of(&self.certificate));
        meta.write_bytes(&self.certificate_extra);

        let section_headers_address = base + meta.position() as u32;
        let section_headers_placeholder = meta.position();
        meta.write_zeros(self.sections.len() * size_of::<SectionHeader>());

        let mut name_addresses = Vec::with_capacity(self.sections.len());
        for name in &self.section_names {
            name_addresses.push(base + meta.position() as u32);
            meta.write_bytes(name.as_bytes());
            meta.write_u8(0);
        }

        let library_versions_address = base + meta.position() as u32;
        for lv in &self.library_versions {
            meta.write_bytes(bytes_of(lv));
        }
        let kernel_library_version_address = self
            .library_versions
            .iter()
            .position(|l| l.name_str() == "XBOXKRNL")
            .map(|i| library_versions_address + (i * size_of::<LibraryVersion>()) as u32)
            .unwrap_or(0);
        let xapi_library_version_address = self
            .library_versions
            .iter()
            .position(|l| l.name_str() == "XAPILIB")
            .map(|i| library_versions_address + (i * size_of::<LibraryVersion>()) as u32)
            .unwrap_or(0);

        let tls_address = if let Some(tls) = &self.tls {
            let addr = base + meta.position() as u32;
            meta.write_bytes(bytes_of(tls));
            addr
        } else {
            0
        };

        let debug_pathname_address = if self.debug_pathname.is_empty() {
            0
        } else {
            let addr = base + meta.position() as u32;
            meta.write_bytes(self.debug_pathname.as_bytes());
            meta.write_u8(0);
            addr
        };
        let debug_filename_address = if self.debug_filename.is_empty() {
            0
        } else {
            let addr = base + meta.position() as u32;
            meta.write_bytes(self.debug_filename.as_bytes());
            meta.write_u8(0);
            addr
        };
        let debug_unicode_filename_address = if self.debug_filename.is_empty() {
            0
        } else {
            let addr = base + meta.position() as u32;
            for unit in self.debug_filename.encode_utf16() {
                meta.write_u16(unit);
            }
            meta.write_u16(0);
            addr
        };

        let kernel_thunk_table_address = base + meta.position() as u32;
        for ordinal in &self.kernel_thunk_table {
            meta.write_u32(*ordinal);
        }
        meta.write_u32(0);

        let logo_bitmap_address = if self.logo_bitmap.is_empty() {
            0
        } else {
            let addr = base + meta.position() as u32;
            meta.write_bytes(&self.logo_bitmap);
            addr
        };

        meta.align_to(PAGE_SIZE);
        let size_of_headers = meta.position() as u32;

        for (i, section) in self.sections.iter_mut().enumerate() {
            section.section_name_address = name_addresses[i];
        }

        self.header.size_of_headers = size_of_headers;
        self.header.size_of_image_header = HEADER_SIZE as u32 + self.header_extra.len() as u32;
        self.header.certificate_address = certificate_address;
        self.header.section_headers_address = section_headers_address;
        self.header.section_count = self.sections.len() as u32;
        self.header.library_versions_count = self.library_versions.len() as u32;
        self.header.library_versions_address = library_versions_address;
        self.header.kernel_library_version_address = kernel_library_version_address;
        self.header.xapi_library_version_address = xapi_library_version_address;
        self.header.tls_address = tls_address;
        self.header.debug_pathname_address = debug_pathname_address;
        self.header.debug_filename_address = debug_filename_address;
        self.header.debug_unicode_filename_address = debug_unicode_filename_address;
        self.header.logo_bitmap_address = logo_bitmap_address;
        self.header.logo_bitmap_size = self.logo_bitmap.len() as u32;

        // `self.header` keeps plain entry/thunk addresses, matching `load`'s
        // in-memory convention; only the on-disk copy carries the XOR'd form,
        // so repeated `emit` calls (the PE→XBE two-pass layout trick) never
        // drift from re-obfuscating an already-obfuscated value.
        let mut on_disk_header = self.header;
        on_disk_header.kernel_thunk_address = self.mode.encode_thunk(kernel_thunk_table_address);
        on_disk_header.entry_address = self.mode.encode_entry(self.header.entry_address);

        let mut out = meta.into_bytes();
        out[..HEADER_SIZE].copy_from_slice(bytes_of(&on_disk_header));
        for (i, section) in self.sections.iter().enumerate() {
            let start = section_headers_placeholder + i * size_of::<SectionHeader>();
            out[start..start + size_of::<SectionHeader>()].copy_from_slice(bytes_of(section));
        }

        if (out.len() as u32) < size_of_headers {
            out.resize(size_of_headers as usize, 0);
        }

        let mut sorted: Vec<usize> = (0..self.sections.len()).collect();
        sorted.sort_by_key(|&i| self.sections[i].raw_address);
        for i in sorted {
            let target = self.sections[i].raw_address as usize;
            if target > out.len() {
                out.resize(target, 0);
            }
            out.extend_from_slice(self.section_bytes[i].as_slice());
        }

        out
    }

    /// The section header and bytes named `name`, if present.
    pub fn section(&self, name: &str) -> Option<(&SectionHeader, &SectionBytes)> {
        self.section_names
            .iter()
            .position(|n| n == name)
            .map(|i| (&self.sections[i], &self.section_bytes[i]))
    }

    /// Verify every section's stored SHA-1 digest matches its current bytes.
    pub fn verify_digests(&self) -> Result<()> {
        use sha1::{Digest, Sha1};
        for (i, section) in self.sections.iter().enumerate() {
            let mut hasher = Sha1::new();
            hasher.update(self.section_bytes[i].as_slice());
            let digest: [u8; 20] = hasher.finalize().into();
            if digest != section.section_digest {
                return Err(Error::SectionOverflow(format!(
                    "section {:?} digest mismatch",
                    self.section_names.get(i)
                )));
            }
        }
        Ok(())
    }

    /// Recompute every section's `section_digest` from its current bytes.
    pub fn recompute_digests(&mut self) {
        use sha1::{Digest, Sha1};
        for (i, section) in self.sections.iter_mut().enumerate() {
            let mut hasher = Sha1::new();
            hasher.update(self.section_bytes[i].as_slice());
            section.section_digest = hasher.finalize().into();
        }
    }
}

impl fmt::Display for Xbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.certificate)?;
        writeln!(f, "Mode: {}", self.mode)?;
        writeln!(f, "Entry Point: {:#010x}", self.header.entry_address)?;
        writeln!(f, "Sections: {}", self.sections.len())?;
        for (name, section) in self.section_names.iter().zip(&self.sections) {
            writeln!(f, "  {name}: {section}")?;
        }
        for lv in &self.library_versions {
            writeln!(f, "{lv}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xbe::certificate::Certificate;
    use crate::xbe::library::{pack_name as lib_name, LibraryVersion};
    use crate::xbe::section::{SectionHeader, SectionHeaderFlags};

    fn minimal_xbe() -> Xbe {
        let base = DEFAULT_BASE_ADDRESS;
        let mut header =
            Header { magic: XBE_MAGIC, base_address: base, pe_base_address: 0x0040_0000, ..Default::default() };
        header.entry_address = 0x0040_1000;
        let mut certificate = Certificate::default();
        certificate.size = size_of::<Certificate>() as u32;
        certificate.set_title_name("Test Title");
        let section = SectionHeader {
            flags: (SectionHeaderFlags::EXECUTABLE | SectionHeaderFlags::PRELOAD).bits(),
            virtual_address: 0x0001_1000,
            virtual_size: 256,
            raw_address: 0x1000,
            raw_size: 256,
            ..Default::default()
        };
        let mut xbe = Xbe {
            header,
            header_extra: Vec::new(),
            certificate,
            certificate_extra: Vec::new(),
            sections: vec![section],
            section_names: vec![".text".into()],
            section_bytes: vec![SectionBytes::Owned(vec![0x90; 256])],
            library_versions: vec![LibraryVersion { name: lib_name("XBOXKRNL"), ..Default::default() }],
            tls: None,
            logo_bitmap: crate::xbe::logo::DEFAULT_LOGO_BITMAP.to_vec(),
            debug_pathname: "D:\\test\\test.exe".into(),
            debug_filename: "test.exe".into(),
            kernel_thunk_table: vec![1, 2, 3],
            mode: Mode::Retail,
        };
        xbe.recompute_digests();
        xbe
    }

    #[test]
    fn round_trip_minimal_xbe() {
        let mut xbe = minimal_xbe();
        let entry = xbe.header.entry_address;
        let bytes = xbe.emit();
        let reloaded = Xbe::load(&bytes).unwrap();
        assert_eq!(reloaded.header.entry_address, entry);
        assert_eq!(reloaded.mode, Mode::Retail);
        assert_eq!(reloaded.certificate.title_name_string(), "Test Title");
        assert_eq!(reloaded.sections.len(), 1);
        assert_eq!(reloaded.section_names[0], ".text");
        assert_eq!(reloaded.section_bytes[0].as_slice(), &[0x90; 256][..]);
        assert_eq!(reloaded.kernel_thunk_table, vec![1, 2, 3]);
        assert_eq!(reloaded.debug_pathname, "D:\\test\\test.exe");
        reloaded.verify_digests().unwrap();
    }

    #[test]
    fn load_rejects_bad_magic() {
        let bytes = vec![0u8; HEADER_SIZE];
        match Xbe::load(&bytes) {
            Err(Error::BadMagic(_)) => {}
            other => panic!("expected BadMagic, got {other:?}"),
        }
    }
}
