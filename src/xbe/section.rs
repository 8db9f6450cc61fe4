//! XBE section headers, their flags, and the ownership-tagged bytes backing
//! each section in memory.
use crate::error::{Error, Result};
use crate::prelude::*;
use bitflags::bitflags;
use bytemuck::{checked::try_from_bytes, Pod, Zeroable};
use core::{fmt, str};
use std::rc::Rc;

/// One XBE section header (0x38 bytes on disk), grounded on
/// `other_examples/BfBBModdingTools-xbld`'s `raw::SectionHeader`.
#[derive(Copy, Clone, Pod, Zeroable, Default)]
#[repr(C)]
pub struct SectionHeader {
    /// Section flags bitfield.
    pub flags: u32,
    /// Image-relative absolute load address.
    pub virtual_address: u32,
    /// Size once loaded.
    pub virtual_size: u32,
    /// File offset of the section's bytes.
    pub raw_address: u32,
    /// Size of the section's bytes on disk.
    pub raw_size: u32,
    /// Address of the NUL-terminated ASCII section name.
    pub section_name_address: u32,
    /// Reference count used by the kernel loader; always zero in a freshly
    /// linked image.
    pub section_reference_count: u32,
    /// Address of the head of this section's head-reference linked list.
    pub head_shared_page_reference_count_address: u32,
    /// Address of the tail of this section's tail-reference linked list.
    pub tail_shared_page_reference_count_address: u32,
    /// SHA-1 digest of the section's raw bytes.
    pub section_digest: [u8; 20],
}

impl SectionHeader {
    /// Returns the section's flags as bitflags, if all bits are recognized.
    pub fn get_flags(&self) -> Option<SectionHeaderFlags> {
        SectionHeaderFlags::from_bits(self.flags)
    }

    /// Is `raw_address == virtual_address`, the invariant the DXT transform
    /// requires of every section?
    pub fn is_identity_mapped(&self) -> bool {
        self.raw_address == self.virtual_address
    }
}

impl fmt::Display for SectionHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Section Header")?;
        writeln!(f, "--------------")?;
        writeln!(f, "Flags:           {:?}", self.get_flags())?;
        writeln!(f, "Virtual Address: {:#010x}", self.virtual_address)?;
        writeln!(f, "Virtual Size:    {:#x}", self.virtual_size)?;
        writeln!(f, "Raw Address:     {:#010x}", self.raw_address)?;
        write!(f, "Raw Size:        {:#x}", self.raw_size)
    }
}

bitflags! {
    /// Per-section flags.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct SectionHeaderFlags: u32 {
        /// Section is writable.
        const WRITABLE = 0x1;
        /// Section is preloaded.
        const PRELOAD = 0x2;
        /// Section is executable.
        const EXECUTABLE = 0x4;
        /// Section is inserted into the non-debug file.
        const INSERTED_FILE = 0x8;
        /// Section is part of the executable's head page.
        const HEAD_PAGE_READ_ONLY = 0x10;
        /// Section is part of the executable's tail page.
        const TAIL_PAGE_READ_ONLY = 0x20;
    }
}

impl fmt::Debug for SectionHeaderFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for SectionHeaderFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl str::FromStr for SectionHeaderFlags {
    type Err = bitflags::parser::ParseError;

    fn from_str(flags: &str) -> core::result::Result<Self, Self::Err> {
        Ok(Self(flags.parse()?))
    }
}

/// Parse `count` section headers starting at `offset`.
pub fn parse_section_table(binary: &[u8], mut offset: usize, count: u32) -> Result<Vec<SectionHeader>> {
    let header_size = size_of::<SectionHeader>();
    let mut headers = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let slice = binary
            .get(offset..offset + header_size)
            .ok_or_else(|| Error::Truncated("XBE section header".into()))?;
        let header = try_from_bytes::<SectionHeader>(slice)
            .map_err(|e| Error::BadMagic(format!("malformed XBE section header: {e}")))?;
        headers.push(*header);
        offset += header_size;
    }
    Ok(headers)
}

/// A section's raw bytes, tagged by whether they were borrowed verbatim from
/// a source image (cheap to carry through an unrelated transform) or built
/// fresh by a translator.
#[derive(Clone)]
pub enum SectionBytes {
    /// Bytes shared, read-only, with the source image that produced them.
    Borrowed(Rc<[u8]>),
    /// Bytes owned outright, because a translator built or modified them.
    Owned(Vec<u8>),
}

impl SectionBytes {
    /// Borrow the bytes regardless of ownership.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            SectionBytes::Borrowed(rc) => rc,
            SectionBytes::Owned(v) => v,
        }
    }

    /// Promote to an owned, mutable buffer, cloning only if currently
    /// borrowed.
    pub fn to_mut(&mut self) -> &mut Vec<u8> {
        if let SectionBytes::Borrowed(rc) = self {
            *self = SectionBytes::Owned(rc.to_vec());
        }
        match self {
            SectionBytes::Owned(v) => v,
            SectionBytes::Borrowed(_) => unreachable!(),
        }
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Is this empty?
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl From<Vec<u8>> for SectionBytes {
    fn from(v: Vec<u8>) -> Self {
        SectionBytes::Owned(v)
    }
}

impl From<Rc<[u8]>> for SectionBytes {
    fn from(rc: Rc<[u8]>) -> Self {
        SectionBytes::Borrowed(rc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_header_is_0x38_bytes() {
        assert_eq!(size_of::<SectionHeader>(), 0x38);
    }

    #[test]
    fn identity_mapping_check() {
        let h = SectionHeader { raw_address: 0x1000, virtual_address: 0x1000, ..Default::default() };
        assert!(h.is_identity_mapped());
        let h2 = SectionHeader { raw_address: 0x400, virtual_address: 0x1000, ..Default::default() };
        assert!(!h2.is_identity_mapped());
    }

    #[test]
    fn to_mut_promotes_borrowed_without_mutating_original() {
        let shared: Rc<[u8]> = Rc::from(vec![1, 2, 3]);
        let mut bytes = SectionBytes::Borrowed(shared.clone());
        bytes.to_mut().push(4);
        assert_eq!(bytes.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(&*shared, &[1, 2, 3]);
    }
}
