//! Thread-local storage directory, carried over verbatim from the source PE
//! when present.
use bytemuck::{Pod, Zeroable};
use core::fmt;

/// The TLS directory (0x18 bytes on disk).
#[derive(Copy, Clone, Pod, Zeroable, Default)]
#[repr(C)]
pub struct TlsDirectory {
    /// Image-relative absolute address of the raw TLS data's start.
    pub raw_data_start: u32,
    /// Image-relative absolute address of the raw TLS data's end.
    pub raw_data_end: u32,
    /// Image-relative absolute address of the TLS index variable.
    pub index_address: u32,
    /// Image-relative absolute address of the TLS callback array, or zero.
    pub callbacks_address: u32,
    /// Size of the zero-fill extending the raw data to the template size.
    pub size_of_zero_fill: u32,
    /// Characteristics; always zero in practice.
    pub characteristics: u32,
}

impl fmt::Display for TlsDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TLS Directory")?;
        writeln!(f, "-------------")?;
        writeln!(f, "Raw Data:    {:#010x}-{:#010x}", self.raw_data_start, self.raw_data_end)?;
        writeln!(f, "Index:       {:#010x}", self.index_address)?;
        write!(f, "Callbacks:   {:#010x}", self.callbacks_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_directory_is_0x18_bytes() {
        assert_eq!(core::mem::size_of::<TlsDirectory>(), 0x18);
    }
}
