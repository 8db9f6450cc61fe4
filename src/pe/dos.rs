//! The canonical 128-byte MS-DOS stub every linker-produced PE carries
//! ahead of the real PE header, and the fixed offset of its `e_lfanew`
//! field.

/// Byte offset of the `e_lfanew` field within the DOS header.
pub const E_LFANEW_OFFSET: usize = 0x3c;

/// Size in bytes of the canonical DOS stub this crate emits.
pub const DOS_STUB_LEN: usize = 128;

/// The classic linker-emitted DOS stub ("This program cannot be run in DOS
/// mode."), with `e_lfanew` at offset 0x3c pointing immediately past the end
/// of the stub (0x80).
#[rustfmt::skip]
pub const DOS_STUB: [u8; DOS_STUB_LEN] = [
    0x4D, 0x5A, 0x90, 0x00, 0x03, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00,
    0xB8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00,
    0x0E, 0x1F, 0xBA, 0x0E, 0x00, 0xB4, 0x09, 0xCD, 0x21, 0xB8, 0x01, 0x4C, 0xCD, 0x21, 0x54, 0x68,
    0x69, 0x73, 0x20, 0x70, 0x72, 0x6F, 0x67, 0x72, 0x61, 0x6D, 0x20, 0x63, 0x61, 0x6E, 0x6E, 0x6F,
    0x74, 0x20, 0x62, 0x65, 0x20, 0x72, 0x75, 0x6E, 0x20, 0x69, 0x6E, 0x20, 0x44, 0x4F, 0x53, 0x20,
    0x6D, 0x6F, 0x64, 0x65, 0x2E, 0x0D, 0x0D, 0x0A, 0x24, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// The PE signature bytes (`"PE\0\0"`).
pub const PE_SIGNATURE: [u8; 4] = *b"PE\0\0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn e_lfanew_points_past_the_stub() {
        let lfanew = u32::from_le_bytes(
            DOS_STUB[E_LFANEW_OFFSET..E_LFANEW_OFFSET + 4].try_into().unwrap(),
        );
        assert_eq!(lfanew as usize, DOS_STUB_LEN);
    }

    #[test]
    fn stub_is_128_bytes() {
        assert_eq!(DOS_STUB.len(), DOS_STUB_LEN);
    }
}
