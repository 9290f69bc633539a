//! Address encoding

/// Number of address bytes sent after an address-bearing opcode
pub const ADDRESS_BYTES: usize = 3;

/// Size of the 24-bit address space (16 MiB)
pub const ADDRESS_SPACE: u32 = 1 << 24;

/// Encode a 24-bit address big-endian (most significant byte first)
///
/// Bits above 23 are dropped.
pub const fn encode_address(address: u32) -> [u8; ADDRESS_BYTES] {
    [(address >> 16) as u8, (address >> 8) as u8, address as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_msb_first() {
        assert_eq!(encode_address(0x12_3456), [0x12, 0x34, 0x56]);
        assert_eq!(encode_address(0), [0, 0, 0]);
        assert_eq!(encode_address(0xFF_FFFF), [0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_encode_drops_high_byte() {
        assert_eq!(encode_address(0xAB12_3456), [0x12, 0x34, 0x56]);
    }
}
