//! Block-protection register
//!
//! The SST26V replaces the classic BP status bits with an 18-byte
//! Block-Protection Register (BPR). A set bit write-locks the block it maps
//! to (the upper bits also carry read-lock bits for the 8 KiB boot blocks).
//! The register is always read and written in full.

use core::fmt;

/// Number of bytes in the block-protection register
pub const BPR_LEN: usize = 18;

/// Number of protection bits in the register
pub const BPR_BITS: usize = BPR_LEN * 8;

/// Typed value of the 18-byte block-protection register
///
/// Byte 0 is the first byte on the wire and holds the most significant bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockProtection([u8; BPR_LEN]);

impl BlockProtection {
    /// Every block writable
    pub const fn unlocked() -> Self {
        Self([0x00; BPR_LEN])
    }

    /// Every block write- and read-locked
    pub const fn locked() -> Self {
        Self([0xFF; BPR_LEN])
    }

    /// Wrap raw register bytes as read from or written to the chip
    pub const fn from_bytes(bytes: [u8; BPR_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw register bytes in wire order
    pub const fn as_bytes(&self) -> &[u8; BPR_LEN] {
        &self.0
    }

    /// Consume into raw register bytes
    pub const fn into_bytes(self) -> [u8; BPR_LEN] {
        self.0
    }

    /// True if no protection bit is set
    pub fn is_unlocked(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// True if every protection bit is set
    pub fn is_locked(&self) -> bool {
        self.0.iter().all(|&b| b == 0xFF)
    }

    /// Number of protection bits set
    pub fn count_locked(&self) -> u32 {
        self.0.iter().map(|b| b.count_ones()).sum()
    }

    /// Test BPR bit `bit` (0 = least significant bit of the last byte)
    ///
    /// Returns `None` if `bit` is out of range.
    pub fn bit(&self, bit: usize) -> Option<bool> {
        let (byte, mask) = Self::locate(bit)?;
        Some(self.0[byte] & mask != 0)
    }

    /// Set or clear BPR bit `bit`; out-of-range bits are ignored
    pub fn set_bit(&mut self, bit: usize, locked: bool) {
        if let Some((byte, mask)) = Self::locate(bit) {
            if locked {
                self.0[byte] |= mask;
            } else {
                self.0[byte] &= !mask;
            }
        }
    }

    fn locate(bit: usize) -> Option<(usize, u8)> {
        if bit >= BPR_BITS {
            return None;
        }
        Some((BPR_LEN - 1 - bit / 8, 1 << (bit % 8)))
    }
}

impl Default for BlockProtection {
    fn default() -> Self {
        Self::unlocked()
    }
}

impl From<[u8; BPR_LEN]> for BlockProtection {
    fn from(bytes: [u8; BPR_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for BlockProtection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockProtection({})", self)
    }
}

impl fmt::Display for BlockProtection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert!(BlockProtection::unlocked().is_unlocked());
        assert!(BlockProtection::locked().is_locked());
        assert_eq!(BlockProtection::locked().count_locked(), BPR_BITS as u32);
        assert_eq!(BlockProtection::default(), BlockProtection::unlocked());
    }

    #[test]
    fn test_bit_addressing() {
        let mut bpr = BlockProtection::unlocked();
        bpr.set_bit(0, true);
        bpr.set_bit(143, true);
        assert_eq!(bpr.as_bytes()[BPR_LEN - 1], 0x01);
        assert_eq!(bpr.as_bytes()[0], 0x80);
        assert_eq!(bpr.bit(0), Some(true));
        assert_eq!(bpr.bit(1), Some(false));
        assert_eq!(bpr.bit(BPR_BITS), None);

        bpr.set_bit(0, false);
        assert_eq!(bpr.bit(0), Some(false));
        assert_eq!(bpr.count_locked(), 1);
    }

    #[test]
    fn test_display_hex() {
        let mut bytes = [0u8; BPR_LEN];
        bytes[0] = 0xAB;
        let bpr = BlockProtection::from_bytes(bytes);
        let text = std::format!("{}", bpr);
        assert!(text.starts_with("AB00"));
        assert_eq!(text.len(), BPR_LEN * 2);
    }
}
