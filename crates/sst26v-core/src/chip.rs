//! Chip identification
//!
//! SST26V parts answer the JEDEC ID instruction with manufacturer `0xBF`,
//! memory type `0x26` and a device byte selecting the density.

use core::fmt;

/// Microchip/SST JEDEC manufacturer ID
pub const MANUFACTURER_SST: u8 = 0xBF;

/// SST26 serial flash memory type
pub const MEMORY_TYPE_SST26: u8 = 0x26;

/// Page size for page program
pub const PAGE_SIZE: u32 = 256;

/// Smallest erasable unit (SE)
pub const SECTOR_SIZE: u32 = 4 * 1024;

/// Size of the uniform blocks erased by BE
pub const BLOCK_SIZE: u32 = 64 * 1024;

/// Three-byte JEDEC identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JedecId {
    /// Manufacturer ID (first byte)
    pub manufacturer: u8,
    /// Memory type (second byte)
    pub memory_type: u8,
    /// Device ID (third byte)
    pub device: u8,
}

impl JedecId {
    /// Build an ID from its three wire bytes
    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self {
            manufacturer: bytes[0],
            memory_type: bytes[1],
            device: bytes[2],
        }
    }

    /// The three wire bytes
    pub const fn to_bytes(self) -> [u8; 3] {
        [self.manufacturer, self.memory_type, self.device]
    }

    /// True if this is an SST26 family ID
    pub const fn is_sst26(&self) -> bool {
        self.manufacturer == MANUFACTURER_SST && self.memory_type == MEMORY_TYPE_SST26
    }
}

impl fmt::Display for JedecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X} {:02X} {:02X}",
            self.manufacturer, self.memory_type, self.device
        )
    }
}

/// A known SST26V part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part {
    /// Part name
    pub name: &'static str,
    /// JEDEC ID reported by the part
    pub id: JedecId,
    /// Capacity in bytes
    pub size: u32,
}

impl Part {
    const fn new(name: &'static str, device: u8, size: u32) -> Self {
        Self {
            name,
            id: JedecId {
                manufacturer: MANUFACTURER_SST,
                memory_type: MEMORY_TYPE_SST26,
                device,
            },
            size,
        }
    }

    /// Size of the BE block containing `addr`
    ///
    /// The lowest and highest 64 KiB are split into four 8 KiB blocks and one
    /// 32 KiB block; everything in between is uniform 64 KiB blocks.
    pub const fn block_size_at(&self, addr: u32) -> u32 {
        let boot = 4 * 8 * 1024;
        if addr < boot || addr >= self.size - boot {
            8 * 1024
        } else if addr < BLOCK_SIZE || addr >= self.size - BLOCK_SIZE {
            32 * 1024
        } else {
            BLOCK_SIZE
        }
    }

    /// True if `[addr, addr + len)` lies inside the part
    pub const fn contains(&self, addr: u32, len: u32) -> bool {
        len <= self.size && addr <= self.size - len
    }
}

/// Every SST26V part this crate knows about
pub const PARTS: &[Part] = &[
    Part::new("SST26VF016B", 0x41, 2 * 1024 * 1024),
    Part::new("SST26VF032B", 0x42, 4 * 1024 * 1024),
    Part::new("SST26VF064B", 0x43, 8 * 1024 * 1024),
];

/// Look up a part by JEDEC ID
pub fn find_part(id: JedecId) -> Option<&'static Part> {
    PARTS.iter().find(|part| part.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_part() {
        let part = find_part(JedecId::from_bytes([0xBF, 0x26, 0x43])).unwrap();
        assert_eq!(part.name, "SST26VF064B");
        assert_eq!(part.size, 8 * 1024 * 1024);
        assert!(find_part(JedecId::from_bytes([0xEF, 0x40, 0x18])).is_none());
    }

    #[test]
    fn test_block_layout() {
        let part = &PARTS[2];
        assert_eq!(part.block_size_at(0), 8 * 1024);
        assert_eq!(part.block_size_at(0x7FFF), 8 * 1024);
        assert_eq!(part.block_size_at(0x8000), 32 * 1024);
        assert_eq!(part.block_size_at(0x1_0000), 64 * 1024);
        assert_eq!(part.block_size_at(part.size - 0x1_0000), 32 * 1024);
        assert_eq!(part.block_size_at(part.size - 1), 8 * 1024);
    }

    #[test]
    fn test_contains() {
        let part = &PARTS[0];
        assert!(part.contains(0, part.size));
        assert!(part.contains(part.size - 1, 1));
        assert!(!part.contains(part.size, 1));
        assert!(!part.contains(1, part.size));
    }

    #[test]
    fn test_jedec_display() {
        let id = JedecId::from_bytes([0xBF, 0x26, 0x42]);
        assert_eq!(std::format!("{}", id), "BF 26 42");
        assert!(id.is_sst26());
        assert_eq!(id.to_bytes(), [0xBF, 0x26, 0x42]);
    }
}
