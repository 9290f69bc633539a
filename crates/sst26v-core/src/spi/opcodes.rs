//! SST26V SPI instruction opcodes
//!
//! The SST26V family implements a fixed, closed set of one-byte instructions.
//! Only the single-I/O subset driven by this crate is listed here.

// ============================================================================
// Reset
// ============================================================================

/// No Operation - cancels a pending Reset Enable
pub const NOP: u8 = 0x00;
/// Reset Enable
pub const RSTEN: u8 = 0x66;
/// Reset Device (accepted only directly after RSTEN)
pub const RST: u8 = 0x99;

// ============================================================================
// Status / configuration registers
// ============================================================================

/// Read Status Register
pub const RDSR: u8 = 0x05;
/// Write Status Register (status byte followed by configuration byte)
pub const WRSR: u8 = 0x01;
/// Read Configuration Register
pub const RDCR: u8 = 0x35;

// ============================================================================
// Read / identification
// ============================================================================

/// Read Memory with 3-byte address
pub const READ: u8 = 0x03;
/// Set Burst length for wrapped reads
pub const SB: u8 = 0xC0;
/// Read JEDEC ID (manufacturer, memory type, device)
pub const JEDEC_ID: u8 = 0x9F;

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - sets the WEL bit, required before any write/erase
pub const WREN: u8 = 0x06;
/// Write Disable - clears the WEL bit
pub const WRDI: u8 = 0x04;

// ============================================================================
// Erase / program
// ============================================================================

/// Sector Erase 4KB with 3-byte address
pub const SE: u8 = 0x20;
/// Block Erase (8/32/64KB depending on the block) with 3-byte address
pub const BE: u8 = 0xD8;
/// Chip Erase
pub const CE: u8 = 0xC7;
/// Page Program, up to 256 bytes
pub const PP: u8 = 0x02;
/// Write Suspend
pub const WRSU: u8 = 0xB0;
/// Write Resume
pub const WRRE: u8 = 0x30;

// ============================================================================
// Block protection
// ============================================================================

/// Read Block-Protection Register
pub const RBPR: u8 = 0x72;
/// Write Block-Protection Register
pub const WBPR: u8 = 0x42;

/// Human readable instruction name, used for trace logging
pub const fn name(opcode: u8) -> &'static str {
    match opcode {
        NOP => "NOP",
        RSTEN => "RSTEN",
        RST => "RST",
        RDSR => "RDSR",
        WRSR => "WRSR",
        RDCR => "RDCR",
        READ => "READ",
        SB => "SB",
        JEDEC_ID => "JEDEC-ID",
        WREN => "WREN",
        WRDI => "WRDI",
        SE => "SE",
        BE => "BE",
        CE => "CE",
        PP => "PP",
        WRSU => "WRSU",
        WRRE => "WRRE",
        RBPR => "RBPR",
        WBPR => "WBPR",
        _ => "?",
    }
}
