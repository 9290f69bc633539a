//! SST26V instruction sequences
//!
//! Every function here issues exactly one opcode inside one chip-select
//! frame, except for the few helpers documented as multi-frame
//! (`software_reset`, `lock_all`, `unlock_all`, `wait_ready`).
//!
//! None of the single-frame instructions set the write-enable latch on their
//! own: callers must send `write_enable` first where the chip requires it.

use crate::chip::{JedecId, PAGE_SIZE};
use crate::error::{Error, Result};
use crate::protection::{BlockProtection, BPR_LEN};
use crate::spi::{opcodes, SpiCommand};
use crate::status::{ConfigReg, Status};
use crate::transport::CommandBus;

// ============================================================================
// Generic frames
// ============================================================================

/// Send a bare opcode
pub fn write_register<B: CommandBus + ?Sized>(bus: &mut B, opcode: u8) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcode);
    bus.execute(&mut cmd)
}

/// Send an opcode followed by a payload
pub fn write_data<B: CommandBus + ?Sized>(bus: &mut B, opcode: u8, data: &[u8]) -> Result<()> {
    let mut cmd = SpiCommand::write_reg(opcode, data);
    bus.execute(&mut cmd)
}

/// Send an opcode, then read `buf.len()` bytes back
pub fn write_read_register<B: CommandBus + ?Sized>(
    bus: &mut B,
    opcode: u8,
    buf: &mut [u8],
) -> Result<()> {
    let mut cmd = SpiCommand::read_reg(opcode, buf);
    bus.execute(&mut cmd)
}

// ============================================================================
// Reset
// ============================================================================

/// Send Reset Enable (RSTEN)
pub fn reset_enable<B: CommandBus + ?Sized>(bus: &mut B) -> Result<()> {
    write_register(bus, opcodes::RSTEN)
}

/// Send Reset (RST); only honoured directly after `reset_enable`
pub fn reset<B: CommandBus + ?Sized>(bus: &mut B) -> Result<()> {
    write_register(bus, opcodes::RST)
}

/// Send NOP, cancelling a pending Reset Enable
pub fn cancel_reset<B: CommandBus + ?Sized>(bus: &mut B) -> Result<()> {
    write_register(bus, opcodes::NOP)
}

/// Software reset: RSTEN then RST, two frames, nothing in between
pub fn software_reset<B: CommandBus + ?Sized>(bus: &mut B) -> Result<()> {
    reset_enable(bus)?;
    reset(bus)
}

// ============================================================================
// Register reads
// ============================================================================

/// Read the STATUS register
pub fn read_status<B: CommandBus + ?Sized>(bus: &mut B) -> Result<Status> {
    let mut buf = [0u8; 1];
    write_read_register(bus, opcodes::RDSR, &mut buf)?;
    Ok(Status::from_bits_retain(buf[0]))
}

/// Read the CONFIGURATION register
pub fn read_config<B: CommandBus + ?Sized>(bus: &mut B) -> Result<ConfigReg> {
    let mut buf = [0u8; 1];
    write_read_register(bus, opcodes::RDCR, &mut buf)?;
    Ok(ConfigReg::from_bits_retain(buf[0]))
}

/// Read the 3-byte JEDEC ID
pub fn read_jedec_id<B: CommandBus + ?Sized>(bus: &mut B) -> Result<JedecId> {
    let mut buf = [0u8; 3];
    write_read_register(bus, opcodes::JEDEC_ID, &mut buf)?;
    Ok(JedecId::from_bytes(buf))
}

/// Read the 18-byte block-protection register
pub fn read_block_protection<B: CommandBus + ?Sized>(bus: &mut B) -> Result<BlockProtection> {
    let mut buf = [0u8; BPR_LEN];
    write_read_register(bus, opcodes::RBPR, &mut buf)?;
    Ok(BlockProtection::from_bytes(buf))
}

// ============================================================================
// Register writes
// ============================================================================

/// Set the write-enable latch (WREN)
pub fn write_enable<B: CommandBus + ?Sized>(bus: &mut B) -> Result<()> {
    write_register(bus, opcodes::WREN)
}

/// Clear the write-enable latch (WRDI)
pub fn write_disable<B: CommandBus + ?Sized>(bus: &mut B) -> Result<()> {
    write_register(bus, opcodes::WRDI)
}

/// Suspend a running program or erase (WRSU)
pub fn write_suspend<B: CommandBus + ?Sized>(bus: &mut B) -> Result<()> {
    write_register(bus, opcodes::WRSU)
}

/// Resume a suspended program or erase (WRRE)
pub fn write_resume<B: CommandBus + ?Sized>(bus: &mut B) -> Result<()> {
    write_register(bus, opcodes::WRRE)
}

/// Write the STATUS and CONFIGURATION registers (WRSR, 2 bytes)
pub fn write_status<B: CommandBus + ?Sized>(bus: &mut B, status: u8, config: u8) -> Result<()> {
    write_data(bus, opcodes::WRSR, &[status, config])
}

/// Set the wrap length used by burst reads (SB, 1 byte)
pub fn set_burst_length<B: CommandBus + ?Sized>(bus: &mut B, length: u8) -> Result<()> {
    write_data(bus, opcodes::SB, &[length])
}

/// Write the full block-protection register (WBPR, 18 bytes)
pub fn write_block_protection<B: CommandBus + ?Sized>(
    bus: &mut B,
    bpr: &BlockProtection,
) -> Result<()> {
    write_data(bus, opcodes::WBPR, bpr.as_bytes())
}

/// WREN, then write an all-zero block-protection register
pub fn unlock_all<B: CommandBus + ?Sized>(bus: &mut B) -> Result<()> {
    write_enable(bus)?;
    write_block_protection(bus, &BlockProtection::unlocked())
}

/// WREN, then write an all-ones block-protection register
pub fn lock_all<B: CommandBus + ?Sized>(bus: &mut B) -> Result<()> {
    write_enable(bus)?;
    write_block_protection(bus, &BlockProtection::locked())
}

// ============================================================================
// Memory array
// ============================================================================

/// Read memory starting at `addr` into `buf` (READ)
///
/// Split into several READ instructions when `buf` is longer than the bus
/// allows in one frame.
pub fn read<B: CommandBus + ?Sized>(bus: &mut B, addr: u32, buf: &mut [u8]) -> Result<()> {
    let max_len = bus.max_read_len().max(1);
    let mut offset = addr;
    for chunk in buf.chunks_mut(max_len) {
        let len = chunk.len() as u32;
        let mut cmd = SpiCommand::read(opcodes::READ, offset, chunk);
        bus.execute(&mut cmd)?;
        offset = offset.wrapping_add(len);
    }
    Ok(())
}

/// Program up to one page starting at `addr` (PP)
///
/// The chip wraps inside the page when `addr + data.len()` crosses a page
/// boundary; payloads longer than a page are rejected with
/// [`Error::InvalidLength`].
pub fn program_page<B: CommandBus + ?Sized>(bus: &mut B, addr: u32, data: &[u8]) -> Result<()> {
    if data.len() > PAGE_SIZE as usize {
        return Err(Error::InvalidLength);
    }
    let mut cmd = SpiCommand::write(opcodes::PP, addr, data);
    bus.execute(&mut cmd)
}

/// Erase the 4 KiB sector containing `addr` (SE)
pub fn erase_sector<B: CommandBus + ?Sized>(bus: &mut B, addr: u32) -> Result<()> {
    let mut cmd = SpiCommand::erase(opcodes::SE, addr);
    bus.execute(&mut cmd)
}

/// Erase the block containing `addr` (BE)
pub fn erase_block<B: CommandBus + ?Sized>(bus: &mut B, addr: u32) -> Result<()> {
    let mut cmd = SpiCommand::erase(opcodes::BE, addr);
    bus.execute(&mut cmd)
}

/// Erase the whole array (CE)
pub fn chip_erase<B: CommandBus + ?Sized>(bus: &mut B) -> Result<()> {
    write_register(bus, opcodes::CE)
}

// ============================================================================
// Completion polling
// ============================================================================

/// Check if a program or erase is in progress
pub fn is_busy<B: CommandBus + ?Sized>(bus: &mut B) -> Result<bool> {
    Ok(read_status(bus)?.is_busy())
}

/// Poll STATUS until BUSY clears, at most `max_polls` times
///
/// Returns [`Error::Timeout`] if the chip is still busy after the last poll.
pub fn wait_ready<B: CommandBus + ?Sized>(bus: &mut B, max_polls: u32) -> Result<()> {
    for _ in 0..max_polls {
        if !is_busy(bus)? {
            return Ok(());
        }
    }
    Err(Error::Timeout)
}
