//! SPI command structure

use super::address::{encode_address, ADDRESS_BYTES};

/// Longest command header: opcode plus a 3-byte address
pub const MAX_HEADER_LEN: usize = 1 + ADDRESS_BYTES;

/// A single framed SST26V instruction
///
/// Designed to avoid allocation - uses slices for data.
/// The lifetime parameter `'a` ties the command to the buffers it references.
/// One command always maps to exactly one chip-select frame.
pub struct SpiCommand<'a> {
    /// The opcode byte
    pub opcode: u8,

    /// 24-bit address (if any)
    pub address: Option<u32>,

    /// Data to write after opcode/address
    pub write_data: &'a [u8],

    /// Buffer to read into (mutable)
    pub read_buf: &'a mut [u8],
}

impl<'a> SpiCommand<'a> {
    /// Create a simple command with no address or data (e.g., WREN, RSTEN)
    pub fn simple(opcode: u8) -> Self {
        Self {
            opcode,
            address: None,
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// Create a read register command with no address (e.g., RDSR, RBPR)
    pub fn read_reg(opcode: u8, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: None,
            write_data: &[],
            read_buf: buf,
        }
    }

    /// Create a write register command with no address (e.g., WRSR, WBPR)
    pub fn write_reg(opcode: u8, data: &'a [u8]) -> Self {
        Self {
            opcode,
            address: None,
            write_data: data,
            read_buf: &mut [],
        }
    }

    /// Create a read command with 3-byte address (e.g., READ)
    pub fn read(opcode: u8, addr: u32, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: Some(addr),
            write_data: &[],
            read_buf: buf,
        }
    }

    /// Create a write command with 3-byte address (e.g., PP)
    pub fn write(opcode: u8, addr: u32, data: &'a [u8]) -> Self {
        Self {
            opcode,
            address: Some(addr),
            write_data: data,
            read_buf: &mut [],
        }
    }

    /// Create an erase command with 3-byte address (e.g., SE, BE)
    pub fn erase(opcode: u8, addr: u32) -> Self {
        Self {
            opcode,
            address: Some(addr),
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// Returns true if this command has a read phase
    pub fn has_read(&self) -> bool {
        !self.read_buf.is_empty()
    }

    /// Returns true if this command has a write payload
    pub fn has_write(&self) -> bool {
        !self.write_data.is_empty()
    }

    /// Returns true if this command has an address phase
    pub fn has_address(&self) -> bool {
        self.address.is_some()
    }

    /// Length of the opcode + address header
    pub fn header_len(&self) -> usize {
        if self.has_address() {
            MAX_HEADER_LEN
        } else {
            1
        }
    }

    /// Encode opcode and address into `buf`, returning the header length
    pub fn encode_header(&self, buf: &mut [u8; MAX_HEADER_LEN]) -> usize {
        buf[0] = self.opcode;
        if let Some(addr) = self.address {
            buf[1..].copy_from_slice(&encode_address(addr));
        }
        self.header_len()
    }

    /// Total number of bytes clocked on the bus for this command
    pub fn total_bytes(&self) -> usize {
        self.header_len() + self.write_data.len() + self.read_buf.len()
    }
}
