//! SPI types and command structures
//!
//! This module provides the SST26V opcode table, the 3-byte address
//! encoding and the `SpiCommand` describing one framed instruction.

mod address;
mod command;
pub mod opcodes;

pub use address::{encode_address, ADDRESS_BYTES, ADDRESS_SPACE};
pub use command::{SpiCommand, MAX_HEADER_LEN};
