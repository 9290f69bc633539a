//! Transport shim and transmission framing
//!
//! The SST26V is driven through two injected capabilities:
//!
//! - [`SpiTransport`]: the blocking byte-level `write` / `read` primitives of
//!   the SPI peripheral
//! - [`ControlLine`]: a GPIO-like output (chip-select, enable, WP#, HOLD#).
//!   Lines that are not wired use [`NoLine`], which makes every toggle a no-op.
//!
//! [`Transport`] combines a bus with its chip-select and enable lines and
//! frames every instruction between one `start_transmission` and one
//! `end_transmission`. It implements [`CommandBus`], the seam the protocol
//! layer is written against.

#[cfg(feature = "embedded-hal")]
mod hal;

#[cfg(feature = "embedded-hal")]
pub use hal::{HalPin, HalSpi};

use crate::error::Result;
use crate::spi::{opcodes, SpiCommand, MAX_HEADER_LEN};

/// Blocking byte-level SPI primitives
///
/// Implementations only move bytes. Chip-select is handled by the
/// [`Transport`] through a separate [`ControlLine`].
pub trait SpiTransport {
    /// Clock out `data`, discarding whatever the chip drives back
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Fill `buf` with bytes clocked in from the chip
    fn read(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Largest read phase that fits in one frame, after the 4-byte header
    fn max_read_len(&self) -> usize {
        usize::MAX
    }
}

/// A single output line
///
/// `set` drives the line high, `clear` drives it low. All SST26V control
/// pins are active low, so `clear` asserts and `set` releases.
pub trait ControlLine {
    /// Drive the line high
    fn set(&mut self) -> Result<()>;

    /// Drive the line low
    fn clear(&mut self) -> Result<()>;
}

/// An unwired line: every toggle succeeds and does nothing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoLine;

impl ControlLine for NoLine {
    fn set(&mut self) -> Result<()> {
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        Ok(())
    }
}

/// `None` behaves like [`NoLine`]
impl<L: ControlLine> ControlLine for Option<L> {
    fn set(&mut self) -> Result<()> {
        match self {
            Some(line) => line.set(),
            None => Ok(()),
        }
    }

    fn clear(&mut self) -> Result<()> {
        match self {
            Some(line) => line.clear(),
            None => Ok(()),
        }
    }
}

impl<L: ControlLine + ?Sized> ControlLine for &mut L {
    fn set(&mut self) -> Result<()> {
        (**self).set()
    }

    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }
}

impl<T: SpiTransport + ?Sized> SpiTransport for &mut T {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read(buf)
    }

    fn max_read_len(&self) -> usize {
        (**self).max_read_len()
    }
}

// Boxed impls so backends can be picked at runtime
#[cfg(feature = "alloc")]
impl SpiTransport for alloc::boxed::Box<dyn SpiTransport + Send> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read(buf)
    }

    fn max_read_len(&self) -> usize {
        (**self).max_read_len()
    }
}

#[cfg(feature = "alloc")]
impl ControlLine for alloc::boxed::Box<dyn ControlLine + Send> {
    fn set(&mut self) -> Result<()> {
        (**self).set()
    }

    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }
}

/// Something that can execute one framed SST26V instruction
///
/// This is the seam the protocol functions are generic over. [`Transport`]
/// is the standard implementation; test doubles and emulators can implement
/// it directly.
pub trait CommandBus {
    /// Execute a single instruction inside one chip-select frame
    ///
    /// The header (opcode + address) is written first, then `write_data`,
    /// then `read_buf` is filled.
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()>;

    /// Largest READ payload one instruction may carry
    fn max_read_len(&self) -> usize {
        usize::MAX
    }
}

impl<B: CommandBus + ?Sized> CommandBus for &mut B {
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        (**self).execute(cmd)
    }

    fn max_read_len(&self) -> usize {
        (**self).max_read_len()
    }
}

/// SPI transport handle: a byte bus plus its chip-select and enable lines
#[derive(Debug)]
pub struct Transport<S, CS = NoLine, EN = NoLine> {
    spi: S,
    cs: CS,
    enable: EN,
}

impl<S: SpiTransport> Transport<S> {
    /// Create a transport with chip-select and enable unwired
    pub fn new(spi: S) -> Self {
        Self {
            spi,
            cs: NoLine,
            enable: NoLine,
        }
    }
}

impl<S, CS, EN> Transport<S, CS, EN> {
    /// Attach a chip-select line
    pub fn with_chip_select<C: ControlLine>(self, cs: C) -> Transport<S, C, EN> {
        Transport {
            spi: self.spi,
            cs,
            enable: self.enable,
        }
    }

    /// Attach an enable line (e.g. a bus buffer or level shifter OE#)
    pub fn with_enable<E: ControlLine>(self, enable: E) -> Transport<S, CS, E> {
        Transport {
            spi: self.spi,
            cs: self.cs,
            enable,
        }
    }

    /// Get a reference to the underlying bus
    pub fn spi(&self) -> &S {
        &self.spi
    }

    /// Get a mutable reference to the underlying bus
    pub fn spi_mut(&mut self) -> &mut S {
        &mut self.spi
    }

    /// Give back the bus and both lines
    pub fn release(self) -> (S, CS, EN) {
        (self.spi, self.cs, self.enable)
    }
}

impl<S, CS, EN> Transport<S, CS, EN>
where
    S: SpiTransport,
    CS: ControlLine,
    EN: ControlLine,
{
    /// Open a transmission: assert enable, then chip-select
    pub fn start_transmission(&mut self) -> Result<()> {
        self.enable.clear()?;
        self.cs.clear()
    }

    /// Close a transmission: release chip-select, then enable
    ///
    /// Enable is released even if chip-select could not be driven.
    pub fn end_transmission(&mut self) -> Result<()> {
        let cs = self.cs.set();
        let enable = self.enable.set();
        cs.and(enable)
    }

    /// Write a buffer inside an open transmission
    pub fn write_buffer(&mut self, data: &[u8]) -> Result<()> {
        self.spi.write(data)
    }

    /// Read a buffer inside an open transmission
    pub fn read_buffer(&mut self, buf: &mut [u8]) -> Result<()> {
        self.spi.read(buf)
    }

    fn exchange(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        let mut header = [0u8; MAX_HEADER_LEN];
        let len = cmd.encode_header(&mut header);
        self.write_buffer(&header[..len])?;
        if cmd.has_write() {
            self.write_buffer(cmd.write_data)?;
        }
        if cmd.has_read() {
            self.read_buffer(cmd.read_buf)?;
        }
        Ok(())
    }
}

impl<S, CS, EN> CommandBus for Transport<S, CS, EN>
where
    S: SpiTransport,
    CS: ControlLine,
    EN: ControlLine,
{
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        log::trace!(
            "sst26v: {} (0x{:02X}) {} bytes",
            opcodes::name(cmd.opcode),
            cmd.opcode,
            cmd.total_bytes()
        );

        let result = self
            .start_transmission()
            .and_then(|()| self.exchange(cmd));
        // Always close the frame, but report the first failure
        let end = self.end_transmission();
        result.and(end)
    }

    fn max_read_len(&self) -> usize {
        self.spi.max_read_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mock::{Event, Line, MockLine, MockSpi};
    use core::cell::RefCell;
    use std::vec;
    use std::vec::Vec;

    #[test]
    fn test_framing_order() {
        let log = RefCell::new(Vec::new());
        let mut transport = Transport::new(MockSpi::new(&log))
            .with_chip_select(MockLine::new(Line::Cs, &log))
            .with_enable(MockLine::new(Line::Enable, &log));

        let mut cmd = SpiCommand::simple(opcodes::WREN);
        transport.execute(&mut cmd).unwrap();

        assert_eq!(
            log.into_inner(),
            vec![
                Event::Clear(Line::Enable),
                Event::Clear(Line::Cs),
                Event::Write(vec![opcodes::WREN]),
                Event::Set(Line::Cs),
                Event::Set(Line::Enable),
            ]
        );
    }

    #[test]
    fn test_unwired_lines_are_noops() {
        let log = RefCell::new(Vec::new());
        let mut transport = Transport::new(MockSpi::new(&log));

        let mut cmd = SpiCommand::erase(opcodes::SE, 0x00_1000);
        transport.execute(&mut cmd).unwrap();

        assert_eq!(
            log.into_inner(),
            vec![Event::Write(vec![opcodes::SE, 0x00, 0x10, 0x00])]
        );
    }

    #[test]
    fn test_optional_line() {
        let log = RefCell::new(Vec::new());
        let mut transport =
            Transport::new(MockSpi::new(&log)).with_chip_select(Some(MockLine::new(Line::Cs, &log)));
        transport.execute(&mut SpiCommand::simple(opcodes::WRDI)).unwrap();
        assert_eq!(log.borrow().first(), Some(&Event::Clear(Line::Cs)));

        let log = RefCell::new(Vec::new());
        let mut transport =
            Transport::new(MockSpi::new(&log)).with_chip_select(None::<MockLine<'_>>);
        transport.execute(&mut SpiCommand::simple(opcodes::WRDI)).unwrap();
        assert_eq!(log.into_inner(), vec![Event::Write(vec![opcodes::WRDI])]);
    }

    #[test]
    fn test_frame_closed_on_transfer_error() {
        let log = RefCell::new(Vec::new());
        let mut transport = Transport::new(MockSpi::failing(&log))
            .with_chip_select(MockLine::new(Line::Cs, &log));

        let mut buf = [0u8; 1];
        let mut cmd = SpiCommand::read_reg(opcodes::RDSR, &mut buf);
        assert_eq!(transport.execute(&mut cmd), Err(Error::SpiTransferFailed));

        let events = log.into_inner();
        assert_eq!(events.first(), Some(&Event::Clear(Line::Cs)));
        assert_eq!(events.last(), Some(&Event::Set(Line::Cs)));
    }

    #[test]
    fn test_line_failure_reported() {
        let log = RefCell::new(Vec::new());
        let mut transport = Transport::new(MockSpi::new(&log))
            .with_chip_select(MockLine::failing(Line::Cs, &log));

        let mut cmd = SpiCommand::simple(opcodes::WREN);
        assert_eq!(transport.execute(&mut cmd), Err(Error::ControlLineFailed));
        // No data byte may go out without chip-select asserted
        assert!(!log
            .borrow()
            .iter()
            .any(|e| matches!(e, Event::Write(_) | Event::Read(_))));
    }
}
