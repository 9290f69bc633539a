//! `embedded-hal` 1.0 adapters
//!
//! Wrap an `SpiBus` in [`HalSpi`] and any `OutputPin` in [`HalPin`] to use
//! them with [`Transport`](super::Transport) and the device handle.

use super::{ControlLine, SpiTransport};
use crate::error::{Error, Result};
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

/// An `embedded_hal::spi::SpiBus` used as a byte transport
///
/// The bus must not manage chip-select itself; use a [`HalPin`] for that.
#[derive(Debug)]
pub struct HalSpi<B>(pub B);

impl<B: SpiBus<u8>> SpiTransport for HalSpi<B> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.0.write(data).map_err(|_| Error::SpiTransferFailed)?;
        // CS may be released right after this call
        self.0.flush().map_err(|_| Error::SpiTransferFailed)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        self.0.read(buf).map_err(|_| Error::SpiTransferFailed)?;
        self.0.flush().map_err(|_| Error::SpiTransferFailed)
    }
}

/// An `embedded_hal::digital::OutputPin` used as a control line
#[derive(Debug)]
pub struct HalPin<P>(pub P);

impl<P: OutputPin> ControlLine for HalPin<P> {
    fn set(&mut self) -> Result<()> {
        self.0.set_high().map_err(|_| Error::ControlLineFailed)
    }

    fn clear(&mut self) -> Result<()> {
        self.0.set_low().map_err(|_| Error::ControlLineFailed)
    }
}
