//! sst26v-linux-spi - Linux spidev transport
//!
//! This crate drives an SST26V through the Linux `/dev/spidevX.Y` character
//! device interface.
//!
//! # Overview
//!
//! [`LinuxSpi`] implements [`SpiTransport`](sst26v_core::SpiTransport). By
//! default the device is opened with `SPI_NO_CS`, so chip-select is left to a
//! GPIO line handed to the [`Transport`](sst26v_core::Transport). Boards that
//! route CS through the controller can use kernel CS instead together with
//! [`LinuxSpi::kernel_chip_select`].
//!
//! # Example
//!
//! ```no_run
//! use sst26v_core::{Sst26v, Transport};
//! use sst26v_linux_spi::{LinuxSpi, LinuxSpiConfig};
//!
//! let config = LinuxSpiConfig::new("/dev/spidev0.0")
//!     .with_speed(4_000_000)
//!     .with_kernel_cs();
//! let spi = LinuxSpi::open(&config)?;
//! let cs = spi.kernel_chip_select();
//!
//! let mut flash = Sst26v::new(Transport::new(spi).with_chip_select(cs));
//! flash.init()?;
//! println!("JEDEC ID: {}", flash.read_jedec_id()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev support enabled (`CONFIG_SPI_SPIDEV`)
//! - Read/write access to `/dev/spidevX.Y` device
//! - A controller driver that honours `SPI_NO_CS` when CS is on a GPIO

pub mod device;
pub mod error;

// Re-exports
pub use device::{mode, parse_options, KernelChipSelect, LinuxSpi, LinuxSpiConfig};
pub use error::{LinuxSpiError, Result};
