//! sst26v-core - Command layer for SST26V serial NOR flash
//!
//! This crate drives Microchip SST26V SPI NOR flash chips through injected
//! SPI and GPIO capabilities. It is `no_std` compatible and keeps no state
//! besides the peripherals it is given.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Boxed transport and line impls for runtime backend selection
//! - `serde` - Serialize/deserialize [`Config`], [`JedecId`] and
//!   [`BlockProtection`]
//! - `embedded-hal` - Adapters from `embedded-hal` 1.0 `SpiBus`/`OutputPin`
//!
//! # Example
//!
//! ```ignore
//! use sst26v_core::{Sst26v, Transport};
//!
//! let transport = Transport::new(spi).with_chip_select(cs);
//! let mut flash = Sst26v::new(transport).with_write_protect(wp).with_hold(hold);
//! flash.init()?;
//! let part = flash.probe()?;
//! flash.erase_range(0, 0x1000)?;
//! flash.write(0, b"hello")?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod chip;
pub mod device;
pub mod error;
#[cfg(test)]
mod mock;
pub mod protection;
pub mod protocol;
pub mod spi;
pub mod status;
pub mod transport;

pub use chip::{JedecId, Part};
pub use device::{Config, Sst26v};
pub use error::{Error, Result};
pub use protection::BlockProtection;
pub use status::{ConfigReg, Status};
pub use transport::{CommandBus, ControlLine, NoLine, SpiTransport, Transport};
