//! sst26v-linux-gpio - Linux GPIO control lines
//!
//! This crate drives the SST26V control pins (CE#, WP#, HOLD# and an
//! optional board enable) through the Linux GPIO character device interface
//! using the gpiocdev crate.
//!
//! Each requested line implements [`ControlLine`](sst26v_core::ControlLine).
//! Roles that are not configured come back as `None`, which the transport
//! treats as an unwired line.
//!
//! # Example
//!
//! ```no_run
//! use sst26v_core::{Sst26v, Transport};
//! use sst26v_linux_gpio::{LinuxGpio, LinuxGpioConfig};
//! use sst26v_linux_spi::LinuxSpi;
//!
//! let gpio = LinuxGpio::open(
//!     &LinuxGpioConfig::new("/dev/gpiochip0")
//!         .with_cs(8)
//!         .with_write_protect(24)
//!         .with_hold(25),
//! )?;
//! let spi = LinuxSpi::open_device("/dev/spidev0.0")?;
//!
//! let transport = Transport::new(spi).with_chip_select(gpio.cs);
//! let mut flash = Sst26v::new(transport)
//!     .with_write_protect(gpio.write_protect)
//!     .with_hold(gpio.hold);
//! flash.init()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # GPIO Pin Wiring
//!
//! | Flash Pin | Role     | Description |
//! |-----------|----------|-------------|
//! | CE#       | `cs`     | Chip select, driven low for each instruction |
//! | WP#       | `wp`     | Write protect, held high after init |
//! | HOLD#     | `hold`   | Hold, held high after init |
//! | -         | `enable` | Optional buffer/level-shifter enable, low while selected |
//!
//! # System Requirements
//!
//! - Linux kernel 4.8+ with GPIO character device support (kernel 5.5+ for v2 API)
//! - Access to `/dev/gpiochipN` devices (may require root or udev rules)

pub mod device;
pub mod error;

// Re-exports
pub use device::{parse_options, GpioLine, LinuxGpio, LinuxGpioConfig};
pub use error::{LinuxGpioError, Result};
