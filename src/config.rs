//! Board description file
//!
//! A board file says how the chip is wired:
//!
//! ```toml
//! backend = "linux"
//!
//! [device]
//! unlock_on_init = true
//!
//! [spi]
//! device = "/dev/spidev0.0"
//! speed_khz = 10000
//!
//! [gpio]
//! chip = "/dev/gpiochip0"
//! cs = 8
//! wp = 24
//! hold = 25
//! ```

use serde::Deserialize;
use sst26v_core::Config;
use std::path::Path;

/// Errors from loading a board file
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// File could not be read
    #[error("Failed to read board file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// File is not valid TOML or has unknown keys
    #[error("Invalid board file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level board description
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    /// Backend name (`dummy` or `linux`)
    pub backend: String,
    /// Device policy
    pub device: Config,
    /// spidev settings for the `linux` backend
    pub spi: SpiSection,
    /// GPIO lines for the `linux` backend
    pub gpio: Option<GpioSection>,
    /// Emulator settings for the `dummy` backend
    pub dummy: DummySection,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            backend: "dummy".to_string(),
            device: Config::default(),
            spi: SpiSection::default(),
            gpio: None,
            dummy: DummySection::default(),
        }
    }
}

/// `[spi]` table
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SpiSection {
    /// spidev path
    pub device: String,
    /// Clock in kHz
    pub speed_khz: u32,
    /// SPI mode, 0 or 3
    pub mode: u8,
    /// Let the controller drive chip-select instead of a GPIO
    pub kernel_cs: bool,
}

impl Default for SpiSection {
    fn default() -> Self {
        Self {
            device: "/dev/spidev0.0".to_string(),
            speed_khz: 2000,
            mode: 0,
            kernel_cs: false,
        }
    }
}

/// `[gpio]` table
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct GpioSection {
    /// gpiochip path
    pub chip: String,
    /// CE# offset
    pub cs: Option<u32>,
    /// Board enable offset
    pub enable: Option<u32>,
    /// WP# offset
    pub wp: Option<u32>,
    /// HOLD# offset
    pub hold: Option<u32>,
}

/// `[dummy]` table
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DummySection {
    /// Emulated part name
    pub part: String,
    /// Initial array contents
    pub image: Option<String>,
}

impl Default for DummySection {
    fn default() -> Self {
        Self {
            part: "SST26VF064B".to_string(),
            image: None,
        }
    }
}

impl BoardConfig {
    /// Parse a board description from TOML text
    pub fn from_toml(text: &str, path: &str) -> Result<Self, BoardError> {
        toml::from_str(text).map_err(|source| BoardError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Load a board description from a file
    pub fn load(path: &Path) -> Result<Self, BoardError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| BoardError::Io {
            path: display.clone(),
            source,
        })?;
        let board = Self::from_toml(&text, &display)?;
        log::debug!("Loaded board file {} (backend {})", display, board.backend);
        Ok(board)
    }
}
