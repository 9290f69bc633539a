//! Backend registration and dispatch
//!
//! A backend turns a board description (optionally overridden by a
//! `-p name:key=value,...` string) into a ready-to-use [`Flash`] handle.

use crate::config::BoardConfig;
use sst26v_core::{ControlLine, NoLine, SpiTransport, Sst26v, Transport};

/// Boxed line, so every backend yields the same handle type
pub type Line = Box<dyn ControlLine + Send>;

/// Flash handle used by every command
pub type Flash = Sst26v<Box<dyn SpiTransport + Send>, Line, Line, Line, Line>;

type BoxError = Box<dyn std::error::Error>;

/// Information about a backend
pub struct BackendInfo {
    /// Name used with `-p` and in the board file
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
}

/// Get information about all available backends (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(feature = "dummy")]
    backends.push(BackendInfo {
        name: "dummy",
        description: "In-memory SST26V emulator (part=<name>,image=<file>)",
    });

    #[cfg(feature = "linux")]
    backends.push(BackendInfo {
        name: "linux",
        description: "spidev + gpiochip (dev=,spispeed=,mode=,kernel_cs=,gpiodev=|gpiochip=,cs=,enable=,wp=,hold=)",
    });

    backends
}

/// Comma-separated backend names for help text
pub fn backend_names() -> String {
    available_backends()
        .iter()
        .map(|b| b.name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Split `name:key=value,key=value` into the name and its options
pub fn parse_programmer(selector: &str) -> Result<(&str, Vec<(&str, &str)>), String> {
    let (name, rest) = match selector.split_once(':') {
        Some((name, rest)) => (name, rest),
        None => (selector, ""),
    };

    let mut options = Vec::new();
    for item in rest.split(',').filter(|s| !s.is_empty()) {
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| format!("Invalid option '{}', expected key=value", item))?;
        options.push((key.trim(), value.trim()));
    }
    Ok((name, options))
}

fn line<L: ControlLine + Send + 'static>(line: L) -> Line {
    Box::new(line)
}

/// Open the backend selected by `programmer` or, failing that, the board file
pub fn open(programmer: Option<&str>, board: &BoardConfig) -> Result<Flash, BoxError> {
    let selected = programmer.unwrap_or(board.backend.as_str());
    let (name, options) = parse_programmer(selected)?;

    let flash: Flash = match name {
        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&options, board)?,
        #[cfg(feature = "linux")]
        "linux" => open_linux(&options, board)?,
        other => {
            return Err(format!(
                "Unknown backend '{}' [available: {}]",
                other,
                backend_names()
            )
            .into())
        }
    };

    Ok(flash.with_config(board.device))
}

#[cfg(feature = "dummy")]
fn open_dummy(options: &[(&str, &str)], board: &BoardConfig) -> Result<Flash, BoxError> {
    use sst26v_dummy::{DummyConfig, DummyFlash, Pin};

    let mut part = board.dummy.part.as_str();
    let mut image = board.dummy.image.clone();
    for (key, value) in options {
        match *key {
            "part" => part = value,
            "image" => image = Some(value.to_string()),
            _ => log::warn!("dummy: Unknown option: {}={}", key, value),
        }
    }

    let config =
        DummyConfig::for_part(part).ok_or_else(|| format!("Unknown SST26V part '{}'", part))?;
    let emulator = match image {
        Some(path) => {
            let data = std::fs::read(&path)?;
            log::info!("dummy: Loaded {} bytes from {}", data.len(), path);
            DummyFlash::with_data(config, &data)
        }
        None => DummyFlash::new(config),
    };
    log::info!("dummy: Emulating {}", emulator.part().name);

    let spi: Box<dyn SpiTransport + Send> = Box::new(emulator.spi());
    let transport = Transport::new(spi)
        .with_chip_select(line(emulator.line(Pin::ChipSelect)))
        .with_enable(line(emulator.line(Pin::Enable)));
    Ok(Sst26v::new(transport)
        .with_write_protect(line(emulator.line(Pin::WriteProtect)))
        .with_hold(line(emulator.line(Pin::Hold))))
}

/// Route `-p linux:...` options to the SPI or GPIO side
#[cfg(feature = "linux")]
fn split_linux_options<'a>(
    options: &[(&'a str, &'a str)],
) -> (Vec<(&'a str, &'a str)>, Vec<(&'a str, &'a str)>) {
    let mut spi = Vec::new();
    let mut gpio = Vec::new();
    for &(key, value) in options {
        match key {
            "gpiodev" => gpio.push(("dev", value)),
            "gpiochip" | "cs" | "enable" | "wp" | "hold" => gpio.push((key, value)),
            _ => spi.push((key, value)),
        }
    }
    (spi, gpio)
}

/// Who drives CE# on the `linux` backend
#[cfg(feature = "linux")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChipSelect {
    Gpio,
    Kernel,
}

/// Exactly one of a CS GPIO and kernel CS must be configured
#[cfg(feature = "linux")]
fn chip_select_source(gpio_cs: bool, kernel_cs: bool) -> Result<ChipSelect, String> {
    match (gpio_cs, kernel_cs) {
        (true, false) => Ok(ChipSelect::Gpio),
        (false, true) => Ok(ChipSelect::Kernel),
        (true, true) => Err("kernel_cs conflicts with a cs GPIO, configure only one".to_string()),
        (false, false) => Err("No chip-select: configure [gpio] cs or kernel_cs".to_string()),
    }
}

#[cfg(feature = "linux")]
fn open_linux(options: &[(&str, &str)], board: &BoardConfig) -> Result<Flash, BoxError> {
    use sst26v_linux_gpio::{LinuxGpio, LinuxGpioConfig};
    use sst26v_linux_spi::{LinuxSpi, LinuxSpiConfig};

    let (spi_options, gpio_options) = split_linux_options(options);

    let spi_config = if spi_options.is_empty() {
        let mut config = LinuxSpiConfig::new(board.spi.device.clone())
            .with_speed(board.spi.speed_khz * 1000)
            .with_mode(board.spi.mode);
        if board.spi.kernel_cs {
            config = config.with_kernel_cs();
        }
        config
    } else {
        sst26v_linux_spi::parse_options(&spi_options)?
    };

    let gpio_config = if !gpio_options.is_empty() {
        Some(sst26v_linux_gpio::parse_options(&gpio_options)?)
    } else {
        board.gpio.as_ref().map(|gpio| LinuxGpioConfig {
            device: gpio.chip.clone(),
            cs: gpio.cs,
            enable: gpio.enable,
            write_protect: gpio.wp,
            hold: gpio.hold,
        })
    };

    let gpio_cs = gpio_config.as_ref().is_some_and(|gpio| gpio.cs.is_some());
    let cs_source = chip_select_source(gpio_cs, !spi_config.no_cs)?;

    let spi = LinuxSpi::open(&spi_config)?;
    let (cs, enable, wp, hold): (Line, Line, Line, Line) = match gpio_config {
        Some(config) => {
            let gpio = LinuxGpio::open(&config)?;
            let cs = match cs_source {
                ChipSelect::Gpio => line(gpio.cs),
                ChipSelect::Kernel => line(spi.kernel_chip_select()),
            };
            (cs, line(gpio.enable), line(gpio.write_protect), line(gpio.hold))
        }
        None => (
            line(spi.kernel_chip_select()),
            line(NoLine),
            line(NoLine),
            line(NoLine),
        ),
    };

    let spi: Box<dyn SpiTransport + Send> = Box::new(spi);
    let transport = Transport::new(spi).with_chip_select(cs).with_enable(enable);
    Ok(Sst26v::new(transport).with_write_protect(wp).with_hold(hold))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_programmer() {
        let (name, options) = parse_programmer("dummy").unwrap();
        assert_eq!(name, "dummy");
        assert!(options.is_empty());

        let (name, options) =
            parse_programmer("linux:dev=/dev/spidev0.0,cs=8,spispeed=4000").unwrap();
        assert_eq!(name, "linux");
        assert_eq!(
            options,
            vec![("dev", "/dev/spidev0.0"), ("cs", "8"), ("spispeed", "4000")]
        );

        assert!(parse_programmer("linux:dev").is_err());
    }

    #[cfg(feature = "linux")]
    #[test]
    fn test_split_linux_options() {
        let (_, options) =
            parse_programmer("linux:dev=/dev/spidev0.0,gpiodev=/dev/gpiochip1,cs=8,hold=25,mode=3")
                .unwrap();
        let (spi, gpio) = split_linux_options(&options);
        assert_eq!(spi, vec![("dev", "/dev/spidev0.0"), ("mode", "3")]);
        assert_eq!(
            gpio,
            vec![("dev", "/dev/gpiochip1"), ("cs", "8"), ("hold", "25")]
        );
    }

    #[cfg(feature = "linux")]
    #[test]
    fn test_chip_select_source() {
        assert_eq!(chip_select_source(true, false), Ok(ChipSelect::Gpio));
        assert_eq!(chip_select_source(false, true), Ok(ChipSelect::Kernel));
        assert!(chip_select_source(true, true).is_err());
        assert!(chip_select_source(false, false).is_err());
    }

    #[cfg(feature = "linux")]
    #[test]
    fn test_kernel_cs_with_cs_gpio_rejected() {
        let board = BoardConfig::from_toml(
            r#"
            backend = "linux"

            [spi]
            device = "/dev/null"
            kernel_cs = true

            [gpio]
            chip = "/dev/null"
            cs = 8
            "#,
            "board.toml",
        )
        .unwrap();
        let err = open(None, &board).err().unwrap();
        assert!(err.to_string().contains("kernel_cs"), "{err}");
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy() {
        let board = BoardConfig::default();
        let mut flash = open(Some("dummy:part=SST26VF016B"), &board).unwrap();
        flash.init().unwrap();
        assert_eq!(flash.probe().unwrap().name, "SST26VF016B");

        assert!(open(Some("dummy:part=W25Q128"), &board).is_err());
        assert!(open(Some("nonexistent"), &board).is_err());
    }
}
