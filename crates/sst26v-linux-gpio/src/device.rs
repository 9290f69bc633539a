//! Linux GPIO control lines
//!
//! [`LinuxGpio::open`] requests the configured lines from one GPIO chip in a
//! single gpiocdev request, all as outputs starting high (inactive), and
//! hands back one [`GpioLine`] per role.

use crate::error::{LinuxGpioError, Result};

use gpiocdev::line::{Offset, Value};
use gpiocdev::request::{Config, Request};

use sst26v_core::error::{Error as CoreError, Result as CoreResult};
use sst26v_core::transport::ControlLine;

use std::sync::Arc;

/// Consumer label shown by `gpioinfo`
const CONSUMER: &str = "sst26v";

/// Configuration for the GPIO-driven control lines
#[derive(Debug, Clone, Default)]
pub struct LinuxGpioConfig {
    /// Device path (e.g., "/dev/gpiochip0")
    pub device: String,
    /// CE# line offset
    pub cs: Option<Offset>,
    /// Board enable line offset
    pub enable: Option<Offset>,
    /// WP# line offset
    pub write_protect: Option<Offset>,
    /// HOLD# line offset
    pub hold: Option<Offset>,
}

impl LinuxGpioConfig {
    /// Create a new configuration with the given device path and no lines
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Set the chip-select line
    pub fn with_cs(mut self, offset: Offset) -> Self {
        self.cs = Some(offset);
        self
    }

    /// Set the enable line
    pub fn with_enable(mut self, offset: Offset) -> Self {
        self.enable = Some(offset);
        self
    }

    /// Set the WP# line
    pub fn with_write_protect(mut self, offset: Offset) -> Self {
        self.write_protect = Some(offset);
        self
    }

    /// Set the HOLD# line
    pub fn with_hold(mut self, offset: Offset) -> Self {
        self.hold = Some(offset);
        self
    }

    fn roles(&self) -> impl Iterator<Item = (&'static str, Offset)> + '_ {
        [
            ("cs", self.cs),
            ("enable", self.enable),
            ("wp", self.write_protect),
            ("hold", self.hold),
        ]
        .into_iter()
        .filter_map(|(name, offset)| offset.map(|o| (name, o)))
    }

    /// Check that a device and at least one distinct line are given
    pub fn validate(&self) -> Result<()> {
        if self.device.is_empty() {
            return Err(LinuxGpioError::NoDevice);
        }
        let roles: Vec<_> = self.roles().collect();
        if roles.is_empty() {
            return Err(LinuxGpioError::NoLines);
        }
        for (i, &(first, offset)) in roles.iter().enumerate() {
            if let Some(&(second, _)) = roles[i + 1..].iter().find(|(_, o)| *o == offset) {
                return Err(LinuxGpioError::DuplicateLine {
                    offset,
                    first,
                    second,
                });
            }
        }
        Ok(())
    }
}

/// One requested output line
///
/// Lines from the same [`LinuxGpio::open`] call share one kernel request.
pub struct GpioLine {
    request: Arc<Request>,
    offset: Offset,
    name: &'static str,
}

impl GpioLine {
    /// GPIO offset on the chip
    pub fn offset(&self) -> Offset {
        self.offset
    }

    fn drive(&self, value: Value) -> CoreResult<()> {
        self.request
            .set_value(self.offset, value)
            .map(|_| ())
            .map_err(|source| {
                let e = LinuxGpioError::SetValueFailed {
                    offset: self.offset,
                    source,
                };
                log::error!("linux_gpio: {}: {}", self.name, e);
                CoreError::ControlLineFailed
            })
    }
}

impl ControlLine for GpioLine {
    fn set(&mut self) -> CoreResult<()> {
        self.drive(Value::Active)
    }

    fn clear(&mut self) -> CoreResult<()> {
        self.drive(Value::Inactive)
    }
}

/// The requested control lines; unconfigured roles are `None`
pub struct LinuxGpio {
    /// CE#
    pub cs: Option<GpioLine>,
    /// Board enable
    pub enable: Option<GpioLine>,
    /// WP#
    pub write_protect: Option<GpioLine>,
    /// HOLD#
    pub hold: Option<GpioLine>,
}

impl LinuxGpio {
    /// Request the configured lines
    pub fn open(config: &LinuxGpioConfig) -> Result<Self> {
        config.validate()?;

        log::debug!("linux_gpio: Opening device {}", config.device);

        // Every line idles high: CS deselected, WP#/HOLD# released
        let mut req_config = Config::default();
        for (_, offset) in config.roles() {
            req_config.with_line(offset).as_output(Value::Active);
        }

        let request = Request::from_config(req_config)
            .on_chip(&config.device)
            .with_consumer(CONSUMER)
            .request()
            .map_err(|source| LinuxGpioError::LineRequestFailed {
                path: config.device.clone(),
                source,
            })?;
        let request = Arc::new(request);

        log::info!(
            "linux_gpio: Opened {} ({})",
            config.device,
            config
                .roles()
                .map(|(name, offset)| format!("{}={}", name, offset))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let line = |name: &'static str, offset: Option<Offset>| {
            offset.map(|offset| GpioLine {
                request: Arc::clone(&request),
                offset,
                name,
            })
        };

        Ok(Self {
            cs: line("cs", config.cs),
            enable: line("enable", config.enable),
            write_protect: line("wp", config.write_protect),
            hold: line("hold", config.hold),
        })
    }
}

/// Parse line options from a list of key-value pairs
///
/// Recognised keys: `dev` or `gpiochip`, and the line offsets `cs`,
/// `enable`, `wp` and `hold`.
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<LinuxGpioConfig, String> {
    let mut config = LinuxGpioConfig::default();
    let mut gpiochip: Option<u32> = None;

    let offset = |name: &str, value: &str| -> std::result::Result<Offset, String> {
        value
            .parse()
            .map_err(|_| format!("Invalid {} value: {}", name, value))
    };

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "gpiochip" => {
                gpiochip = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid gpiochip value: {}", value))?,
                );
            }
            "cs" => config.cs = Some(offset(key, value)?),
            "enable" => config.enable = Some(offset(key, value)?),
            "wp" => config.write_protect = Some(offset(key, value)?),
            "hold" => config.hold = Some(offset(key, value)?),
            _ => {
                log::warn!("linux_gpio: Unknown option: {}={}", key, value);
            }
        }
    }

    if config.device.is_empty() {
        match gpiochip {
            Some(n) => config.device = format!("/dev/gpiochip{}", n),
            None => {
                return Err("Either 'dev' or 'gpiochip' must be specified.\n\
                     e.g. dev=/dev/gpiochip0,cs=8,wp=24,hold=25"
                    .to_string())
            }
        }
    } else if gpiochip.is_some() {
        return Err("Only one of 'dev' or 'gpiochip' can be specified".to_string());
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[
            ("gpiochip", "0"),
            ("cs", "8"),
            ("wp", "24"),
            ("hold", "25"),
        ])
        .unwrap();
        assert_eq!(config.device, "/dev/gpiochip0");
        assert_eq!(config.cs, Some(8));
        assert_eq!(config.write_protect, Some(24));
        assert_eq!(config.hold, Some(25));
        assert_eq!(config.enable, None);
    }

    #[test]
    fn test_parse_options_errors() {
        assert!(parse_options(&[("cs", "8")]).is_err());
        assert!(parse_options(&[("dev", "/dev/gpiochip0"), ("gpiochip", "0"), ("cs", "8")]).is_err());
        assert!(parse_options(&[("dev", "/dev/gpiochip0")]).is_err());
        assert!(parse_options(&[("dev", "/dev/gpiochip0"), ("cs", "x")]).is_err());
    }

    #[test]
    fn test_duplicate_lines() {
        let config = LinuxGpioConfig::new("/dev/gpiochip0")
            .with_cs(8)
            .with_hold(8);
        assert!(matches!(
            config.validate(),
            Err(LinuxGpioError::DuplicateLine {
                offset: 8,
                first: "cs",
                second: "hold"
            })
        ));

        let config = LinuxGpioConfig::new("/dev/gpiochip0")
            .with_cs(8)
            .with_enable(7)
            .with_write_protect(24)
            .with_hold(25);
        assert!(config.validate().is_ok());
    }
}
