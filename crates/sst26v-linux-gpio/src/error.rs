//! Error types for Linux GPIO operations

use thiserror::Error;

/// Linux GPIO specific errors
#[derive(Debug, Error)]
pub enum LinuxGpioError {
    /// Failed to request GPIO lines
    #[error("Failed to request GPIO lines on '{path}': {source}")]
    LineRequestFailed {
        path: String,
        #[source]
        source: gpiocdev::Error,
    },

    /// Failed to set GPIO line value
    #[error("Failed to drive GPIO line {offset}: {source}")]
    SetValueFailed {
        offset: u32,
        #[source]
        source: gpiocdev::Error,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// GPIO chip or device not specified
    #[error("No GPIO chip specified. Use dev=/dev/gpiochipN or gpiochip=N")]
    NoDevice,

    /// No line requested at all
    #[error("No GPIO line specified. Use cs=, enable=, wp= or hold=")]
    NoLines,

    /// The same offset was assigned to two roles
    #[error("GPIO line {offset} assigned to both {first} and {second}")]
    DuplicateLine {
        offset: u32,
        first: &'static str,
        second: &'static str,
    },
}

/// Result type for Linux GPIO operations
pub type Result<T> = std::result::Result<T, LinuxGpioError>;
