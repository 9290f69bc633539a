//! Error types for sst26v-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Bus errors
    /// SPI transfer failed (write or read on the transport)
    SpiTransferFailed,
    /// A control line (CS, enable, WP#, HOLD#) could not be driven
    ControlLineFailed,

    // Chip errors
    /// JEDEC ID does not belong to a known SST26V part
    ChipNotSupported,
    /// JEDEC ID does not match the expected value
    JedecIdMismatch,

    // Operation errors
    /// Chip stayed busy past the polling bound
    Timeout,
    /// Read-back data did not match what was written
    VerifyError,
    /// The chip refused a write because its protection is active
    WriteProtected,

    // Address/size errors
    /// Address is beyond the chip capacity or the 24-bit address space
    AddressOutOfBounds,
    /// Operation requires an aligned address or length
    InvalidAlignment,
    /// Payload length is not valid for the command
    InvalidLength,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpiTransferFailed => write!(f, "SPI transfer failed"),
            Self::ControlLineFailed => write!(f, "failed to drive control line"),
            Self::ChipNotSupported => write!(f, "flash chip not supported"),
            Self::JedecIdMismatch => write!(f, "JEDEC ID mismatch"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::VerifyError => write!(f, "verify failed: data mismatch"),
            Self::WriteProtected => write!(f, "flash chip is write protected"),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::InvalidAlignment => write!(f, "invalid alignment"),
            Self::InvalidLength => write!(f, "invalid payload length"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
