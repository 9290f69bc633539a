//! Status and configuration register layouts

use bitflags::bitflags;

bitflags! {
    /// STATUS register (read with RDSR)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Status: u8 {
        /// Write operation in progress
        const BUSY = 1 << 0;
        /// Write-enable latch set
        const WEL  = 1 << 1;
        /// Erase suspended
        const WSE  = 1 << 2;
        /// Program suspended
        const WSP  = 1 << 3;
        /// Write-protection lock-down enabled
        const WPLD = 1 << 4;
        /// Security ID space locked
        const SEC  = 1 << 5;
        /// Mirror of BUSY
        const BUSY_MIRROR = 1 << 7;
    }
}

impl Status {
    /// True while a program or erase is running
    pub fn is_busy(self) -> bool {
        self.intersects(Self::BUSY | Self::BUSY_MIRROR)
    }

    /// True if the write-enable latch is set
    pub fn write_enabled(self) -> bool {
        self.contains(Self::WEL)
    }

    /// True if a program or erase is suspended
    pub fn is_suspended(self) -> bool {
        self.intersects(Self::WSE | Self::WSP)
    }
}

bitflags! {
    /// CONFIGURATION register (read with RDCR, written as the second WRSR byte)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ConfigReg: u8 {
        /// I/O configuration for SPI mode (disables WP#/HOLD# when set)
        const IOC  = 1 << 1;
        /// Block-protection volatility state (cleared once a bit is made non-volatile)
        const BPNV = 1 << 3;
        /// WP# pin enables write protection
        const WPEN = 1 << 7;
    }
}
