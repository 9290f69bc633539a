//! Linux SPI device implementation
//!
//! [`LinuxSpi`] implements [`SpiTransport`] on top of `/dev/spidevX.Y`.
//!
//! Two chip-select arrangements are supported:
//!
//! - `SPI_NO_CS` (default): the kernel leaves CS alone and the transport
//!   drives it through a separate [`ControlLine`], typically a GPIO. Every
//!   `write`/`read` is issued immediately.
//! - Kernel CS: the controller asserts CS for the duration of one
//!   `SPI_IOC_MESSAGE`. Writes are queued until a read or until the
//!   [`KernelChipSelect`] handle is released, so that one instruction goes
//!   out as one message.

use crate::error::{LinuxSpiError, Result};

use sst26v_core::error::{Error as CoreError, Result as CoreResult};
use sst26v_core::transport::{ControlLine, SpiTransport};

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::sync::{Arc, Mutex, MutexGuard};

/// Path to kernel spidev buffer size parameter
const BUF_SIZE_SYSFS: &str = "/sys/module/spidev/parameters/bufsiz";

/// Opcode plus 24-bit address, with one byte of slack
const HEADER_OVERHEAD: usize = 5;

/// Default SPI clock speed in Hz (2 MHz)
const DEFAULT_SPEED_HZ: u32 = 2_000_000;

/// SPI mode constants
pub mod mode {
    /// SPI mode 0: CPOL=0, CPHA=0
    pub const MODE_0: u8 = 0;
    /// SPI mode 3: CPOL=1, CPHA=1
    pub const MODE_3: u8 = 3;
    /// Controller does not drive chip-select
    pub const SPI_NO_CS: u8 = 0x40;
}

/// Linux spidev ioctl constants
mod ioctl {
    use nix::ioctl_write_ptr;

    // SPI ioctl magic number
    const SPI_IOC_MAGIC: u8 = b'k';

    // SPI ioctl type numbers
    const SPI_IOC_TYPE_MODE: u8 = 1;
    const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
    const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;

    ioctl_write_ptr!(spi_ioc_wr_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
    ioctl_write_ptr!(
        spi_ioc_wr_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_write_ptr!(
        spi_ioc_wr_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );

    /// Size of struct spi_ioc_transfer
    pub const SPI_IOC_TRANSFER_SIZE: usize = 32;

    /// Calculate ioctl number for SPI_IOC_MESSAGE(n)
    ///
    /// `_IOW(SPI_IOC_MAGIC, 0, char[n * sizeof(struct spi_ioc_transfer)])`
    pub fn spi_ioc_message(n: u8) -> libc::c_ulong {
        let size = (n as usize) * SPI_IOC_TRANSFER_SIZE;
        ((1u32 << 30) | ((size as u32) << 16) | ((SPI_IOC_MAGIC as u32) << 8)) as libc::c_ulong
    }
}

/// SPI transfer structure for ioctl
/// This must match the kernel's struct spi_ioc_transfer layout
#[repr(C)]
#[derive(Debug, Default, Clone)]
struct SpiIocTransfer {
    tx_buf: u64,          // __u64 tx_buf
    rx_buf: u64,          // __u64 rx_buf
    len: u32,             // __u32 len
    speed_hz: u32,        // __u32 speed_hz
    delay_usecs: u16,     // __u16 delay_usecs
    bits_per_word: u8,    // __u8 bits_per_word
    cs_change: u8,        // __u8 cs_change
    tx_nbits: u8,         // __u8 tx_nbits
    rx_nbits: u8,         // __u8 rx_nbits
    word_delay_usecs: u8, // __u8 word_delay_usecs
    _pad: u8,             // padding
}

impl SpiIocTransfer {
    fn tx(data: &[u8], speed_hz: u32) -> Self {
        Self {
            tx_buf: data.as_ptr() as u64,
            len: data.len() as u32,
            speed_hz,
            bits_per_word: 8,
            ..Default::default()
        }
    }

    fn rx(buf: &mut [u8], speed_hz: u32) -> Self {
        Self {
            rx_buf: buf.as_mut_ptr() as u64,
            len: buf.len() as u32,
            speed_hz,
            bits_per_word: 8,
            ..Default::default()
        }
    }
}

/// Configuration for opening a Linux SPI device
#[derive(Debug, Clone)]
pub struct LinuxSpiConfig {
    /// Device path (e.g., "/dev/spidev0.0")
    pub device: String,
    /// SPI clock speed in Hz (default: 2 MHz)
    pub speed_hz: u32,
    /// SPI mode (0 or 3, default: 0)
    pub mode: u8,
    /// Leave chip-select to an external line (default: true)
    pub no_cs: bool,
}

impl Default for LinuxSpiConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            speed_hz: DEFAULT_SPEED_HZ,
            mode: mode::MODE_0,
            no_cs: true,
        }
    }
}

impl LinuxSpiConfig {
    /// Create a new configuration with the given device path
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Set the SPI clock speed in Hz
    pub fn with_speed(mut self, speed_hz: u32) -> Self {
        self.speed_hz = speed_hz;
        self
    }

    /// Set the SPI mode (0 or 3)
    pub fn with_mode(mut self, mode: u8) -> Self {
        self.mode = mode;
        self
    }

    /// Let the kernel drive chip-select
    pub fn with_kernel_cs(mut self) -> Self {
        self.no_cs = false;
        self
    }
}

struct Spidev {
    file: File,
    max_kernel_buf_size: usize,
    speed_hz: u32,
    kernel_cs: bool,
    pending: Vec<u8>,
}

impl Spidev {
    fn new(file: File, max_kernel_buf_size: usize, speed_hz: u32, kernel_cs: bool) -> Self {
        Self {
            file,
            max_kernel_buf_size,
            speed_hz,
            kernel_cs,
            pending: Vec::new(),
        }
    }

    fn message(&mut self, transfers: &[SpiIocTransfer]) -> Result<()> {
        let len: usize = transfers.iter().map(|t| t.len as usize).sum();
        if len > self.max_kernel_buf_size {
            return Err(LinuxSpiError::TransferTooLarge {
                len,
                max: self.max_kernel_buf_size,
            });
        }
        let n = u8::try_from(transfers.len())
            .map_err(|_| LinuxSpiError::InvalidParameter("too many transfers".into()))?;

        let ioctl_num = ioctl::spi_ioc_message(n);
        let ret = unsafe { libc::ioctl(self.file.as_raw_fd(), ioctl_num, transfers.as_ptr()) };
        if ret < 0 {
            return Err(LinuxSpiError::TransferFailed(
                std::io::Error::last_os_error(),
            ));
        }
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.kernel_cs {
            self.pending.extend_from_slice(data);
            return Ok(());
        }
        for chunk in data.chunks(self.max_kernel_buf_size) {
            self.message(&[SpiIocTransfer::tx(chunk, self.speed_hz)])?;
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.kernel_cs {
            // Header and read phase must share one message to stay in one CS frame
            let pending = std::mem::take(&mut self.pending);
            let speed = self.speed_hz;
            return if pending.is_empty() {
                self.message(&[SpiIocTransfer::rx(buf, speed)])
            } else {
                self.message(&[SpiIocTransfer::tx(&pending, speed), SpiIocTransfer::rx(buf, speed)])
            };
        }
        let max = self.max_kernel_buf_size;
        for chunk in buf.chunks_mut(max) {
            self.message(&[SpiIocTransfer::rx(chunk, self.speed_hz)])?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Ok(());
        }
        self.message(&[SpiIocTransfer::tx(&pending, self.speed_hz)])
    }
}

/// Linux SPI transport using the spidev interface
pub struct LinuxSpi {
    dev: Arc<Mutex<Spidev>>,
    max_read_len: usize,
}

impl LinuxSpi {
    /// Open a Linux SPI device with the given configuration
    pub fn open(config: &LinuxSpiConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxSpiError::NoDevice);
        }
        if config.mode > 3 {
            return Err(LinuxSpiError::InvalidParameter(format!(
                "SPI mode {} (must be 0-3)",
                config.mode
            )));
        }

        log::debug!("linux_spi: Opening device {}", config.device);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|e| LinuxSpiError::OpenFailed {
                path: config.device.clone(),
                source: e,
            })?;

        let fd = file.as_raw_fd();

        let mode = if config.no_cs {
            config.mode | mode::SPI_NO_CS
        } else {
            config.mode
        };
        unsafe {
            ioctl::spi_ioc_wr_mode(fd, &mode).map_err(|e| LinuxSpiError::SetModeFailed {
                mode,
                source: std::io::Error::from_raw_os_error(e as i32),
            })?;
        }

        // Set bits per word (always 8)
        let bits: u8 = 8;
        unsafe {
            ioctl::spi_ioc_wr_bits_per_word(fd, &bits).map_err(|e| {
                LinuxSpiError::SetBitsPerWordFailed {
                    bits,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        let speed = config.speed_hz;
        unsafe {
            ioctl::spi_ioc_wr_max_speed_hz(fd, &speed).map_err(|e| {
                LinuxSpiError::SetSpeedFailed {
                    speed,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        log::info!(
            "linux_spi: Opened {} (mode={}, speed={} kHz, cs={})",
            config.device,
            config.mode,
            speed / 1000,
            if config.no_cs { "external" } else { "kernel" }
        );

        let max_kernel_buf_size = get_max_kernel_buf_size();
        log::debug!(
            "linux_spi: Max kernel buffer size: {} bytes",
            max_kernel_buf_size
        );

        Ok(Self::from_spidev(Spidev::new(
            file,
            max_kernel_buf_size,
            speed,
            !config.no_cs,
        )))
    }

    fn from_spidev(dev: Spidev) -> Self {
        Self {
            max_read_len: dev.max_kernel_buf_size.saturating_sub(HEADER_OVERHEAD),
            dev: Arc::new(Mutex::new(dev)),
        }
    }

    /// Open a device with default settings
    pub fn open_device(device: &str) -> Result<Self> {
        Self::open(&LinuxSpiConfig::new(device))
    }

    /// Chip-select handle for kernel CS mode
    ///
    /// Releasing it (`set`) sends any queued write-only instruction. Use it
    /// as the transport's chip-select line when the controller drives CS.
    pub fn kernel_chip_select(&self) -> KernelChipSelect {
        KernelChipSelect {
            dev: Arc::clone(&self.dev),
        }
    }

    /// Get current speed setting
    pub fn speed_hz(&self) -> CoreResult<u32> {
        Ok(lock(&self.dev)?.speed_hz)
    }

    /// Set a new SPI clock speed
    pub fn set_speed(&mut self, speed_hz: u32) -> Result<()> {
        let mut dev = self
            .dev
            .lock()
            .map_err(|_| LinuxSpiError::InvalidParameter("device lock poisoned".into()))?;
        let fd = dev.file.as_raw_fd();
        unsafe {
            ioctl::spi_ioc_wr_max_speed_hz(fd, &speed_hz).map_err(|e| {
                LinuxSpiError::SetSpeedFailed {
                    speed: speed_hz,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }
        dev.speed_hz = speed_hz;
        log::debug!("linux_spi: Set speed to {} Hz", speed_hz);
        Ok(())
    }
}

fn lock(dev: &Mutex<Spidev>) -> CoreResult<MutexGuard<'_, Spidev>> {
    dev.lock().map_err(|_| CoreError::SpiTransferFailed)
}

fn to_core(e: LinuxSpiError) -> CoreError {
    log::error!("linux_spi: {}", e);
    CoreError::SpiTransferFailed
}

impl SpiTransport for LinuxSpi {
    fn write(&mut self, data: &[u8]) -> CoreResult<()> {
        lock(&self.dev)?.write(data).map_err(to_core)
    }

    fn read(&mut self, buf: &mut [u8]) -> CoreResult<()> {
        lock(&self.dev)?.read(buf).map_err(to_core)
    }

    fn max_read_len(&self) -> usize {
        self.max_read_len
    }
}

/// Chip-select line of a [`LinuxSpi`] in kernel CS mode
pub struct KernelChipSelect {
    dev: Arc<Mutex<Spidev>>,
}

impl ControlLine for KernelChipSelect {
    fn set(&mut self) -> CoreResult<()> {
        lock(&self.dev)?.flush().map_err(to_core)
    }

    fn clear(&mut self) -> CoreResult<()> {
        lock(&self.dev)?.pending.clear();
        Ok(())
    }
}

/// Read the maximum kernel buffer size from sysfs, or use page size as fallback
fn get_max_kernel_buf_size() -> usize {
    if let Ok(content) = std::fs::read_to_string(BUF_SIZE_SYSFS) {
        if let Ok(size) = content.trim().parse::<usize>() {
            if size > 0 {
                log::debug!("linux_spi: Using buffer size {} from sysfs", size);
                return size;
            }
        }
        log::warn!("linux_spi: Invalid buffer size in {}", BUF_SIZE_SYSFS);
    } else {
        log::debug!("linux_spi: Cannot read {}, using page size", BUF_SIZE_SYSFS);
    }

    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
    log::debug!("linux_spi: Using page size {} as buffer size", page_size);
    page_size
}

/// Parse transport options from a list of key-value pairs
///
/// Recognised keys: `dev`, `spispeed` (kHz), `mode` (0-3) and
/// `kernel_cs` (`yes` or `no`).
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<LinuxSpiConfig, String> {
    let mut config = LinuxSpiConfig::default();

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "spispeed" => {
                let speed_khz: u32 = value
                    .parse()
                    .map_err(|_| format!("Invalid spispeed value: {}", value))?;
                config.speed_hz = speed_khz * 1000;
            }
            "mode" => {
                let mode: u8 = value
                    .parse()
                    .map_err(|_| format!("Invalid mode value: {}", value))?;
                if mode > 3 {
                    return Err(format!("Invalid SPI mode: {} (must be 0-3)", mode));
                }
                config.mode = mode;
            }
            "kernel_cs" => match *value {
                "yes" | "1" | "true" => config.no_cs = false,
                "no" | "0" | "false" => config.no_cs = true,
                other => return Err(format!("Invalid kernel_cs value: {} (yes or no)", other)),
            },
            _ => {
                log::warn!("linux_spi: Unknown option: {}={}", key, value);
            }
        }
    }

    if config.device.is_empty() {
        return Err("No device specified. Use dev=/dev/spidevX.Y".to_string());
    }

    Ok(config)
}
