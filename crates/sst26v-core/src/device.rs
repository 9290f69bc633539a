//! SST26V device handle
//!
//! [`Sst26v`] bundles a [`Transport`] with the write-protect and hold lines,
//! the device identifier byte and the init policy. It owns no protocol state:
//! every call is a self-contained sequence of framed instructions.

use crate::chip::{find_part, JedecId, Part, PAGE_SIZE, SECTOR_SIZE};
use crate::error::{Error, Result};
use crate::protection::BlockProtection;
use crate::protocol;
use crate::spi::{SpiCommand, ADDRESS_SPACE};
use crate::status::{ConfigReg, Status};
use crate::transport::{CommandBus, ControlLine, NoLine, SpiTransport, Transport};

/// Default bound on STATUS polls while waiting for a program or erase
pub const DEFAULT_MAX_BUSY_POLLS: u32 = 1_000_000;

/// Device policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Clear every block-protection bit during `init`
    ///
    /// Enabled by default. Turn it off to keep the array locked until the
    /// application explicitly calls `unlock_write` before writing.
    pub unlock_on_init: bool,
    /// Bound on STATUS polls in `write`, `erase_range` and `wait_ready`
    pub max_busy_polls: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unlock_on_init: true,
            max_busy_polls: DEFAULT_MAX_BUSY_POLLS,
        }
    }
}

impl Config {
    /// Set the unlock-on-init policy
    pub fn with_unlock_on_init(mut self, unlock: bool) -> Self {
        self.unlock_on_init = unlock;
        self
    }

    /// Set the busy polling bound
    pub fn with_max_busy_polls(mut self, polls: u32) -> Self {
        self.max_busy_polls = polls;
        self
    }
}

/// SST26V device handle
pub struct Sst26v<S, CS = NoLine, EN = NoLine, WP = NoLine, HOLD = NoLine> {
    transport: Transport<S, CS, EN>,
    write_protect: WP,
    hold: HOLD,
    id: u8,
    config: Config,
    part: Option<&'static Part>,
}

impl<S, CS, EN> Sst26v<S, CS, EN> {
    /// Wrap a transport; WP# and HOLD# start unwired
    pub fn new(transport: Transport<S, CS, EN>) -> Self {
        Self {
            transport,
            write_protect: NoLine,
            hold: NoLine,
            id: 0,
            config: Config::default(),
            part: None,
        }
    }
}

impl<S, CS, EN, WP, HOLD> Sst26v<S, CS, EN, WP, HOLD> {
    /// Attach the WP# line
    pub fn with_write_protect<L: ControlLine>(self, line: L) -> Sst26v<S, CS, EN, L, HOLD> {
        Sst26v {
            transport: self.transport,
            write_protect: line,
            hold: self.hold,
            id: self.id,
            config: self.config,
            part: self.part,
        }
    }

    /// Attach the HOLD# line
    pub fn with_hold<L: ControlLine>(self, line: L) -> Sst26v<S, CS, EN, WP, L> {
        Sst26v {
            transport: self.transport,
            write_protect: self.write_protect,
            hold: line,
            id: self.id,
            config: self.config,
            part: self.part,
        }
    }

    /// Set the application-defined device identifier
    pub fn with_id(mut self, id: u8) -> Self {
        self.id = id;
        self
    }

    /// Set the device policy
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Declare the part up front instead of probing it
    pub fn with_part(mut self, part: &'static Part) -> Self {
        self.part = Some(part);
        self
    }

    /// Application-defined device identifier
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Device policy
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The part, if probed or declared
    pub fn part(&self) -> Option<&'static Part> {
        self.part
    }

    /// Capacity in bytes; the full 24-bit space when the part is unknown
    pub fn capacity(&self) -> u32 {
        self.part.map_or(ADDRESS_SPACE, |part| part.size)
    }

    /// Get a mutable reference to the transport
    pub fn transport_mut(&mut self) -> &mut Transport<S, CS, EN> {
        &mut self.transport
    }

    /// Give back the transport and the WP#/HOLD# lines
    pub fn release(self) -> (Transport<S, CS, EN>, WP, HOLD) {
        (self.transport, self.write_protect, self.hold)
    }

    fn check_range(&self, addr: u32, len: usize) -> Result<()> {
        let len = u32::try_from(len).map_err(|_| Error::AddressOutOfBounds)?;
        let capacity = self.capacity();
        if len > capacity || addr > capacity - len {
            return Err(Error::AddressOutOfBounds);
        }
        Ok(())
    }
}

impl<S, CS, EN, WP, HOLD> Sst26v<S, CS, EN, WP, HOLD>
where
    S: SpiTransport,
    CS: ControlLine,
    EN: ControlLine,
    WP: ControlLine,
    HOLD: ControlLine,
{
    // ========================================================================
    // Lines
    // ========================================================================

    /// Open a transmission on the underlying transport
    pub fn start_transmission(&mut self) -> Result<()> {
        self.transport.start_transmission()
    }

    /// Close a transmission on the underlying transport
    pub fn end_transmission(&mut self) -> Result<()> {
        self.transport.end_transmission()
    }

    /// Drive WP# high: hardware write protection disabled
    pub fn set_write_protection_hw(&mut self) -> Result<()> {
        self.write_protect.set()
    }

    /// Drive WP# low: hardware write protection enabled (when WPEN is set)
    pub fn clear_write_protection_hw(&mut self) -> Result<()> {
        self.write_protect.clear()
    }

    /// Drive HOLD# high: hold disabled
    pub fn set_holding_hw(&mut self) -> Result<()> {
        self.hold.set()
    }

    /// Drive HOLD# low: pause the current transfer
    pub fn clear_holding_hw(&mut self) -> Result<()> {
        self.hold.clear()
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Bring the chip into a known state
    ///
    /// Closes any open transmission, releases HOLD# and WP#, performs a
    /// software reset and, if `unlock_on_init` is set, clears every
    /// block-protection bit.
    pub fn init(&mut self) -> Result<()> {
        log::debug!("sst26v[{}]: init", self.id);
        self.end_transmission()?;
        self.set_holding_hw()?;
        self.set_write_protection_hw()?;
        self.reset()?;
        if self.config.unlock_on_init {
            self.unlock_write()
        } else {
            log::info!(
                "sst26v[{}]: leaving block protection untouched on init",
                self.id
            );
            Ok(())
        }
    }

    /// Software reset: RSTEN immediately followed by RST
    pub fn reset(&mut self) -> Result<()> {
        log::debug!("sst26v[{}]: reset", self.id);
        protocol::software_reset(&mut self.transport)
    }

    /// Cancel a pending Reset Enable (NOP)
    pub fn cancel_reset(&mut self) -> Result<()> {
        protocol::cancel_reset(&mut self.transport)
    }

    /// Clear every block-protection bit
    pub fn unlock_write(&mut self) -> Result<()> {
        log::debug!("sst26v[{}]: unlocking all blocks", self.id);
        protocol::unlock_all(&mut self.transport)
    }

    /// Set every block-protection bit
    pub fn lock_write(&mut self) -> Result<()> {
        log::debug!("sst26v[{}]: locking all blocks", self.id);
        protocol::lock_all(&mut self.transport)
    }

    /// Read the JEDEC ID and match it against the known parts
    pub fn probe(&mut self) -> Result<&'static Part> {
        let id = self.read_jedec_id()?;
        match find_part(id) {
            Some(part) => {
                log::info!("sst26v[{}]: found {} ({})", self.id, part.name, id);
                self.part = Some(part);
                Ok(part)
            }
            None => {
                log::warn!("sst26v[{}]: unknown JEDEC ID {}", self.id, id);
                Err(Error::ChipNotSupported)
            }
        }
    }

    /// Read the JEDEC ID and require it to equal `expected`
    pub fn verify_id(&mut self, expected: JedecId) -> Result<()> {
        let id = self.read_jedec_id()?;
        if id != expected {
            log::warn!("sst26v[{}]: expected {}, read {}", self.id, expected, id);
            return Err(Error::JedecIdMismatch);
        }
        Ok(())
    }

    // ========================================================================
    // Register access
    // ========================================================================

    /// Read the STATUS register
    pub fn read_status(&mut self) -> Result<Status> {
        protocol::read_status(&mut self.transport)
    }

    /// Read the CONFIGURATION register
    pub fn read_config(&mut self) -> Result<ConfigReg> {
        protocol::read_config(&mut self.transport)
    }

    /// Read the JEDEC ID
    pub fn read_jedec_id(&mut self) -> Result<JedecId> {
        protocol::read_jedec_id(&mut self.transport)
    }

    /// Read the block-protection register
    pub fn read_block_protection(&mut self) -> Result<BlockProtection> {
        protocol::read_block_protection(&mut self.transport)
    }

    /// Write the block-protection register (send `write_enable` first)
    pub fn write_block_protection(&mut self, bpr: &BlockProtection) -> Result<()> {
        protocol::write_block_protection(&mut self.transport, bpr)
    }

    /// Write STATUS and CONFIGURATION (send `write_enable` first)
    pub fn write_status(&mut self, status: u8, config: u8) -> Result<()> {
        protocol::write_status(&mut self.transport, status, config)
    }

    /// Set the burst wrap length
    pub fn set_burst_length(&mut self, length: u8) -> Result<()> {
        protocol::set_burst_length(&mut self.transport, length)
    }

    /// Set the write-enable latch
    pub fn write_enable(&mut self) -> Result<()> {
        protocol::write_enable(&mut self.transport)
    }

    /// Clear the write-enable latch
    pub fn write_disable(&mut self) -> Result<()> {
        protocol::write_disable(&mut self.transport)
    }

    /// Suspend a running program or erase
    pub fn write_suspend(&mut self) -> Result<()> {
        protocol::write_suspend(&mut self.transport)
    }

    /// Resume a suspended program or erase
    pub fn write_resume(&mut self) -> Result<()> {
        protocol::write_resume(&mut self.transport)
    }

    // ========================================================================
    // Memory array, single instructions
    // ========================================================================

    /// Read `buf.len()` bytes starting at `addr`
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        protocol::read(&mut self.transport, addr, buf)
    }

    /// Page program without write-enable or busy wait
    pub fn program(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        protocol::program_page(&mut self.transport, addr, data)
    }

    /// Erase the 4 KiB sector at `addr` without write-enable or busy wait
    pub fn erase_sector(&mut self, addr: u32) -> Result<()> {
        protocol::erase_sector(&mut self.transport, addr)
    }

    /// Erase the block at `addr` without write-enable or busy wait
    pub fn erase_block(&mut self, addr: u32) -> Result<()> {
        protocol::erase_block(&mut self.transport, addr)
    }

    /// Chip erase without write-enable or busy wait
    pub fn erase_all(&mut self) -> Result<()> {
        protocol::chip_erase(&mut self.transport)
    }

    /// Check if a program or erase is in progress
    pub fn is_busy(&mut self) -> Result<bool> {
        protocol::is_busy(&mut self.transport)
    }

    /// Wait for BUSY to clear, bounded by `max_busy_polls`
    pub fn wait_ready(&mut self) -> Result<()> {
        protocol::wait_ready(&mut self.transport, self.config.max_busy_polls)
    }

    // ========================================================================
    // Memory array, complete operations
    // ========================================================================

    /// Program `data` at `addr`, split on page boundaries
    ///
    /// Each page gets WREN, PP and a busy wait. The target must already be
    /// erased.
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.check_range(addr, data.len())?;

        let mut offset = 0usize;
        while offset < data.len() {
            let page_addr = addr + offset as u32;
            let room = (PAGE_SIZE - page_addr % PAGE_SIZE) as usize;
            let chunk = &data[offset..data.len().min(offset + room)];

            self.write_enable()?;
            self.program(page_addr, chunk)?;
            self.wait_ready()?;

            offset += chunk.len();
        }
        Ok(())
    }

    /// Erase `[addr, addr + len)` sector by sector
    ///
    /// Both `addr` and `len` must be multiples of 4 KiB.
    pub fn erase_range(&mut self, addr: u32, len: u32) -> Result<()> {
        if addr % SECTOR_SIZE != 0 || len % SECTOR_SIZE != 0 {
            return Err(Error::InvalidAlignment);
        }
        self.check_range(addr, len as usize)?;

        for sector in (addr..addr + len).step_by(SECTOR_SIZE as usize) {
            self.write_enable()?;
            self.erase_sector(sector)?;
            self.wait_ready()?;
        }
        Ok(())
    }

    /// Chip erase with write-enable and busy wait
    ///
    /// The chip silently ignores CE while any block is protected, so the
    /// block-protection register is checked first.
    pub fn erase_chip(&mut self) -> Result<()> {
        if !self.read_block_protection()?.is_unlocked() {
            return Err(Error::WriteProtected);
        }
        self.write_enable()?;
        self.erase_all()?;
        self.wait_ready()
    }

    /// Compare flash contents at `addr` against `expected`
    pub fn verify(&mut self, addr: u32, expected: &[u8]) -> Result<()> {
        self.check_range(addr, expected.len())?;

        let mut buf = [0u8; PAGE_SIZE as usize];
        for (i, chunk) in expected.chunks(buf.len()).enumerate() {
            let chunk_addr = addr + (i * buf.len()) as u32;
            let read_buf = &mut buf[..chunk.len()];
            self.read(chunk_addr, read_buf)?;
            if read_buf != chunk {
                log::debug!(
                    "sst26v[{}]: verify mismatch in chunk at 0x{:06X}",
                    self.id,
                    chunk_addr
                );
                return Err(Error::VerifyError);
            }
        }
        Ok(())
    }
}

impl<S, CS, EN, WP, HOLD> CommandBus for Sst26v<S, CS, EN, WP, HOLD>
where
    S: SpiTransport,
    CS: ControlLine,
    EN: ControlLine,
{
    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        self.transport.execute(cmd)
    }

    fn max_read_len(&self) -> usize {
        self.transport.max_read_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::PARTS;
    use crate::mock::{frames, Event, Line, MockLine, MockSpi};
    use crate::protection::BPR_LEN;
    use crate::spi::opcodes;
    use core::cell::RefCell;
    use std::vec;
    use std::vec::Vec;

    type Device<'a> = Sst26v<MockSpi<'a>, MockLine<'a>, NoLine, MockLine<'a>, MockLine<'a>>;

    fn device<'a>(log: &'a RefCell<Vec<Event>>, responses: &[u8]) -> Device<'a> {
        let transport = Transport::new(MockSpi::new(log).with_response(responses))
            .with_chip_select(MockLine::new(Line::Cs, log));
        Sst26v::new(transport)
            .with_write_protect(MockLine::new(Line::WriteProtect, log))
            .with_hold(MockLine::new(Line::Hold, log))
            .with_id(7)
    }

    fn wbpr(fill: u8) -> Vec<u8> {
        let mut bytes = vec![opcodes::WBPR];
        bytes.extend_from_slice(&[fill; BPR_LEN]);
        bytes
    }

    #[test]
    fn test_init_sequence() {
        let log = RefCell::new(Vec::new());
        device(&log, &[]).init().unwrap();
        let events = log.into_inner();

        // Close, HOLD#, WP#, then the reset pair
        assert_eq!(
            &events[..5],
            &[
                Event::Set(Line::Cs),
                Event::Set(Line::Hold),
                Event::Set(Line::WriteProtect),
                Event::Clear(Line::Cs),
                Event::Write(vec![opcodes::RSTEN]),
            ]
        );

        let written: Vec<Vec<u8>> = frames(&events).into_iter().map(|f| f.written).collect();
        assert_eq!(
            written,
            vec![
                vec![opcodes::RSTEN],
                vec![opcodes::RST],
                vec![opcodes::WREN],
                wbpr(0x00),
            ]
        );
    }

    #[test]
    fn test_init_without_unlock() {
        let log = RefCell::new(Vec::new());
        let mut dev = device(&log, &[]).with_config(Config::default().with_unlock_on_init(false));
        dev.init().unwrap();

        let written: Vec<Vec<u8>> = frames(&log.into_inner())
            .into_iter()
            .map(|f| f.written)
            .collect();
        assert_eq!(written, vec![vec![opcodes::RSTEN], vec![opcodes::RST]]);
    }

    #[test]
    fn test_lock_and_unlock() {
        let log = RefCell::new(Vec::new());
        let mut dev = device(&log, &[]);
        dev.lock_write().unwrap();
        dev.unlock_write().unwrap();

        let written: Vec<Vec<u8>> = frames(&log.into_inner())
            .into_iter()
            .map(|f| f.written)
            .collect();
        assert_eq!(
            written,
            vec![
                vec![opcodes::WREN],
                wbpr(0xFF),
                vec![opcodes::WREN],
                wbpr(0x00),
            ]
        );
    }

    #[test]
    fn test_hw_lines() {
        let log = RefCell::new(Vec::new());
        let mut dev = device(&log, &[]);
        dev.clear_write_protection_hw().unwrap();
        dev.clear_holding_hw().unwrap();
        dev.set_holding_hw().unwrap();
        assert_eq!(
            log.into_inner(),
            vec![
                Event::Clear(Line::WriteProtect),
                Event::Clear(Line::Hold),
                Event::Set(Line::Hold),
            ]
        );
    }

    #[test]
    fn test_probe() {
        let log = RefCell::new(Vec::new());
        let mut dev = device(&log, &[0xBF, 0x26, 0x42]);
        let part = dev.probe().unwrap();
        assert_eq!(part.name, "SST26VF032B");
        assert_eq!(dev.capacity(), 4 * 1024 * 1024);

        let log = RefCell::new(Vec::new());
        let mut dev = device(&log, &[0xEF, 0x40, 0x18]);
        assert_eq!(dev.probe(), Err(Error::ChipNotSupported));
        assert!(dev.part().is_none());
    }

    #[test]
    fn test_verify_id() {
        let log = RefCell::new(Vec::new());
        let mut dev = device(&log, &[0xBF, 0x26, 0x41]);
        assert_eq!(
            dev.verify_id(JedecId::from_bytes([0xBF, 0x26, 0x43])),
            Err(Error::JedecIdMismatch)
        );
    }

    #[test]
    fn test_write_splits_pages() {
        let log = RefCell::new(Vec::new());
        // Status reads return 0x00 (ready) once the response queue is empty
        let mut dev = device(&log, &[]);
        let data = [0x5Au8; 300];
        dev.write(0xF0, &data).unwrap();

        let frames = frames(&log.into_inner());
        let programs: Vec<_> = frames
            .iter()
            .filter(|f| f.written[0] == opcodes::PP)
            .collect();
        assert_eq!(programs.len(), 3);
        // 0xF0..0x100, 0x100..0x200, 0x200..0x21C
        assert_eq!(&programs[0].written[..4], &[opcodes::PP, 0x00, 0x00, 0xF0]);
        assert_eq!(programs[0].written.len(), 4 + 0x10);
        assert_eq!(&programs[1].written[..4], &[opcodes::PP, 0x00, 0x01, 0x00]);
        assert_eq!(programs[1].written.len(), 4 + 256);
        assert_eq!(&programs[2].written[..4], &[opcodes::PP, 0x00, 0x02, 0x00]);
        assert_eq!(programs[2].written.len(), 4 + 300 - 0x10 - 256);

        // Every page program is preceded by WREN and followed by RDSR
        for (i, f) in frames.iter().enumerate() {
            if f.written[0] == opcodes::PP {
                assert_eq!(frames[i - 1].written, vec![opcodes::WREN]);
                assert_eq!(frames[i + 1].written, vec![opcodes::RDSR]);
            }
        }
    }

    #[test]
    fn test_write_bounds() {
        let log = RefCell::new(Vec::new());
        let mut dev = device(&log, &[]).with_part(&PARTS[0]);
        let size = PARTS[0].size;
        assert_eq!(dev.write(size - 1, &[0, 0]), Err(Error::AddressOutOfBounds));
        assert!(log.borrow().is_empty());
        dev.write(size - 2, &[0, 0]).unwrap();
    }

    #[test]
    fn test_erase_range() {
        let log = RefCell::new(Vec::new());
        let mut dev = device(&log, &[]);
        assert_eq!(dev.erase_range(0x100, 0x1000), Err(Error::InvalidAlignment));
        assert_eq!(dev.erase_range(0, 0x800), Err(Error::InvalidAlignment));

        dev.erase_range(0x2000, 0x2000).unwrap();
        let erases: Vec<Vec<u8>> = frames(&log.into_inner())
            .into_iter()
            .map(|f| f.written)
            .filter(|w| w[0] == opcodes::SE)
            .collect();
        assert_eq!(
            erases,
            vec![
                vec![opcodes::SE, 0x00, 0x20, 0x00],
                vec![opcodes::SE, 0x00, 0x30, 0x00],
            ]
        );
    }

    #[test]
    fn test_wait_ready_timeout() {
        let log = RefCell::new(Vec::new());
        let mut responses = [0u8; BPR_LEN + 4];
        responses[BPR_LEN..].fill(0x01);
        let mut dev = device(&log, &responses)
            .with_config(Config::default().with_max_busy_polls(3));
        assert_eq!(dev.erase_chip(), Err(Error::Timeout));
    }

    #[test]
    fn test_erase_chip_refused_when_locked() {
        let log = RefCell::new(Vec::new());
        let mut dev = device(&log, &[0xFF; BPR_LEN]);
        assert_eq!(dev.erase_chip(), Err(Error::WriteProtected));
        let written: Vec<Vec<u8>> = frames(&log.into_inner())
            .into_iter()
            .map(|f| f.written)
            .collect();
        assert_eq!(written, vec![vec![opcodes::RBPR]]);
    }

    #[test]
    fn test_verify() {
        let log = RefCell::new(Vec::new());
        let mut dev = device(&log, &[1, 2, 3, 4]);
        dev.verify(0, &[1, 2, 3, 4]).unwrap();

        let log = RefCell::new(Vec::new());
        let mut dev = device(&log, &[1, 2, 3, 5]);
        assert_eq!(dev.verify(0, &[1, 2, 3, 4]), Err(Error::VerifyError));
    }

    #[test]
    fn test_device_as_command_bus() {
        let log = RefCell::new(Vec::new());
        let mut dev = device(&log, &[]);
        protocol::write_resume(&mut dev).unwrap();
        assert_eq!(frames(&log.into_inner())[0].written, vec![opcodes::WRRE]);
    }
}
