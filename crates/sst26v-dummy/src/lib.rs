//! sst26v-dummy - In-memory SST26V emulator for testing
//!
//! [`DummyFlash`] emulates an SST26V at the pin level. It hands out a
//! [`DummySpi`] and one [`DummyLine`] per control pin, so the real
//! [`Transport`](sst26v_core::Transport) and [`Sst26v`](sst26v_core::Sst26v)
//! code paths run unchanged against it. Instructions take effect when
//! chip-select is released, like on the real part.
//!
//! Block protection is coarse: any set BPR bit write-locks the whole array.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sst26v_core::chip::{find_part, Part, PAGE_SIZE, PARTS, SECTOR_SIZE};
use sst26v_core::error::Result;
use sst26v_core::protection::{BlockProtection, BPR_LEN};
use sst26v_core::spi::{opcodes, ADDRESS_BYTES};
use sst26v_core::status::{ConfigReg, Status};
use sst26v_core::transport::{ControlLine, SpiTransport};

/// Configuration for the dummy flash
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Emulated part (JEDEC ID, size and block layout)
    pub part: Part,
    /// Set every BPR bit on reset, as the chip does at power-up
    pub locked_at_reset: bool,
    /// Number of STATUS reads that report BUSY after a program or erase
    pub busy_polls: u32,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            part: PARTS[PARTS.len() - 1],
            locked_at_reset: true,
            busy_polls: 1,
        }
    }
}

impl DummyConfig {
    /// Configuration emulating the named part
    pub fn for_part(name: &str) -> Option<Self> {
        let part = PARTS
            .iter()
            .find(|part| part.name.eq_ignore_ascii_case(name))?;
        Some(Self {
            part: *part,
            ..Self::default()
        })
    }
}

/// Control pins of the emulated chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pin {
    /// CE#
    ChipSelect,
    /// Board-level enable in front of the chip
    Enable,
    /// WP#
    WriteProtect,
    /// HOLD#
    Hold,
}

/// One entry of the recorded bus trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// A control pin was driven
    Line {
        /// Which pin
        pin: Pin,
        /// New level
        high: bool,
    },
    /// Bytes written during one completed chip-select frame
    Frame(Vec<u8>),
}

#[derive(Default)]
struct Frame {
    written: Vec<u8>,
    read: usize,
}

struct State {
    part: Part,
    locked_at_reset: bool,
    busy_polls: u32,
    data: Vec<u8>,
    levels: [Option<bool>; 4],
    frame: Option<Frame>,
    wel: bool,
    reset_enabled: bool,
    suspended: bool,
    busy: u32,
    config_reg: ConfigReg,
    bpr: BlockProtection,
    burst: u8,
    events: Vec<BusEvent>,
}

impl State {
    fn new(config: DummyConfig) -> Self {
        let bpr = if config.locked_at_reset {
            BlockProtection::locked()
        } else {
            BlockProtection::unlocked()
        };
        Self {
            data: vec![0xFF; config.part.size as usize],
            part: config.part,
            locked_at_reset: config.locked_at_reset,
            busy_polls: config.busy_polls,
            levels: [None; 4],
            frame: None,
            wel: false,
            reset_enabled: false,
            suspended: false,
            busy: 0,
            config_reg: ConfigReg::BPNV,
            bpr,
            burst: 0,
            events: Vec::new(),
        }
    }

    fn level(&self, pin: Pin) -> Option<bool> {
        self.levels[pin as usize]
    }

    fn pins_enabled(&self) -> bool {
        !self.config_reg.contains(ConfigReg::IOC)
    }

    fn held(&self) -> bool {
        self.pins_enabled() && self.level(Pin::Hold) == Some(false)
    }

    fn hw_protected(&self) -> bool {
        self.config_reg.contains(ConfigReg::WPEN)
            && self.pins_enabled()
            && self.level(Pin::WriteProtect) == Some(false)
    }

    fn drive(&mut self, pin: Pin, high: bool) {
        self.levels[pin as usize] = Some(high);
        self.events.push(BusEvent::Line { pin, high });

        if pin != Pin::ChipSelect {
            return;
        }
        if high {
            if let Some(frame) = self.frame.take() {
                self.complete(frame.written);
            }
        } else if self.frame.is_none() {
            self.frame = Some(Frame::default());
        }
    }

    fn shift_in(&mut self, data: &[u8]) {
        if self.held() {
            return;
        }
        if let Some(frame) = self.frame.as_mut() {
            frame.written.extend_from_slice(data);
        }
    }

    fn shift_out(&mut self, buf: &mut [u8]) {
        if self.held() {
            buf.fill(0xFF);
            return;
        }
        let Some(mut frame) = self.frame.take() else {
            buf.fill(0xFF);
            return;
        };
        for byte in buf.iter_mut() {
            *byte = self.respond(&frame.written, frame.read);
            frame.read += 1;
        }
        self.frame = Some(frame);
    }

    fn respond(&mut self, written: &[u8], pos: usize) -> u8 {
        match written.first().copied() {
            Some(opcodes::RDSR) => self.status_byte(),
            Some(opcodes::RDCR) => self.config_reg.bits(),
            Some(opcodes::JEDEC_ID) => self.part.id.to_bytes()[pos % 3],
            Some(opcodes::RBPR) => self.bpr.as_bytes()[pos % BPR_LEN],
            Some(opcodes::READ) => match decode_address(&written[1..]) {
                Some(addr) => self.data[(addr as usize + pos) % self.data.len()],
                None => 0xFF,
            },
            _ => 0xFF,
        }
    }

    fn status_byte(&mut self) -> u8 {
        let mut status = Status::empty();
        if self.busy > 0 {
            status |= Status::BUSY | Status::BUSY_MIRROR;
            self.busy -= 1;
        }
        if self.wel {
            status |= Status::WEL;
        }
        if self.suspended {
            status |= Status::WSE;
        }
        status.bits()
    }

    fn complete(&mut self, written: Vec<u8>) {
        self.events.push(BusEvent::Frame(written.clone()));
        let Some((&opcode, payload)) = written.split_first() else {
            return;
        };
        log::trace!("dummy: {} ({} bytes)", opcodes::name(opcode), written.len());

        // Anything but RST cancels a pending reset enable
        let reset_enabled = core::mem::take(&mut self.reset_enabled);

        if self.busy > 0
            && !matches!(
                opcode,
                opcodes::RDSR | opcodes::WRSU | opcodes::RSTEN | opcodes::RST | opcodes::NOP
            )
        {
            log::debug!("dummy: {} ignored while busy", opcodes::name(opcode));
            return;
        }

        match opcode {
            opcodes::RSTEN => self.reset_enabled = true,
            opcodes::RST if reset_enabled => self.reset(),
            opcodes::RST => log::debug!("dummy: RST without RSTEN ignored"),
            opcodes::WREN => self.wel = true,
            opcodes::WRDI => self.wel = false,
            opcodes::WRSU => {
                if self.busy > 0 {
                    self.busy = 0;
                    self.suspended = true;
                }
            }
            opcodes::WRRE => self.suspended = false,
            opcodes::SB => self.burst = payload.first().copied().unwrap_or(0),
            opcodes::WRSR => self.write_status(payload),
            opcodes::WBPR => self.write_bpr(payload),
            opcodes::PP => self.program(payload),
            opcodes::SE => self.erase(payload, false),
            opcodes::BE => self.erase(payload, true),
            opcodes::CE => self.chip_erase(),
            opcodes::NOP
            | opcodes::RDSR
            | opcodes::RDCR
            | opcodes::JEDEC_ID
            | opcodes::RBPR
            | opcodes::READ => {}
            other => log::debug!("dummy: unsupported opcode 0x{:02X}", other),
        }
    }

    fn reset(&mut self) {
        log::debug!("dummy: reset");
        self.wel = false;
        self.suspended = false;
        self.busy = 0;
        self.burst = 0;
        if self.locked_at_reset {
            self.bpr = BlockProtection::locked();
        }
    }

    fn take_write_enable(&mut self, what: &str) -> bool {
        let enabled = core::mem::take(&mut self.wel);
        if !enabled {
            log::debug!("dummy: {} ignored, write enable latch clear", what);
        }
        enabled
    }

    fn array_writable(&self, what: &str) -> bool {
        let writable = self.bpr.is_unlocked();
        if !writable {
            log::debug!("dummy: {} ignored, array is block protected", what);
        }
        writable
    }

    fn write_status(&mut self, payload: &[u8]) {
        if !self.take_write_enable("WRSR") {
            return;
        }
        if self.hw_protected() {
            log::debug!("dummy: WRSR ignored, WP# asserted");
            return;
        }
        if let Some(&config) = payload.get(1) {
            let writable = ConfigReg::IOC | ConfigReg::WPEN;
            let config = ConfigReg::from_bits_truncate(config) & writable;
            self.config_reg = (self.config_reg - writable) | config;
        }
    }

    fn write_bpr(&mut self, payload: &[u8]) {
        if !self.take_write_enable("WBPR") {
            return;
        }
        if self.hw_protected() {
            log::debug!("dummy: WBPR ignored, WP# asserted");
            return;
        }
        match <[u8; BPR_LEN]>::try_from(payload) {
            Ok(bytes) => self.bpr = BlockProtection::from_bytes(bytes),
            Err(_) => log::debug!("dummy: WBPR with {} bytes ignored", payload.len()),
        }
    }

    fn program(&mut self, payload: &[u8]) {
        let Some(addr) = decode_address(payload) else {
            return;
        };
        if !self.take_write_enable("PP") || !self.array_writable("PP") {
            return;
        }

        // Only the last page worth of data is latched
        let data = &payload[ADDRESS_BYTES..];
        let data = &data[data.len().saturating_sub(PAGE_SIZE as usize)..];
        let addr = addr % self.part.size;
        let page = addr & !(PAGE_SIZE - 1);
        for (i, &byte) in data.iter().enumerate() {
            let offset = (addr - page + i as u32) % PAGE_SIZE;
            self.data[(page + offset) as usize] &= byte;
        }
        self.busy = self.busy_polls;
    }

    fn erase(&mut self, payload: &[u8], block: bool) {
        let Some(addr) = decode_address(payload) else {
            return;
        };
        if !self.take_write_enable("erase") || !self.array_writable("erase") {
            return;
        }

        let addr = addr % self.part.size;
        let size = if block {
            self.part.block_size_at(addr)
        } else {
            SECTOR_SIZE
        };
        let start = (addr & !(size - 1)) as usize;
        self.data[start..start + size as usize].fill(0xFF);
        self.busy = self.busy_polls;
    }

    fn chip_erase(&mut self) {
        if !self.take_write_enable("CE") || !self.array_writable("CE") {
            return;
        }
        self.data.fill(0xFF);
        self.busy = self.busy_polls;
    }
}

fn decode_address(bytes: &[u8]) -> Option<u32> {
    match bytes {
        [a, b, c, ..] => Some(u32::from_be_bytes([0, *a, *b, *c])),
        _ => None,
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Emulated SST26V chip
///
/// The chip itself is only used to create bus handles and inspect state.
#[derive(Clone)]
pub struct DummyFlash {
    state: Arc<Mutex<State>>,
}

impl DummyFlash {
    /// Create a new dummy flash with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::new(config))),
        }
    }

    /// Create a new dummy flash with default configuration (SST26VF064B)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy flash with pre-filled data
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let flash = Self::new(config);
        {
            let mut state = lock(&flash.state);
            let len = initial_data.len().min(state.data.len());
            state.data[..len].copy_from_slice(&initial_data[..len]);
        }
        flash
    }

    /// SPI handle for a [`Transport`](sst26v_core::Transport)
    pub fn spi(&self) -> DummySpi {
        DummySpi {
            state: Arc::clone(&self.state),
        }
    }

    /// Handle driving one control pin
    pub fn line(&self, pin: Pin) -> DummyLine {
        DummyLine {
            state: Arc::clone(&self.state),
            pin,
        }
    }

    /// The emulated part
    pub fn part(&self) -> Part {
        lock(&self.state).part
    }

    /// Copy of the whole array
    pub fn data(&self) -> Vec<u8> {
        lock(&self.state).data.clone()
    }

    /// Current block-protection register
    pub fn block_protection(&self) -> BlockProtection {
        lock(&self.state).bpr
    }

    /// Current configuration register
    pub fn config_reg(&self) -> ConfigReg {
        lock(&self.state).config_reg
    }

    /// Write-enable latch
    pub fn write_enabled(&self) -> bool {
        lock(&self.state).wel
    }

    /// Burst wrap length last set with SB
    pub fn burst_length(&self) -> u8 {
        lock(&self.state).burst
    }

    /// Last level driven on `pin`, `None` if never driven
    pub fn level(&self, pin: Pin) -> Option<bool> {
        lock(&self.state).level(pin)
    }

    /// Full bus trace
    pub fn events(&self) -> Vec<BusEvent> {
        lock(&self.state).events.clone()
    }

    /// Bytes of every completed frame, in order
    pub fn frames(&self) -> Vec<Vec<u8>> {
        lock(&self.state)
            .events
            .iter()
            .filter_map(|event| match event {
                BusEvent::Frame(bytes) => Some(bytes.clone()),
                BusEvent::Line { .. } => None,
            })
            .collect()
    }

    /// Drop the recorded trace
    pub fn clear_events(&self) {
        lock(&self.state).events.clear();
    }
}

/// Look up the dummy part for a JEDEC ID
pub fn config_for_id(id: sst26v_core::JedecId) -> Option<DummyConfig> {
    find_part(id).map(|part| DummyConfig {
        part: *part,
        ..DummyConfig::default()
    })
}

/// SPI side of a [`DummyFlash`]
pub struct DummySpi {
    state: Arc<Mutex<State>>,
}

impl SpiTransport for DummySpi {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        lock(&self.state).shift_in(data);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        lock(&self.state).shift_out(buf);
        Ok(())
    }
}

/// One control pin of a [`DummyFlash`]
pub struct DummyLine {
    state: Arc<Mutex<State>>,
    pin: Pin,
}

impl ControlLine for DummyLine {
    fn set(&mut self) -> Result<()> {
        lock(&self.state).drive(self.pin, true);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        lock(&self.state).drive(self.pin, false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sst26v_core::device::Config;
    use sst26v_core::protocol;
    use sst26v_core::{Error, NoLine, Sst26v, Transport};

    type Device = Sst26v<DummySpi, DummyLine, NoLine, DummyLine, DummyLine>;

    fn small() -> DummyFlash {
        DummyFlash::new(DummyConfig::for_part("SST26VF016B").unwrap())
    }

    fn device(flash: &DummyFlash) -> Device {
        let transport = Transport::new(flash.spi()).with_chip_select(flash.line(Pin::ChipSelect));
        Sst26v::new(transport)
            .with_write_protect(flash.line(Pin::WriteProtect))
            .with_hold(flash.line(Pin::Hold))
    }

    #[test]
    fn test_init_unlocks() {
        let flash = small();
        assert!(flash.block_protection().is_locked());

        let mut dev = device(&flash);
        dev.init().unwrap();

        assert!(flash.block_protection().is_unlocked());
        assert_eq!(flash.level(Pin::Hold), Some(true));
        assert_eq!(flash.level(Pin::WriteProtect), Some(true));
        assert_eq!(flash.level(Pin::ChipSelect), Some(true));

        let mut unlock = vec![opcodes::WBPR];
        unlock.extend_from_slice(&[0x00; BPR_LEN]);
        assert_eq!(
            flash.frames(),
            vec![
                vec![opcodes::RSTEN],
                vec![opcodes::RST],
                vec![opcodes::WREN],
                unlock,
            ]
        );
    }

    #[test]
    fn test_locked_after_init_without_unlock() {
        let flash = small();
        let mut dev = device(&flash).with_config(Config::default().with_unlock_on_init(false));
        dev.init().unwrap();
        assert!(dev.read_block_protection().unwrap().is_locked());

        dev.write(0, &[0x00; 16]).unwrap();
        assert_eq!(dev.verify(0, &[0x00; 16]), Err(Error::VerifyError));
        assert!(flash.data()[..16].iter().all(|&b| b == 0xFF));

        dev.unlock_write().unwrap();
        dev.write(0, &[0x00; 16]).unwrap();
        dev.verify(0, &[0x00; 16]).unwrap();
    }

    #[test]
    fn test_probe_write_read() {
        let flash = small();
        let mut dev = device(&flash);
        dev.init().unwrap();

        let part = dev.probe().unwrap();
        assert_eq!(part.name, "SST26VF016B");

        let data: Vec<u8> = (0..300u32).map(|i| i as u8).collect();
        dev.erase_range(0x1000, 0x1000).unwrap();
        dev.write(0x10F0, &data).unwrap();

        let mut buf = vec![0u8; data.len()];
        dev.read(0x10F0, &mut buf).unwrap();
        assert_eq!(buf, data);
        dev.verify(0x10F0, &data).unwrap();
    }

    #[test]
    fn test_program_only_clears_bits() {
        let flash = small();
        let mut dev = device(&flash);
        dev.init().unwrap();

        dev.write(0x20, &[0xF0]).unwrap();
        dev.write(0x20, &[0x0F]).unwrap();
        assert_eq!(flash.data()[0x20], 0x00);

        dev.erase_range(0, SECTOR_SIZE).unwrap();
        assert_eq!(flash.data()[0x20], 0xFF);
    }

    #[test]
    fn test_page_program_wraps() {
        let flash = small();
        let mut dev = device(&flash);
        dev.init().unwrap();

        dev.write_enable().unwrap();
        dev.program(0x1F0, &[0x11; 32]).unwrap();
        dev.wait_ready().unwrap();

        let data = flash.data();
        assert!(data[0x1F0..0x200].iter().all(|&b| b == 0x11));
        assert!(data[0x100..0x110].iter().all(|&b| b == 0x11));
        assert_eq!(data[0x200], 0xFF);
    }

    #[test]
    fn test_reset_needs_adjacent_enable() {
        let flash = small();
        let mut dev = device(&flash);
        dev.init().unwrap();

        let mut byte = [0u8; 1];
        protocol::reset_enable(&mut dev).unwrap();
        dev.read(0, &mut byte).unwrap();
        protocol::reset(&mut dev).unwrap();
        assert!(flash.block_protection().is_unlocked());

        dev.reset().unwrap();
        assert!(flash.block_protection().is_locked());
    }

    #[test]
    fn test_cancel_reset() {
        let flash = small();
        let mut dev = device(&flash);
        dev.init().unwrap();

        protocol::reset_enable(&mut dev).unwrap();
        dev.cancel_reset().unwrap();
        protocol::reset(&mut dev).unwrap();
        assert!(flash.block_protection().is_unlocked());
    }

    #[test]
    fn test_chip_erase_when_locked() {
        let flash = DummyFlash::with_data(
            DummyConfig::for_part("SST26VF016B").unwrap(),
            &[0x00; 64],
        );
        let mut dev = device(&flash);
        dev.init().unwrap();
        dev.lock_write().unwrap();

        assert_eq!(dev.erase_chip(), Err(Error::WriteProtected));
        assert_eq!(flash.data()[0], 0x00);

        // Issued raw, the chip ignores it
        dev.write_enable().unwrap();
        dev.erase_all().unwrap();
        assert_eq!(flash.data()[0], 0x00);

        dev.unlock_write().unwrap();
        dev.erase_chip().unwrap();
        assert_eq!(flash.data()[0], 0xFF);
    }

    #[test]
    fn test_wp_pin_blocks_bpr_writes() {
        let flash = small();
        let mut dev = device(&flash);
        dev.init().unwrap();

        dev.write_enable().unwrap();
        dev.write_status(0, ConfigReg::WPEN.bits()).unwrap();
        assert!(dev.read_config().unwrap().contains(ConfigReg::WPEN));

        dev.clear_write_protection_hw().unwrap();
        dev.lock_write().unwrap();
        assert!(flash.block_protection().is_unlocked());

        dev.set_write_protection_hw().unwrap();
        dev.lock_write().unwrap();
        assert!(flash.block_protection().is_locked());
    }

    #[test]
    fn test_hold_pauses_transfer() {
        let flash = small();
        let mut dev = device(&flash);
        dev.init().unwrap();

        dev.clear_holding_hw().unwrap();
        let id = dev.read_jedec_id().unwrap();
        assert_eq!(id.to_bytes(), [0xFF; 3]);

        dev.set_holding_hw().unwrap();
        assert_eq!(dev.read_jedec_id().unwrap(), flash.part().id);
    }

    #[test]
    fn test_busy_polling() {
        let flash = DummyFlash::new(DummyConfig {
            busy_polls: 5,
            ..DummyConfig::for_part("SST26VF016B").unwrap()
        });
        let mut dev = device(&flash).with_config(Config::default().with_max_busy_polls(3));
        dev.init().unwrap();

        dev.write_enable().unwrap();
        assert!(dev.read_status().unwrap().write_enabled());
        dev.erase_sector(0).unwrap();
        assert!(dev.is_busy().unwrap());
        assert_eq!(dev.wait_ready(), Err(Error::Timeout));
        dev.wait_ready().unwrap();
        assert!(!dev.is_busy().unwrap());
    }

    #[test]
    fn test_suspend_resume() {
        let flash = DummyFlash::new(DummyConfig {
            busy_polls: 100,
            ..DummyConfig::for_part("SST26VF016B").unwrap()
        });
        let mut dev = device(&flash);
        dev.init().unwrap();

        dev.write_enable().unwrap();
        dev.erase_sector(0).unwrap();
        dev.write_suspend().unwrap();
        let status = dev.read_status().unwrap();
        assert!(status.is_suspended());
        assert!(!status.is_busy());

        dev.write_resume().unwrap();
        assert!(!dev.read_status().unwrap().is_suspended());
    }

    #[test]
    fn test_block_erase_layout() {
        let flash = DummyFlash::with_data(
            DummyConfig::for_part("SST26VF016B").unwrap(),
            &[0x00; 0x2_0000],
        );
        let mut dev = device(&flash);
        dev.init().unwrap();

        // Boot block: 8 KiB
        dev.write_enable().unwrap();
        dev.erase_block(0x0).unwrap();
        dev.wait_ready().unwrap();
        // Uniform block: 64 KiB
        dev.write_enable().unwrap();
        dev.erase_block(0x1_0000).unwrap();
        dev.wait_ready().unwrap();

        let data = flash.data();
        assert!(data[..0x2000].iter().all(|&b| b == 0xFF));
        assert_eq!(data[0x2000], 0x00);
        assert!(data[0x1_0000..0x2_0000].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_burst_and_unselected_bus() {
        let flash = small();
        let mut dev = device(&flash);
        dev.init().unwrap();
        dev.set_burst_length(0x02).unwrap();
        assert_eq!(flash.burst_length(), 0x02);

        // Bytes clocked without chip-select go nowhere
        let mut spi = flash.spi();
        spi.write(&[opcodes::WREN]).unwrap();
        assert!(!flash.write_enabled());
    }

    #[test]
    fn test_config_lookup() {
        let config = config_for_id(PARTS[1].id).unwrap();
        assert_eq!(config.part.name, "SST26VF032B");
        assert!(DummyConfig::for_part("sst26vf064b").is_some());
        assert!(DummyConfig::for_part("W25Q128").is_none());
    }
}
