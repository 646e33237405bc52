use std::error::Error;
use std::fmt;

use crate::joypad;

mod mbc;

pub use mbc::MbcKind;
use mbc::Mbc;


/// Total addressable memory on the 16-bit bus (64 KiB).
pub const MEMORY_SIZE: usize = 0x10000;

/// Size of one ROM bank (the fixed and the switchable window are each
/// 16 KiB).
pub const ROM_BANK_SIZE: usize = 0x4000;
/// Size of one external RAM bank.
pub const RAM_BANK_SIZE: usize = 0x2000;

pub const DIV: u16 = 0xFF04;
pub const TIMA: u16 = 0xFF05;
pub const TMA: u16 = 0xFF06;
pub const TAC: u16 = 0xFF07;
pub const IF: u16 = 0xFF0F;
pub const LCDC: u16 = 0xFF40;
pub const STAT: u16 = 0xFF41;
pub const SCY: u16 = 0xFF42;
pub const SCX: u16 = 0xFF43;
pub const LY: u16 = 0xFF44;
pub const LYC: u16 = 0xFF45;
pub const OAM_DMA: u16 = 0xFF46;
pub const BGP: u16 = 0xFF47;
pub const OBP0: u16 = 0xFF48;
pub const OBP1: u16 = 0xFF49;
pub const WY: u16 = 0xFF4A;
pub const WX: u16 = 0xFF4B;
pub const IE: u16 = 0xFFFF;

/// Errors reported while building a `Memory` from a cartridge image.
///
/// All of these are load-time failures; the core refuses to start rather
/// than running a cartridge it cannot map correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartridgeError {
    /// The image is shorter than the cartridge header.
    TooSmall(usize),
    /// Header byte 0x147 names a mapper this core does not implement.
    UnsupportedMapper(u8),
    /// Header byte 0x148 is outside the defined DMG size codes (0x00-0x08).
    InvalidRomSize(u8),
    /// Header byte 0x148 declares more ROM banks than the image contains.
    RomSizeMismatch { declared_banks: usize, available: usize },
}

impl fmt::Display for CartridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartridgeError::TooSmall(len) => {
                write!(f, "cartridge image too small for a header: {} bytes", len)
            }
            CartridgeError::UnsupportedMapper(kind) => {
                write!(f, "unsupported cartridge type byte: 0x{:02X}", kind)
            }
            CartridgeError::InvalidRomSize(code) => {
                write!(f, "invalid ROM size code in header: 0x{:02X}", code)
            }
            CartridgeError::RomSizeMismatch {
                declared_banks,
                available,
            } => write!(
                f,
                "header declares {} ROM banks but image holds only {}",
                declared_banks, available
            ),
        }
    }
}

impl Error for CartridgeError {}

/// The full 64 KiB address space plus cartridge banking state.
///
/// All components of the machine share this one instance. Reads and writes
/// are intercepted before touching the flat array: the pixel pipeline can
/// lock VRAM and OAM (locked reads return 0xFF, writes are dropped), ROM
/// region writes are routed to the mapper registers, and a handful of IO
/// registers have side effects (DIV reset, OAM DMA trigger).
pub struct Memory {
    pub(crate) data: [u8; MEMORY_SIZE],
    /// Bus contention locks owned by the pixel pipeline.
    pub(crate) vram_locked: bool,
    pub(crate) oam_locked: bool,
    mbc: Mbc,
    /// Source page latched by a write to the OAM DMA trigger register,
    /// consumed by the DMA controller on its next tick.
    dma_request: Option<u8>,
    /// Set by any write to DIV, consumed by the timer to zero its
    /// free-running counter.
    div_reset: bool,
    /// Digital button state, indexed by `joypad::Button`. true = pressed.
    pub(crate) keys: [bool; 8],
}

impl Memory {
    /// Build the address space from a raw cartridge image.
    ///
    /// Validates the mapper type (header byte 0x147) and the declared ROM
    /// bank count (byte 0x148) against the actual image size.
    pub fn new(rom: &[u8]) -> Result<Memory, CartridgeError> {
        if rom.len() < 0x150 {
            return Err(CartridgeError::TooSmall(rom.len()));
        }

        let mut memory = Memory {
            data: [0; MEMORY_SIZE],
            vram_locked: false,
            oam_locked: false,
            mbc: Mbc::none(),
            dma_request: None,
            div_reset: false,
            keys: [false; 8],
        };

        let cart_type = rom[0x147];
        match cart_type {
            0x00 => {
                // No mapper: the image maps flat over 0x0000-0x7FFF.
                let len = rom.len().min(2 * ROM_BANK_SIZE);
                memory.data[..len].copy_from_slice(&rom[..len]);
                if rom.len() > 2 * ROM_BANK_SIZE {
                    log::warn!(
                        "unbanked cartridge larger than 32 KiB ({} bytes); extra data ignored",
                        rom.len()
                    );
                }
            }
            0x01..=0x03 => {
                // Header validation first: a passing image is guaranteed to
                // hold at least the two banks the fixed-bank copy needs.
                memory.mbc = Mbc::mbc1(rom)?;
                memory.data[..ROM_BANK_SIZE].copy_from_slice(&rom[..ROM_BANK_SIZE]);
            }
            other => return Err(CartridgeError::UnsupportedMapper(other)),
        }

        log::info!(
            "loaded cartridge: type=0x{:02X} mapper={:?} rom={} bytes",
            cart_type,
            memory.mbc.kind(),
            rom.len()
        );

        memory.apply_power_on_io();
        Ok(memory)
    }

    /// Documented post-boot-ROM IO register state for the DMG.
    fn apply_power_on_io(&mut self) {
        self.data[LCDC as usize] = 0x91;
        self.data[STAT as usize] = 0x85;
        self.data[IF as usize] = 0xE1;
        self.data[BGP as usize] = 0xFC;
        self.data[OBP0 as usize] = 0xFF;
        self.data[OBP1 as usize] = 0xFF;
    }

    /// CPU-visible read with region interception.
    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            // Fixed first ROM bank.
            0x0000..=0x3FFF => self.data[addr as usize],
            // Switchable ROM window.
            0x4000..=0x7FFF => match self.mbc.kind() {
                MbcKind::None => self.data[addr as usize],
                MbcKind::Mbc1 => self.mbc.rom_read(addr),
            },
            // VRAM: 0xFF while the pixel pipeline holds the lock.
            0x8000..=0x9FFF => {
                if self.vram_locked {
                    0xFF
                } else {
                    self.data[addr as usize]
                }
            }
            // External cartridge RAM.
            0xA000..=0xBFFF => match self.mbc.kind() {
                MbcKind::None => self.data[addr as usize],
                MbcKind::Mbc1 => self.mbc.ram_read(addr),
            },
            // Echo RAM mirrors 0xC000-0xDDFF.
            0xE000..=0xFDFF => self.data[(addr - 0x2000) as usize],
            // Sprite attribute table.
            0xFE00..=0xFE9F => {
                if self.oam_locked {
                    0xFF
                } else {
                    self.data[addr as usize]
                }
            }
            0xFF00 => joypad::read_p1(self),
            // Upper 3 bits of IF always read back as 1.
            IF => self.data[addr as usize] | 0xE0,
            _ => self.data[addr as usize],
        }
    }

    /// CPU-visible write with region interception.
    pub fn write(&mut self, addr: u16, value: u8) {
        match addr {
            // ROM region writes drive the mapper registers, never the
            // backing array.
            0x0000..=0x7FFF => self.mbc.register_write(addr, value),
            0x8000..=0x9FFF => {
                if !self.vram_locked {
                    self.data[addr as usize] = value;
                }
            }
            0xA000..=0xBFFF => match self.mbc.kind() {
                MbcKind::None => self.data[addr as usize] = value,
                MbcKind::Mbc1 => self.mbc.ram_write(addr, value),
            },
            0xE000..=0xFDFF => self.data[(addr - 0x2000) as usize] = value,
            0xFE00..=0xFE9F => {
                if !self.oam_locked {
                    self.data[addr as usize] = value;
                }
            }
            0xFF00 => joypad::write_p1(self, value),
            // DIV resets on any write regardless of the value.
            DIV => {
                self.data[addr as usize] = 0;
                self.div_reset = true;
            }
            // The trigger value is stored verbatim and the transfer armed.
            OAM_DMA => {
                self.data[addr as usize] = value;
                self.dma_request = Some(value);
            }
            // LY is read-only from the CPU side.
            LY => {}
            _ => self.data[addr as usize] = value,
        }
    }

    /// Lock-ignoring read used by the pixel pipeline and the DMA engine,
    /// both of which model the hardware side of the bus.
    pub(crate) fn read_raw(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3FFF => self.data[addr as usize],
            0x4000..=0x7FFF => match self.mbc.kind() {
                MbcKind::None => self.data[addr as usize],
                MbcKind::Mbc1 => self.mbc.rom_read(addr),
            },
            0xA000..=0xBFFF => match self.mbc.kind() {
                MbcKind::None => self.data[addr as usize],
                MbcKind::Mbc1 => self.mbc.ram_read(addr),
            },
            0xE000..=0xFDFF => self.data[(addr - 0x2000) as usize],
            _ => self.data[addr as usize],
        }
    }

    pub(crate) fn take_dma_request(&mut self) -> Option<u8> {
        self.dma_request.take()
    }

    pub(crate) fn take_div_reset(&mut self) -> bool {
        std::mem::replace(&mut self.div_reset, false)
    }
}
