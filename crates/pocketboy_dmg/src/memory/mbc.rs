use super::{CartridgeError, RAM_BANK_SIZE, ROM_BANK_SIZE};

/// Which banking scheme the cartridge uses.
///
/// Kept as an explicit field so further mapper families can slot in
/// without reshaping the memory model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MbcKind {
    None,
    Mbc1,
}

/// Mapper state for banked cartridges.
///
/// Bank 0 lives in the flat address space (0x0000-0x3FFF); every bank
/// beyond it is owned here. Banks are allocated once at load time and
/// never resized.
pub(super) struct Mbc {
    kind: MbcKind,
    ram_enable: bool,
    rom_bank: u8,
    ram_bank: u8,
    banking_mode: u8,
    /// ROM banks 1..N; index 0 holds bank 1.
    rom_banks: Vec<Vec<u8>>,
    ram_banks: Vec<Vec<u8>>,
}

impl Mbc {
    pub(super) fn none() -> Mbc {
        Mbc {
            kind: MbcKind::None,
            ram_enable: false,
            rom_bank: 1,
            ram_bank: 0,
            banking_mode: 0,
            rom_banks: Vec::new(),
            ram_banks: Vec::new(),
        }
    }

    pub(super) fn mbc1(rom: &[u8]) -> Result<Mbc, CartridgeError> {
        // Header byte 0x148 encodes the bank count as 2^(code+1); only
        // codes 0x00-0x08 (32 KiB to 8 MiB) are defined.
        let size_code = rom[0x148];
        if size_code > 0x08 {
            return Err(CartridgeError::InvalidRomSize(size_code));
        }
        let declared_banks = 2usize << size_code;
        let available = rom.len() / ROM_BANK_SIZE;
        if available < declared_banks {
            return Err(CartridgeError::RomSizeMismatch {
                declared_banks,
                available,
            });
        }

        let mut rom_banks = Vec::with_capacity(declared_banks - 1);
        for bank in 1..declared_banks {
            let start = bank * ROM_BANK_SIZE;
            rom_banks.push(rom[start..start + ROM_BANK_SIZE].to_vec());
        }

        let ram_bank_count = match rom[0x149] {
            0x00 => 0,
            0x01 | 0x02 => 1,
            0x03 => 4,
            // Larger codes exist for other mappers; MBC1 can address at
            // most four banks through its 2-bit register.
            _ => 4,
        };
        let ram_banks = vec![vec![0xFF; RAM_BANK_SIZE]; ram_bank_count];

        Ok(Mbc {
            kind: MbcKind::Mbc1,
            ram_enable: false,
            rom_bank: 1,
            ram_bank: 0,
            banking_mode: 0,
            rom_banks,
            ram_banks,
        })
    }

    #[inline]
    pub(super) fn kind(&self) -> MbcKind {
        self.kind
    }

    /// Read from the switchable ROM window (0x4000-0x7FFF).
    ///
    /// The selected bank index is clamped to the banks actually present
    /// rather than indexing out of bounds.
    pub(super) fn rom_read(&self, addr: u16) -> u8 {
        if self.rom_banks.is_empty() {
            return 0xFF;
        }
        let bank = (self.rom_bank as usize).max(1).min(self.rom_banks.len());
        self.rom_banks[bank - 1][(addr as usize) & (ROM_BANK_SIZE - 1)]
    }

    /// Mapper register write, reached through any store into 0x0000-0x7FFF.
    pub(super) fn register_write(&mut self, addr: u16, value: u8) {
        if self.kind == MbcKind::None {
            return;
        }
        match addr {
            // RAM enable: a value with 0xA in the low nibble enables.
            0x0000..=0x1FFF => self.ram_enable = (value & 0x0F) == 0x0A,
            // ROM bank select, 5 bits; bank 0 is never directly
            // selectable and maps to bank 1.
            0x2000..=0x3FFF => {
                let mut bank = value & 0x1F;
                if bank == 0 {
                    bank = 1;
                }
                self.rom_bank = bank;
            }
            // RAM bank select, 2 bits.
            0x4000..=0x5FFF => self.ram_bank = value & 0x03,
            // Banking mode bit. Recorded; RAM access always resolves
            // through the selected RAM bank in this core.
            0x6000..=0x7FFF => self.banking_mode = value & 0x01,
            _ => {}
        }
    }

    pub(super) fn ram_read(&self, addr: u16) -> u8 {
        if !self.ram_enable || self.ram_banks.is_empty() {
            return 0xFF;
        }
        let bank = (self.ram_bank as usize).min(self.ram_banks.len() - 1);
        self.ram_banks[bank][(addr as usize - 0xA000) & (RAM_BANK_SIZE - 1)]
    }

    pub(super) fn ram_write(&mut self, addr: u16, value: u8) {
        if !self.ram_enable || self.ram_banks.is_empty() {
            return;
        }
        let bank = (self.ram_bank as usize).min(self.ram_banks.len() - 1);
        self.ram_banks[bank][(addr as usize - 0xA000) & (RAM_BANK_SIZE - 1)] = value;
    }
}
