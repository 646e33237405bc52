//! Interrupt controller.
//!
//! The two controller registers live in the shared address space (IF at
//! 0xFF0F, IE at 0xFFFF) so that the pixel pipeline, timer and joypad can
//! raise requests the same way real hardware does: through memory-mapped
//! bits, never by calling into the CPU. The CPU engine consumes them via
//! `highest_priority` during its dispatch sequence.

use crate::memory::{Memory, IE, IF};


/// Interrupt sources in priority order, highest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interrupt {
    VBlank,
    Stat,
    Timer,
    Serial,
    Joypad,
}

impl Interrupt {
    /// All sources, in dispatch priority order.
    pub const PRIORITY: [Interrupt; 5] = [
        Interrupt::VBlank,
        Interrupt::Stat,
        Interrupt::Timer,
        Interrupt::Serial,
        Interrupt::Joypad,
    ];

    #[inline]
    pub fn bit(self) -> u8 {
        match self {
            Interrupt::VBlank => 0x01,
            Interrupt::Stat => 0x02,
            Interrupt::Timer => 0x04,
            Interrupt::Serial => 0x08,
            Interrupt::Joypad => 0x10,
        }
    }

    /// Fixed dispatch vector.
    #[inline]
    pub fn vector(self) -> u16 {
        match self {
            Interrupt::VBlank => 0x40,
            Interrupt::Stat => 0x48,
            Interrupt::Timer => 0x50,
            Interrupt::Serial => 0x58,
            Interrupt::Joypad => 0x60,
        }
    }
}

/// OR the request bit for `source` into IF.
pub fn request(memory: &mut Memory, source: Interrupt) {
    memory.data[IF as usize] |= source.bit();
}

/// True when any source is both enabled and requested.
///
/// This is the HALT wake condition; it ignores the master-enable flag.
#[inline]
pub fn pending(memory: &Memory) -> bool {
    memory.data[IE as usize] & memory.data[IF as usize] & 0x1F != 0
}

/// Highest-priority source that is both enabled and requested.
pub fn highest_priority(memory: &Memory) -> Option<Interrupt> {
    let active = memory.data[IE as usize] & memory.data[IF as usize] & 0x1F;
    Interrupt::PRIORITY
        .into_iter()
        .find(|source| active & source.bit() != 0)
}

/// Clear the request bit for `source`; part of the dispatch sequence.
pub fn acknowledge(memory: &mut Memory, source: Interrupt) {
    memory.data[IF as usize] &= !source.bit();
}
