use crate::memory::Memory;

#[cfg(test)]
mod tests;

/// Length of an OAM DMA transfer: the full sprite attribute table.
pub const DMA_LENGTH: u16 = 160;
/// Bytes copied per driver tick (one machine cycle).
const BYTES_PER_TICK: u16 = 4;

/// OAM DMA engine.
///
/// A write to the trigger register (0xFF46) latches a source page; while
/// armed, every machine cycle moves four bytes from `page << 8` into the
/// sprite attribute table until all 160 bytes are across, then the engine
/// disarms itself.
pub struct Dma {
    active: bool,
    source: u16,
    offset: u16,
}

impl Dma {
    pub fn new() -> Dma {
        Dma {
            active: false,
            source: 0,
            offset: 0,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advance by one machine cycle.
    pub fn step(&mut self, memory: &mut Memory) {
        if let Some(page) = memory.take_dma_request() {
            self.active = true;
            self.source = (page as u16) << 8;
            self.offset = 0;
        }
        if !self.active {
            return;
        }

        for _ in 0..BYTES_PER_TICK {
            let byte = memory.read_raw(self.source.wrapping_add(self.offset));
            memory.data[0xFE00 + self.offset as usize] = byte;
            self.offset += 1;
            if self.offset == DMA_LENGTH {
                self.active = false;
                break;
            }
        }
    }
}

impl Default for Dma {
    fn default() -> Self {
        Self::new()
    }
}
