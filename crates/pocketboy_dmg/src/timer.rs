use crate::interrupts::{self, Interrupt};
use crate::memory::{Memory, DIV, TAC, TIMA, TMA};


/// Timer and divider unit.
///
/// A 16-bit counter runs freely at the system clock; its top byte is the
/// visible DIV register. TIMA/TMA/TAC are thin views into the shared
/// memory: the timer owns nothing but the counter and the tick remainder
/// used to pace TIMA.
pub struct Timer {
    /// Free-running counter; DIV exposes the upper 8 bits.
    counter: u16,
    /// T-cycles accumulated towards the next TIMA increment.
    tima_ticks: u32,
}

impl Timer {
    pub fn new() -> Timer {
        Timer {
            // Seeded so DIV reads 0xAB at the cartridge entry point,
            // matching the state the boot ROM leaves behind.
            counter: 0xABCC,
            tima_ticks: 0,
        }
    }

    /// Advance by `ticks` T-cycles (the driver calls this once per machine
    /// cycle with 4).
    pub fn step(&mut self, memory: &mut Memory, ticks: u32) {
        if memory.take_div_reset() {
            self.counter = 0;
            self.tima_ticks = 0;
        }

        self.counter = self.counter.wrapping_add(ticks as u16);
        memory.data[DIV as usize] = (self.counter >> 8) as u8;

        let tac = memory.data[TAC as usize];
        if tac & 0x04 == 0 {
            return;
        }

        // TAC clock select, in T-cycles per TIMA increment. The headline
        // figures (256/4/16/64) are machine cycles; one machine cycle is
        // 4 T-cycles.
        let period = match tac & 0x03 {
            0x00 => 1024,
            0x01 => 16,
            0x02 => 64,
            _ => 256,
        };

        self.tima_ticks += ticks;
        while self.tima_ticks >= period {
            self.tima_ticks -= period;
            let (tima, overflow) = memory.data[TIMA as usize].overflowing_add(1);
            if overflow {
                memory.data[TIMA as usize] = memory.data[TMA as usize];
                interrupts::request(memory, Interrupt::Timer);
            } else {
                memory.data[TIMA as usize] = tima;
            }
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
