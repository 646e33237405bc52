use crate::interrupts;
use crate::memory::Memory;

use super::Cpu;

impl Cpu {
    /// Begin the five-cycle interrupt dispatch sequence.
    ///
    /// Called by the machine at a fetch boundary when IME is set and an
    /// enabled interrupt is pending. The opcode fetched on that boundary
    /// is abandoned: the return address pushed is the address it was
    /// fetched from, so the handler's RETI resumes exactly there.
    pub fn begin_interrupt_dispatch(&mut self) {
        self.ime = false;
        self.ei_pending = false;
        self.ei_delay = false;
        self.halted = false;
        self.pending_fetch = false;
        self.dispatch_ret = self.regs.pc.wrapping_sub(1);
        self.dispatch_cycle = 1;
    }

    /// One machine cycle of the dispatch sequence: two idle cycles, the
    /// two stack writes, then the jump to the vector.
    pub(super) fn step_dispatch(&mut self, memory: &mut Memory) {
        match self.dispatch_cycle {
            1 | 2 => {}
            3 => {
                let ret = self.dispatch_ret;
                self.push_byte(memory, (ret >> 8) as u8);
            }
            4 => {
                let ret = self.dispatch_ret;
                self.push_byte(memory, ret as u8);
            }
            _ => {
                // The pending set is re-sampled on the final cycle. If the
                // handler-to-be was disabled in the meantime the dispatch
                // falls through to 0x0000, as the hardware does.
                self.regs.pc = match interrupts::highest_priority(memory) {
                    Some(interrupt) => {
                        interrupts::acknowledge(memory, interrupt);
                        interrupt.vector()
                    }
                    None => 0x0000,
                };
                self.dispatch_cycle = 0;
                self.fetch(memory);
                return;
            }
        }
        self.dispatch_cycle += 1;
    }

    /// Leave HALT without running the handler (IME clear but work pending).
    pub fn wake(&mut self) {
        self.halted = false;
    }
}
