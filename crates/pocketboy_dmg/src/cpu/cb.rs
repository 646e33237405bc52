use crate::memory::Memory;

use super::{Cpu, R8};

/// Operation class encoded in bits 6-7 of an extended opcode.
#[derive(Clone, Copy, PartialEq, Eq)]
enum CbKind {
    RotShift,
    Bit,
    Res,
    Set,
}

impl CbKind {
    #[inline]
    fn of(opcode: u8) -> CbKind {
        match opcode >> 6 {
            0 => CbKind::RotShift,
            1 => CbKind::Bit,
            2 => CbKind::Res,
            _ => CbKind::Set,
        }
    }
}

impl Cpu {
    /// One machine cycle of a 0xCB-prefixed opcode.
    ///
    /// The extended map is completely regular: bits 6-7 select the class,
    /// bits 3-5 the rotate/shift variant or the bit number, bits 0-2 the
    /// operand register. Register forms take one cycle after the prefix;
    /// the (HL) forms add a read cycle, and a write cycle for everything
    /// except BIT.
    pub(super) fn exec_cb(&mut self, memory: &mut Memory) {
        let kind = CbKind::of(self.opcode);
        let sel = R8::from_bits(self.opcode);
        let bit = (self.opcode >> 3) & 0x07;

        if sel == R8::HlInd {
            match self.machine_cycle {
                1 => self.ctx.imm_lo = memory.read(self.regs.hl()),
                2 => {
                    let value = self.ctx.imm_lo;
                    match kind {
                        CbKind::Bit => {
                            self.alu_bit(bit, value);
                            self.fetch(memory);
                        }
                        CbKind::RotShift => {
                            let result = self.rot_shift(bit, value);
                            memory.write(self.regs.hl(), result);
                        }
                        CbKind::Res => memory.write(self.regs.hl(), value & !(1 << bit)),
                        CbKind::Set => memory.write(self.regs.hl(), value | (1 << bit)),
                    }
                }
                _ => self.fetch(memory),
            }
            return;
        }

        let value = self.read_r8(sel);
        match kind {
            CbKind::RotShift => {
                let result = self.rot_shift(bit, value);
                self.write_r8(sel, result);
            }
            CbKind::Bit => self.alu_bit(bit, value),
            CbKind::Res => self.write_r8(sel, value & !(1 << bit)),
            CbKind::Set => self.write_r8(sel, value | (1 << bit)),
        }
        self.fetch(memory);
    }

    /// Rotate/shift variant selected by bits 3-5 of the extended opcode.
    fn rot_shift(&mut self, variant: u8, value: u8) -> u8 {
        match variant {
            0 => self.alu_rlc(value),
            1 => self.alu_rrc(value),
            2 => self.alu_rl(value),
            3 => self.alu_rr(value),
            4 => self.alu_sla(value),
            5 => self.alu_sra(value),
            6 => self.alu_swap(value),
            _ => self.alu_srl(value),
        }
    }
}
