use std::error::Error;
use std::fmt;

use crate::memory::Memory;

mod alu;
mod cb;
mod exec;
mod interrupts;
mod regs;

#[cfg(test)]
mod tests;

pub use regs::{Flag, Registers, R16, R16Stack, R8};

/// Fatal CPU conditions.
///
/// An unrecognized opcode means the engine cannot safely continue: it is
/// reported with the offending opcode and the address it was fetched from
/// instead of guessing at a length and running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuError {
    InvalidOpcode { opcode: u8, pc: u16 },
}

impl fmt::Display for CpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuError::InvalidOpcode { opcode, pc } => {
                write!(f, "invalid opcode 0x{:02X} at 0x{:04X}", opcode, pc)
            }
        }
    }
}

impl Error for CpuError {}

/// Scratch state for the instruction currently in flight.
///
/// Multi-byte operands arrive one machine cycle at a time; the low/high
/// bytes and the assembled 16-bit temporary live here rather than in
/// shared statics so that several machines can run side by side.
#[derive(Clone, Copy, Debug, Default)]
struct ExecContext {
    imm_lo: u8,
    imm_hi: u8,
    temp: u16,
    cond: bool,
}

impl ExecContext {
    #[inline]
    fn imm16(&self) -> u16 {
        u16::from_le_bytes([self.imm_lo, self.imm_hi])
    }
}

/// The LR35902 execution engine.
///
/// `step` advances exactly one machine cycle (4 clock ticks) of whichever
/// instruction is in flight. Each opcode is a small state machine keyed by
/// the per-instruction `machine_cycle` counter; the final cycle commits
/// results and fetches the next opcode, mirroring the fetch/execute
/// overlap of the real bus.
pub struct Cpu {
    pub regs: Registers,
    /// Opcode currently executing.
    opcode: u8,
    /// True while `opcode` comes from the 0xCB extended map.
    cb_prefixed: bool,
    /// 1-based machine-cycle counter within the current instruction;
    /// reset to 0 by each opcode fetch.
    machine_cycle: u8,
    ctx: ExecContext,
    /// Interrupt master enable.
    pub ime: bool,
    /// EI has executed; becomes `ei_delay` when EI's own cycle ends.
    ei_pending: bool,
    /// IME is raised once the instruction after EI completes.
    ei_delay: bool,
    /// Set by HALT; cleared by the machine when (IE & IF) != 0.
    pub halted: bool,
    /// An opcode fetch deferred past a HALT wake.
    pending_fetch: bool,
    /// True right after an opcode fetch: the boundary where interrupts
    /// may be serviced.
    just_fetched: bool,
    /// 0 when idle; 1..=5 while the interrupt dispatch sequence runs.
    dispatch_cycle: u8,
    /// Return address captured when dispatch begins.
    dispatch_ret: u16,
}

impl Cpu {
    pub fn new() -> Cpu {
        Cpu {
            regs: Registers::default(),
            opcode: 0,
            cb_prefixed: false,
            machine_cycle: 0,
            ctx: ExecContext::default(),
            ime: false,
            ei_pending: false,
            ei_delay: false,
            halted: false,
            pending_fetch: false,
            just_fetched: false,
            dispatch_cycle: 0,
            dispatch_ret: 0,
        }
    }

    /// Power-on register state (post boot ROM), then prime the pipeline
    /// with the first opcode fetch.
    pub fn reset(&mut self, memory: &mut Memory) {
        self.regs = Registers::default();
        self.regs.set_af(0x01B0);
        self.regs.set_bc(0x0013);
        self.regs.set_de(0x00D8);
        self.regs.set_hl(0x014D);
        self.regs.sp = 0xFFFE;
        self.regs.pc = 0x0100;
        self.ime = false;
        self.ei_pending = false;
        self.ei_delay = false;
        self.halted = false;
        self.pending_fetch = false;
        self.dispatch_cycle = 0;
        self.fetch(memory);
    }

    /// Advance one machine cycle.
    pub fn step(&mut self, memory: &mut Memory) -> Result<(), CpuError> {
        self.just_fetched = false;

        if self.dispatch_cycle > 0 {
            self.step_dispatch(memory);
            return Ok(());
        }
        if self.halted {
            return Ok(());
        }
        if self.pending_fetch {
            self.pending_fetch = false;
            self.fetch(memory);
            return Ok(());
        }

        self.machine_cycle += 1;
        if self.cb_prefixed {
            self.exec_cb(memory);
            Ok(())
        } else {
            self.exec(memory)
        }
    }

    /// True at an instruction boundary, where the machine may start the
    /// interrupt dispatch sequence.
    #[inline]
    pub fn at_fetch_boundary(&self) -> bool {
        self.just_fetched && self.dispatch_cycle == 0
    }

    /// Fetch the next opcode and finalize any scheduled EI.
    ///
    /// Every instruction's final machine cycle lands here, so this is
    /// also where the one-instruction EI delay advances: the enable
    /// scheduled by EI becomes visible only after the *following*
    /// instruction has completed.
    fn fetch(&mut self, memory: &mut Memory) {
        if self.ei_delay {
            self.ime = true;
            self.ei_delay = false;
        }
        if self.ei_pending {
            self.ei_delay = true;
            self.ei_pending = false;
        }

        self.opcode = memory.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        self.cb_prefixed = false;
        self.machine_cycle = 0;
        self.just_fetched = true;
    }

    /// Switch into extended decode mode for exactly the next opcode.
    ///
    /// The prefix byte does not occupy an instruction slot of its own:
    /// the cycle counter restarts so the extended opcode's state machine
    /// counts from 1.
    fn fetch_cb(&mut self, memory: &mut Memory) {
        self.opcode = memory.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        self.cb_prefixed = true;
        self.machine_cycle = 0;
    }

    /// Read an immediate operand byte and advance PC.
    #[inline]
    fn read_imm8(&mut self, memory: &Memory) -> u8 {
        let value = memory.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    #[inline]
    fn read_r8(&self, sel: R8) -> u8 {
        match sel {
            R8::B => self.regs.b,
            R8::C => self.regs.c,
            R8::D => self.regs.d,
            R8::E => self.regs.e,
            R8::H => self.regs.h,
            R8::L => self.regs.l,
            R8::A => self.regs.a,
            // Slot 6 is (HL); the opcode state machines handle the
            // memory cycle themselves and never reach here.
            R8::HlInd => unreachable!("register slot 6 addresses memory"),
        }
    }

    #[inline]
    fn write_r8(&mut self, sel: R8, value: u8) {
        match sel {
            R8::B => self.regs.b = value,
            R8::C => self.regs.c = value,
            R8::D => self.regs.d = value,
            R8::E => self.regs.e = value,
            R8::H => self.regs.h = value,
            R8::L => self.regs.l = value,
            R8::A => self.regs.a = value,
            R8::HlInd => unreachable!("register slot 6 addresses memory"),
        }
    }

    #[inline]
    fn read_r16(&self, sel: R16) -> u16 {
        match sel {
            R16::Bc => self.regs.bc(),
            R16::De => self.regs.de(),
            R16::Hl => self.regs.hl(),
            R16::Sp => self.regs.sp,
        }
    }

    #[inline]
    fn write_r16(&mut self, sel: R16, value: u16) {
        match sel {
            R16::Bc => self.regs.set_bc(value),
            R16::De => self.regs.set_de(value),
            R16::Hl => self.regs.set_hl(value),
            R16::Sp => self.regs.sp = value,
        }
    }

    /// Condition code from bits 3-4 of the opcode: NZ, Z, NC, C.
    #[inline]
    fn condition(&self) -> bool {
        match (self.opcode >> 3) & 0x03 {
            0 => !self.get_flag(Flag::Z),
            1 => self.get_flag(Flag::Z),
            2 => !self.get_flag(Flag::C),
            _ => self.get_flag(Flag::C),
        }
    }

    #[inline]
    fn push_byte(&mut self, memory: &mut Memory, value: u8) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        memory.write(self.regs.sp, value);
    }

    #[inline]
    fn pop_byte(&mut self, memory: &Memory) -> u8 {
        debug_assert!(self.regs.sp != 0xFFFF, "stack underflow during pop");
        let value = memory.read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        value
    }

    #[inline]
    pub fn get_flag(&self, flag: Flag) -> bool {
        self.regs.f & (1 << flag as u8) != 0
    }

    #[inline]
    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        if value {
            self.regs.f |= 1 << flag as u8;
        } else {
            self.regs.f &= !(1 << flag as u8);
        }
    }

    #[inline]
    fn clear_flags(&mut self) {
        self.regs.f = 0;
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
