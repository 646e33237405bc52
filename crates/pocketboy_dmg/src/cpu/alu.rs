use super::{Cpu, Flag};

impl Cpu {
    /// 8-bit ADD/ADC on A. `use_carry` selects ADC.
    pub(super) fn alu_add(&mut self, value: u8, use_carry: bool) {
        let a = self.regs.a;
        let carry_in = (use_carry && self.get_flag(Flag::C)) as u8;

        let half = (a & 0x0F) + (value & 0x0F) + carry_in;
        let full = a as u16 + value as u16 + carry_in as u16;
        let result = full as u8;

        self.regs.a = result;
        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::H, half > 0x0F);
        self.set_flag(Flag::C, full > 0xFF);
    }

    /// 8-bit SUB/SBC on A. `use_carry` selects SBC.
    pub(super) fn alu_sub(&mut self, value: u8, use_carry: bool) {
        let a = self.regs.a;
        let carry_in = (use_carry && self.get_flag(Flag::C)) as i16;

        let half = (a & 0x0F) as i16 - (value & 0x0F) as i16 - carry_in;
        let full = a as i16 - value as i16 - carry_in;
        let result = full as u8;

        self.regs.a = result;
        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::N, true);
        self.set_flag(Flag::H, half < 0);
        self.set_flag(Flag::C, full < 0);
    }

    #[inline]
    pub(super) fn alu_and(&mut self, value: u8) {
        let result = self.regs.a & value;
        self.regs.a = result;
        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::H, true);
    }

    #[inline]
    pub(super) fn alu_xor(&mut self, value: u8) {
        let result = self.regs.a ^ value;
        self.regs.a = result;
        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
    }

    #[inline]
    pub(super) fn alu_or(&mut self, value: u8) {
        let result = self.regs.a | value;
        self.regs.a = result;
        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
    }

    /// CP: flags as if `A - value`, A untouched.
    #[inline]
    pub(super) fn alu_cp(&mut self, value: u8) {
        let a = self.regs.a;
        let half = (a & 0x0F) as i16 - (value & 0x0F) as i16;
        let full = a as i16 - value as i16;

        self.clear_flags();
        self.set_flag(Flag::Z, full as u8 == 0);
        self.set_flag(Flag::N, true);
        self.set_flag(Flag::H, half < 0);
        self.set_flag(Flag::C, full < 0);
    }

    /// Decimal adjust A after BCD addition/subtraction.
    ///
    /// Driven by the previous N/H/C flags, re-inspecting A only for the
    /// "low nibble above 9" / "result above 0x99" cases of the addition
    /// path. Leaves N unchanged.
    pub(super) fn alu_daa(&mut self) {
        let mut a = self.regs.a;
        let mut adjust: u8 = if self.get_flag(Flag::C) { 0x60 } else { 0x00 };
        if self.get_flag(Flag::H) {
            adjust |= 0x06;
        }

        if self.get_flag(Flag::N) {
            a = a.wrapping_sub(adjust);
        } else {
            if a & 0x0F > 0x09 {
                adjust |= 0x06;
            }
            if a > 0x99 {
                adjust |= 0x60;
            }
            a = a.wrapping_add(adjust);
        }

        self.set_flag(Flag::C, adjust >= 0x60);
        self.set_flag(Flag::H, false);
        self.set_flag(Flag::Z, a == 0);
        self.regs.a = a;
    }

    /// INC r helper; C is untouched.
    #[inline]
    pub(super) fn alu_inc8(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::H, value & 0x0F == 0x0F);
        result
    }

    /// DEC r helper; C is untouched.
    #[inline]
    pub(super) fn alu_dec8(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::N, true);
        self.set_flag(Flag::H, value & 0x0F == 0);
        result
    }

    /// Low-byte half of `ADD HL,rr`: adds into L and returns the carry
    /// into the high byte. No flags change on this cycle.
    #[inline]
    pub(super) fn alu_add16_low(&mut self, value_lo: u8) -> bool {
        let (l, carry) = self.regs.l.overflowing_add(value_lo);
        self.regs.l = l;
        carry
    }

    /// High-byte half of `ADD HL,rr`: adds the high operand byte plus the
    /// low-byte carry into H and sets N/H/C. Z is unaffected.
    #[inline]
    pub(super) fn alu_add16_high(&mut self, value_hi: u8, carry_in: bool) {
        let h = self.regs.h;
        let carry = carry_in as u8;
        let half = (h & 0x0F) + (value_hi & 0x0F) + carry;
        let full = h as u16 + value_hi as u16 + carry as u16;

        self.regs.h = full as u8;
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::H, half > 0x0F);
        self.set_flag(Flag::C, full > 0xFF);
    }

    /// Signed-immediate 16-bit add used by ADD SP,e and LD HL,SP+e.
    ///
    /// H and C come from bits 3 and 7 of the low-byte addition; Z and N
    /// are cleared.
    #[inline]
    pub(super) fn alu_add16_signed(&mut self, base: u16, imm8: u8) -> u16 {
        let offset = imm8 as i8 as i16 as u16;
        self.clear_flags();
        self.set_flag(Flag::H, (base & 0x000F) + (offset & 0x000F) > 0x000F);
        self.set_flag(Flag::C, (base & 0x00FF) + (offset & 0x00FF) > 0x00FF);
        base.wrapping_add(offset)
    }

    /// Rotate left circular; Z is set from the result (the RLCA variant
    /// clears it afterwards).
    #[inline]
    pub(super) fn alu_rlc(&mut self, value: u8) -> u8 {
        let result = value.rotate_left(1);
        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::C, value & 0x80 != 0);
        result
    }

    #[inline]
    pub(super) fn alu_rrc(&mut self, value: u8) -> u8 {
        let result = value.rotate_right(1);
        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::C, value & 0x01 != 0);
        result
    }

    /// Rotate left through carry.
    #[inline]
    pub(super) fn alu_rl(&mut self, value: u8) -> u8 {
        let carry_in = self.get_flag(Flag::C) as u8;
        let result = (value << 1) | carry_in;
        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::C, value & 0x80 != 0);
        result
    }

    /// Rotate right through carry.
    #[inline]
    pub(super) fn alu_rr(&mut self, value: u8) -> u8 {
        let carry_in = (self.get_flag(Flag::C) as u8) << 7;
        let result = (value >> 1) | carry_in;
        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::C, value & 0x01 != 0);
        result
    }

    /// Arithmetic shift left.
    #[inline]
    pub(super) fn alu_sla(&mut self, value: u8) -> u8 {
        let result = value << 1;
        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::C, value & 0x80 != 0);
        result
    }

    /// Arithmetic shift right; bit 7 is preserved.
    #[inline]
    pub(super) fn alu_sra(&mut self, value: u8) -> u8 {
        let result = (value >> 1) | (value & 0x80);
        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::C, value & 0x01 != 0);
        result
    }

    /// Swap nibbles.
    #[inline]
    pub(super) fn alu_swap(&mut self, value: u8) -> u8 {
        let result = value.rotate_left(4);
        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
        result
    }

    /// Logical shift right.
    #[inline]
    pub(super) fn alu_srl(&mut self, value: u8) -> u8 {
        let result = value >> 1;
        self.clear_flags();
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::C, value & 0x01 != 0);
        result
    }

    /// BIT n: Z from the complement of the tested bit; C untouched.
    #[inline]
    pub(super) fn alu_bit(&mut self, bit: u8, value: u8) {
        self.set_flag(Flag::Z, value & (1 << bit) == 0);
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::H, true);
    }
}
