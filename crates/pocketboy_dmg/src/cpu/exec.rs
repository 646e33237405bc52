use crate::memory::Memory;

use super::{Cpu, CpuError, Flag, R16, R16Stack, R8};

impl Cpu {
    /// One machine cycle of the unprefixed opcode in flight.
    ///
    /// Every arm is a small state machine keyed by `machine_cycle`: early
    /// cycles fetch operands or touch memory, the final cycle commits the
    /// result and fetches the next opcode (the fetch/execute overlap of
    /// the real bus). The `_ =>` arm of each inner match is that final
    /// fetch cycle.
    pub(super) fn exec(&mut self, memory: &mut Memory) -> Result<(), CpuError> {
        match self.opcode {
            // NOP
            0x00 => self.fetch(memory),

            // LD rr,d16
            0x01 | 0x11 | 0x21 | 0x31 => match self.machine_cycle {
                1 => self.ctx.imm_lo = self.read_imm8(memory),
                2 => self.ctx.imm_hi = self.read_imm8(memory),
                _ => {
                    let rr = R16::from_bits(self.opcode >> 4);
                    self.write_r16(rr, self.ctx.imm16());
                    self.fetch(memory);
                }
            },

            // LD (BC),A / LD (DE),A
            0x02 | 0x12 => match self.machine_cycle {
                1 => {
                    let addr = self.read_r16(R16::from_bits(self.opcode >> 4));
                    memory.write(addr, self.regs.a);
                }
                _ => self.fetch(memory),
            },
            // LD (HL+),A / LD (HL-),A
            0x22 | 0x32 => match self.machine_cycle {
                1 => {
                    let hl = self.regs.hl();
                    memory.write(hl, self.regs.a);
                    let next = if self.opcode == 0x22 {
                        hl.wrapping_add(1)
                    } else {
                        hl.wrapping_sub(1)
                    };
                    self.regs.set_hl(next);
                }
                _ => self.fetch(memory),
            },

            // INC rr / DEC rr (no flags)
            0x03 | 0x13 | 0x23 | 0x33 | 0x0B | 0x1B | 0x2B | 0x3B => {
                match self.machine_cycle {
                    1 => {
                        let rr = R16::from_bits(self.opcode >> 4);
                        let value = self.read_r16(rr);
                        let next = if self.opcode & 0x08 == 0 {
                            value.wrapping_add(1)
                        } else {
                            value.wrapping_sub(1)
                        };
                        self.write_r16(rr, next);
                    }
                    _ => self.fetch(memory),
                }
            }

            // INC (HL) / DEC (HL)
            0x34 | 0x35 => match self.machine_cycle {
                1 => self.ctx.imm_lo = memory.read(self.regs.hl()),
                2 => {
                    let value = if self.opcode == 0x34 {
                        self.alu_inc8(self.ctx.imm_lo)
                    } else {
                        self.alu_dec8(self.ctx.imm_lo)
                    };
                    memory.write(self.regs.hl(), value);
                }
                _ => self.fetch(memory),
            },

            // INC r / DEC r
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x3C => {
                let r = R8::from_bits(self.opcode >> 3);
                let value = self.alu_inc8(self.read_r8(r));
                self.write_r8(r, value);
                self.fetch(memory);
            }
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x3D => {
                let r = R8::from_bits(self.opcode >> 3);
                let value = self.alu_dec8(self.read_r8(r));
                self.write_r8(r, value);
                self.fetch(memory);
            }

            // LD r,d8
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x3E => match self.machine_cycle {
                1 => self.ctx.imm_lo = self.read_imm8(memory),
                _ => {
                    let r = R8::from_bits(self.opcode >> 3);
                    self.write_r8(r, self.ctx.imm_lo);
                    self.fetch(memory);
                }
            },
            // LD (HL),d8
            0x36 => match self.machine_cycle {
                1 => self.ctx.imm_lo = self.read_imm8(memory),
                2 => memory.write(self.regs.hl(), self.ctx.imm_lo),
                _ => self.fetch(memory),
            },

            // Accumulator rotates; Z is always cleared here, unlike the
            // CB-prefixed forms.
            0x07 => {
                let value = self.alu_rlc(self.regs.a);
                self.regs.a = value;
                self.set_flag(Flag::Z, false);
                self.fetch(memory);
            }
            0x0F => {
                let value = self.alu_rrc(self.regs.a);
                self.regs.a = value;
                self.set_flag(Flag::Z, false);
                self.fetch(memory);
            }
            0x17 => {
                let value = self.alu_rl(self.regs.a);
                self.regs.a = value;
                self.set_flag(Flag::Z, false);
                self.fetch(memory);
            }
            0x1F => {
                let value = self.alu_rr(self.regs.a);
                self.regs.a = value;
                self.set_flag(Flag::Z, false);
                self.fetch(memory);
            }

            // LD (a16),SP
            0x08 => match self.machine_cycle {
                1 => self.ctx.imm_lo = self.read_imm8(memory),
                2 => self.ctx.imm_hi = self.read_imm8(memory),
                3 => memory.write(self.ctx.imm16(), self.regs.sp as u8),
                4 => memory.write(self.ctx.imm16().wrapping_add(1), (self.regs.sp >> 8) as u8),
                _ => self.fetch(memory),
            },

            // ADD HL,rr: carry computed twice, low byte first, then the
            // high byte plus the carry out of the low addition.
            0x09 | 0x19 | 0x29 | 0x39 => match self.machine_cycle {
                1 => {
                    let value = self.read_r16(R16::from_bits(self.opcode >> 4));
                    self.ctx.cond = self.alu_add16_low(value as u8);
                    self.ctx.temp = value;
                }
                _ => {
                    let carry = self.ctx.cond;
                    self.alu_add16_high((self.ctx.temp >> 8) as u8, carry);
                    self.fetch(memory);
                }
            },

            // LD A,(BC) / LD A,(DE)
            0x0A | 0x1A => match self.machine_cycle {
                1 => {
                    let addr = self.read_r16(R16::from_bits(self.opcode >> 4));
                    self.ctx.imm_lo = memory.read(addr);
                }
                _ => {
                    self.regs.a = self.ctx.imm_lo;
                    self.fetch(memory);
                }
            },
            // LD A,(HL+) / LD A,(HL-)
            0x2A | 0x3A => match self.machine_cycle {
                1 => {
                    let hl = self.regs.hl();
                    self.ctx.imm_lo = memory.read(hl);
                    let next = if self.opcode == 0x2A {
                        hl.wrapping_add(1)
                    } else {
                        hl.wrapping_sub(1)
                    };
                    self.regs.set_hl(next);
                }
                _ => {
                    self.regs.a = self.ctx.imm_lo;
                    self.fetch(memory);
                }
            },

            // STOP: low-power wait. Treated like HALT; the pad byte that
            // follows the opcode is consumed.
            0x10 => {
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.halted = true;
                self.pending_fetch = true;
            }

            // JR e
            0x18 => match self.machine_cycle {
                1 => self.ctx.imm_lo = self.read_imm8(memory),
                2 => {
                    // Offset is relative to the PC after the operand byte.
                    let offset = self.ctx.imm_lo as i8 as i16 as u16;
                    self.regs.pc = self.regs.pc.wrapping_add(offset);
                }
                _ => self.fetch(memory),
            },
            // JR cc,e: 3 cycles taken, 2 not taken.
            0x20 | 0x28 | 0x30 | 0x38 => match self.machine_cycle {
                1 => {
                    self.ctx.imm_lo = self.read_imm8(memory);
                    self.ctx.cond = self.condition();
                }
                2 => {
                    if self.ctx.cond {
                        let offset = self.ctx.imm_lo as i8 as i16 as u16;
                        self.regs.pc = self.regs.pc.wrapping_add(offset);
                    } else {
                        self.fetch(memory);
                    }
                }
                _ => self.fetch(memory),
            },

            0x27 => {
                self.alu_daa();
                self.fetch(memory);
            }
            0x2F => {
                self.regs.a = !self.regs.a;
                self.set_flag(Flag::N, true);
                self.set_flag(Flag::H, true);
                self.fetch(memory);
            }
            0x37 => {
                self.set_flag(Flag::N, false);
                self.set_flag(Flag::H, false);
                self.set_flag(Flag::C, true);
                self.fetch(memory);
            }
            0x3F => {
                let carry = self.get_flag(Flag::C);
                self.set_flag(Flag::N, false);
                self.set_flag(Flag::H, false);
                self.set_flag(Flag::C, !carry);
                self.fetch(memory);
            }

            // HALT: suspend until (IE & IF) != 0; the next opcode fetch
            // is deferred to the wake cycle.
            0x76 => {
                self.halted = true;
                self.pending_fetch = true;
            }

            // LD r,r' block, including the (HL) rows/columns.
            0x40..=0x7F => {
                let dst = R8::from_bits(self.opcode >> 3);
                let src = R8::from_bits(self.opcode);
                if dst == R8::HlInd {
                    match self.machine_cycle {
                        1 => memory.write(self.regs.hl(), self.read_r8(src)),
                        _ => self.fetch(memory),
                    }
                } else if src == R8::HlInd {
                    match self.machine_cycle {
                        1 => self.ctx.imm_lo = memory.read(self.regs.hl()),
                        _ => {
                            self.write_r8(dst, self.ctx.imm_lo);
                            self.fetch(memory);
                        }
                    }
                } else {
                    let value = self.read_r8(src);
                    self.write_r8(dst, value);
                    self.fetch(memory);
                }
            }

            // 8-bit ALU, register or (HL) operand.
            0x80..=0xBF => {
                let src = R8::from_bits(self.opcode);
                if src == R8::HlInd {
                    match self.machine_cycle {
                        1 => self.ctx.imm_lo = memory.read(self.regs.hl()),
                        _ => {
                            let value = self.ctx.imm_lo;
                            self.alu_dispatch(value);
                            self.fetch(memory);
                        }
                    }
                } else {
                    let value = self.read_r8(src);
                    self.alu_dispatch(value);
                    self.fetch(memory);
                }
            }

            // RET cc: 5 cycles taken, 2 not taken.
            0xC0 | 0xC8 | 0xD0 | 0xD8 => match self.machine_cycle {
                1 => self.ctx.cond = self.condition(),
                2 => {
                    if self.ctx.cond {
                        self.ctx.imm_lo = self.pop_byte(memory);
                    } else {
                        self.fetch(memory);
                    }
                }
                3 => self.ctx.imm_hi = self.pop_byte(memory),
                4 => self.regs.pc = self.ctx.imm16(),
                _ => self.fetch(memory),
            },

            // POP rr
            0xC1 | 0xD1 | 0xE1 | 0xF1 => match self.machine_cycle {
                1 => self.ctx.imm_lo = self.pop_byte(memory),
                2 => self.ctx.imm_hi = self.pop_byte(memory),
                _ => {
                    let value = self.ctx.imm16();
                    match R16Stack::from_bits(self.opcode >> 4) {
                        R16Stack::Bc => self.regs.set_bc(value),
                        R16Stack::De => self.regs.set_de(value),
                        R16Stack::Hl => self.regs.set_hl(value),
                        R16Stack::Af => self.regs.set_af(value),
                    }
                    self.fetch(memory);
                }
            },

            // JP cc,a16: 4 cycles taken, 3 not taken.
            0xC2 | 0xCA | 0xD2 | 0xDA => match self.machine_cycle {
                1 => self.ctx.imm_lo = self.read_imm8(memory),
                2 => {
                    self.ctx.imm_hi = self.read_imm8(memory);
                    self.ctx.cond = self.condition();
                }
                3 => {
                    if self.ctx.cond {
                        self.regs.pc = self.ctx.imm16();
                    } else {
                        self.fetch(memory);
                    }
                }
                _ => self.fetch(memory),
            },

            // JP a16
            0xC3 => match self.machine_cycle {
                1 => self.ctx.imm_lo = self.read_imm8(memory),
                2 => self.ctx.imm_hi = self.read_imm8(memory),
                3 => self.regs.pc = self.ctx.imm16(),
                _ => self.fetch(memory),
            },

            // CALL cc,a16: 6 cycles taken, 3 not taken.
            0xC4 | 0xCC | 0xD4 | 0xDC => match self.machine_cycle {
                1 => self.ctx.imm_lo = self.read_imm8(memory),
                2 => {
                    self.ctx.imm_hi = self.read_imm8(memory);
                    self.ctx.cond = self.condition();
                }
                3 => {
                    if !self.ctx.cond {
                        self.fetch(memory);
                    }
                    // Taken: internal delay before the stack writes.
                }
                4 => {
                    let ret = self.regs.pc;
                    self.push_byte(memory, (ret >> 8) as u8);
                }
                5 => {
                    let ret = self.regs.pc;
                    self.push_byte(memory, ret as u8);
                    self.regs.pc = self.ctx.imm16();
                }
                _ => self.fetch(memory),
            },

            // PUSH rr
            0xC5 | 0xD5 | 0xE5 | 0xF5 => match self.machine_cycle {
                1 => {
                    // Internal delay cycle before the first write.
                    self.ctx.temp = match R16Stack::from_bits(self.opcode >> 4) {
                        R16Stack::Bc => self.regs.bc(),
                        R16Stack::De => self.regs.de(),
                        R16Stack::Hl => self.regs.hl(),
                        R16Stack::Af => self.regs.af(),
                    };
                }
                2 => {
                    let hi = (self.ctx.temp >> 8) as u8;
                    self.push_byte(memory, hi);
                }
                3 => {
                    let lo = self.ctx.temp as u8;
                    self.push_byte(memory, lo);
                }
                _ => self.fetch(memory),
            },

            // ALU A,d8
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => match self.machine_cycle {
                1 => self.ctx.imm_lo = self.read_imm8(memory),
                _ => {
                    let value = self.ctx.imm_lo;
                    self.alu_dispatch(value);
                    self.fetch(memory);
                }
            },

            // RST n
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => match self.machine_cycle {
                1 => self.ctx.temp = (self.opcode & 0x38) as u16,
                2 => {
                    let ret = self.regs.pc;
                    self.push_byte(memory, (ret >> 8) as u8);
                }
                3 => {
                    let ret = self.regs.pc;
                    self.push_byte(memory, ret as u8);
                    self.regs.pc = self.ctx.temp;
                }
                _ => self.fetch(memory),
            },

            // RET / RETI. RETI restores IME immediately, without the EI
            // delay.
            0xC9 | 0xD9 => match self.machine_cycle {
                1 => self.ctx.imm_lo = self.pop_byte(memory),
                2 => self.ctx.imm_hi = self.pop_byte(memory),
                3 => {
                    self.regs.pc = self.ctx.imm16();
                    if self.opcode == 0xD9 {
                        self.ime = true;
                    }
                }
                _ => self.fetch(memory),
            },

            // 0xCB switches into extended decode mode for the next opcode.
            0xCB => self.fetch_cb(memory),

            // CALL a16
            0xCD => match self.machine_cycle {
                1 => self.ctx.imm_lo = self.read_imm8(memory),
                2 => self.ctx.imm_hi = self.read_imm8(memory),
                3 => {
                    // Internal delay before the stack writes.
                }
                4 => {
                    let ret = self.regs.pc;
                    self.push_byte(memory, (ret >> 8) as u8);
                }
                5 => {
                    let ret = self.regs.pc;
                    self.push_byte(memory, ret as u8);
                    self.regs.pc = self.ctx.imm16();
                }
                _ => self.fetch(memory),
            },

            // LDH (a8),A / LDH A,(a8)
            0xE0 => match self.machine_cycle {
                1 => self.ctx.imm_lo = self.read_imm8(memory),
                2 => memory.write(0xFF00 | self.ctx.imm_lo as u16, self.regs.a),
                _ => self.fetch(memory),
            },
            0xF0 => match self.machine_cycle {
                1 => self.ctx.imm_lo = self.read_imm8(memory),
                2 => self.regs.a = memory.read(0xFF00 | self.ctx.imm_lo as u16),
                _ => self.fetch(memory),
            },

            // LD (C),A / LD A,(C)
            0xE2 => match self.machine_cycle {
                1 => memory.write(0xFF00 | self.regs.c as u16, self.regs.a),
                _ => self.fetch(memory),
            },
            0xF2 => match self.machine_cycle {
                1 => self.ctx.imm_lo = memory.read(0xFF00 | self.regs.c as u16),
                _ => {
                    self.regs.a = self.ctx.imm_lo;
                    self.fetch(memory);
                }
            },

            // ADD SP,e
            0xE8 => match self.machine_cycle {
                1 => self.ctx.imm_lo = self.read_imm8(memory),
                2 => {
                    let imm = self.ctx.imm_lo;
                    self.ctx.temp = self.alu_add16_signed(self.regs.sp, imm);
                }
                3 => {
                    // Internal delay.
                }
                _ => {
                    self.regs.sp = self.ctx.temp;
                    self.fetch(memory);
                }
            },

            // JP HL
            0xE9 => {
                self.regs.pc = self.regs.hl();
                self.fetch(memory);
            }

            // LD (a16),A / LD A,(a16)
            0xEA => match self.machine_cycle {
                1 => self.ctx.imm_lo = self.read_imm8(memory),
                2 => self.ctx.imm_hi = self.read_imm8(memory),
                3 => memory.write(self.ctx.imm16(), self.regs.a),
                _ => self.fetch(memory),
            },
            0xFA => match self.machine_cycle {
                1 => self.ctx.imm_lo = self.read_imm8(memory),
                2 => self.ctx.imm_hi = self.read_imm8(memory),
                3 => self.ctx.imm_lo = memory.read(self.ctx.imm16()),
                _ => {
                    self.regs.a = self.ctx.imm_lo;
                    self.fetch(memory);
                }
            },

            // DI cancels any scheduled enable as well.
            0xF3 => {
                self.ime = false;
                self.ei_pending = false;
                self.ei_delay = false;
                self.fetch(memory);
            }
            // EI takes effect after the following instruction completes.
            0xFB => {
                self.ei_pending = true;
                self.fetch(memory);
            }

            // LD HL,SP+e
            0xF8 => match self.machine_cycle {
                1 => self.ctx.imm_lo = self.read_imm8(memory),
                2 => {
                    let imm = self.ctx.imm_lo;
                    let value = self.alu_add16_signed(self.regs.sp, imm);
                    self.regs.set_hl(value);
                }
                _ => self.fetch(memory),
            },
            // LD SP,HL
            0xF9 => match self.machine_cycle {
                1 => self.regs.sp = self.regs.hl(),
                _ => self.fetch(memory),
            },

            // Holes in the opcode map. The engine cannot guess a length
            // or an effect, so this is fatal.
            0xD3 | 0xDB | 0xDD | 0xE3 | 0xE4 | 0xEB | 0xEC | 0xED | 0xF4 | 0xFC | 0xFD => {
                return Err(CpuError::InvalidOpcode {
                    opcode: self.opcode,
                    pc: self.regs.pc.wrapping_sub(1),
                });
            }
        }

        Ok(())
    }

    /// ALU operation selected by bits 3-5 of the opcode, shared between
    /// the register forms (0x80-0xBF) and the d8 forms.
    fn alu_dispatch(&mut self, value: u8) {
        match (self.opcode >> 3) & 0x07 {
            0 => self.alu_add(value, false),
            1 => self.alu_add(value, true),
            2 => self.alu_sub(value, false),
            3 => self.alu_sub(value, true),
            4 => self.alu_and(value),
            5 => self.alu_xor(value),
            6 => self.alu_or(value),
            _ => self.alu_cp(value),
        }
    }
}
