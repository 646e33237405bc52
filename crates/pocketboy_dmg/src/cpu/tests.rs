use super::*;
use crate::memory::{Memory, IE, IF, ROM_BANK_SIZE};

/// Boot a machine with `program` placed at the cartridge entry point and
/// the first opcode already fetched.
fn boot_with(program: &[u8]) -> (Cpu, Memory) {
    let mut rom = vec![0u8; 2 * ROM_BANK_SIZE];
    rom[0x147] = 0x00;
    rom[0x100..0x100 + program.len()].copy_from_slice(program);
    let mut memory = Memory::new(&rom).unwrap();
    let mut cpu = Cpu::new();
    cpu.reset(&mut memory);
    (cpu, memory)
}

fn run(cpu: &mut Cpu, memory: &mut Memory, mcycles: u32) {
    for _ in 0..mcycles {
        cpu.step(memory).unwrap();
    }
}

#[test]
fn reset_applies_power_on_state() {
    let (cpu, _memory) = boot_with(&[0x00]);
    assert_eq!(cpu.regs.af(), 0x01B0);
    assert_eq!(cpu.regs.bc(), 0x0013);
    assert_eq!(cpu.regs.de(), 0x00D8);
    assert_eq!(cpu.regs.hl(), 0x014D);
    assert_eq!(cpu.regs.sp, 0xFFFE);
    // The first opcode is already fetched.
    assert_eq!(cpu.regs.pc, 0x0101);
    assert!(cpu.at_fetch_boundary());
}

#[test]
fn ld_r16_imm16_takes_three_cycles() {
    // LD SP,0x1234
    let (mut cpu, mut memory) = boot_with(&[0x31, 0x34, 0x12]);
    run(&mut cpu, &mut memory, 3);
    assert_eq!(cpu.regs.sp, 0x1234);
    // The third cycle committed SP and fetched the opcode at 0x0103.
    assert_eq!(cpu.regs.pc, 0x0104);
    assert_eq!(cpu.machine_cycle, 0);
}

#[test]
fn ld_a16_sp_writes_both_bytes() {
    // LD (0xFF7F),SP
    let (mut cpu, mut memory) = boot_with(&[0x08, 0x7F, 0xFF]);
    cpu.regs.sp = 0x1020;
    run(&mut cpu, &mut memory, 5);
    assert_eq!(memory.data[0xFF7F], 0x20);
    assert_eq!(memory.data[0xFF80], 0x10);
    assert_eq!(cpu.regs.pc, 0x0104);
}

#[test]
fn add_hl_sets_carries_and_leaves_zero_alone() {
    // ADD HL,BC with HL=0xFFFF, BC=0x2030
    let (mut cpu, mut memory) = boot_with(&[0x09]);
    cpu.regs.set_hl(0xFFFF);
    cpu.regs.set_bc(0x2030);
    cpu.set_flag(Flag::Z, true);
    run(&mut cpu, &mut memory, 2);
    assert_eq!(cpu.regs.hl(), 0x202F);
    assert!(cpu.get_flag(Flag::C));
    assert!(cpu.get_flag(Flag::H));
    assert!(!cpu.get_flag(Flag::N));
    assert!(cpu.get_flag(Flag::Z));
}

#[test]
fn daa_adjusts_bcd_addition() {
    // ADD A,0x45 ; DAA   with A=0x38: 0x7D adjusts to 0x83.
    let (mut cpu, mut memory) = boot_with(&[0xC6, 0x45, 0x27]);
    cpu.regs.a = 0x38;
    run(&mut cpu, &mut memory, 2);
    assert_eq!(cpu.regs.a, 0x7D);
    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.a, 0x83);
    assert!(!cpu.get_flag(Flag::C));
    assert!(!cpu.get_flag(Flag::H));
    assert!(!cpu.get_flag(Flag::Z));
}

#[test]
fn daa_adjusts_bcd_subtraction() {
    // SUB 0x05 ; DAA   with A=0x42: 0x3D adjusts back to 0x37.
    let (mut cpu, mut memory) = boot_with(&[0xD6, 0x05, 0x27]);
    cpu.regs.a = 0x42;
    run(&mut cpu, &mut memory, 3);
    assert_eq!(cpu.regs.a, 0x37);
    assert!(cpu.get_flag(Flag::N));
}

#[test]
fn jr_offset_is_relative_to_the_next_instruction() {
    // JR +2 at 0x0100 lands on 0x0104.
    let (mut cpu, mut memory) = boot_with(&[0x18, 0x02]);
    run(&mut cpu, &mut memory, 3);
    assert_eq!(cpu.regs.pc, 0x0105);
}

#[test]
fn jr_backwards() {
    // NOP ; JR -3 jumps back to the NOP.
    let (mut cpu, mut memory) = boot_with(&[0x00, 0x18, 0xFD]);
    run(&mut cpu, &mut memory, 4);
    assert_eq!(cpu.regs.pc, 0x0101);
}

#[test]
fn jr_not_taken_is_shorter() {
    // JR NZ with Z set: two cycles, fall through.
    let (mut cpu, mut memory) = boot_with(&[0x20, 0x10]);
    cpu.set_flag(Flag::Z, true);
    run(&mut cpu, &mut memory, 2);
    assert_eq!(cpu.regs.pc, 0x0103);
}

#[test]
fn call_pushes_return_address_and_ret_restores_it() {
    // CALL 0x0150 ... 0x0150: RET
    let (mut cpu, mut memory) = boot_with(&[0xCD, 0x50, 0x01]);
    memory.data[0x0150] = 0xC9;

    run(&mut cpu, &mut memory, 6);
    assert_eq!(cpu.regs.pc, 0x0151);
    assert_eq!(cpu.regs.sp, 0xFFFC);
    assert_eq!(memory.data[0xFFFD], 0x01);
    assert_eq!(memory.data[0xFFFC], 0x03);

    run(&mut cpu, &mut memory, 4);
    assert_eq!(cpu.regs.pc, 0x0104);
    assert_eq!(cpu.regs.sp, 0xFFFE);
}

#[test]
fn call_not_taken_takes_three_cycles() {
    // CALL NZ with Z set.
    let (mut cpu, mut memory) = boot_with(&[0xC4, 0x50, 0x01]);
    cpu.set_flag(Flag::Z, true);
    run(&mut cpu, &mut memory, 3);
    assert_eq!(cpu.regs.pc, 0x0104);
    assert_eq!(cpu.regs.sp, 0xFFFE);
}

#[test]
fn rst_jumps_to_fixed_vector() {
    let (mut cpu, mut memory) = boot_with(&[0xEF]); // RST 0x28
    run(&mut cpu, &mut memory, 4);
    assert_eq!(cpu.regs.pc, 0x0029);
    assert_eq!(memory.data[0xFFFD], 0x01);
    assert_eq!(memory.data[0xFFFC], 0x01);
}

#[test]
fn pop_af_masks_the_flag_low_nibble() {
    // PUSH BC ; POP AF   with BC=0x12FF.
    let (mut cpu, mut memory) = boot_with(&[0xC5, 0xF1]);
    cpu.regs.set_bc(0x12FF);
    run(&mut cpu, &mut memory, 7);
    assert_eq!(cpu.regs.af(), 0x12F0);
}

#[test]
fn ei_enables_after_the_following_instruction() {
    // EI ; NOP ; NOP
    let (mut cpu, mut memory) = boot_with(&[0xFB, 0x00, 0x00]);
    run(&mut cpu, &mut memory, 1);
    assert!(!cpu.ime);
    run(&mut cpu, &mut memory, 1);
    assert!(cpu.ime);
}

#[test]
fn di_cancels_a_scheduled_enable() {
    // EI ; DI ; NOP
    let (mut cpu, mut memory) = boot_with(&[0xFB, 0xF3, 0x00]);
    run(&mut cpu, &mut memory, 3);
    assert!(!cpu.ime);
}

#[test]
fn reti_restores_ime_immediately() {
    let (mut cpu, mut memory) = boot_with(&[0xD9]);
    cpu.regs.sp = 0xFFFC;
    memory.data[0xFFFC] = 0x50;
    memory.data[0xFFFD] = 0x01;
    memory.data[0x0150] = 0x00;
    run(&mut cpu, &mut memory, 4);
    assert_eq!(cpu.regs.pc, 0x0151);
    assert!(cpu.ime);
}

#[test]
fn halt_stops_stepping_until_woken() {
    let (mut cpu, mut memory) = boot_with(&[0x76, 0x00]);
    run(&mut cpu, &mut memory, 1);
    assert!(cpu.halted);
    let pc = cpu.regs.pc;
    run(&mut cpu, &mut memory, 5);
    assert_eq!(cpu.regs.pc, pc);

    cpu.wake();
    run(&mut cpu, &mut memory, 1);
    // The deferred fetch grabbed the NOP after the HALT.
    assert_eq!(cpu.regs.pc, 0x0102);
    assert!(cpu.at_fetch_boundary());
}

#[test]
fn invalid_opcode_reports_opcode_and_pc() {
    let (mut cpu, mut memory) = boot_with(&[0xD3]);
    assert_eq!(
        cpu.step(&mut memory),
        Err(CpuError::InvalidOpcode {
            opcode: 0xD3,
            pc: 0x0100
        })
    );
}

#[test]
fn alu_register_forms_take_one_cycle() {
    // ADD A,B ; XOR A
    let (mut cpu, mut memory) = boot_with(&[0x80, 0xAF]);
    cpu.regs.a = 0x3A;
    cpu.regs.b = 0xC6;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.a, 0x00);
    assert!(cpu.get_flag(Flag::Z));
    assert!(cpu.get_flag(Flag::C));
    assert!(cpu.get_flag(Flag::H));

    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.a, 0x00);
    assert!(cpu.get_flag(Flag::Z));
    assert!(!cpu.get_flag(Flag::C));
}

#[test]
fn alu_hl_indirect_takes_two_cycles() {
    // CP (HL)
    let (mut cpu, mut memory) = boot_with(&[0xBE]);
    cpu.regs.a = 0x40;
    cpu.regs.set_hl(0xC000);
    memory.data[0xC000] = 0x41;
    run(&mut cpu, &mut memory, 2);
    assert_eq!(cpu.regs.a, 0x40);
    assert!(cpu.get_flag(Flag::N));
    assert!(cpu.get_flag(Flag::C));
    assert_eq!(cpu.regs.pc, 0x0102);
}

#[test]
fn ld_hl_plus_walks_the_pointer() {
    // LD A,(HL+) ; LD (HL-),A
    let (mut cpu, mut memory) = boot_with(&[0x2A, 0x32]);
    cpu.regs.set_hl(0xC000);
    memory.data[0xC000] = 0x7E;
    run(&mut cpu, &mut memory, 2);
    assert_eq!(cpu.regs.a, 0x7E);
    assert_eq!(cpu.regs.hl(), 0xC001);
    run(&mut cpu, &mut memory, 2);
    assert_eq!(memory.data[0xC001], 0x7E);
    assert_eq!(cpu.regs.hl(), 0xC000);
}

#[test]
fn ldh_uses_the_high_page() {
    // LDH (0x80),A ; LDH A,(0x81)
    let (mut cpu, mut memory) = boot_with(&[0xE0, 0x80, 0xF0, 0x81]);
    cpu.regs.a = 0x5C;
    memory.data[0xFF81] = 0x9D;
    run(&mut cpu, &mut memory, 3);
    assert_eq!(memory.data[0xFF80], 0x5C);
    run(&mut cpu, &mut memory, 3);
    assert_eq!(cpu.regs.a, 0x9D);
}

#[test]
fn add_sp_signed_flags_come_from_the_low_byte() {
    // ADD SP,-1 with SP=0x0000: wraps to 0xFFFF, no carries out of the
    // low byte of the unsigned addition.
    let (mut cpu, mut memory) = boot_with(&[0xE8, 0xFF]);
    cpu.regs.sp = 0x0000;
    run(&mut cpu, &mut memory, 4);
    assert_eq!(cpu.regs.sp, 0xFFFF);
    assert!(!cpu.get_flag(Flag::Z));
    assert!(!cpu.get_flag(Flag::N));
    assert!(!cpu.get_flag(Flag::H));
    assert!(!cpu.get_flag(Flag::C));
}

#[test]
fn ld_hl_sp_plus_offset() {
    // LD HL,SP+0x08 with SP=0xFFF8.
    let (mut cpu, mut memory) = boot_with(&[0xF8, 0x08]);
    cpu.regs.sp = 0xFFF8;
    run(&mut cpu, &mut memory, 3);
    assert_eq!(cpu.regs.hl(), 0x0000);
    assert!(cpu.get_flag(Flag::H));
    assert!(cpu.get_flag(Flag::C));
    assert!(!cpu.get_flag(Flag::Z));
}

#[test]
fn cb_swap_takes_two_cycles() {
    // SWAP A
    let (mut cpu, mut memory) = boot_with(&[0xCB, 0x37]);
    cpu.regs.a = 0xF0;
    run(&mut cpu, &mut memory, 2);
    assert_eq!(cpu.regs.a, 0x0F);
    assert!(!cpu.get_flag(Flag::Z));
    assert_eq!(cpu.regs.pc, 0x0103);
}

#[test]
fn cb_bit_hl_takes_three_cycles() {
    // BIT 7,(HL)
    let (mut cpu, mut memory) = boot_with(&[0xCB, 0x7E]);
    cpu.regs.set_hl(0xC000);
    memory.data[0xC000] = 0x7F;
    run(&mut cpu, &mut memory, 3);
    assert!(cpu.get_flag(Flag::Z));
    assert!(cpu.get_flag(Flag::H));
    assert_eq!(cpu.regs.pc, 0x0103);
}

#[test]
fn cb_res_hl_takes_four_cycles() {
    // RES 0,(HL)
    let (mut cpu, mut memory) = boot_with(&[0xCB, 0x86]);
    cpu.regs.set_hl(0xC000);
    memory.data[0xC000] = 0xFF;
    run(&mut cpu, &mut memory, 4);
    assert_eq!(memory.data[0xC000], 0xFE);
    assert_eq!(cpu.regs.pc, 0x0103);
}

#[test]
fn rlca_always_clears_zero() {
    let (mut cpu, mut memory) = boot_with(&[0x07]);
    cpu.regs.a = 0x80;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.a, 0x01);
    assert!(cpu.get_flag(Flag::C));
    assert!(!cpu.get_flag(Flag::Z));
}

#[test]
fn interrupt_dispatch_takes_five_cycles_and_clears_the_request() {
    let (mut cpu, mut memory) = boot_with(&[0x00, 0x00]);
    memory.data[IE as usize] = 0x01;
    memory.data[IF as usize] = 0x01;
    cpu.ime = true;

    // What the machine does at a fetch boundary with work pending.
    assert!(cpu.at_fetch_boundary());
    cpu.begin_interrupt_dispatch();
    run(&mut cpu, &mut memory, 5);

    // Jumped to the VBlank vector and fetched there.
    assert_eq!(cpu.regs.pc, 0x0041);
    assert!(!cpu.ime);
    assert_eq!(cpu.regs.sp, 0xFFFC);
    assert_eq!(memory.data[0xFFFD], 0x01);
    assert_eq!(memory.data[0xFFFC], 0x00);
    assert_eq!(memory.data[IF as usize] & 0x01, 0);
}

#[test]
fn dispatch_prefers_the_higher_priority_source() {
    let (mut cpu, mut memory) = boot_with(&[0x00]);
    memory.data[IE as usize] = 0x1F;
    memory.data[IF as usize] = 0x06; // Stat + Timer
    cpu.ime = true;

    cpu.begin_interrupt_dispatch();
    run(&mut cpu, &mut memory, 5);
    assert_eq!(cpu.regs.pc, 0x0049); // Stat vector, fetched past it.
    assert_eq!(memory.data[IF as usize], 0x04);
}
