use super::*;
use crate::memory::{ROM_BANK_SIZE, OAM_DMA};

fn test_memory() -> Memory {
    let mut rom = vec![0u8; 2 * ROM_BANK_SIZE];
    rom[0x147] = 0x00;
    Memory::new(&rom).unwrap()
}

#[test]
fn transfer_copies_exactly_160_bytes_then_disarms() {
    let mut memory = test_memory();
    let mut dma = Dma::new();

    // Pattern in work RAM page 0xC1.
    for i in 0..DMA_LENGTH {
        memory.data[0xC100 + i as usize] = (i as u8).wrapping_mul(3);
    }
    // One byte past the window must not be copied.
    memory.data[0xC100 + DMA_LENGTH as usize] = 0xEE;

    memory.write(OAM_DMA, 0xC1);
    assert!(!dma.is_active());

    // 160 bytes at 4 per machine cycle.
    for _ in 0..40 {
        dma.step(&mut memory);
    }
    assert!(!dma.is_active());

    for i in 0..DMA_LENGTH {
        assert_eq!(
            memory.data[0xFE00 + i as usize],
            (i as u8).wrapping_mul(3),
            "byte {} mismatch",
            i
        );
    }
    assert_ne!(memory.data[0xFEA0], 0xEE);
}

#[test]
fn idle_engine_leaves_oam_alone() {
    let mut memory = test_memory();
    let mut dma = Dma::new();
    memory.data[0xFE00] = 0x5A;
    dma.step(&mut memory);
    assert_eq!(memory.data[0xFE00], 0x5A);
}

#[test]
fn source_reads_resolve_through_the_mapper() {
    // Banked cartridge: DMA from the switchable window must read the
    // selected bank, not the flat array.
    let mut rom = vec![0u8; 4 * ROM_BANK_SIZE];
    for bank in 0..4usize {
        let start = bank * ROM_BANK_SIZE;
        rom[start..start + ROM_BANK_SIZE].fill(bank as u8 * 16 + 7);
    }
    rom[0x147] = 0x01;
    rom[0x148] = 1;
    rom[0x149] = 0x00;
    let mut memory = Memory::new(&rom).unwrap();
    let mut dma = Dma::new();

    memory.write(0x2000, 0x02); // select bank 2
    memory.write(OAM_DMA, 0x40);
    for _ in 0..40 {
        dma.step(&mut memory);
    }
    assert_eq!(memory.data[0xFE00], 0x27);
    assert_eq!(memory.data[0xFE9F], 0x27);
}

#[test]
fn retrigger_restarts_from_the_new_page() {
    let mut memory = test_memory();
    let mut dma = Dma::new();

    memory.data[0xC000] = 0x11;
    memory.data[0xD000] = 0x22;

    memory.write(OAM_DMA, 0xC0);
    dma.step(&mut memory);
    assert_eq!(memory.data[0xFE00], 0x11);

    memory.write(OAM_DMA, 0xD0);
    dma.step(&mut memory);
    assert_eq!(memory.data[0xFE00], 0x22);
}
