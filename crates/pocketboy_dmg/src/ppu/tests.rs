use super::*;
use crate::memory::{Memory, ROM_BANK_SIZE};
use crate::memory::{IF, LCDC, LY, LYC, OBP0, STAT, WX, WY};

/// Ticks per frame at 2 clocks per tick: 154 lines of 456 clocks.
const FRAME_TICKS: u32 = 154 * TICKS_PER_LINE / TICKS_PER_PPU_STEP;

fn test_memory() -> Memory {
    let mut rom = vec![0u8; 2 * ROM_BANK_SIZE];
    rom[0x147] = 0x00;
    let mut memory = Memory::new(&rom).unwrap();
    memory.data[IF as usize] = 0;
    memory
}

fn run(ppu: &mut Ppu, memory: &mut Memory, ticks: u32) {
    for _ in 0..ticks {
        ppu.tick(memory);
    }
}

/// Fill one 16-byte tile with a solid 2-bit color.
fn fill_tile(memory: &mut Memory, tile: usize, color: u8) {
    let low = if color & 0x01 != 0 { 0xFF } else { 0x00 };
    let high = if color & 0x02 != 0 { 0xFF } else { 0x00 };
    for row in 0..8 {
        memory.data[0x8000 + tile * 16 + row * 2] = low;
        memory.data[0x8000 + tile * 16 + row * 2 + 1] = high;
    }
}

fn pixel(ppu: &Ppu, x: usize, y: usize) -> [u8; 3] {
    let offset = (y * crate::SCREEN_WIDTH + x) * 3;
    let px = &ppu.frame()[offset..offset + 3];
    [px[0], px[1], px[2]]
}

#[test]
fn every_scanline_costs_exactly_456_ticks() {
    let mut memory = test_memory();
    let mut ppu = Ppu::new();

    // 154 lines per frame, twice over, without drift.
    for frame in 0..2 {
        let mut ticks = 0u32;
        loop {
            ppu.tick(&mut memory);
            ticks += 1;
            if ppu.take_frame_ready() {
                break;
            }
        }
        assert_eq!(ticks, FRAME_TICKS, "frame {}", frame);
    }
}

#[test]
fn modes_follow_the_documented_sequence() {
    let mut memory = test_memory();
    let mut ppu = Ppu::new();

    assert_eq!(ppu.mode(), Mode::OamScan);
    run(&mut ppu, &mut memory, 40); // 80 clocks
    assert_eq!(ppu.mode(), Mode::PixelTransfer);
    assert_eq!(memory.data[STAT as usize] & 0x03, 3);

    // Transfer ends somewhere before the line does.
    while ppu.mode() == Mode::PixelTransfer {
        ppu.tick(&mut memory);
    }
    assert_eq!(ppu.mode(), Mode::HBlank);
    assert_eq!(memory.data[STAT as usize] & 0x03, 0);

    while ppu.mode() == Mode::HBlank {
        ppu.tick(&mut memory);
    }
    assert_eq!(ppu.mode(), Mode::OamScan);
    assert_eq!(memory.data[LY as usize], 1);
}

#[test]
fn vram_and_oam_lock_during_transfer() {
    let mut memory = test_memory();
    let mut ppu = Ppu::new();

    run(&mut ppu, &mut memory, 1);
    assert!(memory.oam_locked);

    run(&mut ppu, &mut memory, 40);
    assert_eq!(ppu.mode(), Mode::PixelTransfer);
    assert!(memory.vram_locked);

    while ppu.mode() == Mode::PixelTransfer {
        ppu.tick(&mut memory);
    }
    assert!(!memory.vram_locked);
    assert!(!memory.oam_locked);
}

#[test]
fn vblank_interrupt_fires_at_line_144() {
    let mut memory = test_memory();
    let mut ppu = Ppu::new();

    while memory.data[LY as usize] < 144 {
        ppu.tick(&mut memory);
    }
    assert_eq!(ppu.mode(), Mode::VBlank);
    assert_ne!(memory.data[IF as usize] & 0x01, 0);
}

#[test]
fn lyc_match_raises_stat_when_enabled() {
    let mut memory = test_memory();
    let mut ppu = Ppu::new();
    memory.data[LYC as usize] = 5;
    memory.data[STAT as usize] = STAT_SOURCE_LYC;

    while memory.data[LY as usize] < 5 {
        ppu.tick(&mut memory);
    }
    assert_ne!(memory.data[STAT as usize] & STAT_LYC_EQUAL, 0);
    assert_ne!(memory.data[IF as usize] & 0x02, 0);

    // The flag drops again on the next line.
    memory.data[IF as usize] = 0;
    while memory.data[LY as usize] < 6 {
        ppu.tick(&mut memory);
    }
    assert_eq!(memory.data[STAT as usize] & STAT_LYC_EQUAL, 0);
}

#[test]
fn transparent_sprite_pixels_never_occlude_the_background() {
    let mut memory = test_memory();
    let mut ppu = Ppu::new();

    // BG: tile 0 everywhere, color 0 -> white through the default BGP.
    fill_tile(&mut memory, 0, 0);
    // Tile 1 is solid color 3 for the opaque sprite.
    fill_tile(&mut memory, 1, 3);
    memory.data[OBP0 as usize] = 0xFF; // every sprite color -> black

    // Sprite A: columns 0-7, fully transparent tile.
    memory.data[0xFE00] = 16;
    memory.data[0xFE01] = 8;
    memory.data[0xFE02] = 0;
    memory.data[0xFE03] = 0;
    // Sprite B: columns 8-15, solid tile.
    memory.data[0xFE04] = 16;
    memory.data[0xFE05] = 16;
    memory.data[0xFE06] = 1;
    memory.data[0xFE07] = 0;

    memory.data[LCDC as usize] = 0x93; // LCD + BG + OBJ, 0x8000 tiles

    run(&mut ppu, &mut memory, FRAME_TICKS);

    // Transparent sprite: background shows through.
    assert_eq!(pixel(&ppu, 0, 0), [255, 255, 255]);
    // Opaque sprite: drawn.
    assert_eq!(pixel(&ppu, 8, 0), [0, 0, 0]);
}

#[test]
fn bg_priority_sprites_hide_behind_nonzero_background() {
    let mut memory = test_memory();
    let mut ppu = Ppu::new();

    // BG solid color 3 -> black; sprite color 3 -> light gray via OBP0.
    fill_tile(&mut memory, 0, 3);
    fill_tile(&mut memory, 1, 3);
    memory.data[OBP0 as usize] = 0x55;

    // Priority-flagged sprite at columns 0-7.
    memory.data[0xFE00] = 16;
    memory.data[0xFE01] = 8;
    memory.data[0xFE02] = 1;
    memory.data[0xFE03] = 0x80;
    // Plain sprite at columns 8-15.
    memory.data[0xFE04] = 16;
    memory.data[0xFE05] = 16;
    memory.data[0xFE06] = 1;
    memory.data[0xFE07] = 0;

    memory.data[LCDC as usize] = 0x93;

    run(&mut ppu, &mut memory, FRAME_TICKS);

    // BGP maps color 3 to shade 3.
    assert_eq!(pixel(&ppu, 0, 0), [0, 0, 0]);
    assert_eq!(pixel(&ppu, 8, 0), [190, 190, 190]);
}

#[test]
fn window_replaces_the_background_from_wx() {
    let mut memory = test_memory();
    let mut ppu = Ppu::new();

    // BG map (0x9800) stays on tile 0 (white); window map (0x9C00) uses
    // tile 1 (black).
    fill_tile(&mut memory, 0, 0);
    fill_tile(&mut memory, 1, 3);
    for offset in 0..0x400 {
        memory.data[0x9C00 + offset] = 1;
    }
    memory.data[WY as usize] = 0;
    memory.data[WX as usize] = 7 + 80; // window starts at column 80
    memory.data[LCDC as usize] = 0xF1; // LCD + BG + window + win map 0x9C00

    run(&mut ppu, &mut memory, FRAME_TICKS);

    assert_eq!(pixel(&ppu, 79, 0), [255, 255, 255]);
    assert_eq!(pixel(&ppu, 80, 0), [0, 0, 0]);
    assert_eq!(pixel(&ppu, 159, 143), [0, 0, 0]);
}

#[test]
fn disabling_the_lcd_flushes_exactly_once_and_idles() {
    let mut memory = test_memory();
    let mut ppu = Ppu::new();

    // Render most of a line, then switch the LCD off.
    run(&mut ppu, &mut memory, 100);
    memory.data[LCDC as usize] = 0x11;

    ppu.tick(&mut memory);
    assert!(ppu.take_frame_ready());

    run(&mut ppu, &mut memory, 1000);
    assert!(!ppu.take_frame_ready());
    assert_eq!(memory.data[LY as usize], 0);
    assert_eq!(ppu.mode(), Mode::OamScan);
    assert!(!memory.vram_locked);
    assert!(!memory.oam_locked);
}

#[test]
fn disabled_bg_renders_color_zero() {
    let mut memory = test_memory();
    let mut ppu = Ppu::new();

    fill_tile(&mut memory, 0, 3);
    memory.data[LCDC as usize] = 0x90; // LCD on, BG disabled

    run(&mut ppu, &mut memory, FRAME_TICKS);
    // Color 0 through BGP 0xFC is shade 0.
    assert_eq!(pixel(&ppu, 40, 40), [255, 255, 255]);
}
