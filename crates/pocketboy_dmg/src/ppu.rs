//! Pixel pipeline (DMG PPU).
//!
//! Four modes per scanline, ticked in 2-clock units by the machine driver:
//! OAM scan (80 clocks), pixel transfer (variable, fetcher-driven), h-blank
//! (the remainder of the 456-clock line), and ten v-blank lines. Pixels are
//! produced by a background/window fetcher and an interrupting sprite
//! fetcher feeding two small FIFOs; the merge rule at the LCD is resolved
//! per pixel.

use bitflags::bitflags;
use log::debug;

use crate::interrupts::{self, Interrupt};
use crate::memory::{self, Memory};
use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

mod fetcher;
mod fifo;

#[cfg(test)]
mod tests;

use fifo::Fifo;

/// Clock ticks consumed per `tick` call.
pub const TICKS_PER_PPU_STEP: u32 = 2;
/// Fixed scanline budget in clock ticks.
pub const TICKS_PER_LINE: u32 = 456;
/// Clock ticks of the OAM scan mode.
const OAM_SCAN_TICKS: u32 = 80;
/// First v-blank line.
const VBLANK_START: u8 = 144;
/// Last line of the frame.
const LAST_LINE: u8 = 153;
/// Sprites collected per scanline, at most.
const LINE_SPRITE_CAP: usize = 10;

/// Monochrome shades for 2-bit color indices, white first.
pub const SHADES: [[u8; 3]; 4] = [[255, 255, 255], [190, 190, 190], [63, 63, 63], [0, 0, 0]];

bitflags! {
    /// LCD control register (0xFF40).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Lcdc: u8 {
        const BG_WIN_ENABLE = 0x01;
        const OBJ_ENABLE    = 0x02;
        const OBJ_SIZE      = 0x04;
        const BG_TILEMAP    = 0x08;
        const TILEDATA_8000 = 0x10;
        const WINDOW_ENABLE = 0x20;
        const WIN_TILEMAP   = 0x40;
        const LCD_ENABLE    = 0x80;
    }
}

bitflags! {
    /// Sprite attribute byte (OAM byte 3). Low bits are color-model only.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SpriteAttrs: u8 {
        const PALETTE     = 0x10;
        const X_FLIP      = 0x20;
        const Y_FLIP      = 0x40;
        const BG_PRIORITY = 0x80;
    }
}

/// STAT interrupt-source enable bits.
const STAT_SOURCE_HBLANK: u8 = 0x08;
const STAT_SOURCE_VBLANK: u8 = 0x10;
const STAT_SOURCE_OAM: u8 = 0x20;
const STAT_SOURCE_LYC: u8 = 0x40;
/// LYC coincidence flag.
const STAT_LYC_EQUAL: u8 = 0x04;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    HBlank,
    VBlank,
    OamScan,
    PixelTransfer,
}

impl Mode {
    /// Mode encoding in STAT bits 0-1.
    #[inline]
    fn bits(self) -> u8 {
        match self {
            Mode::HBlank => 0,
            Mode::VBlank => 1,
            Mode::OamScan => 2,
            Mode::PixelTransfer => 3,
        }
    }

    fn stat_source(self) -> u8 {
        match self {
            Mode::HBlank => STAT_SOURCE_HBLANK,
            Mode::VBlank => STAT_SOURCE_VBLANK,
            Mode::OamScan => STAT_SOURCE_OAM,
            Mode::PixelTransfer => 0,
        }
    }
}

/// One OAM entry, as collected during the scan.
#[derive(Clone, Copy, Debug, Default)]
struct Sprite {
    y: u8,
    x: u8,
    tile: u8,
    attrs: SpriteAttrs,
}

/// A background/window pixel waiting in the FIFO.
#[derive(Clone, Copy, Debug, Default)]
struct BgPixel {
    color: u8,
}

/// A sprite pixel waiting in the FIFO.
#[derive(Clone, Copy, Debug, Default)]
struct SpritePixel {
    color: u8,
    attrs: SpriteAttrs,
}

/// Background fetcher phase; each phase costs one 2-clock tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FetchPhase {
    TileIndex,
    TileLow,
    TileHigh,
    Push,
}

/// An in-flight sprite fetch, stalling the background fetcher.
struct SpriteFetch {
    sprite: Sprite,
    phase: u8,
    low: u8,
    high: u8,
}

pub struct Ppu {
    mode: Mode,
    /// Clock ticks elapsed within the current scanline.
    line_ticks: u32,

    // OAM scan state.
    oam_index: u8,
    line_sprites: Vec<Sprite>,

    // Background/window fetcher state.
    fetch_phase: FetchPhase,
    tile_x: u8,
    tile_index: u8,
    tile_low: u8,
    tile_high: u8,
    dummy_fetch: bool,
    /// Fine-scroll pixels still to drop at the start of the line.
    discard: u8,

    // Window state.
    wy_hit: bool,
    in_window: bool,
    window_line: u8,
    win_tile_x: u8,

    sprite_fetch: Option<SpriteFetch>,

    bg_fifo: Fifo<BgPixel>,
    sprite_fifo: Fifo<SpritePixel>,

    /// Output column, 0..160.
    lx: u8,

    framebuffer: Vec<u8>,
    frame_ready: bool,
    /// Tracks the enable bit so the enabled-to-disabled edge flushes the
    /// last rendered buffer exactly once.
    lcd_was_on: bool,
}

impl Ppu {
    pub fn new() -> Ppu {
        Ppu {
            mode: Mode::OamScan,
            line_ticks: 0,
            oam_index: 0,
            line_sprites: Vec::with_capacity(LINE_SPRITE_CAP),
            fetch_phase: FetchPhase::TileIndex,
            tile_x: 0,
            tile_index: 0,
            tile_low: 0,
            tile_high: 0,
            dummy_fetch: true,
            discard: 0,
            wy_hit: false,
            in_window: false,
            window_line: 0,
            win_tile_x: 0,
            sprite_fetch: None,
            bg_fifo: Fifo::new(),
            sprite_fifo: Fifo::new(),
            lx: 0,
            framebuffer: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT * 3],
            frame_ready: false,
            lcd_was_on: false,
        }
    }

    /// The last completed frame, RGB24, row-major 160x144.
    pub fn frame(&self) -> &[u8] {
        &self.framebuffer
    }

    /// True once per completed frame (or once on LCD disable); clears the
    /// flag.
    pub fn take_frame_ready(&mut self) -> bool {
        std::mem::take(&mut self.frame_ready)
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Advance the pipeline by one 2-clock tick.
    pub fn tick(&mut self, memory: &mut Memory) {
        let lcdc = Lcdc::from_bits_truncate(memory.data[memory::LCDC as usize]);
        if !lcdc.contains(Lcdc::LCD_ENABLE) {
            self.lcd_off(memory);
            return;
        }
        self.lcd_was_on = true;

        match self.mode {
            Mode::OamScan => self.tick_oam_scan(memory, lcdc),
            Mode::PixelTransfer => self.tick_pixel_transfer(memory, lcdc),
            Mode::HBlank | Mode::VBlank => {}
        }

        self.line_ticks += TICKS_PER_PPU_STEP;
        if self.line_ticks == TICKS_PER_LINE {
            self.line_ticks = 0;
            self.end_line(memory);
        }
    }

    /// Disabled LCD: no locks, mode held at OAM scan, LY held at 0. The
    /// buffer rendered before the disable is flushed once.
    fn lcd_off(&mut self, memory: &mut Memory) {
        if self.lcd_was_on {
            self.lcd_was_on = false;
            self.frame_ready = true;
            debug!("lcd disabled, flushing last frame");
        }
        memory.vram_locked = false;
        memory.oam_locked = false;
        self.mode = Mode::OamScan;
        self.line_ticks = 0;
        self.oam_index = 0;
        self.line_sprites.clear();
        self.wy_hit = false;
        self.window_line = 0;
        memory.data[memory::LY as usize] = 0;
        self.write_stat_mode(memory);
    }

    /// One OAM entry is examined per tick; 40 entries fill the 80-clock
    /// scan exactly.
    fn tick_oam_scan(&mut self, memory: &mut Memory, lcdc: Lcdc) {
        memory.oam_locked = true;

        if (self.oam_index as usize) < 40 {
            let base = 0xFE00 + self.oam_index as usize * 4;
            let sprite = Sprite {
                y: memory.data[base],
                x: memory.data[base + 1],
                tile: memory.data[base + 2],
                attrs: SpriteAttrs::from_bits_truncate(memory.data[base + 3]),
            };
            self.oam_index += 1;

            let height = if lcdc.contains(Lcdc::OBJ_SIZE) { 16 } else { 8 };
            let line = memory.data[memory::LY as usize] as u16 + 16;
            let top = sprite.y as u16;
            if sprite.x > 0
                && line >= top
                && line < top + height
                && self.line_sprites.len() < LINE_SPRITE_CAP
            {
                self.line_sprites.push(sprite);
            }
        }

        if self.line_ticks + TICKS_PER_PPU_STEP == OAM_SCAN_TICKS {
            // Leftmost sprite wins; the stable sort keeps OAM order for
            // equal x.
            self.line_sprites.sort_by_key(|s| s.x);
            self.enter_pixel_transfer(memory);
        }
    }

    fn enter_pixel_transfer(&mut self, memory: &mut Memory) {
        self.mode = Mode::PixelTransfer;
        memory.vram_locked = true;

        // The window activates for the rest of the frame once LY has
        // matched WY, even if WY changes afterwards.
        if memory.data[memory::LY as usize] == memory.data[memory::WY as usize] {
            self.wy_hit = true;
        }

        self.fetch_phase = FetchPhase::TileIndex;
        self.tile_x = 0;
        self.win_tile_x = 0;
        self.in_window = false;
        self.dummy_fetch = true;
        self.discard = memory.data[memory::SCX as usize] & 0x07;
        self.lx = 0;
        self.bg_fifo.clear();
        self.sprite_fifo.clear();
        self.sprite_fetch = None;

        self.write_stat_mode(memory);
    }

    /// One pixel-transfer tick: the fetcher (sprite fetch first if one is
    /// stalling the line) advances one phase, then up to two pixels leave
    /// for the LCD.
    fn tick_pixel_transfer(&mut self, memory: &mut Memory, lcdc: Lcdc) {
        if self.sprite_fetch.is_some() {
            self.step_sprite_fetch(memory, lcdc);
            return;
        }
        self.step_bg_fetch(memory, lcdc);

        for _ in 0..2 {
            // A sprite fetch started by the previous pixel stalls output
            // until its row has merged.
            if self.mode != Mode::PixelTransfer || self.sprite_fetch.is_some() {
                break;
            }
            self.output_pixel(memory, lcdc);
        }
    }

    /// Emit at most one pixel to the framebuffer.
    fn output_pixel(&mut self, memory: &mut Memory, lcdc: Lcdc) {
        // Fine horizontal scroll: pixels of the first tile below SCX are
        // popped and dropped before the visible column advances.
        if self.discard > 0 {
            if self.bg_fifo.pop().is_some() {
                self.discard -= 1;
            }
            return;
        }

        if self.start_window_if_due(memory, lcdc) {
            return;
        }
        if self.start_sprite_fetch_if_due(lcdc) {
            return;
        }

        let bg = match self.bg_fifo.pop() {
            Some(px) => px,
            None => return,
        };
        let sprite = self.sprite_fifo.pop();

        let bg_color = if lcdc.contains(Lcdc::BG_WIN_ENABLE) {
            bg.color
        } else {
            0
        };

        let shade = match sprite {
            Some(sp)
                if lcdc.contains(Lcdc::OBJ_ENABLE)
                    && sp.color != 0
                    && !(sp.attrs.contains(SpriteAttrs::BG_PRIORITY) && bg_color != 0) =>
            {
                let obp = if sp.attrs.contains(SpriteAttrs::PALETTE) {
                    memory.data[memory::OBP1 as usize]
                } else {
                    memory.data[memory::OBP0 as usize]
                };
                (obp >> (sp.color * 2)) & 0x03
            }
            _ => {
                let bgp = memory.data[memory::BGP as usize];
                (bgp >> (bg_color * 2)) & 0x03
            }
        };

        let ly = memory.data[memory::LY as usize] as usize;
        let offset = (ly * SCREEN_WIDTH + self.lx as usize) * 3;
        self.framebuffer[offset..offset + 3].copy_from_slice(&SHADES[shade as usize]);

        self.lx += 1;
        if self.lx as usize == SCREEN_WIDTH {
            self.enter_hblank(memory);
        }
    }

    fn enter_hblank(&mut self, memory: &mut Memory) {
        self.mode = Mode::HBlank;
        memory.vram_locked = false;
        memory.oam_locked = false;
        self.line_sprites.clear();
        if self.in_window {
            self.window_line += 1;
        }
        self.write_stat_mode(memory);
        self.raise_stat_for_mode(memory);
    }

    /// Scanline complete: advance LY and pick the next mode.
    fn end_line(&mut self, memory: &mut Memory) {
        let ly = memory.data[memory::LY as usize];
        match self.mode {
            Mode::HBlank => {
                self.set_ly(memory, ly + 1);
                if ly + 1 == VBLANK_START {
                    self.mode = Mode::VBlank;
                    self.write_stat_mode(memory);
                    self.raise_stat_for_mode(memory);
                    interrupts::request(memory, Interrupt::VBlank);
                } else {
                    self.start_oam_scan(memory);
                }
            }
            Mode::VBlank => {
                if ly == LAST_LINE {
                    // Completing line 153 is the frame boundary the driver
                    // paces on.
                    self.frame_ready = true;
                    self.set_ly(memory, 0);
                    self.wy_hit = false;
                    self.window_line = 0;
                    self.start_oam_scan(memory);
                } else {
                    self.set_ly(memory, ly + 1);
                }
            }
            // Pixel transfer never outlasts a line; OAM scan always hands
            // over at 80 ticks.
            Mode::OamScan | Mode::PixelTransfer => {
                debug_assert!(false, "scanline ended outside hblank/vblank");
            }
        }
    }

    fn start_oam_scan(&mut self, memory: &mut Memory) {
        self.mode = Mode::OamScan;
        self.oam_index = 0;
        self.line_sprites.clear();
        self.write_stat_mode(memory);
        self.raise_stat_for_mode(memory);
    }

    fn set_ly(&mut self, memory: &mut Memory, value: u8) {
        memory.data[memory::LY as usize] = value;

        let stat = memory.data[memory::STAT as usize];
        let equal = value == memory.data[memory::LYC as usize];
        if equal {
            memory.data[memory::STAT as usize] = stat | STAT_LYC_EQUAL;
            if stat & STAT_SOURCE_LYC != 0 {
                interrupts::request(memory, Interrupt::Stat);
            }
        } else {
            memory.data[memory::STAT as usize] = stat & !STAT_LYC_EQUAL;
        }
    }

    fn write_stat_mode(&self, memory: &mut Memory) {
        let stat = memory.data[memory::STAT as usize];
        memory.data[memory::STAT as usize] = (stat & !0x03) | self.mode.bits();
    }

    /// Raise the STAT interrupt for the mode just entered, at most once
    /// per entry.
    fn raise_stat_for_mode(&self, memory: &mut Memory) {
        let source = self.mode.stat_source();
        if source != 0 && memory.data[memory::STAT as usize] & source != 0 {
            interrupts::request(memory, Interrupt::Stat);
        }
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}
