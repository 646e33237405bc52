//! Tile fetchers feeding the two pixel FIFOs.
//!
//! The background/window fetcher is a four-phase loop advancing one phase
//! per 2-clock tick. Sprite fetches interrupt it whenever the next pixel
//! to leave the FIFO lands on a collected sprite's column.

use crate::memory::{self, Memory};

use super::{BgPixel, FetchPhase, Lcdc, Ppu, SpriteAttrs, SpriteFetch, SpritePixel};

impl Ppu {
    /// Enter window rendering if this output column crosses WX-7 on a
    /// line where WY has already matched. The fetcher restarts on the
    /// window map and the queued background pixels are discarded.
    pub(super) fn start_window_if_due(&mut self, memory: &Memory, lcdc: Lcdc) -> bool {
        if self.in_window
            || !lcdc.contains(Lcdc::WINDOW_ENABLE)
            || !self.wy_hit
            || self.lx != memory.data[memory::WX as usize].wrapping_sub(7)
        {
            return false;
        }
        self.in_window = true;
        self.win_tile_x = 0;
        self.fetch_phase = FetchPhase::TileIndex;
        self.bg_fifo.clear();
        true
    }

    /// Begin a sprite fetch if the next FIFO pop lands on a collected
    /// sprite. Sprites clipped at the left edge (x < 8) trigger on the
    /// first column.
    pub(super) fn start_sprite_fetch_if_due(&mut self, lcdc: Lcdc) -> bool {
        if !lcdc.contains(Lcdc::OBJ_ENABLE) || self.sprite_fetch.is_some() {
            return false;
        }
        let due = self
            .line_sprites
            .iter()
            .position(|s| s.x <= self.lx + 8);
        match due {
            Some(index) => {
                let sprite = self.line_sprites.remove(index);
                self.sprite_fetch = Some(SpriteFetch {
                    sprite,
                    phase: 0,
                    low: 0,
                    high: 0,
                });
                true
            }
            None => false,
        }
    }

    /// One tick of an in-flight sprite fetch: tile low byte, tile high
    /// byte, then the FIFO merge. Background fetching and pixel output
    /// stall for the duration.
    pub(super) fn step_sprite_fetch(&mut self, memory: &Memory, lcdc: Lcdc) {
        let (sprite, phase) = match &self.sprite_fetch {
            Some(fetch) => (fetch.sprite, fetch.phase),
            None => return,
        };

        let height: u8 = if lcdc.contains(Lcdc::OBJ_SIZE) { 16 } else { 8 };
        let ly = memory.data[memory::LY as usize];
        let mut row = ly.wrapping_add(16).wrapping_sub(sprite.y);
        if sprite.attrs.contains(SpriteAttrs::Y_FLIP) {
            row = height - 1 - row;
        }
        // Tall sprites span two tiles; bit 0 of the index is ignored and
        // the row selects the half. Sprite tile data is always
        // 0x8000-based.
        let tile = if height == 16 {
            (sprite.tile & 0xFE) | (row >> 3)
        } else {
            sprite.tile
        };
        let addr = 0x8000 + tile as usize * 16 + (row & 0x07) as usize * 2;

        match phase {
            0 => {
                if let Some(fetch) = self.sprite_fetch.as_mut() {
                    fetch.low = memory.data[addr];
                    fetch.phase = 1;
                }
            }
            1 => {
                if let Some(fetch) = self.sprite_fetch.as_mut() {
                    fetch.high = memory.data[addr + 1];
                    fetch.phase = 2;
                }
            }
            _ => {
                if let Some(fetch) = self.sprite_fetch.take() {
                    self.merge_sprite_row(&fetch);
                }
            }
        }
    }

    /// Merge a fetched sprite row into the sprite FIFO. Pixels already
    /// queued by an earlier (higher-priority) sprite keep their slot
    /// unless transparent: first non-transparent wins.
    fn merge_sprite_row(&mut self, fetch: &SpriteFetch) {
        let skip = 8u8.saturating_sub(fetch.sprite.x);
        for i in skip..8 {
            let bit = if fetch.sprite.attrs.contains(SpriteAttrs::X_FLIP) {
                i
            } else {
                7 - i
            };
            let color = (((fetch.high >> bit) & 0x01) << 1) | ((fetch.low >> bit) & 0x01);
            let pixel = SpritePixel {
                color,
                attrs: fetch.sprite.attrs,
            };

            let slot = (i - skip) as usize;
            match self.sprite_fifo.get_mut(slot) {
                Some(existing) => {
                    if existing.color == 0 && color != 0 {
                        *existing = pixel;
                    }
                }
                None => self.sprite_fifo.push(pixel),
            }
        }
    }

    /// One phase of the background/window fetcher.
    pub(super) fn step_bg_fetch(&mut self, memory: &Memory, lcdc: Lcdc) {
        match self.fetch_phase {
            FetchPhase::TileIndex => {
                self.tile_index = memory.data[self.map_address(memory, lcdc)];
                self.fetch_phase = FetchPhase::TileLow;
            }
            FetchPhase::TileLow => {
                self.tile_low = memory.data[self.tile_address(memory, lcdc)];
                self.fetch_phase = FetchPhase::TileHigh;
            }
            FetchPhase::TileHigh => {
                self.tile_high = memory.data[self.tile_address(memory, lcdc) + 1];
                if self.dummy_fetch {
                    // The first fetched tile of every line is thrown away;
                    // this models the fixed pixel-transfer startup cost.
                    self.dummy_fetch = false;
                    self.fetch_phase = FetchPhase::TileIndex;
                } else if self.bg_fifo.is_empty() {
                    self.push_bg_row();
                } else {
                    self.fetch_phase = FetchPhase::Push;
                }
            }
            FetchPhase::Push => {
                // Retry until the FIFO drains.
                if self.bg_fifo.is_empty() {
                    self.push_bg_row();
                }
            }
        }
    }

    /// Tile-map byte address for the current fetch position.
    fn map_address(&self, memory: &Memory, lcdc: Lcdc) -> usize {
        if self.in_window {
            let map = if lcdc.contains(Lcdc::WIN_TILEMAP) {
                0x9C00
            } else {
                0x9800
            };
            map + self.win_tile_x as usize + 32 * (self.window_line as usize / 8)
        } else {
            let map = if lcdc.contains(Lcdc::BG_TILEMAP) {
                0x9C00
            } else {
                0x9800
            };
            let scx = memory.data[memory::SCX as usize];
            let scy = memory.data[memory::SCY as usize];
            let ly = memory.data[memory::LY as usize];
            let col = (self.tile_x.wrapping_add(scx / 8) & 0x1F) as usize;
            let row = ly.wrapping_add(scy) as usize / 8;
            map + col + 32 * row
        }
    }

    /// Tile-data byte address for the current tile row, honoring the
    /// unsigned 0x8000 / signed 0x9000 addressing modes.
    fn tile_address(&self, memory: &Memory, lcdc: Lcdc) -> usize {
        let row = if self.in_window {
            self.window_line & 0x07
        } else {
            let scy = memory.data[memory::SCY as usize];
            memory.data[memory::LY as usize].wrapping_add(scy) & 0x07
        } as usize;

        if lcdc.contains(Lcdc::TILEDATA_8000) {
            0x8000 + self.tile_index as usize * 16 + row * 2
        } else {
            let signed = (0x9000i32 + self.tile_index as i8 as i32 * 16) as usize;
            signed + row * 2
        }
    }

    /// Unpack the latched tile row into the background FIFO, leftmost
    /// pixel first, and advance to the next tile column.
    fn push_bg_row(&mut self) {
        for i in 0..8 {
            let bit = 7 - i;
            let color = (((self.tile_high >> bit) & 0x01) << 1) | ((self.tile_low >> bit) & 0x01);
            self.bg_fifo.push(BgPixel { color });
        }
        if self.in_window {
            self.win_tile_x += 1;
        } else {
            self.tile_x = self.tile_x.wrapping_add(1);
        }
        self.fetch_phase = FetchPhase::TileIndex;
    }
}
