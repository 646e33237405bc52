pub mod cpu;
pub mod dma;
pub mod interrupts;
pub mod joypad;
pub mod machine;
pub mod memory;
pub mod ppu;
pub mod timer;

pub use cpu::CpuError;
pub use joypad::Button;
pub use machine::GameBoy;
pub use memory::CartridgeError;

/// Logical screen width in pixels for the Game Boy DMG.
pub const SCREEN_WIDTH: usize = 160;
/// Logical screen height in pixels.
pub const SCREEN_HEIGHT: usize = 144;
/// System clock ticks (T-cycles) per machine cycle.
pub const TICKS_PER_MCYCLE: u32 = 4;
/// T-cycles per full frame: 154 scanlines of 456 ticks each.
pub const TICKS_PER_FRAME: u32 = 70_224;
