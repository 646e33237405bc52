//! The machine aggregate: one `GameBoy` owns every component and drives
//! them cooperatively, one machine cycle at a time.

use log::info;

use crate::cpu::{Cpu, CpuError};
use crate::dma::Dma;
use crate::interrupts;
use crate::joypad::{self, Button};
use crate::memory::{CartridgeError, Memory};
use crate::ppu::Ppu;
use crate::timer::Timer;
use crate::{TICKS_PER_FRAME, TICKS_PER_MCYCLE};


/// Machine cycles per frame period; the pacing fallback while the LCD is
/// disabled and no frame boundary arrives from the pipeline.
const FRAME_MCYCLES: u32 = TICKS_PER_FRAME / TICKS_PER_MCYCLE;

pub struct GameBoy {
    pub(crate) cpu: Cpu,
    pub(crate) memory: Memory,
    pub(crate) ppu: Ppu,
    pub(crate) timer: Timer,
    pub(crate) dma: Dma,
}

impl GameBoy {
    /// Validate and load a cartridge image, then power the machine on.
    pub fn new(rom: &[u8]) -> Result<GameBoy, CartridgeError> {
        let mut memory = Memory::new(rom)?;
        let mut cpu = Cpu::new();
        cpu.reset(&mut memory);
        info!("powered on, pc=0x{:04X}", cpu.regs.pc);

        Ok(GameBoy {
            cpu,
            memory,
            ppu: Ppu::new(),
            timer: Timer::new(),
            dma: Dma::new(),
        })
    }

    /// Advance the whole machine by one machine cycle (4 clock ticks).
    ///
    /// Order per cycle: start interrupt dispatch if the CPU sits at a
    /// fetch boundary with IME set and work pending; wake a halted CPU
    /// when (IE & IF) != 0 regardless of IME; step the CPU, the timer and
    /// the DMA engine; tick the pixel pipeline twice (2 clocks each).
    pub fn step_mcycle(&mut self) -> Result<(), CpuError> {
        if self.cpu.ime && self.cpu.at_fetch_boundary() && interrupts::pending(&self.memory) {
            self.cpu.begin_interrupt_dispatch();
        }
        if self.cpu.halted && interrupts::pending(&self.memory) {
            self.cpu.wake();
        }

        self.cpu.step(&mut self.memory)?;
        self.timer.step(&mut self.memory, TICKS_PER_MCYCLE);
        self.dma.step(&mut self.memory);
        self.ppu.tick(&mut self.memory);
        self.ppu.tick(&mut self.memory);
        Ok(())
    }

    /// Run until the pixel pipeline completes a frame (end of line 153),
    /// or one frame period has elapsed with the LCD disabled.
    pub fn step_frame(&mut self) -> Result<(), CpuError> {
        for _ in 0..FRAME_MCYCLES {
            self.step_mcycle()?;
            if self.ppu.take_frame_ready() {
                return Ok(());
            }
        }
        Ok(())
    }

    /// The last completed frame, RGB24, row-major 160x144.
    pub fn frame(&self) -> &[u8] {
        self.ppu.frame()
    }

    /// Feed a host key state change into the joypad register.
    pub fn set_button(&mut self, button: Button, pressed: bool) {
        joypad::set_button(&mut self.memory, button, pressed);
    }
}
