use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::info;

use pocketboy_dmg::{Button, GameBoy, SCREEN_HEIGHT, SCREEN_WIDTH};

/// Headless driver: run a cartridge for a number of frames and dump the
/// final frame as raw RGB24. Useful for regression comparisons and for
/// eyeballing output with any raw-image viewer.
fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let (rom_path, out_path) = match (args.next(), args.next()) {
        (Some(rom), Some(out)) => (PathBuf::from(rom), PathBuf::from(out)),
        _ => {
            eprintln!("Usage: pocketboy <rom_path> <out_rgb24_path> [frames] [--press-start]");
            std::process::exit(2);
        }
    };

    let mut frames: u32 = 120;
    let mut press_start = false;
    for arg in args {
        if arg == "--press-start" {
            press_start = true;
        } else {
            frames = arg
                .parse()
                .with_context(|| format!("invalid frame count {:?}", arg))?;
        }
    }
    if frames == 0 {
        bail!("frame count must be at least 1");
    }

    let rom = std::fs::read(&rom_path)
        .with_context(|| format!("failed to read ROM '{}'", rom_path.display()))?;

    let mut gb = GameBoy::new(&rom)
        .with_context(|| format!("failed to load cartridge '{}'", rom_path.display()))?;

    for frame in 0..frames {
        // Tap Start halfway through so title screens advance.
        if press_start && frame == frames / 2 {
            gb.set_button(Button::Start, true);
        }
        if press_start && frame == frames / 2 + 2 {
            gb.set_button(Button::Start, false);
        }
        gb.step_frame()
            .with_context(|| format!("execution failed during frame {}", frame))?;
    }

    std::fs::write(&out_path, gb.frame())
        .with_context(|| format!("failed to write '{}'", out_path.display()))?;

    info!(
        "wrote {} bytes ({}x{} rgb24) after {} frames to '{}'",
        gb.frame().len(),
        SCREEN_WIDTH,
        SCREEN_HEIGHT,
        frames,
        out_path.display()
    );
    Ok(())
}
