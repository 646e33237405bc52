//! Joypad register (P1, 0xFF00).
//!
//! The host feeds a digital button-state vector into `Memory`; reads of
//! P1 compose the low nibble from whichever half (d-pad or buttons) the
//! select bits 4-5 currently address. A pressed key reads as 0.

use crate::interrupts::{self, Interrupt};
use crate::memory::Memory;

/// The eight DMG buttons. The discriminant doubles as the index into the
/// key-state vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    Right = 0,
    Left = 1,
    Up = 2,
    Down = 3,
    A = 4,
    B = 5,
    Select = 6,
    Start = 7,
}

impl Button {
    #[inline]
    fn is_dpad(self) -> bool {
        (self as usize) < 4
    }

    /// Bit within the selected P1 nibble.
    #[inline]
    fn nibble_bit(self) -> u8 {
        1 << ((self as u8) & 0x03)
    }
}

const SELECT_DPAD: u8 = 0x10;
const SELECT_BUTTONS: u8 = 0x20;

/// Record a button state change and raise the joypad interrupt on a press.
pub fn set_button(memory: &mut Memory, button: Button, pressed: bool) {
    let was = memory.keys[button as usize];
    memory.keys[button as usize] = pressed;
    if pressed && !was {
        interrupts::request(memory, Interrupt::Joypad);
    }
}

pub(crate) fn read_p1(memory: &Memory) -> u8 {
    let select = memory.data[0xFF00] & (SELECT_DPAD | SELECT_BUTTONS);
    // Bits 7-6 are unwired and read back as 1.
    let mut value = 0xC0 | select | 0x0F;

    for (index, &pressed) in memory.keys.iter().enumerate() {
        if !pressed {
            continue;
        }
        let button = BUTTONS[index];
        // A select bit of 0 means that half is being scanned.
        let scanned = if button.is_dpad() {
            select & SELECT_DPAD == 0
        } else {
            select & SELECT_BUTTONS == 0
        };
        if scanned {
            value &= !button.nibble_bit();
        }
    }

    value
}

pub(crate) fn write_p1(memory: &mut Memory, value: u8) {
    // Only the select bits are writable; the low nibble is composed on
    // read and bits 7-6 are fixed.
    memory.data[0xFF00] = value & (SELECT_DPAD | SELECT_BUTTONS);
}

const BUTTONS: [Button; 8] = [
    Button::Right,
    Button::Left,
    Button::Up,
    Button::Down,
    Button::A,
    Button::B,
    Button::Select,
    Button::Start,
];
