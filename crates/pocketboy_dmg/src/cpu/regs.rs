/// Register file for the Sharp LR35902.
///
/// Eight 8-bit registers addressable individually or as the pairs AF, BC,
/// DE and HL, plus the 16-bit stack pointer and program counter. The low
/// nibble of F is forced to zero on every write; only bits 4-7 (C, H, N, Z)
/// are wired on hardware.
#[derive(Clone, Copy, Debug, Default)]
pub struct Registers {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
}

impl Registers {
    #[inline]
    pub fn af(&self) -> u16 {
        u16::from_be_bytes([self.a, self.f & 0xF0])
    }

    #[inline]
    pub fn set_af(&mut self, value: u16) {
        let [a, f] = value.to_be_bytes();
        self.a = a;
        self.f = f & 0xF0;
    }

    #[inline]
    pub fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }

    #[inline]
    pub fn set_bc(&mut self, value: u16) {
        let [b, c] = value.to_be_bytes();
        self.b = b;
        self.c = c;
    }

    #[inline]
    pub fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }

    #[inline]
    pub fn set_de(&mut self, value: u16) {
        let [d, e] = value.to_be_bytes();
        self.d = d;
        self.e = e;
    }

    #[inline]
    pub fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }

    #[inline]
    pub fn set_hl(&mut self, value: u16) {
        let [h, l] = value.to_be_bytes();
        self.h = h;
        self.l = l;
    }
}

/// Flag bits in the F register.
///
/// - bit 7: Z (zero)
/// - bit 6: N (subtract)
/// - bit 5: H (half carry)
/// - bit 4: C (carry)
#[derive(Clone, Copy, Debug)]
pub enum Flag {
    Z = 7,
    N = 6,
    H = 5,
    C = 4,
}

/// 8-bit register selector as encoded in the low/middle 3 bits of most
/// opcodes. Value 6 addresses memory at HL instead of a register; the
/// execution state machines spend an extra machine cycle on that case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum R8 {
    B,
    C,
    D,
    E,
    H,
    L,
    HlInd,
    A,
}

impl R8 {
    #[inline]
    pub fn from_bits(bits: u8) -> R8 {
        match bits & 0x07 {
            0 => R8::B,
            1 => R8::C,
            2 => R8::D,
            3 => R8::E,
            4 => R8::H,
            5 => R8::L,
            6 => R8::HlInd,
            _ => R8::A,
        }
    }
}

/// 16-bit register pair selector for the `LD rr,d16` / `INC rr` / `ADD HL,rr`
/// family (bits 4-5 of the opcode).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum R16 {
    Bc,
    De,
    Hl,
    Sp,
}

impl R16 {
    #[inline]
    pub fn from_bits(bits: u8) -> R16 {
        match bits & 0x03 {
            0 => R16::Bc,
            1 => R16::De,
            2 => R16::Hl,
            _ => R16::Sp,
        }
    }
}

/// 16-bit register pair selector for PUSH/POP, where slot 3 is AF.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum R16Stack {
    Bc,
    De,
    Hl,
    Af,
}

impl R16Stack {
    #[inline]
    pub fn from_bits(bits: u8) -> R16Stack {
        match bits & 0x03 {
            0 => R16Stack::Bc,
            1 => R16Stack::De,
            2 => R16Stack::Hl,
            _ => R16Stack::Af,
        }
    }
}
