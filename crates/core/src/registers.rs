//! 6502 register file.

use crate::flags::Status;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Program counter after power-on: the first ROM byte.
pub const RESET_PC: u16 = 0x8000;

/// Stack pointer after power-on. Reset runs three dummy stack pulls, which
/// leaves S three below the top of the page.
pub const RESET_SP: u8 = 0xFD;

const STACK_PAGE: u16 = 0x0100;

/// CPU register set.
///
/// Identity is the six registers only; memory contents never take part in
/// comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Registers {
    /// Program counter
    pub pc: u16,
    /// Accumulator
    pub a: u8,
    /// X index register
    pub x: u8,
    /// Y index register
    pub y: u8,
    /// Stack pointer (offset into page $01, points at the next free slot)
    pub sp: u8,
    /// Status register (NV-BDIZC)
    pub status: Status,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    /// Power-on register state.
    pub const fn new() -> Self {
        Self {
            pc: RESET_PC,
            a: 0,
            x: 0,
            y: 0,
            sp: RESET_SP,
            status: Status::new(),
        }
    }

    /// Address of the next free stack slot.
    #[inline]
    pub const fn stack_address(&self) -> u16 {
        STACK_PAGE | self.sp as u16
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PC: ${:04X}  A: ${:02X}  X: ${:02X}  Y: ${:02X}  S: ${:02X}  P: ${:02X}",
            self.pc,
            self.a,
            self.x,
            self.y,
            self.sp,
            self.status.bits()
        )
    }
}
