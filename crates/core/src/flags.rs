//! 6502 status register (P).
//!
//! P is kept as a single byte so instruction logic can work on raw bit
//! patterns. Bit layout, MSB to LSB:
//!
//! ```text
//!  7 6 5 4 3 2 1 0
//!  N V - B D I Z C
//! ```
//!
//! Bit 5 has no function on real hardware and always reads back as 1.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Negative (bit 7 of the last result)
pub const NEGATIVE: u8 = 0b1000_0000;
/// Signed overflow
pub const OVERFLOW: u8 = 0b0100_0000;
/// Unused, always set
pub const UNUSED: u8 = 0b0010_0000;
/// Break (only meaningful in the copy of P pushed by BRK/PHP)
pub const BREAK: u8 = 0b0001_0000;
/// Decimal mode
pub const DECIMAL: u8 = 0b0000_1000;
/// IRQ disable
pub const INTERRUPT_DISABLE: u8 = 0b0000_0100;
/// Zero result
pub const ZERO: u8 = 0b0000_0010;
/// Carry / not-borrow
pub const CARRY: u8 = 0b0000_0001;

/// Processor status byte.
///
/// Every way of producing or mutating a `Status` forces [`UNUSED`] on, so the
/// bit can never be observed clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Status(u8);

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}

impl Status {
    /// Power-on status: only the unused bit set.
    pub const fn new() -> Self {
        Self(UNUSED)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits | UNUSED)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True if every bit in `mask` is set.
    #[inline]
    pub const fn contains(self, mask: u8) -> bool {
        self.0 & mask == mask
    }

    #[inline]
    pub fn insert(&mut self, mask: u8) {
        self.0 |= mask;
    }

    #[inline]
    pub fn remove(&mut self, mask: u8) {
        self.0 = (self.0 & !mask) | UNUSED;
    }

    #[inline]
    pub fn set(&mut self, mask: u8, value: bool) {
        if value {
            self.insert(mask);
        } else {
            self.remove(mask);
        }
    }

    pub const fn negative(self) -> bool {
        self.contains(NEGATIVE)
    }

    pub const fn overflow(self) -> bool {
        self.contains(OVERFLOW)
    }

    pub const fn break_flag(self) -> bool {
        self.contains(BREAK)
    }

    pub const fn decimal(self) -> bool {
        self.contains(DECIMAL)
    }

    pub const fn interrupt_disable(self) -> bool {
        self.contains(INTERRUPT_DISABLE)
    }

    pub const fn zero(self) -> bool {
        self.contains(ZERO)
    }

    pub const fn carry(self) -> bool {
        self.contains(CARRY)
    }

    /// Set Zero and Negative from a result byte.
    #[inline]
    pub fn set_zn(&mut self, value: u8) {
        self.set(ZERO, value == 0);
        self.set(NEGATIVE, value & 0x80 != 0);
    }

    /// Byte pushed by BRK/PHP (`brk == true`) or by an IRQ/NMI entry.
    pub const fn for_push(self, brk: bool) -> u8 {
        if brk {
            self.0 | BREAK
        } else {
            self.0 & !BREAK
        }
    }

    /// Status restored by PLP/RTI. B does not exist as a latch, so it is dropped.
    pub const fn from_pulled(value: u8) -> Self {
        Self((value & !BREAK) | UNUSED)
    }
}

impl From<u8> for Status {
    fn from(bits: u8) -> Self {
        Self::from_bits(bits)
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> u8 {
        status.bits()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(u8, char); 8] = [
            (NEGATIVE, 'N'),
            (OVERFLOW, 'V'),
            (UNUSED, '-'),
            (BREAK, 'B'),
            (DECIMAL, 'D'),
            (INTERRUPT_DISABLE, 'I'),
            (ZERO, 'Z'),
            (CARRY, 'C'),
        ];
        for (mask, name) in NAMES {
            let c = if mask == UNUSED || self.contains(mask) {
                name
            } else {
                name.to_ascii_lowercase()
            };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}
