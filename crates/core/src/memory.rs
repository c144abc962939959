//! Flat 64KiB address space and the hardware stack.
//!
//! The [`Memory6502`] trait is the contract the CPU side programs against:
//! byte access is required, and word access plus the stack operations are
//! provided on top of it. The stack pointer is always passed in by the caller,
//! so a memory bank never knows which register file it serves.

use crate::logging::{log, LogCategory, LogLevel};
use std::fmt;
use thiserror::Error;

/// Number of addressable bytes.
pub const MEMORY_SIZE: usize = 0x10000;

pub const ZERO_PAGE_START: u16 = 0x0000;
pub const ZERO_PAGE_END: u16 = 0x00FF;
/// Page $01. The stack grows down from `STACK_TOP`.
pub const STACK_BASE: u16 = 0x0100;
pub const STACK_TOP: u16 = 0x01FF;
pub const RAM_START: u16 = 0x0200;
pub const RAM_END: u16 = 0x7FFF;
pub const ROM_START: u16 = 0x8000;
/// One past the last ROM address.
pub const ROM_END: usize = 0x10000;

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
/// BRK/IRQ vector, low byte.
pub const BRK_VECTOR: u16 = 0xFFFE;
/// BRK/IRQ vector, high byte.
pub const BRK_VECTOR_HI: u16 = 0xFFFF;

/// Fill byte for unprogrammed ROM. Code that runs off the end of a program
/// lands on this opcode, which a test harness treats as "halt".
pub const ROM_FILL: u8 = 0xFE;

/// Memory interface for the 6502.
///
/// Implementors provide raw byte access. Stack pointer arithmetic in the
/// provided methods wraps modulo 256 and never leaves page $01; there is no
/// overflow or underflow detection, same as the hardware.
pub trait Memory6502 {
    /// Read a byte from memory at the given address
    fn read_byte(&self, addr: u16) -> u8;

    /// Write a byte to memory at the given address
    fn write_byte(&mut self, addr: u16, val: u8);

    /// Little-endian word at `addr`; the high byte address wraps past $FFFF.
    fn read_word(&self, addr: u16) -> u16 {
        let lo = self.read_byte(addr) as u16;
        let hi = self.read_byte(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    fn write_word(&mut self, addr: u16, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.write_byte(addr, lo);
        self.write_byte(addr.wrapping_add(1), hi);
    }

    /// Write `val` at the slot `sp` points to, then decrement `sp`.
    fn stack_push_byte(&mut self, sp: &mut u8, val: u8) {
        self.write_byte(STACK_BASE | *sp as u16, val);
        let (next, wrapped) = sp.overflowing_sub(1);
        if wrapped {
            log(LogCategory::Stack, LogLevel::Trace, || {
                "stack pointer wrapped $00 -> $FF on push".to_string()
            });
        }
        *sp = next;
    }

    /// Push high byte then low byte, leaving the word little-endian in memory.
    fn stack_push_word(&mut self, sp: &mut u8, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.stack_push_byte(sp, hi);
        self.stack_push_byte(sp, lo);
    }

    /// Increment `sp`, then read the slot it points to.
    fn stack_pull_byte(&self, sp: &mut u8) -> u8 {
        let (next, wrapped) = sp.overflowing_add(1);
        if wrapped {
            log(LogCategory::Stack, LogLevel::Trace, || {
                "stack pointer wrapped $FF -> $00 on pull".to_string()
            });
        }
        *sp = next;
        self.read_byte(STACK_BASE | *sp as u16)
    }

    /// Pull low byte then high byte; inverse of [`stack_push_word`](Self::stack_push_word).
    fn stack_pull_word(&self, sp: &mut u8) -> u16 {
        let lo = self.stack_pull_byte(sp);
        let hi = self.stack_pull_byte(sp);
        u16::from_le_bytes([lo, hi])
    }
}

/// Fixed partition of the address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    ZeroPage,
    Stack,
    Ram,
    Rom,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::ZeroPage, Region::Stack, Region::Ram, Region::Rom];

    pub const fn of(addr: u16) -> Self {
        match addr {
            ZERO_PAGE_START..=ZERO_PAGE_END => Region::ZeroPage,
            STACK_BASE..=STACK_TOP => Region::Stack,
            RAM_START..=RAM_END => Region::Ram,
            _ => Region::Rom,
        }
    }

    pub const fn start(self) -> u16 {
        match self {
            Region::ZeroPage => ZERO_PAGE_START,
            Region::Stack => STACK_BASE,
            Region::Ram => RAM_START,
            Region::Rom => ROM_START,
        }
    }

    /// Last address in the region (inclusive).
    pub const fn end(self) -> u16 {
        match self {
            Region::ZeroPage => ZERO_PAGE_END,
            Region::Stack => STACK_TOP,
            Region::Ram => RAM_END,
            Region::Rom => (ROM_END - 1) as u16,
        }
    }

    pub const fn len(self) -> usize {
        self.end() as usize - self.start() as usize + 1
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Region::ZeroPage => "zero page",
            Region::Stack => "stack",
            Region::Ram => "RAM",
            Region::Rom => "ROM",
        };
        write!(f, "{} (${:04X}-${:04X})", name, self.start(), self.end())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Program of {len} bytes at ${offset:04X} runs past $FFFF")]
    ProgramOverflow { offset: u16, len: usize },
}

/// The 64KiB address space of one CPU.
///
/// Writes are never refused, ROM included; write protection is up to the
/// caller. Not thread-safe: a bank shared between CPUs needs external locking.
#[derive(Clone)]
pub struct Memory {
    data: Box<[u8; MEMORY_SIZE]>,
    did_write: bool,
}

impl Memory {
    /// Zeroed RAM with every ROM byte set to [`ROM_FILL`].
    pub fn new() -> Self {
        let mut data = Box::new([0u8; MEMORY_SIZE]);
        data[ROM_START as usize..ROM_END].fill(ROM_FILL);
        Self {
            data,
            did_write: false,
        }
    }

    /// True once anything has been written since construction. Never resets.
    pub fn did_write(&self) -> bool {
        self.did_write
    }

    pub fn region(&self, region: Region) -> &[u8] {
        &self.data[region.start() as usize..=region.end() as usize]
    }

    /// Bytes from `start` up to `len` long, clipped at the end of memory.
    pub fn slice(&self, start: u16, len: usize) -> &[u8] {
        let start = start as usize;
        let end = start.saturating_add(len).min(MEMORY_SIZE);
        &self.data[start..end]
    }

    /// Copy `data` into memory starting at `offset`.
    ///
    /// Only the covered addresses change; the rest of ROM keeps its fill byte.
    /// Nothing is written if the image would run past $FFFF.
    pub fn load_program(&mut self, offset: u16, data: &[u8]) -> Result<(), MemoryError> {
        let start = offset as usize;
        let end = start + data.len();
        if end > MEMORY_SIZE {
            log(LogCategory::Loader, LogLevel::Warn, || {
                format!(
                    "rejected {} byte image at ${:04X}: ends at ${:05X}",
                    data.len(),
                    offset,
                    end
                )
            });
            return Err(MemoryError::ProgramOverflow {
                offset,
                len: data.len(),
            });
        }
        if data.is_empty() {
            return Ok(());
        }

        self.data[start..end].copy_from_slice(data);
        self.did_write = true;
        log(LogCategory::Loader, LogLevel::Info, || {
            format!(
                "loaded {} bytes at ${:04X}-${:04X}",
                data.len(),
                offset,
                end - 1
            )
        });
        Ok(())
    }

    pub fn reset_vector(&self) -> u16 {
        self.read_word(RESET_VECTOR)
    }

    pub fn set_reset_vector(&mut self, addr: u16) {
        self.write_word(RESET_VECTOR, addr);
    }

    /// BRK/IRQ handler address.
    pub fn irq_vector(&self) -> u16 {
        self.read_word(BRK_VECTOR)
    }

    pub fn nmi_vector(&self) -> u16 {
        self.read_word(NMI_VECTOR)
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory6502 for Memory {
    #[inline]
    fn read_byte(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    #[inline]
    fn write_byte(&mut self, addr: u16, val: u8) {
        if addr >= ROM_START {
            log(LogCategory::Memory, LogLevel::Trace, || {
                format!("write ${:02X} to ROM at ${:04X}", val, addr)
            });
        }
        self.data[addr as usize] = val;
        self.did_write = true;
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reset = self.reset_vector();
        f.debug_struct("Memory")
            .field("size", &MEMORY_SIZE)
            .field("did_write", &self.did_write)
            .field("reset_vector", &format_args!("${:04X}", reset))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_memory_is_zero_below_rom() {
        let mem = Memory::new();
        assert!((0..ROM_START).all(|a| mem.read_byte(a) == 0));
        assert!(!mem.did_write());
    }

    #[test]
    fn fresh_rom_reads_fill_byte() {
        let mem = Memory::new();
        for addr in ROM_START..=0xFFFF {
            assert_eq!(mem.read_byte(addr), 0xFE, "addr ${:04X}", addr);
        }
        assert_eq!(mem.irq_vector(), 0xFEFE);
    }

    #[test]
    fn write_then_read_every_address() {
        let mut mem = Memory::new();
        for addr in 0..=0xFFFFu16 {
            let v = (addr as u8) ^ (addr >> 8) as u8 ^ 0x5A;
            mem.write_byte(addr, v);
            assert_eq!(mem.read_byte(addr), v, "addr ${:04X}", addr);
        }
    }

    #[test]
    fn rom_and_vector_writes_are_not_refused() {
        let mut mem = Memory::new();
        mem.write_byte(0x8000, 0xEA);
        mem.write_byte(BRK_VECTOR, 0x34);
        mem.write_byte(BRK_VECTOR_HI, 0x12);
        assert_eq!(mem.read_byte(0x8000), 0xEA);
        assert_eq!(mem.irq_vector(), 0x1234);
        // neighbours keep the fill
        assert_eq!(mem.read_byte(0x8001), ROM_FILL);
    }

    #[test]
    fn did_write_is_set_once_and_stays() {
        let mut mem = Memory::new();
        let _ = mem.read_byte(0x1234);
        let mut sp = 0xFD;
        let _ = mem.stack_pull_byte(&mut sp);
        assert!(!mem.did_write());

        mem.write_byte(0x0000, 0x00);
        assert!(mem.did_write());
        for _ in 0..4 {
            let _ = mem.read_byte(0x0000);
        }
        assert!(mem.did_write());
    }

    #[test]
    fn push_writes_then_decrements() {
        let mut mem = Memory::new();
        let mut sp = 0xFD;
        mem.stack_push_byte(&mut sp, 0x42);
        assert_eq!(sp, 0xFC);
        assert_eq!(mem.read_byte(0x01FD), 0x42);
        assert!(mem.did_write());
    }

    #[test]
    fn pull_increments_then_reads() {
        let mut mem = Memory::new();
        mem.write_byte(0x01FE, 0x99);
        let mut sp = 0xFD;
        assert_eq!(mem.stack_pull_byte(&mut sp), 0x99);
        assert_eq!(sp, 0xFE);
    }

    #[test]
    fn push_pull_byte_roundtrip_for_every_pointer() {
        let mut mem = Memory::new();
        for start in 0..=0xFFu8 {
            let value = start.wrapping_mul(31).wrapping_add(7);
            let mut sp = start;
            mem.stack_push_byte(&mut sp, value);
            assert_eq!(mem.stack_pull_byte(&mut sp), value);
            assert_eq!(sp, start);
        }
    }

    #[test]
    fn push_pull_word_roundtrip_for_every_pointer() {
        let mut mem = Memory::new();
        for start in 0..=0xFFu8 {
            let value = 0xBEEFu16.wrapping_add(start as u16 * 0x0101);
            let mut sp = start;
            mem.stack_push_word(&mut sp, value);
            assert_eq!(sp, start.wrapping_sub(2));
            assert_eq!(mem.stack_pull_word(&mut sp), value);
            assert_eq!(sp, start);
        }
    }

    #[test]
    fn word_is_little_endian_on_the_stack() {
        let mut mem = Memory::new();
        let mut sp = 0xFF;
        mem.stack_push_word(&mut sp, 0x1234);
        assert_eq!(mem.read_byte(0x01FF), 0x12);
        assert_eq!(mem.read_byte(0x01FE), 0x34);
        assert_eq!(mem.read_word(0x01FE), 0x1234);
        assert_eq!(sp, 0xFD);
    }

    #[test]
    fn push_at_zero_wraps_to_ff() {
        let mut mem = Memory::new();
        let mut sp = 0x00;
        mem.stack_push_byte(&mut sp, 0x77);
        assert_eq!(sp, 0xFF);
        assert_eq!(mem.read_byte(0x0100), 0x77);
        // never spills into zero page or RAM
        assert_eq!(mem.read_byte(0x00FF), 0x00);
        assert_eq!(mem.read_byte(0x0200), 0x00);
    }

    #[test]
    fn pull_at_ff_wraps_to_zero() {
        let mut mem = Memory::new();
        mem.write_byte(0x0100, 0x66);
        let mut sp = 0xFF;
        assert_eq!(mem.stack_pull_byte(&mut sp), 0x66);
        assert_eq!(sp, 0x00);
    }

    #[test]
    fn word_push_straddling_the_wrap() {
        let mut mem = Memory::new();
        let mut sp = 0x00;
        mem.stack_push_word(&mut sp, 0xABCD);
        assert_eq!(mem.read_byte(0x0100), 0xAB);
        assert_eq!(mem.read_byte(0x01FF), 0xCD);
        assert_eq!(sp, 0xFE);
        assert_eq!(mem.stack_pull_word(&mut sp), 0xABCD);
        assert_eq!(sp, 0x00);
    }

    #[test]
    fn stack_is_lifo() {
        let mut mem = Memory::new();
        let mut sp = 0xFD;
        mem.stack_push_byte(&mut sp, 1);
        mem.stack_push_word(&mut sp, 0x0302);
        mem.stack_push_byte(&mut sp, 4);
        assert_eq!(mem.stack_pull_byte(&mut sp), 4);
        assert_eq!(mem.stack_pull_word(&mut sp), 0x0302);
        assert_eq!(mem.stack_pull_byte(&mut sp), 1);
        assert_eq!(sp, 0xFD);
    }

    #[test]
    fn read_word_wraps_at_top_of_memory() {
        let mut mem = Memory::new();
        mem.write_byte(0xFFFF, 0x34);
        mem.write_byte(0x0000, 0x12);
        assert_eq!(mem.read_word(0xFFFF), 0x1234);
    }

    #[test]
    fn regions_partition_the_address_space() {
        assert_eq!(Region::of(0x0000), Region::ZeroPage);
        assert_eq!(Region::of(0x00FF), Region::ZeroPage);
        assert_eq!(Region::of(0x0100), Region::Stack);
        assert_eq!(Region::of(0x01FF), Region::Stack);
        assert_eq!(Region::of(0x0200), Region::Ram);
        assert_eq!(Region::of(0x7FFF), Region::Ram);
        assert_eq!(Region::of(0x8000), Region::Rom);
        assert_eq!(Region::of(0xFFFF), Region::Rom);

        let total: usize = Region::ALL.iter().map(|r| r.len()).sum();
        assert_eq!(total, MEMORY_SIZE);
        assert_eq!(Region::Stack.len(), 256);
        assert_eq!(Region::Rom.len(), 0x8000);
    }

    #[test]
    fn region_slices() {
        let mut mem = Memory::new();
        mem.write_byte(STACK_BASE, 0x11);
        let stack = mem.region(Region::Stack);
        assert_eq!(stack.len(), 256);
        assert_eq!(stack[0], 0x11);
        assert!(mem.region(Region::Rom).iter().all(|&b| b == ROM_FILL));
    }

    #[test]
    fn slice_clips_at_end_of_memory() {
        let mem = Memory::new();
        assert_eq!(mem.slice(0xFFF0, 0x100).len(), 0x10);
        assert_eq!(mem.slice(0x0000, 4), &[0, 0, 0, 0]);
    }

    #[test]
    fn load_program_leaves_rest_of_rom_filled() {
        let mut mem = Memory::new();
        mem.load_program(0x8000, &[0xA9, 0x05, 0xEA]).expect("load");
        assert_eq!(mem.slice(0x8000, 4), &[0xA9, 0x05, 0xEA, ROM_FILL]);
        assert!(mem.did_write());
    }

    #[test]
    fn load_program_up_to_last_byte() {
        let mut mem = Memory::new();
        assert!(mem.load_program(0xFFFE, &[0x00, 0x90]).is_ok());
        assert_eq!(mem.irq_vector(), 0x9000);
    }

    #[test]
    fn load_program_past_end_is_rejected_untouched() {
        let mut mem = Memory::new();
        let err = mem.load_program(0xFFFF, &[1, 2]).unwrap_err();
        assert_eq!(err, MemoryError::ProgramOverflow { offset: 0xFFFF, len: 2 });
        assert_eq!(err.to_string(), "Program of 2 bytes at $FFFF runs past $FFFF");
        assert_eq!(mem.read_byte(0xFFFF), ROM_FILL);
        assert!(!mem.did_write());
    }

    #[test]
    fn empty_load_is_not_a_write() {
        let mut mem = Memory::new();
        assert!(mem.load_program(0x8000, &[]).is_ok());
        assert!(!mem.did_write());
    }

    #[test]
    fn reset_vector_roundtrip() {
        let mut mem = Memory::new();
        mem.set_reset_vector(0xC000);
        assert_eq!(mem.read_byte(RESET_VECTOR), 0x00);
        assert_eq!(mem.read_byte(RESET_VECTOR + 1), 0xC0);
        assert_eq!(mem.reset_vector(), 0xC000);
        assert_eq!(mem.nmi_vector(), 0xFEFE);
    }

    #[test]
    fn clone_is_independent() {
        let mut a = Memory::new();
        a.write_byte(0x0200, 1);
        let mut b = a.clone();
        b.write_byte(0x0200, 2);
        assert_eq!(a.read_byte(0x0200), 1);
        assert_eq!(b.read_byte(0x0200), 2);
    }
}
