//! MOS 6502 machine state: register file, status flags and the flat 64KiB
//! address space with its descending hardware stack.
//!
//! An instruction engine owns one [`Registers`] and one [`Memory`] and drives
//! them through the [`Memory6502`] contract. The two halves never reference
//! each other; the stack pointer is handed to each stack operation.
//!
//! ```rust
//! use mos6502_core::{Memory, Memory6502, Registers};
//!
//! let mut regs = Registers::new();
//! let mut mem = Memory::new();
//! mem.stack_push_word(&mut regs.sp, regs.pc);
//! assert_eq!(regs.sp, 0xFB);
//! assert_eq!(mem.stack_pull_word(&mut regs.sp), 0x8000);
//! ```

pub mod flags;
pub mod logging;
pub mod memory;
pub mod registers;
pub mod state;

pub use flags::Status;
pub use memory::{Memory, Memory6502, MemoryError, Region};
pub use registers::Registers;
pub use state::{Snapshot, StateError};
