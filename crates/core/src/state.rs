//! JSON save states.
//!
//! A snapshot holds the register file and the writable part of the address
//! space (zero page, stack and RAM). ROM is cartridge data and stays out of
//! save states, so restoring never touches it.

use crate::logging::{log, LogCategory, LogLevel};
use crate::memory::{Memory, RAM_END, ZERO_PAGE_START};
use crate::registers::Registers;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const STATE_VERSION: u32 = 1;

/// Bytes covered by a snapshot: $0000-$7FFF.
pub const SNAPSHOT_RAM_LEN: usize = RAM_END as usize - ZERO_PAGE_START as usize + 1;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Unsupported save state version: {0}")]
    Version(u32),
    #[error("Invalid RAM image size: {0} bytes")]
    RamLength(usize),
    #[error("Malformed save state: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub registers: Registers,
    pub ram: Vec<u8>,
}

impl Snapshot {
    pub fn capture(registers: &Registers, memory: &Memory) -> Self {
        let ram = memory.slice(ZERO_PAGE_START, SNAPSHOT_RAM_LEN).to_vec();
        Self {
            version: STATE_VERSION,
            registers: *registers,
            ram,
        }
    }

    /// Check the snapshot can be applied without changing anything.
    pub fn validate(&self) -> Result<(), StateError> {
        if self.version != STATE_VERSION {
            return Err(StateError::Version(self.version));
        }
        if self.ram.len() != SNAPSHOT_RAM_LEN {
            return Err(StateError::RamLength(self.ram.len()));
        }
        Ok(())
    }

    /// Overwrite `registers` and $0000-$7FFF of `memory`. On error neither is modified.
    pub fn restore(&self, registers: &mut Registers, memory: &mut Memory) -> Result<(), StateError> {
        if let Err(err) = self.validate() {
            log(LogCategory::State, LogLevel::Warn, || {
                format!("refusing to restore snapshot: {}", err)
            });
            return Err(err);
        }

        // validate() guarantees the image ends at $7FFF
        memory
            .load_program(ZERO_PAGE_START, &self.ram)
            .map_err(|_| StateError::RamLength(self.ram.len()))?;
        *registers = self.registers;

        log(LogCategory::State, LogLevel::Info, || {
            format!("restored snapshot: {}", registers)
        });
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "version": self.version,
            "registers": self.registers,
            "ram": self.ram,
        })
    }

    pub fn from_json(v: &Value) -> Result<Self, StateError> {
        let snapshot = Snapshot::deserialize(v)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}
