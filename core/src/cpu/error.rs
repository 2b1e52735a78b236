use thiserror::Error;

use crate::cpu::Generation;
use crate::cpu::z80::Table;

/// Raised when the byte stream at PC is not an instruction the selected
/// processor can execute. Execution stops; nothing is skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("undefined opcode {opcode:#04X} in {table} table at {pc:#06X}")]
    Undefined { table: Table, opcode: u8, pc: u16 },

    #[error("opcode {opcode:#04X} at {pc:#06X} is not available on the {generation}")]
    NotAvailable {
        opcode: u8,
        pc: u16,
        generation: Generation,
    },
}

impl DecodeError {
    /// Address of the first byte of the offending instruction.
    pub fn pc(&self) -> u16 {
        match *self {
            DecodeError::Undefined { pc, .. } | DecodeError::NotAvailable { pc, .. } => pc,
        }
    }
}

#[derive(Debug, Error)]
pub enum CpuError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("no HALT after {executed} instructions")]
    StepLimit { executed: u64 },
}
