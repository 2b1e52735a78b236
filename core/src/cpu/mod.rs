use crate::core::Bus;

/// Generic CPU interface
pub trait Cpu: CpuStateTrait {
    /// Return to the power-on register state.
    fn reset(&mut self);

    /// Fetch, decode and execute one instruction. Returns T-states consumed.
    fn step_instruction(
        &mut self,
        bus: &mut dyn Bus<Address = u16, Data = u8>,
    ) -> Result<u32, DecodeError>;

    /// True once HALT has executed.
    fn is_halted(&self) -> bool;
}

pub mod config;
pub use config::{CpuConfig, Generation, RefreshMode, RunSummary};

pub mod error;
pub use error::{CpuError, DecodeError};

// Re-export state types
pub mod state;
pub use state::{CpuStateTrait, Z80State};

// Z80 CPU (also runs in 8080 mode)
pub mod z80;
pub use z80::Z80;
