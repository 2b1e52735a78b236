pub mod core;
pub mod cpu;

pub mod prelude {
    pub use crate::core::{Bus, Machine, Memory};
    pub use crate::cpu::z80::{Flag, Z80};
    pub use crate::cpu::{
        Cpu, CpuConfig, CpuError, CpuStateTrait, DecodeError, Generation, RefreshMode,
        RunSummary,
    };
}
