use crate::core::Memory;
use crate::cpu::{
    Cpu, CpuConfig, CpuError, CpuStateTrait, DecodeError, Generation, RunSummary, Z80State,
    z80::Z80,
};

/// A CPU wired to a flat 64K memory.
///
/// This is the whole system for the emulator: no devices, no interrupts.
/// Programs are loaded, the CPU runs until HALT, and the caller inspects
/// registers and memory afterwards.
pub struct Machine {
    pub cpu: Z80,
    pub memory: Memory,
    clock: u64,
}

impl Machine {
    pub fn new(config: CpuConfig) -> Self {
        Self {
            cpu: Z80::with_config(config),
            memory: Memory::new(),
            clock: 0,
        }
    }

    pub fn z80() -> Self {
        Self::new(CpuConfig::z80())
    }

    pub fn i8080() -> Self {
        Self::new(CpuConfig::i8080())
    }

    pub fn generation(&self) -> Generation {
        self.cpu.config.generation
    }

    /// Copy `data` into memory at `address` without touching the CPU.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        self.memory.load(address, data);
    }

    /// Load `program` at `address` and point PC at it.
    pub fn load_program(&mut self, address: u16, program: &[u8]) {
        self.memory.load(address, program);
        self.cpu.pc = address;
    }

    pub fn read8(&self, address: u16) -> u8 {
        self.memory.read(address)
    }

    pub fn write8(&mut self, address: u16, value: u8) {
        self.memory.write(address, value);
    }

    /// High-byte-first word, as `Memory::read16`.
    pub fn read16(&self, address: u16) -> u16 {
        self.memory.read16(address)
    }

    pub fn write16(&mut self, address: u16, value: u16) {
        self.memory.write16(address, value);
    }

    /// Low-byte-first word, the order the CPU stores words in.
    pub fn read16_le(&self, address: u16) -> u16 {
        self.memory.read16_le(address)
    }

    pub fn write16_le(&mut self, address: u16, value: u16) {
        self.memory.write16_le(address, value);
    }

    /// Execute one instruction. Returns its T-states.
    pub fn step(&mut self) -> Result<u32, DecodeError> {
        let states = self.cpu.step(&mut self.memory)?;
        self.clock += states as u64;
        Ok(states)
    }

    /// Run from the current PC until HALT.
    ///
    /// On error the clock still includes every instruction that completed.
    pub fn run(&mut self) -> Result<RunSummary, CpuError> {
        let mut summary = RunSummary::default();
        let result = self.cpu.run_tallied(&mut self.memory, &mut summary);
        self.clock += summary.states;
        result.map(|()| summary)
    }

    /// Set PC to `address` and run until HALT.
    pub fn run_from(&mut self, address: u16) -> Result<RunSummary, CpuError> {
        self.cpu.pc = address;
        self.run()
    }

    /// Total T-states executed since construction or the last reset.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Reset the CPU and clear the clock. Memory is left intact.
    pub fn reset(&mut self) {
        Cpu::reset(&mut self.cpu);
        self.clock = 0;
    }

    pub fn cpu_state(&self) -> Z80State {
        self.cpu.snapshot()
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(CpuConfig::default())
    }
}
