#![allow(dead_code)]

use z80emu_core::core::Bus;
use z80emu_core::cpu::z80::Z80;

/// Minimal bus for testing: flat 64KB read/write memory plus a port space
/// that returns preset input values and records every output.
pub struct TestBus {
    pub memory: [u8; 0x10000],
    pub ports: [u8; 0x100],
    pub io_reads: Vec<u16>,
    pub io_writes: Vec<(u16, u8)>,
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            memory: [0; 0x10000],
            ports: [0xFF; 0x100],
            io_reads: Vec::new(),
            io_writes: Vec::new(),
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }
}

impl Bus for TestBus {
    type Address = u16;
    type Data = u8;

    fn read(&mut self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.memory[addr as usize] = data;
    }

    fn io_read(&mut self, port: u16) -> u8 {
        self.io_reads.push(port);
        self.ports[(port & 0xFF) as usize]
    }

    fn io_write(&mut self, port: u16, data: u8) {
        self.io_writes.push((port, data));
    }
}

/// Execute one instruction, returning its T-states.
pub fn run_instruction(cpu: &mut Z80, bus: &mut TestBus) -> u32 {
    cpu.step(bus).expect("instruction should decode")
}

/// Flag bit masks, matching `Flag` as u8.
pub const C: u8 = 0x01;
pub const N: u8 = 0x02;
pub const PV: u8 = 0x04;
pub const X: u8 = 0x08;
pub const H: u8 = 0x10;
pub const Y: u8 = 0x20;
pub const Z: u8 = 0x40;
pub const S: u8 = 0x80;
