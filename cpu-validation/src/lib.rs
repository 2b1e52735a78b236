use std::collections::{BTreeSet, VecDeque};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use rand::Rng;
use serde::{Deserialize, Serialize};
use z80emu_core::core::Bus;
use z80emu_core::cpu::z80::{Z80, decode::is_z80_only};
use z80emu_core::cpu::{CpuConfig, Generation};

// --- TracingBus: flat 64KB memory plus port space, recording every access ---

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusOp {
    Read,
    Write,
    In,
    Out,
}

impl BusOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BusOp::Read => "read",
            BusOp::Write => "write",
            BusOp::In => "in",
            BusOp::Out => "out",
        }
    }
}

#[derive(Clone, Debug)]
pub struct BusCycle {
    pub addr: u16,
    pub data: u8,
    pub op: BusOp,
}

pub struct TracingBus {
    pub memory: [u8; 0x10000],
    /// Values handed out by successive port reads. Empty reads float high.
    pub port_queue: VecDeque<u8>,
    pub cycles: Vec<BusCycle>,
}

impl TracingBus {
    pub fn new() -> Self {
        Self {
            memory: [0; 0x10000],
            port_queue: VecDeque::new(),
            cycles: Vec::new(),
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.memory[addr.wrapping_add(i as u16) as usize] = byte;
        }
    }

    pub fn clear_cycles(&mut self) {
        self.cycles.clear();
    }

    /// Every memory address touched, in ascending order.
    pub fn touched(&self) -> BTreeSet<u16> {
        self.cycles
            .iter()
            .filter(|c| matches!(c.op, BusOp::Read | BusOp::Write))
            .map(|c| c.addr)
            .collect()
    }
}

impl Default for TracingBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for TracingBus {
    type Address = u16;
    type Data = u8;

    fn read(&mut self, addr: u16) -> u8 {
        let data = self.memory[addr as usize];
        self.cycles.push(BusCycle {
            addr,
            data,
            op: BusOp::Read,
        });
        data
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.memory[addr as usize] = data;
        self.cycles.push(BusCycle {
            addr,
            data,
            op: BusOp::Write,
        });
    }

    fn io_read(&mut self, port: u16) -> u8 {
        let data = self.port_queue.pop_front().unwrap_or(0xFF);
        self.cycles.push(BusCycle {
            addr: port,
            data,
            op: BusOp::In,
        });
        data
    }

    fn io_write(&mut self, port: u16, data: u8) {
        self.cycles.push(BusCycle {
            addr: port,
            data,
            op: BusOp::Out,
        });
    }
}

// --- JSON test vector types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub initial: CpuSnapshot,
    #[serde(rename = "final")]
    pub final_state: CpuSnapshot,
    /// T-states reported for the instruction.
    pub states: u32,
    /// Memory accesses in order: (address, data, "read" | "write").
    pub cycles: Vec<(u16, u8, String)>,
    /// Port accesses in order: (port, data, "in" | "out").
    #[serde(default)]
    pub ports: Vec<(u16, u8, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuSnapshot {
    pub pc: u16,
    pub sp: u16,
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub i: u8,
    pub r: u8,
    pub ix: u16,
    pub iy: u16,
    pub af_prime: u16,
    pub bc_prime: u16,
    pub de_prime: u16,
    pub hl_prime: u16,
    pub iff1: u8,
    pub iff2: u8,
    pub im: u8,
    pub ram: Vec<(u16, u8)>,
}

fn pair(hi: u8, lo: u8) -> u16 {
    ((hi as u16) << 8) | lo as u16
}

impl CpuSnapshot {
    /// Registers of `cpu`, with an empty RAM list.
    pub fn capture(cpu: &Z80) -> Self {
        Self {
            pc: cpu.pc,
            sp: cpu.sp,
            a: cpu.a,
            f: cpu.f,
            b: cpu.b,
            c: cpu.c,
            d: cpu.d,
            e: cpu.e,
            h: cpu.h,
            l: cpu.l,
            i: cpu.i,
            r: cpu.r,
            ix: cpu.ix,
            iy: cpu.iy,
            af_prime: pair(cpu.a_prime, cpu.f_prime),
            bc_prime: pair(cpu.b_prime, cpu.c_prime),
            de_prime: pair(cpu.d_prime, cpu.e_prime),
            hl_prime: pair(cpu.h_prime, cpu.l_prime),
            iff1: cpu.iff1 as u8,
            iff2: cpu.iff2 as u8,
            im: cpu.im,
            ram: Vec::new(),
        }
    }

    /// Load registers into `cpu` and RAM into `bus`.
    pub fn apply(&self, cpu: &mut Z80, bus: &mut TracingBus) {
        cpu.pc = self.pc;
        cpu.sp = self.sp;
        cpu.a = self.a;
        cpu.f = self.f;
        cpu.b = self.b;
        cpu.c = self.c;
        cpu.d = self.d;
        cpu.e = self.e;
        cpu.h = self.h;
        cpu.l = self.l;
        cpu.i = self.i;
        cpu.r = self.r;
        cpu.ix = self.ix;
        cpu.iy = self.iy;
        cpu.a_prime = (self.af_prime >> 8) as u8;
        cpu.f_prime = self.af_prime as u8;
        cpu.b_prime = (self.bc_prime >> 8) as u8;
        cpu.c_prime = self.bc_prime as u8;
        cpu.d_prime = (self.de_prime >> 8) as u8;
        cpu.e_prime = self.de_prime as u8;
        cpu.h_prime = (self.hl_prime >> 8) as u8;
        cpu.l_prime = self.hl_prime as u8;
        cpu.iff1 = self.iff1 != 0;
        cpu.iff2 = self.iff2 != 0;
        cpu.im = self.im;
        cpu.halted = false;
        for &(addr, val) in &self.ram {
            bus.memory[addr as usize] = val;
        }
    }
}

// --- Opcode keys ---

/// One generated file's worth of encodings: the prefix bytes and the final
/// opcode. For `DD CB` / `FD CB` the displacement sits between them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpcodeKey {
    pub prefix: Vec<u8>,
    pub opcode: u8,
}

impl OpcodeKey {
    pub fn base(opcode: u8) -> Self {
        Self {
            prefix: Vec::new(),
            opcode,
        }
    }

    /// Parse hex like `"86"`, `"0xED44"` or `"ddcb06"`.
    pub fn parse(text: &str) -> Result<Self> {
        let digits = text.trim_start_matches("0x").trim_start_matches("0X");
        if digits.is_empty() || !digits.is_ascii() || digits.len() % 2 != 0 || digits.len() > 6 {
            bail!("opcode key {text:?} must be 1 to 3 hex bytes");
        }
        let mut bytes = (0..digits.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&digits[i..i + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .with_context(|| format!("invalid hex in {text:?}"))?;
        let opcode = bytes.pop().context("empty opcode key")?;
        Ok(Self {
            prefix: bytes,
            opcode,
        })
    }

    pub fn is_indexed_bit(&self) -> bool {
        matches!(self.prefix.as_slice(), [0xDD | 0xFD, 0xCB])
    }

    /// Lowercase hex name used for file names, e.g. `ddcb06`.
    pub fn file_stem(&self) -> String {
        self.prefix
            .iter()
            .chain(std::iter::once(&self.opcode))
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// Write the encoding at `pc`. Operand bytes already in memory are kept.
    fn place(&self, bus: &mut TracingBus, pc: u16) {
        bus.load(pc, &self.prefix);
        let offset = self.prefix.len() as u16 + self.is_indexed_bit() as u16;
        bus.memory[pc.wrapping_add(offset) as usize] = self.opcode;
    }
}

/// Every encoding that decodes on `generation`.
pub fn all_opcode_keys(generation: Generation) -> Vec<OpcodeKey> {
    let mut candidates: Vec<OpcodeKey> = (0..=0xFFu8)
        .filter(|&op| !matches!(op, 0xCB | 0xDD | 0xED | 0xFD))
        .map(OpcodeKey::base)
        .collect();

    if generation == Generation::Z80 {
        for prefix in [vec![0xCB], vec![0xED], vec![0xDD], vec![0xFD], vec![0xDD, 0xCB], vec![0xFD, 0xCB]] {
            for opcode in 0..=0xFFu8 {
                if prefix.len() == 1 && prefix[0] != 0xCB && matches!(opcode, 0xCB | 0xDD | 0xED | 0xFD) {
                    continue;
                }
                candidates.push(OpcodeKey {
                    prefix: prefix.clone(),
                    opcode,
                });
            }
        }
    } else {
        candidates.retain(|key| !is_z80_only(key.opcode));
    }

    candidates
        .into_iter()
        .filter(|key| decodes(key, generation))
        .collect()
}

fn decodes(key: &OpcodeKey, generation: Generation) -> bool {
    let mut cpu = Z80::with_config(config_for(generation));
    let mut bus = TracingBus::new();
    key.place(&mut bus, 0);
    cpu.decode(&mut bus).is_ok()
}

pub fn config_for(generation: Generation) -> CpuConfig {
    match generation {
        Generation::Z80 => CpuConfig::z80(),
        Generation::I8080 => CpuConfig::i8080(),
    }
}

// --- Generation and replay ---

fn build_ram(memory: &[u8; 0x10000], addresses: &BTreeSet<u16>) -> Vec<(u16, u8)> {
    addresses
        .iter()
        .map(|&addr| (addr, memory[addr as usize]))
        .collect()
}

/// Build `count` randomized single-instruction vectors for `key`.
pub fn generate_cases(
    rng: &mut impl Rng,
    key: &OpcodeKey,
    generation: Generation,
    count: usize,
) -> Result<Vec<TestCase>> {
    let mut tests = Vec::with_capacity(count);

    for _ in 0..count {
        let mut cpu = Z80::with_config(config_for(generation));
        let mut bus = TracingBus::new();

        // Fill entire 64KB with random data
        rng.fill(&mut bus.memory[..]);
        for _ in 0..4 {
            bus.port_queue.push_back(rng.r#gen());
        }

        cpu.set_af(rng.r#gen());
        cpu.set_bc(rng.r#gen());
        cpu.set_de(rng.r#gen());
        cpu.set_hl(rng.r#gen());
        cpu.ix = rng.r#gen();
        cpu.iy = rng.r#gen();
        cpu.sp = rng.r#gen();
        cpu.pc = rng.r#gen();
        cpu.i = rng.r#gen();
        cpu.r = rng.r#gen();
        cpu.a_prime = rng.r#gen();
        cpu.f_prime = rng.r#gen();
        cpu.b_prime = rng.r#gen();
        cpu.c_prime = rng.r#gen();
        cpu.d_prime = rng.r#gen();
        cpu.e_prime = rng.r#gen();
        cpu.h_prime = rng.r#gen();
        cpu.l_prime = rng.r#gen();
        cpu.iff1 = rng.r#gen();
        cpu.iff2 = rng.r#gen();
        cpu.im = rng.gen_range(0..=2);

        let pc = cpu.pc;
        key.place(&mut bus, pc);

        let pre_memory = bus.memory;
        let mut initial = CpuSnapshot::capture(&cpu);

        let states = cpu
            .step(&mut bus)
            .with_context(|| format!("{} at {pc:#06X}", key.file_stem()))?;

        let mut final_state = CpuSnapshot::capture(&cpu);
        let addresses = bus.touched();
        initial.ram = build_ram(&pre_memory, &addresses);
        final_state.ram = build_ram(&bus.memory, &addresses);

        let (memory_cycles, port_cycles): (Vec<_>, Vec<_>) = bus
            .cycles
            .iter()
            .partition(|c| matches!(c.op, BusOp::Read | BusOp::Write));
        let to_tuples = |cycles: Vec<&BusCycle>| -> Vec<(u16, u8, String)> {
            cycles
                .into_iter()
                .map(|c| (c.addr, c.data, c.op.as_str().to_string()))
                .collect()
        };

        // Name from the instruction bytes at PC
        let len = memory_cycles
            .iter()
            .enumerate()
            .take_while(|(i, c)| c.op == BusOp::Read && c.addr == pc.wrapping_add(*i as u16))
            .count()
            .clamp(1, 4);
        let name = (0..len as u16)
            .map(|i| format!("{:02x}", pre_memory[pc.wrapping_add(i) as usize]))
            .collect::<Vec<_>>()
            .join(" ");

        tests.push(TestCase {
            name,
            initial,
            final_state,
            states,
            cycles: to_tuples(memory_cycles),
            ports: to_tuples(port_cycles),
        });
    }

    Ok(tests)
}

/// Run one vector against a fresh CPU. Returns the CPU and bus afterwards
/// together with the reported T-states.
pub fn replay(tc: &TestCase, generation: Generation) -> Result<(Z80, TracingBus, u32)> {
    let mut cpu = Z80::with_config(config_for(generation));
    let mut bus = TracingBus::new();
    tc.initial.apply(&mut cpu, &mut bus);
    bus.port_queue = tc
        .ports
        .iter()
        .filter(|(_, _, dir)| dir == "in")
        .map(|&(_, data, _)| data)
        .collect();

    let states = cpu
        .step(&mut bus)
        .with_context(|| format!("{}: decode failed", tc.name))?;
    Ok((cpu, bus, states))
}

// --- File IO ---

/// Read vectors from `.json` or `.json.gz`.
pub fn read_cases(path: &Path) -> Result<Vec<TestCase>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    let mut json = String::new();
    reader
        .read_to_string(&mut json)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
}

/// Write vectors as pretty JSON, gzip-compressed when `gzip` is set.
/// Returns the path written.
pub fn write_cases(dir: &Path, stem: &str, cases: &[TestCase], gzip: bool) -> Result<std::path::PathBuf> {
    let json = serde_json::to_string_pretty(cases)?;
    let path = if gzip {
        dir.join(format!("{stem}.json.gz"))
    } else {
        dir.join(format!("{stem}.json"))
    };
    let file = BufWriter::new(File::create(&path).with_context(|| format!("creating {}", path.display()))?);
    if gzip {
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(json.as_bytes())?;
        encoder.finish()?.flush()?;
    } else {
        let mut file = file;
        file.write_all(json.as_bytes())?;
        file.flush()?;
    }
    Ok(path)
}
