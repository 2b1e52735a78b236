mod alu;
mod bit;
mod block;
mod branch;
pub mod decode;
mod io;
mod load_store;
mod stack;
mod timing;

pub use alu::{daa_correction, parity};
pub use decode::{
    AluOp, BlockOp, Condition, Decoded, IndexReg, Instruction, Loc8, Reg8, Reg16, RotOp, Src8,
    Table,
};

use crate::core::Bus;
use crate::cpu::{
    Cpu, CpuConfig, CpuError, DecodeError, Generation, RefreshMode, RunSummary,
    state::{CpuStateTrait, Z80State},
};

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flag {
    C = 0x01,  // Carry
    N = 0x02,  // Add/Subtract
    PV = 0x04, // Parity/Overflow
    X = 0x08,  // Unused (copy of bit 3)
    H = 0x10,  // Half Carry
    Y = 0x20,  // Unused (copy of bit 5)
    Z = 0x40,  // Zero
    S = 0x80,  // Sign
}

pub struct Z80 {
    // Registers
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    // Shadow Registers
    pub a_prime: u8,
    pub f_prime: u8,
    pub b_prime: u8,
    pub c_prime: u8,
    pub d_prime: u8,
    pub e_prime: u8,
    pub h_prime: u8,
    pub l_prime: u8,
    // Index & Special Registers
    pub ix: u16,
    pub iy: u16,
    pub i: u8,
    pub r: u8,
    pub sp: u16,
    pub pc: u16,

    // Internal state
    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,
    pub halted: bool,

    pub config: CpuConfig,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    pub fn new() -> Self {
        Self::with_config(CpuConfig::default())
    }

    pub fn with_config(config: CpuConfig) -> Self {
        let mut cpu = Self {
            a: 0xFF,
            f: 0xFF,
            b: 0xFF,
            c: 0xFF,
            d: 0xFF,
            e: 0xFF,
            h: 0xFF,
            l: 0xFF,
            a_prime: 0xFF,
            f_prime: 0xFF,
            b_prime: 0xFF,
            c_prime: 0xFF,
            d_prime: 0xFF,
            e_prime: 0xFF,
            h_prime: 0xFF,
            l_prime: 0xFF,
            ix: 0xFFFF,
            iy: 0xFFFF,
            i: 0,
            r: 0,
            sp: 0xFFFF,
            pc: 0x0000,
            iff1: false,
            iff2: false,
            im: 0,
            halted: false,
            config,
        };
        cpu.write_flags(cpu.f);
        cpu
    }

    /// Convenience constructor for 8080 mode.
    pub fn i8080() -> Self {
        Self::with_config(CpuConfig::i8080())
    }

    pub fn generation(&self) -> Generation {
        self.config.generation
    }

    // --- Register pairs ---

    pub fn get_bc(&self) -> u16 { ((self.b as u16) << 8) | self.c as u16 }
    pub fn set_bc(&mut self, val: u16) { self.b = (val >> 8) as u8; self.c = val as u8; }

    pub fn get_de(&self) -> u16 { ((self.d as u16) << 8) | self.e as u16 }
    pub fn set_de(&mut self, val: u16) { self.d = (val >> 8) as u8; self.e = val as u8; }

    pub fn get_hl(&self) -> u16 { ((self.h as u16) << 8) | self.l as u16 }
    pub fn set_hl(&mut self, val: u16) { self.h = (val >> 8) as u8; self.l = val as u8; }

    pub fn get_af(&self) -> u16 { ((self.a as u16) << 8) | self.f as u16 }
    pub fn set_af(&mut self, val: u16) { self.a = (val >> 8) as u8; self.write_flags(val as u8); }

    pub fn get_reg8(&self, reg: Reg8) -> u8 {
        match reg {
            Reg8::B => self.b,
            Reg8::C => self.c,
            Reg8::D => self.d,
            Reg8::E => self.e,
            Reg8::H => self.h,
            Reg8::L => self.l,
            Reg8::A => self.a,
            Reg8::IXH => (self.ix >> 8) as u8,
            Reg8::IXL => self.ix as u8,
            Reg8::IYH => (self.iy >> 8) as u8,
            Reg8::IYL => self.iy as u8,
        }
    }

    pub fn set_reg8(&mut self, reg: Reg8, val: u8) {
        match reg {
            Reg8::B => self.b = val,
            Reg8::C => self.c = val,
            Reg8::D => self.d = val,
            Reg8::E => self.e = val,
            Reg8::H => self.h = val,
            Reg8::L => self.l = val,
            Reg8::A => self.a = val,
            Reg8::IXH => self.ix = (self.ix & 0x00FF) | ((val as u16) << 8),
            Reg8::IXL => self.ix = (self.ix & 0xFF00) | val as u16,
            Reg8::IYH => self.iy = (self.iy & 0x00FF) | ((val as u16) << 8),
            Reg8::IYL => self.iy = (self.iy & 0xFF00) | val as u16,
        }
    }

    pub fn get_reg16(&self, reg: Reg16) -> u16 {
        match reg {
            Reg16::BC => self.get_bc(),
            Reg16::DE => self.get_de(),
            Reg16::HL => self.get_hl(),
            Reg16::SP => self.sp,
            Reg16::AF => self.get_af(),
            Reg16::IX => self.ix,
            Reg16::IY => self.iy,
        }
    }

    pub fn set_reg16(&mut self, reg: Reg16, val: u16) {
        match reg {
            Reg16::BC => self.set_bc(val),
            Reg16::DE => self.set_de(val),
            Reg16::HL => self.set_hl(val),
            Reg16::SP => self.sp = val,
            Reg16::AF => self.set_af(val),
            Reg16::IX => self.ix = val,
            Reg16::IY => self.iy = val,
        }
    }

    // --- Opcode field access ---

    /// Read the register selected by a 3-bit field; code 6 reads `(HL)`.
    pub fn get_r<B: Bus<Address = u16, Data = u8> + ?Sized>(&self, bus: &mut B, code: u8) -> u8 {
        match Reg8::from_field(code) {
            Some(reg) => self.get_reg8(reg),
            None => bus.read(self.get_hl()),
        }
    }

    /// Write the register selected by a 3-bit field; code 6 writes `(HL)`.
    pub fn put_r<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        code: u8,
        val: u8,
    ) {
        match Reg8::from_field(code) {
            Some(reg) => self.set_reg8(reg, val),
            None => bus.write(self.get_hl(), val),
        }
    }

    /// BC, DE, HL, SP by 2-bit code.
    pub fn get_ss(&self, code: u8) -> u16 { self.get_reg16(Reg16::ss(code)) }
    pub fn put_ss(&mut self, code: u8, val: u16) { self.set_reg16(Reg16::ss(code), val) }

    /// BC, DE, HL, AF by 2-bit code.
    pub fn get_qq(&self, code: u8) -> u16 { self.get_reg16(Reg16::qq(code)) }
    pub fn put_qq(&mut self, code: u8, val: u16) { self.set_reg16(Reg16::qq(code), val) }

    // --- Flags ---

    /// 1 if `flag` is set, 0 otherwise.
    pub fn get_flag(&self, flag: Flag) -> u8 {
        (self.f & flag as u8 != 0) as u8
    }

    pub fn set_flag(&mut self, flag: Flag) {
        self.write_flags(self.f | flag as u8);
    }

    pub fn clear_flag(&mut self, flag: Flag) {
        self.write_flags(self.f & !(flag as u8));
    }

    pub(crate) fn flag(&self, flag: Flag) -> bool {
        self.f & flag as u8 != 0
    }

    /// Store a new flag byte. On the 8080 the PSW has bit 1 forced to 1 and
    /// bits 3 and 5 forced to 0.
    pub(crate) fn write_flags(&mut self, f: u8) {
        self.f = match self.config.generation {
            Generation::Z80 => f,
            Generation::I8080 => (f & !(Flag::X as u8 | Flag::Y as u8)) | Flag::N as u8,
        };
    }

    pub(crate) fn is_z80(&self) -> bool {
        self.config.generation == Generation::Z80
    }

    // --- Exchanges ---

    /// EXX: swap BC/DE/HL with their shadows. AF is untouched.
    pub fn exx(&mut self) {
        std::mem::swap(&mut self.b, &mut self.b_prime);
        std::mem::swap(&mut self.c, &mut self.c_prime);
        std::mem::swap(&mut self.d, &mut self.d_prime);
        std::mem::swap(&mut self.e, &mut self.e_prime);
        std::mem::swap(&mut self.h, &mut self.h_prime);
        std::mem::swap(&mut self.l, &mut self.l_prime);
    }

    /// EX AF,AF'
    pub fn ex_af(&mut self) {
        std::mem::swap(&mut self.a, &mut self.a_prime);
        std::mem::swap(&mut self.f, &mut self.f_prime);
    }

    /// Swap the full main set (AF, BC, DE, HL) with the alternate set.
    pub fn swap_all(&mut self) {
        self.ex_af();
        self.exx();
    }

    // --- Operand locations ---

    pub(crate) fn index_value(&self, ix: IndexReg) -> u16 {
        match ix {
            IndexReg::IX => self.ix,
            IndexReg::IY => self.iy,
        }
    }

    /// Effective address of a memory operand, `None` for a register.
    pub(crate) fn loc_address(&self, loc: Loc8) -> Option<u16> {
        match loc {
            Loc8::Reg(_) => None,
            Loc8::HlInd => Some(self.get_hl()),
            Loc8::Indexed(ix, d) => Some(self.index_value(ix).wrapping_add(d as i16 as u16)),
        }
    }

    pub(crate) fn read_loc<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &self,
        bus: &mut B,
        loc: Loc8,
    ) -> u8 {
        match loc {
            Loc8::Reg(reg) => self.get_reg8(reg),
            Loc8::HlInd => bus.read(self.get_hl()),
            Loc8::Indexed(ix, d) => bus.read(self.index_value(ix).wrapping_add(d as i16 as u16)),
        }
    }

    pub(crate) fn write_loc<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        loc: Loc8,
        val: u8,
    ) {
        match loc {
            Loc8::Reg(reg) => self.set_reg8(reg, val),
            Loc8::HlInd => bus.write(self.get_hl(), val),
            Loc8::Indexed(ix, d) => {
                bus.write(self.index_value(ix).wrapping_add(d as i16 as u16), val)
            }
        }
    }

    /// Pick a state count by operand kind. Indexed counts exclude the
    /// DD/FD prefix fetch, which `step` adds.
    pub(crate) fn loc_states(loc: Loc8, reg: u32, hl: u32, indexed: u32) -> u32 {
        match loc {
            Loc8::Reg(_) => reg,
            Loc8::HlInd => hl,
            Loc8::Indexed(..) => indexed,
        }
    }

    /// Little-endian word read.
    pub(crate) fn read_word<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &self,
        bus: &mut B,
        addr: u16,
    ) -> u16 {
        let lo = bus.read(addr) as u16;
        let hi = bus.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Little-endian word write.
    pub(crate) fn write_word<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &self,
        bus: &mut B,
        addr: u16,
        val: u16,
    ) {
        bus.write(addr, val as u8);
        bus.write(addr.wrapping_add(1), (val >> 8) as u8);
    }

    /// Advance the low 7 bits of R, keeping bit 7.
    pub(crate) fn refresh(&mut self) {
        self.r = (self.r & 0x80) | (self.r.wrapping_add(1) & 0x7F);
    }

    // --- Execution ---

    /// Fetch, decode and execute one instruction. Returns the T-states it took.
    pub fn step<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
    ) -> Result<u32, DecodeError> {
        let pc = self.pc;
        let decoded = match self.decode(bus) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::warn!("{e}");
                return Err(e);
            }
        };
        log::trace!("{pc:04X}: {:?}", decoded.instruction);

        let states = self.execute(bus, decoded.instruction);
        let states = match self.config.generation {
            Generation::Z80 => states + 4 * decoded.index_prefixes as u32,
            Generation::I8080 => timing::i8080_states(decoded.opcode, states),
        };
        if self.config.refresh == RefreshMode::Legacy {
            self.refresh();
        }
        Ok(states)
    }

    /// Run until HALT executes.
    ///
    /// A previously halted CPU resumes at PC. Fails on the first decode error,
    /// or with `StepLimit` when the configured step limit runs out first.
    pub fn run<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
    ) -> Result<RunSummary, CpuError> {
        let mut summary = RunSummary::default();
        self.run_tallied(bus, &mut summary)?;
        Ok(summary)
    }

    /// `run`, with the totals kept in `summary` so they survive an error.
    /// Instructions that completed before the failure are counted.
    pub(crate) fn run_tallied<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        summary: &mut RunSummary,
    ) -> Result<(), CpuError> {
        self.halted = false;
        while !self.halted {
            if let Some(limit) = self.config.step_limit {
                if summary.instructions >= limit {
                    return Err(CpuError::StepLimit {
                        executed: summary.instructions,
                    });
                }
            }
            summary.states += self.step(bus)? as u64;
            summary.instructions += 1;
        }
        log::debug!(
            "HALT at {:04X} after {} instructions, {} T-states",
            self.pc.wrapping_sub(1),
            summary.instructions,
            summary.states
        );
        Ok(())
    }

    /// Dispatch a decoded instruction to its handler. Returns T-states,
    /// not counting DD/FD prefixes.
    fn execute<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        instruction: Instruction,
    ) -> u32 {
        match instruction {
            Instruction::Nop => 4,
            Instruction::Halt => {
                self.halted = true;
                4
            }

            Instruction::Ld { dst, src } => self.op_ld(bus, dst, src),
            Instruction::LdImm { dst, value } => self.op_ld_imm(bus, dst, value),
            Instruction::LdAFromPair(rp) => self.op_ld_a_from_pair(bus, rp),
            Instruction::LdPairFromA(rp) => self.op_ld_pair_from_a(bus, rp),
            Instruction::LdAFromAbs(addr) => self.op_ld_a_from_abs(bus, addr),
            Instruction::LdAbsFromA(addr) => self.op_ld_abs_from_a(bus, addr),
            Instruction::LdIA => self.op_ld_i_a(),
            Instruction::LdRA => self.op_ld_r_a(),
            Instruction::LdAI => self.op_ld_a_i(),
            Instruction::LdAR => self.op_ld_a_r(),

            Instruction::Ld16Imm { dst, value } => self.op_ld16_imm(dst, value),
            Instruction::Ld16FromAbs {
                dst,
                addr,
                extended,
            } => self.op_ld16_from_abs(bus, dst, addr, extended),
            Instruction::Ld16ToAbs {
                src,
                addr,
                extended,
            } => self.op_ld16_to_abs(bus, src, addr, extended),
            Instruction::LdSp(src) => self.op_ld_sp(src),
            Instruction::Push(rp) => self.op_push(bus, rp),
            Instruction::Pop(rp) => self.op_pop(bus, rp),

            Instruction::ExDeHl => self.op_ex_de_hl(),
            Instruction::ExAf => self.op_ex_af(),
            Instruction::Exx => self.op_exx(),
            Instruction::ExSp(rp) => self.op_ex_sp(bus, rp),

            Instruction::Alu { op, src } => self.op_alu(bus, op, src),
            Instruction::Inc(loc) => self.op_inc(bus, loc),
            Instruction::Dec(loc) => self.op_dec(bus, loc),
            Instruction::Daa => self.op_daa(),
            Instruction::Cpl => self.op_cpl(),
            Instruction::Scf => self.op_scf(),
            Instruction::Ccf => self.op_ccf(),
            Instruction::Neg => self.op_neg(),

            Instruction::Add16 { dst, src } => self.op_add16(dst, src),
            Instruction::Adc16(src) => self.op_adc16(src),
            Instruction::Sbc16(src) => self.op_sbc16(src),
            Instruction::Inc16(rp) => self.op_inc16(rp),
            Instruction::Dec16(rp) => self.op_dec16(rp),

            Instruction::Rlca => self.op_rlca(),
            Instruction::Rrca => self.op_rrca(),
            Instruction::Rla => self.op_rla(),
            Instruction::Rra => self.op_rra(),
            Instruction::Rrd => self.op_rrd(bus),
            Instruction::Rld => self.op_rld(bus),

            Instruction::Rot { op, loc, copy } => self.op_rot(bus, op, loc, copy),
            Instruction::Bit { bit, loc } => self.op_bit(bus, bit, loc),
            Instruction::Res { bit, loc, copy } => self.op_res(bus, bit, loc, copy),
            Instruction::Set { bit, loc, copy } => self.op_set(bus, bit, loc, copy),

            Instruction::Jp { cond, addr } => self.op_jp(cond, addr),
            Instruction::JpInd(rp) => self.op_jp_ind(rp),
            Instruction::Jr { cond, disp } => self.op_jr(cond, disp),
            Instruction::Djnz(disp) => self.op_djnz(disp),
            Instruction::Call { cond, addr } => self.op_call(bus, cond, addr),
            Instruction::Ret(cond) => self.op_ret(bus, cond),
            Instruction::Retn => self.op_retn(bus),
            Instruction::Reti => self.op_reti(bus),
            Instruction::Rst(target) => self.op_rst(bus, target),

            Instruction::InAPort(port) => self.op_in_a_port(bus, port),
            Instruction::OutPortA(port) => self.op_out_port_a(bus, port),
            Instruction::InC(reg) => self.op_in_c(bus, reg),
            Instruction::OutC(reg) => self.op_out_c(bus, reg),

            Instruction::Di => self.op_di(),
            Instruction::Ei => self.op_ei(),
            Instruction::Im(mode) => self.op_im(mode),

            Instruction::Block(op) => self.op_block(bus, op),
        }
    }
}

impl Cpu for Z80 {
    fn reset(&mut self) {
        self.a = 0xFF;
        self.write_flags(0xFF);
        self.sp = 0xFFFF;
        self.pc = 0x0000;
        self.i = 0;
        self.r = 0;
        self.im = 0;
        self.iff1 = false;
        self.iff2 = false;
        self.halted = false;
    }

    fn step_instruction(
        &mut self,
        bus: &mut dyn Bus<Address = u16, Data = u8>,
    ) -> Result<u32, DecodeError> {
        self.step(bus)
    }

    fn is_halted(&self) -> bool {
        self.halted
    }
}

impl CpuStateTrait for Z80 {
    type Snapshot = Z80State;

    fn snapshot(&self) -> Z80State {
        Z80State {
            a: self.a,
            f: self.f,
            b: self.b,
            c: self.c,
            d: self.d,
            e: self.e,
            h: self.h,
            l: self.l,
            a_prime: self.a_prime,
            f_prime: self.f_prime,
            b_prime: self.b_prime,
            c_prime: self.c_prime,
            d_prime: self.d_prime,
            e_prime: self.e_prime,
            h_prime: self.h_prime,
            l_prime: self.l_prime,
            ix: self.ix,
            iy: self.iy,
            sp: self.sp,
            pc: self.pc,
            i: self.i,
            r: self.r,
            iff1: self.iff1,
            iff2: self.iff2,
            im: self.im,
            halted: self.halted,
        }
    }
}
