//! Opcode decoder.
//!
//! Reads the byte stream at PC and produces a typed [`Instruction`]. Prefix
//! bytes select the extended tables: `CB` bit operations, `ED` extended
//! operations, `DD`/`FD` index substitution and the doubly-prefixed
//! `DD CB d op` / `FD CB d op` indexed bit operations.
//!
//! Every operand byte consumed here advances PC, so after `decode` returns PC
//! points at the next instruction.

use std::fmt;

use crate::core::Bus;
use crate::cpu::z80::Z80;
use crate::cpu::{DecodeError, Generation};

/// 3-bit register field at bit `offset` of `opcode`.
pub fn field_r(opcode: u8, offset: u8) -> u8 {
    (opcode >> offset) & 0x07
}

/// Source register field (bits 0-2).
pub fn field_sr(opcode: u8) -> u8 {
    field_r(opcode, 0)
}

/// Destination register field (bits 3-5).
pub fn field_dr(opcode: u8) -> u8 {
    field_r(opcode, 3)
}

/// Register pair field (bits 4-5), shared by the ss and qq encodings.
pub fn field_rp(opcode: u8) -> u8 {
    (opcode >> 4) & 0x03
}

/// Opcodes the 8080 does not have. On the 8080 these bytes are undocumented
/// aliases; this core refuses them.
pub fn is_z80_only(opcode: u8) -> bool {
    matches!(
        opcode,
        0x08 | 0x10 | 0x18 | 0x20 | 0x28 | 0x30 | 0x38 | 0xCB | 0xD9 | 0xDD | 0xED | 0xFD
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg8 {
    B,
    C,
    D,
    E,
    H,
    L,
    A,
    IXH,
    IXL,
    IYH,
    IYL,
}

impl Reg8 {
    /// Decode a 3-bit register field. Code 6 is the `(HL)` slot and has no
    /// register.
    pub fn from_field(code: u8) -> Option<Reg8> {
        match code & 0x07 {
            0 => Some(Reg8::B),
            1 => Some(Reg8::C),
            2 => Some(Reg8::D),
            3 => Some(Reg8::E),
            4 => Some(Reg8::H),
            5 => Some(Reg8::L),
            6 => None,
            _ => Some(Reg8::A),
        }
    }

    fn substitute(self, index: Option<IndexReg>) -> Reg8 {
        match (self, index) {
            (Reg8::H, Some(IndexReg::IX)) => Reg8::IXH,
            (Reg8::L, Some(IndexReg::IX)) => Reg8::IXL,
            (Reg8::H, Some(IndexReg::IY)) => Reg8::IYH,
            (Reg8::L, Some(IndexReg::IY)) => Reg8::IYL,
            (reg, _) => reg,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexReg {
    IX,
    IY,
}

impl IndexReg {
    pub fn reg16(self) -> Reg16 {
        match self {
            IndexReg::IX => Reg16::IX,
            IndexReg::IY => Reg16::IY,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg16 {
    BC,
    DE,
    HL,
    SP,
    AF,
    IX,
    IY,
}

impl Reg16 {
    /// "ss" encoding: BC, DE, HL, SP.
    pub fn ss(code: u8) -> Reg16 {
        match code & 0x03 {
            0 => Reg16::BC,
            1 => Reg16::DE,
            2 => Reg16::HL,
            _ => Reg16::SP,
        }
    }

    /// "qq" encoding (PUSH/POP): BC, DE, HL, AF.
    pub fn qq(code: u8) -> Reg16 {
        match code & 0x03 {
            0 => Reg16::BC,
            1 => Reg16::DE,
            2 => Reg16::HL,
            _ => Reg16::AF,
        }
    }

    fn substitute(self, index: Option<IndexReg>) -> Reg16 {
        match (self, index) {
            (Reg16::HL, Some(ix)) => ix.reg16(),
            (reg, _) => reg,
        }
    }
}

/// An 8-bit operand location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Loc8 {
    Reg(Reg8),
    /// `(HL)`
    HlInd,
    /// `(IX+d)` / `(IY+d)`
    Indexed(IndexReg, i8),
}

/// Source operand of an 8-bit ALU instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Src8 {
    Loc(Loc8),
    Imm(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    NZ,
    Z,
    NC,
    C,
    PO,
    PE,
    P,
    M,
}

impl Condition {
    pub fn from_field(code: u8) -> Condition {
        match code & 0x07 {
            0 => Condition::NZ,
            1 => Condition::Z,
            2 => Condition::NC,
            3 => Condition::C,
            4 => Condition::PO,
            5 => Condition::PE,
            6 => Condition::P,
            _ => Condition::M,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
}

impl AluOp {
    pub fn from_field(code: u8) -> AluOp {
        match code & 0x07 {
            0 => AluOp::Add,
            1 => AluOp::Adc,
            2 => AluOp::Sub,
            3 => AluOp::Sbc,
            4 => AluOp::And,
            5 => AluOp::Xor,
            6 => AluOp::Or,
            _ => AluOp::Cp,
        }
    }
}

/// CB-table rotate and shift operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotOp {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Sll,
    Srl,
}

impl RotOp {
    pub fn from_field(code: u8) -> RotOp {
        match code & 0x07 {
            0 => RotOp::Rlc,
            1 => RotOp::Rrc,
            2 => RotOp::Rl,
            3 => RotOp::Rr,
            4 => RotOp::Sla,
            5 => RotOp::Sra,
            6 => RotOp::Sll,
            _ => RotOp::Srl,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockOp {
    Ldi,
    Ldd,
    Ldir,
    Lddr,
    Cpi,
    Cpd,
    Cpir,
    Cpdr,
    Ini,
    Ind,
    Inir,
    Indr,
    Outi,
    Outd,
    Otir,
    Otdr,
}

impl BlockOp {
    /// ED A0-A3, A8-AB, B0-B3, B8-BB.
    pub fn from_opcode(opcode: u8) -> Option<BlockOp> {
        let op = match opcode {
            0xA0 => BlockOp::Ldi,
            0xA8 => BlockOp::Ldd,
            0xB0 => BlockOp::Ldir,
            0xB8 => BlockOp::Lddr,
            0xA1 => BlockOp::Cpi,
            0xA9 => BlockOp::Cpd,
            0xB1 => BlockOp::Cpir,
            0xB9 => BlockOp::Cpdr,
            0xA2 => BlockOp::Ini,
            0xAA => BlockOp::Ind,
            0xB2 => BlockOp::Inir,
            0xBA => BlockOp::Indr,
            0xA3 => BlockOp::Outi,
            0xAB => BlockOp::Outd,
            0xB3 => BlockOp::Otir,
            0xBB => BlockOp::Otdr,
            _ => return None,
        };
        Some(op)
    }

    /// HL (and DE) step downwards.
    pub fn decrements(self) -> bool {
        matches!(
            self,
            BlockOp::Ldd
                | BlockOp::Lddr
                | BlockOp::Cpd
                | BlockOp::Cpdr
                | BlockOp::Ind
                | BlockOp::Indr
                | BlockOp::Outd
                | BlockOp::Otdr
        )
    }

    pub fn repeats(self) -> bool {
        matches!(
            self,
            BlockOp::Ldir
                | BlockOp::Lddr
                | BlockOp::Cpir
                | BlockOp::Cpdr
                | BlockOp::Inir
                | BlockOp::Indr
                | BlockOp::Otir
                | BlockOp::Otdr
        )
    }
}

/// Which opcode map an instruction came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Table {
    Base,
    CB,
    ED,
    DD,
    FD,
    DDCB,
    FDCB,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Table::Base => "base",
            Table::CB => "CB",
            Table::ED => "ED",
            Table::DD => "DD",
            Table::FD => "FD",
            Table::DDCB => "DD CB",
            Table::FDCB => "FD CB",
        };
        f.write_str(name)
    }
}

/// A fully decoded instruction with its operands resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    Nop,
    Halt,

    // 8-bit loads
    Ld { dst: Loc8, src: Loc8 },
    LdImm { dst: Loc8, value: u8 },
    LdAFromPair(Reg16),
    LdPairFromA(Reg16),
    LdAFromAbs(u16),
    LdAbsFromA(u16),
    LdIA,
    LdRA,
    LdAI,
    LdAR,

    // 16-bit loads. `extended` marks the ED encodings, which are slower.
    Ld16Imm { dst: Reg16, value: u16 },
    Ld16FromAbs { dst: Reg16, addr: u16, extended: bool },
    Ld16ToAbs { src: Reg16, addr: u16, extended: bool },
    LdSp(Reg16),
    Push(Reg16),
    Pop(Reg16),

    // Exchanges
    ExDeHl,
    ExAf,
    Exx,
    ExSp(Reg16),

    // 8-bit arithmetic/logic
    Alu { op: AluOp, src: Src8 },
    Inc(Loc8),
    Dec(Loc8),
    Daa,
    Cpl,
    Scf,
    Ccf,
    Neg,

    // 16-bit arithmetic
    Add16 { dst: Reg16, src: Reg16 },
    Adc16(Reg16),
    Sbc16(Reg16),
    Inc16(Reg16),
    Dec16(Reg16),

    // Accumulator rotates and nibble rotates
    Rlca,
    Rrca,
    Rla,
    Rra,
    Rrd,
    Rld,

    // CB table. `copy` is the undocumented DD CB/FD CB register copy.
    Rot { op: RotOp, loc: Loc8, copy: Option<Reg8> },
    Bit { bit: u8, loc: Loc8 },
    Res { bit: u8, loc: Loc8, copy: Option<Reg8> },
    Set { bit: u8, loc: Loc8, copy: Option<Reg8> },

    // Control flow
    Jp { cond: Option<Condition>, addr: u16 },
    JpInd(Reg16),
    Jr { cond: Option<Condition>, disp: i8 },
    Djnz(i8),
    Call { cond: Option<Condition>, addr: u16 },
    Ret(Option<Condition>),
    Retn,
    Reti,
    Rst(u8),

    // I/O
    InAPort(u8),
    OutPortA(u8),
    /// `IN r,(C)`; `None` is the flags-only `IN (C)` form.
    InC(Option<Reg8>),
    /// `OUT (C),r`; `None` is the undocumented `OUT (C),0`.
    OutC(Option<Reg8>),

    // Interrupt control
    Di,
    Ei,
    Im(u8),

    Block(BlockOp),
}

/// Result of decoding one instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decoded {
    pub instruction: Instruction,
    /// Final opcode byte (after any prefixes and displacement).
    pub opcode: u8,
    pub table: Table,
    /// DD/FD prefix bytes consumed (0 or 1). Each costs 4 T-states.
    pub index_prefixes: u8,
}

impl Z80 {
    /// M1 fetch: read the byte at PC, advance PC, bump R.
    pub(crate) fn fetch_opcode<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
    ) -> u8 {
        let op = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        self.refresh();
        op
    }

    /// Operand fetch: read the byte at PC and advance PC.
    pub(crate) fn fetch_byte<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
    ) -> u8 {
        let val = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        val
    }

    /// Little-endian 16-bit operand.
    pub(crate) fn fetch_word<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
    ) -> u16 {
        let lo = self.fetch_byte(bus) as u16;
        let hi = self.fetch_byte(bus) as u16;
        (hi << 8) | lo
    }

    /// Decode the instruction at PC.
    ///
    /// On success PC points past the instruction. On error PC points past the
    /// bytes consumed so far; the error carries the instruction's start address.
    pub fn decode<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
    ) -> Result<Decoded, DecodeError> {
        let pc = self.pc;
        let mut index = None;
        let mut index_prefixes = 0u8;

        loop {
            let opcode = self.fetch_opcode(bus);
            if self.config.generation == Generation::I8080 && is_z80_only(opcode) {
                return Err(DecodeError::NotAvailable {
                    opcode,
                    pc,
                    generation: Generation::I8080,
                });
            }

            match opcode {
                0xDD | 0xFD if index.is_some() => {
                    // A prefix followed by another prefix executes on its own as
                    // a 4 T no-op. Leave PC on the second prefix so it starts
                    // the next instruction with its own M1 fetch.
                    self.pc = self.pc.wrapping_sub(1);
                    self.r = (self.r & 0x80) | (self.r.wrapping_sub(1) & 0x7F);
                    let (opcode, table) = match index {
                        Some(IndexReg::IY) => (0xFD, Table::FD),
                        _ => (0xDD, Table::DD),
                    };
                    return Ok(Decoded {
                        instruction: Instruction::Nop,
                        opcode,
                        table,
                        index_prefixes: 0,
                    });
                }
                0xDD => {
                    index = Some(IndexReg::IX);
                    index_prefixes = 1;
                }
                0xFD => {
                    index = Some(IndexReg::IY);
                    index_prefixes = 1;
                }
                0xCB => {
                    let decoded = match index {
                        None => {
                            let op = self.fetch_opcode(bus);
                            let loc = match Reg8::from_field(field_sr(op)) {
                                Some(reg) => Loc8::Reg(reg),
                                None => Loc8::HlInd,
                            };
                            Decoded {
                                instruction: decode_cb(op, loc, None),
                                opcode: op,
                                table: Table::CB,
                                index_prefixes,
                            }
                        }
                        Some(ix) => {
                            // DD CB d op: displacement precedes the opcode, and the
                            // opcode byte is not an M1 fetch.
                            let disp = self.fetch_byte(bus) as i8;
                            let op = self.fetch_byte(bus);
                            let copy = Reg8::from_field(field_sr(op));
                            Decoded {
                                instruction: decode_cb(op, Loc8::Indexed(ix, disp), copy),
                                opcode: op,
                                table: match ix {
                                    IndexReg::IX => Table::DDCB,
                                    IndexReg::IY => Table::FDCB,
                                },
                                index_prefixes,
                            }
                        }
                    };
                    return Ok(decoded);
                }
                0xED => {
                    // ED discards any pending index prefix.
                    let op = self.fetch_opcode(bus);
                    let instruction = self.decode_ed(bus, op).ok_or(DecodeError::Undefined {
                        table: Table::ED,
                        opcode: op,
                        pc,
                    })?;
                    return Ok(Decoded {
                        instruction,
                        opcode: op,
                        table: Table::ED,
                        index_prefixes,
                    });
                }
                _ => {
                    let table = match index {
                        None => Table::Base,
                        Some(IndexReg::IX) => Table::DD,
                        Some(IndexReg::IY) => Table::FD,
                    };
                    return Ok(Decoded {
                        instruction: self.decode_base(bus, opcode, index),
                        opcode,
                        table,
                        index_prefixes,
                    });
                }
            }
        }
    }

    /// Resolve a 3-bit register field to an operand, fetching the index
    /// displacement when the field selects `(HL)` under a DD/FD prefix.
    fn loc8<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        code: u8,
        index: Option<IndexReg>,
    ) -> Loc8 {
        match Reg8::from_field(code) {
            Some(reg) => Loc8::Reg(reg.substitute(index)),
            None => match index {
                None => Loc8::HlInd,
                Some(ix) => Loc8::Indexed(ix, self.fetch_byte(bus) as i8),
            },
        }
    }

    fn decode_base<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        opcode: u8,
        index: Option<IndexReg>,
    ) -> Instruction {
        let y = field_dr(opcode);
        let z = field_sr(opcode);
        let p = y >> 1;
        let q = y & 1;
        let hl = Reg16::HL.substitute(index);

        match opcode >> 6 {
            0 => match z {
                0 => match y {
                    0 => Instruction::Nop,
                    1 => Instruction::ExAf,
                    2 => Instruction::Djnz(self.fetch_byte(bus) as i8),
                    3 => Instruction::Jr {
                        cond: None,
                        disp: self.fetch_byte(bus) as i8,
                    },
                    _ => Instruction::Jr {
                        cond: Some(Condition::from_field(y - 4)),
                        disp: self.fetch_byte(bus) as i8,
                    },
                },
                1 => {
                    let rp = Reg16::ss(p).substitute(index);
                    if q == 0 {
                        Instruction::Ld16Imm {
                            dst: rp,
                            value: self.fetch_word(bus),
                        }
                    } else {
                        Instruction::Add16 { dst: hl, src: rp }
                    }
                }
                2 => match y {
                    0 => Instruction::LdPairFromA(Reg16::BC),
                    1 => Instruction::LdAFromPair(Reg16::BC),
                    2 => Instruction::LdPairFromA(Reg16::DE),
                    3 => Instruction::LdAFromPair(Reg16::DE),
                    4 => Instruction::Ld16ToAbs {
                        src: hl,
                        addr: self.fetch_word(bus),
                        extended: false,
                    },
                    5 => Instruction::Ld16FromAbs {
                        dst: hl,
                        addr: self.fetch_word(bus),
                        extended: false,
                    },
                    6 => Instruction::LdAbsFromA(self.fetch_word(bus)),
                    _ => Instruction::LdAFromAbs(self.fetch_word(bus)),
                },
                3 => {
                    let rp = Reg16::ss(p).substitute(index);
                    if q == 0 {
                        Instruction::Inc16(rp)
                    } else {
                        Instruction::Dec16(rp)
                    }
                }
                4 => Instruction::Inc(self.loc8(bus, y, index)),
                5 => Instruction::Dec(self.loc8(bus, y, index)),
                6 => {
                    let dst = self.loc8(bus, y, index);
                    let value = self.fetch_byte(bus);
                    Instruction::LdImm { dst, value }
                }
                _ => match y {
                    0 => Instruction::Rlca,
                    1 => Instruction::Rrca,
                    2 => Instruction::Rla,
                    3 => Instruction::Rra,
                    4 => Instruction::Daa,
                    5 => Instruction::Cpl,
                    6 => Instruction::Scf,
                    _ => Instruction::Ccf,
                },
            },
            1 => {
                if opcode == 0x76 {
                    Instruction::Halt
                } else if z == 6 || y == 6 {
                    // LD r,(IX+d) / LD (IX+d),r: the register side keeps plain H/L.
                    let dst = self.loc8(bus, y, if y == 6 { index } else { None });
                    let src = self.loc8(bus, z, if z == 6 { index } else { None });
                    Instruction::Ld { dst, src }
                } else {
                    Instruction::Ld {
                        dst: self.loc8(bus, y, index),
                        src: self.loc8(bus, z, index),
                    }
                }
            }
            2 => Instruction::Alu {
                op: AluOp::from_field(y),
                src: Src8::Loc(self.loc8(bus, z, index)),
            },
            _ => match z {
                0 => Instruction::Ret(Some(Condition::from_field(y))),
                1 => {
                    if q == 0 {
                        Instruction::Pop(Reg16::qq(p).substitute(index))
                    } else {
                        match p {
                            0 => Instruction::Ret(None),
                            1 => Instruction::Exx,
                            2 => Instruction::JpInd(hl),
                            _ => Instruction::LdSp(hl),
                        }
                    }
                }
                2 => Instruction::Jp {
                    cond: Some(Condition::from_field(y)),
                    addr: self.fetch_word(bus),
                },
                3 => match y {
                    0 => Instruction::Jp {
                        cond: None,
                        addr: self.fetch_word(bus),
                    },
                    2 => Instruction::OutPortA(self.fetch_byte(bus)),
                    3 => Instruction::InAPort(self.fetch_byte(bus)),
                    4 => Instruction::ExSp(hl),
                    // EX DE,HL is never index-substituted.
                    5 => Instruction::ExDeHl,
                    6 => Instruction::Di,
                    7 => Instruction::Ei,
                    _ => unreachable!("CB prefix is decoded before the base table"),
                },
                4 => Instruction::Call {
                    cond: Some(Condition::from_field(y)),
                    addr: self.fetch_word(bus),
                },
                5 => {
                    if q == 0 {
                        Instruction::Push(Reg16::qq(p).substitute(index))
                    } else if p == 0 {
                        Instruction::Call {
                            cond: None,
                            addr: self.fetch_word(bus),
                        }
                    } else {
                        unreachable!("DD/ED/FD prefixes are decoded before the base table")
                    }
                }
                6 => Instruction::Alu {
                    op: AluOp::from_field(y),
                    src: Src8::Imm(self.fetch_byte(bus)),
                },
                _ => Instruction::Rst(y * 8),
            },
        }
    }

    /// ED table. Returns `None` for the undefined entries.
    fn decode_ed<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        opcode: u8,
    ) -> Option<Instruction> {
        if let Some(op) = BlockOp::from_opcode(opcode) {
            return Some(Instruction::Block(op));
        }
        if !(0x40..=0x7F).contains(&opcode) {
            return None;
        }

        let y = field_dr(opcode);
        let p = y >> 1;
        let q = y & 1;
        let instruction = match field_sr(opcode) {
            0 => Instruction::InC(Reg8::from_field(y)),
            1 => Instruction::OutC(Reg8::from_field(y)),
            2 => {
                if q == 0 {
                    Instruction::Sbc16(Reg16::ss(p))
                } else {
                    Instruction::Adc16(Reg16::ss(p))
                }
            }
            3 => {
                let addr = self.fetch_word(bus);
                if q == 0 {
                    Instruction::Ld16ToAbs {
                        src: Reg16::ss(p),
                        addr,
                        extended: true,
                    }
                } else {
                    Instruction::Ld16FromAbs {
                        dst: Reg16::ss(p),
                        addr,
                        extended: true,
                    }
                }
            }
            4 => Instruction::Neg,
            5 => {
                if y == 1 {
                    Instruction::Reti
                } else {
                    Instruction::Retn
                }
            }
            6 => Instruction::Im([0, 0, 1, 2, 0, 0, 1, 2][y as usize]),
            _ => match y {
                0 => Instruction::LdIA,
                1 => Instruction::LdRA,
                2 => Instruction::LdAI,
                3 => Instruction::LdAR,
                4 => Instruction::Rrd,
                5 => Instruction::Rld,
                _ => return None,
            },
        };
        Some(instruction)
    }
}

fn decode_cb(opcode: u8, loc: Loc8, copy: Option<Reg8>) -> Instruction {
    let y = field_dr(opcode);
    match opcode >> 6 {
        0 => Instruction::Rot {
            op: RotOp::from_field(y),
            loc,
            copy,
        },
        1 => Instruction::Bit { bit: y, loc },
        2 => Instruction::Res { bit: y, loc, copy },
        _ => Instruction::Set { bit: y, loc, copy },
    }
}
