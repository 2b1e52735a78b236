use crate::core::Bus;
use crate::cpu::z80::{AluOp, Flag, Loc8, Reg16, Src8, Z80};

const XY: u8 = Flag::X as u8 | Flag::Y as u8;

/// Even parity: true when `val` has an even number of set bits.
pub fn parity(val: u8) -> bool {
    val.count_ones() % 2 == 0
}

/// One row of the Zilog DAA table. Nibble ranges are inclusive.
struct DaaRow {
    n: bool,
    carry: bool,
    high: (u8, u8),
    half: bool,
    low: (u8, u8),
    addend: u8,
    carry_out: bool,
}

const fn row(
    n: bool,
    carry: bool,
    high: (u8, u8),
    half: bool,
    low: (u8, u8),
    addend: u8,
    carry_out: bool,
) -> DaaRow {
    DaaRow { n, carry, high, half, low, addend, carry_out }
}

#[rustfmt::skip]
const DAA_TABLE: [DaaRow; 13] = [
    //  N      C      high          H      low           add   C'
    row(false, false, (0x0, 0x9), false, (0x0, 0x9), 0x00, false),
    row(false, false, (0x0, 0x8), false, (0xA, 0xF), 0x06, false),
    row(false, false, (0x0, 0x9), true,  (0x0, 0x3), 0x06, false),
    row(false, false, (0xA, 0xF), false, (0x0, 0x9), 0x60, true),
    row(false, false, (0x9, 0xF), false, (0xA, 0xF), 0x66, true),
    row(false, false, (0xA, 0xF), true,  (0x0, 0x3), 0x66, true),
    row(false, true,  (0x0, 0x2), false, (0x0, 0x9), 0x60, true),
    row(false, true,  (0x0, 0x2), false, (0xA, 0xF), 0x66, true),
    row(false, true,  (0x0, 0x3), true,  (0x0, 0x3), 0x66, true),
    row(true,  false, (0x0, 0x9), false, (0x0, 0x9), 0x00, false),
    row(true,  false, (0x0, 0x8), true,  (0x6, 0xF), 0xFA, false),
    row(true,  true,  (0x7, 0xF), false, (0x0, 0x9), 0xA0, true),
    row(true,  true,  (0x6, 0xF), true,  (0x6, 0xF), 0x9A, true),
];

/// BCD correction for `a`: returns the value to add to A and the new carry.
///
/// Inputs inside the documented BCD domain are looked up in the 13-row
/// Zilog table. Anything else (e.g. H set with a low nibble of 4-5 after an
/// add) falls back to the general rule the silicon implements.
pub fn daa_correction(a: u8, n: bool, half: bool, carry: bool) -> (u8, bool) {
    let high = a >> 4;
    let low = a & 0x0F;
    let hit = DAA_TABLE.iter().find(|r| {
        r.n == n
            && r.carry == carry
            && r.half == half
            && (r.high.0..=r.high.1).contains(&high)
            && (r.low.0..=r.low.1).contains(&low)
    });
    if let Some(r) = hit {
        return (r.addend, r.carry_out);
    }

    let mut correction = 0u8;
    let mut carry_out = carry;
    if half || low > 9 {
        correction |= 0x06;
    }
    if carry || a > 0x99 {
        correction |= 0x60;
        carry_out = true;
    }
    if n { (correction.wrapping_neg(), carry_out) } else { (correction, carry_out) }
}

fn sz(result: u8) -> u8 {
    let mut f = result & Flag::S as u8;
    if result == 0 { f |= Flag::Z as u8; }
    f
}

impl Z80 {
    // --- Flag Helpers ---

    /// PV after 8-bit arithmetic: overflow on the Z80, parity on the 8080.
    fn arith_pv(&self, overflow: bool, result: u8) -> u8 {
        let set = if self.is_z80() { overflow } else { parity(result) };
        if set { Flag::PV as u8 } else { 0 }
    }

    /// 8-bit add with optional carry-in. Sets S, Z, H, PV, C; clears N.
    pub fn add8(&mut self, a: u8, b: u8, carry: bool) -> u8 {
        let c = carry as u8;
        let sum = a as u16 + b as u16 + c as u16;
        let result = sum as u8;

        let mut f = sz(result);
        if (a & 0x0F) + (b & 0x0F) + c > 0x0F { f |= Flag::H as u8; }
        f |= self.arith_pv(((a ^ result) & (b ^ result) & 0x80) != 0, result);
        if sum > 0xFF { f |= Flag::C as u8; }

        f |= result & XY;
        self.write_flags(f);
        result
    }

    /// 8-bit subtract with optional borrow-in. Sets S, Z, H, PV, C; sets N.
    ///
    /// H is a borrow from bit 4 on the Z80. The 8080 auxiliary carry is the
    /// inverse: set when no borrow occurs.
    pub fn sub8(&mut self, a: u8, b: u8, carry: bool) -> u8 {
        let c = carry as u8;
        let diff = (a as u16).wrapping_sub(b as u16).wrapping_sub(c as u16);
        let result = diff as u8;
        let half_borrow = (a & 0x0F) < (b & 0x0F) + c;

        let mut f = Flag::N as u8 | sz(result);
        if half_borrow == self.is_z80() { f |= Flag::H as u8; }
        f |= self.arith_pv(((a ^ b) & (a ^ result) & 0x80) != 0, result);
        if diff > 0xFF { f |= Flag::C as u8; }

        f |= result & XY;
        self.write_flags(f);
        result
    }

    /// Compare: flags of `a - b`, result discarded.
    pub fn cp8(&mut self, a: u8, b: u8) {
        self.sub8(a, b, false);
        // X/Y come from the operand for CP, not the result
        if self.is_z80() {
            self.f = (self.f & !XY) | (b & XY);
        }
    }

    fn logic_flags(&mut self, result: u8, half: bool) {
        let mut f = sz(result);
        if parity(result) { f |= Flag::PV as u8; }
        if half { f |= Flag::H as u8; }
        // N is 0, C is 0
        f |= result & XY;
        self.write_flags(f);
    }

    fn perform_alu_op(&mut self, op: AluOp, val: u8) {
        let a = self.a;
        let carry = self.flag(Flag::C);
        match op {
            AluOp::Add => self.a = self.add8(a, val, false),
            AluOp::Adc => self.a = self.add8(a, val, carry),
            AluOp::Sub => self.a = self.sub8(a, val, false),
            AluOp::Sbc => self.a = self.sub8(a, val, carry),
            AluOp::And => {
                self.a = a & val;
                // 8080 AC on AND is bit 3 of the OR of the operands
                let half = self.is_z80() || ((a | val) & 0x08) != 0;
                self.logic_flags(self.a, half);
            }
            AluOp::Xor => {
                self.a = a ^ val;
                self.logic_flags(self.a, false);
            }
            AluOp::Or => {
                self.a = a | val;
                self.logic_flags(self.a, false);
            }
            AluOp::Cp => self.cp8(a, val),
        }
    }

    /// ALU A,src: ADD ADC SUB SBC AND XOR OR CP.
    /// 4 T register, 7 T immediate or (HL), 15 T (IX+d) before the prefix.
    pub fn op_alu<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        op: AluOp,
        src: Src8,
    ) -> u32 {
        let (val, states) = match src {
            Src8::Imm(n) => (n, 7),
            Src8::Loc(loc) => (self.read_loc(bus, loc), Self::loc_states(loc, 4, 7, 15)),
        };
        self.perform_alu_op(op, val);
        states
    }

    // --- INC/DEC ---

    fn inc8(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        let mut f = (self.f & Flag::C as u8) | sz(result);
        if (val & 0x0F) == 0x0F { f |= Flag::H as u8; }
        f |= self.arith_pv(val == 0x7F, result);
        f |= result & XY;
        self.write_flags(f);
        result
    }

    fn dec8(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        let mut f = (self.f & Flag::C as u8) | Flag::N as u8 | sz(result);
        let half = if self.is_z80() { (val & 0x0F) == 0 } else { (result & 0x0F) != 0x0F };
        if half { f |= Flag::H as u8; }
        f |= self.arith_pv(val == 0x80, result);
        f |= result & XY;
        self.write_flags(f);
        result
    }

    /// INC r / INC (HL) / INC (IX+d): 4 / 11 / 19 T. C preserved.
    pub fn op_inc<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B, loc: Loc8) -> u32 {
        let val = self.read_loc(bus, loc);
        let result = self.inc8(val);
        self.write_loc(bus, loc, result);
        Self::loc_states(loc, 4, 11, 19)
    }

    /// DEC r / DEC (HL) / DEC (IX+d): 4 / 11 / 19 T. C preserved.
    pub fn op_dec<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B, loc: Loc8) -> u32 {
        let val = self.read_loc(bus, loc);
        let result = self.dec8(val);
        self.write_loc(bus, loc, result);
        Self::loc_states(loc, 4, 11, 19)
    }

    // --- 16-bit arithmetic ---

    /// ADD HL,ss: H = carry from bit 11, C = carry from bit 15, N = 0.
    /// S, Z, PV preserved. X/Y from high byte of result. The 8080 DAD only
    /// touches C.
    pub fn add16(&mut self, a: u16, b: u16) -> u16 {
        let sum = a as u32 + b as u32;
        let result = sum as u16;
        let carry = if sum > 0xFFFF { Flag::C as u8 } else { 0 };

        let f = if self.is_z80() {
            let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
            if (a & 0x0FFF) + (b & 0x0FFF) > 0x0FFF { f |= Flag::H as u8; }
            f | carry | ((result >> 8) as u8 & XY)
        } else {
            (self.f & !(Flag::C as u8)) | carry
        };
        self.write_flags(f);
        result
    }

    /// ADC HL,ss: full 16-bit flags, PV = signed overflow.
    pub fn adc16(&mut self, a: u16, b: u16, carry: bool) -> u16 {
        let c = carry as u32;
        let sum = a as u32 + b as u32 + c;
        let result = sum as u16;

        let mut f = 0;
        if (result & 0x8000) != 0 { f |= Flag::S as u8; }
        if result == 0 { f |= Flag::Z as u8; }
        if (a as u32 & 0x0FFF) + (b as u32 & 0x0FFF) + c > 0x0FFF { f |= Flag::H as u8; }
        if ((a ^ result) & (b ^ result) & 0x8000) != 0 { f |= Flag::PV as u8; }
        if sum > 0xFFFF { f |= Flag::C as u8; }
        f |= (result >> 8) as u8 & XY;
        self.write_flags(f);
        result
    }

    /// SBC HL,ss: full 16-bit flags, N set, H = borrow from bit 12.
    pub fn sub16(&mut self, a: u16, b: u16, carry: bool) -> u16 {
        let c = carry as u32;
        let diff = (a as u32).wrapping_sub(b as u32).wrapping_sub(c);
        let result = diff as u16;

        let mut f = Flag::N as u8;
        if (result & 0x8000) != 0 { f |= Flag::S as u8; }
        if result == 0 { f |= Flag::Z as u8; }
        if (a as u32 & 0x0FFF) < (b as u32 & 0x0FFF) + c { f |= Flag::H as u8; }
        if ((a ^ b) & (a ^ result) & 0x8000) != 0 { f |= Flag::PV as u8; }
        if diff > 0xFFFF { f |= Flag::C as u8; }
        f |= (result >> 8) as u8 & XY;
        self.write_flags(f);
        result
    }

    /// ADD HL,rr: 11 T (ADD IX,rr 15 T with prefix).
    pub fn op_add16(&mut self, dst: Reg16, src: Reg16) -> u32 {
        let result = self.add16(self.get_reg16(dst), self.get_reg16(src));
        self.set_reg16(dst, result);
        11
    }

    /// ADC HL,ss: 15 T.
    pub fn op_adc16(&mut self, src: Reg16) -> u32 {
        let carry = self.flag(Flag::C);
        let result = self.adc16(self.get_hl(), self.get_reg16(src), carry);
        self.set_hl(result);
        15
    }

    /// SBC HL,ss: 15 T.
    pub fn op_sbc16(&mut self, src: Reg16) -> u32 {
        let carry = self.flag(Flag::C);
        let result = self.sub16(self.get_hl(), self.get_reg16(src), carry);
        self.set_hl(result);
        15
    }

    /// INC rr: 6 T. No flags affected.
    pub fn op_inc16(&mut self, rp: Reg16) -> u32 {
        self.set_reg16(rp, self.get_reg16(rp).wrapping_add(1));
        6
    }

    /// DEC rr: 6 T. No flags affected.
    pub fn op_dec16(&mut self, rp: Reg16) -> u32 {
        self.set_reg16(rp, self.get_reg16(rp).wrapping_sub(1));
        6
    }

    // --- Accumulator rotates ---

    /// Z80: S, Z, PV preserved, H = N = 0, X/Y from A. 8080: only C changes.
    fn rotate_a_flags(&mut self, carry: bool) {
        let c = if carry { Flag::C as u8 } else { 0 };
        let f = if self.is_z80() {
            (self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8)) | (self.a & XY) | c
        } else {
            (self.f & !(Flag::C as u8)) | c
        };
        self.write_flags(f);
    }

    /// RLCA: 4 T. Old bit 7 to carry and bit 0.
    pub fn op_rlca(&mut self) -> u32 {
        let carry = self.a & 0x80 != 0;
        self.a = self.a.rotate_left(1);
        self.rotate_a_flags(carry);
        4
    }

    /// RRCA: 4 T. Old bit 0 to carry and bit 7.
    pub fn op_rrca(&mut self) -> u32 {
        let carry = self.a & 0x01 != 0;
        self.a = self.a.rotate_right(1);
        self.rotate_a_flags(carry);
        4
    }

    /// RLA: 4 T. Old bit 7 to C, old C to bit 0.
    pub fn op_rla(&mut self) -> u32 {
        let carry = self.a & 0x80 != 0;
        self.a = (self.a << 1) | self.get_flag(Flag::C);
        self.rotate_a_flags(carry);
        4
    }

    /// RRA: 4 T. Old bit 0 to C, old C to bit 7.
    pub fn op_rra(&mut self) -> u32 {
        let carry = self.a & 0x01 != 0;
        self.a = (self.a >> 1) | (self.get_flag(Flag::C) << 7);
        self.rotate_a_flags(carry);
        4
    }

    // --- Misc accumulator ops ---

    /// DAA: 4 T. Decimal adjust accumulator after BCD add/sub.
    /// The 8080 only adjusts after addition.
    pub fn op_daa(&mut self) -> u32 {
        let a = self.a;
        let n = self.is_z80() && self.flag(Flag::N);
        let half = self.flag(Flag::H);
        let (addend, carry) = daa_correction(a, n, half, self.flag(Flag::C));
        let result = a.wrapping_add(addend);

        let low = a & 0x0F;
        let new_half = if n { half && low < 6 } else { low > 9 };

        let mut f = (self.f & Flag::N as u8) | sz(result);
        if parity(result) { f |= Flag::PV as u8; }
        if new_half { f |= Flag::H as u8; }
        if carry { f |= Flag::C as u8; }
        f |= result & XY;
        self.a = result;
        self.write_flags(f);
        4
    }

    /// CPL: 4 T. Sets H and N, X/Y from A. No flags on the 8080.
    pub fn op_cpl(&mut self) -> u32 {
        self.a = !self.a;
        if self.is_z80() {
            self.f = (self.f & !XY) | Flag::H as u8 | Flag::N as u8 | (self.a & XY);
        }
        4
    }

    /// SCF: 4 T. C = 1, H = 0, N = 0. X/Y from A.
    pub fn op_scf(&mut self) -> u32 {
        let f = if self.is_z80() {
            (self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8)) | (self.a & XY) | Flag::C as u8
        } else {
            self.f | Flag::C as u8
        };
        self.write_flags(f);
        4
    }

    /// CCF: 4 T. H = old C, C = ~C, N = 0. X/Y from A.
    pub fn op_ccf(&mut self) -> u32 {
        let old_c = self.f & Flag::C as u8;
        let f = if self.is_z80() {
            let mut f = (self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8)) | (self.a & XY);
            if old_c != 0 { f |= Flag::H as u8; } else { f |= Flag::C as u8; }
            f
        } else {
            self.f ^ Flag::C as u8
        };
        self.write_flags(f);
        4
    }

    /// NEG: 8 T. A = 0 - A through the subtractor.
    pub fn op_neg(&mut self) -> u32 {
        self.a = self.sub8(0, self.a, false);
        8
    }
}
