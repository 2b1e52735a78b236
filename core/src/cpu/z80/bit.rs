use crate::core::Bus;
use crate::cpu::z80::alu::parity;
use crate::cpu::z80::{Flag, Loc8, Reg8, RotOp, Z80};

impl Z80 {
    /// Rotate/shift `val`. Returns (result, new_flags).
    /// Flags: S, Z, PV(parity), C from shifted bit. H=0, N=0. X/Y from result.
    fn do_cb_rotate_shift(&self, op: RotOp, val: u8) -> (u8, u8) {
        let old_c = self.get_flag(Flag::C);
        let (result, carry) = match op {
            RotOp::Rlc => (val.rotate_left(1), val >> 7),
            RotOp::Rrc => (val.rotate_right(1), val & 1),
            RotOp::Rl => ((val << 1) | old_c, val >> 7),
            RotOp::Rr => ((val >> 1) | (old_c << 7), val & 1),
            RotOp::Sla => (val << 1, val >> 7),
            // SRA keeps the sign bit
            RotOp::Sra => (((val as i8) >> 1) as u8, val & 1),
            // SLL (undocumented) shifts a 1 into bit 0
            RotOp::Sll => ((val << 1) | 1, val >> 7),
            RotOp::Srl => (val >> 1, val & 1),
        };

        let mut f = result & 0x80;
        if result == 0 { f |= Flag::Z as u8; }
        if parity(result) { f |= Flag::PV as u8; }
        if carry != 0 { f |= Flag::C as u8; }
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        (result, f)
    }

    /// Write a CB result back, plus the undocumented DD CB register copy.
    fn cb_writeback<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        loc: Loc8,
        copy: Option<Reg8>,
        result: u8,
    ) {
        self.write_loc(bus, loc, result);
        if let Some(reg) = copy {
            self.set_reg8(reg, result);
        }
    }

    /// RLC RRC RL RR SLA SRA SLL SRL: r 8 T, (HL) 15 T, (IX+d) 19 T
    /// (23 T with the DD prefix).
    pub fn op_rot<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        op: RotOp,
        loc: Loc8,
        copy: Option<Reg8>,
    ) -> u32 {
        let val = self.read_loc(bus, loc);
        let (result, f) = self.do_cb_rotate_shift(op, val);
        self.write_flags(f);
        self.cb_writeback(bus, loc, copy, result);
        Self::loc_states(loc, 8, 15, 19)
    }

    /// BIT b: r 8 T, (HL) 12 T, (IX+d) 16 T.
    /// Z = ~bit, S = bit 7 if tested, PV = Z, H=1, N=0, C preserved.
    /// X/Y from the operand, or from the address high byte for (IX+d).
    pub fn op_bit<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B, bit: u8, loc: Loc8) -> u32 {
        let val = self.read_loc(bus, loc);
        let tested = val & (1 << bit);

        let mut f = (self.f & Flag::C as u8) | Flag::H as u8;
        if tested == 0 {
            f |= Flag::Z as u8;
            f |= Flag::PV as u8; // PV = Z for BIT
        }
        if bit == 7 && tested != 0 { f |= Flag::S as u8; }
        let xy_source = match loc {
            Loc8::Indexed(..) => self.loc_address(loc).map_or(val, |addr| (addr >> 8) as u8),
            _ => val,
        };
        f |= xy_source & (Flag::X as u8 | Flag::Y as u8);
        self.write_flags(f);
        Self::loc_states(loc, 8, 12, 16)
    }

    /// RES b: r 8 T, (HL) 15 T, (IX+d) 19 T. No flag changes.
    pub fn op_res<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        bit: u8,
        loc: Loc8,
        copy: Option<Reg8>,
    ) -> u32 {
        let result = self.read_loc(bus, loc) & !(1 << bit);
        self.cb_writeback(bus, loc, copy, result);
        Self::loc_states(loc, 8, 15, 19)
    }

    /// SET b: r 8 T, (HL) 15 T, (IX+d) 19 T. No flag changes.
    pub fn op_set<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        bit: u8,
        loc: Loc8,
        copy: Option<Reg8>,
    ) -> u32 {
        let result = self.read_loc(bus, loc) | (1 << bit);
        self.cb_writeback(bus, loc, copy, result);
        Self::loc_states(loc, 8, 15, 19)
    }

    // --- Nibble rotates ---

    /// S, Z, PV(parity) from A, H=0, N=0, C preserved.
    fn nibble_rotate_flags(&mut self) {
        let mut f = (self.f & Flag::C as u8) | (self.a & 0x80);
        if self.a == 0 { f |= Flag::Z as u8; }
        if parity(self.a) { f |= Flag::PV as u8; }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.write_flags(f);
    }

    /// RRD: 18 T. (HL) low nibble -> A low, A low -> (HL) high, (HL) high -> (HL) low.
    pub fn op_rrd<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.get_hl();
        let mem = bus.read(addr);
        bus.write(addr, (self.a << 4) | (mem >> 4));
        self.a = (self.a & 0xF0) | (mem & 0x0F);
        self.nibble_rotate_flags();
        18
    }

    /// RLD: 18 T. (HL) high nibble -> A low, A low -> (HL) low, (HL) low -> (HL) high.
    pub fn op_rld<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.get_hl();
        let mem = bus.read(addr);
        bus.write(addr, (mem << 4) | (self.a & 0x0F));
        self.a = (self.a & 0xF0) | (mem >> 4);
        self.nibble_rotate_flags();
        18
    }
}
