use crate::core::Bus;
use crate::cpu::z80::{Flag, Loc8, Reg16, Z80};

impl Z80 {
    /// LD r,r' 4 T, LD r,(HL) / LD (HL),r 7 T, LD r,(IX+d) / LD (IX+d),r 15 T
    /// (19 T with the prefix).
    /// Opcode mask: 01 dst src
    pub fn op_ld<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        dst: Loc8,
        src: Loc8,
    ) -> u32 {
        let val = self.read_loc(bus, src);
        self.write_loc(bus, dst, val);
        match (dst, src) {
            (Loc8::Indexed(..), _) | (_, Loc8::Indexed(..)) => 15,
            (Loc8::HlInd, _) | (_, Loc8::HlInd) => 7,
            _ => 4,
        }
    }

    /// LD r,n 7 T, LD (HL),n 10 T, LD (IX+d),n 15 T.
    /// Opcode mask: 00 rrr 110
    pub fn op_ld_imm<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        dst: Loc8,
        value: u8,
    ) -> u32 {
        self.write_loc(bus, dst, value);
        Self::loc_states(dst, 7, 10, 15)
    }

    /// LD A,(BC) / LD A,(DE): 7 T
    pub fn op_ld_a_from_pair<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        rp: Reg16,
    ) -> u32 {
        self.a = bus.read(self.get_reg16(rp));
        7
    }

    /// LD (BC),A / LD (DE),A: 7 T
    pub fn op_ld_pair_from_a<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        rp: Reg16,
    ) -> u32 {
        bus.write(self.get_reg16(rp), self.a);
        7
    }

    /// LD A,(nn): 13 T
    pub fn op_ld_a_from_abs<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        addr: u16,
    ) -> u32 {
        self.a = bus.read(addr);
        13
    }

    /// LD (nn),A: 13 T
    pub fn op_ld_abs_from_a<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        addr: u16,
    ) -> u32 {
        bus.write(addr, self.a);
        13
    }

    /// LD rr,nn: 10 T
    /// Opcode mask: 00 rr0 001 (rr: 0=BC, 1=DE, 2=HL/IX/IY, 3=SP)
    pub fn op_ld16_imm(&mut self, dst: Reg16, value: u16) -> u32 {
        self.set_reg16(dst, value);
        10
    }

    /// LD HL,(nn) 16 T. The ED form LD rr,(nn) is 20 T.
    /// Low byte at nn, high byte at nn+1.
    pub fn op_ld16_from_abs<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        dst: Reg16,
        addr: u16,
        extended: bool,
    ) -> u32 {
        let val = self.read_word(bus, addr);
        self.set_reg16(dst, val);
        if extended { 20 } else { 16 }
    }

    /// LD (nn),HL 16 T. The ED form LD (nn),rr is 20 T.
    pub fn op_ld16_to_abs<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        src: Reg16,
        addr: u16,
        extended: bool,
    ) -> u32 {
        self.write_word(bus, addr, self.get_reg16(src));
        if extended { 20 } else { 16 }
    }

    /// LD SP,HL: 6 T
    pub fn op_ld_sp(&mut self, src: Reg16) -> u32 {
        self.sp = self.get_reg16(src);
        6
    }

    /// EX AF,AF': 4 T
    pub fn op_ex_af(&mut self) -> u32 {
        self.ex_af();
        4
    }

    /// EXX: 4 T
    pub fn op_exx(&mut self) -> u32 {
        self.exx();
        4
    }

    /// EX DE,HL: 4 T (not affected by DD/FD prefix)
    pub fn op_ex_de_hl(&mut self) -> u32 {
        std::mem::swap(&mut self.d, &mut self.h);
        std::mem::swap(&mut self.e, &mut self.l);
        4
    }

    /// EX (SP),HL: 19 T
    pub fn op_ex_sp<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        rp: Reg16,
    ) -> u32 {
        let from_stack = self.read_word(bus, self.sp);
        self.write_word(bus, self.sp, self.get_reg16(rp));
        self.set_reg16(rp, from_stack);
        19
    }

    /// LD I,A: 9 T
    pub fn op_ld_i_a(&mut self) -> u32 {
        self.i = self.a;
        9
    }

    /// LD R,A: 9 T. Writes all 8 bits, including bit 7.
    pub fn op_ld_r_a(&mut self) -> u32 {
        self.r = self.a;
        9
    }

    /// S, Z from the loaded value, H = N = 0, PV = IFF2, C preserved.
    fn ld_a_special_flags(&mut self) {
        let mut f = (self.f & Flag::C as u8) | (self.a & 0x80);
        if self.a == 0 { f |= Flag::Z as u8; }
        if self.iff2 { f |= Flag::PV as u8; }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.write_flags(f);
    }

    /// LD A,I: 9 T
    pub fn op_ld_a_i(&mut self) -> u32 {
        self.a = self.i;
        self.ld_a_special_flags();
        9
    }

    /// LD A,R: 9 T
    pub fn op_ld_a_r(&mut self) -> u32 {
        self.a = self.r;
        self.ld_a_special_flags();
        9
    }
}
