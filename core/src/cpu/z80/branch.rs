use crate::core::Bus;
use crate::cpu::z80::{Condition, Flag, Reg16, Z80};

impl Z80 {
    /// NZ/Z test Zero, NC/C Carry, PO/PE Parity/Overflow, P/M Sign.
    pub fn eval_condition(&self, cond: Condition) -> bool {
        match cond {
            Condition::NZ => !self.flag(Flag::Z),
            Condition::Z => self.flag(Flag::Z),
            Condition::NC => !self.flag(Flag::C),
            Condition::C => self.flag(Flag::C),
            Condition::PO => !self.flag(Flag::PV), // parity odd
            Condition::PE => self.flag(Flag::PV),  // parity even
            Condition::P => !self.flag(Flag::S),   // positive
            Condition::M => self.flag(Flag::S),    // minus
        }
    }

    fn taken(&self, cond: Option<Condition>) -> bool {
        cond.is_none_or(|cc| self.eval_condition(cc))
    }

    /// JP nn / JP cc,nn: 10 T whether taken or not.
    pub fn op_jp(&mut self, cond: Option<Condition>, addr: u16) -> u32 {
        if self.taken(cond) {
            self.pc = addr;
        }
        10
    }

    /// JP (HL): 4 T. Really "JP HL" (load PC from HL/IX/IY).
    pub fn op_jp_ind(&mut self, rp: Reg16) -> u32 {
        self.pc = self.get_reg16(rp);
        4
    }

    /// JR e 12 T, JR cc,e 12 T taken / 7 T not taken.
    /// PC already points past the displacement byte.
    pub fn op_jr(&mut self, cond: Option<Condition>, disp: i8) -> u32 {
        if self.taken(cond) {
            self.pc = self.pc.wrapping_add(disp as i16 as u16);
            12
        } else {
            7
        }
    }

    /// DJNZ e: 13 T taken / 8 T not taken.
    pub fn op_djnz(&mut self, disp: i8) -> u32 {
        self.b = self.b.wrapping_sub(1);
        if self.b != 0 {
            self.pc = self.pc.wrapping_add(disp as i16 as u16);
            13
        } else {
            8
        }
    }

    /// CALL nn 17 T, CALL cc,nn 17 T taken / 10 T not taken.
    pub fn op_call<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        cond: Option<Condition>,
        addr: u16,
    ) -> u32 {
        if self.taken(cond) {
            self.push16(bus, self.pc);
            self.pc = addr;
            17
        } else {
            10
        }
    }

    /// RET 10 T, RET cc 11 T taken / 5 T not taken.
    pub fn op_ret<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        cond: Option<Condition>,
    ) -> u32 {
        match cond {
            None => {
                self.pc = self.pop16(bus);
                10
            }
            Some(cc) if self.eval_condition(cc) => {
                self.pc = self.pop16(bus);
                11
            }
            Some(_) => 5,
        }
    }

    /// RST p: 11 T. Target is one of 0x00, 0x08, ..., 0x38.
    pub fn op_rst<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B, target: u8) -> u32 {
        self.push16(bus, self.pc);
        self.pc = target as u16;
        11
    }

    /// DI: 4 T
    pub fn op_di(&mut self) -> u32 {
        self.iff1 = false;
        self.iff2 = false;
        4
    }

    /// EI: 4 T
    pub fn op_ei(&mut self) -> u32 {
        self.iff1 = true;
        self.iff2 = true;
        4
    }

    // --- ED Control Flow ---

    /// RETN: 14 T. Pop PC, copy IFF2 to IFF1.
    pub fn op_retn<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.iff1 = self.iff2;
        self.pc = self.pop16(bus);
        14
    }

    /// RETI: 14 T. Same register effect as RETN.
    pub fn op_reti<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.op_retn(bus)
    }

    /// IM 0/1/2: 8 T
    pub fn op_im(&mut self, mode: u8) -> u32 {
        self.im = mode;
        8
    }
}
