use crate::core::Bus;
use crate::cpu::z80::{Reg16, Z80};

impl Z80 {
    /// Push a word: high byte at SP-1, low byte at SP-2.
    pub(crate) fn push16<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B, val: u16) {
        self.sp = self.sp.wrapping_sub(1);
        bus.write(self.sp, (val >> 8) as u8);
        self.sp = self.sp.wrapping_sub(1);
        bus.write(self.sp, val as u8);
    }

    /// Pop a word: low byte first, then high.
    pub(crate) fn pop16<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let lo = bus.read(self.sp) as u16;
        self.sp = self.sp.wrapping_add(1);
        let hi = bus.read(self.sp) as u16;
        self.sp = self.sp.wrapping_add(1);
        (hi << 8) | lo
    }

    /// PUSH rr: 11 T
    /// Opcode mask: 11 rr0 101 (rr: 0=BC, 1=DE, 2=HL/IX/IY, 3=AF)
    pub fn op_push<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B, rp: Reg16) -> u32 {
        let val = self.get_reg16(rp);
        self.push16(bus, val);
        11
    }

    /// POP rr: 10 T
    /// Opcode mask: 11 rr0 001 (rr: 0=BC, 1=DE, 2=HL/IX/IY, 3=AF)
    pub fn op_pop<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B, rp: Reg16) -> u32 {
        let val = self.pop16(bus);
        self.set_reg16(rp, val);
        10
    }
}
