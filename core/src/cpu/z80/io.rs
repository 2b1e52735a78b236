use crate::core::Bus;
use crate::cpu::z80::{Flag, Reg8, Z80};
use crate::cpu::z80::alu::parity;

impl Z80 {
    /// IN A,(n): 11 T. Port address is A in the high byte, n in the low byte.
    /// No flags affected.
    pub fn op_in_a_port<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B, port: u8) -> u32 {
        let addr = ((self.a as u16) << 8) | port as u16;
        self.a = bus.io_read(addr);
        11
    }

    /// OUT (n),A: 11 T. No flags affected.
    pub fn op_out_port_a<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B, port: u8) -> u32 {
        let addr = ((self.a as u16) << 8) | port as u16;
        bus.io_write(addr, self.a);
        11
    }

    /// IN r,(C): 12 T. Port address is BC.
    /// Flags: S, Z, PV(parity) from input, H=0, N=0, C preserved. X/Y from input.
    /// `None` (IN F,(C)) sets flags without storing the value.
    pub fn op_in_c<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B, reg: Option<Reg8>) -> u32 {
        let val = bus.io_read(self.get_bc());
        if let Some(reg) = reg {
            self.set_reg8(reg, val);
        }

        let mut f = (self.f & Flag::C as u8) | (val & 0x80);
        if val == 0 { f |= Flag::Z as u8; }
        if parity(val) { f |= Flag::PV as u8; }
        f |= val & (Flag::X as u8 | Flag::Y as u8);
        self.write_flags(f);
        12
    }

    /// OUT (C),r: 12 T. `None` outputs 0 (undocumented).
    pub fn op_out_c<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B, reg: Option<Reg8>) -> u32 {
        let val = reg.map_or(0, |r| self.get_reg8(r));
        bus.io_write(self.get_bc(), val);
        12
    }
}
