use crate::core::Bus;
use crate::cpu::z80::{BlockOp, Flag, Z80};

impl Z80 {
    /// ED block instructions. 16 T for a single pass; the repeating forms
    /// rewind PC by 2 and take 21 T while another pass is pending, so the
    /// fetch loop re-executes them.
    pub fn op_block<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B, op: BlockOp) -> u32 {
        let delta: u16 = if op.decrements() { 0xFFFF } else { 1 };
        let again = match op {
            BlockOp::Ldi | BlockOp::Ldd | BlockOp::Ldir | BlockOp::Lddr => self.block_transfer(bus, delta),
            BlockOp::Cpi | BlockOp::Cpd | BlockOp::Cpir | BlockOp::Cpdr => self.block_compare(bus, delta),
            BlockOp::Ini | BlockOp::Ind | BlockOp::Inir | BlockOp::Indr => self.block_in(bus, delta),
            BlockOp::Outi | BlockOp::Outd | BlockOp::Otir | BlockOp::Otdr => self.block_out(bus, delta),
        };

        if op.repeats() && again {
            self.pc = self.pc.wrapping_sub(2);
            21
        } else {
            16
        }
    }

    // --- Block Transfer ---

    /// (DE) <- (HL), HL and DE step, BC--. Returns true while BC != 0.
    /// Flags: PV = (BC != 0), H = N = 0, S/Z/C preserved.
    fn block_transfer<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B, delta: u16) -> bool {
        let val = bus.read(self.get_hl());
        bus.write(self.get_de(), val);
        self.set_hl(self.get_hl().wrapping_add(delta));
        self.set_de(self.get_de().wrapping_add(delta));
        self.set_bc(self.get_bc().wrapping_sub(1));

        let more = self.get_bc() != 0;
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::C as u8);
        if more { f |= Flag::PV as u8; }
        // Undocumented: X = bit 3 of (val+A), Y = bit 1 of (val+A)
        let n = val.wrapping_add(self.a);
        if (n & 0x08) != 0 { f |= Flag::X as u8; }
        if (n & 0x02) != 0 { f |= Flag::Y as u8; }
        self.write_flags(f);
        more
    }

    // --- Block Compare ---

    /// Compare A-(HL), HL steps, BC--. Returns true while BC != 0 and no match.
    fn block_compare<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B, delta: u16) -> bool {
        let val = bus.read(self.get_hl());
        let result = self.a.wrapping_sub(val);
        let h = (self.a & 0x0F) < (val & 0x0F);
        self.set_hl(self.get_hl().wrapping_add(delta));
        self.set_bc(self.get_bc().wrapping_sub(1));

        let bc_nonzero = self.get_bc() != 0;
        let mut f = (self.f & Flag::C as u8) | Flag::N as u8 | (result & 0x80);
        if result == 0 { f |= Flag::Z as u8; }
        if h { f |= Flag::H as u8; }
        if bc_nonzero { f |= Flag::PV as u8; }
        // Undocumented X/Y: n = result - H
        let n = result.wrapping_sub(h as u8);
        if (n & 0x08) != 0 { f |= Flag::X as u8; }
        if (n & 0x02) != 0 { f |= Flag::Y as u8; }
        self.write_flags(f);
        bc_nonzero && result != 0
    }

    // --- Block I/O ---

    /// Z from the decremented B, S/X/Y from B, N set, C preserved.
    fn block_io_flags(&mut self) {
        let mut f = (self.f & Flag::C as u8) | Flag::N as u8 | (self.b & 0x80);
        if self.b == 0 { f |= Flag::Z as u8; }
        f |= self.b & (Flag::X as u8 | Flag::Y as u8);
        self.write_flags(f);
    }

    /// IN port BC -> (HL), B--, HL steps. Returns true while B != 0.
    fn block_in<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B, delta: u16) -> bool {
        let val = bus.io_read(self.get_bc());
        bus.write(self.get_hl(), val);
        self.b = self.b.wrapping_sub(1);
        self.set_hl(self.get_hl().wrapping_add(delta));
        self.block_io_flags();
        self.b != 0
    }

    /// B--, (HL) -> OUT port BC, HL steps. Returns true while B != 0.
    fn block_out<B: Bus<Address = u16, Data = u8> + ?Sized>(&mut self, bus: &mut B, delta: u16) -> bool {
        self.b = self.b.wrapping_sub(1);
        let val = bus.read(self.get_hl());
        bus.io_write(self.get_bc(), val);
        self.set_hl(self.get_hl().wrapping_add(delta));
        self.block_io_flags();
        self.b != 0
    }
}
