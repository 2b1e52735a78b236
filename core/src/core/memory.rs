use crate::core::Bus;

/// Size of the 16-bit address space.
pub const MEMORY_SIZE: usize = 0x10000;

/// Flat 64 KiB RAM, zero-initialized.
///
/// Addresses wrap at 0xFFFF for word accesses. Two word orders are offered:
/// `read16`/`write16` store the high byte first, `read16_le`/`write16_le`
/// store the low byte first. The CPU itself always uses the latter.
pub struct Memory {
    bytes: Box<[u8]>,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            bytes: vec![0u8; MEMORY_SIZE].into_boxed_slice(),
        }
    }

    /// Copy `data` into memory starting at `address`.
    ///
    /// Panics if the image runs past the top of the address space.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        let start = address as usize;
        let end = start + data.len();
        assert!(
            end <= MEMORY_SIZE,
            "image of {} bytes at {:#06X} overruns 64K address space",
            data.len(),
            address
        );
        self.bytes[start..end].copy_from_slice(data);
    }

    pub fn read(&self, address: u16) -> u8 {
        self.bytes[address as usize]
    }

    pub fn write(&mut self, address: u16, value: u8) {
        self.bytes[address as usize] = value;
    }

    /// High byte at `address`, low byte at `address + 1`.
    pub fn read16(&self, address: u16) -> u16 {
        let hi = self.read(address) as u16;
        let lo = self.read(address.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    pub fn write16(&mut self, address: u16, value: u16) {
        self.write(address, (value >> 8) as u8);
        self.write(address.wrapping_add(1), value as u8);
    }

    /// Low byte at `address`, high byte at `address + 1` (CPU order).
    pub fn read16_le(&self, address: u16) -> u16 {
        let lo = self.read(address) as u16;
        let hi = self.read(address.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    pub fn write16_le(&mut self, address: u16, value: u16) {
        self.write(address, value as u8);
        self.write(address.wrapping_add(1), (value >> 8) as u8);
    }

    /// Borrow the whole address space.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex/ASCII listing of `length` bytes starting at `address`, 16 per line.
    pub fn dump(&self, address: u16, length: usize) -> String {
        let mut out = String::new();
        let mut offset = 0usize;
        while offset < length {
            let row = (length - offset).min(16);
            let base = address.wrapping_add(offset as u16);
            let bytes: Vec<u8> = (0..row)
                .map(|i| self.read(base.wrapping_add(i as u16)))
                .collect();
            let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02X}")).collect();
            let ascii: String = bytes
                .iter()
                .map(|&b| {
                    if b.is_ascii_graphic() || b == b' ' {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            out.push_str(&format!("{base:04X}: {:<47}  {ascii}\n", hex.join(" ")));
            offset += row;
        }
        out
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for Memory {
    type Address = u16;
    type Data = u8;

    fn read(&mut self, addr: u16) -> u8 {
        self.bytes[addr as usize]
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.bytes[addr as usize] = data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_orders() {
        let mut mem = Memory::new();
        mem.write16(0x1000, 0x1234);
        assert_eq!(mem.read(0x1000), 0x12);
        assert_eq!(mem.read(0x1001), 0x34);
        assert_eq!(mem.read16_le(0x1000), 0x3412);

        mem.write16_le(0x2000, 0xBEEF);
        assert_eq!(mem.read(0x2000), 0xEF);
        assert_eq!(mem.read16(0x2000), 0xEFBE);
    }

    #[test]
    fn word_access_wraps_at_top() {
        let mut mem = Memory::new();
        mem.write16_le(0xFFFF, 0xA55A);
        assert_eq!(mem.read(0xFFFF), 0x5A);
        assert_eq!(mem.read(0x0000), 0xA5);
    }

    #[test]
    fn dump_formats_rows() {
        let mut mem = Memory::new();
        mem.load(0x0100, b"HELLO\x00\x01");
        let text = mem.dump(0x0100, 20);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0100: 48 45 4C 4C 4F 00 01 00"));
        assert!(lines[0].ends_with(&format!("HELLO{}", ".".repeat(11))));
        assert!(lines[1].starts_with("0110: 00 00 00 00"));
    }

    #[test]
    #[should_panic(expected = "overruns")]
    fn load_past_end_panics() {
        let mut mem = Memory::new();
        mem.load(0xFFFF, &[1, 2]);
    }
}
