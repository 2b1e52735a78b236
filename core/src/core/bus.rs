/// Generic bus interface between the CPU and everything it can address.
///
/// Memory and I/O port spaces are separate on the 8080/Z80. Port accesses
/// default to an unconnected bus: reads float high (0xFF) and writes are
/// dropped. Implementors override `io_read`/`io_write` to attach devices.
pub trait Bus {
    type Address: Copy + Into<u64>; // u16 for the 8080/Z80
    type Data; // u8

    fn read(&mut self, addr: Self::Address) -> Self::Data;
    fn write(&mut self, addr: Self::Address, data: Self::Data);

    /// Read from I/O port address space.
    fn io_read(&mut self, port: Self::Address) -> u8 {
        let _ = port;
        0xFF
    }

    /// Write to I/O port address space.
    fn io_write(&mut self, port: Self::Address, data: u8) {
        let _ = (port, data);
    }
}
