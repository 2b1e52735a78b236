//! Intel 8080 state counts.
//!
//! Handlers report Z80 T-states. When running as an 8080 the count is
//! replaced with the 8080 data-sheet figure for the same opcode. Conditional
//! CALL and RET are told apart by the Z80 count (17 and 11 mean taken).

pub(crate) fn i8080_states(opcode: u8, z80_states: u32) -> u32 {
    match opcode {
        0x76 => 7, // HLT
        // MOV r,M / MOV M,r 7, MOV r,r 5
        op if op & 0xC0 == 0x40 => {
            if op & 0x07 == 0x06 || op & 0x38 == 0x30 { 7 } else { 5 }
        }
        0x36 => 10,                       // MVI M
        op if op & 0xC7 == 0x06 => 7,     // MVI r
        0x34 | 0x35 => 10,                // INR M / DCR M
        op if op & 0xC6 == 0x04 => 5,     // INR r / DCR r
        op if op & 0xC7 == 0x03 => 5,     // INX / DCX
        op if op & 0xCF == 0x09 => 10,    // DAD
        op if op & 0xCF == 0x01 => 10,    // LXI
        0x02 | 0x12 | 0x0A | 0x1A => 7,   // STAX / LDAX
        0x22 | 0x2A => 16,                // SHLD / LHLD
        0x32 | 0x3A => 13,                // STA / LDA
        // ALU r 4, ALU M 7
        op if op & 0xC0 == 0x80 => {
            if op & 0x07 == 0x06 { 7 } else { 4 }
        }
        op if op & 0xC7 == 0xC6 => 7,     // ALU immediate
        0xC3 => 10,                       // JMP
        0xCD => 17,                       // CALL
        0xC9 => 10,                       // RET
        op if op & 0xC7 == 0xC2 => 10,    // Jcc
        op if op & 0xC7 == 0xC4 => {
            // Ccc
            if z80_states == 17 { 17 } else { 11 }
        }
        op if op & 0xC7 == 0xC0 => {
            // Rcc
            if z80_states == 11 { 11 } else { 5 }
        }
        op if op & 0xC7 == 0xC7 => 11,    // RST
        op if op & 0xCF == 0xC5 => 11,    // PUSH
        op if op & 0xCF == 0xC1 => 10,    // POP
        0xE3 => 18,                       // XTHL
        0xE9 | 0xF9 => 5,                 // PCHL / SPHL
        0xEB => 4,                        // XCHG
        0xD3 | 0xDB => 10,                // OUT / IN
        _ => 4,                           // NOP, rotates, DAA, CMA, STC, CMC, EI, DI
    }
}
