use z80emu_core::cpu::z80::Z80;
mod common;
use common::{C, H, N, PV, S, TestBus, Z, run_instruction};

// ====================================================================
// 8-bit loads
// ====================================================================

#[test]
fn test_ld_r_r() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.e = 0x5A;
    bus.load(0, &[0x53]); // LD D,E

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 4);
    assert_eq!(cpu.d, 0x5A);
    assert_eq!(cpu.pc, 1);
}

#[test]
fn test_ld_r_n() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x2E, 0x99]); // LD L,99h

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 7);
    assert_eq!(cpu.l, 0x99);
    assert_eq!(cpu.pc, 2);
}

#[test]
fn test_ld_r_hl_and_hl_r() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x4000);
    bus.memory[0x4000] = 0x11;
    cpu.b = 0x22;
    bus.load(0, &[0x7E, 0x70]); // LD A,(HL); LD (HL),B

    assert_eq!(run_instruction(&mut cpu, &mut bus), 7);
    assert_eq!(cpu.a, 0x11);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 7);
    assert_eq!(bus.memory[0x4000], 0x22);
}

#[test]
fn test_ld_hl_n() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x3000);
    bus.load(0, &[0x36, 0xAB]); // LD (HL),ABh

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 10);
    assert_eq!(bus.memory[0x3000], 0xAB);
}

#[test]
fn test_ld_a_bc_de() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_bc(0x1000);
    cpu.set_de(0x2000);
    bus.memory[0x1000] = 0x01;
    cpu.a = 0x77;
    bus.load(0, &[0x12, 0x0A]); // LD (DE),A; LD A,(BC)

    assert_eq!(run_instruction(&mut cpu, &mut bus), 7);
    assert_eq!(bus.memory[0x2000], 0x77);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 7);
    assert_eq!(cpu.a, 0x01);
}

#[test]
fn test_ld_abs_a() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.a = 0x3C;
    bus.load(0, &[0x32, 0x00, 0x50, 0x3E, 0x00, 0x3A, 0x00, 0x50]); // LD (5000h),A; LD A,0; LD A,(5000h)

    assert_eq!(run_instruction(&mut cpu, &mut bus), 13);
    assert_eq!(bus.memory[0x5000], 0x3C);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 13);
    assert_eq!(cpu.a, 0x3C);
}

// ====================================================================
// 16-bit loads
// ====================================================================

#[test]
fn test_ld_rr_nn_little_endian() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x31, 0x34, 0x12]); // LD SP,1234h

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 10);
    assert_eq!(cpu.sp, 0x1234);
}

#[test]
fn test_ld_nn_hl_and_back() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0xBEEF);
    // LD (6000h),HL; LD HL,0; LD HL,(6000h)
    bus.load(0, &[0x22, 0x00, 0x60, 0x21, 0x00, 0x00, 0x2A, 0x00, 0x60]);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 16);
    assert_eq!(bus.memory[0x6000], 0xEF, "low byte first");
    assert_eq!(bus.memory[0x6001], 0xBE);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 16);
    assert_eq!(cpu.get_hl(), 0xBEEF);
}

#[test]
fn test_ld_nn_dd_extended() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_de(0x1234);
    bus.memory[0x7002] = 0x78;
    bus.memory[0x7003] = 0x56;
    // LD (7000h),DE; LD SP,(7002h)
    bus.load(0, &[0xED, 0x53, 0x00, 0x70, 0xED, 0x7B, 0x02, 0x70]);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 20);
    assert_eq!(bus.memory[0x7000], 0x34);
    assert_eq!(bus.memory[0x7001], 0x12);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 20);
    assert_eq!(cpu.sp, 0x5678);
}

#[test]
fn test_ld_sp_hl() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0xC000);
    bus.load(0, &[0xF9]);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 6);
    assert_eq!(cpu.sp, 0xC000);
}

// ====================================================================
// Exchanges
// ====================================================================

#[test]
fn test_ex_de_hl() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x1111);
    cpu.set_de(0x2222);
    bus.load(0, &[0xEB]);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.get_hl(), 0x2222);
    assert_eq!(cpu.get_de(), 0x1111);
}

#[test]
fn test_ex_af() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.a = 0x12;
    cpu.f = 0x34;
    cpu.a_prime = 0x56;
    cpu.f_prime = 0x78;
    bus.load(0, &[0x08]);

    run_instruction(&mut cpu, &mut bus);
    assert_eq!((cpu.a, cpu.f), (0x56, 0x78));
    assert_eq!((cpu.a_prime, cpu.f_prime), (0x12, 0x34));
}

#[test]
fn test_exx_leaves_af() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_bc(0x0102);
    cpu.set_de(0x0304);
    cpu.set_hl(0x0506);
    cpu.a = 0x99;
    cpu.b_prime = 0xAA;
    bus.load(0, &[0xD9]);

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.b, 0xAA);
    assert_eq!(cpu.b_prime, 0x01);
    assert_eq!(cpu.e_prime, 0x04);
    assert_eq!(cpu.l_prime, 0x06);
    assert_eq!(cpu.a, 0x99, "A not swapped by EXX");
}

#[test]
fn test_ex_sp_hl() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x8000;
    cpu.set_hl(0x1234);
    bus.memory[0x8000] = 0x78;
    bus.memory[0x8001] = 0x56;
    bus.load(0, &[0xE3]);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 19);
    assert_eq!(cpu.get_hl(), 0x5678);
    assert_eq!(bus.memory[0x8000], 0x34);
    assert_eq!(bus.memory[0x8001], 0x12);
    assert_eq!(cpu.sp, 0x8000);
}

// ====================================================================
// LD with I and R
// ====================================================================

#[test]
fn test_ld_i_a_and_back() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.a = 0x80;
    cpu.iff2 = true;
    cpu.f = C | H | N;
    // LD I,A; LD A,0 ; LD A,I
    bus.load(0, &[0xED, 0x47, 0x3E, 0x00, 0xED, 0x57]);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 9);
    assert_eq!(cpu.i, 0x80);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 9);
    assert_eq!(cpu.a, 0x80);
    assert_ne!(cpu.f & S, 0);
    assert_eq!(cpu.f & Z, 0);
    assert_ne!(cpu.f & PV, 0, "PV mirrors IFF2");
    assert_eq!(cpu.f & (H | N), 0);
    assert_ne!(cpu.f & C, 0, "C preserved");
}

#[test]
fn test_ld_a_r_zero_flag() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.r = 0x7E; // two M1 fetches wrap the low 7 bits to 0
    cpu.iff2 = false;
    bus.load(0, &[0xED, 0x5F]);

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0x00);
    assert_ne!(cpu.f & Z, 0);
    assert_eq!(cpu.f & PV, 0);
}
