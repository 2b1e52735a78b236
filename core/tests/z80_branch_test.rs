use z80emu_core::cpu::z80::Z80;
mod common;
use common::{C, PV, S, TestBus, Z, run_instruction};

// --- JP ---

#[test]
fn test_jp_nn() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xC3, 0x00, 0x80]);

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 10);
    assert_eq!(cpu.pc, 0x8000);
}

#[test]
fn test_jp_cc_always_10() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.f = 0;
    bus.load(0, &[0xCA, 0x00, 0x80]); // JP Z,8000h

    assert_eq!(run_instruction(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.pc, 3, "not taken");

    cpu.pc = 0;
    cpu.f = Z;
    assert_eq!(run_instruction(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.pc, 0x8000, "taken");
}

#[test]
fn test_all_conditions() {
    // (opcode for JP cc, flags that make it true)
    let cases: &[(u8, u8, u8)] = &[
        (0xC2, 0, Z),   // NZ
        (0xCA, Z, 0),   // Z
        (0xD2, 0, C),   // NC
        (0xDA, C, 0),   // C
        (0xE2, 0, PV),  // PO
        (0xEA, PV, 0),  // PE
        (0xF2, 0, S),   // P
        (0xFA, S, 0),   // M
    ];
    for &(op, taken_f, not_taken_f) in cases {
        let mut cpu = Z80::new();
        let mut bus = TestBus::new();
        bus.load(0, &[op, 0x34, 0x12]);
        cpu.f = taken_f;
        run_instruction(&mut cpu, &mut bus);
        assert_eq!(cpu.pc, 0x1234, "opcode {op:#04X} should jump");

        cpu.pc = 0;
        cpu.f = not_taken_f;
        run_instruction(&mut cpu, &mut bus);
        assert_eq!(cpu.pc, 3, "opcode {op:#04X} should fall through");
    }
}

#[test]
fn test_jp_hl() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x4321);
    bus.load(0, &[0xE9]);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.pc, 0x4321);
}

// --- JR / DJNZ ---

#[test]
fn test_jr_backward_relative_to_next_instruction() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x100;
    bus.load(0x100, &[0x18, 0xFC]); // JR -4

    assert_eq!(run_instruction(&mut cpu, &mut bus), 12);
    assert_eq!(cpu.pc, 0x0FE, "0x102 - 4");
}

#[test]
fn test_jr_cc() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.f = C;
    bus.load(0, &[0x30, 0x10]); // JR NC,+16

    assert_eq!(run_instruction(&mut cpu, &mut bus), 7);
    assert_eq!(cpu.pc, 2);

    cpu.pc = 0;
    cpu.f = 0;
    assert_eq!(run_instruction(&mut cpu, &mut bus), 12);
    assert_eq!(cpu.pc, 0x12);
}

#[test]
fn test_djnz_loop() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.b = 3;
    cpu.a = 0;
    bus.load(0, &[0x3C, 0x10, 0xFD, 0x76]); // loop: INC A; DJNZ loop; HALT

    let mut states = 0;
    while !cpu.halted {
        states += run_instruction(&mut cpu, &mut bus);
    }
    assert_eq!(cpu.a, 3);
    assert_eq!(cpu.b, 0);
    assert_eq!(states, 3 * 4 + 13 + 13 + 8 + 4);
}

// --- CALL / RET / RST ---

#[test]
fn test_call_and_ret() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x2000;
    bus.load(0x0000, &[0xCD, 0x00, 0x10]); // CALL 1000h
    bus.load(0x1000, &[0xC9]); // RET

    assert_eq!(run_instruction(&mut cpu, &mut bus), 17);
    assert_eq!(cpu.pc, 0x1000);
    assert_eq!(cpu.sp, 0x1FFE);
    assert_eq!(bus.memory[0x1FFE], 0x03);
    assert_eq!(bus.memory[0x1FFF], 0x00);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.pc, 0x0003);
    assert_eq!(cpu.sp, 0x2000);
}

#[test]
fn test_call_cc_not_taken() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x2000;
    cpu.f = Z;
    bus.load(0, &[0xC4, 0x00, 0x10]); // CALL NZ,1000h

    assert_eq!(run_instruction(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.pc, 3);
    assert_eq!(cpu.sp, 0x2000, "nothing pushed");
}

#[test]
fn test_ret_cc() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x1FFE;
    bus.memory[0x1FFE] = 0x00;
    bus.memory[0x1FFF] = 0x40;
    bus.load(0, &[0xD8, 0xD8]); // RET C; RET C

    cpu.f = 0;
    assert_eq!(run_instruction(&mut cpu, &mut bus), 5);
    assert_eq!(cpu.pc, 1);

    cpu.f = C;
    assert_eq!(run_instruction(&mut cpu, &mut bus), 11);
    assert_eq!(cpu.pc, 0x4000);
}

#[test]
fn test_rst() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x2000;
    cpu.pc = 0x0500;
    bus.load(0x0500, &[0xEF]); // RST 28h

    assert_eq!(run_instruction(&mut cpu, &mut bus), 11);
    assert_eq!(cpu.pc, 0x0028);
    assert_eq!(bus.memory[0x1FFE], 0x01);
    assert_eq!(bus.memory[0x1FFF], 0x05);
}

// --- Interrupt control ---

#[test]
fn test_di_ei_im() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xFB, 0xED, 0x5E, 0xF3]); // EI; IM 2; DI

    run_instruction(&mut cpu, &mut bus);
    assert!(cpu.iff1 && cpu.iff2);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 8);
    assert_eq!(cpu.im, 2);
    run_instruction(&mut cpu, &mut bus);
    assert!(!cpu.iff1 && !cpu.iff2);
}

#[test]
fn test_retn_restores_iff1() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x1FFE;
    cpu.iff1 = false;
    cpu.iff2 = true;
    bus.memory[0x1FFE] = 0x34;
    bus.memory[0x1FFF] = 0x12;
    bus.load(0, &[0xED, 0x45]); // RETN

    assert_eq!(run_instruction(&mut cpu, &mut bus), 14);
    assert_eq!(cpu.pc, 0x1234);
    assert!(cpu.iff1);
}

#[test]
fn test_reti() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x1FFE;
    bus.memory[0x1FFE] = 0x00;
    bus.memory[0x1FFF] = 0x30;
    bus.load(0, &[0xED, 0x4D]); // RETI

    assert_eq!(run_instruction(&mut cpu, &mut bus), 14);
    assert_eq!(cpu.pc, 0x3000);
}
