use z80emu_core::core::Machine;
use z80emu_core::cpu::z80::Z80;
mod common;
use common::{C, H, PV, S, TestBus, Z, run_instruction};

// ============================================================
// Flags
// ============================================================

#[test]
fn test_xra_a_psw() {
    let mut cpu = Z80::i8080();
    let mut bus = TestBus::new();
    cpu.a = 0x5A;
    bus.load(0, &[0xAF]); // XRA A

    assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.f, Z | PV | 0x02);
}

#[test]
fn test_ana_aux_carry_from_operands() {
    let mut cpu = Z80::i8080();
    let mut bus = TestBus::new();
    cpu.a = 0x08;
    cpu.b = 0x00;
    bus.load(0, &[0xA0, 0xA0]); // ANA B; ANA B

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0);
    assert_ne!(cpu.f & H, 0, "bit 3 of A|B was set");

    cpu.a = 0x01;
    cpu.b = 0x02;
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.f & H, 0, "bit 3 of A|B was clear");
}

#[test]
fn test_sub_aux_carry_is_no_borrow() {
    let mut cpu = Z80::i8080();
    let mut bus = TestBus::new();
    cpu.a = 0x05;
    bus.load(0, &[0xD6, 0x03, 0xD6, 0x01]); // SUI 3; SUI 1

    assert_eq!(run_instruction(&mut cpu, &mut bus), 7);
    assert_eq!(cpu.a, 0x02);
    assert_ne!(cpu.f & H, 0, "no borrow from bit 4");

    cpu.a = 0x10;
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0x0F);
    assert_eq!(cpu.f & H, 0, "borrow from bit 4");
}

#[test]
fn test_dcr_aux_carry() {
    let mut cpu = Z80::i8080();
    let mut bus = TestBus::new();
    cpu.b = 0x11;
    bus.load(0, &[0x05, 0x05]); // DCR B; DCR B

    assert_eq!(run_instruction(&mut cpu, &mut bus), 5);
    assert_eq!(cpu.b, 0x10);
    assert_ne!(cpu.f & H, 0);

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.b, 0x0F);
    assert_eq!(cpu.f & H, 0);
}

#[test]
fn test_dad_only_touches_carry() {
    let mut cpu = Z80::i8080();
    let mut bus = TestBus::new();
    cpu.f = 0xD6;
    cpu.set_hl(0xFFFF);
    cpu.set_bc(0x0001);
    bus.load(0, &[0x09]); // DAD B

    assert_eq!(run_instruction(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.get_hl(), 0);
    assert_eq!(cpu.f, 0xD7);
}

#[test]
fn test_rlc_only_touches_carry() {
    let mut cpu = Z80::i8080();
    let mut bus = TestBus::new();
    cpu.f = 0xC6;
    cpu.a = 0x80;
    bus.load(0, &[0x07]); // RLC

    assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.a, 0x01);
    assert_eq!(cpu.f, 0xC7);
}

#[test]
fn test_cma_leaves_flags() {
    let mut cpu = Z80::i8080();
    let mut bus = TestBus::new();
    cpu.f = 0x02;
    cpu.a = 0x55;
    bus.load(0, &[0x2F]); // CMA

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0xAA);
    assert_eq!(cpu.f, 0x02);
}

#[test]
fn test_daa_after_adi() {
    let mut cpu = Z80::i8080();
    let mut bus = TestBus::new();
    cpu.a = 0x15;
    bus.load(0, &[0xC6, 0x27, 0x27]); // ADI 27h; DAA

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0x3C);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0x42);
    assert_eq!(cpu.f & C, 0);
}

#[test]
fn test_add_sign_and_parity() {
    let mut cpu = Z80::i8080();
    let mut bus = TestBus::new();
    cpu.a = 0x7F;
    bus.load(0, &[0xC6, 0x01]); // ADI 1

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0x80);
    assert_ne!(cpu.f & S, 0);
    assert_eq!(cpu.f & PV, 0, "0x80 has odd parity");
    assert_ne!(cpu.f & H, 0);
}

// ============================================================
// State counts
// ============================================================

#[test]
fn test_data_sheet_timings() {
    // (program, setup flags, expected states)
    let cases: &[(&[u8], u8, u32)] = &[
        (&[0x41], 0x02, 5),              // MOV B,C
        (&[0x77], 0x02, 7),              // MOV M,A
        (&[0x36, 0x00], 0x02, 10),       // MVI M
        (&[0x01, 0x00, 0x00], 0x02, 10), // LXI B
        (&[0x03], 0x02, 5),              // INX B
        (&[0xE3], 0x02, 18),             // XTHL
        (&[0xF9], 0x02, 5),              // SPHL
        (&[0xC4, 0x00, 0x10], 0x02, 17), // CNZ taken
        (&[0xC4, 0x00, 0x10], 0x42, 11), // CNZ not taken
        (&[0xC0], 0x02, 11),             // RNZ taken
        (&[0xC0], 0x42, 5),              // RNZ not taken
        (&[0x76], 0x02, 7),              // HLT
    ];
    for &(program, f, states) in cases {
        let mut cpu = Z80::i8080();
        let mut bus = TestBus::new();
        cpu.sp = 0x2000;
        cpu.f = f;
        bus.load(0, program);
        assert_eq!(
            run_instruction(&mut cpu, &mut bus),
            states,
            "opcode {:#04X}",
            program[0]
        );
    }
}

#[test]
fn test_pchl() {
    let mut cpu = Z80::i8080();
    let mut bus = TestBus::new();
    cpu.set_hl(0x1234);
    bus.load(0, &[0xE9]); // PCHL

    assert_eq!(run_instruction(&mut cpu, &mut bus), 5);
    assert_eq!(cpu.pc, 0x1234);
}

#[test]
fn test_counting_loop_program() {
    let mut m = Machine::i8080();
    // MVI B,5; MVI A,0; loop: ADD B; DCR B; JNZ loop; HLT
    m.load_program(0, &[0x06, 0x05, 0x3E, 0x00, 0x80, 0x05, 0xC2, 0x04, 0x00, 0x76]);
    let summary = m.run().unwrap();

    assert_eq!(m.cpu.a, 15);
    assert_eq!(summary.instructions, 2 + 5 * 3 + 1);
    assert_eq!(summary.states, 7 + 7 + 5 * (4 + 5 + 10) + 7);
    assert_eq!(m.clock(), summary.states);
}

#[test]
fn test_z80_prefixes_rejected() {
    for op in [0x08u8, 0x18, 0x38, 0xCB, 0xD9, 0xDD, 0xED, 0xFD] {
        let mut m = Machine::i8080();
        m.load_program(0x0100, &[op, 0x00, 0x00]);
        let err = m.step().unwrap_err();
        assert_eq!(err.pc(), 0x0100, "opcode {op:#04X}");
    }
}
