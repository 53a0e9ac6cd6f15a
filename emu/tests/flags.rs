//! Flag semantics checked against a reference model over random operands.

use proptest::prelude::*;

use arch::op::Opcode;
use arch::reg::Reg16;
use emu::decoder::{Inst, Operand};
use emu::Cpu;

fn binary(opcode: Opcode, a: u16, b: u16) -> Cpu {
    let mut cpu = Cpu::new();
    cpu.regs.ax = a;
    cpu.regs.bx = b;
    let inst = Inst {
        opcode,
        dest: Operand::Reg16(Reg16::AX),
        src: Operand::Reg16(Reg16::BX),
        size: 0,
        rep: false,
    };
    cpu.execute(&inst).unwrap();
    cpu
}

fn unary(opcode: Opcode, a: u16) -> Cpu {
    let mut cpu = Cpu::new();
    cpu.regs.ax = a;
    let inst = Inst {
        opcode,
        dest: Operand::Reg16(Reg16::AX),
        src: Operand::None,
        size: 0,
        rep: false,
    };
    cpu.execute(&inst).unwrap();
    cpu
}

fn shift(opcode: Opcode, a: u16, count: u8) -> Cpu {
    let mut cpu = Cpu::new();
    cpu.regs.ax = a;
    let inst = Inst {
        opcode,
        dest: Operand::Reg16(Reg16::AX),
        src: Operand::Imm8(count),
        size: 0,
        rep: false,
    };
    cpu.execute(&inst).unwrap();
    cpu
}

proptest! {
    #[test]
    fn add_matches_model(a: u16, b: u16) {
        let cpu = binary(Opcode::ADD, a, b);
        let result = a.wrapping_add(b);
        prop_assert_eq!(cpu.regs.ax, result);
        prop_assert_eq!(cpu.flags.cf, result < a);
        prop_assert_eq!(cpu.flags.of, (a ^ result) & (b ^ result) & 0x8000 != 0);
        prop_assert_eq!(cpu.flags.zf, result == 0);
        prop_assert_eq!(cpu.flags.sf, result & 0x8000 != 0);
    }

    #[test]
    fn sub_matches_model(a: u16, b: u16) {
        let cpu = binary(Opcode::SUB, a, b);
        let result = a.wrapping_sub(b);
        prop_assert_eq!(cpu.regs.ax, result);
        prop_assert_eq!(cpu.flags.cf, b > a);
        prop_assert_eq!(cpu.flags.of, (a ^ b) & (a ^ result) & 0x8000 != 0);
        prop_assert_eq!(cpu.flags.zf, result == 0);
        prop_assert_eq!(cpu.flags.sf, result & 0x8000 != 0);
    }

    #[test]
    fn cmp_sets_sub_flags_without_storing(a: u16, b: u16) {
        let cpu = binary(Opcode::CMP, a, b);
        let sub = binary(Opcode::SUB, a, b);
        prop_assert_eq!(cpu.regs.ax, a);
        prop_assert_eq!(cpu.flags, sub.flags);
    }

    #[test]
    fn logic_matches_model(a: u16, b: u16) {
        for (opcode, f) in [
            (Opcode::AND, (|x, y| x & y) as fn(u16, u16) -> u16),
            (Opcode::OR, |x, y| x | y),
            (Opcode::XOR, |x, y| x ^ y),
        ] {
            let cpu = binary(opcode, a, b);
            let result = f(a, b);
            prop_assert_eq!(cpu.regs.ax, result);
            prop_assert!(!cpu.flags.cf);
            prop_assert!(!cpu.flags.of);
            prop_assert_eq!(cpu.flags.zf, result == 0);
            prop_assert_eq!(cpu.flags.sf, result & 0x8000 != 0);
        }
    }

    #[test]
    fn inc_matches_model(a: u16) {
        let cpu = unary(Opcode::INC, a);
        let result = a.wrapping_add(1);
        prop_assert_eq!(cpu.regs.ax, result);
        prop_assert!(!cpu.flags.cf); // INC leaves CF alone (it starts clear)
        prop_assert_eq!(cpu.flags.of, a == 0x7FFF);
        prop_assert_eq!(cpu.flags.zf, result == 0);
        prop_assert_eq!(cpu.flags.sf, result & 0x8000 != 0);
    }

    #[test]
    fn dec_matches_model(a: u16) {
        let cpu = unary(Opcode::DEC, a);
        let result = a.wrapping_sub(1);
        prop_assert_eq!(cpu.regs.ax, result);
        prop_assert_eq!(cpu.flags.of, a == 0x8000);
        prop_assert_eq!(cpu.flags.zf, result == 0);
        prop_assert_eq!(cpu.flags.sf, result & 0x8000 != 0);
    }

    #[test]
    fn neg_matches_model(a: u16) {
        let cpu = unary(Opcode::NEG, a);
        let result = a.wrapping_neg();
        prop_assert_eq!(cpu.regs.ax, result);
        prop_assert_eq!(cpu.flags.cf, a != 0);
        prop_assert_eq!(cpu.flags.of, a == 0x8000);
        prop_assert_eq!(cpu.flags.zf, result == 0);
        prop_assert_eq!(cpu.flags.sf, result & 0x8000 != 0);
    }

    #[test]
    fn shl_matches_model(a: u16, count in 1u8..=20) {
        let cpu = shift(Opcode::SHL, a, count);
        let clamped = (count as u32).min(16);
        let result = ((a as u32) << clamped) as u16;
        prop_assert_eq!(cpu.regs.ax, result);
        prop_assert_eq!(cpu.flags.cf, (a >> (16 - clamped)) & 1 != 0);
        prop_assert_eq!(cpu.flags.zf, result == 0);
        prop_assert_eq!(cpu.flags.sf, result & 0x8000 != 0);
    }

    #[test]
    fn shr_matches_model(a: u16, count in 1u8..=20) {
        let cpu = shift(Opcode::SHR, a, count);
        let clamped = (count as u32).min(16);
        let result = ((a as u32) >> clamped) as u16;
        prop_assert_eq!(cpu.regs.ax, result);
        prop_assert_eq!(cpu.flags.cf, (a >> (clamped - 1)) & 1 != 0);
        prop_assert_eq!(cpu.flags.zf, result == 0);
        prop_assert_eq!(cpu.flags.sf, result & 0x8000 != 0);
    }

    #[test]
    fn sar_matches_model(a: u16, count in 1u8..=20) {
        let cpu = shift(Opcode::SAR, a, count);
        let clamped = (count as u32).min(16);
        let result = ((a as i16 as i32) >> clamped) as u16;
        prop_assert_eq!(cpu.regs.ax, result);
        prop_assert_eq!(cpu.flags.cf, (a >> (clamped - 1)) & 1 != 0);
        prop_assert_eq!(cpu.flags.zf, result == 0);
        prop_assert_eq!(cpu.flags.sf, result & 0x8000 != 0);
    }

    #[test]
    fn zero_shift_counts_leave_state_alone(a: u16) {
        for opcode in [Opcode::SHL, Opcode::SHR, Opcode::SAR] {
            let cpu = shift(opcode, a, 0);
            prop_assert_eq!(cpu.regs.ax, a);
            prop_assert_eq!(cpu.flags, emu::cpu::Flags::default());
        }
    }

    #[test]
    fn mul_matches_model(a: u16, b: u16) {
        let mut cpu = Cpu::new();
        cpu.regs.ax = a;
        cpu.regs.bx = b;
        let inst = Inst {
            opcode: Opcode::MUL,
            dest: Operand::Reg16(Reg16::BX),
            src: Operand::None,
            size: 0,
            rep: false,
        };
        cpu.execute(&inst).unwrap();
        let product = a as u32 * b as u32;
        prop_assert_eq!(cpu.regs.ax, product as u16);
        prop_assert_eq!(cpu.regs.dx, (product >> 16) as u16);
        prop_assert_eq!(cpu.flags.cf, product > 0xFFFF);
        prop_assert_eq!(cpu.flags.of, product > 0xFFFF);
    }

    #[test]
    fn div_matches_model(dividend: u32, divisor in 1u16..) {
        let mut cpu = Cpu::new();
        cpu.regs.dx = (dividend >> 16) as u16;
        cpu.regs.ax = dividend as u16;
        cpu.regs.bx = divisor;
        let inst = Inst {
            opcode: Opcode::DIV,
            dest: Operand::Reg16(Reg16::BX),
            src: Operand::None,
            size: 0,
            rep: false,
        };
        let quotient = dividend / divisor as u32;
        match cpu.execute(&inst) {
            Ok(()) => {
                prop_assert!(quotient <= 0xFFFF);
                prop_assert_eq!(cpu.regs.ax as u32, quotient);
                prop_assert_eq!(cpu.regs.dx as u32, dividend % divisor as u32);
            }
            Err(err) => {
                prop_assert!(quotient > 0xFFFF);
                prop_assert_eq!(err, emu::ExecError::DivisionOverflow);
            }
        }
    }
}
