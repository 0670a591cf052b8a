// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use core::fmt;

use crate::traits::TickFn;

use super::operand::Operand;
use super::Mos6510;

/// A decoded opcode paired with its operand (addressing mode + fetched bytes). Decoding is
/// delegated here so the execution engine in [`Mos6510`] stays a flat dispatch over this enum;
/// cycle counts fall out of how many times `tick_fn` fires while decoding and executing rather
/// than a parallel lookup table.
pub enum Instruction {
    // Data movement
    LDA(Operand),
    LDX(Operand),
    LDY(Operand),
    PHA,
    PHP,
    PLA,
    PLP,
    STA(Operand),
    STX(Operand),
    STY(Operand),
    TAX,
    TAY,
    TSX,
    TXA,
    TXS,
    TYA,
    // Arithmetic
    ADC(Operand),
    SBC(Operand),
    CMP(Operand),
    CPX(Operand),
    CPY(Operand),
    DEC(Operand),
    DEX,
    DEY,
    INC(Operand),
    INX,
    INY,
    // Logical
    AND(Operand),
    EOR(Operand),
    ORA(Operand),
    // Shift and rotate
    ASL(Operand),
    LSR(Operand),
    ROL(Operand),
    ROR(Operand),
    // Control flow
    BCC(Operand),
    BCS(Operand),
    BEQ(Operand),
    BMI(Operand),
    BNE(Operand),
    BPL(Operand),
    BVC(Operand),
    BVS(Operand),
    JMP(Operand),
    JSR(Operand),
    RTS,
    // Misc
    BIT(Operand),
    BRK,
    CLC,
    CLD,
    CLI,
    CLV,
    NOP,
    SEC,
    SED,
    SEI,
    RTI,
    // Undocumented: read-modify-write composites
    SLO(Operand),
    RLA(Operand),
    SRE(Operand),
    RRA(Operand),
    DCP(Operand),
    ISC(Operand),
    // Undocumented: load/store composites
    SAX(Operand),
    LAX(Operand),
    SHX(Operand),
    SHY(Operand),
    // Undocumented: immediate-combination
    ALR(Operand),
    ANC(Operand),
    ARR(Operand),
    ANE(Operand),
    LXA(Operand),
    SBX(Operand),
    USBC(Operand),
    // Undocumented: extra-byte no-ops (cycle cost differs by addressing mode, value discarded)
    SKB(Operand),
    // Undocumented, deliberately unimplemented (unstable on real silicon): JAM halts the CPU;
    // SHA/TAS/LAS depend on internal bus behavior that varies by chip revision.
    JAM,
    SHA(Operand),
    TAS(Operand),
    LAS(Operand),
}

impl Instruction {
    pub fn decode(cpu: &mut Mos6510, opcode: u8, tick_fn: &TickFn) -> Instruction {
        use Instruction::*;
        use Operand::*;
        macro_rules! b {
            () => {
                cpu.fetch_byte(tick_fn)
            };
        }
        macro_rules! w {
            () => {
                cpu.fetch_word(tick_fn)
            };
        }
        match opcode {
            0x00 => BRK,
            0x01 => ORA(IndirectX(b!())),
            0x02 | 0x12 | 0x22 | 0x32 | 0x42 | 0x52 | 0x62 | 0x72 | 0x92 | 0xb2 | 0xd2 | 0xf2 => {
                JAM
            }
            0x03 => SLO(IndirectX(b!())),
            0x04 | 0x44 | 0x64 => SKB(ZeroPage(b!())),
            0x05 => ORA(ZeroPage(b!())),
            0x06 => ASL(ZeroPage(b!())),
            0x07 => SLO(ZeroPage(b!())),
            0x08 => PHP,
            0x09 => ORA(Immediate(b!())),
            0x0a => ASL(Accumulator),
            0x0b | 0x2b => ANC(Immediate(b!())),
            0x0c => SKB(Absolute(w!())),
            0x0d => ORA(Absolute(w!())),
            0x0e => ASL(Absolute(w!())),
            0x0f => SLO(Absolute(w!())),
            0x10 => BPL(Relative(b!() as i8)),
            0x11 => ORA(IndirectY(b!())),
            0x13 => SLO(IndirectY(b!())),
            0x14 | 0x34 | 0x54 | 0x74 | 0xd4 | 0xf4 => SKB(ZeroPageX(b!())),
            0x15 => ORA(ZeroPageX(b!())),
            0x16 => ASL(ZeroPageX(b!())),
            0x17 => SLO(ZeroPageX(b!())),
            0x18 => CLC,
            0x19 => ORA(AbsoluteY(w!())),
            0x1a | 0x3a | 0x5a | 0x7a | 0xda | 0xea | 0xfa => NOP,
            0x1b => SLO(AbsoluteY(w!())),
            0x1c | 0x3c | 0x5c | 0x7c | 0xdc | 0xfc => SKB(AbsoluteX(w!())),
            0x1d => ORA(AbsoluteX(w!())),
            0x1e => ASL(AbsoluteX(w!())),
            0x1f => SLO(AbsoluteX(w!())),
            0x20 => JSR(Absolute(w!())),
            0x21 => AND(IndirectX(b!())),
            0x23 => RLA(IndirectX(b!())),
            0x24 => BIT(ZeroPage(b!())),
            0x25 => AND(ZeroPage(b!())),
            0x26 => ROL(ZeroPage(b!())),
            0x27 => RLA(ZeroPage(b!())),
            0x28 => PLP,
            0x29 => AND(Immediate(b!())),
            0x2a => ROL(Accumulator),
            0x2c => BIT(Absolute(w!())),
            0x2d => AND(Absolute(w!())),
            0x2e => ROL(Absolute(w!())),
            0x2f => RLA(Absolute(w!())),
            0x30 => BMI(Relative(b!() as i8)),
            0x31 => AND(IndirectY(b!())),
            0x33 => RLA(IndirectY(b!())),
            0x35 => AND(ZeroPageX(b!())),
            0x36 => ROL(ZeroPageX(b!())),
            0x37 => RLA(ZeroPageX(b!())),
            0x38 => SEC,
            0x39 => AND(AbsoluteY(w!())),
            0x3b => RLA(AbsoluteY(w!())),
            0x3d => AND(AbsoluteX(w!())),
            0x3e => ROL(AbsoluteX(w!())),
            0x3f => RLA(AbsoluteX(w!())),
            0x40 => RTI,
            0x41 => EOR(IndirectX(b!())),
            0x43 => SRE(IndirectX(b!())),
            0x45 => EOR(ZeroPage(b!())),
            0x46 => LSR(ZeroPage(b!())),
            0x47 => SRE(ZeroPage(b!())),
            0x48 => PHA,
            0x49 => EOR(Immediate(b!())),
            0x4a => LSR(Accumulator),
            0x4b => ALR(Immediate(b!())),
            0x4c => JMP(Absolute(w!())),
            0x4d => EOR(Absolute(w!())),
            0x4e => LSR(Absolute(w!())),
            0x4f => SRE(Absolute(w!())),
            0x50 => BVC(Relative(b!() as i8)),
            0x51 => EOR(IndirectY(b!())),
            0x53 => SRE(IndirectY(b!())),
            0x55 => EOR(ZeroPageX(b!())),
            0x56 => LSR(ZeroPageX(b!())),
            0x57 => SRE(ZeroPageX(b!())),
            0x58 => CLI,
            0x59 => EOR(AbsoluteY(w!())),
            0x5b => SRE(AbsoluteY(w!())),
            0x5d => EOR(AbsoluteX(w!())),
            0x5e => LSR(AbsoluteX(w!())),
            0x5f => SRE(AbsoluteX(w!())),
            0x60 => RTS,
            0x61 => ADC(IndirectX(b!())),
            0x63 => RRA(IndirectX(b!())),
            0x65 => ADC(ZeroPage(b!())),
            0x66 => ROR(ZeroPage(b!())),
            0x67 => RRA(ZeroPage(b!())),
            0x68 => PLA,
            0x69 => ADC(Immediate(b!())),
            0x6a => ROR(Accumulator),
            0x6b => ARR(Immediate(b!())),
            0x6c => JMP(Indirect(w!())),
            0x6d => ADC(Absolute(w!())),
            0x6e => ROR(Absolute(w!())),
            0x6f => RRA(Absolute(w!())),
            0x70 => BVS(Relative(b!() as i8)),
            0x71 => ADC(IndirectY(b!())),
            0x73 => RRA(IndirectY(b!())),
            0x75 => ADC(ZeroPageX(b!())),
            0x76 => ROR(ZeroPageX(b!())),
            0x77 => RRA(ZeroPageX(b!())),
            0x78 => SEI,
            0x79 => ADC(AbsoluteY(w!())),
            0x7b => RRA(AbsoluteY(w!())),
            0x7d => ADC(AbsoluteX(w!())),
            0x7e => ROR(AbsoluteX(w!())),
            0x7f => RRA(AbsoluteX(w!())),
            0x80 | 0x82 | 0x89 | 0xc2 | 0xe2 => SKB(Immediate(b!())),
            0x81 => STA(IndirectX(b!())),
            0x83 => SAX(IndirectX(b!())),
            0x84 => STY(ZeroPage(b!())),
            0x85 => STA(ZeroPage(b!())),
            0x86 => STX(ZeroPage(b!())),
            0x87 => SAX(ZeroPage(b!())),
            0x88 => DEY,
            0x8a => TXA,
            0x8b => ANE(Immediate(b!())),
            0x8c => STY(Absolute(w!())),
            0x8d => STA(Absolute(w!())),
            0x8e => STX(Absolute(w!())),
            0x8f => SAX(Absolute(w!())),
            0x90 => BCC(Relative(b!() as i8)),
            0x91 => STA(IndirectY(b!())),
            0x93 => SHA(IndirectY(b!())),
            0x94 => STY(ZeroPageX(b!())),
            0x95 => STA(ZeroPageX(b!())),
            0x96 => STX(ZeroPageY(b!())),
            0x97 => SAX(ZeroPageY(b!())),
            0x98 => TYA,
            0x99 => STA(AbsoluteY(w!())),
            0x9a => TXS,
            0x9b => TAS(AbsoluteY(w!())),
            0x9c => SHY(AbsoluteX(w!())),
            0x9d => STA(AbsoluteX(w!())),
            0x9e => SHX(AbsoluteY(w!())),
            0x9f => SHA(AbsoluteY(w!())),
            0xa0 => LDY(Immediate(b!())),
            0xa1 => LDA(IndirectX(b!())),
            0xa2 => LDX(Immediate(b!())),
            0xa3 => LAX(IndirectX(b!())),
            0xa4 => LDY(ZeroPage(b!())),
            0xa5 => LDA(ZeroPage(b!())),
            0xa6 => LDX(ZeroPage(b!())),
            0xa7 => LAX(ZeroPage(b!())),
            0xa8 => TAY,
            0xa9 => LDA(Immediate(b!())),
            0xaa => TAX,
            0xab => LXA(Immediate(b!())),
            0xac => LDY(Absolute(w!())),
            0xad => LDA(Absolute(w!())),
            0xae => LDX(Absolute(w!())),
            0xaf => LAX(Absolute(w!())),
            0xb0 => BCS(Relative(b!() as i8)),
            0xb1 => LDA(IndirectY(b!())),
            0xb3 => LAX(IndirectY(b!())),
            0xb4 => LDY(ZeroPageX(b!())),
            0xb5 => LDA(ZeroPageX(b!())),
            0xb6 => LDX(ZeroPageY(b!())),
            0xb7 => LAX(ZeroPageY(b!())),
            0xb8 => CLV,
            0xb9 => LDA(AbsoluteY(w!())),
            0xba => TSX,
            0xbb => LAS(AbsoluteY(w!())),
            0xbc => LDY(AbsoluteX(w!())),
            0xbd => LDA(AbsoluteX(w!())),
            0xbe => LDX(AbsoluteY(w!())),
            0xbf => LAX(AbsoluteY(w!())),
            0xc0 => CPY(Immediate(b!())),
            0xc1 => CMP(IndirectX(b!())),
            0xc3 => DCP(IndirectX(b!())),
            0xc4 => CPY(ZeroPage(b!())),
            0xc5 => CMP(ZeroPage(b!())),
            0xc6 => DEC(ZeroPage(b!())),
            0xc7 => DCP(ZeroPage(b!())),
            0xc8 => INY,
            0xc9 => CMP(Immediate(b!())),
            0xca => DEX,
            0xcb => SBX(Immediate(b!())),
            0xcc => CPY(Absolute(w!())),
            0xcd => CMP(Absolute(w!())),
            0xce => DEC(Absolute(w!())),
            0xcf => DCP(Absolute(w!())),
            0xd0 => BNE(Relative(b!() as i8)),
            0xd1 => CMP(IndirectY(b!())),
            0xd3 => DCP(IndirectY(b!())),
            0xd5 => CMP(ZeroPageX(b!())),
            0xd6 => DEC(ZeroPageX(b!())),
            0xd7 => DCP(ZeroPageX(b!())),
            0xd8 => CLD,
            0xd9 => CMP(AbsoluteY(w!())),
            0xdb => DCP(AbsoluteY(w!())),
            0xdd => CMP(AbsoluteX(w!())),
            0xde => DEC(AbsoluteX(w!())),
            0xdf => DCP(AbsoluteX(w!())),
            0xe0 => CPX(Immediate(b!())),
            0xe1 => SBC(IndirectX(b!())),
            0xe3 => ISC(IndirectX(b!())),
            0xe4 => CPX(ZeroPage(b!())),
            0xe5 => SBC(ZeroPage(b!())),
            0xe6 => INC(ZeroPage(b!())),
            0xe7 => ISC(ZeroPage(b!())),
            0xe8 => INX,
            0xe9 => SBC(Immediate(b!())),
            0xeb => USBC(Immediate(b!())),
            0xec => CPX(Absolute(w!())),
            0xed => SBC(Absolute(w!())),
            0xee => INC(Absolute(w!())),
            0xef => ISC(Absolute(w!())),
            0xf0 => BEQ(Relative(b!() as i8)),
            0xf1 => SBC(IndirectY(b!())),
            0xf3 => ISC(IndirectY(b!())),
            0xf5 => SBC(ZeroPageX(b!())),
            0xf6 => INC(ZeroPageX(b!())),
            0xf7 => ISC(ZeroPageX(b!())),
            0xf8 => SED,
            0xf9 => SBC(AbsoluteY(w!())),
            0xfb => ISC(AbsoluteY(w!())),
            0xfd => SBC(AbsoluteX(w!())),
            0xfe => INC(AbsoluteX(w!())),
            0xff => ISC(AbsoluteX(w!())),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        macro_rules! o {
            ($name:expr, $operand:expr) => {
                write!(f, "{} {}", $name, $operand)
            };
        }
        match *self {
            Instruction::LDA(ref op) => o!("lda", op),
            Instruction::LDX(ref op) => o!("ldx", op),
            Instruction::LDY(ref op) => o!("ldy", op),
            Instruction::PHA => write!(f, "pha"),
            Instruction::PHP => write!(f, "php"),
            Instruction::PLA => write!(f, "pla"),
            Instruction::PLP => write!(f, "plp"),
            Instruction::STA(ref op) => o!("sta", op),
            Instruction::STX(ref op) => o!("stx", op),
            Instruction::STY(ref op) => o!("sty", op),
            Instruction::TAX => write!(f, "tax"),
            Instruction::TAY => write!(f, "tay"),
            Instruction::TSX => write!(f, "tsx"),
            Instruction::TXA => write!(f, "txa"),
            Instruction::TXS => write!(f, "txs"),
            Instruction::TYA => write!(f, "tya"),
            Instruction::ADC(ref op) => o!("adc", op),
            Instruction::SBC(ref op) => o!("sbc", op),
            Instruction::CMP(ref op) => o!("cmp", op),
            Instruction::CPX(ref op) => o!("cpx", op),
            Instruction::CPY(ref op) => o!("cpy", op),
            Instruction::DEC(ref op) => o!("dec", op),
            Instruction::DEX => write!(f, "dex"),
            Instruction::DEY => write!(f, "dey"),
            Instruction::INC(ref op) => o!("inc", op),
            Instruction::INX => write!(f, "inx"),
            Instruction::INY => write!(f, "iny"),
            Instruction::AND(ref op) => o!("and", op),
            Instruction::EOR(ref op) => o!("eor", op),
            Instruction::ORA(ref op) => o!("ora", op),
            Instruction::ASL(ref op) => o!("asl", op),
            Instruction::LSR(ref op) => o!("lsr", op),
            Instruction::ROL(ref op) => o!("rol", op),
            Instruction::ROR(ref op) => o!("ror", op),
            Instruction::BCC(ref op) => o!("bcc", op),
            Instruction::BCS(ref op) => o!("bcs", op),
            Instruction::BEQ(ref op) => o!("beq", op),
            Instruction::BMI(ref op) => o!("bmi", op),
            Instruction::BNE(ref op) => o!("bne", op),
            Instruction::BPL(ref op) => o!("bpl", op),
            Instruction::BVC(ref op) => o!("bvc", op),
            Instruction::BVS(ref op) => o!("bvs", op),
            Instruction::JMP(ref op) => o!("jmp", op),
            Instruction::JSR(ref op) => o!("jsr", op),
            Instruction::RTS => write!(f, "rts"),
            Instruction::BIT(ref op) => o!("bit", op),
            Instruction::BRK => write!(f, "brk"),
            Instruction::CLC => write!(f, "clc"),
            Instruction::CLD => write!(f, "cld"),
            Instruction::CLI => write!(f, "cli"),
            Instruction::CLV => write!(f, "clv"),
            Instruction::NOP => write!(f, "nop"),
            Instruction::SEC => write!(f, "sec"),
            Instruction::SED => write!(f, "sed"),
            Instruction::SEI => write!(f, "sei"),
            Instruction::RTI => write!(f, "rti"),
            Instruction::SLO(ref op) => o!("slo", op),
            Instruction::RLA(ref op) => o!("rla", op),
            Instruction::SRE(ref op) => o!("sre", op),
            Instruction::RRA(ref op) => o!("rra", op),
            Instruction::DCP(ref op) => o!("dcp", op),
            Instruction::ISC(ref op) => o!("isc", op),
            Instruction::SAX(ref op) => o!("sax", op),
            Instruction::LAX(ref op) => o!("lax", op),
            Instruction::SHX(ref op) => o!("shx", op),
            Instruction::SHY(ref op) => o!("shy", op),
            Instruction::ALR(ref op) => o!("alr", op),
            Instruction::ANC(ref op) => o!("anc", op),
            Instruction::ARR(ref op) => o!("arr", op),
            Instruction::ANE(ref op) => o!("ane", op),
            Instruction::LXA(ref op) => o!("lxa", op),
            Instruction::SBX(ref op) => o!("sbx", op),
            Instruction::USBC(ref op) => o!("usbc", op),
            Instruction::SKB(ref op) => o!("skb", op),
            Instruction::JAM => write!(f, "jam"),
            Instruction::SHA(ref op) => o!("sha", op),
            Instruction::TAS(ref op) => o!("tas", op),
            Instruction::LAS(ref op) => o!("las", op),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::tests_support::setup_cpu;
    use crate::traits::make_noop;

    #[test]
    fn decode_brk() {
        let mut cpu = setup_cpu();
        assert!(matches!(
            Instruction::decode(&mut cpu, 0x00, &make_noop()),
            Instruction::BRK
        ));
    }

    #[test]
    fn decode_lda_absolute() {
        let mut cpu = setup_cpu();
        assert!(matches!(
            Instruction::decode(&mut cpu, 0xad, &make_noop()),
            Instruction::LDA(Operand::Absolute(_))
        ));
    }

    #[test]
    fn decode_jam() {
        let mut cpu = setup_cpu();
        assert!(matches!(
            Instruction::decode(&mut cpu, 0x02, &make_noop()),
            Instruction::JAM
        ));
    }
}
