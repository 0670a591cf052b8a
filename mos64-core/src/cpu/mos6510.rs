// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use log::log_enabled;

use crate::traits::{make_noop, Addressable, Cpu as CpuTrait, TickFn};
use crate::util::{IoPort, IrqLine, Pin, Shared};

use super::instruction::Instruction;
use super::operand::Operand;

// http://nesdev.com/6502.txt is the reference for flag/timing semantics below.

#[derive(Clone, Copy)]
enum Flag {
    Carry = 1,
    Zero = 1 << 1,
    IntDisable = 1 << 2,
    Decimal = 1 << 3,
    Break = 1 << 4,
    Reserved = 1 << 5,
    Overflow = 1 << 6,
    Negative = 1 << 7,
}

#[derive(Debug)]
enum Interrupt {
    Irq,
    Nmi,
    Break,
    Reset,
}

impl Interrupt {
    fn vector(&self) -> u16 {
        match *self {
            Interrupt::Irq | Interrupt::Break => 0xfffe,
            Interrupt::Nmi => 0xfffa,
            Interrupt::Reset => 0xfffc,
        }
    }
}

struct Registers {
    a: u8,
    x: u8,
    y: u8,
    sp: u8,
    pc: u16,
    p: u8,
}

impl Registers {
    fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xfd,
            pc: 0,
            p: Flag::IntDisable as u8,
        }
    }

    fn reset(&mut self) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xfd;
        self.p = Flag::IntDisable as u8;
    }
}

/// Invoked when [`Mos6510::step`] decodes an opcode this engine does not implement
/// (currently: JAM, and the unstable SHA/TAS/LAS undocumented opcodes). Returning `true`
/// means the handler fully serviced the trap (e.g. a test harness intercepted this PC);
/// `false` propagates to a panic. Registered by test harnesses; production leaves this unset.
pub type TrapHandler = Box<dyn FnMut(u8, &mut Mos6510) -> bool>;

/// The MOS 6510 CPU: registers, flags, and the two port-register bits at 0x0000/0x0001 that
/// this chip (unlike a plain 6502) exposes for bank switching. Decoding is delegated to
/// [`Instruction`]; addressing-mode resolution to [`Operand`]; both call back into this type's
/// `read_internal`/`write_internal`/`fetch_*` so every memory access funnels through one path
/// that also drives the per-cycle tick callback.
pub struct Mos6510 {
    mem: Shared<dyn Addressable>,
    regs: Registers,
    ba_line: Shared<Pin>,
    io_port: Shared<IoPort>,
    irq_line: Shared<IrqLine>,
    nmi_line: Shared<IrqLine>,
    trap_handler: Option<TrapHandler>,
}

impl Mos6510 {
    pub fn new(
        mem: Shared<dyn Addressable>,
        io_port: Shared<IoPort>,
        ba_line: Shared<Pin>,
        irq_line: Shared<IrqLine>,
        nmi_line: Shared<IrqLine>,
    ) -> Self {
        Self {
            mem,
            regs: Registers::new(),
            ba_line,
            io_port,
            irq_line,
            nmi_line,
            trap_handler: None,
        }
    }

    pub fn set_trap_handler(&mut self, handler: TrapHandler) {
        self.trap_handler = Some(handler);
    }

    pub fn fetch_byte(&mut self, tick_fn: &TickFn) -> u8 {
        let byte = self.read_internal(self.regs.pc, tick_fn);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        byte
    }

    pub fn fetch_word(&mut self, tick_fn: &TickFn) -> u16 {
        let low = self.fetch_byte(tick_fn);
        let high = self.fetch_byte(tick_fn);
        ((high as u16) << 8) | low as u16
    }

    /// Zero-page indirect pointer read: both bytes wrap within page 0, used by
    /// (zp,X) and (zp),Y addressing.
    pub fn read_internal_u16_zp(&self, address: u16, tick_fn: &TickFn) -> u16 {
        let zp = address as u8;
        let low = self.read_internal(zp as u16, tick_fn);
        let high = self.read_internal(zp.wrapping_add(1) as u16, tick_fn);
        ((high as u16) << 8) | low as u16
    }

    /// JMP ($xxFF) reads its high byte from the start of the same page instead of the next
    /// page — the classic 6502 indirect-jump page-wrap bug, reproduced deliberately.
    pub fn read_internal_u16_jmp_bug(&self, address: u16, tick_fn: &TickFn) -> u16 {
        let low = self.read_internal(address, tick_fn);
        let next = if address & 0x00ff == 0x00ff {
            address & 0xff00
        } else {
            address + 1
        };
        let high = self.read_internal(next, tick_fn);
        ((high as u16) << 8) | low as u16
    }

    pub fn read_internal(&self, address: u16, tick_fn: &TickFn) -> u8 {
        let value = match address {
            0x0000 => self.io_port.borrow().get_direction(),
            0x0001 => self.io_port.borrow().get_value(),
            _ => self.mem.borrow().read(address),
        };
        tick_fn();
        value
    }

    pub fn write_internal(&mut self, address: u16, value: u8, tick_fn: &TickFn) {
        match address {
            0x0000 => self.io_port.borrow_mut().set_direction(value),
            0x0001 => self.io_port.borrow_mut().set_value(value),
            _ => self.mem.borrow_mut().write(address, value),
        }
        tick_fn();
    }

    fn interrupt(&mut self, interrupt: &Interrupt, tick_fn: &TickFn) {
        if log_enabled!(log::Level::Trace) {
            log::trace!("interrupt {:?}", interrupt);
        }
        let pc = self.regs.pc;
        let p = self.regs.p;
        match interrupt {
            Interrupt::Irq => {
                self.push(((pc >> 8) & 0xff) as u8, tick_fn);
                self.push((pc & 0xff) as u8, tick_fn);
                self.push(p & !(Flag::Break as u8) | Flag::Reserved as u8, tick_fn);
                self.set_flag(Flag::IntDisable, true);
            }
            Interrupt::Nmi => {
                self.push(((pc >> 8) & 0xff) as u8, tick_fn);
                self.push((pc & 0xff) as u8, tick_fn);
                self.push(p & !(Flag::Break as u8) | Flag::Reserved as u8, tick_fn);
                self.set_flag(Flag::IntDisable, true);
                self.nmi_line.borrow_mut().reset();
            }
            Interrupt::Break => {
                let ret = pc.wrapping_add(1);
                self.push(((ret >> 8) & 0xff) as u8, tick_fn);
                self.push((ret & 0xff) as u8, tick_fn);
                self.push(p | (Flag::Break as u8) | (Flag::Reserved as u8), tick_fn);
                self.set_flag(Flag::IntDisable, true);
            }
            Interrupt::Reset => {}
        }
        self.regs.pc = self.read_internal_u16_jmp_bug_free(interrupt.vector(), tick_fn);
        tick_fn();
    }

    /// Vector reads are always two sequential bytes with no page-wrap quirk.
    fn read_internal_u16_jmp_bug_free(&self, address: u16, tick_fn: &TickFn) -> u16 {
        let low = self.read_internal(address, tick_fn);
        let high = self.read_internal(address.wrapping_add(1), tick_fn);
        ((high as u16) << 8) | low as u16
    }

    fn pop(&mut self, tick_fn: &TickFn) -> u8 {
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let addr = 0x0100 + self.regs.sp as u16;
        self.read_internal(addr, tick_fn)
    }

    fn push(&mut self, value: u8, tick_fn: &TickFn) {
        let addr = 0x0100 + self.regs.sp as u16;
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_internal(addr, value, tick_fn);
    }

    fn set_flag(&mut self, flag: Flag, value: bool) {
        if value {
            self.regs.p |= flag as u8;
        } else {
            self.regs.p &= !(flag as u8);
        }
    }

    fn test_flag(&self, flag: Flag) -> bool {
        (self.regs.p & (flag as u8)) != 0
    }

    fn update_nz(&mut self, value: u8) {
        self.set_flag(Flag::Negative, value & 0x80 != 0);
        self.set_flag(Flag::Zero, value == 0);
    }

    fn adc(&mut self, value: u8) {
        let ac = self.regs.a as u16;
        let value = value as u16;
        let carry = if self.test_flag(Flag::Carry) { 1 } else { 0 };
        let temp = if !self.test_flag(Flag::Decimal) {
            ac.wrapping_add(value).wrapping_add(carry)
        } else {
            let mut t = (ac & 0x0f) + (value & 0x0f) + carry;
            if t > 0x09 {
                t += 0x06;
            }
            t += (ac & 0xf0) + (value & 0xf0);
            if t & 0x01f0 > 0x90 {
                t += 0x60;
            }
            t
        };
        self.set_flag(
            Flag::Overflow,
            (ac ^ value) & 0x80 == 0 && (ac ^ temp) & 0x80 == 0x80,
        );
        self.set_flag(Flag::Carry, temp > 0xff);
        let result = (temp & 0xff) as u8;
        self.update_nz(result);
        self.regs.a = result;
    }

    fn sbc(&mut self, value: u8) {
        let ac = self.regs.a as u16;
        let value = value as u16;
        let carry = if self.test_flag(Flag::Carry) { 0 } else { 1 };
        let temp = if !self.test_flag(Flag::Decimal) {
            ac.wrapping_sub(value).wrapping_sub(carry)
        } else {
            let mut t = (ac & 0x0f).wrapping_sub(value & 0x0f).wrapping_sub(carry);
            if t & 0x10 != 0 {
                t = (t.wrapping_sub(0x06) & 0x0f)
                    .wrapping_add((ac & 0xf0).wrapping_sub(value & 0xf0).wrapping_sub(0x10));
            } else {
                t = (t & 0x0f).wrapping_add((ac & 0xf0).wrapping_sub(value & 0xf0));
            }
            if t & 0x0100 != 0 {
                t = t.wrapping_sub(0x60);
            }
            t
        };
        self.set_flag(
            Flag::Overflow,
            (ac ^ temp) & 0x80 != 0 && (ac ^ value) & 0x80 == 0x80,
        );
        self.set_flag(Flag::Carry, temp <= 0xff);
        let result = (temp & 0xff) as u8;
        self.update_nz(result);
        self.regs.a = result;
    }

    fn execute(&mut self, instr: &Instruction, tick_fn: &TickFn) {
        use Instruction::*;
        match *instr {
            LDA(ref op) => {
                let value = op.get(self, tick_fn);
                self.update_nz(value);
                self.regs.a = value;
            }
            LDX(ref op) => {
                let value = op.get(self, tick_fn);
                self.update_nz(value);
                self.regs.x = value;
            }
            LDY(ref op) => {
                let value = op.get(self, tick_fn);
                self.update_nz(value);
                self.regs.y = value;
            }
            PHA => {
                let value = self.regs.a;
                self.push(value, tick_fn);
                tick_fn();
            }
            PHP => {
                let value = self.regs.p | (Flag::Break as u8) | (Flag::Reserved as u8);
                self.push(value, tick_fn);
                tick_fn();
            }
            PLA => {
                tick_fn();
                let value = self.pop(tick_fn);
                self.update_nz(value);
                self.regs.a = value;
                tick_fn();
            }
            PLP => {
                tick_fn();
                let value = self.pop(tick_fn);
                self.regs.p = (value & !(Flag::Break as u8)) | (Flag::Reserved as u8);
                tick_fn();
            }
            STA(ref op) => {
                let value = self.regs.a;
                op.set(self, value, true, tick_fn);
            }
            STX(ref op) => {
                let value = self.regs.x;
                op.set(self, value, true, tick_fn);
            }
            STY(ref op) => {
                let value = self.regs.y;
                op.set(self, value, true, tick_fn);
            }
            TAX => {
                let value = self.regs.a;
                self.update_nz(value);
                self.regs.x = value;
                tick_fn();
            }
            TAY => {
                let value = self.regs.a;
                self.update_nz(value);
                self.regs.y = value;
                tick_fn();
            }
            TSX => {
                let value = self.regs.sp;
                self.update_nz(value);
                self.regs.x = value;
                tick_fn();
            }
            TXA => {
                let value = self.regs.x;
                self.update_nz(value);
                self.regs.a = value;
                tick_fn();
            }
            TXS => {
                self.regs.sp = self.regs.x;
                tick_fn();
            }
            TYA => {
                let value = self.regs.y;
                self.update_nz(value);
                self.regs.a = value;
                tick_fn();
            }
            ADC(ref op) => {
                let value = op.get(self, tick_fn);
                self.adc(value);
            }
            SBC(ref op) | USBC(ref op) => {
                let value = op.get(self, tick_fn);
                self.sbc(value);
            }
            CMP(ref op) => {
                let result = (self.regs.a as u16).wrapping_sub(op.get(self, tick_fn) as u16);
                self.set_flag(Flag::Carry, result <= 0xff);
                self.update_nz((result & 0xff) as u8);
            }
            CPX(ref op) => {
                let result = (self.regs.x as u16).wrapping_sub(op.get(self, tick_fn) as u16);
                self.set_flag(Flag::Carry, result <= 0xff);
                self.update_nz((result & 0xff) as u8);
            }
            CPY(ref op) => {
                let result = (self.regs.y as u16).wrapping_sub(op.get(self, tick_fn) as u16);
                self.set_flag(Flag::Carry, result <= 0xff);
                self.update_nz((result & 0xff) as u8);
            }
            DEC(ref op) => {
                let result = op.get(self, tick_fn).wrapping_sub(1);
                self.update_nz(result);
                op.set(self, result, true, tick_fn);
                tick_fn();
            }
            DEX => {
                let result = self.regs.x.wrapping_sub(1);
                self.update_nz(result);
                self.regs.x = result;
                tick_fn();
            }
            DEY => {
                let result = self.regs.y.wrapping_sub(1);
                self.update_nz(result);
                self.regs.y = result;
                tick_fn();
            }
            INC(ref op) => {
                let result = op.get(self, tick_fn).wrapping_add(1);
                self.update_nz(result);
                op.set(self, result, true, tick_fn);
                tick_fn();
            }
            INX => {
                let result = self.regs.x.wrapping_add(1);
                self.update_nz(result);
                self.regs.x = result;
                tick_fn();
            }
            INY => {
                let result = self.regs.y.wrapping_add(1);
                self.update_nz(result);
                self.regs.y = result;
                tick_fn();
            }
            AND(ref op) => {
                let result = op.get(self, tick_fn) & self.regs.a;
                self.update_nz(result);
                self.regs.a = result;
            }
            EOR(ref op) => {
                let result = op.get(self, tick_fn) ^ self.regs.a;
                self.update_nz(result);
                self.regs.a = result;
            }
            ORA(ref op) => {
                let result = op.get(self, tick_fn) | self.regs.a;
                self.update_nz(result);
                self.regs.a = result;
            }
            ASL(ref op) => {
                let value = op.get(self, tick_fn);
                self.set_flag(Flag::Carry, (value & 0x80) != 0);
                let result = value << 1;
                self.update_nz(result);
                op.set(self, result, true, tick_fn);
                tick_fn();
            }
            LSR(ref op) => {
                let value = op.get(self, tick_fn);
                self.set_flag(Flag::Carry, (value & 0x01) != 0);
                let result = value >> 1;
                self.update_nz(result);
                op.set(self, result, true, tick_fn);
                tick_fn();
            }
            ROL(ref op) => {
                let value = op.get(self, tick_fn);
                let mut temp = (value as u16) << 1;
                if self.test_flag(Flag::Carry) {
                    temp |= 0x01;
                }
                self.set_flag(Flag::Carry, temp > 0xff);
                let result = (temp & 0xff) as u8;
                self.update_nz(result);
                op.set(self, result, true, tick_fn);
                tick_fn();
            }
            ROR(ref op) => {
                let value = op.get(self, tick_fn) as u16;
                let mut temp = value;
                if self.test_flag(Flag::Carry) {
                    temp |= 0x100;
                }
                self.set_flag(Flag::Carry, temp & 0x01 != 0);
                temp >>= 1;
                let result = (temp & 0xff) as u8;
                self.update_nz(result);
                op.set(self, result, true, tick_fn);
                tick_fn();
            }
            BCC(ref op) => self.branch(!self.test_flag(Flag::Carry), op, tick_fn),
            BCS(ref op) => self.branch(self.test_flag(Flag::Carry), op, tick_fn),
            BEQ(ref op) => self.branch(self.test_flag(Flag::Zero), op, tick_fn),
            BMI(ref op) => self.branch(self.test_flag(Flag::Negative), op, tick_fn),
            BNE(ref op) => self.branch(!self.test_flag(Flag::Zero), op, tick_fn),
            BPL(ref op) => self.branch(!self.test_flag(Flag::Negative), op, tick_fn),
            BVC(ref op) => self.branch(!self.test_flag(Flag::Overflow), op, tick_fn),
            BVS(ref op) => self.branch(self.test_flag(Flag::Overflow), op, tick_fn),
            JMP(ref op) => {
                self.regs.pc = op.ea(self, false, tick_fn);
            }
            JSR(ref op) => {
                let pc = self.regs.pc.wrapping_sub(1);
                self.push(((pc >> 8) & 0xff) as u8, tick_fn);
                self.push((pc & 0xff) as u8, tick_fn);
                self.regs.pc = op.ea(self, false, tick_fn);
                tick_fn();
            }
            RTS => {
                let low = self.pop(tick_fn);
                let high = self.pop(tick_fn);
                self.regs.pc = (((high as u16) << 8) | low as u16).wrapping_add(1);
                tick_fn();
                tick_fn();
            }
            BIT(ref op) => {
                let value = op.get(self, tick_fn);
                let a = self.regs.a;
                self.set_flag(Flag::Negative, value & 0x80 != 0);
                self.set_flag(Flag::Overflow, value & 0x40 != 0);
                self.set_flag(Flag::Zero, value & a == 0);
            }
            BRK => self.interrupt(&Interrupt::Break, tick_fn),
            CLC => {
                self.set_flag(Flag::Carry, false);
                tick_fn();
            }
            CLD => {
                self.set_flag(Flag::Decimal, false);
                tick_fn();
            }
            CLI => {
                self.set_flag(Flag::IntDisable, false);
                tick_fn();
            }
            CLV => {
                self.set_flag(Flag::Overflow, false);
                tick_fn();
            }
            NOP => tick_fn(),
            SEC => {
                self.set_flag(Flag::Carry, true);
                tick_fn();
            }
            SED => {
                self.set_flag(Flag::Decimal, true);
                tick_fn();
            }
            SEI => {
                self.set_flag(Flag::IntDisable, true);
                tick_fn();
            }
            RTI => {
                tick_fn();
                let p = self.pop(tick_fn);
                self.regs.p = (p & !(Flag::Break as u8)) | (Flag::Reserved as u8);
                let low = self.pop(tick_fn);
                let high = self.pop(tick_fn);
                self.regs.pc = ((high as u16) << 8) | low as u16;
            }
            SLO(ref op) => {
                let value = op.get(self, tick_fn);
                self.set_flag(Flag::Carry, value & 0x80 != 0);
                let shifted = value << 1;
                op.set(self, shifted, true, tick_fn);
                let result = shifted | self.regs.a;
                self.update_nz(result);
                self.regs.a = result;
                tick_fn();
            }
            RLA(ref op) => {
                let value = op.get(self, tick_fn);
                let mut temp = (value as u16) << 1;
                if self.test_flag(Flag::Carry) {
                    temp |= 0x01;
                }
                self.set_flag(Flag::Carry, temp > 0xff);
                let rotated = (temp & 0xff) as u8;
                op.set(self, rotated, true, tick_fn);
                let result = rotated & self.regs.a;
                self.update_nz(result);
                self.regs.a = result;
                tick_fn();
            }
            SRE(ref op) => {
                let value = op.get(self, tick_fn);
                self.set_flag(Flag::Carry, value & 0x01 != 0);
                let shifted = value >> 1;
                op.set(self, shifted, true, tick_fn);
                let result = shifted ^ self.regs.a;
                self.update_nz(result);
                self.regs.a = result;
                tick_fn();
            }
            RRA(ref op) => {
                let value = op.get(self, tick_fn) as u16;
                let mut temp = value;
                if self.test_flag(Flag::Carry) {
                    temp |= 0x100;
                }
                self.set_flag(Flag::Carry, temp & 0x01 != 0);
                temp >>= 1;
                let rotated = (temp & 0xff) as u8;
                op.set(self, rotated, true, tick_fn);
                self.adc(rotated);
                tick_fn();
            }
            DCP(ref op) => {
                let result = op.get(self, tick_fn).wrapping_sub(1);
                op.set(self, result, true, tick_fn);
                let cmp = (self.regs.a as u16).wrapping_sub(result as u16);
                self.set_flag(Flag::Carry, cmp <= 0xff);
                self.update_nz((cmp & 0xff) as u8);
                tick_fn();
            }
            ISC(ref op) => {
                let result = op.get(self, tick_fn).wrapping_add(1);
                op.set(self, result, true, tick_fn);
                self.sbc(result);
                tick_fn();
            }
            SAX(ref op) => {
                let value = self.regs.a & self.regs.x;
                op.set(self, value, true, tick_fn);
            }
            LAX(ref op) => {
                let value = op.get(self, tick_fn);
                self.update_nz(value);
                self.regs.a = value;
                self.regs.x = value;
            }
            SHX(ref op) => {
                let high = ((op.ea(self, true, tick_fn) >> 8) as u8).wrapping_add(1);
                let value = self.regs.x & high;
                op.set(self, value, true, tick_fn);
            }
            SHY(ref op) => {
                let high = ((op.ea(self, true, tick_fn) >> 8) as u8).wrapping_add(1);
                let value = self.regs.y & high;
                op.set(self, value, true, tick_fn);
            }
            ALR(ref op) => {
                let value = self.regs.a & op.get(self, tick_fn);
                self.set_flag(Flag::Carry, value & 0x01 != 0);
                let result = value >> 1;
                self.update_nz(result);
                self.regs.a = result;
            }
            ANC(ref op) => {
                let result = self.regs.a & op.get(self, tick_fn);
                self.update_nz(result);
                self.set_flag(Flag::Carry, result & 0x80 != 0);
                self.regs.a = result;
            }
            ARR(ref op) => {
                let value = self.regs.a & op.get(self, tick_fn);
                let mut temp = value as u16;
                if self.test_flag(Flag::Carry) {
                    temp |= 0x100;
                }
                temp >>= 1;
                let result = (temp & 0xff) as u8;
                self.update_nz(result);
                self.set_flag(Flag::Carry, result & 0x40 != 0);
                self.set_flag(Flag::Overflow, (result & 0x40 != 0) ^ (result & 0x20 != 0));
                self.regs.a = result;
            }
            ANE(ref op) => {
                let result = self.regs.a & self.regs.x & op.get(self, tick_fn);
                self.update_nz(result);
                self.regs.a = result;
            }
            LXA(ref op) => {
                let result = self.regs.a & op.get(self, tick_fn);
                self.update_nz(result);
                self.regs.a = result;
                self.regs.x = result;
            }
            SBX(ref op) => {
                let result =
                    ((self.regs.a & self.regs.x) as u16).wrapping_sub(op.get(self, tick_fn) as u16);
                self.set_flag(Flag::Carry, result <= 0xff);
                self.update_nz((result & 0xff) as u8);
                self.regs.x = (result & 0xff) as u8;
            }
            SKB(ref op) => {
                op.get(self, tick_fn);
            }
            JAM | SHA(_) | TAS(_) | LAS(_) => {
                self.trap(instr);
            }
        }
    }

    fn branch(&mut self, taken: bool, op: &Operand, tick_fn: &TickFn) {
        if taken {
            self.regs.pc = op.ea(self, false, tick_fn);
            tick_fn();
        }
    }

    fn trap(&mut self, instr: &Instruction) {
        let opcode = match instr {
            Instruction::JAM => 0x02,
            _ => 0x00,
        };
        if let Some(mut handler) = self.trap_handler.take() {
            let handled = handler(opcode, self);
            self.trap_handler = Some(handler);
            if handled {
                return;
            }
        }
        panic!("unimplemented opcode trapped: {}", instr);
    }

    fn last_nmi_edge(&self) -> bool {
        self.nmi_line.borrow().is_low()
    }
}

impl CpuTrait for Mos6510 {
    fn get_a(&self) -> u8 {
        self.regs.a
    }
    fn get_x(&self) -> u8 {
        self.regs.x
    }
    fn get_y(&self) -> u8 {
        self.regs.y
    }
    fn get_sp(&self) -> u8 {
        self.regs.sp
    }
    fn get_p(&self) -> u8 {
        self.regs.p
    }
    fn get_pc(&self) -> u16 {
        self.regs.pc
    }
    fn set_a(&mut self, value: u8) {
        self.regs.a = value;
    }
    fn set_x(&mut self, value: u8) {
        self.regs.x = value;
    }
    fn set_y(&mut self, value: u8) {
        self.regs.y = value;
    }
    fn set_sp(&mut self, value: u8) {
        self.regs.sp = value;
    }
    fn set_p(&mut self, value: u8) {
        self.regs.p = value;
    }
    fn set_pc(&mut self, value: u16) {
        self.regs.pc = value;
    }

    fn reset(&mut self) {
        self.regs.reset();
        self.io_port.borrow_mut().reset();
        self.io_port.borrow_mut().set_value(0xff);
        self.irq_line.borrow_mut().reset();
        self.nmi_line.borrow_mut().reset();
        let noop = make_noop();
        self.write_internal(0x0000, 0b0010_1111, &noop);
        self.write_internal(0x0001, 0b0001_1111, &noop);
        self.interrupt(&Interrupt::Reset, &noop);
    }

    fn step(&mut self, tick_fn: &TickFn) -> u32 {
        let count = Rc::new(Cell::new(0u32));
        let count_clone = count.clone();
        let inner = tick_fn.clone();
        let counting_tick: TickFn = Rc::new(move || {
            count_clone.set(count_clone.get() + 1);
            inner();
        });

        while self.ba_line.borrow().is_low() {
            counting_tick();
        }
        if self.last_nmi_edge() {
            self.interrupt(&Interrupt::Nmi, &counting_tick);
        } else if self.irq_line.borrow().is_low() && !self.test_flag(Flag::IntDisable) {
            self.interrupt(&Interrupt::Irq, &counting_tick);
        }
        let pc = self.regs.pc;
        let opcode = self.fetch_byte(&counting_tick);
        let instr = Instruction::decode(self, opcode, &counting_tick);
        if log_enabled!(log::Level::Trace) {
            log::trace!("0x{:04x}: {:<16} {}", pc, format!("{}", instr), self);
        }
        self.execute(&instr, &counting_tick);
        count.get()
    }

    fn read(&self, address: u16) -> u8 {
        self.read_internal(address, &make_noop())
    }

    fn write(&mut self, address: u16, value: u8) {
        self.write_internal(address, value, &make_noop());
    }
}

impl fmt::Display for Mos6510 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "a={:02x} x={:02x} y={:02x} sp={:02x} {}{}-{}{}{}{}",
            self.regs.a,
            self.regs.x,
            self.regs.y,
            self.regs.sp,
            if self.test_flag(Flag::Negative) { "N" } else { "n" },
            if self.test_flag(Flag::Overflow) { "V" } else { "v" },
            if self.test_flag(Flag::Decimal) { "D" } else { "d" },
            if self.test_flag(Flag::IntDisable) { "I" } else { "i" },
            if self.test_flag(Flag::Zero) { "Z" } else { "z" },
            if self.test_flag(Flag::Carry) { "C" } else { "c" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::tests_support::setup_cpu;

    #[test]
    fn reset_vector_loads_pc() {
        let mut cpu = setup_cpu();
        cpu.mem.borrow_mut().write(0xfffc, 0x00);
        cpu.mem.borrow_mut().write(0xfffd, 0xe0);
        cpu.reset();
        assert_eq!(0xe000, cpu.get_pc());
        assert_eq!(0xfd, cpu.get_sp());
        assert!(cpu.test_flag(Flag::IntDisable));
    }

    #[test]
    fn adc_binary_carry() {
        let mut cpu = setup_cpu();
        cpu.set_a(0xf0);
        cpu.set_flag(Flag::Carry, true);
        cpu.adc(0x20);
        assert_eq!(0x11, cpu.get_a());
        assert!(cpu.test_flag(Flag::Carry));
        assert!(!cpu.test_flag(Flag::Overflow));
        assert!(!cpu.test_flag(Flag::Negative));
    }

    #[test]
    fn adc_decimal_mode() {
        let mut cpu = setup_cpu();
        cpu.set_flag(Flag::Decimal, true);
        cpu.set_a(0x15);
        cpu.set_flag(Flag::Carry, false);
        cpu.adc(0x27);
        assert_eq!(0x42, cpu.get_a());
        assert!(!cpu.test_flag(Flag::Carry));
    }

    #[test]
    fn inc_wraps_and_sets_zero() {
        let mut cpu = setup_cpu();
        cpu.set_a(0xff);
        cpu.execute(&Instruction::INC(Operand::Accumulator), &make_noop());
        assert_eq!(0x00, cpu.get_a());
        assert!(cpu.test_flag(Flag::Zero));
        assert!(!cpu.test_flag(Flag::Negative));
    }

    #[test]
    fn jmp_indirect_page_wrap_bug() {
        let cpu = setup_cpu();
        cpu.mem.borrow_mut().write(0x30ff, 0x12);
        cpu.mem.borrow_mut().write(0x3100, 0x34);
        cpu.mem.borrow_mut().write(0x3000, 0x56);
        let op = Operand::Indirect(0x30ff);
        let ea = op.ea(&cpu, false, &make_noop());
        assert_eq!(0x5612, ea);
    }

    #[test]
    fn lda_absolute_x_pays_page_cross_penalty_on_plain_load() {
        let mut cpu = setup_cpu();
        cpu.set_pc(0x0300);
        cpu.set_x(0x01);
        cpu.mem.borrow_mut().write(0x0300, 0xbd); // LDA $20ff,X
        cpu.mem.borrow_mut().write(0x0301, 0xff);
        cpu.mem.borrow_mut().write(0x0302, 0x20);
        let tick = make_noop();
        let cycles = cpu.step(&tick);
        assert_eq!(5, cycles);
    }

    #[test]
    fn lda_absolute_x_no_penalty_without_page_cross() {
        let mut cpu = setup_cpu();
        cpu.set_pc(0x0300);
        cpu.set_x(0x01);
        cpu.mem.borrow_mut().write(0x0300, 0xbd); // LDA $2000,X
        cpu.mem.borrow_mut().write(0x0301, 0x00);
        cpu.mem.borrow_mut().write(0x0302, 0x20);
        let tick = make_noop();
        let cycles = cpu.step(&tick);
        assert_eq!(4, cycles);
    }

    #[test]
    fn jsr_rts_round_trip() {
        let mut cpu = setup_cpu();
        cpu.set_sp(0xff);
        cpu.set_pc(0x0300);
        cpu.mem.borrow_mut().write(0x0300, 0x20);
        cpu.mem.borrow_mut().write(0x0301, 0x00);
        cpu.mem.borrow_mut().write(0x0302, 0x04);
        cpu.mem.borrow_mut().write(0x0400, 0x60);
        let tick = make_noop();
        cpu.step(&tick);
        assert_eq!(0x0400, cpu.get_pc());
        cpu.step(&tick);
        assert_eq!(0x0303, cpu.get_pc());
    }
}
