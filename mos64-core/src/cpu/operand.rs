// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use core::fmt;

use crate::traits::{Cpu, TickFn};

use super::Mos6510;

/// The addressing mode attached to an opcode, carrying whatever bytes were fetched as its
/// operand. `ea` resolves an effective address (ticking extra cycles for page-crossings and
/// read-modify-write operations exactly as the real CPU does); `get`/`set` read or write the
/// operand's value through that address.
pub enum Operand {
    Accumulator,
    Immediate(u8),
    ZeroPage(u8),
    ZeroPageX(u8),
    ZeroPageY(u8),
    Absolute(u16),
    AbsoluteX(u16),
    AbsoluteY(u16),
    IndirectX(u8),
    IndirectY(u8),
    Indirect(u16),
    Relative(i8),
}

impl Operand {
    pub fn ea(&self, cpu: &Mos6510, rmw: bool, tick_fn: &TickFn) -> u16 {
        match *self {
            Operand::Accumulator => panic!("illegal addressing mode for ea: accumulator"),
            Operand::Immediate(_) => panic!("illegal addressing mode for ea: immediate"),
            Operand::ZeroPage(address) => address as u16,
            Operand::ZeroPageX(address) => {
                tick_fn();
                address.wrapping_add(cpu.get_x()) as u16
            }
            Operand::ZeroPageY(address) => {
                tick_fn();
                address.wrapping_add(cpu.get_y()) as u16
            }
            Operand::Absolute(address) => address,
            Operand::AbsoluteX(address) => {
                let ea = address.wrapping_add(cpu.get_x() as u16);
                if rmw || address & 0xff00 != ea & 0xff00 {
                    tick_fn();
                }
                ea
            }
            Operand::AbsoluteY(address) => {
                let ea = address.wrapping_add(cpu.get_y() as u16);
                if rmw || address & 0xff00 != ea & 0xff00 {
                    tick_fn();
                }
                ea
            }
            Operand::IndirectX(address) => {
                let calc_address = address.wrapping_add(cpu.get_x()) as u16;
                tick_fn();
                cpu.read_internal_u16_zp(calc_address, tick_fn)
            }
            Operand::IndirectY(address) => {
                let base = cpu.read_internal_u16_zp(address as u16, tick_fn);
                let ea = base.wrapping_add(cpu.get_y() as u16);
                if rmw || base & 0xff00 != ea & 0xff00 {
                    tick_fn();
                }
                ea
            }
            Operand::Indirect(address) => cpu.read_internal_u16_jmp_bug(address, tick_fn),
            Operand::Relative(offset) => {
                let ea = if offset < 0 {
                    cpu.get_pc().wrapping_sub((offset as i16).unsigned_abs())
                } else {
                    cpu.get_pc().wrapping_add(offset as u16)
                };
                if cpu.get_pc() & 0xff00 != ea & 0xff00 {
                    tick_fn();
                }
                ea
            }
        }
    }

    pub fn get(&self, cpu: &Mos6510, tick_fn: &TickFn) -> u8 {
        match *self {
            Operand::Accumulator => cpu.get_a(),
            Operand::Immediate(value) => value,
            Operand::Indirect(_) => panic!("illegal addressing mode for get: indirect"),
            Operand::Relative(_) => panic!("illegal addressing mode for get: relative"),
            _ => {
                let address = self.ea(cpu, false, tick_fn);
                cpu.read_internal(address, tick_fn)
            }
        }
    }

    pub fn set(&self, cpu: &mut Mos6510, value: u8, rmw: bool, tick_fn: &TickFn) {
        match *self {
            Operand::Accumulator => cpu.set_a(value),
            Operand::Immediate(_) => panic!("illegal addressing mode for set: immediate"),
            Operand::Indirect(_) => panic!("illegal addressing mode for set: indirect"),
            Operand::Relative(_) => panic!("illegal addressing mode for set: relative"),
            _ => {
                let address = self.ea(cpu, rmw, tick_fn);
                cpu.write_internal(address, value, tick_fn);
            }
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Operand::Accumulator => write!(f, "acc"),
            Operand::Immediate(value) => write!(f, "#{:02x}", value),
            Operand::ZeroPage(address) => write!(f, "${:02x}", address),
            Operand::ZeroPageX(address) => write!(f, "${:02x},x", address),
            Operand::ZeroPageY(address) => write!(f, "${:02x},y", address),
            Operand::Absolute(address) => write!(f, "${:04x}", address),
            Operand::AbsoluteX(address) => write!(f, "${:04x},x", address),
            Operand::AbsoluteY(address) => write!(f, "${:04x},y", address),
            Operand::IndirectX(address) => write!(f, "(${:02x},x)", address),
            Operand::IndirectY(address) => write!(f, "(${:02x}),y", address),
            Operand::Indirect(address) => write!(f, "(${:04x})", address),
            Operand::Relative(offset) => write!(f, "${:02x}", offset),
        }
    }
}
