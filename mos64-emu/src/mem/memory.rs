// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use mos64_core::traits::{Addressable, Bank, Mmu};
use mos64_core::util::{new_shared, IoPort, Ram, Shared};

use super::device_io::DeviceIo;
use super::pla::Pla;

/// The C64 address space: a 64 KiB RAM array, a 64 KiB "ROM shadow" holding the BASIC,
/// character and KERNAL images at their fixed load addresses, and the I/O window. Which of
/// the three backs a given address is resolved per-access by the `Pla`, driven by the
/// processor port's bank-select bits.
///
/// Addresses 0x0000/0x0001 are not handled here; the CPU's own `IoPort` answers those directly,
/// and only notifies this fabric of bank changes through the observer wired in `new`.
pub struct Memory {
    pla: Shared<Pla>,
    ram: Ram,
    rom_shadow: Ram,
    device_io: DeviceIo,
}

impl Memory {
    pub fn new(io_port: &Shared<IoPort>, device_io: DeviceIo) -> Self {
        let pla = new_shared(Pla::new());
        let pla_observer = pla.clone();
        io_port
            .borrow_mut()
            .set_observer(Box::new(move |value| pla_observer.borrow_mut().switch_banks(value)));
        let mut ram = Ram::new(0x10000);
        let mut rom_shadow = Ram::new(0x10000);
        // 0x00 is the BRK opcode; fill unloaded memory with 0xff instead of leaving it
        // zeroed so a program that strays into unmapped space doesn't BRK-storm.
        ram.fill(0xff);
        rom_shadow.fill(0xff);
        Self {
            pla,
            ram,
            rom_shadow,
            device_io,
        }
    }

    /// Loads a flat ROM image into the shadow array starting at `offset`, as BASIC/character/
    /// KERNAL loading does at startup. Does not affect the live RAM array.
    pub fn load_rom(&mut self, data: &[u8], offset: u16) {
        self.rom_shadow.load(data, offset);
    }

    pub fn load_ram(&mut self, data: &[u8], offset: u16) {
        self.ram.load(data, offset);
    }

    /// Bypasses bank switching entirely; used for PRG loading and BASIC pointer patching,
    /// which always target physical RAM regardless of the current bank configuration.
    pub fn write_direct(&mut self, address: u16, value: u8) {
        self.ram.write(address, value);
    }

    pub fn read_direct(&self, address: u16) -> u8 {
        self.ram.read(address)
    }
}

impl Addressable for Memory {
    fn read(&self, address: u16) -> u8 {
        match self.pla.borrow().map(address) {
            Bank::Ram => self.ram.read(address),
            Bank::Basic | Bank::Charset | Bank::Kernal => self.rom_shadow.read(address),
            Bank::Io => self.device_io.read(address),
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match self.pla.borrow().map(address) {
            Bank::Io => self.device_io.write(address, value),
            Bank::Ram | Bank::Basic | Bank::Charset | Bank::Kernal => self.ram.write(address, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::color_ram::ColorRam;
    use crate::video::Vic;
    use mos64_core::io::Cia;
    use mos64_core::util::{new_shared, IrqLine, SystemTod};
    use std::rc::Rc;

    fn setup() -> (Memory, Shared<IoPort>) {
        let cia1 = new_shared(Cia::new(
            mos64_core::io::CiaMode::Cia1,
            new_shared(IoPort::new(0, 0xff)),
            new_shared(IoPort::new(0, 0xff)),
            new_shared(IrqLine::new("cia1_irq")),
            Rc::new(SystemTod::default()),
        ));
        let cia2 = new_shared(Cia::new(
            mos64_core::io::CiaMode::Cia2,
            new_shared(IoPort::new(0, 0xff)),
            new_shared(IoPort::new(0, 0xff)),
            new_shared(IrqLine::new("cia2_irq")),
            Rc::new(SystemTod::default()),
        ));
        let color_ram = new_shared(ColorRam::new());
        let vic = new_shared(Vic::new(new_shared(IrqLine::new("vic_irq"))));
        let device_io = DeviceIo::new(cia1, cia2, color_ram, vic);
        let io_port = new_shared(IoPort::new(0x2f, 0xff));
        let mem = Memory::new(&io_port, device_io);
        (mem, io_port)
    }

    #[test]
    fn defaults_to_ram_everywhere() {
        let (mut mem, _io_port) = setup();
        mem.write(0xa000, 0x42);
        assert_eq!(0x42, mem.read(0xa000));
    }

    #[test]
    fn switch_banks_exposes_basic_rom_read_only_to_writes() {
        let (mut mem, io_port) = setup();
        mem.load_rom(&[0x94, 0x20], 0xa000);
        io_port.borrow_mut().set_value(0b0010_1111);
        assert_eq!(0x94, mem.read(0xa000));

        mem.write(0xa000, 0xff);
        io_port.borrow_mut().set_value(0x00);
        assert_eq!(0xff, mem.read(0xa000));
    }

    #[test]
    fn io_window_reaches_device_io() {
        let (mut mem, io_port) = setup();
        io_port.borrow_mut().set_value(0b0010_1111);
        mem.write(0xd800, 0xff);
        assert_eq!(0x0f, mem.read(0xd800));
    }
}
