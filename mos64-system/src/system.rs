// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;

use mos64_core::io::{Cia, CiaMode};
use mos64_core::traits::{Addressable, Chip, Cpu as CpuTrait, TickFn};
use mos64_core::util::{new_shared, Clock, IoPort, IrqLine, Pin, Shared, SystemTod};
use mos64_core::Mos6510;
use mos64_emu::bus::{SerialBus, SerialDevice};
use mos64_emu::device::Disk;
use mos64_emu::mem::{ColorRam, DeviceIo, Memory};
use mos64_emu::video::Vic;

use crate::config::SystemModel;

const BASIC_BASE: u16 = 0xa000;
const CHARSET_BASE: u16 = 0xd000;
const KERNAL_BASE: u16 = 0xe000;
const BOOT_COMPLETE_PC: u16 = 0xa65c;
const DEFAULT_DISK_DEVICE: u8 = 8;

/// ROM images to install at boot. Each is copied into the shadow ROM array at its fixed
/// load address; none of the three is required, but an unpopulated KERNAL means the reset
/// vector reads back 0xffff and the CPU starts executing whatever that maps to.
pub struct RomImages<'a> {
    pub basic: &'a [u8],
    pub charset: &'a [u8],
    pub kernal: &'a [u8],
}

/// A PRG payload staged for the autostart sequence: mounted into RAM at build time, then
/// "typed" into the keyboard buffer once the KERNAL's boot sequence reaches its completion
/// vector so BASIC sees a RUN command exactly as if a user had typed it.
pub struct Autostart {
    image: mos64_loader::PrgImage,
}

impl Autostart {
    pub fn new(image: mos64_loader::PrgImage) -> Self {
        Self { image }
    }
}

/// Wires together the CPU, both CIAs, the minimal VIC-II, the bank-switched memory fabric
/// and the IEC serial bus into one steppable machine, and drives the tick scheduler
/// described for this engine: each CPU cycle clocks both CIAs and the VIC-II once, and the
/// serial bus runs once per instruction.
pub struct System {
    model: SystemModel,
    cpu: Mos6510,
    memory: Shared<Memory>,
    cia1: Shared<Cia>,
    cia2: Shared<Cia>,
    vic: Shared<Vic>,
    cia2_port_a: Shared<IoPort>,
    serial_bus: SerialBus,
    disk: Shared<Disk>,
    clock: Rc<Clock>,
    irq_line: Shared<IrqLine>,
    nmi_line: Shared<IrqLine>,
    tick_fn: TickFn,
    debug_break: Arc<AtomicBool>,
    autostart: Option<Autostart>,
    last_pc: u16,
}

impl System {
    pub fn build(model: SystemModel, roms: RomImages) -> Self {
        info!(target: "system", "building machine");

        let ba_line = new_shared(Pin::new_high());
        let cpu_io_port = new_shared(IoPort::new(0x00, 0xff));
        let irq_line = new_shared(IrqLine::new("irq"));
        let nmi_line = new_shared(IrqLine::new("nmi"));

        let cia1_port_a = new_shared(IoPort::new(0x00, 0xff));
        let cia1_port_b = new_shared(IoPort::new(0x00, 0xff));
        let cia2_port_a = new_shared(IoPort::new(0x00, 0xff));
        let cia2_port_b = new_shared(IoPort::new(0x00, 0xff));

        let cia1 = new_shared(Cia::new(
            CiaMode::Cia1,
            cia1_port_a,
            cia1_port_b,
            irq_line.clone(),
            Rc::new(SystemTod::new()),
        ));
        let cia2 = new_shared(Cia::new(
            CiaMode::Cia2,
            cia2_port_a.clone(),
            cia2_port_b,
            nmi_line.clone(),
            Rc::new(SystemTod::new()),
        ));
        let color_ram = new_shared(ColorRam::new());
        let vic = new_shared(Vic::new(irq_line.clone()));

        let device_io = DeviceIo::new(cia1.clone(), cia2.clone(), color_ram, vic.clone());
        let memory = new_shared(Memory::new(&cpu_io_port, device_io));
        memory.borrow_mut().load_rom(roms.basic, BASIC_BASE);
        memory.borrow_mut().load_rom(roms.charset, CHARSET_BASE);
        memory.borrow_mut().load_rom(roms.kernal, KERNAL_BASE);

        let mem_dyn: Shared<dyn Addressable> = memory.clone();
        let cpu = Mos6510::new(mem_dyn, cpu_io_port, ba_line, irq_line.clone(), nmi_line.clone());

        let clock = Rc::new(Clock::new());
        let tick_fn: TickFn = {
            let cia1 = cia1.clone();
            let cia2 = cia2.clone();
            let vic = vic.clone();
            let clock = clock.clone();
            Rc::new(move || {
                cia1.borrow_mut().clock();
                cia2.borrow_mut().clock();
                vic.borrow_mut().clock();
                clock.tick();
            })
        };

        let serial_bus = SerialBus::new();
        let disk = new_shared(Disk::new());

        let mut system = Self {
            model,
            cpu,
            memory,
            cia1,
            cia2,
            vic,
            cia2_port_a,
            serial_bus,
            disk,
            clock,
            irq_line,
            nmi_line,
            tick_fn,
            debug_break: Arc::new(AtomicBool::new(false)),
            autostart: None,
            last_pc: 0,
        };
        system.serial_bus.attach(
            DEFAULT_DISK_DEVICE,
            system.disk.clone() as Shared<dyn SerialDevice>,
        );
        system
    }

    pub fn model(&self) -> SystemModel {
        self.model
    }

    pub fn cycles(&self) -> u64 {
        self.clock.get()
    }

    pub fn debug_break_flag(&self) -> Arc<AtomicBool> {
        self.debug_break.clone()
    }

    pub fn is_break_pending(&self) -> bool {
        self.debug_break.load(Ordering::Relaxed)
    }

    /// Whether the CPU's level-triggered IRQ input is currently asserted by CIA #1 or the
    /// VIC-II's raster-compare interrupt — exposed for a front end inspecting machine state.
    pub fn irq_pending(&self) -> bool {
        self.irq_line.borrow().is_low()
    }

    /// Whether the CPU's edge-triggered NMI input is currently asserted by CIA #2.
    pub fn nmi_pending(&self) -> bool {
        self.nmi_line.borrow().is_low()
    }

    pub fn cpu(&self) -> &Mos6510 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Mos6510 {
        &mut self.cpu
    }

    /// A single bank-aware memory access outside of instruction execution, as a monitor or
    /// debugger front end would use to peek or poke a register or memory cell.
    pub fn read(&self, address: u16) -> u8 {
        self.cpu.read(address)
    }

    pub fn write(&mut self, address: u16, value: u8) {
        self.cpu.write(address, value);
    }

    pub fn reset(&mut self) {
        info!(target: "system", "resetting machine");
        self.cpu.reset();
        self.cia1.borrow_mut().reset();
        self.cia2.borrow_mut().reset();
        self.vic.borrow_mut().reset();
        self.last_pc = 0;
    }

    /// Arms the autostart sequence: once the KERNAL's boot routine reaches its completion
    /// vector, the program is mounted into RAM, its basic pointers patched, and a RUN
    /// command typed into the keyboard buffer, exactly as `PrgImage::autostart` does.
    pub fn mount_prg(&mut self, image: mos64_loader::PrgImage) {
        self.autostart = Some(Autostart::new(image));
    }

    /// Loads a D64 image into the disk attached at device 8.
    pub fn mount_disk(&mut self, data: &[u8]) {
        self.disk.borrow_mut().load(data);
    }

    /// Runs one CPU instruction, clocking both CIAs and the VIC-II once per elapsed cycle
    /// and the serial bus once, and returns the number of cycles the instruction consumed.
    pub fn step(&mut self) -> u32 {
        self.last_pc = self.cpu.get_pc();
        let cycles = self.cpu.step(&self.tick_fn);
        self.serial_bus.execute(&self.cia2_port_a);
        if let Some(autostart) = self.autostart.take() {
            if self.cpu.get_pc() == BOOT_COMPLETE_PC {
                autostart.image.autostart(&mut self.memory.borrow_mut());
            } else {
                self.autostart = Some(autostart);
            }
        }
        cycles
    }

    /// True once the instruction just executed left the PC unchanged, the classic signature
    /// of a CPU trapped in a single-instruction loop (e.g. `JMP *`).
    pub fn is_jammed(&self) -> bool {
        self.last_pc == self.cpu.get_pc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build() -> System {
        System::build(SystemModel::Pal, RomImages { basic: &[], charset: &[], kernal: &[] })
    }

    #[test]
    fn reset_clears_irq_and_nmi_lines() {
        let mut system = build();
        system.reset();
        assert!(!system.irq_line.borrow().is_low());
        assert!(!system.nmi_line.borrow().is_low());
    }

    #[test]
    fn step_advances_clock_by_instruction_cycles() {
        let mut system = build();
        system.reset();
        system.cpu_mut().set_pc(0x0800);
        // LDA #$01 ; NOP
        system.memory.borrow_mut().write_direct(0x0800, 0xa9);
        system.memory.borrow_mut().write_direct(0x0801, 0x01);
        let before = system.cycles();
        let cycles = system.step();
        assert_eq!(2, cycles);
        assert_eq!(before + 2, system.cycles());
    }

    #[test]
    fn disk_attaches_at_device_eight() {
        let system = build();
        assert_eq!(0, system.serial_bus.trace_len());
    }
}
