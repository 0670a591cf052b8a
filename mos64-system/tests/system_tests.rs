// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use mos64_core::traits::Cpu;
use mos64_system::{RomImages, System, SystemModel};

fn nop_machine() -> System {
    let mut system = System::build(
        SystemModel::Pal,
        RomImages {
            basic: &[],
            charset: &[],
            kernal: &[],
        },
    );
    system.reset();
    system.cpu_mut().set_pc(0x0800);
    for addr in 0x0800u16..0x0810 {
        system.write(addr, 0xea); // NOP
    }
    system
}

#[test]
fn bank_switch_hides_and_reveals_kernal_rom() {
    let mut system = System::build(
        SystemModel::Pal,
        RomImages {
            basic: &[],
            charset: &[],
            kernal: &[0xaa; 0x2000],
        },
    );
    system.reset();
    assert_eq!(0xaa, system.read(0xe000));

    system.write(0x0000, 0xff);
    system.write(0x0001, 0x00);
    assert_eq!(0xff, system.read(0xe000));
}

#[test]
fn cia1_cascaded_timer_raises_irq_once_unmasked() {
    let mut system = nop_machine();

    system.write(0xdc04, 0x02); // timer A latch lo
    system.write(0xdc05, 0x00); // timer A latch hi
    system.write(0xdc0d, 0x81); // unmask timer A underflow in ICR
    system.write(0xdc0e, 0b0000_0001); // start timer A, system clock input, continuous

    for _ in 0..3 {
        system.step();
    }

    assert!(system.irq_pending());
    assert_eq!(0x01, system.read(0xdc0d) & 0x01);
}

#[test]
fn disk_mount_accepts_a_full_size_image() {
    let mut system = nop_machine();
    let image = vec![0u8; 683 * 256];
    // An all-zero image has no populated directory sector, but mounting must not panic and
    // leaves the serial bus ready to handshake against device 8.
    system.mount_disk(&image);
}

#[test]
fn prg_autostart_arms_until_boot_completes() {
    let mut system = nop_machine();
    let path = std::env::temp_dir().join("mos64_system_test_autostart.prg");
    std::fs::write(&path, [0x00, 0x40, 0x42]).unwrap();

    let prg = mos64_loader::PrgImage::load(&path).unwrap();
    system.mount_prg(prg);
    // The program isn't mounted into RAM until the boot-complete PC is reached, so a plain
    // NOP machine running a few steps away from that vector leaves it untouched.
    for _ in 0..3 {
        system.step();
    }
    assert_eq!(0xff, system.read(0x4000));

    std::fs::remove_file(&path).unwrap();
}
