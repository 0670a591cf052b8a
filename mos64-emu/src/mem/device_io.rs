// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use mos64_core::io::Cia;
use mos64_core::traits::{Addressable, Chip};
use mos64_core::util::Shared;

use crate::video::Vic;

use super::color_ram::ColorRam;

/// Routes the 0xD000-0xDFFF I/O window to the chips mapped into it. SID (0xD400-0xD7FF) and
/// the expansion port window (0xDE00-0xDFFF) have no backing chip in this engine; reads
/// return 0 and writes are discarded, matching an unpopulated bus.
pub struct DeviceIo {
    cia1: Shared<Cia>,
    cia2: Shared<Cia>,
    color_ram: Shared<ColorRam>,
    vic: Shared<Vic>,
}

impl DeviceIo {
    pub fn new(cia1: Shared<Cia>, cia2: Shared<Cia>, color_ram: Shared<ColorRam>, vic: Shared<Vic>) -> Self {
        Self {
            cia1,
            cia2,
            color_ram,
            vic,
        }
    }
}

impl Addressable for DeviceIo {
    fn read(&self, address: u16) -> u8 {
        match address {
            0xd000..=0xd3ff => self.vic.borrow_mut().read((address & 0x3f) as u8),
            0xd400..=0xd7ff => 0x00,
            0xd800..=0xdbff => self.color_ram.borrow().read(address - 0xd800),
            0xdc00..=0xdcff => self.cia1.borrow_mut().read((address & 0x0f) as u8),
            0xdd00..=0xddff => self.cia2.borrow_mut().read((address & 0x0f) as u8),
            0xde00..=0xdfff => 0x00,
            _ => panic!("address 0x{:04x} is outside the I/O window", address),
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            0xd000..=0xd3ff => self.vic.borrow_mut().write((address & 0x3f) as u8, value),
            0xd400..=0xd7ff => {}
            0xd800..=0xdbff => self.color_ram.borrow_mut().write(address - 0xd800, value),
            0xdc00..=0xdcff => self.cia1.borrow_mut().write((address & 0x0f) as u8, value),
            0xdd00..=0xddff => self.cia2.borrow_mut().write((address & 0x0f) as u8, value),
            0xde00..=0xdfff => {}
            _ => panic!("address 0x{:04x} is outside the I/O window", address),
        }
    }
}
