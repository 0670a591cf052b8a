// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use log::info;

use mos64_emu::mem::Memory;

use crate::error::LoadError;

const BASIC_TXTTAB: u16 = 0x2d;
const BASIC_VARTAB: u16 = 0x2f;
const BASIC_ARYTAB: u16 = 0x31;
const KEYBOARD_BUFFER: u16 = 0x0277;
const KEYBOARD_BUFFER_LEN: u16 = 0x00c6;

/// A PRG image: a two-byte little-endian load address followed by the payload.
pub struct PrgImage {
    data: Vec<u8>,
    offset: u16,
}

impl PrgImage {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        let offset = reader
            .read_u16::<LittleEndian>()
            .map_err(|_| LoadError::TruncatedPrg(path.to_path_buf()))?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(target: "loader", "loaded PRG at 0x{:04x}, {} bytes", offset, data.len());
        Ok(Self { data, offset })
    }

    pub fn offset(&self) -> u16 {
        self.offset
    }

    /// Writes the payload into RAM (with wraparound) and patches the three BASIC
    /// variable-area pointer pairs to the end address, as the KERNAL load routine does.
    pub fn mount(&self, memory: &mut Memory) {
        memory.load_ram(&self.data, self.offset);
        let end = self.offset.wrapping_add(self.data.len() as u16);
        for ptr in [BASIC_TXTTAB, BASIC_VARTAB, BASIC_ARYTAB] {
            memory.write_direct(ptr, (end & 0xff) as u8);
            memory.write_direct(ptr + 1, (end >> 8) as u8);
        }
    }

    /// Mounts the image, then queues a "RUN" by injecting it into the keyboard buffer, as if
    /// typed at the BASIC prompt.
    pub fn autostart(&self, memory: &mut Memory) {
        self.mount(memory);
        let keystrokes = [b'R', b'U', b'N', 0x0d, 0x0d];
        for (i, byte) in keystrokes.iter().enumerate() {
            memory.write_direct(KEYBOARD_BUFFER + i as u16, *byte);
        }
        memory.write_direct(KEYBOARD_BUFFER_LEN, keystrokes.len() as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mos64_core::io::{Cia, CiaMode};
    use mos64_core::util::{new_shared, IoPort, IrqLine, SystemTod};
    use mos64_emu::mem::{ColorRam, DeviceIo};
    use mos64_emu::video::Vic;
    use std::io::Write as _;
    use std::rc::Rc;

    fn setup_memory() -> (Memory, std::rc::Rc<std::cell::RefCell<IoPort>>) {
        let cia1 = new_shared(Cia::new(
            CiaMode::Cia1,
            new_shared(IoPort::new(0, 0xff)),
            new_shared(IoPort::new(0, 0xff)),
            new_shared(IrqLine::new("cia1_irq")),
            Rc::new(SystemTod::default()),
        ));
        let cia2 = new_shared(Cia::new(
            CiaMode::Cia2,
            new_shared(IoPort::new(0, 0xff)),
            new_shared(IoPort::new(0, 0xff)),
            new_shared(IrqLine::new("cia2_irq")),
            Rc::new(SystemTod::default()),
        ));
        let color_ram = new_shared(ColorRam::new());
        let vic = new_shared(Vic::new(new_shared(IrqLine::new("vic_irq"))));
        let device_io = DeviceIo::new(cia1, cia2, color_ram, vic);
        let io_port = new_shared(IoPort::new(0x2f, 0xff));
        let memory = Memory::new(&io_port, device_io);
        (memory, io_port)
    }

    fn write_prg(bytes: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("mos64_prg_test_{:p}.prg", bytes.as_ptr()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn mount_writes_payload_and_patches_basic_pointers() {
        use mos64_core::traits::Addressable;

        let path = write_prg(&[0x01, 0x08, 0xaa, 0xbb, 0xcc]);
        let image = PrgImage::load(&path).unwrap();
        assert_eq!(0x0801, image.offset());

        let (mut memory, _io_port) = setup_memory();
        image.mount(&mut memory);

        assert_eq!(0xaa, memory.read(0x0801));
        assert_eq!(0xbb, memory.read(0x0802));
        assert_eq!(0xcc, memory.read(0x0803));

        let end = 0x0801 + 3;
        assert_eq!((end & 0xff) as u8, memory.read_direct(0x2d));
        assert_eq!((end >> 8) as u8, memory.read_direct(0x2e));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn autostart_injects_run_into_keyboard_buffer() {
        let path = write_prg(&[0x00, 0xc0, 0x42]);
        let image = PrgImage::load(&path).unwrap();

        let (mut memory, _io_port) = setup_memory();
        image.autostart(&mut memory);

        assert_eq!(b'R', memory.read_direct(0x0277));
        assert_eq!(b'U', memory.read_direct(0x0278));
        assert_eq!(b'N', memory.read_direct(0x0279));
        assert_eq!(5, memory.read_direct(0x00c6));

        std::fs::remove_file(&path).unwrap();
    }
}
