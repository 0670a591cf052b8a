// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::fs;
use std::path::Path;

use crate::error::LoadError;

/// Fixed ROM shadow load addresses (C. 6).
pub const BASIC: u16 = 0xa000;
pub const CHARSET: u16 = 0xd000;
pub const KERNAL: u16 = 0xe000;

/// Reads a flat ROM image off disk; mounting it at its fixed offset is the caller's job
/// (`Memory::load_rom`), since the three images share one 64 KiB shadow array.
pub fn load(path: &Path) -> Result<Vec<u8>, LoadError> {
    fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_file_bytes() {
        let path = std::env::temp_dir().join("mos64_rom_test.bin");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(&[0x94, 0x20, 0xff]).unwrap();
        drop(file);

        let data = load(&path).unwrap();
        assert_eq!(vec![0x94, 0x20, 0xff], data);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = Path::new("/nonexistent/mos64-rom-does-not-exist.bin");
        assert!(load(path).is_err());
    }
}
