// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::fs;
use std::path::Path;

use crate::error::LoadError;

/// Reads a raw D64 image off disk. Parsing the directory and geometry is `Disk::load`'s job;
/// this only gets the bytes off the filesystem.
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
        let path = std::env::temp_dir().join("mos64_d64_test.bin");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(&[0u8; 16]).unwrap();
        drop(file);

        let data = load(&path).unwrap();
        assert_eq!(16, data.len());
        fs::remove_file(&path).unwrap();
    }
}
