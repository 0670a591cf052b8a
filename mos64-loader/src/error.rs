// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("PRG image at {0} is missing its 2-byte load address")]
    TruncatedPrg(PathBuf),
}
