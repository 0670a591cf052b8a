// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::path::PathBuf;

/// The timing model the scheduler paces against. Only PAL is modeled; the variant exists
/// so the pacing constant has a named home instead of a bare literal in the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SystemModel {
    #[default]
    Pal,
}

impl SystemModel {
    /// Cycles per second the scheduler paces real-time playback against.
    pub fn cpu_frequency(self) -> u32 {
        match self {
            SystemModel::Pal => 985_248,
        }
    }
}

/// ROM image paths, gathered up front so a missing file is reported once instead of at
/// first access.
#[derive(Debug, Clone, Default)]
pub struct RomPaths {
    pub basic: PathBuf,
    pub charset: PathBuf,
    pub kernal: PathBuf,
}

/// Host-level configuration: which model to emulate, at what pace, and which images to
/// mount at startup. Built from CLI arguments; everything below this belongs to the
/// emulated machine itself.
#[derive(Debug, Clone)]
pub struct Config {
    pub model: SystemModel,
    pub roms: RomPaths,
    pub prg: Option<PathBuf>,
    pub disk: Option<PathBuf>,
    pub warp_mode: bool,
}

impl Config {
    pub fn new(roms: RomPaths) -> Self {
        Self {
            model: SystemModel::default(),
            roms,
            prg: None,
            disk: None,
            warp_mode: false,
        }
    }
}
