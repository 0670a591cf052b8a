// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

mod cia;

pub use cia::{reg as cia_reg, Cia, Mode as CiaMode};
