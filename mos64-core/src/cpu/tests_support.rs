// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use crate::traits::Addressable;
use crate::util::{new_shared, IoPort, IrqLine, Pin, Ram, Shared};

use super::Mos6510;

/// Builds a `Mos6510` wired to a flat 64k RAM bank and fresh port/line state, for use by
/// CPU unit tests that don't need the real bank-switched memory fabric.
pub fn setup_cpu() -> Mos6510 {
    let mem: Shared<dyn Addressable> = new_shared(Ram::new(0x10000));
    let io_port = new_shared(IoPort::new(0x2f, 0xff));
    let ba_line = new_shared(Pin::new_high());
    let irq_line = new_shared(IrqLine::new("irq"));
    let nmi_line = new_shared(IrqLine::new("nmi"));
    Mos6510::new(mem, io_port, ba_line, irq_line, nmi_line)
}
