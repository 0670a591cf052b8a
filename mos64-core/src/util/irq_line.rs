// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;
use log::log_enabled;

/// A shared interrupt request line. Multiple sources (identified by a small integer index)
/// can assert or clear their own bit; the line is "low" (asserted) while any source bit is set.
///
/// Used for both the CPU's level-triggered IRQ input (CIA #1, VIC-II) and its edge-triggered
/// NMI input (CIA #2): the CPU treats a transition of `is_low()` from false to true as the edge.
pub struct IrqLine {
    kind: &'static str,
    signal: u8,
}

impl IrqLine {
    pub fn new(kind: &'static str) -> Self {
        Self { kind, signal: 0 }
    }

    pub fn is_low(&self) -> bool {
        self.signal != 0
    }

    pub fn reset(&mut self) {
        self.signal = 0;
    }

    pub fn set_low(&mut self, source: usize, value: bool) {
        if log_enabled!(log::Level::Trace) {
            log::trace!(
                "{}.{} {}",
                self.kind,
                source,
                if value { "set" } else { "cleared" }
            );
        }
        self.signal.set_bit(source, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_while_any_source_set() {
        let mut line = IrqLine::new("irq");
        assert!(!line.is_low());
        line.set_low(0, true);
        assert!(line.is_low());
        line.set_low(1, true);
        line.set_low(0, false);
        assert!(line.is_low());
        line.set_low(1, false);
        assert!(!line.is_low());
    }
}
