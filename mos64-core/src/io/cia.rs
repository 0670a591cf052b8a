// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;
use log::log_enabled;
use std::rc::Rc;

use crate::traits::Chip;
use crate::util::{IoPort, IrqLine, Shared, TodSource};

// 6526 Complex Interface Adapter. https://www.c64-wiki.com/index.php/CIA

pub mod reg {
    pub const PRA: u8 = 0x00;
    pub const PRB: u8 = 0x01;
    pub const DDRA: u8 = 0x02;
    pub const DDRB: u8 = 0x03;
    pub const TALO: u8 = 0x04;
    pub const TAHI: u8 = 0x05;
    pub const TBLO: u8 = 0x06;
    pub const TBHI: u8 = 0x07;
    pub const TODTS: u8 = 0x08;
    pub const TODSEC: u8 = 0x09;
    pub const TODMIN: u8 = 0x0a;
    pub const TODHR: u8 = 0x0b;
    pub const SDR: u8 = 0x0c;
    pub const ICR: u8 = 0x0d;
    pub const CRA: u8 = 0x0e;
    pub const CRB: u8 = 0x0f;
}

#[derive(Clone, Copy, PartialEq)]
pub enum Mode {
    Cia1 = 0,
    Cia2 = 1,
}

impl Mode {
    fn irq_source(self) -> usize {
        self as usize
    }
}

/// ICR status/mask register. Every timer underflow sets its status bit regardless of
/// masking; an IRQ is only raised when the corresponding mask bit is also set.
struct IrqControl {
    data: u8,
    mask: u8,
}

impl IrqControl {
    fn new() -> Self {
        Self { data: 0, mask: 0 }
    }

    fn reset(&mut self) {
        self.data = 0;
        self.mask = 0;
    }

    fn set_event(&mut self, bit: usize) {
        self.data.set_bit(bit, true);
    }

    fn is_triggered(&self) -> bool {
        self.data & self.mask & 0x1f != 0
    }

    fn get_data(&self) -> u8 {
        let mut result = self.data & 0x1f;
        result.set_bit(7, self.is_triggered());
        result
    }

    fn update_mask(&mut self, value: u8) {
        if value.get_bit(7) {
            self.mask |= value & 0x1f;
        } else {
            self.mask &= !(value & 0x1f);
        }
    }

    fn clear(&mut self) {
        self.data = 0;
    }
}

#[derive(Clone, Copy, PartialEq)]
enum TimerInput {
    SystemClock,
    CascadedUnderflow,
}

/// One of the CIA's two 16-bit down counters. Counts system clock cycles (or, for timer B
/// in cascade mode, timer A's underflow pulses), reloading from its latch on underflow.
struct Timer {
    latch: u16,
    counter: u16,
    running: bool,
    one_shot: bool,
    input: TimerInput,
    pb_on: bool,
    pb_toggle: bool,
    pb_output: bool,
    underflowed: bool,
}

impl Timer {
    fn new() -> Self {
        Self {
            latch: 0xffff,
            counter: 0xffff,
            running: false,
            one_shot: false,
            input: TimerInput::SystemClock,
            pb_on: false,
            pb_toggle: false,
            pb_output: false,
            underflowed: false,
        }
    }

    fn reset(&mut self) {
        *self = Timer::new();
    }

    /// Advances the timer by one cycle of its configured input. `cascade_pulse` is timer A's
    /// underflow-this-cycle signal, relevant only to timer B in cascade mode. Returns whether
    /// this timer underflowed on this cycle.
    fn clock(&mut self, cascade_pulse: bool) -> bool {
        self.underflowed = false;
        if !self.running {
            return false;
        }
        let counts = match self.input {
            TimerInput::SystemClock => true,
            TimerInput::CascadedUnderflow => cascade_pulse,
        };
        if !counts {
            return false;
        }
        if self.counter == 0 {
            self.counter = self.latch;
            self.underflowed = true;
            if self.pb_on {
                self.pb_output = if self.pb_toggle { !self.pb_output } else { true };
            }
            if self.one_shot {
                self.running = false;
            }
        } else {
            self.counter -= 1;
        }
        self.underflowed
    }

    fn set_latch_lo(&mut self, value: u8) {
        self.latch = (self.latch & 0xff00) | value as u16;
    }

    fn set_latch_hi(&mut self, value: u8) {
        self.latch = (self.latch & 0x00ff) | ((value as u16) << 8);
        if !self.running {
            self.counter = self.latch;
        }
    }

    fn get_counter_lo(&self) -> u8 {
        (self.counter & 0xff) as u8
    }

    fn get_counter_hi(&self) -> u8 {
        ((self.counter >> 8) & 0xff) as u8
    }

    fn get_config(&self) -> u8 {
        let mut config = 0u8;
        config.set_bit(0, self.running);
        config.set_bit(1, self.pb_on);
        config.set_bit(2, self.pb_toggle);
        config.set_bit(3, self.one_shot);
        config.set_bit(5, self.input == TimerInput::CascadedUnderflow);
        config
    }

    fn set_config(&mut self, value: u8) {
        self.running = value.get_bit(0);
        self.pb_on = value.get_bit(1);
        self.pb_toggle = value.get_bit(2);
        self.one_shot = value.get_bit(3);
        if value.get_bit(4) {
            self.counter = self.latch;
        }
        self.input = if value.get_bit(5) {
            TimerInput::CascadedUnderflow
        } else {
            TimerInput::SystemClock
        };
    }
}

fn to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

fn from_bcd(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0f)
}

/// TOD fields as exposed through the CIA's four TOD registers: tenths, seconds, minutes,
/// 12-hour hours-with-PM-flag.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
struct TodFields {
    tenth: u8,
    seconds: u8,
    minutes: u8,
    hours: u8,
    pm: bool,
}

impl TodFields {
    fn from_tenths(mut total_tenths: u32) -> Self {
        let tenth = (total_tenths % 10) as u8;
        total_tenths /= 10;
        let seconds = (total_tenths % 60) as u8;
        total_tenths /= 60;
        let minutes = (total_tenths % 60) as u8;
        total_tenths /= 60;
        let mut hours = (total_tenths % 12) as u8;
        let pm = (total_tenths % 24) >= 12;
        if hours == 0 {
            hours = 12;
        }
        Self {
            tenth,
            seconds,
            minutes,
            hours,
            pm,
        }
    }
}

pub struct Cia {
    mode: Mode,
    irq_control: IrqControl,
    timer_a: Timer,
    timer_b: Timer,
    tod_source: Rc<dyn TodSource>,
    tod_alarm: TodFields,
    tod_set_alarm: bool,
    tod_halted: bool,
    irq_line: Shared<IrqLine>,
    port_a: Shared<IoPort>,
    port_b: Shared<IoPort>,
}

impl Cia {
    pub fn new(
        mode: Mode,
        port_a: Shared<IoPort>,
        port_b: Shared<IoPort>,
        irq_line: Shared<IrqLine>,
        tod_source: Rc<dyn TodSource>,
    ) -> Self {
        Self {
            mode,
            irq_control: IrqControl::new(),
            timer_a: Timer::new(),
            timer_b: Timer::new(),
            tod_source,
            tod_alarm: TodFields::default(),
            tod_set_alarm: false,
            tod_halted: false,
            irq_line,
            port_a,
            port_b,
        }
    }

    fn current_tod(&self) -> TodFields {
        TodFields::from_tenths(self.tod_source.tenths_since_midnight())
    }
}

impl Chip for Cia {
    fn clock(&mut self) {
        let timer_a_underflow = self.timer_a.clock(false);
        let timer_b_underflow = self.timer_b.clock(timer_a_underflow);

        let mut irq_event = false;
        if timer_a_underflow {
            self.irq_control.set_event(0);
            irq_event = true;
        }
        if timer_b_underflow {
            self.irq_control.set_event(1);
            irq_event = true;
        }
        if self.tod_set_alarm && !self.tod_halted && self.current_tod() == self.tod_alarm {
            self.irq_control.set_event(2);
            irq_event = true;
        }
        if irq_event && self.irq_control.is_triggered() {
            self.irq_line
                .borrow_mut()
                .set_low(self.mode.irq_source(), true);
        }
    }

    fn reset(&mut self) {
        self.irq_control.reset();
        self.timer_a.reset();
        self.timer_b.reset();
        self.tod_set_alarm = false;
        self.tod_halted = false;
        self.tod_alarm = TodFields::default();
        self.port_a.borrow_mut().reset();
        self.port_b.borrow_mut().reset();
        self.irq_line
            .borrow_mut()
            .set_low(self.mode.irq_source(), false);
    }

    fn read(&mut self, reg: u8) -> u8 {
        let value = match reg {
            reg::PRA => self.port_a.borrow().get_value(),
            reg::PRB => {
                let mut result = self.port_b.borrow().get_value();
                if self.timer_a.pb_on {
                    result.set_bit(6, self.timer_a.pb_output);
                }
                if self.timer_b.pb_on {
                    result.set_bit(7, self.timer_b.pb_output);
                }
                result
            }
            reg::DDRA => self.port_a.borrow().get_direction(),
            reg::DDRB => self.port_b.borrow().get_direction(),
            reg::TALO => self.timer_a.get_counter_lo(),
            reg::TAHI => self.timer_a.get_counter_hi(),
            reg::TBLO => self.timer_b.get_counter_lo(),
            reg::TBHI => self.timer_b.get_counter_hi(),
            reg::TODTS => {
                self.tod_halted = false;
                to_bcd(self.current_tod().tenth)
            }
            reg::TODSEC => to_bcd(self.current_tod().seconds),
            reg::TODMIN => to_bcd(self.current_tod().minutes),
            reg::TODHR => {
                self.tod_halted = true;
                let tod = self.current_tod();
                let mut result = to_bcd(tod.hours);
                result.set_bit(7, tod.pm);
                result
            }
            reg::SDR => 0,
            reg::ICR => {
                let data = self.irq_control.get_data();
                self.irq_control.clear();
                self.irq_line
                    .borrow_mut()
                    .set_low(self.mode.irq_source(), false);
                data
            }
            reg::CRA => self.timer_a.get_config(),
            reg::CRB => {
                let mut config = self.timer_b.get_config();
                config.set_bit(7, self.tod_set_alarm);
                config
            }
            _ => panic!("invalid cia register {}", reg),
        };
        if log_enabled!(log::Level::Trace) {
            log::trace!("cia reg read 0x{:02x} = 0x{:02x}", reg, value);
        }
        value
    }

    fn write(&mut self, reg: u8, value: u8) {
        if log_enabled!(log::Level::Trace) {
            log::trace!("cia reg write 0x{:02x} = 0x{:02x}", reg, value);
        }
        match reg {
            reg::PRA => self.port_a.borrow_mut().set_value(value),
            reg::PRB => self.port_b.borrow_mut().set_value(value),
            reg::DDRA => self.port_a.borrow_mut().set_direction(value),
            reg::DDRB => self.port_b.borrow_mut().set_direction(value),
            reg::TALO => self.timer_a.set_latch_lo(value),
            reg::TAHI => self.timer_a.set_latch_hi(value),
            reg::TBLO => self.timer_b.set_latch_lo(value),
            reg::TBHI => self.timer_b.set_latch_hi(value),
            reg::TODTS => {
                if self.tod_set_alarm {
                    self.tod_alarm.tenth = from_bcd(value & 0x0f);
                }
            }
            reg::TODSEC => {
                if self.tod_set_alarm {
                    self.tod_alarm.seconds = from_bcd(value & 0x7f);
                }
            }
            reg::TODMIN => {
                if self.tod_set_alarm {
                    self.tod_alarm.minutes = from_bcd(value & 0x7f);
                }
            }
            reg::TODHR => {
                if self.tod_set_alarm {
                    self.tod_alarm.hours = from_bcd(value & 0x7f);
                    self.tod_alarm.pm = value.get_bit(7);
                }
            }
            reg::SDR => {}
            reg::ICR => {
                self.irq_control.update_mask(value);
                if self.irq_control.is_triggered() {
                    self.irq_line
                        .borrow_mut()
                        .set_low(self.mode.irq_source(), true);
                }
            }
            reg::CRA => self.timer_a.set_config(value),
            reg::CRB => {
                self.timer_b.set_config(value);
                self.tod_set_alarm = value.get_bit(7);
            }
            _ => panic!("invalid cia register {}", reg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{new_shared, IoPort, IrqLine, SystemTod};

    fn setup_cia() -> Cia {
        let port_a = new_shared(IoPort::new(0x00, 0xff));
        let port_b = new_shared(IoPort::new(0x00, 0xff));
        let irq_line = new_shared(IrqLine::new("irq"));
        let tod: Rc<dyn TodSource> = Rc::new(SystemTod::new());
        let mut cia = Cia::new(Mode::Cia1, port_a, port_b, irq_line, tod);
        cia.reset();
        cia
    }

    #[test]
    fn read_regs_after_reset() {
        let mut cia = setup_cia();
        assert_eq!(0xff, cia.read(reg::PRA));
        assert_eq!(0x00, cia.read(reg::DDRA));
        assert_eq!(0xff, cia.read(reg::TALO));
        assert_eq!(0xff, cia.read(reg::TAHI));
        assert_eq!(0x00, cia.read(reg::ICR));
    }

    #[test]
    fn timer_a_underflow_sets_status_even_when_masked() {
        let mut cia = setup_cia();
        cia.write(reg::TALO, 0x01);
        cia.write(reg::TAHI, 0x00);
        cia.write(reg::CRA, 0b0000_0001);
        cia.clock();
        cia.clock();
        assert_eq!(0x01, cia.read(reg::ICR) & 0x01);
    }

    #[test]
    fn timer_a_irq_fires_only_when_masked() {
        let mut cia = setup_cia();
        cia.write(reg::TALO, 0x01);
        cia.write(reg::TAHI, 0x00);
        cia.write(reg::ICR, 0x81);
        cia.write(reg::CRA, 0b0000_0001);
        cia.clock();
        cia.clock();
        assert!(cia.irq_line.borrow().is_low());
    }

    #[test]
    fn cascaded_timer_b_counts_timer_a_underflows() {
        let mut cia = setup_cia();
        cia.write(reg::TALO, 0x01);
        cia.write(reg::TAHI, 0x00);
        cia.write(reg::TBLO, 0x02);
        cia.write(reg::TBHI, 0x00);
        cia.write(reg::CRB, 0b0010_0001);
        cia.write(reg::CRA, 0b0000_0001);
        cia.clock();
        assert_eq!(2, cia.timer_b.get_counter_lo());
        cia.clock();
        assert_eq!(1, cia.timer_b.get_counter_lo());
    }

    #[test]
    fn icr_read_clears_status_and_irq() {
        let mut cia = setup_cia();
        cia.write(reg::TALO, 0x01);
        cia.write(reg::TAHI, 0x00);
        cia.write(reg::ICR, 0x81);
        cia.write(reg::CRA, 0b0000_0001);
        cia.clock();
        cia.clock();
        assert!(cia.irq_line.borrow().is_low());
        cia.read(reg::ICR);
        assert!(!cia.irq_line.borrow().is_low());
        assert_eq!(0x00, cia.read(reg::ICR));
    }
}
