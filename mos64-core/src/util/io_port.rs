// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

pub type Observer = Box<dyn Fn(u8)>;

/// A bidirectional 8-bit data port with a direction register (1 = output, 0 = input),
/// as found on both the 6510's built-in port and each CIA's port A/B.
///
/// An optional observer is invoked whenever the port's externally visible value changes,
/// which is how bank-switching and VIC memory-bank recomputation are wired up without
/// the owner of the port needing to know about its side effects.
pub struct IoPort {
    direction: u8,
    input: u8,
    output: u8,
    observer: Option<Observer>,
}

impl IoPort {
    pub fn new(direction: u8, input: u8) -> Self {
        Self {
            direction,
            input,
            output: 0,
            observer: None,
        }
    }

    pub fn get_direction(&self) -> u8 {
        self.direction
    }

    pub fn get_value(&self) -> u8 {
        (self.output & self.direction) | (self.input & !self.direction)
    }

    pub fn set_direction(&mut self, direction: u8) {
        self.direction = direction;
        self.notify_observer();
    }

    pub fn set_input(&mut self, value: u8) {
        self.input = value;
        self.notify_observer();
    }

    pub fn set_input_bit(&mut self, bit: usize, value: bool) {
        self.input.set_bit(bit, value);
        self.notify_observer();
    }

    pub fn set_observer(&mut self, observer: Observer) {
        self.observer = Some(observer);
    }

    pub fn set_value(&mut self, value: u8) {
        self.output = value;
        self.notify_observer();
    }

    pub fn reset(&mut self) {
        self.direction = 0x00;
        self.input = 0xff;
        self.output = 0x00;
        self.notify_observer();
    }

    fn notify_observer(&self) {
        if let Some(ref observer) = self.observer {
            observer(self.get_value());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_mixes_input_and_output_by_direction() {
        let mut port = IoPort::new(0b0000_1111, 0b1111_0000);
        port.set_value(0b1010_1010);
        assert_eq!(0b1111_1010, port.get_value());
    }

    #[test]
    fn observer_fires_on_value_change() {
        let seen = new_shared_cell_u8();
        let seen_clone = seen.clone();
        let mut port = IoPort::new(0xff, 0x00);
        port.set_observer(Box::new(move |v| seen_clone.set(v)));
        port.set_value(0x42);
        assert_eq!(0x42, seen.get());
    }

    fn new_shared_cell_u8() -> std::rc::Rc<std::cell::Cell<u8>> {
        std::rc::Rc::new(std::cell::Cell::new(0))
    }
}
