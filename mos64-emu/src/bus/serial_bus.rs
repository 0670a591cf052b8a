// This file is part of mos64.
// Copyright (c) 2026 mos64 contributors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::collections::VecDeque;

use bit_field::BitField;

use mos64_core::util::{IoPort, Shared};

const DEVICE_MAX: usize = 31;

const ATN_OUT: usize = 3;
const CLOCK_OUT: usize = 4;
const DATA_OUT: usize = 5;
const CLOCK_IN: usize = 6;
const DATA_IN: usize = 7;

const EOI_RESPONSE_TIME: u32 = 300;
const EOI_RESPONSE_HOLD_TIME: u32 = 100;
const WORKAROUND_TIME: u32 = 500;
const TALKER_BECOME_ACK_TIME: u32 = 100;
const TALKER_BIT_TIME: u32 = 30;

const TRACE_CAPACITY: usize = 128;

/// Returned by `SerialDevice::write` when the device rejects a byte (e.g. an unmatched
/// filename at OPEN time), surfaced to the talker as a file-not-found abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceError;

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "serial device rejected the write")
    }
}

impl std::error::Error for DeviceError {}

/// A device attachable to the IEC bus. `read` returns the next byte and whether it is the
/// last byte of the current transfer; `write` delivers one byte on a channel, erring if the
/// device rejects it (surfaced to the talker as a file-not-found abort).
pub trait SerialDevice {
    fn read(&mut self) -> (u8, bool);
    fn write(&mut self, channel_no: u8, byte: u8) -> Result<(), DeviceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Workaround,
    WaitTalker,
    Ready,
    ReadBit,
    ReadDone,
    ReleaseData,
    EoiHandshake,
    TalkerBecome,
    TalkerBecomeAck,
    TalkerPrepare,
    TalkerWaitListenerReady,
    TalkerWriteBitLow,
    TalkerWriteBitHigh,
    TalkerWaitListenerAck,
    TalkerEoiWaitLow,
    TalkerEoiWaitHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Idle,
    Listen,
    Talk,
    Write,
}

/// A bounded history of line/state transitions, for debugger/test inspection.
#[derive(Debug, Clone, Copy)]
pub struct TraceEntry {
    pub data: bool,
    pub clock: bool,
    pub atn: bool,
    pub state: State,
    pub byte: u8,
}

/// The 17-state IEC bit-level handshake, driven one transition per `execute` call from the
/// tick scheduler. DATA/CLOCK/ATN live on CIA #2 port A; `execute` loops the inverted out-bits
/// back into the in-bits the same way the real hardware wires listener and talker together.
pub struct SerialBus {
    state: State,
    control: Control,
    device_no: u8,
    channel_no: u8,
    bit_count: u8,
    byte: u8,
    hold_data: bool,
    hold_clock: bool,
    wait_cycles: u32,
    eoi_flag: bool,
    file_not_found: bool,
    devices: Vec<Option<Shared<dyn SerialDevice>>>,
    trace: VecDeque<TraceEntry>,
}

impl SerialBus {
    pub fn new() -> Self {
        let mut devices = Vec::with_capacity(DEVICE_MAX);
        devices.resize_with(DEVICE_MAX, || None);
        Self {
            state: State::Idle,
            control: Control::Idle,
            device_no: 0,
            channel_no: 0,
            bit_count: 0,
            byte: 0,
            hold_data: true,
            hold_clock: false,
            wait_cycles: 0,
            eoi_flag: false,
            file_not_found: false,
            devices,
            trace: VecDeque::with_capacity(TRACE_CAPACITY),
        }
    }

    pub fn attach(&mut self, device_no: u8, device: Shared<dyn SerialDevice>) {
        self.devices[device_no as usize] = Some(device);
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn control(&self) -> Control {
        self.control
    }

    pub fn trace_len(&self) -> usize {
        self.trace.len()
    }

    /// Read-only inspection of the bounded transition trace, oldest entry first.
    pub fn trace_entries(&self) -> impl Iterator<Item = &TraceEntry> {
        self.trace.iter()
    }

    fn trace_add(&mut self, data: bool, clock: bool, atn: bool) {
        let changed = match self.trace.back() {
            Some(last) => last.data != data || last.clock != clock || last.atn != atn,
            None => true,
        };
        if !changed {
            return;
        }
        if self.trace.len() >= TRACE_CAPACITY {
            self.trace.pop_front();
        }
        self.trace.push_back(TraceEntry {
            data,
            clock,
            atn,
            state: self.state,
            byte: self.byte,
        });
    }

    /// One bus transition, driven off CIA #2 port A.
    pub fn execute(&mut self, port: &Shared<IoPort>) {
        let port_value = port.borrow().get_value();
        let out_data = port_value.get_bit(DATA_OUT);
        let out_clock = port_value.get_bit(CLOCK_OUT);
        let atn = port_value.get_bit(ATN_OUT);

        let data = self.hold_data || out_data;
        let clock = self.hold_clock || out_clock;

        self.trace_add(data, clock, atn);

        {
            let mut port = port.borrow_mut();
            port.set_input_bit(DATA_IN, !data);
            port.set_input_bit(CLOCK_IN, !clock);
        }

        self.step(data, clock, atn);
    }

    fn step(&mut self, data: bool, clock: bool, atn: bool) {
        match self.state {
            State::Idle => {
                if atn {
                    self.hold_data = true;
                    if !clock {
                        self.wait_cycles = 0;
                        self.state = State::Workaround;
                    } else {
                        self.state = State::WaitTalker;
                    }
                }
            }
            State::Workaround => {
                self.wait_cycles += 1;
                if self.wait_cycles > WORKAROUND_TIME {
                    self.state = State::WaitTalker;
                }
            }
            State::WaitTalker => {
                if !clock {
                    self.bit_count = 0;
                    self.byte = 0;
                    self.wait_cycles = 0;
                    self.eoi_flag = false;
                    self.hold_data = false;
                    self.state = State::Ready;
                }
            }
            State::Ready => {
                if clock {
                    self.state = State::ReadBit;
                } else if !self.eoi_flag && self.bit_count == 0 {
                    self.wait_cycles += 1;
                    if self.wait_cycles > EOI_RESPONSE_TIME {
                        self.eoi_flag = true;
                        self.hold_data = true;
                        self.state = State::EoiHandshake;
                    }
                }
            }
            State::ReadBit => {
                if !clock {
                    if !data {
                        self.byte += 1 << self.bit_count;
                    }
                    self.bit_count += 1;
                    self.state = if self.bit_count >= 8 { State::ReadDone } else { State::Ready };
                }
            }
            State::ReadDone => {
                if clock {
                    self.hold_data = true;
                    self.dispatch(atn);
                }
            }
            State::ReleaseData => {
                if !clock {
                    self.hold_data = false;
                    self.state = State::Idle;
                }
            }
            State::EoiHandshake => {
                self.wait_cycles += 1;
                if self.wait_cycles > EOI_RESPONSE_TIME + EOI_RESPONSE_HOLD_TIME {
                    self.hold_data = false;
                    self.state = State::Ready;
                }
            }
            State::TalkerBecome => {
                if !clock {
                    self.wait_cycles = 0;
                    self.hold_data = false;
                    self.hold_clock = true;
                    self.state = State::TalkerBecomeAck;
                }
            }
            State::TalkerBecomeAck => {
                self.wait_cycles += 1;
                if self.wait_cycles > TALKER_BECOME_ACK_TIME {
                    self.hold_clock = false;
                    self.state = State::TalkerPrepare;
                }
            }
            State::TalkerPrepare => self.talker_prepare(),
            State::TalkerWaitListenerReady => {
                if !data {
                    self.hold_data = true;
                    self.hold_clock = true;
                    self.state = State::TalkerWriteBitLow;
                }
            }
            State::TalkerWriteBitLow => {
                self.wait_cycles += 1;
                if self.wait_cycles > TALKER_BIT_TIME {
                    if self.bit_count >= 8 {
                        self.hold_data = false;
                        self.hold_clock = true;
                        self.state = State::TalkerWaitListenerAck;
                    } else {
                        self.hold_data = (self.byte >> self.bit_count) & 0x1 == 0;
                        self.bit_count += 1;
                        self.wait_cycles = 0;
                        self.hold_clock = false;
                        self.state = State::TalkerWriteBitHigh;
                    }
                }
            }
            State::TalkerWriteBitHigh => {
                self.wait_cycles += 1;
                if self.wait_cycles > TALKER_BIT_TIME {
                    self.hold_clock = true;
                    self.wait_cycles = 0;
                    self.state = State::TalkerWriteBitLow;
                }
            }
            State::TalkerWaitListenerAck => {
                if data {
                    self.hold_clock = false;
                    self.state = if self.eoi_flag { State::Idle } else { State::TalkerPrepare };
                }
            }
            State::TalkerEoiWaitLow => {
                if !data {
                    self.state = State::TalkerEoiWaitHigh;
                }
            }
            State::TalkerEoiWaitHigh => {
                if data {
                    self.state = State::TalkerWaitListenerReady;
                }
            }
        }
    }

    fn dispatch(&mut self, atn: bool) {
        match self.control {
            Control::Idle => {
                if (0x20..=0x3e).contains(&self.byte) {
                    self.device_no = self.byte - 0x20;
                    self.control = Control::Listen;
                } else if (0x40..=0x5e).contains(&self.byte) {
                    self.device_no = self.byte - 0x40;
                    self.control = Control::Talk;
                }
                self.state = State::WaitTalker;
            }
            Control::Listen => {
                if self.byte == 0x3f {
                    self.device_no = 0;
                    self.control = Control::Idle;
                    self.state = State::ReleaseData;
                } else if (0xe0..=0xef).contains(&self.byte) {
                    self.channel_no = 0;
                    self.state = State::WaitTalker;
                } else if self.byte >= 0xf0 {
                    self.channel_no = self.byte - 0xf0;
                    self.control = Control::Write;
                    self.state = State::WaitTalker;
                } else {
                    self.state = State::WaitTalker;
                }
            }
            Control::Talk => {
                if self.byte == 0x5f {
                    self.device_no = 0;
                    self.control = Control::Idle;
                    self.state = State::ReleaseData;
                } else if (0x60..=0x6f).contains(&self.byte) {
                    self.channel_no = self.byte - 0x60;
                    self.state = State::TalkerBecome;
                } else {
                    self.state = State::WaitTalker;
                }
            }
            Control::Write => {
                let device = self.devices[self.device_no as usize]
                    .clone()
                    .unwrap_or_else(|| panic!("device {} not attached", self.device_no));
                if atn && self.byte == 0x3f {
                    if device.borrow_mut().write(self.channel_no, 0x00).is_err() {
                        self.file_not_found = true;
                    }
                    self.device_no = 0;
                    self.control = Control::Idle;
                    self.state = State::ReleaseData;
                } else {
                    if device.borrow_mut().write(self.channel_no, self.byte).is_err() {
                        self.file_not_found = true;
                    }
                    self.state = State::WaitTalker;
                }
            }
        }
    }

    fn talker_prepare(&mut self) {
        if self.file_not_found {
            self.hold_data = false;
            self.hold_clock = false;
            self.control = Control::Idle;
            self.state = State::Idle;
            self.file_not_found = false;
            return;
        }
        self.bit_count = 0;
        let device = self.devices[self.device_no as usize]
            .clone()
            .unwrap_or_else(|| panic!("device {} not attached", self.device_no));
        let (byte, last_byte) = device.borrow_mut().read();
        self.byte = byte;
        self.wait_cycles = 0;
        if last_byte {
            self.eoi_flag = true;
            self.state = State::TalkerEoiWaitLow;
        } else {
            self.state = State::TalkerWaitListenerReady;
        }
    }
}

impl Default for SerialBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mos64_core::util::new_shared;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FakeDevice {
        written: Vec<(u8, u8)>,
    }

    impl SerialDevice for FakeDevice {
        fn read(&mut self) -> (u8, bool) {
            (0x00, true)
        }

        fn write(&mut self, channel_no: u8, byte: u8) -> Result<(), DeviceError> {
            self.written.push((channel_no, byte));
            Ok(())
        }
    }

    #[test]
    fn idle_to_wait_talker_on_atn() {
        let mut bus = SerialBus::new();
        let port = new_shared(IoPort::new(0xff, 0x00));
        port.borrow_mut().set_value(1 << 3 | 1 << 4);
        bus.execute(&port);
        assert_eq!(State::WaitTalker, bus.state());
    }

    #[test]
    fn wait_talker_to_ready_when_clock_drops() {
        let mut bus = SerialBus::new();
        let port = new_shared(IoPort::new(0xff, 0x00));
        bus.state = State::WaitTalker;
        port.borrow_mut().set_value(1 << 3); // ATN held, CLOCK dropped
        bus.execute(&port);
        assert_eq!(State::Ready, bus.state());
        assert!(!bus.hold_data);
    }

    #[test]
    fn listen_command_switches_control_mode() {
        let mut bus = SerialBus::new();
        bus.state = State::ReadDone;
        bus.byte = 0x28; // LISTEN device 8
        bus.dispatch(true);
        assert_eq!(Control::Listen, bus.control());
        assert_eq!(8, bus.device_no);
    }

    #[test]
    fn open_command_enters_write_mode() {
        let mut bus = SerialBus::new();
        bus.control = Control::Listen;
        bus.device_no = 8;
        bus.state = State::ReadDone;
        bus.byte = 0xf0; // OPEN channel 0
        bus.dispatch(true);
        assert_eq!(Control::Write, bus.control());
        assert_eq!(0, bus.channel_no);
    }

    #[test]
    fn attached_device_receives_write_dispatch() {
        let mut bus = SerialBus::new();
        let device = Rc::new(RefCell::new(FakeDevice { written: vec![] }));
        bus.attach(8, device.clone() as Shared<dyn SerialDevice>);
        bus.control = Control::Write;
        bus.device_no = 8;
        bus.channel_no = 0;
        bus.state = State::ReadDone;
        bus.byte = b'$';
        bus.dispatch(false);
        assert_eq!(vec![(0, b'$')], device.borrow().written);
        assert_eq!(State::WaitTalker, bus.state());
    }

    #[test]
    fn trace_only_records_changed_line_states() {
        let mut bus = SerialBus::new();
        let port = new_shared(IoPort::new(0xff, 0x00));
        bus.execute(&port);
        bus.execute(&port);
        assert_eq!(1, bus.trace_len());
        port.borrow_mut().set_value(1 << 3);
        bus.execute(&port);
        assert_eq!(2, bus.trace_len());
    }
}
