//! Every register the CPU can see, in one place.

use std::rc::{Rc, Weak};

use crate::emulator::memory::{DISPLAY_START, FONT_ADDRESS, PROGRAM_START, STACK_END, STACK_START};
use crate::emulator::register::{CpuState, GraphicChange, Register, StatusType, Tribble};

pub const NUM_VARIABLES: usize = 16;
pub const STACK_SLOTS: usize = ((STACK_END - STACK_START) / 2) as usize;
pub const DECODED_WORDS: usize = 4;
pub const VF: usize = 0xF;

const VARIABLE_NAMES: [&str; NUM_VARIABLES] = [
    "V0", "V1", "V2", "V3", "V4", "V5", "V6", "V7",
    "V8", "V9", "VA", "VB", "VC", "VD", "VE", "VF",
];

pub struct RegisterFile {
    pub variables: [Register<u8>; NUM_VARIABLES],
    pub status_type: Register<StatusType>,
    pub index: Register<u16>,
    /// Address of the instruction being executed.
    pub memory_address: Tribble,
    pub program_counter: Tribble,
    pub stack: [Tribble; STACK_SLOTS],
    /// Address of the last pushed slot; `STACK_END` when empty.
    pub stack_pointer: Tribble,
    pub font_segment: Tribble,
    pub graphic_segment: Tribble,
    pub graphic_change: Register<GraphicChange>,
    /// Bit `i` set means key `i` is held.
    pub input: Register<u16>,
    /// The last key pressed.
    pub key: Register<u8>,
    pub delay_timer: Register<u8>,
    pub sound_timer: Register<u8>,
    pub sound_on: Register<bool>,
    pub instruction: Register<u16>,
    /// Opcode pattern followed by up to three parameters.
    pub decoded: [Register<u16>; DECODED_WORDS],
    pub state: Register<CpuState>,
}

impl RegisterFile {
    /// Create a zeroed register file with the sound-on flag derived from the sound timer.
    pub fn new() -> Rc<RegisterFile> {
        let registers = Rc::new(RegisterFile {
            variables: VARIABLE_NAMES.map(|name| Register::new(name, 0)),
            status_type: Register::new("status", StatusType::Empty),
            index: Register::new("I", 0),
            memory_address: Tribble::new("MAR", 0),
            program_counter: Tribble::new("PC", PROGRAM_START),
            stack: [(); STACK_SLOTS].map(|_| Tribble::new("stack", 0)),
            stack_pointer: Tribble::new("SP", STACK_END),
            font_segment: Tribble::new("font", FONT_ADDRESS),
            graphic_segment: Tribble::new("graphic", DISPLAY_START),
            graphic_change: Register::new("graphic change", GraphicChange::Idle),
            input: Register::new("input", 0),
            key: Register::new("key", 0),
            delay_timer: Register::new("DT", 0),
            sound_timer: Register::new("ST", 0),
            sound_on: Register::new("sound on", false),
            instruction: Register::new("instruction", 0),
            decoded: [(); DECODED_WORDS].map(|_| Register::new("decoded", 0)),
            state: Register::new("state", CpuState::Operating),
        });

        let weak: Weak<RegisterFile> = Rc::downgrade(&registers);
        registers.sound_timer.subscribe(move |value| {
            if let Some(registers) = weak.upgrade() {
                let on = value > 1;
                if registers.sound_on.get() != on {
                    registers.sound_on.set(on);
                }
            }
        });

        registers
    }

    pub fn v(&self, x: u8) -> u8 {
        self.variables[x as usize & 0xF].get()
    }

    pub fn set_v(&self, x: u8, value: u8) {
        self.variables[x as usize & 0xF].set(value);
    }

    pub fn vf(&self) -> u8 {
        self.variables[VF].get()
    }

    /// Set VF together with what it means.
    pub fn set_flag(&self, value: u8, status: StatusType) {
        // VF subscribers read the status back.
        self.status_type.set(status);
        self.variables[VF].set(value);
    }

    /// Zero every register and point the address registers at their segments.
    pub fn reset(&self) {
        for variable in self.variables.iter() {
            variable.set(0);
        }
        self.status_type.set(StatusType::Empty);
        self.index.set(0);
        self.memory_address.set(0);
        self.program_counter.set(PROGRAM_START);
        for slot in self.stack.iter() {
            slot.set(0);
        }
        self.stack_pointer.set(STACK_END);
        self.font_segment.set(FONT_ADDRESS);
        self.graphic_segment.set(DISPLAY_START);
        self.graphic_change.set(GraphicChange::Idle);
        self.input.set(0);
        self.key.set(0);
        self.delay_timer.set(0);
        self.sound_timer.set(0);
        self.instruction.set(0);
        for word in self.decoded.iter() {
            word.set(0);
        }
        self.state.set(CpuState::Operating);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn vf_is_variable_f() {
        let registers = RegisterFile::new();
        registers.set_flag(1, StatusType::Carry);
        assert_eq!(1, registers.v(0xF));
        assert_eq!(1, registers.vf());
        assert_eq!(StatusType::Carry, registers.status_type.get());
    }

    #[test]
    fn vf_subscribers_see_the_new_status() {
        let registers = RegisterFile::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let weak = Rc::downgrade(&registers);
        registers.variables[0xF].subscribe(move |value| {
            if let Some(registers) = weak.upgrade() {
                sink.borrow_mut().push((value, registers.status_type.get()));
            }
        });

        registers.set_flag(1, StatusType::Carry);
        registers.set_flag(0, StatusType::Borrow);
        assert_eq!(vec![(1, StatusType::Carry), (0, StatusType::Borrow)], *seen.borrow());
    }

    #[test]
    fn stack_has_room_for_the_whole_segment() {
        assert_eq!(24, STACK_SLOTS);
    }

    #[test]
    fn sound_on_follows_edges_of_the_sound_timer() {
        let registers = RegisterFile::new();
        let edges = Rc::new(RefCell::new(Vec::new()));
        let sink = edges.clone();
        registers.sound_on.subscribe(move |on| sink.borrow_mut().push(on));

        for value in &[5, 4, 3, 2, 1, 0, 0, 9] {
            registers.sound_timer.set(*value);
        }
        assert_eq!(vec![true, false, true], *edges.borrow());
    }

    #[test]
    fn reset_restores_initial_values() {
        let registers = RegisterFile::new();
        registers.set_v(3, 9);
        registers.program_counter.set(0x345);
        registers.stack_pointer.set(STACK_START);
        registers.state.set(CpuState::Sleep);
        registers.reset();
        assert_eq!(0, registers.v(3));
        assert_eq!(PROGRAM_START, registers.program_counter.get());
        assert_eq!(STACK_END, registers.stack_pointer.get());
        assert_eq!(CpuState::Operating, registers.state.get());
    }
}
