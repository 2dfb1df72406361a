//! The CPU run-state machine.
//!
//! ```text
//!            halt()              stop_clock()
//!   HALT <----------- OPERATING -------------> STOP_CLOCK
//!        ----------->           <-------------
//!            cont()              start_clock()
//!
//!   any but SLEEP --sleep()--> SLEEP --wake_up()--> OPERATING
//! ```
//!
//! Every transition is guarded: called from any other state it does nothing
//! and returns `false`.

use std::rc::{Rc, Weak};

use crate::emulator::register::CpuState;
use crate::emulator::register_file::RegisterFile;

fn transition(registers: &RegisterFile, from: CpuState, to: CpuState) -> bool {
    if registers.state.get() != from {
        return false;
    }
    log::debug!("CPU {:?} -> {:?}", from, to);
    registers.state.set(to);
    true
}

pub fn halt(registers: &RegisterFile) -> bool {
    transition(registers, CpuState::Operating, CpuState::Halt)
}

pub fn cont(registers: &RegisterFile) -> bool {
    transition(registers, CpuState::Halt, CpuState::Operating)
}

pub fn stop_clock(registers: &RegisterFile) -> bool {
    transition(registers, CpuState::Operating, CpuState::StopClock)
}

pub fn start_clock(registers: &RegisterFile) -> bool {
    transition(registers, CpuState::StopClock, CpuState::Operating)
}

pub fn sleep(registers: &RegisterFile) -> bool {
    let from = registers.state.get();
    if from == CpuState::Sleep {
        return false;
    }
    transition(registers, from, CpuState::Sleep)
}

pub fn wake_up(registers: &RegisterFile) -> bool {
    transition(registers, CpuState::Sleep, CpuState::Operating)
}

/// Whether instructions are being executed.
pub fn is_operating(registers: &RegisterFile) -> bool {
    registers.state.get() == CpuState::Operating
}

/// Whether the timers are ticking.
pub fn is_clocked(registers: &RegisterFile) -> bool {
    matches!(registers.state.get(), CpuState::Operating | CpuState::Halt)
}

/// Resume a halted or clock-stopped CPU whenever the key state changes.
pub fn wake_on_input(registers: &Rc<RegisterFile>) {
    let weak: Weak<RegisterFile> = Rc::downgrade(registers);
    registers.input.subscribe(move |_| {
        if let Some(registers) = weak.upgrade() {
            cont(&registers);
            start_clock(&registers);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn in_state(state: CpuState) -> Rc<RegisterFile> {
        let registers = RegisterFile::new();
        registers.state.set(state);
        registers
    }

    #[test_case(CpuState::Operating => (true, CpuState::Halt))]
    #[test_case(CpuState::StopClock => (false, CpuState::StopClock))]
    #[test_case(CpuState::Sleep => (false, CpuState::Sleep))]
    fn halt_only_from_operating(state: CpuState) -> (bool, CpuState) {
        let registers = in_state(state);
        (halt(&registers), registers.state.get())
    }

    #[test_case(CpuState::Operating => (true, CpuState::Sleep))]
    #[test_case(CpuState::Halt => (true, CpuState::Sleep))]
    #[test_case(CpuState::StopClock => (true, CpuState::Sleep))]
    #[test_case(CpuState::Sleep => (false, CpuState::Sleep))]
    fn sleep_from_anything_but_sleep(state: CpuState) -> (bool, CpuState) {
        let registers = in_state(state);
        (sleep(&registers), registers.state.get())
    }

    #[test]
    fn pairs_undo_each_other() {
        let registers = in_state(CpuState::Operating);
        assert!(halt(&registers) && cont(&registers));
        assert!(stop_clock(&registers) && start_clock(&registers));
        assert!(sleep(&registers) && wake_up(&registers));
        assert_eq!(CpuState::Operating, registers.state.get());
        assert!(!cont(&registers));
        assert!(!start_clock(&registers));
        assert!(!wake_up(&registers));
    }

    #[test_case(CpuState::Halt => CpuState::Operating)]
    #[test_case(CpuState::StopClock => CpuState::Operating)]
    #[test_case(CpuState::Sleep => CpuState::Sleep)]
    fn input_wakes_everything_but_sleep(state: CpuState) -> CpuState {
        let registers = in_state(state);
        wake_on_input(&registers);
        registers.input.set(0x0010);
        registers.state.get()
    }

    #[test]
    fn clock_gating() {
        let registers = in_state(CpuState::Halt);
        assert!(!is_operating(&registers));
        assert!(is_clocked(&registers));
        stop_clock(&registers);
        cont(&registers);
        stop_clock(&registers);
        assert!(!is_clocked(&registers));
    }
}
