//! Calls, returns and jumps.
//!
//! The stack grows down from the top of its segment; SP holds the
//! address of the most recently pushed return address.

use crate::emulator::error::{Error, Result};
use crate::emulator::memory::{MappedMemory, STACK_END, STACK_START};
use crate::emulator::register::TRIBBLE_MAX;
use crate::emulator::register_file::RegisterFile;

pub struct StackEngine;

impl StackEngine {
    pub fn push(&self, registers: &RegisterFile, memory: &mut MappedMemory, address: u16) -> Result<()> {
        let stack_pointer = registers.stack_pointer.get();
        if stack_pointer < STACK_START + 2 {
            return Err(Error::StackOverflow);
        }
        memory.set_word(stack_pointer - 2, address)?;
        registers.stack_pointer.set(stack_pointer - 2);
        Ok(())
    }

    pub fn pop(&self, registers: &RegisterFile, memory: &MappedMemory) -> Result<u16> {
        let stack_pointer = registers.stack_pointer.get();
        if stack_pointer >= STACK_END {
            return Err(Error::StackUnderflow);
        }
        let address = memory.get_word(stack_pointer)?;
        registers.stack_pointer.set(stack_pointer + 2);
        Ok(address)
    }

    /// Store the address of the current instruction, then jump.
    pub fn call(&self, registers: &RegisterFile, memory: &mut MappedMemory, address: u16) -> Result<()> {
        self.push(registers, memory, registers.memory_address.get())?;
        registers.program_counter.set(address);
        Ok(())
    }

    /// Resume after the instruction that made the call.
    pub fn ret(&self, registers: &RegisterFile, memory: &MappedMemory) -> Result<()> {
        let caller = self.pop(registers, memory)?;
        registers.program_counter.set(caller + 2);
        Ok(())
    }

    pub fn jump(&self, registers: &RegisterFile, address: u16) {
        registers.program_counter.set(address);
    }

    /// BMMM: jump to MMM + V0. Leaving the 12-bit space is an error.
    pub fn jump_indexed(&self, registers: &RegisterFile, address: u16, offset: u8) -> Result<()> {
        let target = address + offset as u16;
        if target > TRIBBLE_MAX {
            return Err(Error::AddressOverflow { base: address, offset });
        }
        registers.program_counter.set(target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::register_file::STACK_SLOTS;

    fn setup() -> (std::rc::Rc<RegisterFile>, MappedMemory) {
        let registers = RegisterFile::new();
        let memory = MappedMemory::new(registers.clone(), 0).unwrap();
        (registers, memory)
    }

    #[test]
    fn call_then_return_is_balanced() {
        let (registers, mut memory) = setup();
        registers.memory_address.set(0x204);
        StackEngine.call(&registers, &mut memory, 0x300).unwrap();
        assert_eq!(0x300, registers.program_counter.get());
        assert_eq!(STACK_END - 2, registers.stack_pointer.get());
        assert_eq!(0x204, registers.stack[STACK_SLOTS - 1].get());

        StackEngine.ret(&registers, &memory).unwrap();
        assert_eq!(0x206, registers.program_counter.get());
        assert_eq!(STACK_END, registers.stack_pointer.get());
    }

    #[test]
    fn full_stack_overflows() {
        let (registers, mut memory) = setup();
        for slot in 0..STACK_SLOTS {
            StackEngine.push(&registers, &mut memory, slot as u16).unwrap();
        }
        assert_eq!(STACK_START, registers.stack_pointer.get());
        assert_eq!(Err(Error::StackOverflow), StackEngine.push(&registers, &mut memory, 0));
        assert_eq!(Ok(STACK_SLOTS as u16 - 1), StackEngine.pop(&registers, &memory));
    }

    #[test]
    fn empty_stack_underflows() {
        let (registers, memory) = setup();
        assert_eq!(Err(Error::StackUnderflow), StackEngine.ret(&registers, &memory));
    }

    #[test]
    fn indexed_jump_checks_the_address_space() {
        let registers = RegisterFile::new();
        StackEngine.jump_indexed(&registers, 0x300, 0x20).unwrap();
        assert_eq!(0x320, registers.program_counter.get());
        assert_eq!(
            Err(Error::AddressOverflow { base: 0xFF0, offset: 0x20 }),
            StackEngine.jump_indexed(&registers, 0xFF0, 0x20)
        );
        assert_eq!(0x320, registers.program_counter.get());
    }
}
