//! Bulk transfers between V0..VX and memory at I.

use crate::emulator::error::Result;
use crate::emulator::memory::MappedMemory;
use crate::emulator::register_file::RegisterFile;

pub struct LoadStoreUnit {
    /// Leave I pointing past the transferred block.
    increment_i: bool,
}

impl LoadStoreUnit {
    pub fn new(legacy_load_store: bool) -> LoadStoreUnit {
        LoadStoreUnit { increment_i: !legacy_load_store }
    }

    /// Dump register values up to VX.
    pub fn store(&self, registers: &RegisterFile, memory: &mut MappedMemory, x: u8) -> Result<()> {
        let values: Vec<u8> = (0..=x).map(|reg_no| registers.v(reg_no)).collect();
        memory.set_bytes(registers.index.get(), &values)?;
        self.advance(registers, x);
        Ok(())
    }

    /// Load register values up to VX.
    pub fn load(&self, registers: &RegisterFile, memory: &MappedMemory, x: u8) -> Result<()> {
        let values = memory.get_bytes(registers.index.get(), x as usize + 1)?;
        for (reg_no, value) in values.into_iter().enumerate() {
            registers.set_v(reg_no as u8, value);
        }
        self.advance(registers, x);
        Ok(())
    }

    fn advance(&self, registers: &RegisterFile, x: u8) {
        if self.increment_i {
            registers.index.set(registers.index.get() + x as u16 + 1);
        }
    }
}
