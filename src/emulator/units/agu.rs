//! Address generation: everything that computes a value for I.

use crate::emulator::register::{StatusType, TRIBBLE_MAX};
use crate::emulator::register_file::RegisterFile;

pub struct AddressUnit {
    legacy_address_sum: bool,
}

impl AddressUnit {
    pub fn new(legacy_address_sum: bool) -> AddressUnit {
        AddressUnit { legacy_address_sum }
    }

    pub fn load_index(&self, registers: &RegisterFile, address: u16) {
        registers.index.set(address);
    }

    /// Add VX to I. Leaving the 12-bit space wraps; only the modern
    /// behaviour reports it in VF.
    pub fn add_to_index(&self, registers: &RegisterFile, x: u8) {
        let sum = registers.index.get() as u32 + registers.v(x) as u32;
        let overflow = sum > TRIBBLE_MAX as u32;
        registers.index.set((sum & TRIBBLE_MAX as u32) as u16);
        if !self.legacy_address_sum {
            registers.set_flag(overflow as u8, StatusType::CarryIndex);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(false, 0x300, 0x10 => (0x310, 0) ; "modern without overflow")]
    #[test_case(false, 0xFFE, 0x05 => (0x003, 1) ; "modern overflow reports")]
    #[test_case(true, 0xFFE, 0x05 => (0x003, 7) ; "legacy overflow leaves vf")]
    fn add_to_index(legacy: bool, index: u16, value: u8) -> (u16, u8) {
        let registers = RegisterFile::new();
        let agu = AddressUnit::new(legacy);
        registers.set_v(0xF, 7);
        registers.set_v(3, value);
        agu.load_index(&registers, index);
        agu.add_to_index(&registers, 3);
        (registers.index.get(), registers.vf())
    }

    #[test]
    fn overflow_is_tagged_as_index_carry() {
        let registers = RegisterFile::new();
        AddressUnit::new(false).add_to_index(&registers, 0);
        assert_eq!(StatusType::CarryIndex, registers.status_type.get());
    }
}
