//! Arithmetic and logic on the V registers.

use rand::{Rng, RngCore};

use crate::emulator::error::Result;
use crate::emulator::memory::MappedMemory;
use crate::emulator::register::StatusType;
use crate::emulator::register_file::RegisterFile;

pub struct Alu {
    legacy_shift: bool,
    rng: Box<dyn RngCore>,
}

impl Alu {
    pub fn new(legacy_shift: bool, rng: Box<dyn RngCore>) -> Alu {
        Alu { legacy_shift, rng }
    }

    pub fn load(&self, registers: &RegisterFile, x: u8, value: u8) {
        registers.set_v(x, value);
    }

    pub fn load_reg(&self, registers: &RegisterFile, x: u8, y: u8) {
        registers.set_v(x, registers.v(y));
    }

    /// 7XKK never touches VF.
    pub fn add_const(&self, registers: &RegisterFile, x: u8, value: u8) {
        registers.set_v(x, registers.v(x).wrapping_add(value));
    }

    pub fn add(&self, registers: &RegisterFile, x: u8, y: u8) {
        let (sum, carry) = registers.v(x).overflowing_add(registers.v(y));
        registers.set_v(x, sum);
        registers.set_flag(carry as u8, StatusType::Carry);
    }

    /// Store `minuend - subtrahend` in VX. VF is 1 when there was no borrow.
    pub fn sub(&self, registers: &RegisterFile, x: u8, minuend: u8, subtrahend: u8) {
        let a = registers.v(minuend);
        let b = registers.v(subtrahend);
        registers.set_v(x, a.wrapping_sub(b));
        registers.set_flag((a >= b) as u8, StatusType::Borrow);
    }

    fn shift_source(&self, registers: &RegisterFile, x: u8, y: u8) -> u8 {
        if self.legacy_shift {
            registers.v(x)
        } else {
            registers.v(y)
        }
    }

    pub fn shift_right(&self, registers: &RegisterFile, x: u8, y: u8) {
        let source = self.shift_source(registers, x, y);
        registers.set_v(x, source >> 1);
        registers.set_flag(source & 0x01, StatusType::Lsb);
    }

    pub fn shift_left(&self, registers: &RegisterFile, x: u8, y: u8) {
        let source = self.shift_source(registers, x, y);
        registers.set_v(x, source << 1);
        registers.set_flag(source >> 7, StatusType::Msb);
    }

    pub fn or(&self, registers: &RegisterFile, x: u8, y: u8) {
        registers.set_v(x, registers.v(x) | registers.v(y));
    }

    pub fn and(&self, registers: &RegisterFile, x: u8, y: u8) {
        registers.set_v(x, registers.v(x) & registers.v(y));
    }

    pub fn xor(&self, registers: &RegisterFile, x: u8, y: u8) {
        registers.set_v(x, registers.v(x) ^ registers.v(y));
    }

    /// Write hundreds, tens and ones of VX to I, I+1 and I+2.
    pub fn bcd(&self, registers: &RegisterFile, memory: &mut MappedMemory, x: u8) -> Result<()> {
        let value = registers.v(x);
        let digits = [value / 100, value / 10 % 10, value % 10];
        memory.set_bytes(registers.index.get(), &digits)
    }

    pub fn random_and(&mut self, registers: &RegisterFile, x: u8, mask: u8) {
        let random: u8 = self.rng.gen();
        registers.set_v(x, random & mask);
    }

    pub fn equals_const(&self, registers: &RegisterFile, x: u8, value: u8) -> bool {
        registers.v(x) == value
    }

    pub fn equals_reg(&self, registers: &RegisterFile, x: u8, y: u8) -> bool {
        registers.v(x) == registers.v(y)
    }
}
