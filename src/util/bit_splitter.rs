/// A structure for easily splitting an instruction word
/// into the fields CHIP-8 opcodes are made of: nibbles,
/// the low byte and the 12-bit address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitSplitter(u8, u8);

impl BitSplitter {
    pub fn from_u16(value: u16) -> BitSplitter {
        BitSplitter((value >> 8) as u8, (value & 0x00FF) as u8)
    }

    /// Left-shift the high byte 8 bits,
    /// then take bitwise or with the low byte
    /// in order to store the components in a u16.
    pub fn as_u16(&self) -> u16 {
        ((self.0 as u16) << 8) | self.1 as u16
    }

    /// Return the nibble at `index`, counted from the most significant end.
    /// Index 0 is the opcode family, 1 is usually X and 2 is usually Y.
    pub fn nibble(&self, index: usize) -> u8 {
        match index {
            0 => self.0 >> 4,
            1 => self.0 & 0x0F,
            2 => self.1 >> 4,
            _ => self.1 & 0x0F,
        }
    }

    pub fn low_byte(&self) -> u8 {
        self.1
    }

    /// The low 12 bits, which is where CHIP-8 keeps addresses.
    pub fn address(&self) -> u16 {
        self.as_u16() & 0x0FFF
    }
}
