//! The CHIP-8 instruction set and the decoder that recognizes it.
//!
//! Opcodes are written in hexadecimal, with the following special characters:
//! - MMM: address
//! - KK: 8-bit constant
//! - K: 4-bit constant
//! - X and Y: 4-bit register identifier

use std::collections::HashMap;

use crate::emulator::error::{Error, Result};
use crate::util::bit_splitter::BitSplitter;

/// The whole word has to match.
pub const FULL_MASK: u16 = 0xFFFF;
/// Everything but X has to match.
pub const SINGLE_REGISTER_MASK: u16 = 0xF0FF;
/// Everything but X and Y has to match.
pub const DOUBLE_REGISTER_MASK: u16 = 0xF00F;
/// Only the top nibble has to match.
pub const TOP_NIBBLE_MASK: u16 = 0xF000;

/// Masks in the order they are tried, most specific first.
pub const MASKS: [u16; 4] = [FULL_MASK, SINGLE_REGISTER_MASK, DOUBLE_REGISTER_MASK, TOP_NIBBLE_MASK];

/// A single operation from the CHIP-8 instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    ClearScreen,        // 00E0
    Return,             // 00EE
    Sys,                // 0MMM
    Goto,               // 1MMM
    Call,               // 2MMM
    IfRegEqConst,       // 3XKK
    IfRegNeqConst,      // 4XKK
    IfRegEqReg,         // 5XY0
    SetRegToConst,      // 6XKK
    IncRegByConst,      // 7XKK
    SetRegToReg,        // 8XY0
    BitwiseOr,          // 8XY1
    BitwiseAnd,         // 8XY2
    BitwiseXor,         // 8XY3
    IncRegByReg,        // 8XY4
    DecRegByReg,        // 8XY5
    BitshiftRight,      // 8XY6
    SetVxVyMinusVx,     // 8XY7
    BitshiftLeft,       // 8XYE
    IfRegNeqReg,        // 9XY0
    SetI,               // AMMM
    JumpV0PlusAddr,     // BMMM
    SetVxRand,          // CXKK
    Draw,               // DXYK
    IfKeyPressed,       // EX9E
    IfKeyNotPressed,    // EXA1
    SetRegToDelayTimer, // FX07
    WaitForKey,         // FX0A
    SetDelayTimerToReg, // FX15
    SetSoundTimerToReg, // FX18
    AddRegToI,          // FX1E
    SetIToFontChar,     // FX29
    StoreBcdOfReg,      // FX33
    RegDump,            // FX55
    RegLoad,            // FX65
}

/// How the parameters of an instruction are laid out in the word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamShape {
    OpcodeOnly,
    /// MMM
    Address,
    /// X and KK
    RegisterValue,
    /// X and Y
    TwoRegisters,
    /// X
    OneRegister,
    /// X, Y and K
    DrawSprite,
}

impl ParamShape {
    pub fn count(self) -> usize {
        match self {
            ParamShape::OpcodeOnly => 0,
            ParamShape::Address | ParamShape::OneRegister => 1,
            ParamShape::RegisterValue | ParamShape::TwoRegisters => 2,
            ParamShape::DrawSprite => 3,
        }
    }

    fn extract(self, word: BitSplitter) -> Vec<u16> {
        let nibble = |index| word.nibble(index) as u16;
        match self {
            ParamShape::OpcodeOnly => vec![],
            ParamShape::Address => vec![word.address()],
            ParamShape::RegisterValue => vec![nibble(1), word.low_byte() as u16],
            ParamShape::TwoRegisters => vec![nibble(1), nibble(2)],
            ParamShape::OneRegister => vec![nibble(1)],
            ParamShape::DrawSprite => vec![nibble(1), nibble(2), nibble(3)],
        }
    }
}

/// One entry of the instruction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionDefinition {
    pub opcode: Opcode,
    /// The word with all parameter bits cleared.
    pub pattern: u16,
    pub mask: u16,
    pub shape: ParamShape,
}

impl InstructionDefinition {
    /// Confirm a word that already matched `pattern` under `mask`.
    pub fn is_recognized(&self, word: u16) -> bool {
        match self.opcode {
            // 00E0 and 00EE share the 0MMM space but are their own instructions.
            Opcode::Sys => word != 0x00E0 && word != 0x00EE,
            _ => word & self.mask == self.pattern,
        }
    }
}

const fn definition(opcode: Opcode, pattern: u16, mask: u16, shape: ParamShape) -> InstructionDefinition {
    InstructionDefinition { opcode, pattern, mask, shape }
}

/// The standard instruction set.
pub const INSTRUCTION_SET: [InstructionDefinition; 35] = {
    use Opcode::*;
    use ParamShape::*;
    [
        definition(ClearScreen, 0x00E0, FULL_MASK, OpcodeOnly),
        definition(Return, 0x00EE, FULL_MASK, OpcodeOnly),
        definition(Sys, 0x0000, TOP_NIBBLE_MASK, Address),
        definition(Goto, 0x1000, TOP_NIBBLE_MASK, Address),
        definition(Call, 0x2000, TOP_NIBBLE_MASK, Address),
        definition(IfRegEqConst, 0x3000, TOP_NIBBLE_MASK, RegisterValue),
        definition(IfRegNeqConst, 0x4000, TOP_NIBBLE_MASK, RegisterValue),
        definition(IfRegEqReg, 0x5000, DOUBLE_REGISTER_MASK, TwoRegisters),
        definition(SetRegToConst, 0x6000, TOP_NIBBLE_MASK, RegisterValue),
        definition(IncRegByConst, 0x7000, TOP_NIBBLE_MASK, RegisterValue),
        definition(SetRegToReg, 0x8000, DOUBLE_REGISTER_MASK, TwoRegisters),
        definition(BitwiseOr, 0x8001, DOUBLE_REGISTER_MASK, TwoRegisters),
        definition(BitwiseAnd, 0x8002, DOUBLE_REGISTER_MASK, TwoRegisters),
        definition(BitwiseXor, 0x8003, DOUBLE_REGISTER_MASK, TwoRegisters),
        definition(IncRegByReg, 0x8004, DOUBLE_REGISTER_MASK, TwoRegisters),
        definition(DecRegByReg, 0x8005, DOUBLE_REGISTER_MASK, TwoRegisters),
        definition(BitshiftRight, 0x8006, DOUBLE_REGISTER_MASK, TwoRegisters),
        definition(SetVxVyMinusVx, 0x8007, DOUBLE_REGISTER_MASK, TwoRegisters),
        definition(BitshiftLeft, 0x800E, DOUBLE_REGISTER_MASK, TwoRegisters),
        definition(IfRegNeqReg, 0x9000, DOUBLE_REGISTER_MASK, TwoRegisters),
        definition(SetI, 0xA000, TOP_NIBBLE_MASK, Address),
        definition(JumpV0PlusAddr, 0xB000, TOP_NIBBLE_MASK, Address),
        definition(SetVxRand, 0xC000, TOP_NIBBLE_MASK, RegisterValue),
        definition(Draw, 0xD000, TOP_NIBBLE_MASK, DrawSprite),
        definition(IfKeyPressed, 0xE09E, SINGLE_REGISTER_MASK, OneRegister),
        definition(IfKeyNotPressed, 0xE0A1, SINGLE_REGISTER_MASK, OneRegister),
        definition(SetRegToDelayTimer, 0xF007, SINGLE_REGISTER_MASK, OneRegister),
        definition(WaitForKey, 0xF00A, SINGLE_REGISTER_MASK, OneRegister),
        definition(SetDelayTimerToReg, 0xF015, SINGLE_REGISTER_MASK, OneRegister),
        definition(SetSoundTimerToReg, 0xF018, SINGLE_REGISTER_MASK, OneRegister),
        definition(AddRegToI, 0xF01E, SINGLE_REGISTER_MASK, OneRegister),
        definition(SetIToFontChar, 0xF029, SINGLE_REGISTER_MASK, OneRegister),
        definition(StoreBcdOfReg, 0xF033, SINGLE_REGISTER_MASK, OneRegister),
        definition(RegDump, 0xF055, SINGLE_REGISTER_MASK, OneRegister),
        definition(RegLoad, 0xF065, SINGLE_REGISTER_MASK, OneRegister),
    ]
};

/// An instruction split into its opcode and parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub opcode: Opcode,
    pub pattern: u16,
    pub params: Vec<u16>,
}

impl DecodedInstruction {
    /// Parameter `index` as a register number or nibble.
    pub fn reg(&self, index: usize) -> u8 {
        self.params.get(index).copied().unwrap_or(0) as u8
    }

    /// Parameter `index` as a byte constant.
    pub fn byte(&self, index: usize) -> u8 {
        self.params.get(index).copied().unwrap_or(0) as u8
    }

    /// Parameter `index` as an address.
    pub fn addr(&self, index: usize) -> u16 {
        self.params.get(index).copied().unwrap_or(0)
    }
}

/// Table of instruction definitions keyed by mask and masked word.
pub struct Decoder {
    definitions: HashMap<(u16, u16), InstructionDefinition>,
    by_pattern: HashMap<u16, InstructionDefinition>,
}

impl Decoder {
    pub fn new() -> Decoder {
        let definitions = INSTRUCTION_SET
            .iter()
            .map(|definition| ((definition.mask, definition.pattern), *definition))
            .collect();
        let by_pattern = INSTRUCTION_SET
            .iter()
            .map(|definition| (definition.pattern, *definition))
            .collect();
        Decoder { definitions, by_pattern }
    }

    /// Find the definition recognizing `word`, trying the most specific mask first.
    pub fn definition(&self, word: u16) -> Option<&InstructionDefinition> {
        MASKS.iter().find_map(|mask| {
            self.definitions
                .get(&(*mask, word & mask))
                .filter(|definition| definition.is_recognized(word))
        })
    }

    pub fn decode(&self, word: u16) -> Result<DecodedInstruction> {
        match self.definition(word) {
            Some(definition) => Ok(DecodedInstruction {
                opcode: definition.opcode,
                pattern: definition.pattern,
                params: definition.shape.extract(BitSplitter::from_u16(word)),
            }),
            None => {
                log::error!("Unknown opcode {:#06x}", word);
                Err(Error::UnsupportedInstruction { opcode: word })
            }
        }
    }

    /// Rebuild a decoded instruction from its pattern and parameters,
    /// the way they are kept in the decoded-instruction registers.
    pub fn from_pattern(&self, pattern: u16, params: &[u16]) -> Result<DecodedInstruction> {
        let definition = self
            .by_pattern
            .get(&pattern)
            .ok_or(Error::UnsupportedInstruction { opcode: pattern })?;
        Ok(DecodedInstruction {
            opcode: definition.opcode,
            pattern,
            params: params.iter().take(definition.shape.count()).copied().collect(),
        })
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
