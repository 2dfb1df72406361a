//! Fetch, decode and dispatch to the execution units.

use rand::RngCore;

use crate::emulator::config::Quirks;
use crate::emulator::error::Result;
use crate::emulator::gpu::Gpu;
use crate::emulator::instruction::{DecodedInstruction, Decoder, Opcode};
use crate::emulator::memory::MappedMemory;
use crate::emulator::power;
use crate::emulator::register_file::{RegisterFile, DECODED_WORDS};
use crate::emulator::units::{AddressUnit, Alu, LoadStoreUnit, StackEngine};

/// Move on to the next instruction.
const NEXT: u16 = 2;
/// Skip the next instruction.
const SKIP: u16 = 4;
/// The instruction set PC itself, or is repeated.
const STAY: u16 = 0;

pub struct ControlUnit {
    decoder: Decoder,
    alu: Alu,
    agu: AddressUnit,
    lsu: LoadStoreUnit,
    stack: StackEngine,
    gpu: Gpu,
}

impl ControlUnit {
    pub fn new(quirks: &Quirks, rng: Box<dyn RngCore>) -> ControlUnit {
        ControlUnit {
            decoder: Decoder::new(),
            alu: Alu::new(quirks.legacy_shift, rng),
            agu: AddressUnit::new(quirks.legacy_address_sum),
            lsu: LoadStoreUnit::new(quirks.legacy_load_store),
            stack: StackEngine,
            gpu: Gpu::new(quirks.display_mode, quirks.trim_var_for_font),
        }
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    /// Run one instruction from PC.
    pub fn step(&mut self, registers: &RegisterFile, memory: &mut MappedMemory) -> Result<()> {
        self.fetch(registers, memory)?;
        self.decode(registers)?;
        self.execute(registers, memory)
    }

    /// Read the word at PC into the instruction register.
    pub fn fetch(&self, registers: &RegisterFile, memory: &MappedMemory) -> Result<()> {
        let program_counter = registers.program_counter.get();
        registers.memory_address.set(program_counter);
        registers.instruction.set(memory.get_word(program_counter)?);
        Ok(())
    }

    /// Split the instruction register into the decoded-instruction registers.
    pub fn decode(&self, registers: &RegisterFile) -> Result<()> {
        let decoded = self.decoder.decode(registers.instruction.get())?;
        registers.decoded[0].set(decoded.pattern);
        for index in 1..DECODED_WORDS {
            registers.decoded[index].set(decoded.params.get(index - 1).copied().unwrap_or(0));
        }
        Ok(())
    }

    /// Execute whatever sits in the decoded-instruction registers, then advance PC.
    pub fn execute(&mut self, registers: &RegisterFile, memory: &mut MappedMemory) -> Result<()> {
        let params: Vec<u16> = registers.decoded[1..].iter().map(|word| word.get()).collect();
        let instruction = self.decoder.from_pattern(registers.decoded[0].get(), &params)?;
        log::trace!("{:#05x}: {:?} {:x?}", registers.memory_address.get(), instruction.opcode, instruction.params);

        let increment = self.dispatch(registers, memory, &instruction)?;
        if increment != STAY {
            registers.program_counter.set(registers.program_counter.get() + increment);
        }
        Ok(())
    }

    fn dispatch(&mut self, registers: &RegisterFile, memory: &mut MappedMemory, instruction: &DecodedInstruction) -> Result<u16> {
        let x = instruction.reg(0);
        let y = instruction.reg(1);
        let increment = match instruction.opcode {
            Opcode::ClearScreen => {
                self.gpu.clear_screen(registers, memory)?;
                NEXT
            }
            Opcode::Return => {
                self.stack.ret(registers, memory)?;
                STAY
            }
            Opcode::Sys => {
                log::warn!("Ignoring machine language call to {:#05x}", instruction.addr(0));
                NEXT
            }
            Opcode::Goto => {
                self.stack.jump(registers, instruction.addr(0));
                STAY
            }
            Opcode::Call => {
                self.stack.call(registers, memory, instruction.addr(0))?;
                STAY
            }
            Opcode::IfRegEqConst => skip_if(self.alu.equals_const(registers, x, instruction.byte(1))),
            Opcode::IfRegNeqConst => skip_if(!self.alu.equals_const(registers, x, instruction.byte(1))),
            Opcode::IfRegEqReg => skip_if(self.alu.equals_reg(registers, x, y)),
            Opcode::IfRegNeqReg => skip_if(!self.alu.equals_reg(registers, x, y)),
            Opcode::SetRegToConst => {
                self.alu.load(registers, x, instruction.byte(1));
                NEXT
            }
            Opcode::IncRegByConst => {
                self.alu.add_const(registers, x, instruction.byte(1));
                NEXT
            }
            Opcode::SetRegToReg => {
                self.alu.load_reg(registers, x, y);
                NEXT
            }
            Opcode::BitwiseOr => {
                self.alu.or(registers, x, y);
                NEXT
            }
            Opcode::BitwiseAnd => {
                self.alu.and(registers, x, y);
                NEXT
            }
            Opcode::BitwiseXor => {
                self.alu.xor(registers, x, y);
                NEXT
            }
            Opcode::IncRegByReg => {
                self.alu.add(registers, x, y);
                NEXT
            }
            Opcode::DecRegByReg => {
                self.alu.sub(registers, x, x, y);
                NEXT
            }
            Opcode::BitshiftRight => {
                self.alu.shift_right(registers, x, y);
                NEXT
            }
            Opcode::SetVxVyMinusVx => {
                self.alu.sub(registers, x, y, x);
                NEXT
            }
            Opcode::BitshiftLeft => {
                self.alu.shift_left(registers, x, y);
                NEXT
            }
            Opcode::SetI => {
                self.agu.load_index(registers, instruction.addr(0));
                NEXT
            }
            Opcode::JumpV0PlusAddr => {
                self.stack.jump_indexed(registers, instruction.addr(0), registers.v(0))?;
                STAY
            }
            Opcode::SetVxRand => {
                self.alu.random_and(registers, x, instruction.byte(1));
                NEXT
            }
            Opcode::Draw => {
                self.gpu.draw_sprite(registers, memory, x, y, instruction.reg(2))?;
                NEXT
            }
            Opcode::IfKeyPressed => skip_if(is_key_held(registers, registers.v(x))),
            Opcode::IfKeyNotPressed => skip_if(!is_key_held(registers, registers.v(x))),
            Opcode::SetRegToDelayTimer => {
                registers.set_v(x, registers.delay_timer.get());
                NEXT
            }
            Opcode::WaitForKey => {
                if registers.input.get() == 0 {
                    // Repeat this instruction once the key state changes.
                    power::halt(registers);
                    STAY
                } else {
                    registers.set_v(x, registers.key.get());
                    NEXT
                }
            }
            Opcode::SetDelayTimerToReg => {
                registers.delay_timer.set(registers.v(x));
                NEXT
            }
            Opcode::SetSoundTimerToReg => {
                registers.sound_timer.set(registers.v(x));
                NEXT
            }
            Opcode::AddRegToI => {
                self.agu.add_to_index(registers, x);
                NEXT
            }
            Opcode::SetIToFontChar => {
                self.gpu.font_address(registers, x)?;
                NEXT
            }
            Opcode::StoreBcdOfReg => {
                self.alu.bcd(registers, memory, x)?;
                NEXT
            }
            Opcode::RegDump => {
                self.lsu.store(registers, memory, x)?;
                NEXT
            }
            Opcode::RegLoad => {
                self.lsu.load(registers, memory, x)?;
                NEXT
            }
        };
        Ok(increment)
    }
}

fn skip_if(condition: bool) -> u16 {
    if condition {
        SKIP
    } else {
        NEXT
    }
}

fn is_key_held(registers: &RegisterFile, key: u8) -> bool {
    key <= 0xF && registers.input.get() & (1 << key) != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::error::Error;
    use crate::emulator::memory::PROGRAM_START;
    use crate::emulator::register::CpuState;
    use rand::rngs::mock::StepRng;
    use std::rc::Rc;
    use test_case::test_case;

    fn setup(program: &[u8]) -> (ControlUnit, Rc<RegisterFile>, MappedMemory) {
        let registers = RegisterFile::new();
        let mut memory = MappedMemory::new(registers.clone(), 0).unwrap();
        memory.flash(PROGRAM_START, program).unwrap();
        let control = ControlUnit::new(&Quirks::default(), Box::new(StepRng::new(0, 1)));
        (control, registers, memory)
    }

    #[test]
    fn fetch_reads_a_big_endian_word_at_pc() {
        let (control, registers, memory) = setup(&[0x61, 0x05]);
        control.fetch(&registers, &memory).unwrap();
        assert_eq!(0x6105, registers.instruction.get());
        assert_eq!(PROGRAM_START, registers.memory_address.get());
    }

    #[test]
    fn decode_fills_the_decoded_registers() {
        let (control, registers, _) = setup(&[]);
        registers.instruction.set(0xD12F);
        control.decode(&registers).unwrap();
        let words: Vec<u16> = registers.decoded.iter().map(|word| word.get()).collect();
        assert_eq!(vec![0xD000, 0x1, 0x2, 0xF], words);
    }

    #[test]
    fn unknown_pattern_fails_dispatch() {
        let (mut control, registers, mut memory) = setup(&[]);
        registers.decoded[0].set(0x5001);
        assert_eq!(
            Err(Error::UnsupportedInstruction { opcode: 0x5001 }),
            control.execute(&registers, &mut memory)
        );
    }

    #[test]
    fn unknown_word_is_fatal() {
        let (mut control, registers, mut memory) = setup(&[0xFF, 0xFF]);
        assert_eq!(
            Err(Error::UnsupportedInstruction { opcode: 0xFFFF }),
            control.step(&registers, &mut memory)
        );
        assert_eq!(PROGRAM_START, registers.program_counter.get());
    }

    #[test_case(&[0x33, 0x08], 8 => PROGRAM_START + 4 ; "skip when equal")]
    #[test_case(&[0x33, 0x08], 7 => PROGRAM_START + 2 ; "no skip when different")]
    #[test_case(&[0x43, 0x08], 7 => PROGRAM_START + 4 ; "skip when not equal")]
    #[test_case(&[0x13, 0x08], 0 => 0x308 ; "jump")]
    #[test_case(&[0xB3, 0x00], 0 => 0x300 ; "indexed jump")]
    fn program_counter_increment(program: &[u8], v3: u8) -> u16 {
        let (mut control, registers, mut memory) = setup(program);
        registers.set_v(3, v3);
        control.step(&registers, &mut memory).unwrap();
        registers.program_counter.get()
    }

    #[test]
    fn wait_for_key_halts_then_takes_the_key() {
        let (mut control, registers, mut memory) = setup(&[0xF5, 0x0A]);
        power::wake_on_input(&registers);

        control.step(&registers, &mut memory).unwrap();
        assert_eq!(CpuState::Halt, registers.state.get());
        assert_eq!(PROGRAM_START, registers.program_counter.get());

        registers.key.set(0xB);
        registers.input.set(1 << 0xB);
        assert_eq!(CpuState::Operating, registers.state.get());

        control.step(&registers, &mut memory).unwrap();
        assert_eq!(0xB, registers.v(5));
        assert_eq!(PROGRAM_START + 2, registers.program_counter.get());
    }

    #[test_case(0x9E, 0x0020 => PROGRAM_START + 4 ; "skip if pressed and pressed")]
    #[test_case(0x9E, 0x0000 => PROGRAM_START + 2 ; "skip if pressed and not pressed")]
    #[test_case(0xA1, 0x0000 => PROGRAM_START + 4 ; "skip if not pressed and not pressed")]
    #[test_case(0xA1, 0x0020 => PROGRAM_START + 2 ; "skip if not pressed and pressed")]
    fn key_skips(low_byte: u8, input: u16) -> u16 {
        let (mut control, registers, mut memory) = setup(&[0xE2, low_byte]);
        registers.set_v(2, 5);
        registers.input.set(input);
        control.step(&registers, &mut memory).unwrap();
        registers.program_counter.get()
    }

    #[test]
    fn timers_are_loaded_and_read() {
        let (mut control, registers, mut memory) = setup(&[0xF1, 0x15, 0xF1, 0x18, 0xF2, 0x07]);
        registers.set_v(1, 9);
        for _ in 0..3 {
            control.step(&registers, &mut memory).unwrap();
        }
        assert_eq!(9, registers.delay_timer.get());
        assert_eq!(9, registers.sound_timer.get());
        assert_eq!(9, registers.v(2));
    }

    #[test]
    fn sys_is_skipped() {
        let (mut control, registers, mut memory) = setup(&[0x01, 0x23]);
        control.step(&registers, &mut memory).unwrap();
        assert_eq!(PROGRAM_START + 2, registers.program_counter.get());
    }
}
