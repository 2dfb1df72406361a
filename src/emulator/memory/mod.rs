//! The segmented 4K address space.
//!
//! ```text
//! 0x000-0x1FF  interpreter ROM (font)
//! 0x200-0xE9F  program, optionally split into ROM and RAM
//! 0xEA0-0xECF  stack, backed by the stack registers
//! 0xED0-0xEEF  interpreter RAM
//! 0xEF0-0xEFF  variables, backed by V0-VF
//! 0xF00-0xFFF  display IO, 64x32 pixels, 8 pixels per byte
//! ```

pub mod segment;

use std::rc::Rc;

use crate::emulator::error::{Error, Result};
use crate::emulator::register_file::RegisterFile;
use segment::{ReadOnly, Segment, SegmentKind, SplitMemory};

pub const MEM_SIZE: usize = 0x1000;
pub const INTERPRETER_START: u16 = 0x000;
pub const PROGRAM_START: u16 = 0x200;
pub const STACK_START: u16 = 0xEA0;
pub const STACK_END: u16 = 0xED0;
pub const INTERPRETER_RAM_START: u16 = 0xED0;
pub const VARIABLES_START: u16 = 0xEF0;
pub const DISPLAY_START: u16 = 0xF00;
pub const MEMORY_END: u16 = MEM_SIZE as u16;

pub const PROGRAM_SIZE: usize = (STACK_START - PROGRAM_START) as usize;
pub const DISPLAY_SIZE: usize = (MEMORY_END - DISPLAY_START) as usize;
pub const FONT_ADDRESS: u16 = INTERPRETER_START;

/// Every access is routed to the segment owning the address.
pub struct MappedMemory {
    segments: Vec<Segment>,
}

impl MappedMemory {
    /// Build the standard layout. `program_split` bytes at the start of the
    /// program segment are write-protected.
    pub fn new(registers: Rc<RegisterFile>, program_split: u16) -> Result<MappedMemory> {
        let segments = vec![
            Segment::new(
                "interpreter",
                INTERPRETER_START,
                PROGRAM_START,
                SegmentKind::Rom(ReadOnly::new((PROGRAM_START - INTERPRETER_START) as usize)),
            ),
            Segment::new(
                "program",
                PROGRAM_START,
                STACK_START,
                SegmentKind::Split(SplitMemory::new(PROGRAM_SIZE, program_split as usize)),
            ),
            Segment::new("stack", STACK_START, STACK_END, SegmentKind::Stack(registers.clone())),
            Segment::new(
                "interpreter ram",
                INTERPRETER_RAM_START,
                VARIABLES_START,
                SegmentKind::Ram(vec![0; (VARIABLES_START - INTERPRETER_RAM_START) as usize]),
            ),
            Segment::new("variables", VARIABLES_START, DISPLAY_START, SegmentKind::Variables(registers)),
            Segment::new("display", DISPLAY_START, MEMORY_END, SegmentKind::Ram(vec![0; DISPLAY_SIZE])),
        ];
        Self::check_layout(&segments)?;
        Ok(MappedMemory { segments })
    }

    /// Segments must be contiguous from 0 to the top of memory and
    /// each must be backed by exactly as many bytes as it spans.
    fn check_layout(segments: &[Segment]) -> Result<()> {
        let mut expected_start = 0;
        for segment in segments {
            if segment.start != expected_start || segment.len() != segment.backing_len() {
                log::error!("Bad layout for segment {} at {:#05x}", segment.name, segment.start);
                return Err(Error::MemoryAccessViolation { address: segment.start });
            }
            expected_start = segment.end;
        }
        if expected_start != MEMORY_END {
            return Err(Error::MemoryAccessViolation { address: expected_start });
        }
        Ok(())
    }

    fn position(&self, address: u16) -> Result<usize> {
        self.segments
            .iter()
            .position(|segment| segment.contains(address))
            .ok_or(Error::MemoryAccessViolation { address })
    }

    /// Find the segment holding `length` bytes from `address`.
    fn locate(&self, address: u16, length: usize) -> Result<usize> {
        let index = self.position(address)?;
        if address as usize + length > self.segments[index].end as usize {
            return Err(Error::SegmentBoundaryViolation { address, length });
        }
        Ok(index)
    }

    pub fn get_byte(&self, address: u16) -> Result<u8> {
        let index = self.locate(address, 1)?;
        self.segments[index].get_byte(address)
    }

    pub fn set_byte(&mut self, address: u16, value: u8) -> Result<()> {
        let index = self.locate(address, 1)?;
        self.segments[index].set_byte(address, value)
    }

    pub fn get_word(&self, address: u16) -> Result<u16> {
        let index = self.locate(address, 2)?;
        self.segments[index].get_word(address)
    }

    pub fn set_word(&mut self, address: u16, value: u16) -> Result<()> {
        let index = self.locate(address, 2)?;
        self.segments[index].set_word(address, value)
    }

    pub fn get_bytes(&self, address: u16, length: usize) -> Result<Vec<u8>> {
        let index = self.locate(address, length)?;
        self.segments[index].get_bytes(address, length)
    }

    pub fn set_bytes(&mut self, address: u16, data: &[u8]) -> Result<()> {
        let index = self.locate(address, data.len())?;
        self.segments[index].set_bytes(address, data)
    }

    /// Write into ROM or the protected part of the program segment.
    pub fn flash(&mut self, address: u16, data: &[u8]) -> Result<()> {
        let index = self.locate(address, data.len())?;
        self.segments[index].flash(address, data)
    }

    /// Zero interpreter RAM and the display. ROM and the program stay.
    pub fn clear(&mut self) {
        for segment in self.segments.iter_mut() {
            segment.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
        use test_case::test_case;

    fn memory() -> (Rc<RegisterFile>, MappedMemory) {
        let registers = RegisterFile::new();
        let memory = MappedMemory::new(registers.clone(), 0).unwrap();
        (registers, memory)
    }

    #[test_case(INTERPRETER_START, PROGRAM_START ; "interpreter")]
    #[test_case(PROGRAM_START, STACK_START ; "program")]
    #[test_case(INTERPRETER_RAM_START, VARIABLES_START ; "interpreter ram")]
    #[test_case(VARIABLES_START, DISPLAY_START ; "variables")]
    #[test_case(DISPLAY_START, MEMORY_END ; "display")]
    fn bulk_reads_span_exactly_one_segment(start: u16, end: u16) {
        let (_, memory) = memory();
        let length = (end - start) as usize;
        assert_eq!(length, memory.get_bytes(start, length).unwrap().len());
        if end < MEMORY_END {
            assert_eq!(
                Err(Error::SegmentBoundaryViolation { address: start, length: length + 1 }),
                memory.get_bytes(start, length + 1)
            );
        }
        if start > 0 {
            assert!(memory.get_bytes(start - 1, 2).is_err());
        }
    }

    #[test]
    fn stack_is_word_addressed() {
        let (registers, mut memory) = memory();
        memory.set_word(STACK_START, 0x123).unwrap();
        assert_eq!(0x123, registers.stack[0].get());
        assert_eq!(Err(Error::MemoryAccessViolation { address: STACK_START }), memory.get_byte(STACK_START));
        assert!(memory.get_word(STACK_END - 1).is_err());
    }

    #[test]
    fn out_of_range_access_is_a_violation() {
        let (_, mut memory) = memory();
        assert_eq!(Err(Error::MemoryAccessViolation { address: 0x1000 }), memory.get_byte(0x1000));
        assert_eq!(Err(Error::MemoryAccessViolation { address: 0x1234 }), memory.set_byte(0x1234, 0));
    }

    #[test]
    fn bulk_access_may_not_cross_segments() {
        let (_, mut memory) = memory();
        assert_eq!(
            Err(Error::SegmentBoundaryViolation { address: 0xEEE, length: 4 }),
            memory.set_bytes(0xEEE, &[1, 2, 3, 4])
        );
        assert_eq!(Ok(vec![0, 0]), memory.get_bytes(0xEEE, 2));
        assert!(memory.get_word(0xFFF).is_err());
    }

    #[test]
    fn interpreter_rom_is_read_only() {
        let (_, mut memory) = memory();
        assert_eq!(Err(Error::WriteProtectionViolation { address: 0x010 }), memory.set_byte(0x010, 1));
        memory.flash(0x010, &[1]).unwrap();
        assert_eq!(Ok(1), memory.get_byte(0x010));
    }

    #[test]
    fn protected_program_prefix_is_left_unchanged() {
        let mut memory = MappedMemory::new(RegisterFile::new(), 0x100).unwrap();
        memory.flash(0x200, &[0xAA, 0xBB]).unwrap();
        assert_eq!(Err(Error::WriteProtectionViolation { address: 0x200 }), memory.set_word(0x200, 0x1234));
        assert_eq!(Err(Error::WriteProtectionViolation { address: 0x2FF }), memory.set_byte(0x2FF, 1));
        assert_eq!(Ok(0xAABB), memory.get_word(0x200));
        memory.set_byte(0x300, 1).unwrap();
    }

    #[test]
    fn variables_mirror_the_register_file() {
        let (registers, mut memory) = memory();
        registers.set_v(0xA, 0x42);
        assert_eq!(Ok(0x42), memory.get_byte(VARIABLES_START + 0xA));
        memory.set_byte(VARIABLES_START + 1, 9).unwrap();
        assert_eq!(9, registers.v(1));
    }

    #[test]
    fn clear_keeps_program_and_zeroes_display() {
        let (_, mut memory) = memory();
        memory.flash(PROGRAM_START, &[0x12]).unwrap();
        memory.set_byte(DISPLAY_START, 0xFF).unwrap();
        memory.clear();
        assert_eq!(Ok(0x12), memory.get_byte(PROGRAM_START));
        assert_eq!(Ok(0), memory.get_byte(DISPLAY_START));
    }
}
