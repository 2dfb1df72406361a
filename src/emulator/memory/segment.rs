//! The kinds of storage a memory segment can be backed by.

use std::rc::Rc;

use crate::emulator::error::{Error, Result};
use crate::emulator::register_file::RegisterFile;

/// Bytes that refuse writes while the protection is active.
pub struct ReadOnly {
    bytes: Vec<u8>,
    active: bool,
}

impl ReadOnly {
    pub fn new(size: usize) -> ReadOnly {
        ReadOnly { bytes: vec![0; size], active: true }
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// One region split into a write-protected prefix and a writable suffix.
pub struct SplitMemory {
    bytes: Vec<u8>,
    split: usize,
}

impl SplitMemory {
    pub fn new(size: usize, split: usize) -> SplitMemory {
        SplitMemory { bytes: vec![0; size], split: split.min(size) }
    }
}

pub enum SegmentKind {
    Rom(ReadOnly),
    Ram(Vec<u8>),
    Split(SplitMemory),
    /// Return addresses, one word per stack register.
    Stack(Rc<RegisterFile>),
    /// V0 to VF.
    Variables(Rc<RegisterFile>),
}

/// A contiguous range of the address space and what backs it.
pub struct Segment {
    pub name: &'static str,
    pub start: u16,
    pub end: u16,
    pub kind: SegmentKind,
}

impl Segment {
    pub fn new(name: &'static str, start: u16, end: u16, kind: SegmentKind) -> Segment {
        Segment { name, start, end, kind }
    }

    pub fn contains(&self, address: u16) -> bool {
        self.start <= address && address < self.end
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// Number of bytes the backing storage actually holds.
    pub fn backing_len(&self) -> usize {
        match &self.kind {
            SegmentKind::Rom(rom) => rom.bytes.len(),
            SegmentKind::Ram(bytes) => bytes.len(),
            SegmentKind::Split(split) => split.bytes.len(),
            SegmentKind::Stack(registers) => registers.stack.len() * 2,
            SegmentKind::Variables(registers) => registers.variables.len(),
        }
    }

    fn offset(&self, address: u16) -> usize {
        (address - self.start) as usize
    }

    pub fn get_byte(&self, address: u16) -> Result<u8> {
        let offset = self.offset(address);
        match &self.kind {
            SegmentKind::Rom(rom) => Ok(rom.bytes[offset]),
            SegmentKind::Ram(bytes) => Ok(bytes[offset]),
            SegmentKind::Split(split) => Ok(split.bytes[offset]),
            SegmentKind::Stack(_) => Err(Error::MemoryAccessViolation { address }),
            SegmentKind::Variables(registers) => Ok(registers.variables[offset].get()),
        }
    }

    pub fn set_byte(&mut self, address: u16, value: u8) -> Result<()> {
        let offset = self.offset(address);
        match &mut self.kind {
            SegmentKind::Rom(rom) => {
                if rom.active {
                    return Err(Error::WriteProtectionViolation { address });
                }
                rom.bytes[offset] = value;
            }
            SegmentKind::Ram(bytes) => bytes[offset] = value,
            SegmentKind::Split(split) => {
                if offset < split.split {
                    return Err(Error::WriteProtectionViolation { address });
                }
                split.bytes[offset] = value;
            }
            SegmentKind::Stack(_) => return Err(Error::MemoryAccessViolation { address }),
            SegmentKind::Variables(registers) => registers.variables[offset].set(value),
        }
        Ok(())
    }

    /// Big-endian word; the caller guarantees both bytes are in this segment.
    pub fn get_word(&self, address: u16) -> Result<u16> {
        match &self.kind {
            SegmentKind::Stack(registers) => {
                let offset = self.offset(address);
                if offset % 2 != 0 {
                    return Err(Error::MemoryAccessViolation { address });
                }
                Ok(registers.stack[offset / 2].get())
            }
            _ => {
                let high = self.get_byte(address)?;
                let low = self.get_byte(address + 1)?;
                Ok(u16::from_be_bytes([high, low]))
            }
        }
    }

    pub fn set_word(&mut self, address: u16, value: u16) -> Result<()> {
        if let SegmentKind::Stack(registers) = &self.kind {
            let offset = self.offset(address);
            if offset % 2 != 0 {
                return Err(Error::MemoryAccessViolation { address });
            }
            registers.stack[offset / 2].set(value);
            return Ok(());
        }
        self.set_bytes(address, &value.to_be_bytes())
    }

    pub fn get_bytes(&self, address: u16, length: usize) -> Result<Vec<u8>> {
        let offset = self.offset(address);
        match &self.kind {
            SegmentKind::Rom(rom) => Ok(rom.bytes[offset..offset + length].to_vec()),
            SegmentKind::Ram(bytes) => Ok(bytes[offset..offset + length].to_vec()),
            SegmentKind::Split(split) => Ok(split.bytes[offset..offset + length].to_vec()),
            SegmentKind::Stack(_) => Err(Error::MemoryAccessViolation { address }),
            SegmentKind::Variables(registers) => Ok(registers.variables[offset..offset + length]
                .iter()
                .map(|variable| variable.get())
                .collect()),
        }
    }

    pub fn set_bytes(&mut self, address: u16, data: &[u8]) -> Result<()> {
        self.check_writable(address, data.len())?;
        let offset = self.offset(address);
        match &mut self.kind {
            SegmentKind::Rom(rom) => rom.bytes[offset..offset + data.len()].copy_from_slice(data),
            SegmentKind::Ram(bytes) => bytes[offset..offset + data.len()].copy_from_slice(data),
            SegmentKind::Split(split) => split.bytes[offset..offset + data.len()].copy_from_slice(data),
            SegmentKind::Stack(_) => return Err(Error::MemoryAccessViolation { address }),
            SegmentKind::Variables(registers) => {
                for (variable, value) in registers.variables[offset..].iter().zip(data) {
                    variable.set(*value);
                }
            }
        }
        Ok(())
    }

    /// Write regardless of protection, the way firmware gets into ROM.
    pub fn flash(&mut self, address: u16, data: &[u8]) -> Result<()> {
        let offset = self.offset(address);
        match &mut self.kind {
            SegmentKind::Rom(rom) => {
                let active = rom.is_active();
                rom.set_active(false);
                rom.bytes[offset..offset + data.len()].copy_from_slice(data);
                rom.set_active(active);
            }
            SegmentKind::Split(split) => {
                split.bytes[offset..offset + data.len()].copy_from_slice(data);
            }
            SegmentKind::Ram(bytes) => {
                bytes[offset..offset + data.len()].copy_from_slice(data);
            }
            SegmentKind::Stack(_) => return Err(Error::MemoryAccessViolation { address }),
            SegmentKind::Variables(registers) => {
                for (variable, value) in registers.variables[offset..].iter().zip(data) {
                    variable.set(*value);
                }
            }
        }
        Ok(())
    }

    /// Zero the writable storage of plain RAM segments.
    pub fn clear(&mut self) {
        if let SegmentKind::Ram(bytes) = &mut self.kind {
            for byte in bytes.iter_mut() {
                *byte = 0;
            }
        }
    }

    fn check_writable(&self, address: u16, length: usize) -> Result<()> {
        let offset = self.offset(address);
        match &self.kind {
            SegmentKind::Rom(rom) if rom.active && length > 0 => {
                Err(Error::WriteProtectionViolation { address })
            }
            SegmentKind::Split(split) if offset < split.split && length > 0 => {
                Err(Error::WriteProtectionViolation { address })
            }
            _ => Ok(()),
        }
    }
}
