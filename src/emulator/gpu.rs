//! Sprite blitting into the display IO segment.
//!
//! The framebuffer is 64x32 pixels, row-major, 8 pixels per byte with the
//! most significant bit leftmost. A sprite row can start at any x, so it
//! usually straddles two framebuffer bytes.

use crate::emulator::config::DisplayMode;
use crate::emulator::error::{Error, Result};
use crate::emulator::memory::{MappedMemory, DISPLAY_SIZE};
use crate::emulator::register::{GraphicChange, StatusType};
use crate::emulator::register_file::RegisterFile;

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;
pub const BYTES_PER_ROW: usize = SCREEN_WIDTH / 8;
pub const MAX_SPRITE_HEIGHT: usize = 16;

/// Each font element is 5 bytes high.
pub const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Offset of each character inside the font segment.
pub const FONT_OFFSETS: [u16; 16] = [0, 5, 10, 15, 20, 25, 30, 35, 40, 45, 50, 55, 60, 65, 70, 75];

pub struct Gpu {
    display_mode: DisplayMode,
    trim_var_for_font: bool,
}

impl Gpu {
    pub fn new(display_mode: DisplayMode, trim_var_for_font: bool) -> Gpu {
        Gpu { display_mode, trim_var_for_font }
    }

    pub fn clear_screen(&self, registers: &RegisterFile, memory: &mut MappedMemory) -> Result<()> {
        memory.set_bytes(registers.graphic_segment.get(), &[0; DISPLAY_SIZE])?;
        registers.set_flag(1, StatusType::Collision);
        registers.graphic_change.set(GraphicChange::Erase);
        Ok(())
    }

    /// Move the picture up by `rows` pixel rows, blanking the bottom.
    pub fn scroll_up(&self, registers: &RegisterFile, memory: &mut MappedMemory, rows: usize) -> Result<()> {
        if rows == 0 {
            return Ok(());
        }
        let base = registers.graphic_segment.get();
        let mut framebuffer = memory.get_bytes(base, DISPLAY_SIZE)?;
        let shift = (rows * BYTES_PER_ROW).min(DISPLAY_SIZE);
        framebuffer.drain(..shift);
        framebuffer.resize(DISPLAY_SIZE, 0);
        memory.set_bytes(base, &framebuffer)?;
        registers.graphic_change.set(GraphicChange::Mix);
        Ok(())
    }

    /// XOR a sprite of `height` rows from I onto the screen at (VX, VY).
    pub fn draw_sprite(&self, registers: &RegisterFile, memory: &mut MappedMemory, x: u8, y: u8, height: u8) -> Result<()> {
        if self.display_mode == DisplayMode::Clipping {
            return Err(Error::NotImplemented { operation: "clipping display mode" });
        }

        let height = (height as usize).min(MAX_SPRITE_HEIGHT);
        let sprite = memory.get_bytes(registers.index.get(), height)?;

        let x_coord = registers.v(x) as usize % SCREEN_WIDTH;
        let y_coord = registers.v(y) as usize % SCREEN_HEIGHT;
        let column = x_coord / 8;
        let next_column = (column + 1) % BYTES_PER_ROW;
        let shift = x_coord % 8;

        let base = registers.graphic_segment.get();
        let mut erasing = false;
        let mut drawing = false;

        for (row, sprite_row) in sprite.iter().enumerate() {
            let row_start = base + (((y_coord + row) % SCREEN_HEIGHT) * BYTES_PER_ROW) as u16;
            let left_address = row_start + column as u16;
            let right_address = row_start + next_column as u16;

            // Two neighbouring framebuffer bytes, with the sprite shifted to line up.
            let paint = u16::from_be_bytes([memory.get_byte(left_address)?, memory.get_byte(right_address)?]);
            let sprite_bits = (*sprite_row as u16) << (8 - shift);
            let result = paint ^ sprite_bits;

            erasing |= paint & !result != 0;
            drawing |= !paint & result != 0;

            let [left, right] = result.to_be_bytes();
            memory.set_byte(left_address, left)?;
            if shift != 0 {
                memory.set_byte(right_address, right)?;
            }
        }

        registers.set_flag(erasing as u8, StatusType::Collision);
        let change = match (erasing, drawing) {
            (true, true) => GraphicChange::Mix,
            (true, false) => GraphicChange::Erase,
            (false, true) => GraphicChange::Draw,
            (false, false) => GraphicChange::Noop,
        };
        // Consumers watch this register for new frames, so it goes last.
        registers.graphic_change.set(change);
        Ok(())
    }

    /// Point I at the font character for the value in VX.
    pub fn font_address(&self, registers: &RegisterFile, x: u8) -> Result<()> {
        let mut value = registers.v(x);
        if value > 0xF {
            if !self.trim_var_for_font {
                return Err(Error::InvalidFontCharacter { value });
            }
            value &= 0xF;
        }
        registers.index.set(registers.font_segment.get() + FONT_OFFSETS[value as usize]);
        Ok(())
    }
}
