use std::fmt;

use crate::emulator::gpu::{BYTES_PER_ROW, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::emulator::memory::DISPLAY_SIZE;
use crate::emulator::register::GraphicChange;

/// Represents a screen that can be sent new frames.
pub trait DisplayReceiver {
    /// Called with the kind of change and the raw 256-byte framebuffer.
    fn receive(&mut self, change: GraphicChange, framebuffer: &Framebuffer);
}

impl<F: FnMut(GraphicChange, &Framebuffer)> DisplayReceiver for F {
    fn receive(&mut self, change: GraphicChange, framebuffer: &Framebuffer) {
        self(change, framebuffer)
    }
}

/// Represents a beeper.
pub trait AudioReceiver {
    /// Called on every edge of the sound-on flag.
    fn receive(&mut self, sound_on: bool);
}

impl<F: FnMut(bool)> AudioReceiver for F {
    fn receive(&mut self, sound_on: bool) {
        self(sound_on)
    }
}

/// An output device that drops everything it is sent.
pub struct DummyOutput;

impl DisplayReceiver for DummyOutput {
    fn receive(&mut self, _: GraphicChange, _: &Framebuffer) {}
}

impl AudioReceiver for DummyOutput {
    fn receive(&mut self, _: bool) {}
}

/// A copy of the display IO segment.
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer(Vec<u8>);

impl Framebuffer {
    pub fn new(bytes: Vec<u8>) -> Framebuffer {
        debug_assert_eq!(DISPLAY_SIZE, bytes.len());
        Framebuffer(bytes)
    }

    pub fn blank() -> Framebuffer {
        Framebuffer(vec![0; DISPLAY_SIZE])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the pixel at (x, y) is lit. Coordinates wrap.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        let x = x % SCREEN_WIDTH;
        let y = y % SCREEN_HEIGHT;
        self.0[y * BYTES_PER_ROW + x / 8] & (0x80 >> (x % 8)) != 0
    }
}

impl fmt::Display for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..SCREEN_HEIGHT {
            for x in 0..SCREEN_WIDTH {
                write!(f, "{}", if self.pixel(x, y) { "#" } else { " " })?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixels_are_msb_first() {
        let mut bytes = vec![0; DISPLAY_SIZE];
        bytes[BYTES_PER_ROW + 1] = 0b0100_0000;
        let framebuffer = Framebuffer::new(bytes);
        assert!(framebuffer.pixel(9, 1));
        assert!(!framebuffer.pixel(8, 1));
        assert!(framebuffer.pixel(9 + SCREEN_WIDTH, 1 + SCREEN_HEIGHT));
    }

    #[test]
    fn display_draws_lit_pixels() {
        let mut bytes = vec![0; DISPLAY_SIZE];
        bytes[0] = 0x81;
        let text = Framebuffer::new(bytes).to_string();
        let first_line = text.lines().next().unwrap();
        assert_eq!(SCREEN_HEIGHT, text.lines().count());
        assert_eq!("#      #", &first_line[..8]);
    }
}
