use chip_8::emulator::gpu::{SCREEN_HEIGHT, SCREEN_WIDTH};
use chip_8::emulator::{DisplayReceiver, Framebuffer, GraphicChange};

use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue};
use std::io::{stdout, Write};

/// Puts the terminal in raw mode on an alternate screen until dropped.
pub struct Terminal;

impl Terminal {
    pub fn enter() -> crossterm::Result<Terminal> {
        execute!(stdout(), EnterAlternateScreen, cursor::Hide, Clear(ClearType::All))?;
        terminal::enable_raw_mode()?;
        draw_border()?;
        Ok(Terminal)
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let restored = terminal::disable_raw_mode()
            .and_then(|_| execute!(stdout(), cursor::Show, LeaveAlternateScreen));
        if let Err(error) = restored {
            log::error!("Could not restore the terminal: {}", error);
        }
    }
}

fn draw_border() -> crossterm::Result<()> {
    let bottom = SCREEN_HEIGHT + 2;
    let right = 2 * SCREEN_WIDTH + 2;
    let mut stdout = stdout();
    for y in 1..=bottom {
        for x in 1..=right {
            let c = if y == 1 && x == 1 {
                '┏'
            } else if y == 1 && x == right {
                '┓'
            } else if y == bottom && x == 1 {
                '┗'
            } else if y == bottom && x == right {
                '┛'
            } else if y == 1 || y == bottom {
                '━'
            } else if x == 1 || x == right {
                '┃'
            } else {
                continue;
            };
            queue!(stdout, cursor::MoveTo(x as u16, y as u16), Print(c))?;
        }
    }
    stdout.flush()?;
    Ok(())
}

/// Draws frames inside the border, two columns per pixel.
pub struct CrosstermDisplay {
    shown: Framebuffer,
}

impl CrosstermDisplay {
    pub fn new() -> CrosstermDisplay {
        CrosstermDisplay { shown: Framebuffer::blank() }
    }

    fn draw(&mut self, framebuffer: &Framebuffer, full: bool) -> crossterm::Result<()> {
        let mut stdout = stdout();
        for y in 0..SCREEN_HEIGHT {
            for x in 0..SCREEN_WIDTH {
                let lit = framebuffer.pixel(x, y);
                if full || lit != self.shown.pixel(x, y) {
                    queue!(
                        stdout,
                        cursor::MoveTo(2 * x as u16 + 2, y as u16 + 2),
                        Print(if lit { "██" } else { "  " })
                    )?;
                }
            }
        }
        stdout.flush()?;
        self.shown = framebuffer.clone();
        Ok(())
    }
}

impl DisplayReceiver for CrosstermDisplay {
    fn receive(&mut self, change: GraphicChange, framebuffer: &Framebuffer) {
        // Anything that erased may have touched the whole screen.
        let full = matches!(change, GraphicChange::Erase | GraphicChange::Mix);
        if let Err(error) = self.draw(framebuffer, full) {
            log::error!("Could not draw frame: {}", error);
        }
    }
}

/// Rings the terminal bell when the sound comes on.
pub fn beep(on: bool) {
    if on {
        let mut stdout = stdout();
        let rung = write!(stdout, "\x07").and_then(|_| stdout.flush());
        if let Err(error) = rung {
            log::warn!("Could not beep: {}", error);
        }
    }
}
