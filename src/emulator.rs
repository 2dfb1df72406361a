//! The CHIP-8 virtual CPU and GPU.
//!
//! A [`Cpu`] can be driven by hand, one `cycle()` or `delay_tick()` at a time,
//! or handed to a [`Board`] which runs it on a thread at the configured rates.

pub mod board;
pub mod clock;
pub mod config;
pub mod control_unit;
pub mod cpu;
pub mod error;
pub mod gpu;
pub mod input;
pub mod instruction;
pub mod memory;
pub mod output;
pub mod power;
pub mod register;
pub mod register_file;
pub mod units;

pub use board::{Board, BoardHandle, Command};
pub use clock::Activity;
pub use config::{Config, DisplayMode, Frequencies, Quirks};
pub use cpu::Cpu;
pub use error::{Error, Result};
pub use input::{KeyPort, Keypad};
pub use output::{AudioReceiver, DisplayReceiver, DummyOutput, Framebuffer};
pub use register::{CpuState, GraphicChange};
