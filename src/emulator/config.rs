//! Board configuration: compatibility quirks, clock rates and the program split.

use std::str::FromStr;
use std::time::Duration;

use crate::emulator::error::{Error, Result};
use crate::emulator::memory::PROGRAM_SIZE;

/// How sprites behave when they reach the edge of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Coordinates wrap around to the opposite edge.
    Wrapping,
    /// Sprites are cut off at the edge. Accepted as a setting but not implemented.
    Clipping,
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wrapping" | "wrap" => Ok(DisplayMode::Wrapping),
            "clipping" | "clip" => Ok(DisplayMode::Clipping),
            other => Err(format!("unknown display mode '{}'", other)),
        }
    }
}

/// Toggles for the documented differences between interpreters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    /// 8XY6/8XYE shift VX in place instead of loading the shifted VY.
    pub legacy_shift: bool,
    /// FX55/FX65 leave I untouched instead of pointing past the block.
    pub legacy_load_store: bool,
    /// FX1E wraps silently instead of reporting overflow in VF.
    pub legacy_address_sum: bool,
    /// FX29 uses only the low nibble of VX instead of rejecting larger values.
    pub trim_var_for_font: bool,
    pub display_mode: DisplayMode,
}

impl Default for Quirks {
    fn default() -> Self {
        Quirks {
            legacy_shift: false,
            legacy_load_store: false,
            legacy_address_sum: false,
            trim_var_for_font: false,
            display_mode: DisplayMode::Wrapping,
        }
    }
}

/// Rates, in Hz, of the independently clocked activities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frequencies {
    pub cpu: f64,
    pub delay: f64,
    pub sound: f64,
    /// `None` samples the display after every cycle.
    pub render: Option<f64>,
}

pub const DEFAULT_CPU_FREQUENCY: f64 = 500.0;
pub const DEFAULT_TIMER_FREQUENCY: f64 = 60.0;

impl Default for Frequencies {
    fn default() -> Self {
        Frequencies {
            cpu: DEFAULT_CPU_FREQUENCY,
            delay: DEFAULT_TIMER_FREQUENCY,
            sound: DEFAULT_TIMER_FREQUENCY,
            render: None,
        }
    }
}

/// Slowest accepted rate, one run every 1000 seconds.
pub const MIN_FREQUENCY: f64 = 1e-3;
/// Fastest accepted rate, one run per microsecond.
pub const MAX_FREQUENCY: f64 = 1e6;

/// The period of `frequency`, if the scheduler can run at that rate.
pub fn check_frequency(activity: &'static str, frequency: f64) -> Result<Duration> {
    // NaN fails the range check too.
    if !(MIN_FREQUENCY..=MAX_FREQUENCY).contains(&frequency) {
        return Err(Error::InvalidFrequency { activity, frequency });
    }
    match Duration::try_from_secs_f64(1.0 / frequency) {
        Ok(period) if !period.is_zero() => Ok(period),
        _ => Err(Error::InvalidFrequency { activity, frequency }),
    }
}

impl Frequencies {
    pub fn validate(&self) -> Result<()> {
        check_frequency("cpu", self.cpu)?;
        check_frequency("delay timer", self.delay)?;
        check_frequency("sound timer", self.sound)?;
        if let Some(render) = self.render {
            check_frequency("render", render)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Config {
    pub quirks: Quirks,
    pub frequencies: Frequencies,
    /// Length of the write-protected prefix of the program segment.
    /// Zero leaves the whole program segment writable.
    pub program_split: u16,
}

impl Config {
    /// Check the configuration once, before any clock starts.
    pub fn validate(&self) -> Result<()> {
        self.frequencies.validate()?;
        if self.program_split as usize > PROGRAM_SIZE {
            return Err(Error::MemoryAccessViolation { address: self.program_split });
        }
        if self.quirks.display_mode == DisplayMode::Clipping {
            return Err(Error::NotImplemented { operation: "clipping display mode" });
        }
        Ok(())
    }
}
