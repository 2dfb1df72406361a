//! Command line options shared by the front-ends.

use structopt::StructOpt;

use crate::emulator::config::{Config, DisplayMode, Frequencies, Quirks, DEFAULT_CPU_FREQUENCY, DEFAULT_TIMER_FREQUENCY};

/// Emulator settings. Flatten this into a front-end's own options.
#[derive(Debug, StructOpt)]
pub struct ConfigOpt {
    /// Instructions per second
    #[structopt(long, default_value = "500")]
    pub cpu_frequency: f64,

    /// Delay timer ticks per second
    #[structopt(long, default_value = "60")]
    pub delay_frequency: f64,

    /// Sound timer ticks per second
    #[structopt(long, default_value = "60")]
    pub sound_frequency: f64,

    /// Screen updates per second. Without it the screen is updated after every instruction
    #[structopt(long)]
    pub render_frequency: Option<f64>,

    /// 8XY6/8XYE shift VX in place
    #[structopt(long)]
    pub legacy_shift: bool,

    /// FX55/FX65 leave I unchanged
    #[structopt(long)]
    pub legacy_load_store: bool,

    /// FX1E does not report overflow in VF
    #[structopt(long)]
    pub legacy_address_sum: bool,

    /// FX29 only looks at the low nibble of VX
    #[structopt(long)]
    pub trim_var_for_font: bool,

    /// What happens to sprites at the screen edge: wrapping or clipping
    #[structopt(long, default_value = "wrapping")]
    pub display_mode: DisplayMode,

    /// Number of bytes from 0x200 that the program may not overwrite
    #[structopt(long, default_value = "0")]
    pub program_split: u16,
}

impl ConfigOpt {
    pub fn to_config(&self) -> Config {
        Config {
            quirks: Quirks {
                legacy_shift: self.legacy_shift,
                legacy_load_store: self.legacy_load_store,
                legacy_address_sum: self.legacy_address_sum,
                trim_var_for_font: self.trim_var_for_font,
                display_mode: self.display_mode,
            },
            frequencies: Frequencies {
                cpu: self.cpu_frequency,
                delay: self.delay_frequency,
                sound: self.sound_frequency,
                render: self.render_frequency,
            },
            program_split: self.program_split,
        }
    }
}

impl Default for ConfigOpt {
    fn default() -> Self {
        ConfigOpt {
            cpu_frequency: DEFAULT_CPU_FREQUENCY,
            delay_frequency: DEFAULT_TIMER_FREQUENCY,
            sound_frequency: DEFAULT_TIMER_FREQUENCY,
            render_frequency: None,
            legacy_shift: false,
            legacy_load_store: false,
            legacy_address_sum: false,
            trim_var_for_font: false,
            display_mode: DisplayMode::Wrapping,
            program_split: 0,
        }
    }
}
