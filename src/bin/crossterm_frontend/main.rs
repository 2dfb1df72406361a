use std::collections::HashMap;
use std::error::Error;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use structopt::StructOpt;

use chip_8::cli::ConfigOpt;
use chip_8::emulator::{Board, Keypad};

mod crossterm_io;
mod key_buffer;
mod key_manager;

use crossterm_io::{beep, CrosstermDisplay, Terminal};
use key_manager::KeyManager;

/// Terminals only report presses, so a key counts as held for this long after one.
const KEY_HOLD: Duration = Duration::from_millis(250);
/// How long to wait for a key before checking for releases.
const KEY_POLL: Duration = Duration::from_millis(10);

/// The program options.
#[derive(StructOpt)]
struct Opt {
    /// The program to execute
    #[structopt(parse(from_os_str))]
    input: PathBuf,

    #[structopt(flatten)]
    config: ConfigOpt,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // Get configuration and read input file
    let opt = Opt::from_args();
    log::info!("Executing {:?}", &opt.input);
    let program = std::fs::read(&opt.input)?;

    let terminal = Terminal::enter()?;
    let key_manager = KeyManager::new(KEY_HOLD);
    let mut board = Board::spawn(opt.config.to_config(), program, CrosstermDisplay::new(), beep)?;

    let mut keypad = Keypad::new();
    let mut last_seen: HashMap<u8, Instant> = HashMap::new();

    while !key_manager.quit_requested() && !board.is_stopped() {
        let mut changed = false;

        if let Some(key) = key_manager.next_key(KEY_POLL) {
            last_seen.insert(key, Instant::now());
            changed |= keypad.press(key);
        }

        let expired: Vec<u8> = last_seen
            .iter()
            .filter(|(_, seen)| seen.elapsed() >= KEY_HOLD)
            .map(|(&key, _)| key)
            .collect();
        for key in expired {
            last_seen.remove(&key);
            changed |= keypad.release(key);
        }

        if changed {
            keypad.send_to(&mut board);
        }
    }

    let result = board.stop();
    drop(key_manager);
    drop(terminal);
    result?;
    Ok(())
}
