use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use structopt::StructOpt;

use chip_8::cli::ConfigOpt;
use chip_8::emulator::{Board, Framebuffer, GraphicChange};

/// Run a program without a screen or keyboard.
#[derive(StructOpt)]
struct Opt {
    /// The program to execute
    #[structopt(parse(from_os_str))]
    input: PathBuf,

    /// Seconds to run before stopping
    #[structopt(long, default_value = "5")]
    seconds: f64,

    /// Print the screen when done
    #[structopt(long)]
    print_screen: bool,

    #[structopt(flatten)]
    config: ConfigOpt,
}

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();

    // Get configuration and read input file
    let opt = Opt::from_args();
    log::info!("Executing {:?}", &opt.input);
    let program = std::fs::read(&opt.input)?;

    let screen = Arc::new(Mutex::new(Framebuffer::blank()));
    let latest = screen.clone();
    let display = move |change: GraphicChange, framebuffer: &Framebuffer| {
        log::debug!("Display change {:?}", change);
        if let Ok(mut latest) = latest.lock() {
            *latest = framebuffer.clone();
        }
    };
    let audio = |on: bool| log::info!("Sound {}", if on { "on" } else { "off" });

    let mut board = Board::spawn(opt.config.to_config(), program, display, audio)?;
    std::thread::sleep(Duration::from_secs_f64(opt.seconds.max(0.0)));
    board.stop()?;

    if opt.print_screen {
        if let Ok(screen) = screen.lock() {
            print!("{}", screen);
        }
    }

    Ok(())
}
